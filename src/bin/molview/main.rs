#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod assets;
mod colors;
mod constants;
mod raster;
mod structure_watcher;
mod ui;

use assets::{Sample, load_samples};
use clap::Parser;
use constants::{ERROR_TOAST_SECONDS, WINDOW_SIZE};
use eframe::egui;
use egui_toast::{Toast, ToastKind, ToastOptions, Toasts};
use molview::cache::CacheError;
use molview::depiction::LibraryLoadError;
use molview::render::{RenderError, RenderedScene, render};
use molview::{
    AllowListClassifier, CanvasSize, InputSource, ObabelBackend, RenderTicket, RonFileStore,
    StructurePayload, Theme, ViewCache, Viewport, ViewerConfig,
};
use raster::CanvasTexture;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::Instant;
use structure_watcher::StructureWatcher;

#[derive(Parser, Debug)]
#[command(name = "molview", version, about = "Pan and zoom 2D molecule depictions")]
struct Cli {
    /// Structure file to open (.mol, .sdf, .smi)
    structure: Option<PathBuf>,

    /// Open a SMILES string instead of a file
    #[arg(long, conflicts_with = "structure")]
    smiles: Option<String>,

    /// Viewer config [default: <config dir>/molview/config.ron]
    #[arg(long)]
    config: Option<PathBuf>,

    /// View cache file [default: <data dir>/molview/views.ron]
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Start with the dark theme
    #[arg(long)]
    dark: bool,

    /// Open Babel executable
    #[arg(long, default_value = ObabelBackend::DEFAULT_PROGRAM)]
    obabel: PathBuf,

    /// Reload the structure file when it changes on disk
    #[arg(long, requires = "structure")]
    watch: bool,
}

/// State of the depiction library, which is checked in the background.
pub enum BackendState {
    Loading(mpsc::Receiver<Result<ObabelBackend, LibraryLoadError>>),
    Ready(Arc<ObabelBackend>),
    /// Stores the error message (already displayed via toast).
    Failed(String),
}

type RenderMessage = (RenderTicket, Result<RenderedScene, RenderError>);

/// Main application state for the molecule viewer.
pub struct MolviewApp {
    ctx: egui::Context,
    config: ViewerConfig,
    obabel: PathBuf,
    runtime: tokio::runtime::Runtime,
    backend: BackendState,
    classifier: Arc<AllowListClassifier>,
    viewport: Viewport,
    render_tx: mpsc::Sender<RenderMessage>,
    render_rx: mpsc::Receiver<RenderMessage>,
    /// Structure waiting for the backend to become ready.
    queued: Option<StructurePayload>,
    /// Last known canvas size in points.
    canvas: Option<CanvasSize>,
    drag_source: Option<InputSource>,
    multi_touch: bool,
    samples: Vec<Sample>,
    selected_sample: Option<usize>,
    smiles_input: String,
    svg_options: resvg::usvg::Options<'static>,
    texture: Option<CanvasTexture>,
    toasts: Toasts,
    watcher: Option<StructureWatcher>,
}

impl MolviewApp {
    fn new(cc: &eframe::CreationContext<'_>, cli: Cli, runtime: tokio::runtime::Runtime) -> Self {
        let toasts = Toasts::new()
            .anchor(egui::Align2::RIGHT_TOP, (-10.0, 10.0))
            .direction(egui::Direction::TopDown);

        let config = ViewerConfig::load_or_default(cli.config.as_deref());
        let theme = if cli.dark { Theme::Dark } else { Theme::Light };
        let (render_tx, render_rx) = mpsc::channel();

        let mut startup_errors = Vec::new();
        let cache = open_cache(cli.cache).unwrap_or_else(|err| {
            startup_errors.push(err.to_string());
            ViewCache::in_memory()
        });

        let mut svg_options = resvg::usvg::Options::default();
        svg_options.fontdb_mut().load_system_fonts();

        let mut app = Self {
            ctx: cc.egui_ctx.clone(),
            viewport: Viewport::new(config.clone(), cache, theme),
            config,
            obabel: cli.obabel.clone(),
            runtime,
            backend: BackendState::Failed(String::new()),
            classifier: Arc::new(AllowListClassifier::default()),
            render_tx,
            render_rx,
            queued: None,
            canvas: None,
            drag_source: None,
            multi_touch: false,
            samples: Vec::new(),
            selected_sample: None,
            smiles_input: String::new(),
            svg_options,
            texture: None,
            toasts,
            watcher: None,
        };

        for err in startup_errors {
            app.toast_error(err);
        }
        app.apply_visuals(theme);
        app.load_backend();

        match load_samples() {
            Ok(samples) => app.samples = samples,
            Err(err) => app.toast_error(err.to_string()),
        }

        if let Some(smiles) = cli.smiles {
            app.smiles_input = smiles.clone();
            app.open(StructurePayload::from_line_notation(smiles));
        } else if let Some(path) = &cli.structure {
            app.open_file(path.clone());
            if cli.watch {
                app.watcher = StructureWatcher::new(path, app.ctx.clone());
                if app.watcher.is_none() {
                    app.toast_error(format!("Cannot watch {}", path.display()));
                }
            }
        }

        app
    }

    /// Starts probing the depiction library in the background.
    fn load_backend(&mut self) {
        let (tx, rx) = mpsc::channel();
        let ctx = self.ctx.clone();
        let program = self.obabel.clone();

        self.runtime.spawn(async move {
            let result = ObabelBackend::load(program).await;
            let _ = tx.send(result);
            ctx.request_repaint();
        });

        self.backend = BackendState::Loading(rx);
    }

    fn poll_backend(&mut self) {
        let BackendState::Loading(rx) = &self.backend else {
            return;
        };
        let next = match rx.try_recv() {
            Ok(Ok(backend)) => BackendState::Ready(Arc::new(backend)),
            Ok(Err(err)) => {
                let msg = err.to_string();
                self.toast_error(msg.clone());
                BackendState::Failed(msg)
            }
            Err(mpsc::TryRecvError::Empty) => return,
            Err(mpsc::TryRecvError::Disconnected) => {
                BackendState::Failed("backend loader disconnected".to_owned())
            }
        };
        self.backend = next;

        if matches!(self.backend, BackendState::Ready(_))
            && let Some(payload) = self.queued.take()
        {
            self.open(payload);
        }
    }

    /// Switches the viewport to `payload`, rendering in the background.
    fn open(&mut self, payload: StructurePayload) {
        let BackendState::Ready(backend) = &self.backend else {
            self.queued = Some(payload);
            return;
        };

        let ticket = self.viewport.begin_load(&payload);
        let backend = Arc::clone(backend);
        let classifier = Arc::clone(&self.classifier);
        let config = self.config.clone();
        let host = self.canvas;
        let tx = self.render_tx.clone();
        let ctx = self.ctx.clone();

        self.drag_source = None;
        self.texture = None;
        self.runtime.spawn_blocking(move || {
            let result = render(backend.as_ref(), &payload, host, &config, classifier.as_ref());
            let _ = tx.send((ticket, result));
            ctx.request_repaint();
        });
    }

    fn open_file(&mut self, path: PathBuf) {
        match StructurePayload::from_file(&path) {
            Ok(payload) => {
                self.selected_sample = None;
                self.open(payload);
            }
            Err(err) => self.toast_error(format!("{}: {err}", path.display())),
        }
    }

    fn poll_renders(&mut self) {
        while let Ok((ticket, result)) = self.render_rx.try_recv() {
            let failure = result.as_ref().err().map(ToString::to_string);
            let applied = self.viewport.apply_render(&ticket, result, Instant::now());
            if applied && let Some(msg) = failure {
                self.toast_error(msg);
            }
        }
    }

    fn poll_watcher(&mut self) {
        let Some(watcher) = &mut self.watcher else {
            return;
        };
        if watcher.poll() {
            let path = watcher.path().to_path_buf();
            log::info!("{} changed, reloading", path.display());
            self.open_file(path);
        }
    }

    /// Runs the settle timer and schedules a repaint for the next deadline.
    fn tick(&mut self) {
        let now = Instant::now();
        self.viewport.tick(now);
        if let Some(deadline) = self.viewport.next_deadline() {
            self.ctx
                .request_repaint_after(deadline.saturating_duration_since(now));
        }
    }

    fn set_theme(&mut self, theme: Theme) {
        self.viewport.set_theme(theme);
        self.apply_visuals(theme);
    }

    fn apply_visuals(&self, theme: Theme) {
        self.ctx.set_visuals(match theme {
            Theme::Light => egui::Visuals::light(),
            Theme::Dark => egui::Visuals::dark(),
        });
    }

    fn toast_error(&mut self, text: String) {
        self.toasts.add(Toast {
            kind: ToastKind::Error,
            text: text.into(),
            options: ToastOptions::default()
                .duration_in_seconds(ERROR_TOAST_SECONDS)
                .show_icon(true),
            ..Default::default()
        });
    }
}

impl eframe::App for MolviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_backend();
        self.poll_renders();
        self.poll_watcher();
        self.tick();
        self.handle_keyboard_input(ctx);

        self.show_status_bar(ctx);
        self.show_sidebar(ctx);
        self.show_central_panel(ctx);

        self.toasts.show(ctx);
    }
}

/// Opens the persistent view cache, falling back to memory when there is no
/// data directory.
fn open_cache(path: Option<PathBuf>) -> Result<ViewCache, CacheError> {
    let Some(path) = path.or_else(RonFileStore::default_path) else {
        log::info!("No data directory; views are kept in memory only");
        return Ok(ViewCache::in_memory());
    };
    let store = RonFileStore::open_or_reset(path)?;
    log::info!("View cache: {}", store.path().display());
    Ok(ViewCache::new(store))
}

fn main() -> eframe::Result {
    env_logger::init();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("Failed to start tokio runtime: {err}");
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(WINDOW_SIZE),
        ..Default::default()
    };

    eframe::run_native(
        "Molview",
        options,
        Box::new(|cc| Ok(Box::new(MolviewApp::new(cc, cli, runtime)))),
    )
}
