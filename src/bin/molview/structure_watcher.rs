//! Reloads the structure file when it changes on disk.

use eframe::egui;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

/// Watches one structure file. Editors often replace files instead of writing
/// in place, so the parent directory is watched and events are filtered by
/// file name.
pub struct StructureWatcher {
    path: PathBuf,
    change_rx: Receiver<()>,
    /// The watcher must be kept alive for events to fire
    _watcher: RecommendedWatcher,
}

impl StructureWatcher {
    /// Returns `None` if the file has no parent directory or watching fails.
    pub fn new(path: &Path, ctx: egui::Context) -> Option<Self> {
        let path = path.canonicalize().ok()?;
        let dir = path.parent()?.to_path_buf();
        let file_name = path.file_name()?.to_os_string();

        let (change_tx, change_rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    log::warn!("File watch error: {err}");
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            if event
                .paths
                .iter()
                .any(|changed| changed.file_name() == Some(file_name.as_os_str()))
            {
                let _ = change_tx.send(());
                ctx.request_repaint();
            }
        })
        .map_err(|err| log::warn!("Cannot create file watcher: {err}"))
        .ok()?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|err| log::warn!("Cannot watch {}: {err}", dir.display()))
            .ok()?;

        log::info!("Watching {}", path.display());
        Some(Self {
            path,
            change_rx,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the file changed since the last poll. Bursts of
    /// events collapse into one.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.change_rx.try_recv() {
                Ok(()) => changed = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("Structure watcher channel disconnected");
                    break;
                }
            }
        }
        changed
    }
}
