use molview::depiction::{DepictionBackend, DepictionError, Notation};
use molview::{
    AllowListClassifier, CanvasSize, GestureInput, GestureSignal, InputSource, MoleculeKey,
    Point, StructurePayload, Theme, Vec2, ViewBox, ViewCache, Viewport, ViewerConfig,
    ViewportState,
};
use proptest::prelude::*;
use std::time::{Duration, Instant};

const CANVAS: CanvasSize = CanvasSize::new(400.0, 300.0);

/// Lays atoms out on a horizontal line, one label per atom, with a stereo
/// descriptor and a highlighted label the sanitizer should strip.
#[derive(Default)]
struct FakeBackend {
    fail_normalize: bool,
}

impl FakeBackend {
    fn atoms(text: &str) -> Vec<String> {
        let mut atoms: Vec<String> = Vec::new();
        for c in text.chars() {
            if c.is_ascii_uppercase() {
                atoms.push(c.to_string());
            } else if c.is_ascii_lowercase()
                && let Some(last) = atoms.last_mut()
            {
                last.push(c);
            }
        }
        atoms
    }
}

impl DepictionBackend for FakeBackend {
    type Molecule = Vec<String>;

    fn parse_structured(&self, text: &str) -> Result<Vec<String>, DepictionError> {
        if !text.contains("M  END") {
            return Err(DepictionError::Parse {
                notation: Notation::Structured,
                message: "missing M  END".into(),
            });
        }
        Ok(text
            .lines()
            .filter_map(|line| line.split_whitespace().nth(3))
            .filter(|sym| sym.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
            .map(str::to_owned)
            .collect())
    }

    fn parse_line_notation(&self, text: &str) -> Result<Vec<String>, DepictionError> {
        let balanced = text.chars().fold(0i32, |depth, c| match c {
            '(' => depth + 1,
            ')' => depth - 1,
            _ => depth,
        }) == 0;
        let atoms = Self::atoms(text);
        if !balanced || atoms.is_empty() || text.contains('!') {
            return Err(DepictionError::Parse {
                notation: Notation::LineNotation,
                message: format!("cannot read {text:?}"),
            });
        }
        Ok(atoms)
    }

    fn normalize(&self, _molecule: &mut Vec<String>) -> Result<(), DepictionError> {
        if self.fail_normalize {
            return Err(DepictionError::Normalize("no ring perception".into()));
        }
        Ok(())
    }

    fn depict(
        &self,
        molecule: &Vec<String>,
        size: CanvasSize,
        _crop_margin: f64,
    ) -> Result<String, DepictionError> {
        let cy = size.height / 2.0;
        let start = size.width / 2.0 - (molecule.len() as f64 - 1.0) * 20.0;
        let mut body = String::new();
        for (i, atom) in molecule.iter().enumerate() {
            let x = start + i as f64 * 40.0;
            if i > 0 {
                body.push_str(&format!(
                    r##"<line x1="{}" y1="{cy}" x2="{}" y2="{cy}" stroke="#000000" stroke-width="2"/>"##,
                    x - 40.0,
                    x
                ));
            }
            body.push_str(&format!(
                r##"<text x="{x}" y="{cy}" text-anchor="middle" fill="#000000">{atom}</text>"##
            ));
        }
        body.push_str(r##"<text x="0" y="10" fill="#000000">R</text>"##);
        body.push_str(r##"<text x="0" y="20" fill="#c000ff">(S)</text>"##);
        Ok(format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">{body}</svg>"#,
            w = size.width,
            h = size.height
        ))
    }
}

struct Harness {
    backend: FakeBackend,
    classifier: AllowListClassifier,
    cache: ViewCache,
    viewport: Viewport,
    now: Instant,
}

impl Harness {
    fn new() -> Self {
        let cache = ViewCache::in_memory();
        Self {
            backend: FakeBackend::default(),
            classifier: AllowListClassifier::default(),
            viewport: Viewport::new(ViewerConfig::default(), cache.clone(), Theme::Light),
            cache,
            now: Instant::now(),
        }
    }

    fn load(&mut self, payload: &StructurePayload) {
        self.viewport
            .load(&self.backend, payload, Some(CANVAS), &self.classifier, self.now);
    }

    fn settle(&mut self) {
        self.now += Duration::from_millis(ViewerConfig::default().settle_delay_ms);
        self.viewport.tick(self.now);
    }

    fn input(&mut self, input: GestureInput) -> Option<GestureSignal> {
        self.now += Duration::from_millis(5);
        self.viewport.handle_input(input, CANVAS, self.now)
    }

    fn drag(&mut self, from: Point, to: Point) -> Option<GestureSignal> {
        let source = InputSource::Mouse;
        self.input(GestureInput::Press {
            source,
            position: from,
        });
        self.input(GestureInput::Move {
            source,
            position: to,
        });
        self.input(GestureInput::Release { source })
    }

    fn wheel(&mut self, delta_y: f64) -> Option<GestureSignal> {
        self.input(GestureInput::Wheel {
            delta: Vec2::new(0.0, delta_y),
            position: CANVAS.center(),
            pan: false,
        })
    }

    fn key(&self) -> MoleculeKey {
        self.viewport.molecule_key().cloned().unwrap()
    }
}

fn smiles(s: &str) -> StructurePayload {
    StructurePayload::from_line_notation(s)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn same_view(a: Option<ViewBox>, b: ViewBox) -> bool {
    a.is_some_and(|a| {
        approx(a.min_x, b.min_x)
            && approx(a.min_y, b.min_y)
            && approx(a.width, b.width)
            && approx(a.height, b.height)
    })
}

#[test]
fn water_renders_and_bounds_arrive_after_settle() {
    let mut h = Harness::new();
    h.load(&smiles("O"));

    let initial = h.viewport.initial_view_box().unwrap();
    assert!(initial.width > 0.0 && initial.height > 0.0);
    assert_eq!(h.viewport.live_view_box(), Some(initial));
    assert_eq!(h.viewport.state(), ViewportState::Ready);
    assert_eq!(h.viewport.content_bounds(), None);

    assert!(!h.viewport.tick(h.now));
    h.settle();
    assert!(h.viewport.content_bounds().is_some());
    assert_eq!(h.viewport.next_deadline(), None);
}

#[test]
fn sanitizer_strips_descriptors_and_highlights() {
    let mut h = Harness::new();
    h.load(&smiles("CCO"));
    let svg = h.viewport.to_svg(CANVAS).unwrap();
    assert!(svg.contains(">O<"));
    assert!(!svg.contains(">R<"));
    assert!(!svg.contains("(S)"));
}

#[test]
fn wheel_up_at_center_zooms_in_within_limits() {
    let mut h = Harness::new();
    h.load(&smiles("CCO"));
    h.settle();
    let initial = h.viewport.initial_view_box().unwrap();

    let before = h.viewport.live_view_box().unwrap();
    assert_eq!(h.wheel(-100.0), Some(GestureSignal::Zoom));
    let after = h.viewport.live_view_box().unwrap();
    assert!(after.width < before.width);
    assert!(after.width >= initial.width * ViewerConfig::default().min_zoom);
    assert_eq!(h.cache.get(&h.key()), Some(after));

    // a burst of wheel events reports one zoom
    assert_eq!(h.wheel(-100.0), None);
}

#[test]
fn drag_pans_and_persists_on_release() {
    let mut h = Harness::new();
    h.load(&smiles("CCO"));
    h.settle();
    let initial = h.viewport.initial_view_box().unwrap();
    let scale_x = initial.width / CANVAS.width;

    let signal = h.drag(Point::new(100.0, 100.0), Point::new(150.0, 100.0));
    assert_eq!(signal, Some(GestureSignal::Pan));

    let live = h.viewport.live_view_box().unwrap();
    assert!(approx(live.min_x, initial.min_x - 50.0 * scale_x));
    assert!(approx(live.min_y, initial.min_y));
    assert_eq!(h.cache.get(&h.key()), Some(live));
}

#[test]
fn drag_is_not_persisted_before_release() {
    let mut h = Harness::new();
    h.load(&smiles("CCO"));
    h.input(GestureInput::Press {
        source: InputSource::Touch,
        position: Point::new(10.0, 10.0),
    });
    h.input(GestureInput::Move {
        source: InputSource::Touch,
        position: Point::new(30.0, 10.0),
    });
    assert_ne!(h.viewport.live_view_box(), h.viewport.initial_view_box());
    assert_eq!(h.cache.get(&h.key()), None);
}

#[test]
fn double_activation_restores_initial_idempotently() {
    let mut h = Harness::new();
    h.load(&smiles("CCO"));
    h.settle();
    let initial = h.viewport.initial_view_box().unwrap();

    h.wheel(-300.0);
    h.drag(Point::new(200.0, 150.0), Point::new(120.0, 90.0));
    assert_ne!(h.viewport.live_view_box(), Some(initial));

    let reset = GestureInput::DoubleActivate {
        source: InputSource::Mouse,
    };
    assert_eq!(h.input(reset), Some(GestureSignal::Reset));
    assert_eq!(h.viewport.live_view_box(), Some(initial));
    h.input(reset);
    assert_eq!(h.viewport.live_view_box(), Some(initial));
    assert_eq!(h.cache.get(&h.key()), Some(initial));
}

#[test]
fn keyboard_reset_reports_reset_and_persists() {
    let mut h = Harness::new();
    h.load(&smiles("CCO"));
    h.settle();
    let initial = h.viewport.initial_view_box().unwrap();

    h.drag(Point::new(200.0, 150.0), Point::new(260.0, 190.0));
    assert_ne!(h.viewport.live_view_box(), Some(initial));

    let signal = h.input(GestureInput::DoubleActivate {
        source: InputSource::Keyboard,
    });
    assert_eq!(signal, Some(GestureSignal::Reset));
    assert_eq!(h.viewport.live_view_box(), Some(initial));
    assert_eq!(h.cache.get(&h.key()), Some(initial));
}

#[test]
fn malformed_structure_leaves_empty_scene() {
    let mut h = Harness::new();
    h.load(&smiles("C1CC(((!"));

    assert!(h.viewport.scene().unwrap().is_empty());
    assert_eq!(h.viewport.initial_view_box(), None);
    assert_eq!(h.viewport.live_view_box(), None);
    assert_eq!(h.viewport.state(), ViewportState::Empty);
    assert_eq!(h.wheel(-100.0), None);
    assert!(h.cache.is_empty());
}

#[test]
fn structured_payload_falls_back_to_line_notation() {
    let mut h = Harness::new();
    let payload = StructurePayload {
        structured: Some("garbage".into()),
        line_notation: Some("CO".into()),
    };
    h.load(&payload);
    assert!(h.viewport.initial_view_box().is_some());

    let molfile = "water\n\n\n  1  0  0  0  0  0  0  0  0  0999 V2000\n    0.0000    0.0000    0.0000 O   0  0\nM  END\n";
    h.load(&StructurePayload::from_structured(molfile));
    assert!(h.viewport.initial_view_box().is_some());
    assert!(h.key().as_str().starts_with("molfile:"));
}

#[test]
fn normalization_failure_is_not_fatal() {
    let mut h = Harness::new();
    h.backend.fail_normalize = true;
    h.load(&smiles("CCN"));
    assert_eq!(h.viewport.state(), ViewportState::Ready);
}

#[test]
fn switching_molecules_keeps_views_apart() {
    let mut h = Harness::new();
    let a = smiles("CCO");
    let b = smiles("CCCCN");

    h.load(&a);
    h.settle();
    h.wheel(-200.0);
    let a_view = h.viewport.live_view_box().unwrap();

    h.load(&b);
    h.settle();
    let b_initial = h.viewport.initial_view_box().unwrap();
    assert_eq!(h.viewport.live_view_box(), Some(b_initial));
    h.input(GestureInput::Wheel {
        delta: Vec2::new(0.0, 150.0),
        position: Point::new(10.0, 10.0),
        pan: false,
    });
    let b_view = h.viewport.live_view_box().unwrap();

    h.load(&a);
    assert!(same_view(h.viewport.live_view_box(), a_view));
    h.load(&b);
    assert!(same_view(h.viewport.live_view_box(), b_view));
}

#[test]
fn switching_mid_drag_saves_the_pre_drag_view() {
    let mut h = Harness::new();
    h.load(&smiles("CCO"));
    let key = h.key();
    let before_drag = h.viewport.live_view_box().unwrap();
    h.input(GestureInput::Press {
        source: InputSource::Mouse,
        position: Point::new(0.0, 0.0),
    });
    h.input(GestureInput::Move {
        source: InputSource::Mouse,
        position: Point::new(60.0, 0.0),
    });
    let mid_drag = h.viewport.live_view_box().unwrap();
    assert_ne!(mid_drag, before_drag);
    assert_eq!(h.cache.get(&key), None);

    h.load(&smiles("N"));
    assert_eq!(h.cache.get(&key), Some(before_drag));

    // the abandoned drag does not resume on the new molecule
    assert_eq!(h.input(GestureInput::Release { source: InputSource::Mouse }), None);
}

#[test]
fn switching_after_release_saves_the_panned_view() {
    let mut h = Harness::new();
    h.load(&smiles("CCO"));
    let key = h.key();
    h.drag(Point::new(0.0, 0.0), Point::new(30.0, 0.0));
    let panned = h.viewport.live_view_box().unwrap();

    h.load(&smiles("N"));
    assert_eq!(h.cache.get(&key), Some(panned));
}

#[test]
fn superseded_render_is_discarded() {
    let mut h = Harness::new();
    let config = ViewerConfig::default();
    let first = h.viewport.begin_load(&smiles("CCO"));
    let second = h.viewport.begin_load(&smiles("N"));
    assert_eq!(h.viewport.state(), ViewportState::Rendering);

    let stale = molview::render::render(&h.backend, &smiles("CCO"), Some(CANVAS), &config, &h.classifier);
    assert!(!h.viewport.apply_render(&first, stale, h.now));
    assert_eq!(h.viewport.live_view_box(), None);

    let fresh = molview::render::render(&h.backend, &smiles("N"), Some(CANVAS), &config, &h.classifier);
    assert!(h.viewport.apply_render(&second, fresh, h.now));
    assert_eq!(h.viewport.molecule_key(), second.key());
}

#[test]
fn teardown_discards_drag_and_late_results() {
    let mut h = Harness::new();
    h.load(&smiles("CCO"));
    let key = h.key();
    h.input(GestureInput::Press {
        source: InputSource::Mouse,
        position: Point::new(0.0, 0.0),
    });
    h.input(GestureInput::Move {
        source: InputSource::Mouse,
        position: Point::new(40.0, 0.0),
    });

    h.viewport.teardown();
    assert_eq!(h.viewport.state(), ViewportState::TornDown);
    let release = GestureInput::Release {
        source: InputSource::Mouse,
    };
    assert_eq!(h.input(release), None);
    assert_eq!(h.cache.get(&key), None);

    let ticket = h.viewport.begin_load(&smiles("CCO"));
    let late = molview::render::render(
        &h.backend,
        &smiles("CCO"),
        Some(CANVAS),
        &ViewerConfig::default(),
        &h.classifier,
    );
    assert!(!h.viewport.apply_render(&ticket, late, h.now));
    assert!(!h.viewport.tick(h.now + Duration::from_secs(1)));
    assert_eq!(h.viewport.live_view_box(), None);
    assert!(h.cache.is_empty());
}

#[test]
fn cached_view_skips_initial_framing() {
    let mut h = Harness::new();
    let payload = smiles("CCO");
    let key = MoleculeKey::from_payload(&payload).unwrap();
    let remembered = ViewBox::new(150.0, 100.0, 120.0, 90.0);
    h.cache.set(&key, remembered);

    h.load(&payload);
    assert!(same_view(h.viewport.live_view_box(), remembered));
    assert_ne!(h.viewport.initial_view_box(), Some(remembered));

    h.settle();
    assert!(same_view(h.viewport.live_view_box(), remembered));
}

#[test]
fn out_of_range_cached_view_is_clamped_on_restore() {
    let mut h = Harness::new();
    let payload = smiles("CCO");
    let key = MoleculeKey::from_payload(&payload).unwrap();
    h.cache.set(&key, ViewBox::new(1000.0, 1000.0, 1.0, 5.0));

    h.load(&payload);
    let initial = h.viewport.initial_view_box().unwrap();
    let restored = h.viewport.live_view_box().unwrap();
    assert!(approx(restored.width, initial.width * ViewerConfig::default().min_zoom));
    assert!(approx(restored.aspect(), initial.aspect()));

    h.settle();
    let live = h.viewport.live_view_box().unwrap();
    let content = h.viewport.content_bounds().unwrap();
    assert!(live.min_x <= content.right() && live.right() >= content.min_x);
    assert!(live.min_y <= content.bottom() && live.bottom() >= content.min_y);
    assert!(approx(live.width, restored.width));
}

#[test]
fn theme_flip_recolors_neutral_ink_only() {
    let mut h = Harness::new();
    h.load(&smiles("CO"));
    assert!(h.viewport.to_svg(CANVAS).unwrap().contains("#000000"));

    h.viewport.set_theme(Theme::Dark);
    let dark = h.viewport.to_svg(CANVAS).unwrap();
    assert!(!dark.contains("#000000"));
    assert!(dark.contains("stroke-width=\"2.5\""));

    h.viewport.set_theme(Theme::Light);
    assert!(h.viewport.to_svg(CANVAS).unwrap().contains("stroke-width=\"2\""));
}

#[test]
fn colliding_connection_tables_share_cached_view() {
    let a = StructurePayload::from_structured("Aa");
    let b = StructurePayload::from_structured("BB");
    assert_eq!(MoleculeKey::from_payload(&a), MoleculeKey::from_payload(&b));
}

proptest! {
    #[test]
    fn any_zoom_sequence_stays_within_limits(deltas in prop::collection::vec(-2000.0f64..2000.0, 1..40)) {
        let mut h = Harness::new();
        h.load(&smiles("CCO"));
        h.settle();
        let initial = h.viewport.initial_view_box().unwrap();
        let config = ViewerConfig::default();

        for delta in deltas {
            h.wheel(delta);
            let live = h.viewport.live_view_box().unwrap();
            prop_assert!(live.width >= initial.width * config.min_zoom - 1e-9);
            prop_assert!(live.width <= initial.width * config.max_zoom + 1e-9);
            prop_assert!((live.aspect() - initial.aspect()).abs() < 1e-9);
        }
    }

    #[test]
    fn reset_after_any_gestures_is_idempotent(
        deltas in prop::collection::vec(-800.0f64..800.0, 0..10),
        drag in (-300.0f64..300.0, -300.0f64..300.0),
    ) {
        let mut h = Harness::new();
        h.load(&smiles("CCN"));
        h.settle();
        let initial = h.viewport.initial_view_box().unwrap();

        for delta in deltas {
            h.wheel(delta);
        }
        h.drag(Point::new(200.0, 150.0), Point::new(200.0 + drag.0, 150.0 + drag.1));

        h.viewport.reset();
        prop_assert_eq!(h.viewport.live_view_box(), Some(initial));
        h.viewport.reset();
        prop_assert_eq!(h.viewport.live_view_box(), Some(initial));
    }
}
