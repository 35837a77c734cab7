//! Pan/zoom viewport for 2D molecule depictions.
//!
//! A structure payload is depicted as SVG by a [`DepictionBackend`], cleaned
//! up and framed by [`render`](render::render), and shown through a
//! [`Viewport`] that bounds every pan and zoom against the measured content
//! and remembers the last view of each molecule in a [`ViewCache`].

pub mod bounds;
pub mod cache;
pub mod clamp;
pub mod color;
pub mod config;
pub mod depiction;
pub mod geometry;
pub mod interaction;
pub mod key;
pub mod render;
pub mod sanitize;
pub mod scene;
pub mod theme;
pub mod viewport;

pub use cache::{MemoryStore, RonFileStore, ViewCache, ViewStore};
pub use config::ViewerConfig;
pub use depiction::{DepictionBackend, ObabelBackend, StructurePayload};
pub use geometry::{CanvasSize, ViewBox};
pub use interaction::{GestureInput, GestureSignal, InputSource};
pub use key::MoleculeKey;
pub use sanitize::{AllowListClassifier, LabelClassifier};
pub use theme::Theme;
pub use viewport::{RenderTicket, Viewport, ViewportState};

pub use kurbo::{Point, Vec2};
