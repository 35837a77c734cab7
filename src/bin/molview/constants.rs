/// Width of the sidebar panel in pixels.
pub const SIDEBAR_WIDTH: f32 = 200.0;

/// Initial window size.
pub const WINDOW_SIZE: [f32; 2] = [1024.0, 720.0];

/// Wheel delta sent for one `+`/`-` key press, in DOM units.
pub const KEY_ZOOM_DELTA: f64 = 150.0;

/// How long error toasts stay up, in seconds.
pub const ERROR_TOAST_SECONDS: f64 = 8.0;
