//! Types shared across the window manager

pub mod window_state;

pub use window_state::{Geometry, Rect};
