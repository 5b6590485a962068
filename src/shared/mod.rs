//! Types shared between the window controller and the X11 backend

pub mod window_state;

pub use window_state::Geometry;
