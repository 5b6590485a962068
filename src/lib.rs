//! Area window controller
//!
//! Frames, decorates and drives one X11 client window at a time on behalf of
//! a window manager.

pub mod config;
pub mod shared;
pub mod wm;
