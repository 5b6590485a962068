//! Window Module
//!
//! The per-client window controller: hint ingestion, frame geometry and
//! layout, state transitions, focus and event handling for one managed
//! client. Everything outside one window is reached through `ScreenContext`,
//! the windowing system through `WindowSystem`.

pub mod client;
pub mod client_flags;
pub mod connection;
pub mod decorations;
pub mod display;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod geometry;
pub mod hints;
pub mod moveresize;
pub mod screen;
pub mod state;

#[cfg(test)]
mod testing;

pub use client::ManagedWindow;
pub use connection::{WindowSystem, XError, XResult};
pub use events::{EventResult, WindowEvent};
pub use screen::{ManagedSummary, ScreenContext};
