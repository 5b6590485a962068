//! Screen Module
//!
//! What a managed window needs from the per-screen registry that owns it:
//! handle lookup, usable area, workspaces, the one-shot timer and the window
//! menu. The registry implements this; windows never hold references to each
//! other, only handles resolved through `find_managed`.

use std::time::Duration;
use x11rb::protocol::xproto::Window;

use crate::shared::Geometry;

/// Snapshot of another managed window, as seen through the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagedSummary {
    pub client: Window,
    pub frame: Window,
    pub workspace: u32,
    pub stuck: bool,
    /// False for windows that never take input focus
    pub accepts_focus: bool,
    pub modal: bool,
}

pub trait ScreenContext {
    /// Resolve a client, frame or decoration handle to its window
    fn find_managed(&self, handle: Window) -> Option<ManagedSummary>;

    /// Point `parent`'s forward transient reference at `child` (or clear it)
    fn link_transient(&mut self, parent: Window, child: Option<Window>);

    /// Area available to maximized windows
    fn usable_area(&self) -> Geometry;

    fn current_workspace(&self) -> u32;
    fn assign_workspace(&mut self, client: Window, workspace: u32);

    /// Arm the one-shot timer for `client`, replacing any pending one
    fn schedule_timeout(&mut self, client: Window, after: Duration);
    fn cancel_timeout(&mut self, client: Window);

    fn show_menu(&mut self, client: Window, x: i32, y: i32);
    fn hide_menu(&mut self, client: Window);

    /// Hand focus to `to`, or to the next eligible window when `None`
    fn redirect_focus(&mut self, from: Window, to: Option<Window>);
}
