//! Focus Module
//!
//! ICCCM input models and the matching focus handshake.

use tracing::debug;
use x11rb::CURRENT_TIME;

use crate::wm::client::ManagedWindow;
use crate::wm::connection::{ProtocolMessage, WindowSystem, XError, XResult};
use crate::wm::screen::ScreenContext;

/// ICCCM §4.1.7 input models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusMode {
    /// Never takes keyboard focus
    NoInput,
    /// Focus is set on it directly
    #[default]
    Passive,
    /// Focus is set directly and the client is told through WM_TAKE_FOCUS
    LocallyActive,
    /// The client sets focus itself when sent WM_TAKE_FOCUS
    GloballyActive,
}

impl FocusMode {
    pub fn classify(accepts_input: bool, take_focus: bool) -> Self {
        match (accepts_input, take_focus) {
            (false, false) => Self::NoInput,
            (false, true) => Self::GloballyActive,
            (true, true) => Self::LocallyActive,
            (true, false) => Self::Passive,
        }
    }

    pub fn accepts_focus(&self) -> bool {
        *self != Self::NoInput
    }

    fn sets_focus_directly(&self) -> bool {
        matches!(self, Self::Passive | Self::LocallyActive)
    }

    fn sends_take_focus(&self) -> bool {
        matches!(self, Self::LocallyActive | Self::GloballyActive)
    }
}

impl ManagedWindow {
    /// Ask for input focus. Returns whether a transfer was attempted; the
    /// focused flag itself follows the FocusIn that comes back.
    pub fn set_input_focus(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
    ) -> XResult<bool> {
        let mode = self.policy.focus_mode;
        if !mode.accepts_focus() {
            debug!("Client 0x{:x} takes no input, redirecting focus", self.client);
            screen.redirect_focus(self.client, None);
            return Ok(false);
        }
        if !self.state.is_visible() {
            return Ok(false);
        }

        // a modal transient keeps the focus to itself
        if let Some(transient) = self.transient {
            if let Some(summary) = screen.find_managed(transient) {
                if summary.modal && summary.accepts_focus {
                    debug!(
                        "Client 0x{:x} forwards focus to modal 0x{:x}",
                        self.client, transient
                    );
                    screen.redirect_focus(self.client, Some(summary.client));
                    return Ok(false);
                }
            }
        }

        if !self.validate_client(conn) {
            return Err(XError::Stale(self.client));
        }
        if self.state.is_shaded() {
            // the client is clipped away; hold focus on the frame
            conn.set_input_focus(self.windows.frame, CURRENT_TIME)?;
        } else if mode.sets_focus_directly() {
            conn.set_input_focus(self.client, CURRENT_TIME)?;
        }
        if mode.sends_take_focus() {
            conn.send_protocol_message(
                self.client,
                ProtocolMessage::TakeFocus,
                self.last_press_time,
            )?;
        }
        self.install_colormap(conn, true)?;
        debug!("Focus requested for 0x{:x} ({:?})", self.client, mode);
        Ok(true)
    }

    /// Record whether we hold focus and repaint. Never moves focus itself.
    pub fn set_focus_flag(&mut self, conn: &impl WindowSystem, focused: bool) -> XResult<()> {
        if focused && !self.policy.focus_mode.accepts_focus() {
            return Ok(());
        }
        if self.state.set_focused(focused) {
            if !focused {
                self.install_colormap(conn, false)?;
            }
            self.redraw_all(conn)?;
        }
        Ok(())
    }

    pub fn install_colormap(&self, conn: &impl WindowSystem, install: bool) -> XResult<()> {
        conn.install_colormap(self.client, install)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;
    use crate::wm::client_flags::{WmFlags, WmHintFlags};
    use crate::wm::connection::ClientProperty;
    use crate::wm::testing::{FakeScreen, RecordingConnection, Request, manage_with};

    #[test]
    fn test_classification() {
        assert_eq!(FocusMode::classify(false, false), FocusMode::NoInput);
        assert_eq!(FocusMode::classify(true, false), FocusMode::Passive);
        assert_eq!(FocusMode::classify(true, true), FocusMode::LocallyActive);
        assert_eq!(FocusMode::classify(false, true), FocusMode::GloballyActive);
    }

    #[test]
    fn test_globally_active_only_gets_take_focus() {
        let conn = RecordingConnection::new();
        let mut screen = FakeScreen::new();
        let client = conn.add_client(Geometry::new(10, 10, 200, 100));
        conn.set_cardinals(client, ClientProperty::Hints, &[WmHintFlags::INPUT.bits(), 0, 0, 0, 0, 0, 0, 0]);
        conn.set_protocols(client, WmFlags::TAKEFOCUS);
        let mut window = manage_with(&conn, &mut screen, client);
        window.last_press_time = 4242;

        conn.clear_requests();
        assert!(window.set_input_focus(&conn, &mut screen).unwrap());
        let requests = conn.requests();
        assert!(!requests.iter().any(|r| matches!(r, Request::SetFocus(_))));
        assert!(requests.contains(&Request::Protocol(client, ProtocolMessage::TakeFocus, 4242)));
    }

    #[test]
    fn test_passive_gets_direct_focus_only() {
        let conn = RecordingConnection::new();
        let mut screen = FakeScreen::new();
        let client = conn.add_client(Geometry::new(10, 10, 200, 100));
        let mut window = manage_with(&conn, &mut screen, client);

        conn.clear_requests();
        assert!(window.set_input_focus(&conn, &mut screen).unwrap());
        let requests = conn.requests();
        assert!(requests.contains(&Request::SetFocus(client)));
        assert!(!requests.iter().any(|r| matches!(r, Request::Protocol(..))));
    }

    #[test]
    fn test_no_input_is_never_focused() {
        let conn = RecordingConnection::new();
        let mut screen = FakeScreen::new();
        let client = conn.add_client(Geometry::new(10, 10, 200, 100));
        conn.set_cardinals(client, ClientProperty::Hints, &[WmHintFlags::INPUT.bits(), 0, 0, 0, 0, 0, 0, 0]);
        let mut window = manage_with(&conn, &mut screen, client);

        conn.clear_requests();
        screen.redirects.clear();
        for _ in 0..3 {
            assert!(!window.set_input_focus(&conn, &mut screen).unwrap());
            window.set_focus_flag(&conn, true).unwrap();
            assert!(!window.is_focused());
        }
        assert!(!conn.requests().iter().any(|r| matches!(r, Request::SetFocus(_))));
        assert_eq!(screen.redirects, vec![(client, None); 3]);
    }

    #[test]
    fn test_focus_flag_repaints_without_moving_focus() {
        let conn = RecordingConnection::new();
        let mut screen = FakeScreen::new();
        let client = conn.add_client(Geometry::new(10, 10, 200, 100));
        let mut window = manage_with(&conn, &mut screen, client);

        conn.clear_requests();
        window.set_focus_flag(&conn, true).unwrap();
        assert!(window.is_focused());
        let requests = conn.requests();
        assert!(requests.iter().any(|r| matches!(r, Request::Paint(..))));
        assert!(!requests.iter().any(|r| matches!(r, Request::SetFocus(_))));
    }
}
