//! Events Module
//!
//! Handlers the dispatcher invokes for each notification about a managed
//! window. Every handler absorbs a vanished client: the window is released
//! and the handler reports `EventResult::Unmanage`.

use bitflags::bitflags;
use tracing::{debug, trace, warn};
use x11rb::protocol::xproto::Window;

use crate::shared::Geometry;
use crate::wm::client::ManagedWindow;
use crate::wm::connection::{ClientProperty, WindowSystem, XResult};
use crate::wm::decorations::{ButtonKind, Region};
use crate::wm::geometry::Axis;
use crate::wm::hints::ManagerHints;
use crate::wm::moveresize::{DragOperation, DragState};
use crate::wm::screen::ScreenContext;
use crate::wm::state::{Activity, WmState};

/// Result of event handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Event was handled successfully
    Handled,
    /// Event was not for us, or needed nothing
    Ignore,
    /// The client is gone or withdrew; it has been released and the
    /// registry should drop it
    Unmanage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub window: Window,
    pub button: u8,
    pub time: u32,
    pub root_x: i32,
    pub root_y: i32,
    /// Position relative to `window`
    pub event_x: i32,
    pub event_y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    pub window: Window,
    pub time: u32,
    pub root_x: i32,
    pub root_y: i32,
}

bitflags! {
    /// ConfigureRequest value mask, as on the wire
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConfigureMask: u16 {
        const X            = 1 << 0;
        const Y            = 1 << 1;
        const WIDTH        = 1 << 2;
        const HEIGHT       = 1 << 3;
        const BORDER_WIDTH = 1 << 4;
        const SIBLING      = 1 << 5;
        const STACK_MODE   = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackRequest {
    #[default]
    None,
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureRequest {
    pub window: Window,
    pub mask: ConfigureMask,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
    pub stack: StackRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposeEvent {
    pub window: Window,
    /// Expose events still queued for the same window
    pub count: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyEvent {
    pub window: Window,
    pub property: ClientProperty,
}

/// Client messages a client sends about itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRequest {
    /// WM_CHANGE_STATE
    ChangeState(WmState),
    /// _AREA_CHANGE_ATTRIBUTES
    ChangeAttributes(ManagerHints),
}

/// A notification routed to one managed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    ButtonPress(ButtonEvent),
    ButtonRelease(ButtonEvent),
    Motion(MotionEvent),
    ConfigureRequest(ConfigureRequest),
    MapRequest(Window),
    Unmap(Window),
    Destroy(Window),
    Reparent { window: Window, parent: Window },
    Property(PropertyEvent),
    Expose(ExposeEvent),
    Shape { window: Window, shaped: bool },
    ClientMessage(Window, ClientRequest),
    Focus { window: Window, focused: bool },
}

impl WindowEvent {
    /// Handle the registry resolves to a managed window
    pub fn target(&self) -> Window {
        match *self {
            WindowEvent::ButtonPress(e) | WindowEvent::ButtonRelease(e) => e.window,
            WindowEvent::Motion(e) => e.window,
            WindowEvent::ConfigureRequest(e) => e.window,
            WindowEvent::MapRequest(w) | WindowEvent::Unmap(w) | WindowEvent::Destroy(w) => w,
            WindowEvent::Reparent { window, .. } => window,
            WindowEvent::Property(e) => e.window,
            WindowEvent::Expose(e) => e.window,
            WindowEvent::Shape { window, .. } => window,
            WindowEvent::ClientMessage(w, _) => w,
            WindowEvent::Focus { window, .. } => window,
        }
    }
}

impl ManagedWindow {
    /// Route `event` to its handler
    pub fn dispatch(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        event: &WindowEvent,
    ) -> XResult<EventResult> {
        match *event {
            WindowEvent::ButtonPress(ref e) => self.handle_button_press(conn, screen, e),
            WindowEvent::ButtonRelease(ref e) => self.handle_button_release(conn, screen, e),
            WindowEvent::Motion(ref e) => self.handle_motion(conn, screen, e),
            WindowEvent::ConfigureRequest(ref e) => self.handle_configure_request(conn, screen, e),
            WindowEvent::MapRequest(_) => self.handle_map_request(conn, screen),
            WindowEvent::Unmap(w) => self.handle_unmap_notify(conn, screen, w),
            WindowEvent::Destroy(w) => self.handle_destroy_notify(conn, screen, w),
            WindowEvent::Reparent { window, parent } => {
                self.handle_reparent_notify(conn, screen, window, parent)
            }
            WindowEvent::Property(ref e) => self.handle_property_notify(conn, screen, e),
            WindowEvent::Expose(ref e) => self.handle_expose(conn, screen, e),
            WindowEvent::Shape { window, shaped } if window == self.client => {
                self.handle_shape_notify(conn, screen, shaped)
            }
            WindowEvent::Shape { .. } => Ok(EventResult::Ignore),
            WindowEvent::ClientMessage(_, ref request) => {
                self.handle_client_request(conn, screen, request)
            }
            // a shaded window holds focus on its frame
            WindowEvent::Focus { window, focused }
                if window == self.client || window == self.windows.frame =>
            {
                self.handle_focus_change(conn, screen, focused)
            }
            WindowEvent::Focus { .. } => Ok(EventResult::Ignore),
        }
    }

    /// Turn a vanished client into the terminal transition
    fn absorb(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        result: XResult<EventResult>,
    ) -> XResult<EventResult> {
        match result {
            Err(e) if e.is_stale() => {
                warn!("Client 0x{:x} vanished: {}", self.client, e);
                self.unmanage(conn, screen)
            }
            other => other,
        }
    }

    fn unmanage(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
    ) -> XResult<EventResult> {
        self.restore(conn, screen, false)?;
        Ok(EventResult::Unmanage)
    }

    pub fn handle_button_press(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        event: &ButtonEvent,
    ) -> XResult<EventResult> {
        let result = self.button_press(conn, screen, event);
        self.absorb(conn, screen, result)
    }

    fn button_press(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        event: &ButtonEvent,
    ) -> XResult<EventResult> {
        let Some(region) = self.region_of(event.window) else {
            return Ok(EventResult::Ignore);
        };
        debug!(
            "ButtonPress {} on {:?} of 0x{:x} at {}",
            event.button, region, self.client, event.time
        );
        self.last_press_time = event.time;

        let on_title = matches!(region, Region::Title | Region::Label);
        if !(on_title && event.button == 3) {
            screen.hide_menu(self.client);
        }
        // any other press breaks a pending double click
        if !(on_title && event.button == 1) && self.click_armed.take().is_some() {
            screen.cancel_timeout(self.client);
        }

        match (region, event.button) {
            (Region::Client, _) => {
                self.activate(conn, screen)?;
                conn.replay_pointer(event.time)?;
            }
            (Region::Button(kind), button)
                if button == 1 || (kind == ButtonKind::Maximize && button <= 3) =>
            {
                self.pressed = Some(kind);
                self.redraw_button(conn, kind)?;
            }
            (Region::Grip(edge), 1) => {
                self.activate(conn, screen)?;
                self.begin_drag(conn, DragOperation::Resize(edge), event)?;
            }
            (_, 1) => {
                self.activate(conn, screen)?;
                if on_title && self.double_clicked(screen, event.time) {
                    self.shade(conn)?;
                    return Ok(EventResult::Handled);
                }
                self.begin_drag(conn, DragOperation::Move, event)?;
            }
            (Region::Button(_), _) => return Ok(EventResult::Ignore),
            (_, 2) => conn.lower_window(self.windows.frame)?,
            (_, 3) if on_title && self.policy.decorations.menu => {
                screen.show_menu(self.client, event.root_x, event.root_y);
            }
            _ => return Ok(EventResult::Ignore),
        }
        Ok(EventResult::Handled)
    }

    /// Focus and raise on click
    fn activate(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
    ) -> XResult<()> {
        if !self.state.is_focused() {
            self.set_input_focus(conn, screen)?;
        }
        if self.config.behavior.raise_on_focus {
            conn.raise_window(self.windows.frame)?;
        }
        Ok(())
    }

    /// Second titlebar click inside the interval. Otherwise arm a new one.
    fn double_clicked(&mut self, screen: &mut impl ScreenContext, time: u32) -> bool {
        let interval = self.config.behavior.double_click_interval();
        if let Some(first) = self.click_armed.take() {
            if (time.wrapping_sub(first) as u128) < interval.as_millis() {
                screen.cancel_timeout(self.client);
                return true;
            }
        }
        self.click_armed = Some(time);
        screen.schedule_timeout(self.client, interval);
        false
    }

    /// The double-click timer fired: the armed click no longer counts
    pub fn timeout(&mut self) {
        self.click_armed = None;
    }

    fn begin_drag(
        &mut self,
        conn: &impl WindowSystem,
        operation: DragOperation,
        event: &ButtonEvent,
    ) -> XResult<()> {
        let (allowed, activity) = match operation {
            DragOperation::Move => (self.policy.functions.move_window, Activity::Moving),
            DragOperation::Resize(_) => (self.policy.functions.resize, Activity::Resizing),
        };
        if !allowed || !self.state.begin(activity) {
            return Ok(());
        }
        conn.grab_pointer(self.windows.frame, event.time)?;
        self.drag = Some(DragState::new(
            operation,
            event.root_x,
            event.root_y,
            self.frame_geometry,
        ));
        debug!("Started {:?} of 0x{:x}", operation, self.client);
        Ok(())
    }

    pub fn handle_motion(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        event: &MotionEvent,
    ) -> XResult<EventResult> {
        let result = self.motion(conn, event);
        self.absorb(conn, screen, result)
    }

    fn motion(&mut self, conn: &impl WindowSystem, event: &MotionEvent) -> XResult<EventResult> {
        let Some(drag) = self.drag.as_mut() else {
            return Ok(EventResult::Ignore);
        };
        let axis = drag.update(event.root_x, event.root_y);
        match drag.operation {
            DragOperation::Resize(edge) => {
                drag.preview = self
                    .metrics
                    .constrain(&self.policy.size, drag.preview, edge, axis);
            }
            DragOperation::Move => {
                if self.config.behavior.opaque_move {
                    conn.move_window(self.windows.frame, drag.preview.x, drag.preview.y)?;
                }
            }
        }
        trace!("Drag preview of 0x{:x}: {:?}", self.client, drag.preview);
        Ok(EventResult::Handled)
    }

    pub fn handle_button_release(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        event: &ButtonEvent,
    ) -> XResult<EventResult> {
        let result = self.button_release(conn, screen, event);
        self.absorb(conn, screen, result)
    }

    fn button_release(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        event: &ButtonEvent,
    ) -> XResult<EventResult> {
        if let Some(kind) = self.pressed.take() {
            self.redraw_button(conn, kind)?;
            let same_button = self.windows.button(kind) == Some(event.window)
                && self
                    .button_size()
                    .contains_point(event.event_x, event.event_y);
            if same_button {
                debug!("{:?} button released on 0x{:x}", kind, self.client);
                match kind {
                    ButtonKind::Iconify => self.iconify(conn, screen)?,
                    ButtonKind::Maximize => self.maximize(conn, screen, event.button)?,
                    ButtonKind::Close => self.close(conn)?,
                }
            }
            return Ok(EventResult::Handled);
        }

        let Some(drag) = self.drag.take() else {
            return Ok(EventResult::Ignore);
        };
        self.state.end_drag();
        conn.ungrab_pointer(event.time)?;
        if !drag.moved {
            debug!("{:?} of 0x{:x} cancelled without motion", drag.operation, self.client);
            return Ok(EventResult::Handled);
        }
        debug!(
            "Committing {:?} of 0x{:x}: {:?}",
            drag.operation, self.client, drag.preview
        );
        self.configure(conn, drag.preview)?;
        Ok(EventResult::Handled)
    }

    fn button_size(&self) -> Geometry {
        let size = self.metrics.button_size;
        Geometry::new(0, 0, size, size)
    }

    /// A mapped client asks to be reconfigured; position and size requests
    /// are granted only as far as the policy allows
    pub fn handle_configure_request(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        request: &ConfigureRequest,
    ) -> XResult<EventResult> {
        let result = self.configure_request(conn, request);
        self.absorb(conn, screen, result)
    }

    fn configure_request(
        &mut self,
        conn: &impl WindowSystem,
        request: &ConfigureRequest,
    ) -> XResult<EventResult> {
        if request.window != self.client {
            return Ok(EventResult::Ignore);
        }
        debug!("ConfigureRequest for 0x{:x}: {:?}", self.client, request);
        let gravity = self.policy.size.gravity;
        let current = self.metrics.unplace(self.frame_geometry, gravity);
        let mut wanted = current;

        if self.policy.functions.move_window {
            if request.mask.contains(ConfigureMask::X) {
                wanted.x = request.x;
            }
            if request.mask.contains(ConfigureMask::Y) {
                wanted.y = request.y;
            }
        }
        if self.policy.functions.resize {
            if request.mask.contains(ConfigureMask::WIDTH) {
                wanted.width = request.width;
            }
            if request.mask.contains(ConfigureMask::HEIGHT) {
                wanted.height = request.height;
            }
        }
        if request.mask.contains(ConfigureMask::BORDER_WIDTH) {
            // applied again when the client is released
            self.old_border_width = request.border_width;
        }

        let (width, height) = self
            .policy
            .size
            .constrain(wanted.width, wanted.height, Axis::Width);
        let frame = self.metrics.place(wanted.with_size(width, height), gravity);
        if frame != self.frame_geometry {
            self.configure(conn, frame)?;
        } else {
            // refused or unchanged: the client still gets its answer
            conn.send_configure_notify(self.client, self.client_geometry)?;
        }

        if request.mask.contains(ConfigureMask::STACK_MODE) {
            match request.stack {
                StackRequest::Above => conn.raise_window(self.windows.frame)?,
                StackRequest::Below => conn.lower_window(self.windows.frame)?,
                StackRequest::None => {}
            }
        }
        Ok(EventResult::Handled)
    }

    /// MapRequest for a client we already manage
    pub fn handle_map_request(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
    ) -> XResult<EventResult> {
        debug!("MapRequest for managed 0x{:x}", self.client);
        let result = self.deiconify(conn, screen).map(|_| EventResult::Handled);
        self.absorb(conn, screen, result)
    }

    pub fn handle_unmap_notify(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        window: Window,
    ) -> XResult<EventResult> {
        if window != self.client {
            return Ok(EventResult::Ignore);
        }
        if self.pending_unmaps > 0 {
            self.pending_unmaps -= 1;
            trace!("Ignoring our own unmap of 0x{:x}", self.client);
            return Ok(EventResult::Ignore);
        }
        debug!("Client 0x{:x} withdrew itself", self.client);
        self.client_mapped = false;
        self.unmanage(conn, screen)
    }

    pub fn handle_destroy_notify(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        window: Window,
    ) -> XResult<EventResult> {
        if window != self.client {
            return Ok(EventResult::Ignore);
        }
        debug!("Client 0x{:x} destroyed", self.client);
        self.unmanage(conn, screen)
    }

    pub fn handle_reparent_notify(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        window: Window,
        parent: Window,
    ) -> XResult<EventResult> {
        if window != self.client || parent == self.windows.frame {
            return Ok(EventResult::Ignore);
        }
        debug!("Client 0x{:x} reparented away to 0x{:x}", self.client, parent);
        self.unmanage(conn, screen)
    }

    /// Re-read only the hint source behind the changed property
    pub fn handle_property_notify(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        event: &PropertyEvent,
    ) -> XResult<EventResult> {
        if event.window != self.client {
            return Ok(EventResult::Ignore);
        }
        let result = self.property_changed(conn, screen, event.property);
        self.absorb(conn, screen, result)
    }

    fn property_changed(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        property: ClientProperty,
    ) -> XResult<EventResult> {
        let changed = match property {
            ClientProperty::WmState | ClientProperty::ManagerAttributes => false,
            // resolved through the registry, like at manage time
            ClientProperty::TransientFor => self.refresh_transient(conn, screen)?,
            _ => self.hints.refresh(conn, self.client, property)?,
        };
        if !changed {
            return Ok(EventResult::Ignore);
        }
        match property {
            ClientProperty::Name => {
                self.relayout(conn)?;
                if let Some(label) = self.windows.label {
                    self.redraw(conn, label)?;
                }
            }
            ClientProperty::IconName | ClientProperty::TransientFor => {}
            ClientProperty::ManagerHints => {
                if let Some(request) = self.hints.manager_hints {
                    self.change_manager_hints(conn, screen, request)?;
                }
                self.update_policy(conn)?;
            }
            _ => self.update_policy(conn)?,
        }
        Ok(EventResult::Handled)
    }

    pub fn handle_expose(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        event: &ExposeEvent,
    ) -> XResult<EventResult> {
        if event.count > 0 {
            return Ok(EventResult::Ignore);
        }
        let result = self.redraw(conn, event.window).map(|_| EventResult::Handled);
        self.absorb(conn, screen, result)
    }

    /// The client's bounding shape changed
    pub fn handle_shape_notify(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        shaped: bool,
    ) -> XResult<EventResult> {
        if !conn.has_shape() {
            return Ok(EventResult::Ignore);
        }
        self.state.set_shaped(shaped);
        let result = self.apply_shape(conn).map(|_| EventResult::Handled);
        self.absorb(conn, screen, result)
    }

    pub fn handle_client_request(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        request: &ClientRequest,
    ) -> XResult<EventResult> {
        debug!("Client request from 0x{:x}: {:?}", self.client, request);
        let result = match *request {
            ClientRequest::ChangeState(WmState::Iconic) => self.iconify(conn, screen),
            ClientRequest::ChangeState(WmState::Normal) => self.deiconify(conn, screen),
            ClientRequest::ChangeState(WmState::Withdrawn) => return Ok(EventResult::Ignore),
            ClientRequest::ChangeAttributes(hints) => self.change_manager_hints(conn, screen, hints),
        };
        let result = result.map(|_| EventResult::Handled);
        self.absorb(conn, screen, result)
    }

    /// FocusIn / FocusOut on the client
    pub fn handle_focus_change(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        focused: bool,
    ) -> XResult<EventResult> {
        let result = self.set_focus_flag(conn, focused).map(|_| EventResult::Handled);
        self.absorb(conn, screen, result)
    }
}
