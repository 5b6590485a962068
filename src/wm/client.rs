//! Client Module
//!
//! `ManagedWindow` wraps one client in a decorated frame and owns every
//! transition of its visible state. Focus handling lives in `focus.rs`,
//! notification handlers in `events.rs`.

use tracing::{debug, info};
use x11rb::CURRENT_TIME;
use x11rb::protocol::xproto::Window;

use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::client_flags::{AttributeFlags, WmFlags};
use crate::wm::connection::{ClientProperty, ProtocolMessage, WindowSystem, XError, XResult};
use crate::wm::decorations::{ButtonKind, FrameLayout, FrameWindows, Look, Region, paint_region};
use crate::wm::geometry::{Axis, FrameMetrics};
use crate::wm::hints::{ClientHints, ManagerAttributes, ManagerHints, Policy};
use crate::wm::moveresize::{DragEdge, DragState};
use crate::wm::screen::{ManagedSummary, ScreenContext};
use crate::wm::state::{Maximized, WindowState, WmState};

/// A client window under management
#[derive(Debug)]
pub struct ManagedWindow {
    /// X11 window ID of the client
    pub(super) client: Window,

    /// Frame and decoration sub-surfaces
    pub(super) windows: FrameWindows,

    pub(super) config: Config,

    /// Raw hint sources as last read
    pub(super) hints: ClientHints,

    /// Merged policy derived from `hints`
    pub(super) policy: Policy,

    pub(super) metrics: FrameMetrics,
    pub(super) state: WindowState,

    /// Committed frame geometry; its height ignores shading
    pub(super) frame_geometry: Geometry,

    /// Client geometry in root coordinates
    pub(super) client_geometry: Geometry,

    /// Border width the client had before we reparented it
    pub(super) old_border_width: u32,

    /// Whether the client itself is mapped inside the frame
    pub(super) client_mapped: bool,

    /// Frame geometry saved by iconify
    pub(super) saved_geometry: Option<Geometry>,

    /// Frame geometry before the first maximize
    pub(super) premax: Option<Geometry>,

    pub(super) attributes: ManagerAttributes,
    pub(super) window_number: usize,
    pub(super) workspace: u32,

    /// Window this one is transient for
    pub(super) transient_for: Option<Window>,

    /// Window transient for this one
    pub(super) transient: Option<Window>,

    /// Active move or resize
    pub(super) drag: Option<DragState>,

    /// Titlebar button held down
    pub(super) pressed: Option<ButtonKind>,

    /// Timestamp of the last button press
    pub(super) last_press_time: u32,

    /// Time of a titlebar click still eligible for a double click
    pub(super) click_armed: Option<u32>,

    /// UnmapNotify events we caused and must not treat as a withdraw
    pub(super) pending_unmaps: u32,

    /// Title as it fits in the label
    pub(super) label_text: String,
}

impl ManagedWindow {
    /// Take over `client`: read its hints, build and place the frame,
    /// reparent the client into it and enter the initial state.
    pub fn manage(
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        client: Window,
        config: &Config,
    ) -> XResult<Self> {
        let info = conn.client_info(client)?;
        conn.select_client_input(client)?;
        let mut hints = ClientHints::fetch(conn, client)?;

        let parent = transient_parent(screen, client, hints.transient_for);
        hints.transient_for = parent.map(|p| p.client);

        let policy = Policy::merge(&hints);
        let metrics = FrameMetrics::new(&config.decorations, &policy.decorations);

        let (width, height) =
            policy
                .size
                .constrain(info.geometry.width, info.geometry.height, Axis::Width);
        let requested = info.geometry.with_size(width, height);
        let frame_geometry = metrics.place(requested, policy.size.gravity);
        let windows = FrameWindows::create(conn, frame_geometry)?;

        let mut window = Self {
            client,
            windows,
            config: config.clone(),
            transient_for: hints.transient_for,
            hints,
            policy,
            metrics,
            state: WindowState::default(),
            frame_geometry,
            client_geometry: metrics.client_for_frame(frame_geometry),
            old_border_width: info.border_width,
            client_mapped: info.viewable,
            saved_geometry: None,
            premax: None,
            attributes: ManagerAttributes::default(),
            window_number: 0,
            workspace: screen.current_workspace(),
            transient: None,
            drag: None,
            pressed: None,
            last_press_time: CURRENT_TIME,
            click_armed: None,
            pending_unmaps: 0,
            label_text: String::new(),
        };
        window.state.set_modal(policy.modal);
        window.relayout(conn)?;

        conn.set_border_width(client, 0)?;
        conn.change_save_set(client, true)?;
        let (ox, oy) = window.windows.layout().client_offset;
        conn.reparent_window(client, Some(window.windows.frame), ox, oy)?;
        if info.viewable {
            // the reparent unmaps a viewable client once
            window.pending_unmaps += 1;
        }
        conn.move_resize_window(client, Geometry::new(ox, oy, width, height))?;

        if conn.has_shape() && conn.is_shaped(client)? {
            window.state.set_shaped(true);
            window.apply_shape(conn)?;
        }

        if let Some(parent) = parent {
            window.workspace = parent.workspace;
            window.state.set_stuck(parent.stuck);
            screen.link_transient(parent.client, Some(client));
        }
        if let Some(requested) = window.hints.manager_hints {
            window.change_manager_hints(conn, screen, requested)?;
        }
        window.restore_attributes(conn)?;
        screen.assign_workspace(client, window.workspace);

        // a previous manager's WM_STATE wins over the WM_HINTS initial state
        let initial = match conn
            .read_cardinals(client, ClientProperty::WmState)?
            .and_then(|v| v.first().copied())
            .and_then(WmState::from_u32)
        {
            Some(state @ (WmState::Normal | WmState::Iconic)) => state,
            _ => window.policy.initial_state,
        };

        info!(
            "Managing 0x{:x} in frame 0x{:x} at {:?} ({:?})",
            client,
            window.windows.frame,
            window.frame_geometry,
            initial
        );
        window.redraw_all(conn)?;
        match initial {
            WmState::Iconic => {
                window.saved_geometry = Some(window.frame_geometry);
                window.hide(conn, screen, WmState::Iconic)?;
            }
            _ => window.show(conn, screen)?,
        }
        Ok(window)
    }

    pub fn client(&self) -> Window {
        self.client
    }

    pub fn frame(&self) -> Window {
        self.windows.frame
    }

    pub fn windows(&self) -> &FrameWindows {
        &self.windows
    }

    /// Whether `window` is the client or one of our surfaces
    pub fn owns(&self, window: Window) -> bool {
        window == self.client || self.windows.region(window).is_some()
    }

    pub fn title(&self) -> &str {
        &self.hints.title
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn is_focused(&self) -> bool {
        self.state.is_focused()
    }

    pub fn is_visible(&self) -> bool {
        self.state.is_visible()
    }

    pub fn is_iconic(&self) -> bool {
        self.state.is_iconic()
    }

    pub fn is_shaded(&self) -> bool {
        self.state.is_shaded()
    }

    pub fn is_stuck(&self) -> bool {
        self.state.is_stuck()
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn frame_geometry(&self) -> Geometry {
        self.frame_geometry
    }

    pub fn client_geometry(&self) -> Geometry {
        self.client_geometry
    }

    pub fn workspace(&self) -> u32 {
        self.workspace
    }

    pub fn window_number(&self) -> usize {
        self.window_number
    }

    pub fn set_window_number(&mut self, number: usize) {
        self.window_number = number;
    }

    pub fn transient_for(&self) -> Option<Window> {
        self.transient_for
    }

    pub fn transient(&self) -> Option<Window> {
        self.transient
    }

    /// Forward reference, maintained by the registry through `link_transient`
    pub fn set_transient(&mut self, child: Option<Window>) {
        self.transient = child;
    }

    pub fn summary(&self) -> ManagedSummary {
        ManagedSummary {
            client: self.client,
            frame: self.windows.frame,
            workspace: self.workspace,
            stuck: self.state.is_stuck(),
            accepts_focus: self.policy.focus_mode.accepts_focus(),
            modal: self.state.is_modal(),
        }
    }

    pub fn validate_client(&self, conn: &impl WindowSystem) -> bool {
        conn.validate(self.client)
    }

    /// On-screen frame rectangle, collapsed to the titlebar when shaded
    pub fn visible_frame(&self) -> Geometry {
        if self.state.is_shaded() {
            self.frame_geometry
                .with_size(self.frame_geometry.width, self.metrics.shaded_height())
        } else {
            self.frame_geometry
        }
    }

    /// Withdrawn|Iconic -> Normal
    pub fn show(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
    ) -> XResult<()> {
        if self.state.is_visible() {
            return Ok(());
        }
        if !self.validate_client(conn) {
            return Err(XError::Stale(self.client));
        }
        if let Some(saved) = self.saved_geometry.take() {
            if saved != self.frame_geometry {
                self.configure(conn, saved)?;
            }
        }
        if !self.client_mapped {
            conn.map_window(self.client)?;
            self.client_mapped = true;
        }
        conn.map_window(self.windows.frame)?;
        conn.raise_window(self.windows.frame)?;
        self.state.set_lifecycle(WmState::Normal);
        self.persist_state(conn)?;
        debug!("Client 0x{:x} shown", self.client);

        if self.config.behavior.focus_new_windows {
            self.set_input_focus(conn, screen)?;
        }
        Ok(())
    }

    pub fn deiconify(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
    ) -> XResult<()> {
        self.show(conn, screen)
    }

    /// Normal -> Iconic, when iconify is allowed
    pub fn iconify(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
    ) -> XResult<()> {
        if self.state.is_iconic() {
            return Ok(());
        }
        if !self.policy.functions.iconify {
            debug!("Client 0x{:x} may not be iconified", self.client);
            return Ok(());
        }
        self.saved_geometry = Some(self.frame_geometry);
        self.hide(conn, screen, WmState::Iconic)?;
        debug!("Client 0x{:x} iconified", self.client);
        Ok(())
    }

    /// Any state -> Withdrawn. The window stays managed.
    pub fn withdraw(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
    ) -> XResult<()> {
        if self.state.lifecycle() == WmState::Withdrawn && !self.client_mapped {
            return Ok(());
        }
        self.hide(conn, screen, WmState::Withdrawn)?;
        debug!("Client 0x{:x} withdrawn", self.client);
        Ok(())
    }

    fn hide(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        target: WmState,
    ) -> XResult<()> {
        let was_focused = self.state.is_focused();
        self.cancel_drag(conn)?;
        if self.state.is_visible() {
            conn.unmap_window(self.windows.frame)?;
        }
        if self.client_mapped {
            conn.unmap_window(self.client)?;
            self.client_mapped = false;
            self.pending_unmaps += 1;
        }
        self.state.set_lifecycle(target);
        self.persist_state(conn)?;
        screen.hide_menu(self.client);
        if was_focused {
            screen.redirect_focus(self.client, None);
        }
        Ok(())
    }

    /// Ask the client to close through WM_DELETE_WINDOW, or kill it
    pub fn close(&mut self, conn: &impl WindowSystem) -> XResult<()> {
        if !self.policy.functions.close {
            debug!("Client 0x{:x} may not be closed", self.client);
            return Ok(());
        }
        if !self.validate_client(conn) {
            return Err(XError::Stale(self.client));
        }
        if self.hints.protocols.contains(WmFlags::DELETE) {
            debug!("Sending WM_DELETE_WINDOW to 0x{:x}", self.client);
            conn.send_protocol_message(
                self.client,
                ProtocolMessage::DeleteWindow,
                self.last_press_time,
            )
        } else {
            info!("Killing client 0x{:x}", self.client);
            conn.kill_client(self.client)
        }
    }

    /// Toggle shading. The committed frame height is kept for unshading.
    pub fn shade(&mut self, conn: &impl WindowSystem) -> XResult<()> {
        if !self.policy.decorations.titlebar {
            return Ok(());
        }
        let shaded = !self.state.is_shaded();
        self.state.set_shaded(shaded);
        conn.move_resize_window(self.windows.frame, self.visible_frame())?;
        debug!("Client 0x{:x} shaded: {}", self.client, shaded);
        self.persist_attributes(conn)
    }

    /// Maximize per mouse `button`; the same button again restores
    pub fn maximize(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        button: u8,
    ) -> XResult<()> {
        if !self.policy.functions.maximize {
            debug!("Client 0x{:x} may not be maximized", self.client);
            return Ok(());
        }
        let Some(mode) = Maximized::from_button(button) else {
            return Ok(());
        };
        if self.state.maximized() == mode {
            return self.remaximize(conn);
        }
        if self.state.is_shaded() {
            self.shade(conn)?;
        }

        let base = match self.premax {
            Some(premax) if self.state.maximized() != Maximized::None => premax,
            _ => {
                self.premax = Some(self.frame_geometry);
                self.frame_geometry
            }
        };
        let area = screen.usable_area();
        let target = match mode {
            Maximized::Full => area,
            Maximized::Vertical => Geometry::new(base.x, area.y, base.width, area.height),
            Maximized::Horizontal => Geometry::new(area.x, base.y, area.width, base.height),
            Maximized::None => base,
        };
        let target = self
            .metrics
            .constrain(&self.policy.size, target, DragEdge::Right, Axis::Width);

        self.state.set_maximized(mode);
        self.configure(conn, target)?;
        debug!("Client 0x{:x} maximized {:?} to {:?}", self.client, mode, target);
        self.persist_attributes(conn)
    }

    /// Undo a maximize, restoring the geometry saved before it
    pub fn remaximize(&mut self, conn: &impl WindowSystem) -> XResult<()> {
        if self.state.maximized() == Maximized::None {
            return Ok(());
        }
        self.state.set_maximized(Maximized::None);
        if let Some(premax) = self.premax.take() {
            self.configure(conn, premax)?;
        }
        debug!("Client 0x{:x} restored from maximize", self.client);
        self.persist_attributes(conn)
    }

    pub fn stick(&mut self, conn: &impl WindowSystem) -> XResult<()> {
        if self.state.set_stuck(true) {
            debug!("Client 0x{:x} stuck", self.client);
            self.persist_attributes(conn)?;
        }
        Ok(())
    }

    pub fn unstick(&mut self, conn: &impl WindowSystem) -> XResult<()> {
        if self.state.set_stuck(false) {
            debug!("Client 0x{:x} unstuck", self.client);
            self.persist_attributes(conn)?;
        }
        Ok(())
    }

    pub fn set_workspace(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        workspace: u32,
    ) -> XResult<()> {
        self.workspace = workspace;
        screen.assign_workspace(self.client, workspace);
        self.persist_attributes(conn)
    }

    /// Apply an _AREA_HINTS request from the client
    pub fn change_manager_hints(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        request: ManagerHints,
    ) -> XResult<()> {
        if let Some(shaded) = request.requested(AttributeFlags::SHADED) {
            if shaded != self.state.is_shaded() {
                self.shade(conn)?;
            }
        }

        let horizontal = request.requested(AttributeFlags::MAX_HORIZ);
        let vertical = request.requested(AttributeFlags::MAX_VERT);
        if horizontal.is_some() || vertical.is_some() {
            let current = self.state.maximized();
            let wanted = Maximized::from_axes(
                horizontal.unwrap_or(current.horizontal()),
                vertical.unwrap_or(current.vertical()),
            );
            if wanted != current {
                self.remaximize(conn)?;
                if let Some(button) = wanted.button() {
                    self.maximize(conn, screen, button)?;
                }
            }
        }

        match request.requested(AttributeFlags::OMNIPRESENT) {
            Some(true) => self.stick(conn)?,
            Some(false) => self.unstick(conn)?,
            None => {}
        }
        if request.flags.contains(AttributeFlags::WORKSPACE) && request.workspace != self.workspace {
            self.set_workspace(conn, screen, request.workspace)?;
        }
        if request.flags.contains(AttributeFlags::DECORATION) {
            let mut stored = self.hints.manager_hints.unwrap_or_default();
            stored.flags.insert(AttributeFlags::DECORATION);
            stored.decoration = request.decoration;
            self.hints.manager_hints = Some(stored);
            self.update_policy(conn)?;
        }
        Ok(())
    }

    /// Move and resize the frame to `frame`
    pub fn configure(&mut self, conn: &impl WindowSystem, frame: Geometry) -> XResult<()> {
        self.apply_frame(conn, frame, false)
    }

    fn apply_frame(
        &mut self,
        conn: &impl WindowSystem,
        frame: Geometry,
        relayout: bool,
    ) -> XResult<()> {
        let resized = frame.width != self.frame_geometry.width
            || frame.height != self.frame_geometry.height;
        self.frame_geometry = frame;
        self.client_geometry = self.metrics.client_for_frame(frame);

        if resized || relayout {
            self.relayout(conn)?;
            conn.move_resize_window(self.windows.frame, self.visible_frame())?;
            let (ox, oy) = self.windows.layout().client_offset;
            conn.move_resize_window(
                self.client,
                Geometry::new(
                    ox,
                    oy,
                    self.client_geometry.width,
                    self.client_geometry.height,
                ),
            )?;
            self.apply_shape(conn)?;
            self.redraw_all(conn)?;
        } else {
            conn.move_window(self.windows.frame, frame.x, frame.y)?;
        }
        // clients learn their root position only from a synthetic notify
        conn.send_configure_notify(self.client, self.client_geometry)
    }

    /// Pick up new decoration settings, keeping the client anchored by gravity
    pub fn reconfigure(&mut self, conn: &impl WindowSystem, config: &Config) -> XResult<()> {
        self.config = config.clone();
        let old = self.metrics;
        self.metrics = FrameMetrics::new(&self.config.decorations, &self.policy.decorations);
        let frame = self
            .metrics
            .regravitate(&old, self.frame_geometry, self.policy.size.gravity);
        self.apply_frame(conn, frame, true)
    }

    /// Re-merge the hints and apply whatever changed
    pub(super) fn update_policy(&mut self, conn: &impl WindowSystem) -> XResult<()> {
        let policy = Policy::merge(&self.hints);
        if policy == self.policy {
            return Ok(());
        }
        self.policy = policy;
        self.state.set_modal(policy.modal);
        if self.state.is_shaded() && !policy.decorations.titlebar {
            self.state.set_shaded(false);
        }

        let old = self.metrics;
        self.metrics = FrameMetrics::new(&self.config.decorations, &policy.decorations);
        let mut frame = if self.metrics != old {
            self.metrics
                .regravitate(&old, self.frame_geometry, policy.size.gravity)
        } else {
            self.frame_geometry
        };

        let unmaximized =
            !policy.functions.maximize && self.state.set_maximized(Maximized::None);
        if unmaximized {
            debug!("Client 0x{:x} may no longer be maximized", self.client);
            if let Some(premax) = self.premax.take() {
                frame = premax;
            }
        }
        // new size hints apply to the current size too
        let frame = self
            .metrics
            .constrain(&policy.size, frame, DragEdge::Right, Axis::Width);
        self.apply_frame(conn, frame, true)?;
        if unmaximized {
            self.persist_attributes(conn)?;
        }
        Ok(())
    }

    /// Release the client back to the root window and destroy the frame.
    /// Tolerates a client that is already gone.
    pub fn restore(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
        remap: bool,
    ) -> XResult<()> {
        debug!("Releasing client 0x{:x} (remap: {})", self.client, remap);
        screen.cancel_timeout(self.client);
        screen.hide_menu(self.client);
        if let Some(parent) = self.transient_for {
            screen.link_transient(parent, None);
        }
        let was_focused = self.state.is_focused();
        if self.drag.take().is_some() {
            self.state.end_drag();
            conn.ungrab_pointer(CURRENT_TIME)?;
        }

        let released = self.release_client(conn, remap);
        let destroyed = self.windows.destroy(conn);
        self.state.set_lifecycle(WmState::Withdrawn);
        if was_focused {
            screen.redirect_focus(self.client, None);
        }

        match released {
            Err(e) if e.is_stale() => debug!("Client 0x{:x} vanished before release", self.client),
            other => other?,
        }
        destroyed
    }

    fn release_client(&self, conn: &impl WindowSystem, remap: bool) -> XResult<()> {
        let position = self
            .metrics
            .unplace(self.frame_geometry, self.policy.size.gravity);
        if !remap {
            conn.write_cardinals(
                self.client,
                ClientProperty::WmState,
                &[WmState::Withdrawn as u32, 0],
            )?;
        }
        conn.set_border_width(self.client, self.old_border_width)?;
        conn.reparent_window(self.client, None, position.x, position.y)?;
        conn.change_save_set(self.client, false)?;
        if remap {
            conn.map_window(self.client)?;
        }
        Ok(())
    }

    /// Write WM_STATE: the lifecycle code and our icon window
    pub(super) fn persist_state(&self, conn: &impl WindowSystem) -> XResult<()> {
        let icon = self.hints.icon_window().unwrap_or(0);
        conn.write_cardinals(
            self.client,
            ClientProperty::WmState,
            &[self.state.lifecycle() as u32, icon],
        )
    }

    /// Write _AREA_ATTRIBUTES from the current state
    pub(super) fn persist_attributes(&mut self, conn: &impl WindowSystem) -> XResult<()> {
        let maximized = self.state.maximized();
        let mut attributes = ManagerAttributes {
            workspace: self.workspace,
            ..ManagerAttributes::default()
        };
        attributes.set(AttributeFlags::SHADED, self.state.is_shaded());
        attributes.set(AttributeFlags::MAX_HORIZ, maximized.horizontal());
        attributes.set(AttributeFlags::MAX_VERT, maximized.vertical());
        attributes.set(AttributeFlags::OMNIPRESENT, self.state.is_stuck());
        attributes.flags.insert(AttributeFlags::WORKSPACE);
        if let Some(premax) = self.premax {
            attributes.premax_x = premax.x;
            attributes.premax_y = premax.y;
            attributes.premax_width = premax.width;
            attributes.premax_height = premax.height;
        }
        if attributes == self.attributes {
            return Ok(());
        }
        self.attributes = attributes;
        conn.write_cardinals(
            self.client,
            ClientProperty::ManagerAttributes,
            &attributes.to_values(),
        )
    }

    /// Pick up state a previous manager left in _AREA_ATTRIBUTES
    fn restore_attributes(&mut self, conn: &impl WindowSystem) -> XResult<()> {
        let Some(saved) = conn
            .read_cardinals(self.client, ClientProperty::ManagerAttributes)?
            .and_then(|v| ManagerAttributes::from_values(&v))
        else {
            return Ok(());
        };
        debug!("Restoring attributes of 0x{:x}: {:?}", self.client, saved);

        if saved.flags.contains(AttributeFlags::WORKSPACE) {
            self.workspace = saved.workspace;
        }
        if saved.flags.contains(AttributeFlags::OMNIPRESENT) {
            self.state.set_stuck(saved.is_set(AttributeFlags::OMNIPRESENT));
        }

        let maximized = Maximized::from_axes(
            saved.is_set(AttributeFlags::MAX_HORIZ),
            saved.is_set(AttributeFlags::MAX_VERT),
        );
        if maximized != Maximized::None && self.policy.functions.maximize && saved.premax_width > 0
        {
            // the client still has its maximized size; remember where it came from
            self.premax = Some(Geometry::new(
                saved.premax_x,
                saved.premax_y,
                saved.premax_width,
                saved.premax_height,
            ));
            self.state.set_maximized(maximized);
        }

        if saved.is_set(AttributeFlags::SHADED) != self.state.is_shaded() {
            self.shade(conn)?;
        }
        self.attributes = saved;
        self.persist_attributes(conn)
    }

    /// Recompute the layout for the committed frame and sync sub-surfaces
    pub(super) fn relayout(&mut self, conn: &impl WindowSystem) -> XResult<()> {
        let layout = FrameLayout::compute(
            &self.metrics,
            &self.policy.decorations,
            &self.config.decorations.button_layout,
            self.frame_geometry,
        );
        self.windows.sync(conn, &layout)?;
        self.label_text = layout.fit_label(&self.hints.title, self.config.decorations.font_advance);
        Ok(())
    }

    pub(super) fn apply_shape(&self, conn: &impl WindowSystem) -> XResult<()> {
        if !conn.has_shape() {
            return Ok(());
        }
        if self.state.is_shaped() {
            let offset = self.windows.layout().client_offset;
            conn.shape_frame(
                self.windows.frame,
                self.client,
                offset,
                &self.windows.layout().chrome_rects(),
            )
        } else {
            conn.clear_shape(self.windows.frame)
        }
    }

    fn look(&self) -> Look<'_> {
        Look {
            focused: self.state.is_focused(),
            pressed: self.pressed,
            label: &self.label_text,
        }
    }

    /// Repaint one decoration surface
    pub(super) fn redraw(&self, conn: &impl WindowSystem, window: Window) -> XResult<()> {
        let Some(region) = self.windows.region(window) else {
            return Ok(());
        };
        let paint = paint_region(&self.config.colors, region, &self.look());
        conn.paint(window, &paint)
    }

    pub(super) fn redraw_all(&self, conn: &impl WindowSystem) -> XResult<()> {
        for window in self.windows.handles() {
            self.redraw(conn, window)?;
        }
        Ok(())
    }

    pub(super) fn redraw_button(&self, conn: &impl WindowSystem, kind: ButtonKind) -> XResult<()> {
        match self.windows.button(kind) {
            Some(window) => self.redraw(conn, window),
            None => Ok(()),
        }
    }

    /// Abandon a move or resize without committing it
    pub(super) fn cancel_drag(&mut self, conn: &impl WindowSystem) -> XResult<()> {
        if self.drag.take().is_some() {
            self.state.end_drag();
            conn.ungrab_pointer(CURRENT_TIME)?;
            if self.config.behavior.opaque_move {
                // put the frame back where the committed geometry says
                conn.move_resize_window(self.windows.frame, self.visible_frame())?;
            }
            debug!("Drag on 0x{:x} cancelled", self.client);
        }
        Ok(())
    }

    pub(super) fn region_of(&self, window: Window) -> Option<Region> {
        if window == self.client {
            Some(Region::Client)
        } else {
            self.windows.region(window)
        }
    }

    /// Re-read WM_TRANSIENT_FOR and move the parent link.
    /// Returns whether the resolved parent changed.
    pub(super) fn refresh_transient(
        &mut self,
        conn: &impl WindowSystem,
        screen: &mut impl ScreenContext,
    ) -> XResult<bool> {
        self.hints
            .refresh(conn, self.client, ClientProperty::TransientFor)?;
        let parent = transient_parent(screen, self.client, self.hints.transient_for);
        self.hints.transient_for = parent.map(|p| p.client);
        if self.hints.transient_for == self.transient_for {
            return Ok(false);
        }

        if let Some(old) = self.transient_for {
            screen.link_transient(old, None);
        }
        if let Some(parent) = parent {
            screen.link_transient(parent.client, Some(self.client));
        }
        debug!(
            "Client 0x{:x} transient for {:?}",
            self.client, self.hints.transient_for
        );
        self.transient_for = self.hints.transient_for;
        self.update_policy(conn)?;
        Ok(true)
    }
}

/// The managed window `declared` names as transient parent. Unmanaged
/// parents and the client itself do not count.
fn transient_parent(
    screen: &impl ScreenContext,
    client: Window,
    declared: Option<Window>,
) -> Option<ManagedSummary> {
    let declared = declared?;
    let parent = screen
        .find_managed(declared)
        .filter(|p| p.client != client);
    if parent.is_none() {
        debug!("Transient parent 0x{:x} of 0x{:x} is not managed", declared, client);
    }
    parent
}
