//! In-memory window system and screen used by the unit tests

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use x11rb::protocol::xproto::Window;

use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::client::ManagedWindow;
use crate::wm::client_flags::WmFlags;
use crate::wm::connection::{
    ClientInfo, ClientProperty, ProtocolMessage, SurfaceKind, WindowSystem, XError, XResult,
};
use crate::wm::decorations::Paint;
use crate::wm::screen::{ManagedSummary, ScreenContext};

/// One recorded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Create(Window, Option<Window>, SurfaceKind, Geometry),
    Destroy(Window),
    Map(Window),
    Unmap(Window),
    Raise(Window),
    Lower(Window),
    Move(Window, i32, i32),
    MoveResize(Window, Geometry),
    Reparent(Window, Option<Window>, i32, i32),
    BorderWidth(Window, u32),
    SaveSet(Window, bool),
    SelectInput(Window),
    WriteProperty(Window, ClientProperty, Vec<u32>),
    Protocol(Window, ProtocolMessage, u32),
    ConfigureNotify(Window, Geometry),
    SetFocus(Window),
    Colormap(Window, bool),
    Kill(Window),
    Grab(Window),
    Ungrab,
    Replay,
    Paint(Window, Paint),
    Shape(Window),
    ClearShape(Window),
}

#[derive(Debug, Default)]
struct Properties {
    text: HashMap<(Window, ClientProperty), String>,
    cardinals: HashMap<(Window, ClientProperty), Vec<u32>>,
    windows: HashMap<(Window, ClientProperty), Window>,
    protocols: HashMap<Window, WmFlags>,
}

/// Records every request; clients answer from a property table
#[derive(Debug)]
pub struct RecordingConnection {
    next_id: Cell<Window>,
    clients: RefCell<HashMap<Window, ClientInfo>>,
    stale: RefCell<HashSet<Window>>,
    properties: RefCell<Properties>,
    requests: RefCell<Vec<Request>>,
    reads: RefCell<Vec<(Window, ClientProperty)>>,
    shape: Cell<bool>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0x100),
            clients: RefCell::new(HashMap::new()),
            stale: RefCell::new(HashSet::new()),
            properties: RefCell::new(Properties::default()),
            requests: RefCell::new(Vec::new()),
            reads: RefCell::new(Vec::new()),
            shape: Cell::new(false),
        }
    }

    fn allocate(&self) -> Window {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// A mapped top-level client without border
    pub fn add_client(&self, geometry: Geometry) -> Window {
        let id = self.allocate() | 0x40_0000;
        self.clients.borrow_mut().insert(
            id,
            ClientInfo {
                geometry,
                border_width: 0,
                viewable: true,
            },
        );
        id
    }

    /// Every later request about `window` fails as stale
    pub fn destroy_client(&self, window: Window) {
        self.stale.borrow_mut().insert(window);
    }

    pub fn enable_shape(&self) {
        self.shape.set(true);
    }

    pub fn set_text(&self, window: Window, property: ClientProperty, text: &str) {
        self.properties
            .borrow_mut()
            .text
            .insert((window, property), text.to_string());
    }

    pub fn set_cardinals(&self, window: Window, property: ClientProperty, values: &[u32]) {
        self.properties
            .borrow_mut()
            .cardinals
            .insert((window, property), values.to_vec());
    }

    pub fn set_window_property(&self, window: Window, property: ClientProperty, value: Window) {
        self.properties
            .borrow_mut()
            .windows
            .insert((window, property), value);
    }

    pub fn set_protocols(&self, window: Window, protocols: WmFlags) {
        self.properties
            .borrow_mut()
            .protocols
            .insert(window, protocols);
    }

    pub fn cardinals(&self, window: Window, property: ClientProperty) -> Option<Vec<u32>> {
        self.properties
            .borrow()
            .cardinals
            .get(&(window, property))
            .cloned()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }

    /// Property reads since the last `clear_requests`
    pub fn reads(&self) -> Vec<(Window, ClientProperty)> {
        self.reads.borrow().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
        self.reads.borrow_mut().clear();
    }

    fn check(&self, window: Window) -> XResult<()> {
        if self.stale.borrow().contains(&window) {
            Err(XError::Stale(window))
        } else {
            Ok(())
        }
    }

    fn record(&self, window: Window, request: Request) -> XResult<()> {
        self.check(window)?;
        self.requests.borrow_mut().push(request);
        Ok(())
    }

    fn read(&self, window: Window, property: ClientProperty) -> XResult<()> {
        self.check(window)?;
        self.reads.borrow_mut().push((window, property));
        Ok(())
    }
}

impl WindowSystem for RecordingConnection {
    fn create_surface(
        &self,
        parent: Option<Window>,
        kind: SurfaceKind,
        geometry: Geometry,
    ) -> XResult<Window> {
        let id = self.allocate();
        self.requests
            .borrow_mut()
            .push(Request::Create(id, parent, kind, geometry));
        Ok(id)
    }

    fn destroy_surface(&self, window: Window) -> XResult<()> {
        self.record(window, Request::Destroy(window))
    }

    fn map_window(&self, window: Window) -> XResult<()> {
        self.record(window, Request::Map(window))
    }

    fn unmap_window(&self, window: Window) -> XResult<()> {
        self.record(window, Request::Unmap(window))
    }

    fn raise_window(&self, window: Window) -> XResult<()> {
        self.record(window, Request::Raise(window))
    }

    fn lower_window(&self, window: Window) -> XResult<()> {
        self.record(window, Request::Lower(window))
    }

    fn move_window(&self, window: Window, x: i32, y: i32) -> XResult<()> {
        self.record(window, Request::Move(window, x, y))
    }

    fn move_resize_window(&self, window: Window, geometry: Geometry) -> XResult<()> {
        self.record(window, Request::MoveResize(window, geometry))
    }

    fn reparent_window(
        &self,
        window: Window,
        parent: Option<Window>,
        x: i32,
        y: i32,
    ) -> XResult<()> {
        self.record(window, Request::Reparent(window, parent, x, y))?;
        if parent.is_none() {
            if let Some(info) = self.clients.borrow_mut().get_mut(&window) {
                info.geometry = info.geometry.with_position(x, y);
            }
        }
        Ok(())
    }

    fn set_border_width(&self, window: Window, width: u32) -> XResult<()> {
        self.record(window, Request::BorderWidth(window, width))
    }

    fn change_save_set(&self, window: Window, insert: bool) -> XResult<()> {
        self.record(window, Request::SaveSet(window, insert))
    }

    fn select_client_input(&self, window: Window) -> XResult<()> {
        self.record(window, Request::SelectInput(window))
    }

    fn client_info(&self, window: Window) -> XResult<ClientInfo> {
        self.check(window)?;
        self.clients
            .borrow()
            .get(&window)
            .copied()
            .ok_or(XError::Stale(window))
    }

    fn read_text(&self, window: Window, property: ClientProperty) -> XResult<Option<String>> {
        self.read(window, property)?;
        Ok(self.properties.borrow().text.get(&(window, property)).cloned())
    }

    fn read_cardinals(
        &self,
        window: Window,
        property: ClientProperty,
    ) -> XResult<Option<Vec<u32>>> {
        self.read(window, property)?;
        Ok(self.cardinals(window, property))
    }

    fn read_window(&self, window: Window, property: ClientProperty) -> XResult<Option<Window>> {
        self.read(window, property)?;
        Ok(self
            .properties
            .borrow()
            .windows
            .get(&(window, property))
            .copied())
    }

    fn read_protocols(&self, window: Window) -> XResult<WmFlags> {
        self.read(window, ClientProperty::Protocols)?;
        Ok(self
            .properties
            .borrow()
            .protocols
            .get(&window)
            .copied()
            .unwrap_or_default())
    }

    fn write_cardinals(
        &self,
        window: Window,
        property: ClientProperty,
        values: &[u32],
    ) -> XResult<()> {
        self.record(
            window,
            Request::WriteProperty(window, property, values.to_vec()),
        )?;
        self.set_cardinals(window, property, values);
        Ok(())
    }

    fn send_protocol_message(
        &self,
        window: Window,
        message: ProtocolMessage,
        time: u32,
    ) -> XResult<()> {
        self.record(window, Request::Protocol(window, message, time))
    }

    fn send_configure_notify(&self, window: Window, geometry: Geometry) -> XResult<()> {
        self.record(window, Request::ConfigureNotify(window, geometry))
    }

    fn set_input_focus(&self, window: Window, _time: u32) -> XResult<()> {
        self.record(window, Request::SetFocus(window))
    }

    fn install_colormap(&self, window: Window, install: bool) -> XResult<()> {
        self.record(window, Request::Colormap(window, install))
    }

    fn kill_client(&self, window: Window) -> XResult<()> {
        self.record(window, Request::Kill(window))
    }

    fn grab_pointer(&self, window: Window, _time: u32) -> XResult<()> {
        self.record(window, Request::Grab(window))
    }

    fn ungrab_pointer(&self, _time: u32) -> XResult<()> {
        self.requests.borrow_mut().push(Request::Ungrab);
        Ok(())
    }

    fn replay_pointer(&self, _time: u32) -> XResult<()> {
        self.requests.borrow_mut().push(Request::Replay);
        Ok(())
    }

    fn paint(&self, window: Window, paint: &Paint) -> XResult<()> {
        self.record(window, Request::Paint(window, paint.clone()))
    }

    fn has_shape(&self) -> bool {
        self.shape.get()
    }

    fn is_shaped(&self, window: Window) -> XResult<bool> {
        self.check(window)?;
        Ok(false)
    }

    fn shape_frame(
        &self,
        frame: Window,
        client: Window,
        _offset: (i32, i32),
        _extra: &[Geometry],
    ) -> XResult<()> {
        self.check(client)?;
        self.record(frame, Request::Shape(frame))
    }

    fn clear_shape(&self, frame: Window) -> XResult<()> {
        self.record(frame, Request::ClearShape(frame))
    }

    fn validate(&self, window: Window) -> bool {
        !self.stale.borrow().contains(&window)
    }
}

/// Registry stand-in with inspectable side effects
#[derive(Debug)]
pub struct FakeScreen {
    pub area: Geometry,
    pub current: u32,
    pub managed: HashMap<Window, ManagedSummary>,
    pub workspaces: HashMap<Window, u32>,
    pub links: Vec<(Window, Option<Window>)>,
    /// true while a timer is armed, false once cancelled
    pub timers: HashMap<Window, bool>,
    pub menu: Option<(Window, i32, i32)>,
    pub redirects: Vec<(Window, Option<Window>)>,
}

impl FakeScreen {
    pub fn new() -> Self {
        Self {
            area: Geometry::new(0, 0, 1280, 1024),
            current: 0,
            managed: HashMap::new(),
            workspaces: HashMap::new(),
            links: Vec::new(),
            timers: HashMap::new(),
            menu: None,
            redirects: Vec::new(),
        }
    }
}

impl ScreenContext for FakeScreen {
    fn find_managed(&self, handle: Window) -> Option<ManagedSummary> {
        self.managed
            .values()
            .find(|s| s.client == handle || s.frame == handle)
            .copied()
    }

    fn link_transient(&mut self, parent: Window, child: Option<Window>) {
        self.links.push((parent, child));
    }

    fn usable_area(&self) -> Geometry {
        self.area
    }

    fn current_workspace(&self) -> u32 {
        self.current
    }

    fn assign_workspace(&mut self, client: Window, workspace: u32) {
        self.workspaces.insert(client, workspace);
    }

    fn schedule_timeout(&mut self, client: Window, _after: Duration) {
        self.timers.insert(client, true);
    }

    fn cancel_timeout(&mut self, client: Window) {
        self.timers.insert(client, false);
    }

    fn show_menu(&mut self, client: Window, x: i32, y: i32) {
        self.menu = Some((client, x, y));
    }

    fn hide_menu(&mut self, client: Window) {
        if matches!(self.menu, Some((c, _, _)) if c == client) {
            self.menu = None;
        }
    }

    fn redirect_focus(&mut self, from: Window, to: Option<Window>) {
        self.redirects.push((from, to));
    }
}

/// Manage `client` with the default configuration
pub fn manage_with(
    conn: &RecordingConnection,
    screen: &mut FakeScreen,
    client: Window,
) -> ManagedWindow {
    ManagedWindow::manage(conn, screen, client, &Config::default()).unwrap()
}
