//! Connection Module
//!
//! The narrow set of windowing-system requests a managed window needs.
//! `display::X11Display` implements it on top of x11rb; tests use an
//! in-memory recorder.

use thiserror::Error;
use x11rb::errors::{ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::ErrorKind;
use x11rb::protocol::xproto::Window;

use crate::shared::Geometry;
use crate::wm::client_flags::WmFlags;
use crate::wm::decorations::{ButtonKind, Paint};
use crate::wm::moveresize::DragEdge;

/// Errors reported by the windowing system
#[derive(Debug, Error)]
pub enum XError {
    /// The window was destroyed behind our back
    #[error("window 0x{0:x} no longer exists")]
    Stale(Window),

    #[error("X11 connection failed: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X11 request failed: {0:?}")]
    Request(x11rb::x11_utils::X11Error),

    #[error("ran out of X11 resource ids")]
    IdsExhausted,
}

impl XError {
    /// Map a reply error for a request about `window`. Window, drawable and
    /// match errors mean the client vanished.
    pub fn from_reply(window: Window, err: ReplyError) -> Self {
        match err {
            ReplyError::ConnectionError(e) => XError::Connection(e),
            ReplyError::X11Error(e) => match e.error_kind {
                ErrorKind::Window | ErrorKind::Drawable | ErrorKind::Match => XError::Stale(window),
                _ => XError::Request(e),
            },
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, XError::Stale(_))
    }
}

impl From<ReplyOrIdError> for XError {
    fn from(err: ReplyOrIdError) -> Self {
        match err {
            ReplyOrIdError::IdsExhausted => XError::IdsExhausted,
            ReplyOrIdError::ConnectionError(e) => XError::Connection(e),
            ReplyOrIdError::X11Error(e) => XError::Request(e),
        }
    }
}

pub type XResult<T> = Result<T, XError>;

/// Client properties the controller reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientProperty {
    /// WM_NAME / _NET_WM_NAME
    Name,
    /// WM_ICON_NAME / _NET_WM_ICON_NAME
    IconName,
    /// WM_NORMAL_HINTS
    NormalHints,
    /// WM_HINTS
    Hints,
    /// WM_PROTOCOLS
    Protocols,
    /// _MOTIF_WM_HINTS
    MotifHints,
    /// _AREA_HINTS, set by the client
    ManagerHints,
    /// _AREA_ATTRIBUTES, set by us
    ManagerAttributes,
    /// WM_TRANSIENT_FOR
    TransientFor,
    /// WM_STATE
    WmState,
}

/// Role of a manager-created window; selects cursor and event mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Frame,
    Title,
    Label,
    Button(ButtonKind),
    Handle,
    Grip(DragEdge),
}

/// What the server reports about a client before we manage it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientInfo {
    /// Root-relative geometry
    pub geometry: Geometry,
    pub border_width: u32,
    /// Mapped at the time of the query
    pub viewable: bool,
}

/// Client messages sent through WM_PROTOCOLS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMessage {
    DeleteWindow,
    TakeFocus,
}

/// Requests a managed window issues against the windowing system.
///
/// Requests that only touch manager-owned windows are fire-and-forget;
/// failures writing to a vanished client surface as `XError::Stale`.
pub trait WindowSystem {
    /// Create a frame (parent `None`, top-level) or a frame child
    fn create_surface(
        &self,
        parent: Option<Window>,
        kind: SurfaceKind,
        geometry: Geometry,
    ) -> XResult<Window>;
    fn destroy_surface(&self, window: Window) -> XResult<()>;

    fn map_window(&self, window: Window) -> XResult<()>;
    fn unmap_window(&self, window: Window) -> XResult<()>;
    fn raise_window(&self, window: Window) -> XResult<()>;
    fn lower_window(&self, window: Window) -> XResult<()>;
    fn move_window(&self, window: Window, x: i32, y: i32) -> XResult<()>;
    fn move_resize_window(&self, window: Window, geometry: Geometry) -> XResult<()>;
    fn reparent_window(&self, window: Window, parent: Option<Window>, x: i32, y: i32)
    -> XResult<()>;
    fn set_border_width(&self, window: Window, width: u32) -> XResult<()>;
    fn change_save_set(&self, window: Window, insert: bool) -> XResult<()>;
    /// Start receiving property, structure and shape notifications for a client
    fn select_client_input(&self, window: Window) -> XResult<()>;

    fn client_info(&self, window: Window) -> XResult<ClientInfo>;
    fn read_text(&self, window: Window, property: ClientProperty) -> XResult<Option<String>>;
    fn read_cardinals(&self, window: Window, property: ClientProperty)
    -> XResult<Option<Vec<u32>>>;
    fn read_window(&self, window: Window, property: ClientProperty) -> XResult<Option<Window>>;
    fn read_protocols(&self, window: Window) -> XResult<WmFlags>;
    fn write_cardinals(&self, window: Window, property: ClientProperty, values: &[u32])
    -> XResult<()>;

    fn send_protocol_message(&self, window: Window, message: ProtocolMessage, time: u32)
    -> XResult<()>;
    /// Synthetic ConfigureNotify carrying the client's root-relative geometry
    fn send_configure_notify(&self, window: Window, geometry: Geometry) -> XResult<()>;
    fn set_input_focus(&self, window: Window, time: u32) -> XResult<()>;
    fn install_colormap(&self, window: Window, install: bool) -> XResult<()>;
    fn kill_client(&self, window: Window) -> XResult<()>;

    fn grab_pointer(&self, window: Window, time: u32) -> XResult<()>;
    fn ungrab_pointer(&self, time: u32) -> XResult<()>;
    /// Release a click frozen by the client's passive button grab
    fn replay_pointer(&self, time: u32) -> XResult<()>;

    fn paint(&self, window: Window, paint: &Paint) -> XResult<()>;

    /// Whether the SHAPE extension is available
    fn has_shape(&self) -> bool;
    fn is_shaped(&self, window: Window) -> XResult<bool>;
    /// Set the frame's bounding shape to the client's shape at `offset`,
    /// united with the decoration rectangles in `extra`
    fn shape_frame(
        &self,
        frame: Window,
        client: Window,
        offset: (i32, i32),
        extra: &[Geometry],
    ) -> XResult<()>;
    fn clear_shape(&self, frame: Window) -> XResult<()>;

    /// Quick liveness probe for a client
    fn validate(&self, window: Window) -> bool;
}
