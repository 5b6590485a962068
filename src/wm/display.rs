//! Display Module
//!
//! The X11 connection, atoms, cursors and drawing resources, and the
//! `WindowSystem` implementation the managed windows run against.
//! Also turns raw x11rb events into `WindowEvent`s.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, trace};
use x11rb::connection::{Connection, RequestConnection as _};
use x11rb::protocol::Event;
use x11rb::protocol::shape::{self, ConnectionExt as _, SK, SO};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{COPY_DEPTH_FROM_PARENT, COPY_FROM_PARENT, NONE};

use crate::shared::Geometry;
use crate::wm::client_flags::WmFlags;
use crate::wm::connection::{
    ClientInfo, ClientProperty, ProtocolMessage, SurfaceKind, WindowSystem, XError, XResult,
};
use crate::wm::decorations::{Glyph, Paint};
use crate::wm::events::{
    ButtonEvent, ClientRequest, ConfigureMask, ConfigureRequest, ExposeEvent, MotionEvent,
    PropertyEvent, StackRequest, WindowEvent,
};
use crate::wm::ewmh::Atoms;
use crate::wm::hints::ManagerHints;
use crate::wm::moveresize::DragEdge;
use crate::wm::state::WmState;

/// Glyphs of the core "cursor" font
const XC_FLEUR: u16 = 52;
const XC_LEFT_PTR: u16 = 68;
const XC_LL_ANGLE: u16 = 76;
const XC_LR_ANGLE: u16 = 78;

/// Longest property we read, in 32-bit units
const PROPERTY_LENGTH: u32 = 1024;

/// Cursor management
#[derive(Debug, Clone, Copy)]
pub struct Cursors {
    pub normal: Cursor,
    pub moving: Cursor,
    pub resize_left: Cursor,
    pub resize_right: Cursor,
}

impl Cursors {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        let font = conn.generate_id()?;
        conn.open_font(font, b"cursor")?;

        let create_cursor = |glyph: u16| -> Result<Cursor> {
            let cursor = conn.generate_id()?;
            conn.create_glyph_cursor(
                cursor,
                font,
                font,
                glyph,
                glyph + 1,
                0,
                0,
                0,
                0xffff,
                0xffff,
                0xffff,
            )?;
            Ok(cursor)
        };

        let cursors = Self {
            normal: create_cursor(XC_LEFT_PTR)?,
            moving: create_cursor(XC_FLEUR)?,
            resize_left: create_cursor(XC_LL_ANGLE)?,
            resize_right: create_cursor(XC_LR_ANGLE)?,
        };
        conn.close_font(font)?;
        Ok(cursors)
    }
}

/// Live X11 backend for managed windows
pub struct X11Display {
    pub conn: Arc<RustConnection>,
    pub root: Window,
    pub atoms: Atoms,
    pub cursors: Cursors,
    /// Graphics context with the label font
    gc: Gcontext,
    font_ascent: i16,
    /// First event code of the SHAPE extension, when present
    shape_event: Option<u8>,
}

impl X11Display {
    /// Set up atoms, cursors and the drawing context on `root`
    pub fn new(conn: Arc<RustConnection>, root: Window, font: &str) -> Result<Self> {
        let atoms = Atoms::new(conn.as_ref()).context("Failed to intern atoms")?;
        let cursors = Cursors::new(&conn).context("Failed to create cursors")?;

        let font_id = conn.generate_id()?;
        conn.open_font(font_id, font.as_bytes())?;
        let font_ascent = conn
            .query_font(font_id)?
            .reply()
            .with_context(|| format!("Failed to query font {}", font))?
            .font_ascent;
        let gc = conn.generate_id()?;
        conn.create_gc(
            gc,
            root,
            &CreateGCAux::new().font(font_id).graphics_exposures(0),
        )?;

        let shape_event = conn
            .extension_information(shape::X11_EXTENSION_NAME)?
            .map(|info| info.first_event);
        match shape_event {
            Some(_) => info!("SHAPE extension available"),
            None => info!("SHAPE extension missing, frames stay rectangular"),
        }

        Ok(Self {
            conn,
            root,
            atoms,
            cursors,
            gc,
            font_ascent,
            shape_event,
        })
    }

    /// Take substructure redirect on the root; fails if another manager holds it
    pub fn become_manager(&self) -> Result<()> {
        let mask = EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY;
        self.conn
            .change_window_attributes(
                self.root,
                &ChangeWindowAttributesAux::new()
                    .event_mask(mask)
                    .cursor(self.cursors.normal),
            )?
            .check()
            .context("Another window manager is already running")?;
        info!("Managing root window 0x{:x}", self.root);
        Ok(())
    }

    /// Mapped top-level windows that want a frame
    pub fn existing_clients(&self) -> Result<Vec<Window>> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        let mut clients = Vec::new();
        for child in tree.children {
            let Ok(attributes) = self.conn.get_window_attributes(child)?.reply() else {
                continue;
            };
            if !attributes.override_redirect && attributes.map_state == MapState::VIEWABLE {
                clients.push(child);
            }
        }
        debug!("Found {} existing clients", clients.len());
        Ok(clients)
    }

    /// Grant a ConfigureRequest from a window nobody manages
    pub fn configure_unmanaged(&self, request: &ConfigureRequest) -> XResult<()> {
        let mask = request.mask;
        let mut aux = ConfigureWindowAux::new();
        if mask.contains(ConfigureMask::X) {
            aux = aux.x(request.x);
        }
        if mask.contains(ConfigureMask::Y) {
            aux = aux.y(request.y);
        }
        if mask.contains(ConfigureMask::WIDTH) {
            aux = aux.width(request.width);
        }
        if mask.contains(ConfigureMask::HEIGHT) {
            aux = aux.height(request.height);
        }
        if mask.contains(ConfigureMask::BORDER_WIDTH) {
            aux = aux.border_width(request.border_width);
        }
        match request.stack {
            StackRequest::Above => aux = aux.stack_mode(StackMode::ABOVE),
            StackRequest::Below => aux = aux.stack_mode(StackMode::BELOW),
            StackRequest::None => {}
        }
        self.conn.configure_window(request.window, &aux)?;
        Ok(())
    }

    /// Nobody is left to take focus
    pub fn focus_root(&self) -> XResult<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, InputFocus::POINTER_ROOT, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    pub fn flush(&self) -> XResult<()> {
        self.conn.flush()?;
        Ok(())
    }

    /// Usable area of the root screen
    pub fn screen_area(&self, screen_num: usize) -> Geometry {
        let screen = &self.conn.setup().roots[screen_num];
        Geometry::new(
            0,
            0,
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        )
    }

    fn get_property(&self, window: Window, atom: Atom) -> XResult<GetPropertyReply> {
        self.conn
            .get_property(false, window, atom, AtomEnum::ANY, 0, PROPERTY_LENGTH)?
            .reply()
            .map_err(|e| XError::from_reply(window, e))
    }

    fn configure(&self, window: Window, aux: &ConfigureWindowAux) -> XResult<()> {
        self.conn.configure_window(window, aux)?;
        Ok(())
    }

    fn surface_mask(kind: SurfaceKind) -> EventMask {
        let pointer = EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::BUTTON_MOTION;
        match kind {
            SurfaceKind::Frame => {
                pointer
                    | EventMask::EXPOSURE
                    | EventMask::SUBSTRUCTURE_REDIRECT
                    | EventMask::FOCUS_CHANGE
            }
            _ => pointer | EventMask::EXPOSURE,
        }
    }

    fn surface_cursor(&self, kind: SurfaceKind) -> Cursor {
        match kind {
            SurfaceKind::Grip(DragEdge::Left) => self.cursors.resize_left,
            SurfaceKind::Grip(DragEdge::Right) => self.cursors.resize_right,
            _ => self.cursors.normal,
        }
    }

    fn draw_glyph(&self, window: Window, glyph: &Glyph) -> XResult<()> {
        let (width, height) = match glyph {
            Glyph::None | Glyph::Grip => return Ok(()),
            _ => {
                let geometry = self
                    .conn
                    .get_geometry(window)?
                    .reply()
                    .map_err(|e| XError::from_reply(window, e))?;
                (geometry.width as i16, geometry.height as i16)
            }
        };
        match glyph {
            Glyph::Text(text) => {
                let baseline = (height + self.font_ascent) / 2;
                let bytes: Vec<u8> = text.chars().map(|c| if c.is_ascii() { c as u8 } else { b'?' }).collect();
                self.conn.image_text8(window, self.gc, 2, baseline, &bytes)?;
            }
            Glyph::Close => {
                let (l, t, r, b) = (4, 4, width - 5, height - 5);
                self.conn.poly_segment(
                    window,
                    self.gc,
                    &[
                        Segment { x1: l, y1: t, x2: r, y2: b },
                        Segment { x1: r, y1: t, x2: l, y2: b },
                    ],
                )?;
            }
            Glyph::Iconify => {
                self.conn.poly_fill_rectangle(
                    window,
                    self.gc,
                    &[Rectangle {
                        x: 4,
                        y: height - 6,
                        width: (width - 8).max(1) as u16,
                        height: 2,
                    }],
                )?;
            }
            Glyph::Maximize => {
                let w = (width - 9).max(1) as u16;
                let h = (height - 9).max(1) as u16;
                self.conn.poly_rectangle(
                    window,
                    self.gc,
                    &[Rectangle { x: 4, y: 4, width: w, height: h }],
                )?;
                self.conn.poly_segment(
                    window,
                    self.gc,
                    &[Segment { x1: 4, y1: 5, x2: 4 + w as i16, y2: 5 }],
                )?;
            }
            Glyph::None | Glyph::Grip => {}
        }
        Ok(())
    }

    /// Map a raw event to a window event; `None` for anything the
    /// managed windows do not handle
    pub fn translate(&self, event: &Event) -> Option<WindowEvent> {
        let translated = match event {
            Event::ButtonPress(e) => WindowEvent::ButtonPress(button_event(e)),
            Event::ButtonRelease(e) => WindowEvent::ButtonRelease(button_event(e)),
            Event::MotionNotify(e) => WindowEvent::Motion(MotionEvent {
                window: e.event,
                time: e.time,
                root_x: i32::from(e.root_x),
                root_y: i32::from(e.root_y),
            }),
            Event::ConfigureRequest(e) => WindowEvent::ConfigureRequest(ConfigureRequest {
                window: e.window,
                mask: ConfigureMask::from_bits_truncate(u16::from(e.value_mask)),
                x: i32::from(e.x),
                y: i32::from(e.y),
                width: u32::from(e.width),
                height: u32::from(e.height),
                border_width: u32::from(e.border_width),
                stack: match e.stack_mode {
                    StackMode::ABOVE => StackRequest::Above,
                    StackMode::BELOW => StackRequest::Below,
                    _ => StackRequest::None,
                },
            }),
            Event::MapRequest(e) => WindowEvent::MapRequest(e.window),
            // reported once through the client's own structure mask; a
            // synthetic one is an ICCCM withdraw
            Event::UnmapNotify(e) if e.event == e.window || e.response_type & 0x80 != 0 => {
                WindowEvent::Unmap(e.window)
            }
            Event::DestroyNotify(e) if e.event == e.window => WindowEvent::Destroy(e.window),
            Event::ReparentNotify(e) if e.event == e.window => WindowEvent::Reparent {
                window: e.window,
                parent: e.parent,
            },
            Event::PropertyNotify(e) => WindowEvent::Property(PropertyEvent {
                window: e.window,
                property: self.atoms.classify(e.atom)?,
            }),
            Event::Expose(e) => WindowEvent::Expose(ExposeEvent {
                window: e.window,
                count: e.count,
            }),
            Event::ShapeNotify(e) if e.shape_kind == SK::BOUNDING => WindowEvent::Shape {
                window: e.affected_window,
                shaped: e.shaped,
            },
            Event::ClientMessage(e) if e.format == 32 => {
                let data = e.data.as_data32();
                let request = if e.type_ == self.atoms.wm_change_state {
                    ClientRequest::ChangeState(WmState::from_u32(data[0])?)
                } else if e.type_ == self.atoms.area_change_attributes {
                    ClientRequest::ChangeAttributes(ManagerHints::from_values(&data)?)
                } else {
                    return None;
                };
                WindowEvent::ClientMessage(e.window, request)
            }
            Event::FocusIn(e) if focus_counts(e.mode, e.detail) => WindowEvent::Focus {
                window: e.event,
                focused: true,
            },
            Event::FocusOut(e) if focus_counts(e.mode, e.detail) => WindowEvent::Focus {
                window: e.event,
                focused: false,
            },
            _ => return None,
        };
        trace!("Translated {:?}", translated);
        Some(translated)
    }
}

fn button_event(e: &ButtonPressEvent) -> ButtonEvent {
    ButtonEvent {
        window: e.event,
        button: e.detail,
        time: e.time,
        root_x: i32::from(e.root_x),
        root_y: i32::from(e.root_y),
        event_x: i32::from(e.event_x),
        event_y: i32::from(e.event_y),
    }
}

/// Focus changes caused by grabs or pointer position are not real changes
fn focus_counts(mode: NotifyMode, detail: NotifyDetail) -> bool {
    mode != NotifyMode::GRAB && mode != NotifyMode::UNGRAB && detail != NotifyDetail::POINTER
}

fn rectangle(geometry: &Geometry) -> Rectangle {
    Rectangle {
        x: geometry.x as i16,
        y: geometry.y as i16,
        width: geometry.width as u16,
        height: geometry.height as u16,
    }
}

impl WindowSystem for X11Display {
    fn create_surface(
        &self,
        parent: Option<Window>,
        kind: SurfaceKind,
        geometry: Geometry,
    ) -> XResult<Window> {
        let window = self.conn.generate_id()?;
        let aux = CreateWindowAux::new()
            .background_pixel(0)
            .override_redirect(u32::from(kind == SurfaceKind::Frame))
            .event_mask(Self::surface_mask(kind))
            .cursor(self.surface_cursor(kind));
        self.conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            parent.unwrap_or(self.root),
            geometry.x as i16,
            geometry.y as i16,
            geometry.width.max(1) as u16,
            geometry.height.max(1) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            COPY_FROM_PARENT,
            &aux,
        )?;
        trace!("Created {:?} surface 0x{:x}", kind, window);
        Ok(window)
    }

    fn destroy_surface(&self, window: Window) -> XResult<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn map_window(&self, window: Window) -> XResult<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap_window(&self, window: Window) -> XResult<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn raise_window(&self, window: Window) -> XResult<()> {
        self.configure(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
    }

    fn lower_window(&self, window: Window) -> XResult<()> {
        self.configure(window, &ConfigureWindowAux::new().stack_mode(StackMode::BELOW))
    }

    fn move_window(&self, window: Window, x: i32, y: i32) -> XResult<()> {
        self.configure(window, &ConfigureWindowAux::new().x(x).y(y))
    }

    fn move_resize_window(&self, window: Window, geometry: Geometry) -> XResult<()> {
        self.configure(
            window,
            &ConfigureWindowAux::new()
                .x(geometry.x)
                .y(geometry.y)
                .width(geometry.width.max(1))
                .height(geometry.height.max(1)),
        )
    }

    fn reparent_window(
        &self,
        window: Window,
        parent: Option<Window>,
        x: i32,
        y: i32,
    ) -> XResult<()> {
        self.conn
            .reparent_window(window, parent.unwrap_or(self.root), x as i16, y as i16)?;
        Ok(())
    }

    fn set_border_width(&self, window: Window, width: u32) -> XResult<()> {
        self.configure(window, &ConfigureWindowAux::new().border_width(width))
    }

    fn change_save_set(&self, window: Window, insert: bool) -> XResult<()> {
        let mode = if insert { SetMode::INSERT } else { SetMode::DELETE };
        self.conn.change_save_set(mode, window)?;
        Ok(())
    }

    fn select_client_input(&self, window: Window) -> XResult<()> {
        let mask = EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY | EventMask::FOCUS_CHANGE;
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().event_mask(mask))?;
        if self.shape_event.is_some() {
            self.conn.shape_select_input(window, true)?;
        }
        // click to focus: freeze the press until the client has focus
        self.conn.grab_button(
            false,
            window,
            EventMask::BUTTON_PRESS,
            GrabMode::SYNC,
            GrabMode::ASYNC,
            NONE,
            NONE,
            ButtonIndex::M1,
            ModMask::ANY,
        )?;
        Ok(())
    }

    fn client_info(&self, window: Window) -> XResult<ClientInfo> {
        let geometry = self
            .conn
            .get_geometry(window)?
            .reply()
            .map_err(|e| XError::from_reply(window, e))?;
        let attributes = self
            .conn
            .get_window_attributes(window)?
            .reply()
            .map_err(|e| XError::from_reply(window, e))?;
        Ok(ClientInfo {
            geometry: Geometry::new(
                i32::from(geometry.x),
                i32::from(geometry.y),
                u32::from(geometry.width),
                u32::from(geometry.height),
            ),
            border_width: u32::from(geometry.border_width),
            viewable: attributes.map_state == MapState::VIEWABLE,
        })
    }

    fn read_text(&self, window: Window, property: ClientProperty) -> XResult<Option<String>> {
        let preferred = self.get_property(window, self.atoms.property(property))?;
        if preferred.type_ == self.atoms.utf8_string && !preferred.value.is_empty() {
            return Ok(Some(String::from_utf8_lossy(&preferred.value).into_owned()));
        }
        let Some(legacy) = self.atoms.legacy(property) else {
            return Ok(None);
        };
        let reply = self.get_property(window, legacy)?;
        if reply.value.is_empty() {
            return Ok(None);
        }
        // STRING is Latin-1
        Ok(Some(reply.value.iter().map(|b| char::from(*b)).collect()))
    }

    fn read_cardinals(
        &self,
        window: Window,
        property: ClientProperty,
    ) -> XResult<Option<Vec<u32>>> {
        let reply = self.get_property(window, self.atoms.property(property))?;
        Ok(reply.value32().map(|values| values.collect()))
    }

    fn read_window(&self, window: Window, property: ClientProperty) -> XResult<Option<Window>> {
        let reply = self.get_property(window, self.atoms.property(property))?;
        Ok(reply.value32().and_then(|mut values| values.next()))
    }

    fn read_protocols(&self, window: Window) -> XResult<WmFlags> {
        let reply = self.get_property(window, self.atoms.wm_protocols)?;
        Ok(reply
            .value32()
            .map(|atoms| self.atoms.protocols(atoms))
            .unwrap_or_default())
    }

    fn write_cardinals(
        &self,
        window: Window,
        property: ClientProperty,
        values: &[u32],
    ) -> XResult<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.property(property),
            self.atoms.property_type(property),
            values,
        )?;
        Ok(())
    }

    fn send_protocol_message(
        &self,
        window: Window,
        message: ProtocolMessage,
        time: u32,
    ) -> XResult<()> {
        let event = ClientMessageEvent::new(
            32,
            window,
            self.atoms.wm_protocols,
            [self.atoms.protocol(message), time, 0, 0, 0],
        );
        self.conn
            .send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn send_configure_notify(&self, window: Window, geometry: Geometry) -> XResult<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: NONE,
            x: geometry.x as i16,
            y: geometry.y as i16,
            width: geometry.width as u16,
            height: geometry.height as u16,
            border_width: 0,
            override_redirect: false,
        };
        self.conn
            .send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn set_input_focus(&self, window: Window, time: u32) -> XResult<()> {
        self.conn.set_input_focus(InputFocus::PARENT, window, time)?;
        Ok(())
    }

    fn install_colormap(&self, window: Window, install: bool) -> XResult<()> {
        let colormap = self
            .conn
            .get_window_attributes(window)?
            .reply()
            .map_err(|e| XError::from_reply(window, e))?
            .colormap;
        if colormap == NONE {
            return Ok(());
        }
        if install {
            self.conn.install_colormap(colormap)?;
        } else {
            self.conn.uninstall_colormap(colormap)?;
        }
        Ok(())
    }

    fn kill_client(&self, window: Window) -> XResult<()> {
        self.conn.kill_client(window)?;
        Ok(())
    }

    fn grab_pointer(&self, window: Window, time: u32) -> XResult<()> {
        let mask = EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION;
        let reply = self
            .conn
            .grab_pointer(
                false,
                window,
                mask,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                self.cursors.moving,
                time,
            )?
            .reply()
            .map_err(|e| XError::from_reply(window, e))?;
        if reply.status != GrabStatus::SUCCESS {
            debug!("Pointer grab on 0x{:x} failed: {:?}", window, reply.status);
        }
        Ok(())
    }

    fn ungrab_pointer(&self, time: u32) -> XResult<()> {
        self.conn.ungrab_pointer(time)?;
        Ok(())
    }

    fn replay_pointer(&self, time: u32) -> XResult<()> {
        self.conn.allow_events(Allow::REPLAY_POINTER, time)?;
        Ok(())
    }

    fn paint(&self, window: Window, paint: &Paint) -> XResult<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().background_pixel(paint.background),
        )?;
        self.conn.clear_area(false, window, 0, 0, 0, 0)?;
        self.conn.change_gc(
            self.gc,
            &ChangeGCAux::new()
                .foreground(paint.foreground)
                .background(paint.background),
        )?;
        self.draw_glyph(window, &paint.glyph)
    }

    fn has_shape(&self) -> bool {
        self.shape_event.is_some()
    }

    fn is_shaped(&self, window: Window) -> XResult<bool> {
        Ok(self
            .conn
            .shape_query_extents(window)?
            .reply()
            .map_err(|e| XError::from_reply(window, e))?
            .bounding_shaped)
    }

    fn shape_frame(
        &self,
        frame: Window,
        client: Window,
        offset: (i32, i32),
        extra: &[Geometry],
    ) -> XResult<()> {
        self.conn.shape_combine(
            SO::SET,
            SK::BOUNDING,
            SK::BOUNDING,
            frame,
            offset.0 as i16,
            offset.1 as i16,
            client,
        )?;
        let rectangles: Vec<Rectangle> = extra.iter().map(rectangle).collect();
        self.conn.shape_rectangles(
            SO::UNION,
            SK::BOUNDING,
            ClipOrdering::UNSORTED,
            frame,
            0,
            0,
            &rectangles,
        )?;
        Ok(())
    }

    fn clear_shape(&self, frame: Window) -> XResult<()> {
        self.conn.shape_mask(SO::SET, SK::BOUNDING, frame, 0, 0, NONE)?;
        Ok(())
    }

    fn validate(&self, window: Window) -> bool {
        self.conn
            .get_window_attributes(window)
            .ok()
            .is_some_and(|cookie| cookie.reply().is_ok())
    }
}
