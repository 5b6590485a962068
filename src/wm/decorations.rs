//! Window decorations (titlebar, label, buttons, handle, grips)
//!
//! Layout is computed as plain geometry from the decoration metrics and
//! the frame size; `FrameWindows` then makes the sub-surfaces match it.
//! Painting is a pure function of the current look.

use serde::{Deserialize, Serialize};
use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::config::{ButtonLayout, WindowColors};
use crate::shared::Geometry;
use crate::wm::connection::{SurfaceKind, WindowSystem, XResult};
use crate::wm::geometry::FrameMetrics;
use crate::wm::moveresize::DragEdge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    Close,
    Iconify,
    Maximize,
}

/// Which pieces of chrome a window carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecorationSet {
    pub titlebar: bool,
    pub handle: bool,
    pub border: bool,
    pub iconify: bool,
    pub maximize: bool,
    pub close: bool,
    pub menu: bool,
}

impl DecorationSet {
    pub fn full() -> Self {
        Self {
            titlebar: true,
            handle: true,
            border: true,
            iconify: true,
            maximize: true,
            close: true,
            menu: true,
        }
    }

    pub fn none() -> Self {
        Self {
            titlebar: false,
            handle: false,
            border: false,
            iconify: false,
            maximize: false,
            close: false,
            menu: false,
        }
    }

    pub fn has_button(&self, kind: ButtonKind) -> bool {
        self.titlebar
            && match kind {
                ButtonKind::Close => self.close,
                ButtonKind::Iconify => self.iconify,
                ButtonKind::Maximize => self.maximize,
            }
    }
}

impl Default for DecorationSet {
    fn default() -> Self {
        Self::full()
    }
}

/// Part of a managed window a pointer event landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Client,
    /// The frame background, visible as the border
    Frame,
    Title,
    Label,
    Button(ButtonKind),
    Handle,
    Grip(DragEdge),
}

/// Pixel layout of the chrome. Title and handle are relative to the frame;
/// label and buttons to the title; grips to the handle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
    pub title: Option<Geometry>,
    pub label: Option<Geometry>,
    pub buttons: Vec<(ButtonKind, Geometry)>,
    pub handle: Option<Geometry>,
    pub grips: Vec<(DragEdge, Geometry)>,
    /// Client origin inside the frame
    pub client_offset: (i32, i32),
}

impl FrameLayout {
    /// Lay out a frame of `frame` size. Buttons are placed outermost first
    /// at both ends of the titlebar; the label takes what is left.
    pub fn compute(
        metrics: &FrameMetrics,
        decorations: &DecorationSet,
        buttons: &ButtonLayout,
        frame: Geometry,
    ) -> Self {
        let bw = metrics.border_width;
        let inner_width = frame.width.saturating_sub(bw * 2).max(1);
        let extents = metrics.extents();
        let mut layout = Self {
            width: frame.width,
            height: frame.height,
            client_offset: (extents.left as i32, extents.top as i32),
            ..Self::default()
        };

        if metrics.title_height > 0 {
            layout.title = Some(Geometry::new(
                bw as i32,
                bw as i32,
                inner_width,
                metrics.title_height,
            ));

            let bevel = metrics.bevel_width as i32;
            let size = metrics.button_size;
            let step = size as i32 + bevel;
            let mut left = bevel;
            let mut right = inner_width as i32 - bevel;
            let mut placed: Vec<ButtonKind> = Vec::new();

            let sides = buttons
                .left
                .iter()
                .map(|k| (DragEdge::Left, *k))
                .chain(buttons.right.iter().map(|k| (DragEdge::Right, *k)));
            for (side, kind) in sides {
                if !decorations.has_button(kind) || placed.contains(&kind) || right - left < step {
                    continue;
                }
                let x = match side {
                    DragEdge::Left => {
                        left += step;
                        left - step
                    }
                    DragEdge::Right => {
                        right -= step;
                        right + bevel
                    }
                };
                placed.push(kind);
                layout
                    .buttons
                    .push((kind, Geometry::new(x, bevel, size, size)));
            }

            layout.label = Some(Geometry::new(
                left,
                bevel,
                (right - left).max(1) as u32,
                metrics.title_height.saturating_sub(metrics.bevel_width * 2).max(1),
            ));
        }

        if metrics.handle_height > 0 {
            let handle_y = frame.height as i32 - bw as i32 - metrics.handle_height as i32;
            layout.handle = Some(Geometry::new(
                bw as i32,
                handle_y,
                inner_width,
                metrics.handle_height,
            ));
            let grip = metrics.grip_width.min(inner_width / 2).max(1);
            layout.grips = vec![
                (
                    DragEdge::Left,
                    Geometry::new(0, 0, grip, metrics.handle_height),
                ),
                (
                    DragEdge::Right,
                    Geometry::new(
                        (inner_width - grip) as i32,
                        0,
                        grip,
                        metrics.handle_height,
                    ),
                ),
            ];
        }

        layout
    }

    /// Rectangles of the chrome in frame coordinates, for shaping
    pub fn chrome_rects(&self) -> Vec<Geometry> {
        self.title.iter().chain(self.handle.iter()).copied().collect()
    }

    /// Characters of `text` that fit in the label at `advance` pixels each
    pub fn fit_label(&self, text: &str, advance: u32) -> String {
        let Some(label) = self.label else {
            return String::new();
        };
        truncate_label(text, label.width, advance)
    }
}

/// Truncate `text` to `width` pixels, marking the cut with "..."
pub fn truncate_label(text: &str, width: u32, advance: u32) -> String {
    let fits = (width / advance.max(1)) as usize;
    let count = text.chars().count();
    if count <= fits {
        return text.to_string();
    }
    if fits <= 3 {
        return text.chars().take(fits).collect();
    }
    let mut out: String = text.chars().take(fits - 3).collect();
    out.push_str("...");
    out
}

/// Sub-surface handles of one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameWindows {
    pub frame: Window,
    pub title: Option<Window>,
    pub label: Option<Window>,
    pub buttons: Vec<(ButtonKind, Window)>,
    pub handle: Option<Window>,
    pub grips: Vec<(DragEdge, Window)>,
    /// Layout the handles currently reflect
    applied: FrameLayout,
}

impl FrameWindows {
    /// Create the (unmapped) top-level frame
    pub fn create(conn: &impl WindowSystem, geometry: Geometry) -> XResult<Self> {
        let frame = conn.create_surface(None, SurfaceKind::Frame, geometry)?;
        debug!("Created frame 0x{:x} at {:?}", frame, geometry);
        Ok(Self {
            frame,
            title: None,
            label: None,
            buttons: Vec::new(),
            handle: None,
            grips: Vec::new(),
            applied: FrameLayout {
                width: geometry.width,
                height: geometry.height,
                ..FrameLayout::default()
            },
        })
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.applied
    }

    /// Create, destroy and move sub-surfaces until they match `layout`.
    /// Elements whose geometry did not change are left alone.
    pub fn sync(&mut self, conn: &impl WindowSystem, layout: &FrameLayout) -> XResult<()> {
        let old = std::mem::take(&mut self.applied);

        sync_one(conn, &mut self.title, Some(self.frame), SurfaceKind::Title, old.title, layout.title)?;
        match self.title {
            Some(title) => {
                sync_one(conn, &mut self.label, Some(title), SurfaceKind::Label, old.label, layout.label)?;
                self.buttons = sync_keyed(
                    conn,
                    std::mem::take(&mut self.buttons),
                    title,
                    SurfaceKind::Button,
                    &old.buttons,
                    &layout.buttons,
                )?;
            }
            None => {
                sync_one(conn, &mut self.label, None, SurfaceKind::Label, old.label, None)?;
                // children died with the title
                self.buttons.clear();
            }
        }

        sync_one(conn, &mut self.handle, Some(self.frame), SurfaceKind::Handle, old.handle, layout.handle)?;
        match self.handle {
            Some(handle) => {
                self.grips = sync_keyed(
                    conn,
                    std::mem::take(&mut self.grips),
                    handle,
                    SurfaceKind::Grip,
                    &old.grips,
                    &layout.grips,
                )?;
            }
            None => self.grips.clear(),
        }

        self.applied = layout.clone();
        Ok(())
    }

    /// Which region `window` is, if it belongs to this frame
    pub fn region(&self, window: Window) -> Option<Region> {
        if window == self.frame {
            return Some(Region::Frame);
        }
        if Some(window) == self.title {
            return Some(Region::Title);
        }
        if Some(window) == self.label {
            return Some(Region::Label);
        }
        if Some(window) == self.handle {
            return Some(Region::Handle);
        }
        if let Some((kind, _)) = self.buttons.iter().find(|(_, w)| *w == window) {
            return Some(Region::Button(*kind));
        }
        self.grips
            .iter()
            .find(|(_, w)| *w == window)
            .map(|(edge, _)| Region::Grip(*edge))
    }

    pub fn button(&self, kind: ButtonKind) -> Option<Window> {
        self.buttons.iter().find(|(k, _)| *k == kind).map(|(_, w)| *w)
    }

    /// Every handle, frame first
    pub fn handles(&self) -> Vec<Window> {
        let mut all = vec![self.frame];
        all.extend(self.title);
        all.extend(self.label);
        all.extend(self.buttons.iter().map(|(_, w)| *w));
        all.extend(self.handle);
        all.extend(self.grips.iter().map(|(_, w)| *w));
        all
    }

    /// Destroying the frame takes every sub-surface with it
    pub fn destroy(&self, conn: &impl WindowSystem) -> XResult<()> {
        debug!("Destroying frame 0x{:x}", self.frame);
        conn.destroy_surface(self.frame)
    }
}

fn sync_one(
    conn: &impl WindowSystem,
    slot: &mut Option<Window>,
    parent: Option<Window>,
    kind: SurfaceKind,
    old: Option<Geometry>,
    new: Option<Geometry>,
) -> XResult<()> {
    match (*slot, new) {
        (None, Some(geometry)) => {
            if let Some(parent) = parent {
                let window = conn.create_surface(Some(parent), kind, geometry)?;
                conn.map_window(window)?;
                *slot = Some(window);
            }
        }
        (Some(window), None) => {
            if parent.is_some() {
                conn.destroy_surface(window)?;
            }
            *slot = None;
        }
        (Some(window), Some(geometry)) if old != Some(geometry) => {
            conn.move_resize_window(window, geometry)?;
        }
        _ => {}
    }
    Ok(())
}

fn sync_keyed<K: Copy + PartialEq>(
    conn: &impl WindowSystem,
    current: Vec<(K, Window)>,
    parent: Window,
    kind: impl Fn(K) -> SurfaceKind,
    old: &[(K, Geometry)],
    new: &[(K, Geometry)],
) -> XResult<Vec<(K, Window)>> {
    let lookup = |list: &[(K, Geometry)], key: K| {
        list.iter().find(|(k, _)| *k == key).map(|(_, g)| *g)
    };
    let mut kept = Vec::with_capacity(new.len());
    for (key, window) in current {
        if lookup(new, key).is_none() {
            conn.destroy_surface(window)?;
        } else {
            kept.push((key, window));
        }
    }
    let mut result = Vec::with_capacity(new.len());
    for (key, geometry) in new {
        match kept.iter().find(|(k, _)| k == key) {
            Some((_, window)) => {
                if lookup(old, *key) != Some(*geometry) {
                    conn.move_resize_window(*window, *geometry)?;
                }
                result.push((*key, *window));
            }
            None => {
                let window = conn.create_surface(Some(parent), kind(*key), *geometry)?;
                conn.map_window(window)?;
                result.push((*key, window));
            }
        }
    }
    Ok(result)
}

/// Glyph drawn on top of a surface's background
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Glyph {
    None,
    Text(String),
    Close,
    Iconify,
    Maximize,
    Grip,
}

/// What a surface should look like; the windowing system turns it into pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paint {
    pub background: u32,
    pub foreground: u32,
    pub glyph: Glyph,
}

/// Inputs to painting. Nothing is mutated by drawing.
#[derive(Debug, Clone, Copy)]
pub struct Look<'a> {
    pub focused: bool,
    pub pressed: Option<ButtonKind>,
    /// Already-truncated label text
    pub label: &'a str,
}

pub fn paint_region(colors: &WindowColors, region: Region, look: &Look<'_>) -> Paint {
    let pick = |focused: u32, unfocused: u32| if look.focused { focused } else { unfocused };
    let text = pick(colors.focused_text, colors.unfocused_text);
    match region {
        Region::Client | Region::Frame => Paint {
            background: pick(colors.focused_border, colors.unfocused_border),
            foreground: text,
            glyph: Glyph::None,
        },
        Region::Title => Paint {
            background: pick(colors.focused_title, colors.unfocused_title),
            foreground: text,
            glyph: Glyph::None,
        },
        Region::Label => Paint {
            background: pick(colors.focused_label, colors.unfocused_label),
            foreground: text,
            glyph: Glyph::Text(look.label.to_string()),
        },
        Region::Button(kind) => Paint {
            background: if look.pressed == Some(kind) {
                colors.pressed_button
            } else {
                pick(colors.focused_button, colors.unfocused_button)
            },
            foreground: text,
            glyph: match kind {
                ButtonKind::Close => Glyph::Close,
                ButtonKind::Iconify => Glyph::Iconify,
                ButtonKind::Maximize => Glyph::Maximize,
            },
        },
        Region::Handle => Paint {
            background: pick(colors.focused_handle, colors.unfocused_handle),
            foreground: text,
            glyph: Glyph::None,
        },
        Region::Grip(_) => Paint {
            background: pick(colors.focused_grip, colors.unfocused_grip),
            foreground: text,
            glyph: Glyph::Grip,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowDecorationConfig;
    use crate::wm::testing::{Request, RecordingConnection};

    fn layout_for(decorations: DecorationSet, width: u32) -> FrameLayout {
        let config = WindowDecorationConfig::default();
        let metrics = FrameMetrics::new(&config, &decorations);
        FrameLayout::compute(
            &metrics,
            &decorations,
            &config.button_layout,
            Geometry::new(0, 0, width, 300),
        )
    }

    #[test]
    fn test_full_layout_places_buttons_at_both_ends() {
        let layout = layout_for(DecorationSet::full(), 402);
        let title = layout.title.unwrap();
        assert_eq!(title, Geometry::new(1, 1, 400, 20));

        // bevel 2, button 16: iconify left, close outermost right
        let place = |kind| layout.buttons.iter().find(|(k, _)| *k == kind).unwrap().1;
        assert_eq!(place(ButtonKind::Iconify).x, 2);
        assert_eq!(place(ButtonKind::Close), Geometry::new(382, 2, 16, 16));
        assert_eq!(place(ButtonKind::Maximize).x, 364);

        let label = layout.label.unwrap();
        assert_eq!(label.x, 20);
        assert_eq!(label.right(), 362);

        let handle = layout.handle.unwrap();
        assert_eq!(handle, Geometry::new(1, 300 - 1 - 6, 400, 6));
        assert_eq!(layout.grips[1].1.x, 380);
        assert_eq!(layout.client_offset, (1, 22));
    }

    #[test]
    fn test_disabled_buttons_are_not_laid_out() {
        let mut set = DecorationSet::full();
        set.maximize = false;
        set.handle = false;
        let layout = layout_for(set, 300);
        assert!(layout.buttons.iter().all(|(k, _)| *k != ButtonKind::Maximize));
        assert!(layout.handle.is_none());
        assert!(layout.grips.is_empty());

        let bare = layout_for(DecorationSet::none(), 300);
        assert!(bare.title.is_none() && bare.label.is_none() && bare.buttons.is_empty());
        assert_eq!(bare.client_offset, (0, 0));
    }

    #[test]
    fn test_narrow_title_drops_buttons_before_overlapping() {
        let layout = layout_for(DecorationSet::full(), 40);
        let title = layout.title.unwrap();
        for (_, button) in &layout.buttons {
            assert!(button.right() <= title.width as i32);
        }
        assert!(layout.buttons.len() < 3);
    }

    #[test]
    fn test_sync_is_idempotent() {
        let conn = RecordingConnection::new();
        let mut windows = FrameWindows::create(&conn, Geometry::new(0, 0, 402, 300)).unwrap();
        let layout = layout_for(DecorationSet::full(), 402);
        windows.sync(&conn, &layout).unwrap();
        assert_eq!(windows.buttons.len(), 3);
        assert_eq!(windows.grips.len(), 2);

        conn.clear_requests();
        windows.sync(&conn, &layout).unwrap();
        assert!(conn.requests().is_empty());
    }

    #[test]
    fn test_sync_removes_and_adds_surfaces() {
        let conn = RecordingConnection::new();
        let mut windows = FrameWindows::create(&conn, Geometry::new(0, 0, 402, 300)).unwrap();
        windows.sync(&conn, &layout_for(DecorationSet::full(), 402)).unwrap();
        let title = windows.title.unwrap();
        let handle = windows.handle.unwrap();

        let mut no_title = DecorationSet::full();
        no_title.titlebar = false;
        conn.clear_requests();
        windows.sync(&conn, &layout_for(no_title, 402)).unwrap();
        assert!(windows.title.is_none());
        assert!(windows.buttons.is_empty());
        assert_eq!(windows.handle, Some(handle));
        assert!(conn.requests().contains(&Request::Destroy(title)));

        windows.sync(&conn, &layout_for(DecorationSet::full(), 402)).unwrap();
        let title = windows.title.unwrap();
        assert_eq!(windows.region(title), Some(Region::Title));
        let close = windows.button(ButtonKind::Close).unwrap();
        assert_eq!(windows.region(close), Some(Region::Button(ButtonKind::Close)));
    }

    #[test]
    fn test_resize_only_moves_changed_elements() {
        let conn = RecordingConnection::new();
        let mut windows = FrameWindows::create(&conn, Geometry::new(0, 0, 402, 300)).unwrap();
        windows.sync(&conn, &layout_for(DecorationSet::full(), 402)).unwrap();
        let iconify = windows.button(ButtonKind::Iconify).unwrap();
        let left_grip = windows.grips[0].1;

        conn.clear_requests();
        windows.sync(&conn, &layout_for(DecorationSet::full(), 502)).unwrap();
        let moved: Vec<Window> = conn
            .requests()
            .iter()
            .filter_map(|r| match r {
                Request::MoveResize(w, _) => Some(*w),
                _ => None,
            })
            .collect();
        assert!(!moved.contains(&iconify));
        assert!(!moved.contains(&left_grip));
        assert!(moved.contains(&windows.button(ButtonKind::Close).unwrap()));
    }

    #[test]
    fn test_label_truncation() {
        assert_eq!(truncate_label("xterm", 70, 7), "xterm");
        assert_eq!(truncate_label("a very long window title", 70, 7), "a very ...");
        assert_eq!(truncate_label("abcdef", 14, 7), "ab");
    }

    #[test]
    fn test_paint_depends_only_on_look() {
        let colors = WindowColors::default();
        let look = Look {
            focused: true,
            pressed: Some(ButtonKind::Close),
            label: "term",
        };
        let close = paint_region(&colors, Region::Button(ButtonKind::Close), &look);
        assert_eq!(close.background, colors.pressed_button);
        assert_eq!(close.glyph, Glyph::Close);
        let max = paint_region(&colors, Region::Button(ButtonKind::Maximize), &look);
        assert_eq!(max.background, colors.focused_button);

        let unfocused = Look { focused: false, ..look };
        let label = paint_region(&colors, Region::Label, &unfocused);
        assert_eq!(label.background, colors.unfocused_label);
        assert_eq!(label.glyph, Glyph::Text("term".to_string()));
        assert_eq!(paint_region(&colors, Region::Label, &unfocused), label);
    }
}
