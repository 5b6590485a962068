//! Geometry Module
//!
//! Client <-> frame conversion, size-hint constraints and gravity.

use crate::config::WindowDecorationConfig;
use crate::shared::Geometry;
use crate::wm::decorations::DecorationSet;
use crate::wm::hints::SizePolicy;
use crate::wm::moveresize::DragEdge;

/// ICCCM window gravity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

impl Gravity {
    pub fn from_u32(value: u32) -> Self {
        match value {
            2 => Self::North,
            3 => Self::NorthEast,
            4 => Self::West,
            5 => Self::Center,
            6 => Self::East,
            7 => Self::SouthWest,
            8 => Self::South,
            9 => Self::SouthEast,
            10 => Self::Static,
            // 0 (ForgetGravity) and 1
            _ => Self::NorthWest,
        }
    }

    /// Translation from the client's requested position to the frame
    /// position that keeps the gravity reference point in place.
    pub fn offset(&self, extents: &Extents) -> (i32, i32) {
        let horizontal = (extents.left + extents.right) as i32;
        let vertical = (extents.top + extents.bottom) as i32;
        let dx = match self {
            Self::NorthWest | Self::West | Self::SouthWest => 0,
            Self::North | Self::Center | Self::South => -(horizontal / 2),
            Self::NorthEast | Self::East | Self::SouthEast => -horizontal,
            Self::Static => -(extents.left as i32),
        };
        let dy = match self {
            Self::NorthWest | Self::North | Self::NorthEast => 0,
            Self::West | Self::Center | Self::East => -(vertical / 2),
            Self::SouthWest | Self::South | Self::SouthEast => -vertical,
            Self::Static => -(extents.top as i32),
        };
        (dx, dy)
    }
}

/// Decoration thickness on each side of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extents {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// Which dimension the user is changing; aspect correction adjusts the other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

/// Pixel sizes of the frame decorations actually present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameMetrics {
    pub border_width: u32,
    pub title_height: u32,
    pub handle_height: u32,
    pub bevel_width: u32,
    pub button_size: u32,
    pub grip_width: u32,
}

impl FrameMetrics {
    pub fn new(config: &WindowDecorationConfig, decorations: &DecorationSet) -> Self {
        let title_height = if decorations.titlebar {
            config.title_height.max(1)
        } else {
            0
        };
        Self {
            border_width: if decorations.border { config.border_width } else { 0 },
            title_height,
            handle_height: if decorations.handle {
                config.handle_height.max(1)
            } else {
                0
            },
            bevel_width: config.bevel_width,
            button_size: title_height.saturating_sub(config.bevel_width * 2).max(1),
            grip_width: config.grip_width,
        }
    }

    pub fn extents(&self) -> Extents {
        let bw = self.border_width;
        let title = if self.title_height > 0 {
            self.title_height + bw
        } else {
            0
        };
        let handle = if self.handle_height > 0 {
            self.handle_height + bw
        } else {
            0
        };
        Extents {
            left: bw,
            right: bw,
            top: bw + title,
            bottom: bw + handle,
        }
    }

    /// Frame rectangle around a client at its current on-screen position
    pub fn frame_for_client(&self, client: Geometry) -> Geometry {
        let e = self.extents();
        Geometry::new(
            client.x - e.left as i32,
            client.y - e.top as i32,
            client.width + e.left + e.right,
            client.height + e.top + e.bottom,
        )
    }

    /// Inverse of `frame_for_client`
    pub fn client_for_frame(&self, frame: Geometry) -> Geometry {
        let e = self.extents();
        Geometry::new(
            frame.x + e.left as i32,
            frame.y + e.top as i32,
            frame.width.saturating_sub(e.left + e.right),
            frame.height.saturating_sub(e.top + e.bottom),
        )
    }

    /// Frame placement for a client-requested geometry, honoring gravity
    pub fn place(&self, requested: Geometry, gravity: Gravity) -> Geometry {
        let (dx, dy) = gravity.offset(&self.extents());
        let frame = self.frame_for_client(requested);
        frame.with_position(requested.x + dx, requested.y + dy)
    }

    /// The client position `place` was computed from
    pub fn unplace(&self, frame: Geometry, gravity: Gravity) -> Geometry {
        let (dx, dy) = gravity.offset(&self.extents());
        let client = self.client_for_frame(frame);
        client.with_position(frame.x - dx, frame.y - dy)
    }

    /// Move `frame` (laid out with `old` metrics) to `self`'s metrics so the
    /// client's gravity reference point stays where it was
    pub fn regravitate(&self, old: &FrameMetrics, frame: Geometry, gravity: Gravity) -> Geometry {
        self.place(old.unplace(frame, gravity), gravity)
    }

    /// Height of a shaded frame: the titlebar and its borders
    pub fn shaded_height(&self) -> u32 {
        self.title_height + self.border_width * 2
    }

    /// Constrain a proposed frame to the size policy. The top edge and the
    /// edge opposite `edge` stay put.
    pub fn constrain(
        &self,
        policy: &SizePolicy,
        proposed: Geometry,
        edge: DragEdge,
        active: Axis,
    ) -> Geometry {
        let client = self.client_for_frame(proposed);
        let (width, height) = policy.constrain(client.width, client.height, active);
        let frame = self.frame_for_client(client.with_size(width, height));
        let x = match edge {
            DragEdge::Left => proposed.right() - frame.width as i32,
            DragEdge::Right => proposed.x,
        };
        frame.with_position(x, proposed.y)
    }
}

impl SizePolicy {
    /// Nearest client size within bounds, on the increment grid and inside
    /// the aspect range. Sizes snap toward the smaller grid value.
    pub fn constrain(&self, width: u32, height: u32, active: Axis) -> (u32, u32) {
        let mut w = fit(width, self.min_width, self.max_width, self.base_width, self.width_inc);
        let mut h = fit(height, self.min_height, self.max_height, self.base_height, self.height_inc);

        let refit_w = |w| fit(w, self.min_width, self.max_width, self.base_width, self.width_inc);
        let refit_h =
            |h| fit(h, self.min_height, self.max_height, self.base_height, self.height_inc);

        if let Some((num, den)) = self.min_aspect {
            // w / h < num / den: too narrow
            if (w as u64) * (den as u64) < (num as u64) * (h as u64) {
                match active {
                    Axis::Width => h = refit_h(((w as u64) * (den as u64) / num as u64) as u32),
                    Axis::Height => w = refit_w(div_ceil(h as u64 * num as u64, den as u64)),
                }
            }
        }
        if let Some((num, den)) = self.max_aspect {
            // w / h > num / den: too wide
            if (w as u64) * (den as u64) > (num as u64) * (h as u64) {
                match active {
                    Axis::Width => h = refit_h(div_ceil(w as u64 * den as u64, num as u64)),
                    Axis::Height => w = refit_w(((h as u64) * (num as u64) / den as u64) as u32),
                }
            }
        }

        (w, h)
    }
}

fn div_ceil(a: u64, b: u64) -> u32 {
    a.div_ceil(b).min(u32::MAX as u64) as u32
}

/// Clamp into [min, max] and snap to base + k * inc. Bounds win over the
/// grid when no grid point lies inside them.
fn fit(value: u32, min: u32, max: u32, base: u32, inc: u32) -> u32 {
    let clamped = value.clamp(min, max.max(min)) as i64;
    let (base, inc) = (base as i64, inc.max(1) as i64);

    let mut snapped = base + (clamped - base).div_euclid(inc) * inc;
    if snapped < min as i64 {
        snapped += inc;
    }
    if snapped > max as i64 || snapped < min as i64 {
        return clamped as u32;
    }
    snapped as u32
}
