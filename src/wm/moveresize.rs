//! MoveResize Module
//!
//! Bookkeeping for an interactive move or resize. Motion only updates the
//! preview rectangle; the window commits it on release.

use crate::shared::Geometry;
use crate::wm::geometry::Axis;

/// Side of the frame a resize grip sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragEdge {
    Left,
    Right,
}

/// Move/resize operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOperation {
    Move,
    Resize(DragEdge),
}

/// Move/resize operation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragState {
    pub operation: DragOperation,

    /// Pointer position at the press (root coordinates)
    pub start_x: i32,
    pub start_y: i32,

    /// Frame geometry at the press
    pub start_geometry: Geometry,

    /// Uncommitted frame rectangle
    pub preview: Geometry,

    /// Set once the pointer has actually moved
    pub moved: bool,
}

impl DragState {
    pub fn new(operation: DragOperation, start_x: i32, start_y: i32, frame: Geometry) -> Self {
        Self {
            operation,
            start_x,
            start_y,
            start_geometry: frame,
            preview: frame,
            moved: false,
        }
    }

    /// Raw preview for the pointer at (`x`, `y`), before size constraints.
    /// Returns the dimension being driven hardest.
    pub fn update(&mut self, x: i32, y: i32) -> Axis {
        let dx = x - self.start_x;
        let dy = y - self.start_y;
        if dx != 0 || dy != 0 {
            self.moved = true;
        }
        let start = self.start_geometry;
        self.preview = match self.operation {
            DragOperation::Move => start.with_position(start.x + dx, start.y + dy),
            DragOperation::Resize(DragEdge::Right) => start.with_size(
                grow(start.width, dx),
                grow(start.height, dy),
            ),
            DragOperation::Resize(DragEdge::Left) => {
                let width = grow(start.width, -dx);
                Geometry::new(
                    start.right() - width as i32,
                    start.y,
                    width,
                    grow(start.height, dy),
                )
            }
        };
        if dx.abs() >= dy.abs() {
            Axis::Width
        } else {
            Axis::Height
        }
    }
}

fn grow(size: u32, delta: i32) -> u32 {
    (size as i64 + delta as i64).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_preview_follows_pointer() {
        let frame = Geometry::new(10, 20, 100, 80);
        let mut drag = DragState::new(DragOperation::Move, 50, 50, frame);
        assert!(!drag.moved);
        drag.update(60, 45);
        assert!(drag.moved);
        assert_eq!(drag.preview, Geometry::new(20, 15, 100, 80));
        // committed start is untouched
        assert_eq!(drag.start_geometry, frame);
    }

    #[test]
    fn test_left_resize_keeps_right_edge() {
        let frame = Geometry::new(100, 0, 200, 100);
        let mut drag = DragState::new(DragOperation::Resize(DragEdge::Left), 100, 100, frame);
        let axis = drag.update(130, 105);
        assert_eq!(axis, Axis::Width);
        assert_eq!(drag.preview.width, 170);
        assert_eq!(drag.preview.right(), frame.right());
        assert_eq!(drag.preview.height, 105);
    }

    #[test]
    fn test_resize_never_collapses() {
        let frame = Geometry::new(0, 0, 50, 50);
        let mut drag = DragState::new(DragOperation::Resize(DragEdge::Right), 50, 50, frame);
        assert_eq!(drag.update(50, -400), Axis::Height);
        assert_eq!(drag.preview.height, 1);
    }
}
