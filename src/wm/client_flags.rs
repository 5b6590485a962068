//! Client Flags
//!
//! Bitfield flags for the protocol-level hint structures a client can set.

use bitflags::bitflags;

bitflags! {
    /// WM_NORMAL_HINTS flags (XSizeHints.flags)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SizeHintFlags: u32 {
        const US_POSITION   = 1 << 0;
        const US_SIZE       = 1 << 1;
        const P_POSITION    = 1 << 2;
        const P_SIZE        = 1 << 3;
        const P_MIN_SIZE    = 1 << 4;
        const P_MAX_SIZE    = 1 << 5;
        const P_RESIZE_INC  = 1 << 6;
        const P_ASPECT      = 1 << 7;
        const P_BASE_SIZE   = 1 << 8;
        const P_WIN_GRAVITY = 1 << 9;
    }
}

bitflags! {
    /// WM_HINTS flags (XWMHints.flags)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WmHintFlags: u32 {
        const INPUT         = 1 << 0;
        const STATE         = 1 << 1;
        const ICON_PIXMAP   = 1 << 2;
        const ICON_WINDOW   = 1 << 3;
        const ICON_POSITION = 1 << 4;
        const ICON_MASK     = 1 << 5;
        const WINDOW_GROUP  = 1 << 6;
        const URGENCY       = 1 << 8;
    }
}

bitflags! {
    /// WM flags - Window manager protocol flags (WM_PROTOCOLS)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WmFlags: u32 {
        const DELETE    = 1 << 0;
        const TAKEFOCUS = 1 << 1;
    }
}

bitflags! {
    /// _MOTIF_WM_HINTS validity flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MwmFlags: u32 {
        const FUNCTIONS   = 1 << 0;
        const DECORATIONS = 1 << 1;
    }
}

bitflags! {
    /// _MOTIF_WM_HINTS functions field
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MwmFunctions: u32 {
        const ALL      = 1 << 0;
        const RESIZE   = 1 << 1;
        const MOVE     = 1 << 2;
        const ICONIFY  = 1 << 3;
        const MAXIMIZE = 1 << 4;
        const CLOSE    = 1 << 5;
    }
}

bitflags! {
    /// _MOTIF_WM_HINTS decorations field
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MwmDecorations: u32 {
        const ALL      = 1 << 0;
        const BORDER   = 1 << 1;
        const HANDLE   = 1 << 2;
        const TITLE    = 1 << 3;
        const MENU     = 1 << 4;
        const ICONIFY  = 1 << 5;
        const MAXIMIZE = 1 << 6;
    }
}

bitflags! {
    /// Which fields of the _AREA_HINTS / _AREA_ATTRIBUTES structures are valid
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AttributeFlags: u32 {
        const SHADED      = 1 << 0;
        const MAX_HORIZ   = 1 << 1;
        const MAX_VERT    = 1 << 2;
        const OMNIPRESENT = 1 << 3;
        const WORKSPACE   = 1 << 4;
        const STACK       = 1 << 5;
        const DECORATION  = 1 << 6;
        const MODAL       = 1 << 7;
    }
}
