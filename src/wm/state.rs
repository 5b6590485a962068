//! State Module
//!
//! The lifecycle code mirrored onto the client and the runtime flags layered
//! on top of it. `WindowState` can only be changed through its transition
//! methods, which keep `iconic`/`visible` and `moving`/`resizing` exclusive.

/// ICCCM WM_STATE values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WmState {
    #[default]
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

impl WmState {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Withdrawn),
            1 => Some(Self::Normal),
            3 => Some(Self::Iconic),
            _ => None,
        }
    }
}

/// Axes a maximize was applied to, keyed by the mouse button that did it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Maximized {
    #[default]
    None,
    Full,
    Vertical,
    Horizontal,
}

impl Maximized {
    /// Button 1 maximizes both axes, 2 vertically, 3 horizontally
    pub fn from_button(button: u8) -> Option<Self> {
        match button {
            1 => Some(Self::Full),
            2 => Some(Self::Vertical),
            3 => Some(Self::Horizontal),
            _ => None,
        }
    }

    /// Inverse of `from_button`
    pub fn button(&self) -> Option<u8> {
        match self {
            Self::None => None,
            Self::Full => Some(1),
            Self::Vertical => Some(2),
            Self::Horizontal => Some(3),
        }
    }

    pub fn horizontal(&self) -> bool {
        matches!(self, Self::Full | Self::Horizontal)
    }

    pub fn vertical(&self) -> bool {
        matches!(self, Self::Full | Self::Vertical)
    }

    pub fn from_axes(horizontal: bool, vertical: bool) -> Self {
        match (horizontal, vertical) {
            (true, true) => Self::Full,
            (true, false) => Self::Horizontal,
            (false, true) => Self::Vertical,
            (false, false) => Self::None,
        }
    }
}

/// Pointer-driven operation in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    Moving,
    Resizing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowState {
    lifecycle: WmState,
    visible: bool,
    activity: Activity,
    shaded: bool,
    focused: bool,
    stuck: bool,
    modal: bool,
    shaped: bool,
    maximized: Maximized,
}

impl WindowState {
    pub fn lifecycle(&self) -> WmState {
        self.lifecycle
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_iconic(&self) -> bool {
        self.lifecycle == WmState::Iconic
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn is_moving(&self) -> bool {
        self.activity == Activity::Moving
    }

    pub fn is_resizing(&self) -> bool {
        self.activity == Activity::Resizing
    }

    pub fn is_shaded(&self) -> bool {
        self.shaded
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_stuck(&self) -> bool {
        self.stuck
    }

    pub fn is_modal(&self) -> bool {
        self.modal
    }

    pub fn is_shaped(&self) -> bool {
        self.shaped
    }

    pub fn maximized(&self) -> Maximized {
        self.maximized
    }

    /// Enter `state`. Only `Normal` is visible; leaving it drops focus and
    /// any drag. Returns whether anything changed.
    pub fn set_lifecycle(&mut self, state: WmState) -> bool {
        let changed = self.lifecycle != state;
        self.lifecycle = state;
        self.visible = state == WmState::Normal;
        if !self.visible {
            self.focused = false;
            self.activity = Activity::Idle;
        }
        changed
    }

    /// Start a drag; refused while another one is running or while hidden
    pub fn begin(&mut self, activity: Activity) -> bool {
        if self.activity != Activity::Idle || !self.visible || activity == Activity::Idle {
            return false;
        }
        self.activity = activity;
        true
    }

    pub fn end_drag(&mut self) -> Activity {
        std::mem::take(&mut self.activity)
    }

    pub fn set_shaded(&mut self, shaded: bool) -> bool {
        std::mem::replace(&mut self.shaded, shaded) != shaded
    }

    /// Only a visible window can hold focus
    pub fn set_focused(&mut self, focused: bool) -> bool {
        let focused = focused && self.visible;
        std::mem::replace(&mut self.focused, focused) != focused
    }

    pub fn set_stuck(&mut self, stuck: bool) -> bool {
        std::mem::replace(&mut self.stuck, stuck) != stuck
    }

    pub fn set_modal(&mut self, modal: bool) {
        self.modal = modal;
    }

    pub fn set_shaped(&mut self, shaped: bool) {
        self.shaped = shaped;
    }

    pub fn set_maximized(&mut self, maximized: Maximized) -> bool {
        std::mem::replace(&mut self.maximized, maximized) != maximized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iconic_and_visible_are_exclusive() {
        let mut state = WindowState::default();
        assert!(!state.is_visible());
        assert!(state.set_lifecycle(WmState::Normal));
        assert!(state.is_visible() && !state.is_iconic());
        state.set_focused(true);

        assert!(state.set_lifecycle(WmState::Iconic));
        assert!(state.is_iconic() && !state.is_visible());
        assert!(!state.is_focused());
        assert!(!state.set_lifecycle(WmState::Iconic));
    }

    #[test]
    fn test_single_drag_at_a_time() {
        let mut state = WindowState::default();
        assert!(!state.begin(Activity::Moving));
        state.set_lifecycle(WmState::Normal);
        assert!(state.begin(Activity::Moving));
        assert!(!state.begin(Activity::Resizing));
        assert!(state.is_moving() && !state.is_resizing());
        assert_eq!(state.end_drag(), Activity::Moving);
        assert!(state.begin(Activity::Resizing));
        state.set_lifecycle(WmState::Withdrawn);
        assert_eq!(state.activity(), Activity::Idle);
    }

    #[test]
    fn test_hidden_window_cannot_be_focused() {
        let mut state = WindowState::default();
        assert!(!state.set_focused(true));
        assert!(!state.is_focused());
    }

    #[test]
    fn test_maximize_buttons() {
        assert_eq!(Maximized::from_button(1), Some(Maximized::Full));
        assert_eq!(Maximized::from_button(2), Some(Maximized::Vertical));
        assert_eq!(Maximized::from_button(3), Some(Maximized::Horizontal));
        assert_eq!(Maximized::from_button(4), None);
        assert_eq!(Maximized::from_axes(true, false), Maximized::Horizontal);
        assert!(Maximized::Full.horizontal() && Maximized::Full.vertical());
    }

    #[test]
    fn test_wm_state_codes() {
        assert_eq!(WmState::Iconic as u32, 3);
        assert_eq!(WmState::from_u32(1), Some(WmState::Normal));
        assert_eq!(WmState::from_u32(2), None);
    }
}
