//! Hints Module
//!
//! Parsing of the client's protocol-level hint structures (XSizeHints,
//! XWMHints, MWM hints, Area hints) and the deterministic merge that turns
//! them into one window policy.
//!
//! Every source is optional. Short or missing data is treated as absent and
//! replaced by the documented baseline: full decorations and functions,
//! passive focus, minimum size 1x1, increment 1, no aspect constraint.

use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::wm::client_flags::{
    AttributeFlags, MwmDecorations, MwmFlags, MwmFunctions, SizeHintFlags, WmFlags, WmHintFlags,
};
use crate::wm::connection::{ClientProperty, WindowSystem, XResult};
use crate::wm::decorations::DecorationSet;
use crate::wm::focus::FocusMode;
use crate::wm::geometry::Gravity;
use crate::wm::state::WmState;

/// Largest window dimension the X protocol can express
pub const MAX_DIMENSION: u32 = u16::MAX as u32;

/// Size hints (XSizeHints equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeHints {
    pub flags: SizeHintFlags,
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub width_inc: u32,
    pub height_inc: u32,
    pub min_aspect: (u32, u32),
    pub max_aspect: (u32, u32),
    pub base_width: u32,
    pub base_height: u32,
    pub win_gravity: u32,
}

impl SizeHints {
    /// Parse WM_NORMAL_HINTS. Pre-ICCCM clients send 15 values (no base size
    /// or gravity); anything shorter is invalid.
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < 15 {
            return None;
        }
        let extra = |i: usize| values.get(i).copied().unwrap_or(0);
        Some(Self {
            flags: SizeHintFlags::from_bits_truncate(values[0]),
            min_width: values[5],
            min_height: values[6],
            max_width: values[7],
            max_height: values[8],
            width_inc: values[9],
            height_inc: values[10],
            min_aspect: (values[11], values[12]),
            max_aspect: (values[13], values[14]),
            base_width: extra(15),
            base_height: extra(16),
            win_gravity: extra(17),
        })
    }
}

/// WM hints (XWMHints equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WmHints {
    pub flags: WmHintFlags,
    pub input: bool,
    pub initial_state: u32,
    pub icon_window: Option<Window>,
    pub window_group: Option<Window>,
}

impl WmHints {
    /// Parse WM_HINTS. Old clients omit the window group.
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < 8 {
            return None;
        }
        let flags = WmHintFlags::from_bits_truncate(values[0]);
        let nonzero = |v: u32| (v != 0).then_some(v);
        Some(Self {
            flags,
            input: values[1] != 0,
            initial_state: values[2],
            icon_window: nonzero(values[4]).filter(|_| flags.contains(WmHintFlags::ICON_WINDOW)),
            window_group: values
                .get(8)
                .copied()
                .and_then(nonzero)
                .filter(|_| flags.contains(WmHintFlags::WINDOW_GROUP)),
        })
    }

    /// Whether the client accepts keyboard input; ICCCM clients that don't
    /// say are assumed to.
    pub fn accepts_input(&self) -> bool {
        !self.flags.contains(WmHintFlags::INPUT) || self.input
    }
}

/// _MOTIF_WM_HINTS (only the first three fields matter to us)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MwmHints {
    pub flags: MwmFlags,
    pub functions: MwmFunctions,
    pub decorations: MwmDecorations,
}

impl MwmHints {
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < 3 {
            return None;
        }
        Some(Self {
            flags: MwmFlags::from_bits_truncate(values[0]),
            functions: MwmFunctions::from_bits_truncate(values[1]),
            decorations: MwmDecorations::from_bits_truncate(values[2]),
        })
    }
}

/// Frame style a client may request through _AREA_HINTS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecorationStyle {
    None,
    #[default]
    Normal,
    /// Titlebar with an iconify button only
    Tiny,
    /// Titlebar only, movable but not resizable
    Tool,
}

impl DecorationStyle {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::None,
            2 => Self::Tiny,
            3 => Self::Tool,
            _ => Self::Normal,
        }
    }
}

/// _AREA_HINTS: requests from the client (flags, attrib, workspace, stack, decoration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagerHints {
    pub flags: AttributeFlags,
    pub attrib: AttributeFlags,
    pub workspace: u32,
    pub stack: u32,
    pub decoration: DecorationStyle,
}

impl ManagerHints {
    pub const ELEMENTS: usize = 5;

    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < Self::ELEMENTS {
            return None;
        }
        Some(Self {
            flags: AttributeFlags::from_bits_truncate(values[0]),
            attrib: AttributeFlags::from_bits_truncate(values[1]),
            workspace: values[2],
            stack: values[3],
            decoration: DecorationStyle::from_u32(values[4]),
        })
    }

    /// Requested value of `flag`, if the client set it
    pub fn requested(&self, flag: AttributeFlags) -> Option<bool> {
        self.flags.contains(flag).then(|| self.attrib.contains(flag))
    }
}

/// _AREA_ATTRIBUTES: state we persist on the client so a restarted manager
/// can pick it up again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagerAttributes {
    pub flags: AttributeFlags,
    pub attrib: AttributeFlags,
    pub workspace: u32,
    pub stack: u32,
    pub premax_x: i32,
    pub premax_y: i32,
    pub premax_width: u32,
    pub premax_height: u32,
}

impl ManagerAttributes {
    pub const ELEMENTS: usize = 8;

    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < Self::ELEMENTS {
            return None;
        }
        Some(Self {
            flags: AttributeFlags::from_bits_truncate(values[0]),
            attrib: AttributeFlags::from_bits_truncate(values[1]),
            workspace: values[2],
            stack: values[3],
            premax_x: values[4] as i32,
            premax_y: values[5] as i32,
            premax_width: values[6],
            premax_height: values[7],
        })
    }

    pub fn to_values(&self) -> [u32; Self::ELEMENTS] {
        [
            self.flags.bits(),
            self.attrib.bits(),
            self.workspace,
            self.stack,
            self.premax_x as u32,
            self.premax_y as u32,
            self.premax_width,
            self.premax_height,
        ]
    }

    pub fn set(&mut self, flag: AttributeFlags, on: bool) {
        self.flags.insert(flag);
        self.attrib.set(flag, on);
    }

    pub fn is_set(&self, flag: AttributeFlags) -> bool {
        self.flags.contains(flag) && self.attrib.contains(flag)
    }
}

/// Everything read from the client, one slot per source property
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHints {
    pub title: String,
    pub icon_title: String,
    pub size_hints: Option<SizeHints>,
    pub wm_hints: Option<WmHints>,
    pub protocols: WmFlags,
    pub mwm_hints: Option<MwmHints>,
    pub manager_hints: Option<ManagerHints>,
    pub transient_for: Option<Window>,
}

impl ClientHints {
    /// Properties read at construction, in order
    pub const SOURCES: [ClientProperty; 7] = [
        ClientProperty::Name,
        ClientProperty::IconName,
        ClientProperty::NormalHints,
        ClientProperty::Hints,
        ClientProperty::Protocols,
        ClientProperty::MotifHints,
        ClientProperty::ManagerHints,
    ];

    pub fn fetch(conn: &impl WindowSystem, window: Window) -> XResult<Self> {
        let mut hints = Self::default();
        for property in Self::SOURCES {
            hints.refresh(conn, window, property)?;
        }
        hints.refresh(conn, window, ClientProperty::TransientFor)?;
        Ok(hints)
    }

    /// Re-read the one source behind `property`. Returns whether it changed.
    pub fn refresh(
        &mut self,
        conn: &impl WindowSystem,
        window: Window,
        property: ClientProperty,
    ) -> XResult<bool> {
        let before = self.clone();
        match property {
            ClientProperty::Name => {
                self.title = conn
                    .read_text(window, property)?
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Unnamed".to_string());
            }
            ClientProperty::IconName => {
                self.icon_title = conn
                    .read_text(window, property)?
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| self.title.clone());
            }
            ClientProperty::NormalHints => {
                self.size_hints = conn
                    .read_cardinals(window, property)?
                    .and_then(|v| SizeHints::from_values(&v));
            }
            ClientProperty::Hints => {
                self.wm_hints = conn
                    .read_cardinals(window, property)?
                    .and_then(|v| WmHints::from_values(&v));
            }
            ClientProperty::Protocols => {
                self.protocols = conn.read_protocols(window)?;
            }
            ClientProperty::MotifHints => {
                self.mwm_hints = conn
                    .read_cardinals(window, property)?
                    .and_then(|v| MwmHints::from_values(&v));
            }
            ClientProperty::ManagerHints => {
                self.manager_hints = conn
                    .read_cardinals(window, property)?
                    .and_then(|v| ManagerHints::from_values(&v));
            }
            ClientProperty::TransientFor => {
                self.transient_for = conn
                    .read_window(window, property)?
                    .filter(|parent| *parent != window && *parent != 0);
            }
            // written by us
            ClientProperty::ManagerAttributes | ClientProperty::WmState => {}
        }
        let changed = *self != before;
        if changed {
            debug!("Client 0x{:x} {:?} changed", window, property);
        }
        Ok(changed)
    }

    pub fn window_group(&self) -> Option<Window> {
        self.wm_hints.and_then(|h| h.window_group)
    }

    pub fn icon_window(&self) -> Option<Window> {
        self.wm_hints.and_then(|h| h.icon_window)
    }
}

/// Normalized size constraints, in client pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePolicy {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub width_inc: u32,
    pub height_inc: u32,
    /// Minimum width/height ratio as (numerator, denominator)
    pub min_aspect: Option<(u32, u32)>,
    /// Maximum width/height ratio as (numerator, denominator)
    pub max_aspect: Option<(u32, u32)>,
    pub base_width: u32,
    pub base_height: u32,
    pub gravity: Gravity,
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            min_width: 1,
            min_height: 1,
            max_width: MAX_DIMENSION,
            max_height: MAX_DIMENSION,
            width_inc: 1,
            height_inc: 1,
            min_aspect: None,
            max_aspect: None,
            base_width: 1,
            base_height: 1,
            gravity: Gravity::NorthWest,
        }
    }
}

impl SizePolicy {
    pub fn from_hints(hints: Option<&SizeHints>) -> Self {
        let mut policy = Self::default();
        let Some(hints) = hints else {
            return policy;
        };
        let flags = hints.flags;

        if flags.contains(SizeHintFlags::P_MIN_SIZE) {
            policy.min_width = hints.min_width.max(1);
            policy.min_height = hints.min_height.max(1);
        }
        if flags.contains(SizeHintFlags::P_BASE_SIZE) {
            policy.base_width = hints.base_width;
            policy.base_height = hints.base_height;
            if !flags.contains(SizeHintFlags::P_MIN_SIZE) {
                policy.min_width = hints.base_width.max(1);
                policy.min_height = hints.base_height.max(1);
            }
        } else {
            policy.base_width = policy.min_width;
            policy.base_height = policy.min_height;
        }
        if flags.contains(SizeHintFlags::P_MAX_SIZE) {
            // a zero maximum means "unset" to most toolkits
            if hints.max_width > 0 {
                policy.max_width = hints.max_width.min(MAX_DIMENSION);
            }
            if hints.max_height > 0 {
                policy.max_height = hints.max_height.min(MAX_DIMENSION);
            }
        }
        policy.max_width = policy.max_width.max(policy.min_width);
        policy.max_height = policy.max_height.max(policy.min_height);
        policy.base_width = policy.base_width.min(policy.max_width);
        policy.base_height = policy.base_height.min(policy.max_height);

        if flags.contains(SizeHintFlags::P_RESIZE_INC) {
            policy.width_inc = hints.width_inc.max(1);
            policy.height_inc = hints.height_inc.max(1);
        }
        if flags.contains(SizeHintFlags::P_ASPECT) {
            let valid = |(n, d): (u32, u32)| (n > 0 && d > 0).then_some((n, d));
            policy.min_aspect = valid(hints.min_aspect);
            policy.max_aspect = valid(hints.max_aspect);
        }
        if flags.contains(SizeHintFlags::P_WIN_GRAVITY) {
            policy.gravity = Gravity::from_u32(hints.win_gravity);
        }

        policy
    }

    /// Both dimensions pinned by min == max
    pub fn is_fixed(&self) -> bool {
        self.min_width >= self.max_width && self.min_height >= self.max_height
    }
}

/// Operations the user (and the client) may perform on the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedOperations {
    pub resize: bool,
    pub move_window: bool,
    pub iconify: bool,
    pub maximize: bool,
    pub close: bool,
}

impl AllowedOperations {
    pub fn all() -> Self {
        Self {
            resize: true,
            move_window: true,
            iconify: true,
            maximize: true,
            close: true,
        }
    }

    pub fn none() -> Self {
        Self {
            resize: false,
            move_window: false,
            iconify: false,
            maximize: false,
            close: false,
        }
    }
}

impl Default for AllowedOperations {
    fn default() -> Self {
        Self::all()
    }
}

/// The merged result of every hint source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub size: SizePolicy,
    pub functions: AllowedOperations,
    pub decorations: DecorationSet,
    pub focus_mode: FocusMode,
    pub initial_state: WmState,
    pub modal: bool,
}

impl Policy {
    /// Merge all sources. Precedence, lowest first: baseline, MWM hints
    /// (only the halves whose valid bit is set), Area decoration style,
    /// structural limits (transient, fixed size). Finally each disabled
    /// function takes its control away with it.
    pub fn merge(hints: &ClientHints) -> Self {
        let size = SizePolicy::from_hints(hints.size_hints.as_ref());
        let mut functions = AllowedOperations::all();
        let mut decorations = DecorationSet::full();

        if let Some(mwm) = hints.mwm_hints {
            if mwm.flags.contains(MwmFlags::FUNCTIONS) {
                functions = functions_from_mwm(mwm.functions);
            }
            if mwm.flags.contains(MwmFlags::DECORATIONS) {
                decorations = decorations_from_mwm(mwm.decorations);
            }
        }

        if let Some(manager) = hints.manager_hints {
            if manager.flags.contains(AttributeFlags::DECORATION) {
                apply_style(manager.decoration, &mut decorations, &mut functions);
            }
        }

        if hints.transient_for.is_some() {
            decorations.maximize = false;
            decorations.handle = false;
            functions.maximize = false;
        }
        if size.is_fixed() {
            functions.resize = false;
            functions.maximize = false;
        }

        if !functions.resize {
            decorations.handle = false;
        }
        if !functions.iconify {
            decorations.iconify = false;
        }
        if !functions.maximize {
            decorations.maximize = false;
        }
        if !functions.close {
            decorations.close = false;
        }

        let accepts_input = hints.wm_hints.map_or(true, |h| h.accepts_input());
        let take_focus = hints.protocols.contains(WmFlags::TAKEFOCUS);
        let focus_mode = FocusMode::classify(accepts_input, take_focus);

        let initial_state = match hints.wm_hints {
            Some(h) if h.flags.contains(WmHintFlags::STATE) && h.initial_state == 3 => {
                WmState::Iconic
            }
            _ => WmState::Normal,
        };

        let modal = hints.transient_for.is_some()
            && hints
                .manager_hints
                .and_then(|m| m.requested(AttributeFlags::MODAL))
                .unwrap_or(false);

        let policy = Self {
            size,
            functions,
            decorations,
            focus_mode,
            initial_state,
            modal,
        };
        debug!("Merged window policy: {:?}", policy);
        policy
    }
}

fn functions_from_mwm(bits: MwmFunctions) -> AllowedOperations {
    if bits.contains(MwmFunctions::ALL) {
        return AllowedOperations::all();
    }
    AllowedOperations {
        resize: bits.contains(MwmFunctions::RESIZE),
        move_window: bits.contains(MwmFunctions::MOVE),
        iconify: bits.contains(MwmFunctions::ICONIFY),
        maximize: bits.contains(MwmFunctions::MAXIMIZE),
        close: bits.contains(MwmFunctions::CLOSE),
    }
}

fn decorations_from_mwm(bits: MwmDecorations) -> DecorationSet {
    if bits.contains(MwmDecorations::ALL) {
        return DecorationSet::full();
    }
    DecorationSet {
        titlebar: bits.contains(MwmDecorations::TITLE),
        handle: bits.contains(MwmDecorations::HANDLE),
        border: bits.contains(MwmDecorations::BORDER),
        iconify: bits.contains(MwmDecorations::ICONIFY),
        maximize: bits.contains(MwmDecorations::MAXIMIZE),
        // MWM has no close decoration; the close function decides
        close: true,
        menu: bits.contains(MwmDecorations::MENU),
    }
}

fn apply_style(
    style: DecorationStyle,
    decorations: &mut DecorationSet,
    functions: &mut AllowedOperations,
) {
    match style {
        DecorationStyle::None => {
            *decorations = DecorationSet::none();
            functions.resize = false;
            functions.move_window = false;
            functions.iconify = false;
            functions.maximize = false;
        }
        DecorationStyle::Tiny => {
            *decorations = DecorationSet {
                titlebar: true,
                iconify: true,
                menu: true,
                close: decorations.close,
                ..DecorationSet::none()
            };
            functions.resize = false;
            functions.maximize = false;
        }
        DecorationStyle::Tool => {
            *decorations = DecorationSet {
                titlebar: true,
                menu: true,
                close: decorations.close,
                ..DecorationSet::none()
            };
            functions.move_window = true;
            functions.resize = false;
            functions.maximize = false;
            functions.iconify = false;
        }
        DecorationStyle::Normal => {
            *decorations = DecorationSet::full();
            *functions = AllowedOperations {
                close: functions.close,
                ..AllowedOperations::all()
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;
    use crate::wm::testing::RecordingConnection;

    fn size_values(flags: SizeHintFlags, min: (u32, u32), max: (u32, u32)) -> Vec<u32> {
        let mut v = vec![0u32; 18];
        v[0] = flags.bits();
        v[5] = min.0;
        v[6] = min.1;
        v[7] = max.0;
        v[8] = max.1;
        v
    }

    #[test]
    fn test_no_hints_gives_full_baseline() {
        let policy = Policy::merge(&ClientHints::default());
        assert_eq!(policy.decorations, DecorationSet::full());
        assert_eq!(policy.functions, AllowedOperations::all());
        assert_eq!(policy.focus_mode, FocusMode::Passive);
        assert_eq!(policy.initial_state, WmState::Normal);
        assert_eq!(policy.size.min_width, 1);
        assert_eq!(policy.size.width_inc, 1);
        assert_eq!(policy.size.min_aspect, None);
        assert!(!policy.modal);
    }

    #[test]
    fn test_short_properties_are_ignored() {
        assert!(SizeHints::from_values(&[0; 14]).is_none());
        assert!(WmHints::from_values(&[1, 0]).is_none());
        assert!(MwmHints::from_values(&[3, 0]).is_none());
        assert!(ManagerHints::from_values(&[0; 4]).is_none());
        assert!(ManagerAttributes::from_values(&[0; 7]).is_none());
    }

    #[test]
    fn test_old_size_hints_without_base() {
        let values = size_values(SizeHintFlags::P_MIN_SIZE, (40, 30), (0, 0));
        let hints = SizeHints::from_values(&values[..15]).unwrap();
        let policy = SizePolicy::from_hints(Some(&hints));
        assert_eq!((policy.min_width, policy.min_height), (40, 30));
        // base falls back to min
        assert_eq!((policy.base_width, policy.base_height), (40, 30));
        assert_eq!(policy.max_width, MAX_DIMENSION);
    }

    #[test]
    fn test_mwm_missing_resize_bit_drops_handle() {
        let hints = ClientHints {
            mwm_hints: Some(MwmHints {
                flags: MwmFlags::FUNCTIONS,
                functions: MwmFunctions::MOVE
                    | MwmFunctions::ICONIFY
                    | MwmFunctions::MAXIMIZE
                    | MwmFunctions::CLOSE,
                decorations: MwmDecorations::empty(),
            }),
            ..Default::default()
        };
        let policy = Policy::merge(&hints);
        assert!(!policy.functions.resize);
        assert!(!policy.decorations.handle);
        assert!(policy.functions.move_window);
        assert!(policy.decorations.titlebar);
        assert!(policy.decorations.maximize);
        assert!(policy.decorations.close);
    }

    #[test]
    fn test_mwm_decorations_without_valid_bit_are_ignored() {
        let hints = ClientHints {
            mwm_hints: Some(MwmHints {
                flags: MwmFlags::empty(),
                functions: MwmFunctions::empty(),
                decorations: MwmDecorations::empty(),
            }),
            ..Default::default()
        };
        assert_eq!(Policy::merge(&hints).decorations, DecorationSet::full());
    }

    #[test]
    fn test_mwm_borderless() {
        let hints = ClientHints {
            mwm_hints: Some(MwmHints {
                flags: MwmFlags::DECORATIONS,
                functions: MwmFunctions::empty(),
                decorations: MwmDecorations::empty(),
            }),
            ..Default::default()
        };
        let policy = Policy::merge(&hints);
        assert!(!policy.decorations.titlebar);
        assert!(!policy.decorations.border);
        assert!(!policy.decorations.handle);
        assert_eq!(policy.functions, AllowedOperations::all());
    }

    #[test]
    fn test_fixed_size_cannot_resize_or_maximize() {
        let values = size_values(
            SizeHintFlags::P_MIN_SIZE | SizeHintFlags::P_MAX_SIZE,
            (200, 100),
            (200, 100),
        );
        let hints = ClientHints {
            size_hints: SizeHints::from_values(&values),
            ..Default::default()
        };
        let policy = Policy::merge(&hints);
        assert!(!policy.functions.resize);
        assert!(!policy.functions.maximize);
        assert!(!policy.decorations.maximize);
        assert!(!policy.decorations.handle);
        assert!(policy.functions.iconify);
    }

    #[test]
    fn test_transient_has_no_maximize() {
        let hints = ClientHints {
            transient_for: Some(0x400001),
            ..Default::default()
        };
        let policy = Policy::merge(&hints);
        assert!(!policy.functions.maximize);
        assert!(!policy.decorations.handle);
        assert!(policy.functions.resize);
    }

    #[test]
    fn test_tool_style_overrides_mwm() {
        let hints = ClientHints {
            mwm_hints: Some(MwmHints {
                flags: MwmFlags::DECORATIONS,
                functions: MwmFunctions::empty(),
                decorations: MwmDecorations::ALL,
            }),
            manager_hints: Some(ManagerHints {
                flags: AttributeFlags::DECORATION,
                decoration: DecorationStyle::Tool,
                ..Default::default()
            }),
            ..Default::default()
        };
        let policy = Policy::merge(&hints);
        assert!(policy.decorations.titlebar);
        assert!(!policy.decorations.iconify);
        assert!(!policy.decorations.border);
        assert!(!policy.functions.iconify);
        assert!(policy.functions.move_window);
    }

    #[test]
    fn test_iconic_initial_state_and_focus_modes() {
        let mut hints = ClientHints {
            wm_hints: Some(WmHints {
                flags: WmHintFlags::INPUT | WmHintFlags::STATE,
                input: false,
                initial_state: 3,
                ..Default::default()
            }),
            ..Default::default()
        };
        let policy = Policy::merge(&hints);
        assert_eq!(policy.initial_state, WmState::Iconic);
        assert_eq!(policy.focus_mode, FocusMode::NoInput);

        hints.protocols = WmFlags::TAKEFOCUS;
        assert_eq!(Policy::merge(&hints).focus_mode, FocusMode::GloballyActive);
    }

    #[test]
    fn test_modal_requires_transient() {
        let manager = ManagerHints {
            flags: AttributeFlags::MODAL,
            attrib: AttributeFlags::MODAL,
            ..Default::default()
        };
        let mut hints = ClientHints {
            manager_hints: Some(manager),
            ..Default::default()
        };
        assert!(!Policy::merge(&hints).modal);
        hints.transient_for = Some(0x500002);
        assert!(Policy::merge(&hints).modal);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let values = size_values(
            SizeHintFlags::P_MIN_SIZE | SizeHintFlags::P_RESIZE_INC,
            (10, 10),
            (0, 0),
        );
        let hints = ClientHints {
            size_hints: SizeHints::from_values(&values),
            protocols: WmFlags::DELETE,
            ..Default::default()
        };
        assert_eq!(Policy::merge(&hints), Policy::merge(&hints.clone()));
    }

    #[test]
    fn test_attributes_values_layout() {
        let mut attributes = ManagerAttributes {
            workspace: 2,
            premax_x: -5,
            premax_width: 300,
            ..Default::default()
        };
        attributes.set(AttributeFlags::SHADED, true);
        let values = attributes.to_values();
        assert_eq!(values[0], AttributeFlags::SHADED.bits());
        assert_eq!(values[4] as i32, -5);
        assert_eq!(ManagerAttributes::from_values(&values), Some(attributes));
        assert!(attributes.is_set(AttributeFlags::SHADED));
    }

    #[test]
    fn test_fetch_reads_every_source() {
        let conn = RecordingConnection::new();
        let client = conn.add_client(Geometry::new(0, 0, 100, 100));
        conn.set_text(client, ClientProperty::Name, "xterm");
        conn.set_cardinals(
            client,
            ClientProperty::Hints,
            &[(WmHintFlags::INPUT | WmHintFlags::WINDOW_GROUP).bits(), 1, 0, 0, 0, 0, 0, 0, 0x600001],
        );
        conn.set_protocols(client, WmFlags::DELETE | WmFlags::TAKEFOCUS);
        conn.set_window_property(client, ClientProperty::TransientFor, client);

        let hints = ClientHints::fetch(&conn, client).unwrap();
        assert_eq!(hints.title, "xterm");
        assert_eq!(hints.icon_title, "xterm");
        assert_eq!(hints.window_group(), Some(0x600001));
        assert!(hints.protocols.contains(WmFlags::TAKEFOCUS));
        // transient for itself is no transient
        assert_eq!(hints.transient_for, None);
        assert_eq!(Policy::merge(&hints).focus_mode, FocusMode::LocallyActive);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let conn = RecordingConnection::new();
        let client = conn.add_client(Geometry::new(0, 0, 100, 100));
        let values = size_values(SizeHintFlags::P_MIN_SIZE, (20, 20), (0, 0));
        conn.set_cardinals(client, ClientProperty::NormalHints, &values);

        let mut hints = ClientHints::fetch(&conn, client).unwrap();
        let snapshot = hints.clone();
        for property in ClientHints::SOURCES {
            assert!(!hints.refresh(&conn, client, property).unwrap());
        }
        assert_eq!(hints, snapshot);

        conn.set_text(client, ClientProperty::Name, "renamed");
        assert!(hints.refresh(&conn, client, ClientProperty::Name).unwrap());
        assert_eq!(hints.size_hints, snapshot.size_hints);
    }
}
