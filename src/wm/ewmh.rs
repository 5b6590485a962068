//! Atoms Module
//!
//! Interned ICCCM, EWMH, Motif and manager-specific atoms, and the mapping
//! between them and the properties the controller understands.

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt as _};

use crate::wm::client_flags::WmFlags;
use crate::wm::connection::{ClientProperty, ProtocolMessage};

/// Holds all interned atoms
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_take_focus: Atom,
    pub wm_state: Atom,
    pub wm_change_state: Atom,
    pub net_wm_name: Atom,
    pub net_wm_icon_name: Atom,
    pub utf8_string: Atom,
    pub motif_wm_hints: Atom,
    /// _AREA_HINTS
    pub area_hints: Atom,
    /// _AREA_ATTRIBUTES
    pub area_attributes: Atom,
    /// _AREA_CHANGE_ATTRIBUTES
    pub area_change_attributes: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };

        Ok(Self {
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            wm_take_focus: intern("WM_TAKE_FOCUS")?,
            wm_state: intern("WM_STATE")?,
            wm_change_state: intern("WM_CHANGE_STATE")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            net_wm_icon_name: intern("_NET_WM_ICON_NAME")?,
            utf8_string: intern("UTF8_STRING")?,
            motif_wm_hints: intern("_MOTIF_WM_HINTS")?,
            area_hints: intern("_AREA_HINTS")?,
            area_attributes: intern("_AREA_ATTRIBUTES")?,
            area_change_attributes: intern("_AREA_CHANGE_ATTRIBUTES")?,
        })
    }

    /// Atom a property is stored under. Names prefer the UTF-8 EWMH atom;
    /// see `legacy`.
    pub fn property(&self, property: ClientProperty) -> Atom {
        match property {
            ClientProperty::Name => self.net_wm_name,
            ClientProperty::IconName => self.net_wm_icon_name,
            ClientProperty::NormalHints => AtomEnum::WM_NORMAL_HINTS.into(),
            ClientProperty::Hints => AtomEnum::WM_HINTS.into(),
            ClientProperty::Protocols => self.wm_protocols,
            ClientProperty::MotifHints => self.motif_wm_hints,
            ClientProperty::ManagerHints => self.area_hints,
            ClientProperty::ManagerAttributes => self.area_attributes,
            ClientProperty::TransientFor => AtomEnum::WM_TRANSIENT_FOR.into(),
            ClientProperty::WmState => self.wm_state,
        }
    }

    /// ICCCM fallback for the two text properties
    pub fn legacy(&self, property: ClientProperty) -> Option<Atom> {
        match property {
            ClientProperty::Name => Some(AtomEnum::WM_NAME.into()),
            ClientProperty::IconName => Some(AtomEnum::WM_ICON_NAME.into()),
            _ => None,
        }
    }

    /// Type written alongside a cardinal property
    pub fn property_type(&self, property: ClientProperty) -> Atom {
        match property {
            ClientProperty::WmState => self.wm_state,
            ClientProperty::ManagerAttributes => self.area_attributes,
            _ => AtomEnum::CARDINAL.into(),
        }
    }

    /// Which hint source a PropertyNotify atom belongs to
    pub fn classify(&self, atom: Atom) -> Option<ClientProperty> {
        const ALL: [ClientProperty; 10] = [
            ClientProperty::Name,
            ClientProperty::IconName,
            ClientProperty::NormalHints,
            ClientProperty::Hints,
            ClientProperty::Protocols,
            ClientProperty::MotifHints,
            ClientProperty::ManagerHints,
            ClientProperty::ManagerAttributes,
            ClientProperty::TransientFor,
            ClientProperty::WmState,
        ];
        ALL.into_iter()
            .find(|p| self.property(*p) == atom || self.legacy(*p) == Some(atom))
    }

    pub fn protocol(&self, message: ProtocolMessage) -> Atom {
        match message {
            ProtocolMessage::DeleteWindow => self.wm_delete_window,
            ProtocolMessage::TakeFocus => self.wm_take_focus,
        }
    }

    /// Fold a WM_PROTOCOLS atom list into flags; unknown atoms are ignored
    pub fn protocols(&self, atoms: impl IntoIterator<Item = Atom>) -> WmFlags {
        atoms.into_iter().fold(WmFlags::empty(), |flags, atom| {
            if atom == self.wm_delete_window {
                flags | WmFlags::DELETE
            } else if atom == self.wm_take_focus {
                flags | WmFlags::TAKEFOCUS
            } else {
                flags
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms() -> Atoms {
        Atoms {
            wm_protocols: 300,
            wm_delete_window: 301,
            wm_take_focus: 302,
            wm_state: 303,
            wm_change_state: 304,
            net_wm_name: 305,
            net_wm_icon_name: 306,
            utf8_string: 307,
            motif_wm_hints: 308,
            area_hints: 309,
            area_attributes: 310,
            area_change_attributes: 311,
        }
    }

    #[test]
    fn test_classify_both_name_atoms() {
        let atoms = atoms();
        assert_eq!(atoms.classify(305), Some(ClientProperty::Name));
        assert_eq!(
            atoms.classify(AtomEnum::WM_NAME.into()),
            Some(ClientProperty::Name)
        );
        assert_eq!(
            atoms.classify(AtomEnum::WM_NORMAL_HINTS.into()),
            Some(ClientProperty::NormalHints)
        );
        assert_eq!(atoms.classify(311), None);
    }

    #[test]
    fn test_protocol_list() {
        let atoms = atoms();
        assert_eq!(atoms.protocols([301, 999]), WmFlags::DELETE);
        assert_eq!(
            atoms.protocols([302, 301]),
            WmFlags::DELETE | WmFlags::TAKEFOCUS
        );
    }
}
