//! Bidirectional key-name <-> virtual-key-code lookup.
//!
//! Built once into process-wide read-only maps on first use. Lookups are
//! case-insensitive; aliases fold many names onto one code while the
//! reverse direction always yields the canonical spelling.

use crate::types::{KeyCode, INVALID_KEY};
use std::collections::HashMap;

pub const VK_SHIFT: KeyCode = 0x10;
pub const VK_CONTROL: KeyCode = 0x11;
pub const VK_MENU: KeyCode = 0x12;
pub const VK_CAPITAL: KeyCode = 0x14;
pub const VK_LWIN: KeyCode = 0x5B;
pub const VK_RWIN: KeyCode = 0x5C;
pub const VK_NUMLOCK: KeyCode = 0x90;
pub const VK_SCROLL: KeyCode = 0x91;
pub const VK_LSHIFT: KeyCode = 0xA0;
pub const VK_RSHIFT: KeyCode = 0xA1;
pub const VK_LCONTROL: KeyCode = 0xA2;
pub const VK_RCONTROL: KeyCode = 0xA3;
pub const VK_LMENU: KeyCode = 0xA4;
pub const VK_RMENU: KeyCode = 0xA5;

/// Canonical name table. The first entry for a code wins the reverse
/// mapping, so canonical spellings must precede nothing here (aliases
/// live in `ALIASES` and never enter the reverse map).
const KEY_TABLE: &[(&str, KeyCode)] = &[
    // Letters
    ("A", 0x41),
    ("B", 0x42),
    ("C", 0x43),
    ("D", 0x44),
    ("E", 0x45),
    ("F", 0x46),
    ("G", 0x47),
    ("H", 0x48),
    ("I", 0x49),
    ("J", 0x4A),
    ("K", 0x4B),
    ("L", 0x4C),
    ("M", 0x4D),
    ("N", 0x4E),
    ("O", 0x4F),
    ("P", 0x50),
    ("Q", 0x51),
    ("R", 0x52),
    ("S", 0x53),
    ("T", 0x54),
    ("U", 0x55),
    ("V", 0x56),
    ("W", 0x57),
    ("X", 0x58),
    ("Y", 0x59),
    ("Z", 0x5A),
    // Digits
    ("0", 0x30),
    ("1", 0x31),
    ("2", 0x32),
    ("3", 0x33),
    ("4", 0x34),
    ("5", 0x35),
    ("6", 0x36),
    ("7", 0x37),
    ("8", 0x38),
    ("9", 0x39),
    // Function keys
    ("F1", 0x70),
    ("F2", 0x71),
    ("F3", 0x72),
    ("F4", 0x73),
    ("F5", 0x74),
    ("F6", 0x75),
    ("F7", 0x76),
    ("F8", 0x77),
    ("F9", 0x78),
    ("F10", 0x79),
    ("F11", 0x7A),
    ("F12", 0x7B),
    // Left/right modifier pairs, then the generic variants
    ("LShift", VK_LSHIFT),
    ("RShift", VK_RSHIFT),
    ("LControl", VK_LCONTROL),
    ("RControl", VK_RCONTROL),
    ("LAlt", VK_LMENU),
    ("RAlt", VK_RMENU),
    ("LWin", VK_LWIN),
    ("RWin", VK_RWIN),
    ("Shift", VK_SHIFT),
    ("Control", VK_CONTROL),
    ("Alt", VK_MENU),
    // Specials
    ("Escape", 0x1B),
    ("Tab", 0x09),
    ("CapsLock", VK_CAPITAL),
    ("Space", 0x20),
    ("Enter", 0x0D),
    ("Backspace", 0x08),
    ("Delete", 0x2E),
    ("Insert", 0x2D),
    ("Home", 0x24),
    ("End", 0x23),
    ("PageUp", 0x21),
    ("PageDown", 0x22),
    ("PrintScreen", 0x2C),
    ("ScrollLock", VK_SCROLL),
    ("Pause", 0x13),
    // Arrows
    ("ArrowLeft", 0x25),
    ("ArrowUp", 0x26),
    ("ArrowRight", 0x27),
    ("ArrowDown", 0x28),
    // Numpad
    ("NumLock", VK_NUMLOCK),
    ("Numpad0", 0x60),
    ("Numpad1", 0x61),
    ("Numpad2", 0x62),
    ("Numpad3", 0x63),
    ("Numpad4", 0x64),
    ("Numpad5", 0x65),
    ("Numpad6", 0x66),
    ("Numpad7", 0x67),
    ("Numpad8", 0x68),
    ("Numpad9", 0x69),
    ("NumpadMultiply", 0x6A),
    ("NumpadAdd", 0x6B),
    ("NumpadSubtract", 0x6D),
    ("NumpadDecimal", 0x6E),
    ("NumpadDivide", 0x6F),
    // OEM punctuation
    ("Semicolon", 0xBA),
    ("Equal", 0xBB),
    ("Comma", 0xBC),
    ("Minus", 0xBD),
    ("Period", 0xBE),
    ("Slash", 0xBF),
    ("Backquote", 0xC0),
    ("BracketLeft", 0xDB),
    ("Backslash", 0xDC),
    ("BracketRight", 0xDD),
    ("Quote", 0xDE),
];

/// Alternate spellings folding onto canonical names.
const ALIASES: &[(&str, &str)] = &[
    ("Esc", "Escape"),
    ("Return", "Enter"),
    ("NumpadEnter", "Enter"),
    ("Caps", "CapsLock"),
    ("Ctrl", "Control"),
    ("LCtrl", "LControl"),
    ("RCtrl", "RControl"),
    ("Win", "LWin"),
    ("Del", "Delete"),
    ("PgUp", "PageUp"),
    ("PgDn", "PageDown"),
    ("Left", "ArrowLeft"),
    ("Right", "ArrowRight"),
    ("Up", "ArrowUp"),
    ("Down", "ArrowDown"),
];

lazy_static::lazy_static! {
    static ref NAME_TO_CODE: HashMap<String, KeyCode> = {
        let mut map = HashMap::new();
        for &(name, code) in KEY_TABLE {
            map.insert(name.to_ascii_uppercase(), code);
        }
        for &(alias, canonical) in ALIASES {
            let code = map[&canonical.to_ascii_uppercase()];
            map.insert(alias.to_ascii_uppercase(), code);
        }
        map
    };

    static ref CODE_TO_NAME: HashMap<KeyCode, &'static str> = {
        let mut map = HashMap::new();
        for &(name, code) in KEY_TABLE {
            map.entry(code).or_insert(name);
        }
        map
    };
}

/// Code for a key name, or `INVALID_KEY` when the name is unknown.
pub fn code_for_name(name: &str) -> KeyCode {
    let needle = name.trim().to_ascii_uppercase();
    NAME_TO_CODE.get(&needle).copied().unwrap_or(INVALID_KEY)
}

/// Canonical name for a code, or `None` when the code is unknown.
pub fn name_for_code(code: KeyCode) -> Option<&'static str> {
    CODE_TO_NAME.get(&code).copied()
}

pub fn is_valid_name(name: &str) -> bool {
    code_for_name(name) != INVALID_KEY
}

/// All canonical key names, in table order.
pub fn valid_names() -> impl Iterator<Item = &'static str> {
    KEY_TABLE.iter().map(|&(name, _)| name)
}

/// Shift/control/alt/win variants, left, right or generic.
pub fn is_modifier_key(code: KeyCode) -> bool {
    matches!(
        code,
        VK_SHIFT
            | VK_CONTROL
            | VK_MENU
            | VK_LWIN
            | VK_RWIN
            | VK_LSHIFT
            | VK_RSHIFT
            | VK_LCONTROL
            | VK_RCONTROL
            | VK_LMENU
            | VK_RMENU
    )
}

/// Keys whose physical state toggles instead of momentarily activating.
pub fn is_lock_key(code: KeyCode) -> bool {
    matches!(code, VK_CAPITAL | VK_NUMLOCK | VK_SCROLL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_canonical_for_every_valid_name() {
        for name in valid_names() {
            let code = code_for_name(name);
            assert_ne!(code, INVALID_KEY, "table name {name} must resolve");
            let canonical = name_for_code(code).expect("reverse lookup");
            assert_eq!(
                code_for_name(canonical),
                code,
                "round trip through {name} -> {code:#x} -> {canonical}"
            );
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(code_for_name("capslock"), VK_CAPITAL);
        assert_eq!(code_for_name("CAPSLOCK"), VK_CAPITAL);
        assert_eq!(code_for_name("  CapsLock  "), VK_CAPITAL);
    }

    #[test]
    fn aliases_fold_onto_canonical_codes() {
        assert_eq!(code_for_name("Esc"), code_for_name("Escape"));
        assert_eq!(code_for_name("Caps"), code_for_name("CapsLock"));
        assert_eq!(code_for_name("Win"), code_for_name("LWin"));
        // Reverse lookup never surfaces an alias.
        assert_eq!(name_for_code(code_for_name("Esc")), Some("Escape"));
        assert_eq!(name_for_code(VK_LWIN), Some("LWin"));
    }

    #[test]
    fn unknown_lookups_yield_sentinels() {
        assert_eq!(code_for_name("NoSuchKey"), INVALID_KEY);
        assert_eq!(code_for_name(""), INVALID_KEY);
        assert_eq!(name_for_code(INVALID_KEY), None);
        assert_eq!(name_for_code(0xFE), None);
    }

    #[test]
    fn modifier_and_lock_classification() {
        for name in ["LShift", "RShift", "LControl", "RControl", "LAlt", "RAlt", "LWin", "RWin"] {
            assert!(is_modifier_key(code_for_name(name)), "{name}");
        }
        assert!(!is_modifier_key(code_for_name("A")));

        assert!(is_lock_key(VK_CAPITAL));
        assert!(is_lock_key(VK_NUMLOCK));
        assert!(is_lock_key(VK_SCROLL));
        assert!(!is_lock_key(code_for_name("Space")));
    }
}
