//! Action strings → key chords
//!
//! An action is a `+`-joined list of modifiers followed by exactly one key,
//! e.g. `"space"`, `"ctrl+z"`, `"cmd+shift+v"`. Names are case-insensitive.

use crate::error::{Result, ShuttleError};
use evdev::Key;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    /// Command / Super / Windows key
    pub meta: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.alt || self.shift || self.meta)
    }

    /// Modifier keys in press order
    pub fn to_keys(&self) -> impl Iterator<Item = Key> + '_ {
        let mut keys = [Key::KEY_RESERVED; 4];
        let mut len = 0;
        if self.ctrl {
            keys[len] = Key::KEY_LEFTCTRL;
            len += 1;
        }
        if self.alt {
            keys[len] = Key::KEY_LEFTALT;
            len += 1;
        }
        if self.shift {
            keys[len] = Key::KEY_LEFTSHIFT;
            len += 1;
        }
        if self.meta {
            keys[len] = Key::KEY_LEFTMETA;
            len += 1;
        }

        keys.into_iter().take(len)
    }

    fn set(&mut self, name: &str) -> bool {
        match name {
            "cmd" | "command" | "meta" | "super" | "win" | "logo" => self.meta = true,
            "shift" => self.shift = true,
            "ctrl" | "control" | "ctl" => self.ctrl = true,
            "alt" | "opt" | "option" => self.alt = true,
            _ => return false,
        }
        true
    }
}

/// A resolved keystroke: modifiers plus one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyAction {
    pub mods: Modifiers,
    pub key: Key,
}

impl KeyAction {
    pub fn plain(key: Key) -> Self {
        Self {
            mods: Modifiers::default(),
            key,
        }
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.mods.ctrl {
            parts.push("Ctrl".into());
        }
        if self.mods.alt {
            parts.push("Alt".into());
        }
        if self.mods.shift {
            parts.push("Shift".into());
        }
        if self.mods.meta {
            parts.push("Meta".into());
        }
        parts.push(format!("{:?}", self.key));
        f.write_str(&parts.join("+"))
    }
}

/// Parse an action string such as `"cmd+shift+v"`
pub fn parse_action(action: &str) -> Result<KeyAction> {
    let tokens: Vec<&str> = action
        .split('+')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    // A lone "+" is the plus key, not an empty chord
    let (modifier_tokens, key_token) = match tokens.split_last() {
        Some((last, rest)) => (rest, *last),
        None if action.trim() == "+" => (&[][..], "+"),
        None => return Err(ShuttleError::UnknownKey(action.to_string())),
    };

    let mut mods = Modifiers::default();
    for token in modifier_tokens {
        if !mods.set(&token.to_lowercase()) {
            return Err(ShuttleError::UnknownKey(token.to_string()));
        }
    }

    let (key, implied_shift) =
        resolve_key(key_token).ok_or_else(|| ShuttleError::UnknownKey(key_token.to_string()))?;
    mods.shift |= implied_shift;

    Ok(KeyAction { mods, key })
}

/// Resolve a terminal key token. Returns the key and whether Shift is needed
/// to produce it (uppercase letters, shifted punctuation).
pub fn resolve_key(token: &str) -> Option<(Key, bool)> {
    if let Some(key) = named_key(&token.to_lowercase()) {
        return Some((key, false));
    }

    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => char_key(c),
        _ => None,
    }
}

fn named_key(name: &str) -> Option<Key> {
    let key = match name {
        "space" | "spacebar" => Key::KEY_SPACE,
        "return" | "enter" => Key::KEY_ENTER,
        "tab" => Key::KEY_TAB,
        "escape" | "esc" => Key::KEY_ESC,
        "backspace" => Key::KEY_BACKSPACE,
        "delete" | "del" | "forwarddelete" => Key::KEY_DELETE,
        "insert" | "ins" => Key::KEY_INSERT,
        "home" => Key::KEY_HOME,
        "end" => Key::KEY_END,
        "pageup" | "page_up" | "pgup" => Key::KEY_PAGEUP,
        "pagedown" | "page_down" | "pgdn" => Key::KEY_PAGEDOWN,
        "left" | "←" => Key::KEY_LEFT,
        "right" | "→" => Key::KEY_RIGHT,
        "up" | "↑" => Key::KEY_UP,
        "down" | "↓" => Key::KEY_DOWN,
        "capslock" => Key::KEY_CAPSLOCK,
        "menu" => Key::KEY_COMPOSE,
        "f1" => Key::KEY_F1,
        "f2" => Key::KEY_F2,
        "f3" => Key::KEY_F3,
        "f4" => Key::KEY_F4,
        "f5" => Key::KEY_F5,
        "f6" => Key::KEY_F6,
        "f7" => Key::KEY_F7,
        "f8" => Key::KEY_F8,
        "f9" => Key::KEY_F9,
        "f10" => Key::KEY_F10,
        "f11" => Key::KEY_F11,
        "f12" => Key::KEY_F12,
        "f13" => Key::KEY_F13,
        "f14" => Key::KEY_F14,
        "f15" => Key::KEY_F15,
        "f16" => Key::KEY_F16,
        "f17" => Key::KEY_F17,
        "f18" => Key::KEY_F18,
        "f19" => Key::KEY_F19,
        "f20" => Key::KEY_F20,
        "f21" => Key::KEY_F21,
        "f22" => Key::KEY_F22,
        "f23" => Key::KEY_F23,
        "f24" => Key::KEY_F24,
        "playpause" | "play" => Key::KEY_PLAYPAUSE,
        "stop" => Key::KEY_STOPCD,
        "next" | "nexttrack" => Key::KEY_NEXTSONG,
        "previous" | "prev" | "prevtrack" => Key::KEY_PREVIOUSSONG,
        "mute" => Key::KEY_MUTE,
        "volumeup" => Key::KEY_VOLUMEUP,
        "volumedown" => Key::KEY_VOLUMEDOWN,
        "plus" => Key::KEY_KPPLUS,
        _ => return None,
    };
    Some(key)
}

fn char_key(c: char) -> Option<(Key, bool)> {
    if c.is_ascii_uppercase() {
        return letter_key(c.to_ascii_lowercase()).map(|k| (k, true));
    }
    if let Some(key) = letter_key(c) {
        return Some((key, false));
    }

    let resolved = match c {
        '1' => (Key::KEY_1, false),
        '2' => (Key::KEY_2, false),
        '3' => (Key::KEY_3, false),
        '4' => (Key::KEY_4, false),
        '5' => (Key::KEY_5, false),
        '6' => (Key::KEY_6, false),
        '7' => (Key::KEY_7, false),
        '8' => (Key::KEY_8, false),
        '9' => (Key::KEY_9, false),
        '0' => (Key::KEY_0, false),
        '-' => (Key::KEY_MINUS, false),
        '=' => (Key::KEY_EQUAL, false),
        '[' => (Key::KEY_LEFTBRACE, false),
        ']' => (Key::KEY_RIGHTBRACE, false),
        ';' => (Key::KEY_SEMICOLON, false),
        '\'' => (Key::KEY_APOSTROPHE, false),
        '`' => (Key::KEY_GRAVE, false),
        '\\' => (Key::KEY_BACKSLASH, false),
        ',' => (Key::KEY_COMMA, false),
        '.' => (Key::KEY_DOT, false),
        '/' => (Key::KEY_SLASH, false),
        ' ' => (Key::KEY_SPACE, false),
        '!' => (Key::KEY_1, true),
        '@' => (Key::KEY_2, true),
        '#' => (Key::KEY_3, true),
        '$' => (Key::KEY_4, true),
        '%' => (Key::KEY_5, true),
        '^' => (Key::KEY_6, true),
        '&' => (Key::KEY_7, true),
        '*' => (Key::KEY_8, true),
        '(' => (Key::KEY_9, true),
        ')' => (Key::KEY_0, true),
        '_' => (Key::KEY_MINUS, true),
        '+' => (Key::KEY_EQUAL, true),
        '{' => (Key::KEY_LEFTBRACE, true),
        '}' => (Key::KEY_RIGHTBRACE, true),
        ':' => (Key::KEY_SEMICOLON, true),
        '"' => (Key::KEY_APOSTROPHE, true),
        '~' => (Key::KEY_GRAVE, true),
        '|' => (Key::KEY_BACKSLASH, true),
        '<' => (Key::KEY_COMMA, true),
        '>' => (Key::KEY_DOT, true),
        '?' => (Key::KEY_SLASH, true),
        '←' => (Key::KEY_LEFT, false),
        '→' => (Key::KEY_RIGHT, false),
        '↑' => (Key::KEY_UP, false),
        '↓' => (Key::KEY_DOWN, false),
        _ => return None,
    };
    Some(resolved)
}

fn letter_key(c: char) -> Option<Key> {
    let key = match c {
        'a' => Key::KEY_A,
        'b' => Key::KEY_B,
        'c' => Key::KEY_C,
        'd' => Key::KEY_D,
        'e' => Key::KEY_E,
        'f' => Key::KEY_F,
        'g' => Key::KEY_G,
        'h' => Key::KEY_H,
        'i' => Key::KEY_I,
        'j' => Key::KEY_J,
        'k' => Key::KEY_K,
        'l' => Key::KEY_L,
        'm' => Key::KEY_M,
        'n' => Key::KEY_N,
        'o' => Key::KEY_O,
        'p' => Key::KEY_P,
        'q' => Key::KEY_Q,
        'r' => Key::KEY_R,
        's' => Key::KEY_S,
        't' => Key::KEY_T,
        'u' => Key::KEY_U,
        'v' => Key::KEY_V,
        'w' => Key::KEY_W,
        'x' => Key::KEY_X,
        'y' => Key::KEY_Y,
        'z' => Key::KEY_Z,
        _ => return None,
    };
    Some(key)
}

/// Every key an action string can resolve to, used to declare the
/// capabilities of the virtual keyboard.
pub fn all_keys() -> Vec<Key> {
    const NAMES: &[&str] = &[
        "space", "return", "tab", "escape", "backspace", "delete", "insert", "home", "end",
        "pageup", "pagedown", "left", "right", "up", "down", "capslock", "menu", "f1", "f2",
        "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "f13", "f14", "f15",
        "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23", "f24", "playpause", "stop",
        "next", "previous", "mute", "volumeup", "volumedown", "plus",
    ];

    let mut keys: Vec<Key> = NAMES.iter().filter_map(|n| named_key(n)).collect();
    keys.extend((' '..='~').filter_map(char_key).map(|(k, _)| k));
    keys.extend(
        Modifiers {
            ctrl: true,
            alt: true,
            shift: true,
            meta: true,
        }
        .to_keys(),
    );
    keys.sort_by_key(|k| k.code());
    keys.dedup();
    keys
}
