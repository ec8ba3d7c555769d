//! Synthetic keystroke output through a uinput virtual keyboard

use crate::keys::{self, KeyAction};
use anyhow::{Context, Result};
use evdev::{AttributeSet, EventType, InputEvent, Key, uinput::VirtualDevice, uinput::VirtualDeviceBuilder};
use tracing::info;

/// Name of the virtual keyboard as it appears in /dev/input
pub const VIRTUAL_KEYBOARD_NAME: &str = "ShuttleLinux Virtual Keyboard";

/// Anything that can type a key chord
pub trait KeySink: Send {
    /// Press and release one chord
    fn tap(&mut self, action: &KeyAction) -> Result<()>;
}

/// Events for one tap: modifiers down, key down, sync, key up, modifiers up, sync
pub fn tap_events(action: &KeyAction) -> Vec<InputEvent> {
    let sync = || InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
    let mut out: Vec<InputEvent> = Vec::new();

    for m in action.mods.to_keys() {
        out.push(InputEvent::new(EventType::KEY, m.code(), 1));
    }
    out.push(InputEvent::new(EventType::KEY, action.key.code(), 1));
    out.push(sync());

    out.push(InputEvent::new(EventType::KEY, action.key.code(), 0));
    let mods: Vec<Key> = action.mods.to_keys().collect();
    for m in mods.iter().rev() {
        out.push(InputEvent::new(EventType::KEY, m.code(), 0));
    }
    out.push(sync());
    out
}

pub struct UinputKeyboard {
    vdev: VirtualDevice,
}

impl UinputKeyboard {
    /// Create the virtual keyboard with every key an action can produce
    pub fn new() -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for key in keys::all_keys() {
            keys.insert(key);
        }

        let vdev = VirtualDeviceBuilder::new()
            .context("Failed to create uinput builder (is the uinput module loaded?)")?
            .name(VIRTUAL_KEYBOARD_NAME)
            .with_keys(&keys)
            .context("Failed to set key capabilities")?
            .build()
            .context("Failed to build uinput device")?;

        info!("Virtual keyboard '{}' created", VIRTUAL_KEYBOARD_NAME);
        Ok(Self { vdev })
    }
}

impl KeySink for UinputKeyboard {
    fn tap(&mut self, action: &KeyAction) -> Result<()> {
        self.vdev
            .emit(&tap_events(action))
            .with_context(|| format!("uinput emit failed for {}", action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::parse_action;

    #[test]
    fn test_plain_tap_events() {
        let events = tap_events(&parse_action("space").unwrap());
        let summary: Vec<(u16, i32)> = events.iter().map(|e| (e.code(), e.value())).collect();
        assert_eq!(
            summary,
            vec![(Key::KEY_SPACE.code(), 1), (0, 0), (Key::KEY_SPACE.code(), 0), (0, 0)]
        );
    }

    #[test]
    fn test_chord_order() {
        let events = tap_events(&parse_action("ctrl+shift+z").unwrap());
        let keys: Vec<(u16, i32)> = events
            .iter()
            .filter(|e| e.event_type() == EventType::KEY)
            .map(|e| (e.code(), e.value()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Key::KEY_LEFTCTRL.code(), 1),
                (Key::KEY_LEFTSHIFT.code(), 1),
                (Key::KEY_Z.code(), 1),
                (Key::KEY_Z.code(), 0),
                (Key::KEY_LEFTSHIFT.code(), 0),
                (Key::KEY_LEFTCTRL.code(), 0),
            ]
        );
    }
}
