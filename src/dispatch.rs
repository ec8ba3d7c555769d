//! Logical event → keystroke

use crate::error::ShuttleError;
use crate::event::LogicalEvent;
use crate::inject::KeySink;
use crate::keys::{KeyAction, parse_action};
use crate::mapping::MappingHandle;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// What became of a dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Keystroke handed to the sink
    Sent(KeyAction),
    /// Button with no mapping entry
    Unmapped,
    /// Mapping names a key we can't produce
    Dropped(String),
}

/// Resolves events against the current mapping table and types them.
/// Shared between the poll loop and the shuttle repeater; the sink lock keeps
/// taps from interleaving.
pub struct ActionDispatcher<S: KeySink> {
    mappings: MappingHandle,
    sink: Mutex<S>,
}

impl<S: KeySink> ActionDispatcher<S> {
    pub fn new(mappings: MappingHandle, sink: S) -> Self {
        Self {
            mappings,
            sink: Mutex::new(sink),
        }
    }

    pub fn mappings(&self) -> &MappingHandle {
        &self.mappings
    }

    /// Resolve an event to a keystroke without sending it
    pub fn resolve(&self, event: &LogicalEvent) -> Result<Option<KeyAction>, ShuttleError> {
        let table = self.mappings.current();
        match table.action_for(event) {
            Some(action) => parse_action(action).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve and type an event. Never fails: unknown keys and injection
    /// errors are logged and the event is dropped.
    pub fn dispatch(&self, event: LogicalEvent) -> Dispatch {
        let action = match self.resolve(&event) {
            Ok(Some(action)) => action,
            Ok(None) => {
                debug!("{}: no mapping", event);
                return Dispatch::Unmapped;
            }
            Err(e) => {
                warn!("{}: {} - event dropped", event, e);
                return Dispatch::Dropped(e.to_string());
            }
        };

        match event {
            LogicalEvent::ButtonPressed(_) => info!("{} -> {}", event, action),
            _ => debug!("{} -> {}", event, action),
        }

        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = sink.tap(&action) {
            warn!("Failed to send {}: {:#}", action, e);
        }
        Dispatch::Sent(action)
    }

    /// Consume the dispatcher and hand back the sink
    pub fn into_sink(self) -> S {
        self.sink.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Direction;
    use crate::mapping::MappingTable;
    use evdev::Key;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        taps: Vec<KeyAction>,
        fail: bool,
    }

    impl KeySink for Recorder {
        fn tap(&mut self, action: &KeyAction) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("sink offline");
            }
            self.taps.push(*action);
            Ok(())
        }
    }

    fn dispatcher(toml: &str) -> ActionDispatcher<Recorder> {
        let table = MappingTable::parse(toml, false).unwrap();
        ActionDispatcher::new(MappingHandle::new(table), Recorder::default())
    }

    #[test]
    fn test_button_dispatch() {
        let d = dispatcher("button_2 = \"cmd+shift+v\"");
        let result = d.dispatch(LogicalEvent::ButtonPressed(2));
        let Dispatch::Sent(action) = result else {
            panic!("expected a keystroke, got {result:?}");
        };
        assert!(action.mods.meta && action.mods.shift);
        assert_eq!(action.key, Key::KEY_V);
        assert_eq!(d.into_sink().taps.len(), 1);
    }

    #[test]
    fn test_unmapped_button() {
        let d = dispatcher("button_2 = \"a\"");
        assert_eq!(d.dispatch(LogicalEvent::ButtonPressed(3)), Dispatch::Unmapped);
        assert!(d.into_sink().taps.is_empty());
    }

    #[test]
    fn test_unknown_key_dropped() {
        let d = dispatcher("button_1 = \"foobar\"");
        assert!(matches!(d.dispatch(LogicalEvent::ButtonPressed(1)), Dispatch::Dropped(_)));
        assert!(d.into_sink().taps.is_empty());
    }

    #[test]
    fn test_builtin_jog_and_shuttle() {
        let d = dispatcher("");
        d.dispatch(LogicalEvent::JogStep(Direction::Left));
        d.dispatch(LogicalEvent::ShuttleTick(Direction::Right, 4));
        let taps = d.into_sink().taps;
        assert_eq!(taps, vec![KeyAction::plain(Key::KEY_LEFT), KeyAction::plain(Key::KEY_RIGHT)]);
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        let table = MappingTable::parse("button_1 = \"a\"", false).unwrap();
        let d = ActionDispatcher::new(
            MappingHandle::new(table),
            Recorder {
                fail: true,
                ..Default::default()
            },
        );
        assert!(matches!(d.dispatch(LogicalEvent::ButtonPressed(1)), Dispatch::Sent(_)));
    }

    #[test]
    fn test_reload_visible_to_dispatch() {
        let d = dispatcher("button_1 = \"a\"");
        let replacement = MappingTable::parse("button_1 = \"b\"", false).unwrap();
        d.mappings().replace(Arc::new(replacement));
        assert_eq!(
            d.dispatch(LogicalEvent::ButtonPressed(1)),
            Dispatch::Sent(KeyAction::plain(Key::KEY_B))
        );
    }
}
