//! Report → logical events

use crate::buttons::ButtonEdgeDetector;
use crate::error::Result;
use crate::event::LogicalEvent;
use crate::jog::JogTracker;
use crate::protocol::ShuttleReport;
use crate::shuttle::{SharedShuttle, ShuttleTracker};
use std::time::{Duration, Instant};

/// All per-device tracking state. Owned by the poll loop; only the shuttle
/// position is shared (with the repeater) through [`SharedShuttle`].
#[derive(Debug)]
pub struct Engine {
    jog: JogTracker,
    shuttle: ShuttleTracker,
    buttons: ButtonEdgeDetector,
}

impl Engine {
    pub fn new(jog_interval: Duration) -> Self {
        Self {
            jog: JogTracker::new(jog_interval),
            shuttle: ShuttleTracker::new(SharedShuttle::new()),
            buttons: ButtonEdgeDetector::new(),
        }
    }

    /// Handle for the shuttle repeater
    pub fn shuttle(&self) -> SharedShuttle {
        self.shuttle.shared()
    }

    /// Decode one raw report and feed every tracker. Button edges come first
    /// (ascending), then at most one jog step. Shuttle movement only updates
    /// the shared state; its ticks come from the repeater.
    ///
    /// A malformed report is rejected before any state is touched.
    pub fn handle_report(&mut self, raw: &[u8], now: Instant) -> Result<Vec<LogicalEvent>> {
        let report = ShuttleReport::from_bytes(raw)?;
        Ok(self.handle_decoded(&report, now))
    }

    pub fn handle_decoded(&mut self, report: &ShuttleReport, now: Instant) -> Vec<LogicalEvent> {
        let mut events = self.buttons.update(report.buttons_low, report.buttons_high);
        events.extend(self.jog.update(report.jog_position, now));
        self.shuttle.update(report.shuttle_position);
        events
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(crate::jog::DEFAULT_JOG_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShuttleError;
    use crate::event::Direction;
    use crate::shuttle::ShuttlePosition;

    fn report(shuttle: u8, jog: u8, low: u8, high: u8) -> [u8; 5] {
        [shuttle, jog, 0, low, high]
    }

    #[test]
    fn test_first_report_has_no_jog_step() {
        let mut engine = Engine::default();
        let events = engine.handle_report(&report(0, 77, 0, 0), Instant::now()).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_same_report_twice() {
        let t0 = Instant::now();
        let mut engine = Engine::default();
        engine.handle_report(&report(0, 10, 0, 0), t0).unwrap();

        let r = report(3, 12, 0b1, 0);
        let first = engine.handle_report(&r, t0 + Duration::from_millis(20)).unwrap();
        assert_eq!(
            first,
            vec![LogicalEvent::ButtonPressed(1), LogicalEvent::JogStep(Direction::Right)]
        );
        let second = engine.handle_report(&r, t0 + Duration::from_millis(40)).unwrap();
        assert!(second.is_empty());
        // shuttle stays deflected so the repeater keeps going
        assert_eq!(
            engine.shuttle().snapshot(),
            ShuttlePosition::Deflected { direction: Direction::Right, displacement: 3 }
        );
    }

    #[test]
    fn test_malformed_report_leaves_state_alone() {
        let t0 = Instant::now();
        let mut engine = Engine::default();
        engine.handle_report(&report(0, 10, 0, 0), t0).unwrap();

        let err = engine.handle_report(&[5, 20], t0).unwrap_err();
        assert!(matches!(err, ShuttleError::MalformedReport { len: 2, .. }));
        assert_eq!(engine.shuttle().snapshot(), ShuttlePosition::Centered);

        // jog still diffs against 10, not 20
        let events = engine
            .handle_report(&report(0, 9, 0, 0), t0 + Duration::from_millis(20))
            .unwrap();
        assert_eq!(events, vec![LogicalEvent::JogStep(Direction::Left)]);
    }

    #[test]
    fn test_shuttle_center_resets() {
        let mut engine = Engine::default();
        let now = Instant::now();
        engine.handle_report(&report(253, 0, 0, 0), now).unwrap();
        assert_eq!(engine.shuttle().snapshot().direction(), Some(Direction::Left));
        engine.handle_report(&report(0, 0, 0, 0), now).unwrap();
        assert!(!engine.shuttle().snapshot().is_active());
    }
}
