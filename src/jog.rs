//! Jog wheel tracking
//!
//! The jog wheel reports a free-running 8-bit counter. We diff consecutive
//! positions along the shorter way round the circle and turn any movement into
//! a single left/right step, rate-limited so a fast spin doesn't flood the
//! keystroke channel.

use crate::event::{Direction, LogicalEvent};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default minimum time between two emitted jog steps
pub const DEFAULT_JOG_INTERVAL: Duration = Duration::from_millis(10);

/// Signed distance from `previous` to `current`, normalized into (-128, 128]
pub fn normalize_delta(previous: u8, current: u8) -> i16 {
    let mut delta = current as i16 - previous as i16;
    if delta > 128 {
        delta -= 256;
    } else if delta < -128 {
        delta += 256;
    }
    delta
}

#[derive(Debug)]
pub struct JogTracker {
    previous_position: Option<u8>,
    last_event_time: Option<Instant>,
    min_interval: Duration,
}

impl JogTracker {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            previous_position: None,
            last_event_time: None,
            min_interval,
        }
    }

    /// Feed one jog position sampled at `now`
    pub fn update(&mut self, position: u8, now: Instant) -> Option<LogicalEvent> {
        let Some(previous) = self.previous_position.replace(position) else {
            debug!("Jog: initial position {}", position);
            return None;
        };

        let delta = normalize_delta(previous, position);
        if delta == 0 {
            return None;
        }

        let due = self
            .last_event_time
            .is_none_or(|last| now.saturating_duration_since(last) >= self.min_interval);
        if !due {
            debug!("Jog: delta {} suppressed by rate limit", delta);
            return None;
        }

        self.last_event_time = Some(now);
        let direction = if delta > 0 { Direction::Right } else { Direction::Left };
        Some(LogicalEvent::JogStep(direction))
    }
}

impl Default for JogTracker {
    fn default() -> Self {
        Self::new(DEFAULT_JOG_INTERVAL)
    }
}
