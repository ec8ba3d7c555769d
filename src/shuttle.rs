//! Shuttle ring tracking and repeat generation
//!
//! The poll loop only classifies the ring position and publishes it in a
//! shared [`ShuttlePosition`]. A separate [`ShuttleRepeater`] thread turns a
//! deflected ring into a stream of ticks whose rate grows with the deflection,
//! so the repeat cadence is independent of the device poll cadence.

use crate::event::{Direction, LogicalEvent};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Largest displacement the ring reports
pub const MAX_DISPLACEMENT: u8 = 7;

/// Classified ring state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShuttlePosition {
    #[default]
    Centered,
    Deflected { direction: Direction, displacement: u8 },
}

impl ShuttlePosition {
    /// Classify a raw ring value. Values outside the documented ranges are
    /// treated as centered.
    pub fn classify(raw: u8) -> Self {
        match raw {
            1..=7 => ShuttlePosition::Deflected {
                direction: Direction::Right,
                displacement: raw,
            },
            249..=255 => ShuttlePosition::Deflected {
                direction: Direction::Left,
                displacement: (256 - raw as u16) as u8,
            },
            _ => ShuttlePosition::Centered,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ShuttlePosition::Deflected { .. })
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            ShuttlePosition::Deflected { direction, .. } => Some(*direction),
            ShuttlePosition::Centered => None,
        }
    }

    /// 0 when centered
    pub fn displacement(&self) -> u8 {
        match self {
            ShuttlePosition::Deflected { displacement, .. } => *displacement,
            ShuttlePosition::Centered => 0,
        }
    }
}

/// Shuttle state shared between the poll loop (writer) and the repeater (reader)
#[derive(Debug, Clone, Default)]
pub struct SharedShuttle {
    inner: Arc<Mutex<ShuttlePosition>>,
}

impl SharedShuttle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ShuttlePosition {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new position, returning the previous one
    pub fn store(&self, position: ShuttlePosition) -> ShuttlePosition {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, position)
    }
}

/// Poll-loop side of the shuttle: classifies reports and publishes the state
#[derive(Debug, Default)]
pub struct ShuttleTracker {
    shared: SharedShuttle,
}

impl ShuttleTracker {
    pub fn new(shared: SharedShuttle) -> Self {
        Self { shared }
    }

    pub fn shared(&self) -> SharedShuttle {
        self.shared.clone()
    }

    /// Feed one raw ring value. Transitions are logged once; repeated reports
    /// of the same position are silent.
    pub fn update(&mut self, raw: u8) -> ShuttlePosition {
        let position = ShuttlePosition::classify(raw);
        if raw != 0 && !position.is_active() {
            debug!("Shuttle: undefined ring value {:#04x}, treating as centered", raw);
        }

        let previous = self.shared.store(position);
        if previous != position {
            match position {
                ShuttlePosition::Deflected { direction, displacement } => {
                    info!("Shuttle: {} at speed {}", direction, displacement);
                }
                ShuttlePosition::Centered => info!("Shuttle: centered"),
            }
        }
        position
    }
}

/// Timing of the repeat generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatTiming {
    pub base_interval: Duration,
    pub step_reduction: Duration,
    pub min_interval: Duration,
    /// Wake-up period while centered; also the longest uninterrupted sleep
    pub idle_poll: Duration,
}

impl Default for RepeatTiming {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(250),
            step_reduction: Duration::from_millis(30),
            min_interval: Duration::from_millis(10),
            idle_poll: Duration::from_millis(50),
        }
    }
}

impl RepeatTiming {
    /// Interval between ticks for a displacement:
    /// `max(min, base - displacement * step)`
    pub fn interval(&self, displacement: u8) -> Duration {
        let reduction = self.step_reduction * displacement as u32;
        self.base_interval
            .saturating_sub(reduction)
            .max(self.min_interval)
    }
}

/// Background thread that emits [`LogicalEvent::ShuttleTick`] while the ring is deflected
pub struct ShuttleRepeater {
    stop: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<()>>,
}

impl ShuttleRepeater {
    /// Start the repeat loop. `stop` is the process-wide shutdown flag; the
    /// repeater also owns a private flag so it can be stopped on its own.
    pub fn start<F>(
        shared: SharedShuttle,
        timing: RepeatTiming,
        shutdown: Arc<AtomicBool>,
        on_tick: F,
    ) -> Self
    where
        F: FnMut(LogicalEvent) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = stop.clone();

        let join = thread::Builder::new()
            .name("shuttle-repeat".into())
            .spawn(move || {
                run_repeat_loop(shared, timing, stop_thread, shutdown, on_tick);
            });

        let join = match join {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to spawn shuttle repeat thread: {}", e);
                None
            }
        };

        Self { stop, join }
    }

    /// Stop the repeater and wait for its thread
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ShuttleRepeater {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_repeat_loop<F>(
    shared: SharedShuttle,
    timing: RepeatTiming,
    stop: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    mut on_tick: F,
) where
    F: FnMut(LogicalEvent),
{
    let stopped = || stop.load(Ordering::Relaxed) || shutdown.load(Ordering::Relaxed);
    info!("Shuttle repeater running");

    while !stopped() {
        let ShuttlePosition::Deflected { direction, displacement } = shared.snapshot() else {
            thread::sleep(timing.idle_poll);
            continue;
        };

        on_tick(LogicalEvent::ShuttleTick(direction, displacement));

        // Wait out the interval in slices so centering or shutdown is seen
        // within one idle period. A change of speed or direction restarts
        // the cycle immediately.
        let deadline = Instant::now() + timing.interval(displacement);
        loop {
            if stopped() {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(timing.idle_poll));
            let current = shared.snapshot();
            if current.direction() != Some(direction) || current.displacement() != displacement {
                break;
            }
        }
    }

    info!("Shuttle repeater stopped");
}
