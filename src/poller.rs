//! Device poll loop
//!
//! Reads the controller without blocking, feeds each report through the
//! [`Engine`] and dispatches the resulting events. Runs until the shutdown
//! flag is raised or the device read fails; a read failure is fatal.

use crate::device::ReportSource;
use crate::dispatch::ActionDispatcher;
use crate::engine::Engine;
use crate::error::{Result, ShuttleError};
use crate::inject::KeySink;
use crate::mapping::MappingSource;
use crate::protocol::{READ_BUFFER_SIZE, ShuttleReport, hex_dump};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Sleep between reads
    pub interval: Duration,
    pub report_size: usize,
    /// How often the mapping source is asked for changes
    pub mapping_check_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5),
            report_size: READ_BUFFER_SIZE,
            mapping_check_interval: Duration::from_millis(250),
        }
    }
}

/// Counters returned when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub reports: u64,
    pub malformed: u64,
    pub events: u64,
    pub reloads: u64,
}

pub fn run_poll_loop<R, S>(
    source: &mut R,
    engine: &mut Engine,
    dispatcher: &ActionDispatcher<S>,
    mappings: &mut dyn MappingSource,
    config: &PollConfig,
    stop: &AtomicBool,
) -> Result<PollStats>
where
    R: ReportSource + ?Sized,
    S: KeySink,
{
    let mut stats = PollStats::default();
    let mut buf = vec![0u8; config.report_size.max(1)];
    let mut last_mapping_check: Option<Instant> = None;

    dispatcher.mappings().replace(mappings.current());
    info!("Polling device every {:?}", config.interval);

    while !stop.load(Ordering::Relaxed) {
        let due = last_mapping_check
            .is_none_or(|t| t.elapsed() >= config.mapping_check_interval);
        if due {
            last_mapping_check = Some(Instant::now());
            if let Some(table) = mappings.poll_for_update() {
                info!("Mappings reloaded ({} entries)", table.len());
                dispatcher.mappings().replace(table);
                stats.reloads += 1;
            }
        }

        let len = match source.read_report(&mut buf) {
            Ok(len) => len,
            Err(e) => {
                error!("Device read failed, stopping: {}", e);
                return Err(e);
            }
        };

        if len > 0 {
            stats.reports += 1;
            debug!("Report ({} bytes): {}", len, hex_dump(&buf[..len]));

            match engine.handle_report(&buf[..len], Instant::now()) {
                Ok(events) => {
                    for event in events {
                        stats.events += 1;
                        dispatcher.dispatch(event);
                    }
                }
                Err(e @ ShuttleError::MalformedReport { .. }) => {
                    stats.malformed += 1;
                    warn!("Skipping report: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        thread::sleep(config.interval);
    }

    info!(
        "Poll loop stopped after {} report(s), {} event(s)",
        stats.reports, stats.events
    );
    Ok(stats)
}

/// Print every decoded report without injecting anything
pub fn run_dump_loop<R>(source: &mut R, config: &PollConfig, stop: &AtomicBool) -> Result<u64>
where
    R: ReportSource + ?Sized,
{
    let mut buf = vec![0u8; config.report_size.max(1)];
    let mut count = 0u64;

    while !stop.load(Ordering::Relaxed) {
        let len = source.read_report(&mut buf)?;
        if len > 0 {
            count += 1;
            match ShuttleReport::from_bytes(&buf[..len]) {
                Ok(report) => println!(
                    "{}  shuttle={:#04x} jog={:3} buttons={:015b}",
                    hex_dump(&buf[..len]),
                    report.shuttle_position,
                    report.jog_position,
                    report.buttons()
                ),
                Err(e) => println!("{}  ({})", hex_dump(&buf[..len]), e),
            }
        }
        thread::sleep(config.interval);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Direction;
    use crate::keys::KeyAction;
    use crate::mapping::{MappingHandle, MappingTable, StaticMappings};
    use evdev::Key;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Plays back scripted reads, then raises the stop flag
    struct Script {
        reads: VecDeque<Result<Vec<u8>>>,
        stop: Arc<AtomicBool>,
    }

    impl ReportSource for Script {
        fn read_report(&mut self, buf: &mut [u8]) -> Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => {
                    self.stop.store(true, Ordering::Relaxed);
                    Ok(0)
                }
            }
        }
    }

    #[derive(Clone, Default)]
    struct SharedRecorder(Arc<Mutex<Vec<KeyAction>>>);

    impl KeySink for SharedRecorder {
        fn tap(&mut self, action: &KeyAction) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(*action);
            Ok(())
        }
    }

    fn config() -> PollConfig {
        PollConfig {
            // above the jog rate limit so every step counts
            interval: Duration::from_millis(12),
            ..PollConfig::default()
        }
    }

    #[test]
    fn test_loop_dispatches_events() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut source = Script {
            reads: VecDeque::from(vec![
                Ok(vec![0, 100, 0, 0, 0]),
                Ok(vec![]),
                Ok(vec![0, 101, 0, 0b10, 0]),
                Ok(vec![0, 99]),
                Ok(vec![0, 99, 0, 0b10, 0]),
            ]),
            stop: stop.clone(),
        };
        let recorder = SharedRecorder::default();
        let dispatcher = ActionDispatcher::new(MappingHandle::default(), recorder.clone());
        let mut mappings =
            StaticMappings::new(MappingTable::parse("button_2 = \"return\"", false).unwrap());
        let mut engine = Engine::default();

        let stats =
            run_poll_loop(&mut source, &mut engine, &dispatcher, &mut mappings, &config(), &stop)
                .unwrap();

        assert_eq!(stats.reports, 4);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.events, 3);

        let taps = recorder.0.lock().unwrap().clone();
        assert_eq!(
            taps,
            vec![
                KeyAction::plain(Key::KEY_ENTER),
                KeyAction::plain(Key::KEY_RIGHT),
                KeyAction::plain(Key::KEY_LEFT),
            ]
        );
    }

    #[test]
    fn test_read_error_is_fatal() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut source = Script {
            reads: VecDeque::from(vec![
                Ok(vec![0, 1, 0, 0, 0]),
                Err(ShuttleError::DeviceRead("unplugged".into())),
                Ok(vec![0, 2, 0, 0, 0]),
            ]),
            stop: stop.clone(),
        };
        let dispatcher = ActionDispatcher::new(MappingHandle::default(), SharedRecorder::default());
        let mut mappings = StaticMappings::default();
        let mut engine = Engine::default();

        let result =
            run_poll_loop(&mut source, &mut engine, &dispatcher, &mut mappings, &config(), &stop);
        assert!(matches!(result, Err(ShuttleError::DeviceRead(_))));
        // remaining reads untouched
        assert_eq!(source.reads.len(), 1);
    }

    #[test]
    fn test_shuttle_state_published() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut source = Script {
            reads: VecDeque::from(vec![Ok(vec![250, 0, 0, 0, 0])]),
            stop: stop.clone(),
        };
        let dispatcher = ActionDispatcher::new(MappingHandle::default(), SharedRecorder::default());
        let mut mappings = StaticMappings::default();
        let mut engine = Engine::default();
        let shuttle = engine.shuttle();

        run_poll_loop(&mut source, &mut engine, &dispatcher, &mut mappings, &config(), &stop)
            .unwrap();
        assert_eq!(shuttle.snapshot().direction(), Some(Direction::Left));
        assert_eq!(shuttle.snapshot().displacement(), 6);
    }

    #[test]
    fn test_stop_flag_preset() {
        let stop = AtomicBool::new(true);
        let mut source = Script {
            reads: VecDeque::from(vec![Ok(vec![0, 1, 0, 1, 0])]),
            stop: Arc::new(AtomicBool::new(false)),
        };
        let dispatcher = ActionDispatcher::new(MappingHandle::default(), SharedRecorder::default());
        let mut mappings = StaticMappings::default();
        let stats = run_poll_loop(
            &mut source,
            &mut Engine::default(),
            &dispatcher,
            &mut mappings,
            &config(),
            &stop,
        )
        .unwrap();
        assert_eq!(stats, PollStats::default());
    }
}
