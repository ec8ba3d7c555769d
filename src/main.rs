//! ShuttleLinux - ShuttlePRO to keyboard bridge
//!
//! Polls the controller, runs the shuttle repeater in the background and
//! types the mapped keys through a virtual keyboard until ctrl-c.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shuttlelinux::device::{self, ShuttleDevice};
use shuttlelinux::dispatch::ActionDispatcher;
use shuttlelinux::engine::Engine;
use shuttlelinux::inject::UinputKeyboard;
use shuttlelinux::keys::parse_action;
use shuttlelinux::mapping::{FileMappings, MappingHandle, MappingSource, MappingTable};
use shuttlelinux::poller;
use shuttlelinux::settings::{self, AppSettings};
use shuttlelinux::shuttle::ShuttleRepeater;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shuttlelinux", version, about = "ShuttlePRO jog/shuttle to keyboard bridge")]
struct Cli {
    /// Settings file (default: ~/.config/shuttlelinux/settings.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Mapping file, overrides the settings file
    #[arg(short, long, global = true)]
    mappings: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate device input into key presses (default)
    Run,
    /// List connected devices from the configured vendor
    List,
    /// Validate every action in the mapping file
    CheckMappings,
    /// Print decoded reports without sending keys
    Dump,
    /// Write a default settings file if none exists
    WriteConfig,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings_path = match &cli.config {
        Some(p) => p.clone(),
        None => AppSettings::settings_path()?,
    };
    let settings = AppSettings::load_from(&settings_path)?;
    let base_dir = match settings_path.parent() {
        Some(dir) => dir.to_path_buf(),
        None => settings::config_dir()?,
    };
    let mapping_path = cli
        .mappings
        .clone()
        .unwrap_or_else(|| settings.resolve_mapping_path(&base_dir));

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_bridge(&settings, &mapping_path),
        Command::List => list_devices(&settings),
        Command::CheckMappings => check_mappings(&mapping_path),
        Command::Dump => dump_reports(&settings),
        Command::WriteConfig => write_config(&settings_path),
    }
}

/// Shutdown flag raised by ctrl-c
fn shutdown_flag() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown requested");
        stop_handler.store(true, Ordering::Relaxed);
    })
    .context("Failed to install signal handler")?;
    Ok(stop)
}

fn run_bridge(settings: &AppSettings, mapping_path: &Path) -> Result<()> {
    info!("ShuttleLinux starting...");
    let stop = shutdown_flag()?;

    let mut source = ShuttleDevice::open(settings.device.vendor_id, settings.device.product_id)
        .context("Could not open the controller (check permissions on /dev/hidraw*)")?;

    let mut mappings = FileMappings::open(mapping_path);
    let keyboard = UinputKeyboard::new()?;
    let dispatcher = Arc::new(ActionDispatcher::new(
        MappingHandle::new(mappings.current().as_ref().clone()),
        keyboard,
    ));

    let mut engine = Engine::new(settings.jog_interval());

    let tick_dispatcher = dispatcher.clone();
    let repeater = ShuttleRepeater::start(
        engine.shuttle(),
        settings.repeat_timing(),
        stop.clone(),
        move |event| {
            tick_dispatcher.dispatch(event);
        },
    );

    let result = poller::run_poll_loop(
        &mut source,
        &mut engine,
        dispatcher.as_ref(),
        &mut mappings,
        &settings.poll_config(),
        &stop,
    );

    // Either way the repeater must not outlive the poll loop
    stop.store(true, Ordering::Relaxed);
    repeater.stop();

    result.context("Poll loop terminated")?;
    info!("ShuttleLinux shutting down");
    Ok(())
}

fn list_devices(settings: &AppSettings) -> Result<()> {
    let devices = device::list_devices(settings.device.vendor_id)?;
    if devices.is_empty() {
        println!("No devices with vendor id {:04x} found", settings.device.vendor_id);
        return Ok(());
    }

    for d in &devices {
        let marker = if d.product_id == settings.device.product_id { "*" } else { " " };
        println!(
            "{} {:04x}:{:04x}  {} {}  (interface {}, {})",
            marker, d.vendor_id, d.product_id, d.manufacturer, d.product, d.interface_number, d.path
        );
    }
    Ok(())
}

fn check_mappings(path: &Path) -> Result<()> {
    let table = MappingTable::load(path)?;
    let mut bad = 0usize;

    for (name, action) in table.iter() {
        match parse_action(action) {
            Ok(resolved) => println!("{:<16} {:<20} -> {}", name, action, resolved),
            Err(e) => {
                bad += 1;
                println!("{:<16} {:<20} !! {}", name, action, e);
            }
        }
    }

    if bad > 0 {
        anyhow::bail!("{} of {} mapping(s) in {:?} cannot be resolved", bad, table.len(), path);
    }
    info!("All {} mapping(s) in {:?} resolve", table.len(), path);
    Ok(())
}

fn dump_reports(settings: &AppSettings) -> Result<()> {
    let stop = shutdown_flag()?;
    let mut source = ShuttleDevice::open(settings.device.vendor_id, settings.device.product_id)?;
    let count = poller::run_dump_loop(&mut source, &settings.poll_config(), &stop)?;
    info!("{} report(s) received", count);
    Ok(())
}

fn write_config(path: &Path) -> Result<()> {
    if path.exists() {
        warn!("{:?} already exists, leaving it alone", path);
        return Ok(());
    }
    AppSettings::default().save_to(path)
}
