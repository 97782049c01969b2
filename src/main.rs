use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use orrery::actuator::{Actuator, SimulatedTransport, Transport};
use orrery::bus::SharedBus;
use orrery::catalog::{parse_multi_tle, SatelliteRecord, TleCache};
use orrery::clock::{Clock, SystemClock};
use orrery::config::Config;
use orrery::persist::{FileNvStore, FlashFile, NvStore, PersistManager, Snapshot, SNAPSHOT_LEN};
use orrery::session::{
    Mode, SessionController, SessionError, SessionHandle, SessionRunner, SessionSettings,
};

#[derive(Parser)]
#[command(name = "orrery")]
#[command(about = "Orbit globe drive and control loop")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control loop against simulated servos
    Run {
        config: PathBuf,
        /// Import every TLE in this file into the catalog first
        #[arg(long)]
        import: Option<PathBuf>,
        /// Track this catalog satellite instead of resuming
        #[arg(long)]
        track: Option<String>,
    },
    /// Validate a configuration file
    Validate { config: PathBuf },
    /// Print the ground track and drive angles for the first TLE in a file
    GroundTrack {
        tle_file: PathBuf,
        /// RFC 3339 instant, defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Decode a state snapshot from an NVM image
    Snapshot {
        image: PathBuf,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            import,
            track,
        } => run(&config, import.as_deref(), track.as_deref()),
        Commands::Validate { config } => validate(&config),
        Commands::GroundTrack { tle_file, at } => ground_track(&tle_file, at.as_deref()),
        Commands::Snapshot { image, offset } => snapshot(&image, offset),
    }
}

fn validate(path: &Path) -> ExitCode {
    match Config::from_file(path) {
        Ok(config) => {
            println!("Configuration is valid");
            println!(
                "  aov: motor {} gear {:.3}:1, eqx: motor {} gear {:.3}:1",
                config.axes.aov.motor_id,
                config.axes.aov.gear_ratio,
                config.axes.eqx.motor_id,
                config.axes.eqx.gear_ratio
            );
            match &config.persistence.nvm_image {
                Some(image) => println!("  nvm: {}", image.display()),
                None => println!("  nvm: none (flash only)"),
            }
            println!("  flash: {}", config.persistence.flash_path.display());
            println!("  catalog: {}", config.catalog.cache_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn ground_track(path: &Path, at: Option<&str>) -> ExitCode {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let at = match at.map(DateTime::parse_from_rfc3339).transpose() {
        Ok(at) => at.map_or_else(Utc::now, |t| t.with_timezone(&Utc)),
        Err(e) => {
            eprintln!("Invalid time: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(text) = parse_multi_tle(&content).into_iter().next() else {
        eprintln!("No TLE found in {}", path.display());
        return ExitCode::FAILURE;
    };
    let record = match SatelliteRecord::from_tle(&text, None, at.timestamp()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("TLE error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let propagator = match record.propagator() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Elements error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let track = propagator.ground_track(at.timestamp());
    println!("{} ({}) at {}", record.name, record.norad_id, at.to_rfc3339());
    println!("  t since epoch: {:.2} min", track.t_min);
    println!(
        "  lat {:.3}°, lon {:.3}°, alt {:.1} km",
        track.geodetic.latitude_deg, track.geodetic.longitude_deg, track.geodetic.altitude_km
    );
    println!(
        "  aov {:.3}°, eqx {:.3}°",
        track.angles.aov_deg, track.angles.eqx_deg
    );
    ExitCode::SUCCESS
}

fn snapshot(path: &Path, offset: usize) -> ExitCode {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let Some(slot) = bytes.get(offset..offset + SNAPSHOT_LEN) else {
        eprintln!("Image holds {} bytes, need {} at offset {}", bytes.len(), SNAPSHOT_LEN, offset);
        return ExitCode::FAILURE;
    };
    match Snapshot::decode(slot) {
        Ok(snapshot) => {
            let saved_at = DateTime::from_timestamp(snapshot.timestamp, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| snapshot.timestamp.to_string());
            println!("Saved at {}", saved_at);
            match serde_json::to_string_pretty(&snapshot) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Error formatting snapshot: {}", e),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Invalid snapshot: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Switches to tracking `track` when given, else follows the manual orbit
/// unless resume already picked a mode.
fn start_session<T: Transport, S: NvStore>(
    handle: &SessionHandle<T, S>,
    track: Option<&str>,
) -> Result<(), SessionError> {
    match track {
        Some(name) => {
            if handle.mode() != Mode::Menu {
                if let Err(e) = handle.back() {
                    warn!("Could not leave {} mode: {}", handle.mode(), e);
                }
            }
            handle.enter_tracking(name)
        }
        None if handle.mode() == Mode::Menu => handle.enter_orbit(),
        None => Ok(()),
    }
}

fn run(path: &Path, import: Option<&Path>, track: Option<&str>) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let settings = match SessionSettings::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut catalog = TleCache::open(config.catalog.cache_path.clone());
    if let Some(tle_file) = import {
        match catalog.import_file(tle_file, clock.now_unix()) {
            Ok(count) => {
                info!("Imported {} TLE set(s) from {}", count, tle_file.display());
                if let Err(e) = catalog.save() {
                    warn!("Catalog not saved: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Import error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let transport = SimulatedTransport::new(config.actuator.transport_timeout)
        .with_motor(config.axes.aov.motor_id, 0.0)
        .with_motor(config.axes.eqx.motor_id, 0.0);
    let bus = SharedBus::new(transport);
    let actuator_settings = config.actuator.settings();
    let aov = Actuator::connect("aov", bus.clone(), config.axes.aov, actuator_settings);
    let eqx = Actuator::connect("eqx", bus, config.axes.eqx, actuator_settings);

    let nvm = match &config.persistence.nvm_image {
        Some(image) => match FileNvStore::open(image, config.persistence.nvm_capacity) {
            Ok(store) => Some(SharedBus::new(store)),
            Err(e) => {
                warn!("NVM image {} unavailable, flash only: {}", image.display(), e);
                None
            }
        },
        None => None,
    };
    let persist = PersistManager::new(nvm, FlashFile::new(config.persistence.flash_path.clone()));

    let controller = SessionController::new(aov, eqx, persist, catalog, clock, settings);
    let handle = SessionHandle::new(controller);

    let report = handle.resume();
    info!("Boot: {:?}", report);
    let started = start_session(&handle, track);
    if let Err(e) = started {
        eprintln!("Could not start session: {}", e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let period = config.session.loop_period;
    runtime.block_on(async {
        let mut runner = SessionRunner::new(handle.clone(), period);
        if let Err(e) = runner.start() {
            error!("{}", e);
            return;
        }
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Signal handler: {}", e);
        }
        info!("Shutting down");
        runner.stop().await;
    });

    if let Err(e) = handle.stop_tracking() {
        warn!("Hold on shutdown: {}", e);
    }
    match handle.force_save() {
        Ok(tier) => info!("State saved to {}", tier),
        Err(e) => error!("Final save failed: {}", e),
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery::actuator::{ActuatorSettings, AxisSpec};
    use orrery::clock::ManualClock;
    use orrery::persist::MemoryNvStore;

    fn handle(dir: &Path) -> SessionHandle<SimulatedTransport, MemoryNvStore> {
        let bus = SharedBus::new(SimulatedTransport::default().with_motor(1, 0.0).with_motor(2, 0.0));
        let axis = |motor_id| AxisSpec {
            motor_id,
            gear_ratio: 1.0,
            velocity_limit: 2,
        };
        let settings = ActuatorSettings::default();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_unix(1_700_000_000));
        SessionHandle::new(SessionController::new(
            Actuator::connect("aov", bus.clone(), axis(2), settings),
            Actuator::connect("eqx", bus, axis(1), settings),
            PersistManager::new(
                Some(SharedBus::new(MemoryNvStore::new(236))),
                FlashFile::new(dir.join("state.json")),
            ),
            TleCache::open(dir.join("tle.json")),
            clock,
            SessionSettings::default(),
        ))
    }

    #[test]
    fn starts_the_manual_orbit_from_menu() {
        let dir = tempfile::tempdir().unwrap();
        let handle = handle(dir.path());
        start_session(&handle, None).unwrap();
        assert_eq!(handle.mode(), Mode::Orbit);

        start_session(&handle, None).unwrap();
        assert_eq!(handle.mode(), Mode::Orbit);
    }

    #[test]
    fn tracking_request_leaves_the_orbit_first() {
        let dir = tempfile::tempdir().unwrap();
        let handle = handle(dir.path());
        handle.enter_orbit().unwrap();

        let err = start_session(&handle, Some("NOPE")).unwrap_err();
        assert!(matches!(err, SessionError::Catalog(_)));
        assert_eq!(handle.mode(), Mode::Menu);
    }
}
