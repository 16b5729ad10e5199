//! Run command - live proximity alerts from a GPS receiver.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use lightscout::alert::Zone;
use lightscout::config::{default_config_path, ConfigFile};
use lightscout::logging::{default_log_dir, default_log_file, init_logging};
use lightscout::pipeline::{PipelineConfig, ProximityPipeline};
use tracing::info;

use crate::error::CliError;

/// How often the status line is logged while running.
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// Arguments for the run command. `None` keeps the config file value.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub dataset: Option<PathBuf>,
    pub gps: Option<String>,
    pub baud: Option<u32>,
    pub actuator: Option<String>,
    pub radius: Option<f64>,
    pub interval: Option<f64>,
    pub verbose: bool,
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let log_dir = Path::new(default_log_dir());
    let _logging_guard = init_logging(log_dir, default_log_file(), args.verbose)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config = ConfigFile::load(&config_path)?.into_pipeline_config();
    let config = apply_overrides(config, &args)?;

    info!(
        version = lightscout::VERSION,
        config = %config_path.display(),
        "LightScout starting"
    );

    let last_zone: Mutex<Option<(i64, Zone)>> = Mutex::new(None);
    let pipeline = ProximityPipeline::builder(config)
        .on_alert(move |alert| {
            let mut last = last_zone.lock().unwrap_or_else(|e| e.into_inner());
            if *last != Some((alert.light_id, alert.zone)) {
                info!(
                    light_id = alert.light_id,
                    zone = %alert.zone,
                    distance_m = format!("{:.0}", alert.distance_m),
                    "Traffic light {}",
                    alert.zone
                );
                *last = Some((alert.light_id, alert.zone));
            }
            Ok(())
        })
        .build();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    pipeline.start()?;
    println!("Running. Press Ctrl+C to stop.");

    let mut last_status = Instant::now();
    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
        if last_status.elapsed() >= STATUS_INTERVAL {
            log_status(&pipeline);
            last_status = Instant::now();
        }
    }

    println!();
    info!("Shutting down");
    let stats = pipeline.stats();
    pipeline.stop();
    println!(
        "Processed {} queries (avg {:.2} ms)",
        stats.query_count,
        stats.avg_query_ms()
    );
    Ok(())
}

fn log_status(pipeline: &ProximityPipeline) {
    let status = pipeline.status();
    match pipeline.current_fix() {
        Some(fix) => info!(
            lat = fix.latitude,
            lon = fix.longitude,
            speed_kmh = fix.speed_kmh().unwrap_or(0),
            satellites = fix.satellite_count,
            nearest_m = status.stats.last_nearest_m,
            nearby = status.stats.nearby_count,
            "Status"
        ),
        None => info!(
            lines = status.tracker.lines_read,
            "Status: waiting for GPS fix"
        ),
    }
}

/// Overlay command line values on the loaded configuration.
fn apply_overrides(
    mut config: PipelineConfig,
    args: &RunArgs,
) -> Result<PipelineConfig, CliError> {
    if let Some(dataset) = &args.dataset {
        config = config.with_dataset(dataset);
    }
    if let Some(gps) = &args.gps {
        config.sensor_channel = gps.clone();
    }
    if let Some(baud) = args.baud {
        config.sensor_baud = baud;
    }
    if let Some(actuator) = &args.actuator {
        let baud = config.actuator_baud;
        config = config.with_actuator(actuator, baud);
    }
    if let Some(radius) = args.radius {
        config = config.with_search_radius(radius);
    }
    if let Some(secs) = args.interval {
        if !(secs.is_finite() && secs > 0.0) {
            return Err(CliError::Config(format!(
                "--interval must be greater than zero, got {}",
                secs
            )));
        }
        let interval = Duration::try_from_secs_f64(secs)
            .map_err(|_| CliError::Config(format!("--interval {} is too large", secs)))?;
        config = config.with_poll_interval(interval);
    }
    config.validate().map_err(CliError::Config)?;
    Ok(config)
}
