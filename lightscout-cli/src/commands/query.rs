//! Query command - one-shot proximity query against a dataset.

use std::path::PathBuf;

use lightscout::alert::ZoneThresholds;
use lightscout::index::{NearbyLight, SpatialIndex};

use crate::error::CliError;

/// Arguments for the query command.
pub struct QueryArgs {
    pub dataset: PathBuf,
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    pub heading: Option<f64>,
    pub cone: f64,
}

/// Run the query command.
pub fn run(args: QueryArgs) -> Result<(), CliError> {
    let index = SpatialIndex::open(&args.dataset)?;
    let lights = index.query(args.lat, args.lon, args.radius, args.heading, args.cone)?;

    match args.heading {
        Some(heading) => println!(
            "Lights within {:.0} m of {:.6}, {:.6} heading {:.0}° (±{:.0}°):",
            args.radius, args.lat, args.lon, heading, args.cone
        ),
        None => println!(
            "Lights within {:.0} m of {:.6}, {:.6}:",
            args.radius, args.lat, args.lon
        ),
    }

    if lights.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    print!("{}", format_table(&lights, &ZoneThresholds::default()));
    Ok(())
}

fn format_table(lights: &[NearbyLight], zones: &ZoneThresholds) -> String {
    let mut out = format!(
        "  {:>10}  {:>11}  {:>12}  {:>10}  {}\n",
        "ID", "LAT", "LON", "DIST (m)", "ZONE"
    );
    for light in lights {
        out.push_str(&format!(
            "  {:>10}  {:>11.6}  {:>12.6}  {:>10.1}  {}\n",
            light.id,
            light.lat,
            light.lon,
            light.distance_m,
            zones.classify(light.distance_m)
        ));
    }
    out
}
