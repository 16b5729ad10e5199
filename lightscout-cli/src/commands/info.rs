//! Info command - print dataset statistics.

use std::path::PathBuf;

use lightscout::index::SpatialIndex;

use crate::error::CliError;

/// Run the info command.
pub fn run(dataset: PathBuf) -> Result<(), CliError> {
    let index = SpatialIndex::open(&dataset)?;
    let stats = index.stats();

    println!("Dataset: {}", dataset.display());
    println!("  Lights:    {}", stats.count);
    println!("  File size: {:.2} MB", stats.file_size_mb());
    match stats.bounds {
        Some(bounds) => {
            println!("  Latitude:  {:.6} .. {:.6}", bounds.min_lat, bounds.max_lat);
            println!("  Longitude: {:.6} .. {:.6}", bounds.min_lon, bounds.max_lon);
        }
        None => println!("  Bounds:    (empty dataset)"),
    }

    Ok(())
}
