//! Dataset file loading and structural validation.
//!
//! The dataset is a JSON document:
//!
//! ```json
//! { "version": 1, "lights": [ { "id": 1, "lat": 45.0, "lon": -75.0 } ] }
//! ```
//!
//! Files ending in `.gz` are decompressed on the fly.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use super::error::{IndexError, IndexResult};
use super::record::LightRecord;

/// Dataset format version understood by this build.
pub const DATASET_VERSION: u32 = 1;

/// On-disk dataset document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDocument {
    pub version: u32,
    pub lights: Vec<LightRecord>,
}

impl DatasetDocument {
    /// Wrap records in a document of the current version.
    pub fn new(lights: Vec<LightRecord>) -> Self {
        Self {
            version: DATASET_VERSION,
            lights,
        }
    }
}

/// Records read from a dataset file, plus the file size.
pub(crate) struct LoadedDataset {
    pub records: Vec<LightRecord>,
    pub file_size_bytes: u64,
}

/// Read and validate a dataset file.
pub(crate) fn load_file(path: &Path) -> IndexResult<LoadedDataset> {
    if !path.exists() {
        return Err(IndexError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let file_size_bytes = file.metadata()?.len();

    let records = if path.extension().is_some_and(|ext| ext == "gz") {
        tracing::debug!(path = %path.display(), "Loading gzip compressed dataset");
        read_records(BufReader::new(GzDecoder::new(file)))?
    } else {
        read_records(BufReader::new(file))?
    };

    Ok(LoadedDataset {
        records,
        file_size_bytes,
    })
}

/// Parse and validate a dataset document from a reader.
pub(crate) fn read_records<R: Read>(reader: R) -> IndexResult<Vec<LightRecord>> {
    let document: DatasetDocument = serde_json::from_reader(reader).map_err(|e| {
        if !e.is_io() {
            return IndexError::invalid_dataset(format!("malformed document: {}", e));
        }
        let io: std::io::Error = e.into();
        match io.kind() {
            // Raised by the gzip decoder for bad headers, corrupt or truncated streams.
            ErrorKind::InvalidInput | ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
                IndexError::invalid_dataset(format!("corrupt compressed stream: {}", io))
            }
            _ => IndexError::Io(io),
        }
    })?;

    if document.version != DATASET_VERSION {
        return Err(IndexError::invalid_dataset(format!(
            "unsupported version {} (expected {})",
            document.version, DATASET_VERSION
        )));
    }

    validate_records(&document.lights)?;
    Ok(document.lights)
}

/// Reject records with unusable coordinates or duplicate ids.
pub(crate) fn validate_records(records: &[LightRecord]) -> IndexResult<()> {
    let mut seen = HashSet::with_capacity(records.len());

    for record in records {
        if !record.lat.is_finite() || !(-90.0..=90.0).contains(&record.lat) {
            return Err(IndexError::invalid_dataset(format!(
                "light {} has invalid latitude {}",
                record.id, record.lat
            )));
        }
        if !record.lon.is_finite() || !(-180.0..=180.0).contains(&record.lon) {
            return Err(IndexError::invalid_dataset(format!(
                "light {} has invalid longitude {}",
                record.id, record.lon
            )));
        }
        if !seen.insert(record.id) {
            return Err(IndexError::invalid_dataset(format!(
                "duplicate light id {}",
                record.id
            )));
        }
    }

    Ok(())
}
