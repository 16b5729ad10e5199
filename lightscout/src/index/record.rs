//! Records stored in and returned by the spatial index.

use serde::{Deserialize, Serialize};

/// A known traffic light location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightRecord {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

impl LightRecord {
    pub fn new(id: i64, lat: f64, lon: f64) -> Self {
        Self { id, lat, lon }
    }
}

/// A light returned by a proximity query, with its distance from the query point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearbyLight {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    /// Great-circle distance from the query point in meters.
    pub distance_m: f64,
}

impl NearbyLight {
    pub(crate) fn from_record(record: &LightRecord, distance_m: f64) -> Self {
        Self {
            id: record.id,
            lat: record.lat,
            lon: record.lon,
            distance_m,
        }
    }
}

/// Extent of the loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatasetBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl DatasetBounds {
    /// Compute bounds over a set of records. `None` when empty.
    pub fn of<'a>(records: impl IntoIterator<Item = &'a LightRecord>) -> Option<Self> {
        records.into_iter().fold(None, |acc, r| {
            Some(match acc {
                None => Self {
                    min_lat: r.lat,
                    max_lat: r.lat,
                    min_lon: r.lon,
                    max_lon: r.lon,
                },
                Some(b) => Self {
                    min_lat: b.min_lat.min(r.lat),
                    max_lat: b.max_lat.max(r.lat),
                    min_lon: b.min_lon.min(r.lon),
                    max_lon: b.max_lon.max(r.lon),
                },
            })
        })
    }
}

/// Summary statistics about a loaded index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexStats {
    /// Number of lights in the dataset.
    pub count: usize,
    /// Extent of the dataset, `None` when empty.
    pub bounds: Option<DatasetBounds>,
    /// Size of the backing file in bytes (0 when built in memory).
    pub file_size_bytes: u64,
}

impl IndexStats {
    /// Backing file size in mebibytes.
    pub fn file_size_mb(&self) -> f64 {
        self.file_size_bytes as f64 / (1024.0 * 1024.0)
    }
}
