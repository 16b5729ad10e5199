//! Immutable traffic light index with radius and heading queries.
//!
//! Records are held sorted by latitude. A query narrows the candidate set to
//! the latitude band of the search box with two binary searches, checks
//! longitude, then applies the exact haversine and heading filters.
//!
//! The index is never mutated after construction, so it is shared between
//! threads as `Arc<SpatialIndex>` and queried without locking.
//!
//! # Example
//!
//! ```ignore
//! use lightscout::index::SpatialIndex;
//!
//! let index = SpatialIndex::open("lights.json")?;
//! let ahead = index.query(45.0, -75.0, 500.0, Some(90.0), 90.0)?;
//! for light in ahead {
//!     println!("{} at {:.0} m", light.id, light.distance_m);
//! }
//! ```

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::geo::{angular_difference, bearing_deg, distance_m, BoundingBox};

use super::dataset;
use super::error::{IndexError, IndexResult};
use super::record::{DatasetBounds, IndexStats, LightRecord, NearbyLight};

/// Default heading cone half-width in degrees.
pub const DEFAULT_HEADING_CONE_DEG: f64 = 90.0;

/// Candidates closer than this have no meaningful bearing and pass the cone filter.
const COINCIDENT_DISTANCE_M: f64 = 0.01;

/// Parameters for [`SpatialIndex::query_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryOptions {
    pub radius_m: f64,
    pub heading_deg: Option<f64>,
    pub cone_deg: f64,
}

impl QueryOptions {
    /// Radius-only query with the default cone.
    pub fn radius(radius_m: f64) -> Self {
        Self {
            radius_m,
            heading_deg: None,
            cone_deg: DEFAULT_HEADING_CONE_DEG,
        }
    }

    /// Restrict results to lights ahead of `heading_deg`.
    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }

    /// Set the cone half-width in degrees.
    pub fn with_cone(mut self, cone_deg: f64) -> Self {
        self.cone_deg = cone_deg;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    record: LightRecord,
    /// Position in the source dataset, used to keep tie order stable.
    ordinal: usize,
}

/// Read-only spatial index over a traffic light dataset.
#[derive(Debug)]
pub struct SpatialIndex {
    /// Sorted by latitude, then ordinal.
    entries: Vec<Entry>,
    by_id: HashMap<i64, usize>,
    bounds: Option<DatasetBounds>,
    file_size_bytes: u64,
    source: Option<PathBuf>,
}

impl SpatialIndex {
    /// Load the index from a dataset file.
    ///
    /// Supports both `.json` and gzip compressed `.json.gz` files.
    pub fn open<P: AsRef<Path>>(path: P) -> IndexResult<Self> {
        let path = path.as_ref();
        let loaded = dataset::load_file(path)?;

        let mut index = Self::build(loaded.records);
        index.file_size_bytes = loaded.file_size_bytes;
        index.source = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            count = index.len(),
            size_bytes = index.file_size_bytes,
            "Loaded traffic light index"
        );

        Ok(index)
    }

    /// Build an index from a dataset document read from `reader`.
    pub fn from_reader<R: Read>(reader: R) -> IndexResult<Self> {
        let records = dataset::read_records(reader)?;
        let index = Self::build(records);
        tracing::info!(count = index.len(), "Built traffic light index");
        Ok(index)
    }

    /// Build an index from in-memory records.
    pub fn from_records(records: Vec<LightRecord>) -> IndexResult<Self> {
        dataset::validate_records(&records)?;
        Ok(Self::build(records))
    }

    fn build(records: Vec<LightRecord>) -> Self {
        let bounds = DatasetBounds::of(&records);

        let mut entries: Vec<Entry> = records
            .into_iter()
            .enumerate()
            .map(|(ordinal, record)| Entry { record, ordinal })
            .collect();
        entries.sort_by(|a, b| {
            a.record
                .lat
                .total_cmp(&b.record.lat)
                .then(a.ordinal.cmp(&b.ordinal))
        });

        let by_id = entries
            .iter()
            .enumerate()
            .map(|(slot, e)| (e.record.id, slot))
            .collect();

        Self {
            entries,
            by_id,
            bounds,
            file_size_bytes: 0,
            source: None,
        }
    }

    /// Find lights within `radius_m` of `(lat, lon)`, nearest first.
    ///
    /// When `heading_deg` is given, only lights whose bearing from the query
    /// point lies within `cone_deg` of the heading are returned. Ties in
    /// distance keep dataset order.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidArgument`] when a coordinate is out of range, the
    /// radius is not positive, or the heading or cone is not usable.
    pub fn query(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
        heading_deg: Option<f64>,
        cone_deg: f64,
    ) -> IndexResult<Vec<NearbyLight>> {
        validate_query(lat, lon, radius_m, heading_deg, cone_deg)?;

        let bbox = BoundingBox::around(lat, lon, radius_m);

        let mut hits: Vec<(usize, NearbyLight)> = self
            .candidates(&bbox)
            .filter_map(|entry| {
                let r = &entry.record;
                let d = distance_m(lat, lon, r.lat, r.lon);
                if d > radius_m {
                    return None;
                }
                if let Some(heading) = heading_deg {
                    if d >= COINCIDENT_DISTANCE_M {
                        let bearing = bearing_deg(lat, lon, r.lat, r.lon);
                        if angular_difference(bearing, heading) > cone_deg {
                            return None;
                        }
                    }
                }
                Some((entry.ordinal, NearbyLight::from_record(r, d)))
            })
            .collect();

        hits.sort_by(|(oa, a), (ob, b)| a.distance_m.total_cmp(&b.distance_m).then(oa.cmp(ob)));

        tracing::trace!(
            lat,
            lon,
            radius_m,
            heading = ?heading_deg,
            results = hits.len(),
            "Proximity query"
        );

        Ok(hits.into_iter().map(|(_, light)| light).collect())
    }

    /// Query using a [`QueryOptions`] bundle.
    pub fn query_with(
        &self,
        lat: f64,
        lon: f64,
        options: &QueryOptions,
    ) -> IndexResult<Vec<NearbyLight>> {
        self.query(lat, lon, options.radius_m, options.heading_deg, options.cone_deg)
    }

    /// All lights within `radius_m`, regardless of heading.
    pub fn nearby(&self, lat: f64, lon: f64, radius_m: f64) -> IndexResult<Vec<NearbyLight>> {
        self.query(lat, lon, radius_m, None, DEFAULT_HEADING_CONE_DEG)
    }

    /// The single nearest light within `max_distance_m`, if any.
    pub fn closest(
        &self,
        lat: f64,
        lon: f64,
        max_distance_m: f64,
    ) -> IndexResult<Option<NearbyLight>> {
        Ok(self.nearby(lat, lon, max_distance_m)?.into_iter().next())
    }

    /// All lights whose coordinates lie inside the given rectangle, in dataset order.
    ///
    /// Bounds are inclusive. `min_lon > max_lon` selects a box that crosses the
    /// antimeridian.
    pub fn points_in_bounding_box(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Vec<LightRecord> {
        let max_lon = if min_lon > max_lon { max_lon + 360.0 } else { max_lon };
        let bbox = BoundingBox::new(min_lat, max_lat, min_lon, max_lon);

        let mut found: Vec<&Entry> = self.candidates(&bbox).collect();
        found.sort_by_key(|e| e.ordinal);
        found.into_iter().map(|e| e.record).collect()
    }

    /// Look up a light by id.
    pub fn by_id(&self, id: i64) -> Option<LightRecord> {
        self.by_id.get(&id).map(|&slot| self.entries[slot].record)
    }

    /// Summary statistics for the loaded dataset.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            count: self.entries.len(),
            bounds: self.bounds,
            file_size_bytes: self.file_size_bytes,
        }
    }

    /// Path the index was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose coordinates fall inside `bbox`.
    fn candidates<'a>(&'a self, bbox: &'a BoundingBox) -> impl Iterator<Item = &'a Entry> + 'a {
        let start = self.entries.partition_point(|e| e.record.lat < bbox.min_lat);
        let end = self.entries.partition_point(|e| e.record.lat <= bbox.max_lat);
        let band = if start < end { &self.entries[start..end] } else { &[][..] };
        band.iter().filter(move |e| bbox.contains_lon(e.record.lon))
    }
}

fn validate_query(
    lat: f64,
    lon: f64,
    radius_m: f64,
    heading_deg: Option<f64>,
    cone_deg: f64,
) -> IndexResult<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(IndexError::invalid_argument(format!(
            "latitude {} outside [-90, 90]",
            lat
        )));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(IndexError::invalid_argument(format!(
            "longitude {} outside [-180, 180]",
            lon
        )));
    }
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(IndexError::invalid_argument(format!(
            "radius {} must be positive",
            radius_m
        )));
    }
    if let Some(heading) = heading_deg {
        if !heading.is_finite() {
            return Err(IndexError::invalid_argument(format!(
                "heading {} is not finite",
                heading
            )));
        }
    }
    if !cone_deg.is_finite() || !(0.0..=180.0).contains(&cone_deg) {
        return Err(IndexError::invalid_argument(format!(
            "cone {} outside [0, 180]",
            cone_deg
        )));
    }
    Ok(())
}
