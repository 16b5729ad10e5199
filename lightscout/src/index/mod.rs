//! Spatial index over known traffic light locations.
//!
//! The index is loaded once from a JSON dataset and is read-only afterwards.
//! See [`SpatialIndex`] for the query contract.

mod dataset;
mod error;
mod record;
mod spatial;

pub use dataset::{DatasetDocument, DATASET_VERSION};
pub use error::{IndexError, IndexResult};
pub use record::{DatasetBounds, IndexStats, LightRecord, NearbyLight};
pub use spatial::{QueryOptions, SpatialIndex, DEFAULT_HEADING_CONE_DEG};
