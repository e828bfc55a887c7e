//! Core feature-extraction building blocks: buffer policy, geofences,
//! taxonomies, patch reducers, the point processor and the result
//! aggregator. These are consumed by the high-level `api` module.
pub mod buffer;
pub mod geofence;
pub mod grid;
pub mod metrics;
pub mod params;
pub mod processor;
pub mod record;
pub mod taxonomy;
