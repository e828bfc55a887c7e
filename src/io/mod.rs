//! I/O layer: the imagery service seam, an in-memory implementation backed
//! by local GeoTIFFs, and `writers` for persisted results.
pub mod service;
pub use service::{Image, ImageQuery, ImageryService, Reprojection, SampleError, SampleRegion};

pub mod memory;
pub use memory::{GeoRaster, MemoryCatalog};

pub mod catalog;
pub use catalog::{CatalogError, load_catalog};

pub mod writers;
