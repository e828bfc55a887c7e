//! Persistence of batch results: gridded JSON documents (and GeoTIFFs with
//! the `gdal` feature), point tables as CSV, raw patches as TIFF.
pub mod csv;
#[cfg(feature = "gdal")]
pub mod gdal;
pub mod json;
pub mod tiff;

pub use self::csv::write_feature_table;
#[cfg(feature = "gdal")]
pub use self::gdal::write_gridded_gdal;
pub use self::json::write_gridded_json;
pub use self::tiff::{patch_file_name, write_patch_tiff};
