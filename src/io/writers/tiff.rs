use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

use crate::core::record::RawPatch;
use crate::error::Result;

/// Descriptor embedded in the `ImageDescription` tag of patch files.
#[derive(Debug, Serialize)]
pub struct PatchDescription<'a> {
    pub lat: f64,
    pub lon: f64,
    pub year: i32,
    pub dataset: &'a str,
    pub band: &'a str,
}

/// `{lat}_{lon}_data.tiff`
pub fn patch_file_name(patch: &RawPatch) -> String {
    format!("{}_{}_data.tiff", patch.lat, patch.lon)
}

/// Write a raw patch as a 64-bit float grayscale TIFF.
pub fn write_patch_tiff(patch: &RawPatch, path: &Path) -> Result<()> {
    let (rows, cols) = patch.data.dim();
    let description = serde_json::to_string(&PatchDescription {
        lat: patch.lat,
        lon: patch.lon,
        year: patch.year,
        dataset: &patch.dataset,
        band: &patch.band,
    })?;
    let data: Vec<f64> = patch.data.iter().copied().collect();

    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    let mut image = encoder.new_image::<colortype::Gray64Float>(cols as u32, rows as u32)?;
    image
        .encoder()
        .write_tag(Tag::ImageDescription, description.as_str())?;
    image.write_data(&data)?;
    Ok(())
}
