//! Dataset descriptors: which collection, bands, dates and resolution each
//! supported dataset name maps to.
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ConfigError;
use crate::types::{Cadence, DatasetFamily};

/// File in the configs directory that replaces the built-in table.
pub const COLLECTIONS_FILE: &str = "gee_collections.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub name: String,
    pub collection: String,
    pub default_band: String,
    pub supported_bands: Vec<String>,
    pub t_cadence: Cadence,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    /// Native pixel size in metres
    pub resolution: f64,
}

impl DatasetDescriptor {
    pub fn family(&self) -> Result<DatasetFamily, ConfigError> {
        DatasetFamily::from_dataset_name(&self.name)
            .ok_or_else(|| ConfigError::UnknownDataset(self.name.clone()))
    }

    pub fn supports_band(&self, band: &str) -> bool {
        self.supported_bands.iter().any(|b| b == band)
    }

    /// Requested band if supported, the default band when none was given.
    pub fn resolve_band(&self, band: Option<&str>) -> Result<String, ConfigError> {
        match band {
            None => {
                info!(
                    "No band specified, defaulting to: {}",
                    self.default_band
                );
                Ok(self.default_band.clone())
            }
            Some(b) if self.supports_band(b) => Ok(b.to_string()),
            Some(b) => Err(ConfigError::UnsupportedBand {
                band: b.to_string(),
                supported: self.supported_bands.clone(),
            }),
        }
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

fn descriptor(
    family: DatasetFamily,
    collection: &str,
    bands: &[&str],
    t_cadence: Cadence,
    min_date: NaiveDate,
    max_date: NaiveDate,
    resolution: f64,
) -> DatasetDescriptor {
    DatasetDescriptor {
        name: family.dataset_name().to_string(),
        collection: collection.to_string(),
        default_band: bands[0].to_string(),
        supported_bands: bands.iter().map(|b| b.to_string()).collect(),
        t_cadence,
        min_date,
        max_date,
        resolution,
    }
}

/// Built-in descriptor for a family.
pub fn builtin(family: DatasetFamily) -> DatasetDescriptor {
    match family {
        DatasetFamily::Modis => descriptor(
            family,
            "MODIS/006/MCD12Q1",
            &["LC_Type1"],
            Cadence::Yearly,
            ymd(2001, 1, 1),
            ymd(2021, 1, 1),
            500.0,
        ),
        DatasetFamily::Fire => descriptor(
            family,
            "ESA/CCI/FireCCI/5_1",
            &["LandCover"],
            Cadence::Monthly,
            ymd(2001, 1, 1),
            ymd(2020, 12, 1),
            250.0,
        ),
        DatasetFamily::Population => descriptor(
            family,
            "CIESIN/GPWv411/GPW_Population_Density",
            &["population_density"],
            Cadence::Yearly,
            ymd(2000, 1, 1),
            ymd(2020, 1, 1),
            927.67,
        ),
        DatasetFamily::Nightlight => descriptor(
            family,
            "NOAA/VIIRS/DNB/MONTHLY_V1/VCMCFG",
            &["avg_rad", "cf_cvg"],
            Cadence::Monthly,
            ymd(2012, 4, 1),
            ymd(2024, 2, 1),
            463.83,
        ),
        DatasetFamily::BuiltUp => descriptor(
            family,
            "JRC/GHSL/P2023A/GHS_BUILT_C",
            &["built_characteristics"],
            Cadence::Yearly,
            ymd(2018, 1, 1),
            ymd(2018, 12, 31),
            10.0,
        ),
        DatasetFamily::HumanModification => descriptor(
            family,
            "CSP/HM/GlobalHumanModification",
            &["gHM"],
            Cadence::Yearly,
            ymd(2016, 1, 1),
            ymd(2016, 12, 31),
            1000.0,
        ),
    }
}

/// Built-in table keyed by dataset name.
pub fn builtin_descriptors() -> BTreeMap<String, DatasetDescriptor> {
    DatasetFamily::ALL
        .iter()
        .map(|&f| (f.dataset_name().to_string(), builtin(f)))
        .collect()
}

#[derive(Debug, Deserialize)]
struct CollectionsFile {
    gee_dataset: BTreeMap<String, CollectionEntry>,
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    collection: String,
    default_band: String,
    supported_bands: Vec<String>,
    t_cadence: Cadence,
    min_date: NaiveDate,
    max_date: NaiveDate,
    resolution: f64,
}

/// Descriptor table from `{configs_dir}/gee_collections.json` when present,
/// the built-in table otherwise. Entries must name a supported family.
pub fn load_descriptors(configs_dir: &Path) -> Result<BTreeMap<String, DatasetDescriptor>, ConfigError> {
    let path = configs_dir.join(COLLECTIONS_FILE);
    if !path.is_file() {
        return Ok(builtin_descriptors());
    }
    info!("Reading dataset descriptors from {}", path.display());
    let file = File::open(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let parsed: CollectionsFile =
        serde_json::from_reader(file).map_err(|source| ConfigError::Json {
            path: path.clone(),
            source,
        })?;

    parsed
        .gee_dataset
        .into_iter()
        .map(|(name, e)| {
            if DatasetFamily::from_dataset_name(&name).is_none() {
                return Err(ConfigError::UnknownDataset(name));
            }
            let d = DatasetDescriptor {
                name: name.clone(),
                collection: e.collection,
                default_band: e.default_band,
                supported_bands: e.supported_bands,
                t_cadence: e.t_cadence,
                min_date: e.min_date,
                max_date: e.max_date,
                resolution: e.resolution,
            };
            Ok((name, d))
        })
        .collect()
}

/// Descriptor for a dataset name.
pub fn lookup(
    descriptors: &BTreeMap<String, DatasetDescriptor>,
    gee_data: &str,
) -> Result<DatasetDescriptor, ConfigError> {
    let key = match gee_data {
        "pop" => DatasetFamily::Population.dataset_name(),
        other => other,
    };
    descriptors
        .get(key)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownDataset(gee_data.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn builtin_table_covers_every_family() {
        let table = builtin_descriptors();
        assert_eq!(table.len(), 6);
        let night = &table["nightlight"];
        assert_eq!(night.t_cadence, Cadence::Monthly);
        assert_eq!(night.default_band, "avg_rad");
        assert!(night.supports_band("cf_cvg"));
        assert_eq!(table["modis"].resolution, 500.0);
        assert_eq!(
            table["human_settlement_layer_built_up"].family().unwrap(),
            DatasetFamily::BuiltUp
        );
    }

    #[test]
    fn band_resolution() {
        let night = builtin(DatasetFamily::Nightlight);
        assert_eq!(night.resolve_band(None).unwrap(), "avg_rad");
        assert_eq!(night.resolve_band(Some("cf_cvg")).unwrap(), "cf_cvg");
        assert!(matches!(
            night.resolve_band(Some("rad")),
            Err(ConfigError::UnsupportedBand { .. })
        ));
    }

    #[test]
    fn lookup_accepts_pop_alias_and_rejects_unknown() {
        let table = builtin_descriptors();
        assert_eq!(lookup(&table, "pop").unwrap().name, "population");
        assert!(matches!(
            lookup(&table, "sst"),
            Err(ConfigError::UnknownDataset(_))
        ));
    }

    #[test]
    fn collections_file_overrides_builtins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(COLLECTIONS_FILE),
            r#"{"gee_dataset": {"modis": {
                "collection": "MODIS/061/MCD12Q1",
                "default_band": "LC_Type1",
                "supported_bands": ["LC_Type1", "LC_Type2"],
                "t_cadence": "yearly",
                "min_date": "2001-01-01",
                "max_date": "2022-01-01",
                "resolution": 500
            }}}"#,
        )
        .unwrap();
        let table = load_descriptors(dir.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table["modis"].collection, "MODIS/061/MCD12Q1");
        assert!(table["modis"].supports_band("LC_Type2"));

        let empty = tempfile::tempdir().unwrap();
        assert_eq!(load_descriptors(empty.path()).unwrap().len(), 6);
    }
}
