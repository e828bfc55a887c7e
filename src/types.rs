//! Shared types and enums used across airgrid.
//! Includes `DatasetFamily`, `Cadence`, `Month`, `AnalysisType` and `Resampling`.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Dataset families with a dedicated reduction flow.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFamily {
    Modis,
    Fire,
    Population,
    Nightlight,
    BuiltUp,
    HumanModification,
}

impl DatasetFamily {
    pub const ALL: [DatasetFamily; 6] = [
        DatasetFamily::Modis,
        DatasetFamily::Fire,
        DatasetFamily::Population,
        DatasetFamily::Nightlight,
        DatasetFamily::BuiltUp,
        DatasetFamily::HumanModification,
    ];

    /// Dataset name used on the command line, in config files and as the
    /// first component of every variable name.
    pub fn dataset_name(&self) -> &'static str {
        match self {
            DatasetFamily::Modis => "modis",
            DatasetFamily::Fire => "fire",
            DatasetFamily::Population => "population",
            DatasetFamily::Nightlight => "nightlight",
            DatasetFamily::BuiltUp => "human_settlement_layer_built_up",
            DatasetFamily::HumanModification => "global_human_modification",
        }
    }

    /// Look up a family by dataset name. `pop` is accepted as an alias.
    pub fn from_dataset_name(name: &str) -> Option<Self> {
        match name {
            "pop" => Some(DatasetFamily::Population),
            other => Self::ALL
                .iter()
                .copied()
                .find(|f| f.dataset_name() == other),
        }
    }
}

impl std::fmt::Display for DatasetFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dataset_name())
    }
}

/// Temporal granularity of a dataset.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Yearly,
    Monthly,
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cadence::Yearly => write!(f, "yearly"),
            Cadence::Monthly => write!(f, "monthly"),
        }
    }
}

/// Calendar month, named the way query configs spell it.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Month {
    #[serde(rename = "jan")]
    Jan,
    #[serde(rename = "feb")]
    Feb,
    #[serde(rename = "mar")]
    Mar,
    #[serde(rename = "apr")]
    Apr,
    #[serde(rename = "may")]
    May,
    #[serde(rename = "june")]
    June,
    #[serde(rename = "july")]
    July,
    #[serde(rename = "aug")]
    Aug,
    #[serde(rename = "sept")]
    Sept,
    #[serde(rename = "oct")]
    Oct,
    #[serde(rename = "nov")]
    Nov,
    #[serde(rename = "dec")]
    Dec,
}

impl Month {
    const ORDERED: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::June,
        Month::July,
        Month::Aug,
        Month::Sept,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    /// Month from its 1-based number.
    pub fn from_number(number: u32) -> Option<Self> {
        number
            .checked_sub(1)
            .and_then(|idx| Self::ORDERED.get(idx as usize))
            .copied()
    }

    /// 1-based month number.
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    pub fn name(&self) -> &'static str {
        match self {
            Month::Jan => "jan",
            Month::Feb => "feb",
            Month::Mar => "mar",
            Month::Apr => "apr",
            Month::May => "may",
            Month::June => "june",
            Month::July => "july",
            Month::Aug => "aug",
            Month::Sept => "sept",
            Month::Oct => "oct",
            Month::Nov => "nov",
            Month::Dec => "dec",
        }
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What the pipeline produces per point and how the batch is persisted.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// Reduce every point and merge into one gridded dataset.
    #[value(name = "collection")]
    Collection,
    /// Keep the raw sampled patch per point.
    #[value(name = "images")]
    Images,
    /// Reduce every point of a custom station list into one table.
    #[value(name = "collection_toar")]
    CollectionToar,
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisType::Collection => write!(f, "collection"),
            AnalysisType::Images => write!(f, "images"),
            AnalysisType::CollectionToar => write!(f, "collection_toar"),
        }
    }
}

/// Pixel interpolation used when an image is resampled to a coarser scale.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    Nearest,
    Bilinear,
}

impl std::fmt::Display for Resampling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resampling::Nearest => write!(f, "nearest"),
            Resampling::Bilinear => write!(f, "bilinear"),
        }
    }
}
