use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{AnalysisType, Cadence, DatasetFamily, Month};

/// One unit of work: a lat/lon point plus everything needed to sample and
/// reduce it. Built by the work-distribution layer and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRequest {
    pub lat: f64,
    pub lon: f64,
    pub family: DatasetFamily,
    /// Dataset name, first component of every variable name
    pub dataset: String,
    /// Image collection id at the imagery service
    pub collection: String,
    pub band: String,
    pub cadence: Cadence,
    pub year: i32,
    pub month: Month,
    /// Buffer radius in metres
    pub buffer_size: f64,
    /// Native pixel size in metres
    pub resolution: f64,
    pub analysis: AnalysisType,
}

impl PointRequest {
    /// Temporal window of this request's image.
    pub fn window(&self) -> Result<TemporalWindow> {
        TemporalWindow::new(self.cadence, self.year, self.month)
    }

    /// `{dataset}.{band}.{suffix}`
    pub fn variable_name(&self, suffix: &str) -> String {
        format!("{}.{}.{}", self.dataset, self.band, suffix)
    }
}

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TemporalWindow {
    /// Whole calendar year for yearly cadence, whole month for monthly.
    pub fn new(cadence: Cadence, year: i32, month: Month) -> Result<Self> {
        let invalid = || Error::InvalidArgument {
            arg: "year",
            value: year.to_string(),
        };
        match cadence {
            Cadence::Yearly => Ok(Self {
                start: NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?,
                end: NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or_else(invalid)?,
            }),
            Cadence::Monthly => {
                let start = NaiveDate::from_ymd_opt(year, month.number(), 1).ok_or_else(invalid)?;
                let end = match month {
                    Month::Dec => NaiveDate::from_ymd_opt(year + 1, 1, 1),
                    _ => NaiveDate::from_ymd_opt(year, month.number() + 1, 1),
                }
                .ok_or_else(invalid)?;
                Ok(Self { start, end })
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}
