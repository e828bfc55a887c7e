use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::ConfigError;
use super::datasets::DatasetDescriptor;
use crate::types::Month;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Year and month a run queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDate {
    pub date: NaiveDate,
    pub query_year: i32,
    pub query_month: Month,
}

pub fn parse_date(date: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| ConfigError::InvalidDate(date.to_string()))
}

/// Parse `YYYY-MM-DD` and check it lies within the dataset's date range.
pub fn check_query_date(date: &str, dataset: &DatasetDescriptor) -> Result<QueryDate, ConfigError> {
    let parsed = parse_date(date)?;
    if parsed < dataset.min_date || parsed > dataset.max_date {
        return Err(ConfigError::DateOutOfRange {
            date: parsed,
            min: dataset.min_date,
            max: dataset.max_date,
        });
    }
    let query_month =
        Month::from_number(parsed.month()).ok_or_else(|| ConfigError::InvalidDate(date.to_string()))?;
    Ok(QueryDate {
        date: parsed,
        query_year: parsed.year(),
        query_month,
    })
}
