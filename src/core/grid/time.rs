//! Daily time axis for gridded results.
use chrono::NaiveDate;
use ndarray::{Array3, Ix2};
use tracing::debug;

use super::{GriddedResult, LAT, LON, TIME};
use crate::error::{Error, Result};
use crate::types::{Cadence, Month};

/// Years treated as leap years when building time axes.
pub const LEAP_YEARS: [i32; 7] = [2000, 2004, 2008, 2012, 2016, 2020, 2024];

pub fn is_leap_year(year: i32) -> bool {
    LEAP_YEARS.contains(&year)
}

fn days_in_month(year: i32, month: Month) -> usize {
    match month {
        Month::Feb if is_leap_year(year) => 29,
        Month::Feb => 28,
        Month::Apr | Month::June | Month::Sept | Month::Nov => 30,
        _ => 31,
    }
}

/// One timestamp per day: the whole year for yearly cadence, the whole
/// month for monthly.
pub fn daily_timestamps(cadence: Cadence, year: i32, month: Month) -> Result<Vec<NaiveDate>> {
    let (start, days) = match cadence {
        Cadence::Yearly => (
            NaiveDate::from_ymd_opt(year, 1, 1),
            if is_leap_year(year) { 366 } else { 365 },
        ),
        Cadence::Monthly => (
            NaiveDate::from_ymd_opt(year, month.number(), 1),
            days_in_month(year, month),
        ),
    };
    let start = start.ok_or_else(|| Error::InvalidArgument {
        arg: "year",
        value: year.to_string(),
    })?;
    Ok(start.iter_days().take(days).collect())
}

/// Broadcast every variable along a daily time axis. Variables become
/// (lon, lat, time).
pub fn add_time_dimension(
    result: GriddedResult,
    cadence: Cadence,
    year: i32,
    month: Month,
) -> Result<GriddedResult> {
    if result.has_time() {
        return Err(Error::TimeDimensionExists);
    }
    let time = daily_timestamps(cadence, year, month)?;
    let (n_lat, n_lon, n_time) = (result.lat.len(), result.lon.len(), time.len());

    let mut data_vars = std::collections::BTreeMap::new();
    for (name, var) in result.data_vars {
        let grid = var.into_dimensionality::<Ix2>()?;
        let cube = Array3::from_shape_fn((n_lon, n_lat, n_time), |(j, i, _)| grid[(i, j)]);
        data_vars.insert(name, cube.into_dyn());
    }
    debug!("Added time axis of {} days", n_time);

    Ok(GriddedResult {
        dims: vec![LON, LAT, TIME],
        lat: result.lat,
        lon: result.lon,
        time: Some(time),
        data_vars,
    })
}
