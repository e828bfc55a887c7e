use std::path::Path;

use csv::Writer;
use tracing::info;

use crate::core::grid::check_consistent;
use crate::core::record::FeatureRecord;
use crate::error::Result;

fn cell(v: f64) -> String {
    if v.is_nan() { String::new() } else { v.to_string() }
}

/// One row per point: `lat, lon` and every variable in sorted order.
/// Missing values are written as empty cells.
pub fn write_feature_table(records: &[FeatureRecord], path: &Path) -> Result<()> {
    let names = check_consistent(records)?;

    let mut wtr = Writer::from_path(path)?;
    let mut header = vec!["lat".to_string(), "lon".to_string()];
    header.extend(names.iter().cloned());
    wtr.write_record(&header)?;

    for r in records {
        let mut row = vec![r.lat.to_string(), r.lon.to_string()];
        row.extend(names.iter().map(|n| cell(r.get(n).unwrap_or(f64::NAN))));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    info!("Saved {} rows to {:?}", records.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn table_has_sorted_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut a = FeatureRecord::new(1.5, 10.0);
        a.insert("d.b.var".into(), 2.0);
        a.insert("d.b.mean".into(), f64::NAN);
        let mut b = FeatureRecord::new(-3.0, 20.0);
        b.insert("d.b.var".into(), 0.5);
        b.insert("d.b.mean".into(), 4.0);

        write_feature_table(&[a, b], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "lat,lon,d.b.mean,d.b.var");
        assert_eq!(lines[1], "1.5,10,,2");
        assert_eq!(lines[2], "-3,20,4,0.5");
    }

    #[test]
    fn inconsistent_records_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut a = FeatureRecord::new(1.0, 1.0);
        a.insert("x".into(), 1.0);
        let b = FeatureRecord::new(2.0, 2.0);
        assert!(matches!(
            write_feature_table(&[a, b], &path),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(!path.exists());
    }
}
