use crate::models::PopulationRecord;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Prefix cells that a spreadsheet would evaluate as a formula.
fn guard_cell(s: &str) -> std::borrow::Cow<'_, str> {
    if s.starts_with(['=', '+', '-', '@']) {
        format!("'{s}").into()
    } else {
        s.into()
    }
}

/// Write one city's records as CSV (`Year,Population,Source`).
pub fn export_city_csv<W: Write>(records: &[PopulationRecord], writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.serialize(("Year", "Population", "Source"))?;
    for r in records {
        wtr.serialize((r.year, r.population_count, guard_cell(&r.source)))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save one city's records as a CSV file.
pub fn save_city_csv<P: AsRef<Path>>(records: &[PopulationRecord], path: P) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    export_city_csv(records, f)
}

/// Download name for a city's export, e.g. `Quezon City_population.csv`.
pub fn csv_filename(city_name: &str) -> String {
    let safe: String = city_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{}_population.csv", safe.trim())
}

/// Save any serializable value as pretty JSON.
pub fn save_json<T: Serialize + ?Sized, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let s = serde_json::to_string_pretty(value)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn rec(year: i32, count: u64, source: &str) -> PopulationRecord {
        PopulationRecord {
            id: 1,
            city_id: 1,
            year,
            population_count: count,
            source: source.into(),
            created_by: "root".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut buf = Vec::new();
        export_city_csv(&[rec(2020, 10, "PSA"), rec(2021, 12, "")], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Year,Population,Source\n2020,10,PSA\n2021,12,\n");
    }

    #[test]
    fn write_csv_and_json_files() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        let rows = vec![rec(2000, 5, "census")];
        save_city_csv(&rows, &csvp).unwrap();
        save_json(&rows, &jsonp).unwrap();
        assert!(csvp.exists());
        assert!(jsonp.exists());
    }

    #[test]
    fn filename_replaces_separators() {
        assert_eq!(csv_filename("Quezon City"), "Quezon City_population.csv");
        assert_eq!(csv_filename("a/b"), "a_b_population.csv");
    }
}
