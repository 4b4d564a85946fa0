use chrono::Utc;
use citypop::models::PopulationRecord;
use citypop::storage;
use std::fs;
use std::path::PathBuf;

fn sample(n: usize) -> Vec<PopulationRecord> {
    (0..n)
        .map(|i| PopulationRecord {
            id: i as u64 + 1,
            city_id: 1,
            year: 2000 + i as i32,
            population_count: 100 + i as u64,
            source: "census".into(),
            created_by: "root".into(),
            created_at: Utc::now(),
        })
        .collect()
}

#[test]
fn save_csv_and_json() {
    let rows = sample(3);
    let dir = tempfile::tempdir().unwrap();

    let csv_path: PathBuf = dir.path().join("city.csv");
    storage::save_city_csv(&rows, &csv_path).unwrap();
    let csv_txt = fs::read_to_string(&csv_path).unwrap();
    assert!(csv_txt.starts_with("Year,Population,Source"));
    assert_eq!(csv_txt.lines().count(), 1 + rows.len());

    let json_path: PathBuf = dir.path().join("city.json");
    storage::save_json(&rows, &json_path).unwrap();
    let json_txt = fs::read_to_string(&json_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json_txt).unwrap();
    assert_eq!(v.as_array().unwrap().len(), rows.len());
    assert_eq!(v[0]["population_count"], 100);
}

// Sources are free text typed by admins; a spreadsheet would evaluate a
// leading =, +, - or @ as a formula, so exported cells get a ' prefix.
#[test]
fn csv_cells_are_prefixed_to_avoid_formulas() {
    let mut rows = sample(4);
    rows[0].source = "=HYPERLINK(\"http://evil\")".into();
    rows[1].source = "+SUM(A1:A9)".into();
    rows[2].source = "@foo".into();
    rows[3].source = "-1+1".into();

    let mut buf = Vec::new();
    storage::export_city_csv(&rows, &mut buf).unwrap();

    let mut rdr = csv::Reader::from_reader(buf.as_slice());
    let sources: Vec<String> = rdr
        .records()
        .map(|r| r.unwrap().get(2).unwrap().to_string())
        .collect();
    assert_eq!(
        sources,
        vec![
            "'=HYPERLINK(\"http://evil\")",
            "'+SUM(A1:A9)",
            "'@foo",
            "'-1+1"
        ]
    );
}
