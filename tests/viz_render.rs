use citypop::viz;
use citypop::{Forecaster, NextYearPolicy, Observation, Projection};
use std::fs;

fn sample() -> Vec<Observation> {
    vec![
        Observation::new(2019, 1_780_148),
        Observation::new(2020, 1_846_513),
        Observation::new(2021, 1_902_590),
    ]
}

#[test]
fn svg_chart_contains_title_and_projection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manila.svg");
    let s = sample();
    let p = Forecaster::with_current_year(NextYearPolicy::LastObservedYear, 2024)
        .predict_next_year(&s);
    viz::plot_city_trend("Manila population", &s, &p, &path, 800, 500, "en").unwrap();

    let svg = fs::read_to_string(&path).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("Manila population"));
    assert!(svg.contains("Projected 2022"));
}

#[test]
fn png_chart_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trend.png");
    let p = Projection::NO_DATA;
    viz::plot_city_trend("Trend", &sample(), &p, &path, 640, 480, "de").unwrap();
    let meta = fs::metadata(&path).expect("file created");
    assert!(meta.len() > 0, "png has content");
}

#[test]
fn single_point_chart_pads_axes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.svg");
    let s = vec![Observation::new(2022, 50_000)];
    let p = Projection {
        year: Some(2023),
        population: 50_000,
    };
    viz::plot_city_trend("One", &s, &p, &path, 400, 300, "en").unwrap();
    assert!(path.exists());
}
