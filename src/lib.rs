//! citypop
//!
//! A small Rust library for storing per-city yearly population records and
//! serving trend projections over them. Pairs with the `citypop` CLI.
//!
//! ### Features
//! - Year-over-year growth histories and OLS next-year projections
//! - Cross-city summary: totals, rankings and a narrative paragraph
//! - File-backed store behind a `SeriesRepository` interface, with role checks
//! - CSV/JSON export and SVG/PNG trend charts
//!
//! ### Example
//! ```no_run
//! use citypop::{Forecaster, NextYearPolicy, Observation};
//!
//! let series = vec![
//!     Observation::new(2020, 100_000),
//!     Observation::new(2021, 110_000),
//!     Observation::new(2022, 121_000),
//! ];
//! let projection = Forecaster::new(NextYearPolicy::LastObservedYear).predict_next_year(&series);
//! assert_eq!(projection.year, Some(2023));
//! citypop::viz::plot_city_trend("Alpha", &series, &projection, "alpha.svg", 1000, 600, "en")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod auth;
pub mod config;
pub mod forecast;
pub mod models;
pub mod service;
pub mod storage;
pub mod store;
pub mod summary;
pub mod viz;

pub use forecast::{Forecaster, LinearTrend, NextYearPolicy};
pub use models::{City, CityReport, GrowthRecord, Observation, PopulationRecord, Projection};
pub use store::{SeriesRepository, Store};
