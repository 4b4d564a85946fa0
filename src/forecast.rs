//! Trend forecasting over one city's yearly population series.
//!
//! - Year-over-year growth history (percent, 2 decimals)
//! - Ordinary-least-squares linear trend of population on year
//! - Next-year projection under an explicit [`NextYearPolicy`]
//!
//! Everything here is a pure function of its input slice: fits are built per
//! call and never cached, so forecasts for different cities can run in
//! parallel without coordination.

use crate::models::{GrowthRecord, Observation, PopulationRecord, Projection};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which year a projection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NextYearPolicy {
    /// Last observed year + 1 (deterministic for a given series).
    #[default]
    #[serde(rename = "last-observed")]
    LastObservedYear,
    /// Current calendar year + 1, regardless of how old the data is.
    #[serde(rename = "current-calendar")]
    CurrentCalendarYear,
}

impl fmt::Display for NextYearPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextYearPolicy::LastObservedYear => f.write_str("last-observed"),
            NextYearPolicy::CurrentCalendarYear => f.write_str("current-calendar"),
        }
    }
}

impl FromStr for NextYearPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-observed" | "last_observed" | "last" => Ok(Self::LastObservedYear),
            "current-calendar" | "current_calendar" | "current" => Ok(Self::CurrentCalendarYear),
            other => Err(format!(
                "unknown next-year policy '{other}', expected last-observed or current-calendar"
            )),
        }
    }
}

/// Fitted line `population = intercept + slope * year`.
///
/// Stored in mean-centred form so evaluation near calendar years does not
/// lose precision to cancellation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    slope: f64,
    mean_year: f64,
    mean_population: f64,
    r_squared: f64,
    n_observations: usize,
}

impl LinearTrend {
    /// OLS fit over all points. Returns `None` for fewer than two points.
    ///
    /// When every year is identical the slope is 0 and the line sits at the
    /// mean population.
    pub fn fit(points: &[Observation]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let mean_year = points.iter().map(|p| p.year as f64).sum::<f64>() / n;
        let mean_population = points.iter().map(|p| p.population as f64).sum::<f64>() / n;

        let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
        for p in points {
            let dx = p.year as f64 - mean_year;
            let dy = p.population as f64 - mean_population;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }

        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        let r_squared = if syy <= 0.0 {
            1.0
        } else if sxx <= 0.0 {
            0.0
        } else {
            (sxy * sxy) / (sxx * syy)
        };

        Some(Self {
            slope,
            mean_year,
            mean_population,
            r_squared,
            n_observations: points.len(),
        })
    }

    /// Change in population per year.
    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Population at year 0 (the usual `a` in `a + b·x`).
    pub fn intercept(&self) -> f64 {
        self.mean_population - self.slope * self.mean_year
    }

    /// Coefficient of determination of the fit.
    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    /// Evaluate the fitted line at `year`.
    pub fn predict(&self, year: i32) -> f64 {
        self.mean_population + self.slope * (year as f64 - self.mean_year)
    }
}

/// Projects the next year's population for a series under a fixed policy.
///
/// The "current year" is captured once at construction; the forecaster holds
/// no other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forecaster {
    policy: NextYearPolicy,
    current_year: i32,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(NextYearPolicy::default())
    }
}

impl Forecaster {
    /// Forecaster using today's calendar year (local time).
    pub fn new(policy: NextYearPolicy) -> Self {
        Self::with_current_year(policy, chrono::Local::now().year())
    }

    /// Forecaster pinned to a given "current" year.
    pub fn with_current_year(policy: NextYearPolicy, current_year: i32) -> Self {
        Self {
            policy,
            current_year,
        }
    }

    pub fn policy(&self) -> NextYearPolicy {
        self.policy
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Target year used when there is no series to anchor on.
    pub fn fallback_year(&self) -> i32 {
        self.current_year.saturating_add(1)
    }

    fn target_year(&self, sorted: &[Observation]) -> i32 {
        match (self.policy, sorted.last()) {
            (NextYearPolicy::LastObservedYear, Some(last)) => last.year.saturating_add(1),
            _ => self.fallback_year(),
        }
    }

    /// Project the population for the next year.
    ///
    /// - 0 observations: [`Projection::NO_DATA`]
    /// - 1 observation: its population, at the policy's target year
    /// - 2+ observations: OLS line evaluated at the target year, truncated toward zero
    ///
    /// The input is sorted by year on a local copy first. Negative projections
    /// are returned as-is.
    pub fn predict_next_year(&self, series: &[Observation]) -> Projection {
        let mut sorted = series.to_vec();
        sorted.sort_by_key(|o| o.year);

        match sorted.as_slice() {
            [] => Projection::NO_DATA,
            [only] => Projection {
                year: Some(self.target_year(&sorted)),
                population: i64::try_from(only.population).unwrap_or(i64::MAX),
            },
            _ => {
                let year = self.target_year(&sorted);
                let population = LinearTrend::fit(&sorted)
                    .map(|trend| truncate_population(trend.predict(year)))
                    .unwrap_or(0);
                Projection {
                    year: Some(year),
                    population,
                }
            }
        }
    }
}

/// Truncate toward zero, first absorbing float noise around whole numbers
/// (an exactly linear series must continue exactly).
fn truncate_population(raw: f64) -> i64 {
    let nearest = raw.round();
    if (raw - nearest).abs() < 1e-6 {
        nearest as i64
    } else {
        raw.trunc() as i64
    }
}

/// Round to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Percent change from `prev` to `cur`; `None` when `prev` is zero.
pub fn percent_change(prev: u64, cur: u64) -> Option<f64> {
    if prev == 0 {
        return None;
    }
    Some(round2((cur as f64 - prev as f64) / prev as f64 * 100.0))
}

/// Year-over-year growth for a bare series, one entry per observation.
pub fn growth_rates(series: &[Observation]) -> Vec<Option<f64>> {
    let mut prev: Option<u64> = None;
    series
        .iter()
        .map(|o| {
            let growth = prev.and_then(|p| percent_change(p, o.population));
            prev = Some(o.population);
            growth
        })
        .collect()
}

/// Growth history for stored records (ascending by year), order preserved.
pub fn growth_history(records: &[PopulationRecord]) -> Vec<GrowthRecord> {
    let observations: Vec<Observation> = records.iter().map(Observation::from).collect();
    records
        .iter()
        .zip(growth_rates(&observations))
        .map(|(r, growth)| GrowthRecord {
            record_id: Some(r.id),
            year: r.year,
            population: r.population_count,
            source: r.source.clone(),
            growth,
        })
        .collect()
}

/// Mean of the defined growth values, or 0 when none are defined.
pub fn mean_growth(growth: &[Option<f64>]) -> f64 {
    let defined: Vec<f64> = growth.iter().flatten().copied().collect();
    if defined.is_empty() {
        0.0
    } else {
        defined.iter().sum::<f64>() / defined.len() as f64
    }
}
