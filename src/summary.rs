//! Cross-city projection summary: aggregate numbers, rankings and a narrative.

use crate::forecast::{Forecaster, growth_rates, mean_growth};
use crate::models::Observation;
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};

/// Input for one city: display name, region and its yearly series.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySeries {
    pub name: String,
    pub region: String,
    pub series: Vec<Observation>,
}

impl EntitySeries {
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        series: Vec<Observation>,
    ) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            series,
        }
    }
}

/// Projection figures for one city with data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityProjection {
    pub name: String,
    pub region: String,
    pub projected_year: Option<i32>,
    pub current_population: u64,
    pub predicted_population: i64,
    pub predicted_change: i64,
    pub predicted_growth_rate: f64,
    pub average_historical_growth: f64,
}

/// Aggregates over every city that has at least one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCitySummary {
    pub year: i32,
    /// All entities passed in, including those without data.
    pub total_entities: usize,
    pub total_predicted_population: i64,
    pub average_growth_rate: f64,
    /// Descending by predicted population (stable).
    pub ranked: Vec<CityProjection>,
    pub fastest_growing: Option<CityProjection>,
    pub slowest_growing: Option<CityProjection>,
}

impl CrossCitySummary {
    pub fn largest(&self) -> Option<&CityProjection> {
        self.ranked.first()
    }

    pub fn top_three(&self) -> &[CityProjection] {
        &self.ranked[..self.ranked.len().min(3)]
    }

    /// Compose the English paragraph describing this summary.
    ///
    /// Only a summary over no entities at all gets the "no data" sentence;
    /// entities without observations still yield the (0-city) paragraph.
    pub fn narrative(&self) -> String {
        if self.total_entities == 0 {
            return "No city data available for analysis.".to_string();
        }
        let n = |v: i64| v.to_formatted_string(&Locale::en);
        let mut parts: Vec<String> = Vec::new();

        parts.push(format!(
            "Based on linear regression trends fitted to historical population data, the total \
             projected population across all {} cities for {} is estimated at {} people, \
             representing an overall average growth rate of {:.2}%.",
            self.ranked.len(),
            self.year,
            n(self.total_predicted_population),
            self.average_growth_rate
        ));

        if let Some(largest) = self.largest() {
            let place = if largest.region.is_empty() {
                largest.name.clone()
            } else {
                format!("{} in {}", largest.name, largest.region)
            };
            parts.push(format!(
                "{} is predicted to remain the most populous city with {} residents, growing by \
                 {} people ({:.2}%) from its current population of {}.",
                place,
                n(largest.predicted_population),
                n(largest.predicted_change),
                largest.predicted_growth_rate,
                largest.current_population.to_formatted_string(&Locale::en)
            ));
        }

        if let (Some(fast), Some(slow)) = (&self.fastest_growing, &self.slowest_growing) {
            parts.push(format!(
                "Population dynamics vary across regions, with {} experiencing the most rapid \
                 growth at {:.2}%, while {} shows the slowest expansion at {:.2}%.",
                fast.name, fast.predicted_growth_rate, slow.name, slow.predicted_growth_rate
            ));
        }

        if let [a, b, c] = self.top_three() {
            parts.push(format!(
                "The three most populous cities projected for {} are {} ({}), {} ({}), \
                 and {} ({}).",
                self.year,
                a.name,
                n(a.predicted_population),
                b.name,
                n(b.predicted_population),
                c.name,
                n(c.predicted_population)
            ));
        }

        parts.push(
            "These projections extrapolate year-over-year population trends and are intended \
             to support planning for the upcoming year."
                .to_string(),
        );
        parts.join(" ")
    }
}

/// Project every entity and aggregate.
///
/// Entities with an empty series are counted in `total_entities` but take no
/// part in projections or rankings. Fastest/slowest ties resolve to the first
/// entity in input order.
pub fn build_summary(entities: &[EntitySeries], forecaster: &Forecaster) -> CrossCitySummary {
    let mut projections: Vec<CityProjection> = Vec::new();

    for e in entities {
        let mut series = e.series.clone();
        series.sort_by_key(|o| o.year);
        let Some(latest) = series.last() else {
            continue;
        };

        let projection = forecaster.predict_next_year(&series);
        let current = i64::try_from(latest.population).unwrap_or(i64::MAX);
        let change = projection.population.saturating_sub(current);
        let rate = if latest.population > 0 {
            change as f64 / latest.population as f64 * 100.0
        } else {
            0.0
        };
        let avg_hist = mean_growth(&growth_rates(&series));

        projections.push(CityProjection {
            name: e.name.clone(),
            region: e.region.clone(),
            projected_year: projection.year,
            current_population: latest.population,
            predicted_population: projection.population,
            predicted_change: change,
            predicted_growth_rate: rate,
            average_historical_growth: avg_hist,
        });
    }

    let total_predicted_population = projections
        .iter()
        .fold(0i64, |acc, p| acc.saturating_add(p.predicted_population));
    let average_growth_rate = if projections.is_empty() {
        0.0
    } else {
        projections.iter().map(|p| p.predicted_growth_rate).sum::<f64>() / projections.len() as f64
    };

    // Strict comparisons keep the first occurrence on ties.
    let mut fastest: Option<&CityProjection> = None;
    let mut slowest: Option<&CityProjection> = None;
    for p in &projections {
        if fastest.is_none_or(|f| p.predicted_growth_rate > f.predicted_growth_rate) {
            fastest = Some(p);
        }
        if slowest.is_none_or(|s| p.predicted_growth_rate < s.predicted_growth_rate) {
            slowest = Some(p);
        }
    }
    let fastest_growing = fastest.cloned();
    let slowest_growing = slowest.cloned();

    let year = projections
        .iter()
        .filter_map(|p| p.projected_year)
        .max()
        .unwrap_or_else(|| forecaster.fallback_year());

    let mut ranked = projections;
    ranked.sort_by(|a, b| b.predicted_population.cmp(&a.predicted_population));

    CrossCitySummary {
        year,
        total_entities: entities.len(),
        total_predicted_population,
        average_growth_rate,
        ranked,
        fastest_growing,
        slowest_growing,
    }
}
