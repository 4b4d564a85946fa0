//! Boundary composition: fetch series through a [`SeriesRepository`], run the
//! forecaster, and shape the per-city, stats and summary payloads.

use crate::auth::AuthError;
use crate::forecast::{Forecaster, growth_history, round2};
use crate::models::{City, CityReport, Observation, PopulationStats, User};
use crate::store::{SeriesRepository, Store, StoreError};
use crate::summary::{CityProjection, EntitySeries, build_summary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Narrative summary plus the figures it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub summary: String,
    pub year: i32,
    pub total_cities: usize,
    pub total_predicted_population: i64,
    pub average_growth_rate: f64,
    pub ranked: Vec<CityProjection>,
    pub fastest_growing: Option<String>,
    pub slowest_growing: Option<String>,
    pub methodology: String,
    pub generated_at: DateTime<Utc>,
}

fn report_for<R: SeriesRepository + ?Sized>(
    repo: &R,
    forecaster: &Forecaster,
    city: City,
) -> Result<CityReport, StoreError> {
    let records = repo.fetch_series(city.id)?;
    let series: Vec<Observation> = records.iter().map(Observation::from).collect();
    let projection = forecaster.predict_next_year(&series);
    Ok(CityReport {
        id: city.id,
        name: city.name,
        region: city.region,
        predicted_year: projection.year,
        predicted_population: projection.population,
        history: growth_history(&records),
    })
}

/// Projection and growth history for one city.
pub fn city_report<R: SeriesRepository + ?Sized>(
    repo: &R,
    forecaster: &Forecaster,
    city_id: u64,
) -> Result<CityReport, StoreError> {
    let city = repo.city(city_id).ok_or(StoreError::CityNotFound(city_id))?;
    report_for(repo, forecaster, city)
}

/// Reports for every city, ordered by id.
pub fn city_reports<R: SeriesRepository + ?Sized>(
    repo: &R,
    forecaster: &Forecaster,
) -> Result<Vec<CityReport>, StoreError> {
    repo.cities()
        .into_iter()
        .map(|c| report_for(repo, forecaster, c))
        .collect()
}

/// City count and the sum of next-year projections (cities without data add 0).
pub fn population_stats<R: SeriesRepository + ?Sized>(
    repo: &R,
    forecaster: &Forecaster,
) -> Result<PopulationStats, StoreError> {
    let cities = repo.cities();
    let mut total = 0i64;
    for c in &cities {
        let series: Vec<Observation> = repo
            .fetch_series(c.id)?
            .iter()
            .map(Observation::from)
            .collect();
        total = total.saturating_add(forecaster.predict_next_year(&series).population);
    }
    Ok(PopulationStats {
        total_cities: cities.len(),
        predicted_total_population: total,
    })
}

/// Cross-city summary with its composed paragraph.
pub fn summary_report<R: SeriesRepository + ?Sized>(
    repo: &R,
    forecaster: &Forecaster,
) -> Result<SummaryReport, StoreError> {
    let mut entities = Vec::new();
    for c in repo.cities() {
        let series = repo
            .fetch_series(c.id)?
            .iter()
            .map(Observation::from)
            .collect();
        entities.push(EntitySeries::new(c.name, c.region, series));
    }
    let summary = build_summary(&entities, forecaster);
    log::debug!(
        "summary over {} of {} cities for {}",
        summary.ranked.len(),
        summary.total_entities,
        summary.year
    );

    Ok(SummaryReport {
        summary: summary.narrative(),
        year: summary.year,
        total_cities: summary.ranked.len(),
        total_predicted_population: summary.total_predicted_population,
        average_growth_rate: round2(summary.average_growth_rate),
        fastest_growing: summary.fastest_growing.as_ref().map(|p| p.name.clone()),
        slowest_growing: summary.slowest_growing.as_ref().map(|p| p.name.clone()),
        ranked: summary.ranked,
        methodology: format!(
            "Ordinary least squares linear regression of population on year ({} policy)",
            forecaster.policy()
        ),
        generated_at: Utc::now(),
    })
}

/// Look up the acting user by name; `None` stays anonymous.
pub fn resolve_actor<'a>(
    store: &'a Store,
    username: Option<&str>,
) -> Result<Option<&'a User>, AuthError> {
    match username {
        None => Ok(None),
        Some(name) => store
            .user_by_name(name)
            .map(Some)
            .ok_or_else(|| AuthError::UnknownUser(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::NextYearPolicy;

    fn seeded() -> Store {
        let mut s = Store::new();
        let a = s.add_city("Alpha", "North").unwrap();
        let b = s.add_city("Beta", "South").unwrap();
        s.add_city("Empty", "").unwrap();
        for (y, p) in [(2020, 100_000), (2021, 110_000), (2022, 121_000)] {
            s.add_record(a.id, y, p, "census", "root").unwrap();
        }
        s.add_record(b.id, 2022, 50_000, "", "root").unwrap();
        s
    }

    fn f() -> Forecaster {
        Forecaster::with_current_year(NextYearPolicy::LastObservedYear, 2024)
    }

    #[test]
    fn city_report_carries_history_and_projection() {
        let s = seeded();
        let r = city_report(&s, &f(), 1).unwrap();
        assert_eq!(r.predicted_year, Some(2023));
        assert_eq!(r.predicted_population, 131_333);
        let growth: Vec<_> = r.history.iter().map(|h| h.growth).collect();
        assert_eq!(growth, vec![None, Some(10.0), Some(10.0)]);
        assert_eq!(r.history[0].source, "census");
        assert!(matches!(
            city_report(&s, &f(), 42),
            Err(StoreError::CityNotFound(42))
        ));
    }

    #[test]
    fn empty_city_reports_no_projection() {
        let s = seeded();
        let r = city_report(&s, &f(), 3).unwrap();
        assert_eq!(r.predicted_year, None);
        assert_eq!(r.predicted_population, 0);
        assert!(r.history.is_empty());
        assert_eq!(city_reports(&s, &f()).unwrap().len(), 3);
    }

    #[test]
    fn stats_count_every_city() {
        let stats = population_stats(&seeded(), &f()).unwrap();
        assert_eq!(stats.total_cities, 3);
        assert_eq!(stats.predicted_total_population, 131_333 + 50_000);
    }

    #[test]
    fn stats_total_saturates_for_huge_cities() {
        let mut s = Store::new();
        for name in ["Giant", "Titan"] {
            let c = s.add_city(name, "").unwrap();
            s.add_record(c.id, 2022, 5_000_000_000_000_000_000, "", "root").unwrap();
        }
        let stats = population_stats(&s, &f()).unwrap();
        assert_eq!(stats.predicted_total_population, i64::MAX);
        let r = summary_report(&s, &f()).unwrap();
        assert_eq!(r.total_predicted_population, i64::MAX);
    }

    #[test]
    fn summary_ranks_and_rounds() {
        let r = summary_report(&seeded(), &f()).unwrap();
        assert_eq!(r.total_cities, 2);
        assert_eq!(r.ranked[0].name, "Alpha");
        assert_eq!(r.fastest_growing.as_deref(), Some("Alpha"));
        assert_eq!(r.slowest_growing.as_deref(), Some("Beta"));
        assert_eq!(r.year, 2023);
        // Alpha: 10333 / 121000 * 100 = 8.5397..; Beta: 0 -> mean 4.27
        assert_eq!(r.average_growth_rate, 4.27);
        assert!(r.summary.contains("Alpha in North"));
    }

    #[test]
    fn actor_lookup() {
        let mut s = Store::new();
        s.create_admin("alice", "").unwrap();
        assert!(resolve_actor(&s, None).unwrap().is_none());
        assert_eq!(resolve_actor(&s, Some("alice")).unwrap().unwrap().username, "alice");
        assert_eq!(
            resolve_actor(&s, Some("bob")).unwrap_err(),
            AuthError::UnknownUser("bob".into())
        );
    }
}
