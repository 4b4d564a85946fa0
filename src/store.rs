//! City/population/user storage behind the [`SeriesRepository`] interface.
//!
//! [`Store`] keeps everything in memory and persists to a single pretty-printed
//! JSON document. The forecasting code only ever sees [`SeriesRepository`].

use crate::models::{City, PopulationRecord, Role, User};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("city {0} not found")]
    CityNotFound(u64),
    #[error("population record {0} not found")]
    RecordNotFound(u64),
    #[error("admin {0} not found")]
    AdminNotFound(u64),
    #[error("city '{0}' already exists")]
    DuplicateCity(String),
    #[error("username '{0}' already exists")]
    DuplicateUser(String),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("cannot access store file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store file {path} is not a valid store document")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read access to cities and their yearly series.
pub trait SeriesRepository {
    /// All cities, ordered by id.
    fn cities(&self) -> Vec<City>;

    fn city(&self, id: u64) -> Option<City>;

    /// Records for one city, ascending by year (ties by id).
    fn fetch_series(&self, city_id: u64) -> Result<Vec<PopulationRecord>, StoreError>;
}

/// Partial update of a city. Blank or absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CityPatch {
    pub name: Option<String>,
    pub region: Option<String>,
}

/// Partial update of a population record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub year: Option<i32>,
    pub population_count: Option<u64>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct IdCounters {
    city: u64,
    record: u64,
    user: u64,
}

fn next_id(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default)]
    ids: IdCounters,
    #[serde(default)]
    cities: Vec<City>,
    #[serde(default)]
    records: Vec<PopulationRecord>,
    #[serde(default)]
    users: Vec<User>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store document. A missing file yields an empty store.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("no store at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store: Store = serde_json::from_str(&text).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            "loaded {} cities, {} records, {} users from {}",
            store.cities.len(),
            store.records.len(),
            store.users.len(),
            path.display()
        );
        Ok(store)
    }

    /// Persist as pretty JSON; written to a sibling temp file, then renamed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let path = path.as_ref();
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        log::debug!("saved store to {}", path.display());
        Ok(())
    }

    // ---- cities ----

    fn name_taken(&self, name: &str, except: Option<u64>) -> bool {
        self.cities
            .iter()
            .any(|c| Some(c.id) != except && c.name.eq_ignore_ascii_case(name))
    }

    pub fn add_city(&mut self, name: &str, region: &str) -> Result<City, StoreError> {
        let name = non_blank(Some(name)).ok_or(StoreError::MissingField("city name"))?;
        if self.name_taken(name, None) {
            return Err(StoreError::DuplicateCity(name.to_string()));
        }
        let city = City {
            id: next_id(&mut self.ids.city),
            name: name.to_string(),
            region: region.trim().to_string(),
        };
        log::info!("added city {} '{}'", city.id, city.name);
        self.cities.push(city.clone());
        Ok(city)
    }

    pub fn update_city(&mut self, id: u64, patch: &CityPatch) -> Result<City, StoreError> {
        let idx = self
            .cities
            .iter()
            .position(|c| c.id == id)
            .ok_or(StoreError::CityNotFound(id))?;
        let new_name = non_blank(patch.name.as_deref());
        if let Some(name) = new_name
            && self.name_taken(name, Some(id))
        {
            return Err(StoreError::DuplicateCity(name.to_string()));
        }
        let city = &mut self.cities[idx];
        if let Some(name) = new_name {
            city.name = name.to_string();
        }
        if let Some(region) = non_blank(patch.region.as_deref()) {
            city.region = region.to_string();
        }
        Ok(city.clone())
    }

    /// Remove a city together with all of its population records.
    pub fn delete_city(&mut self, id: u64) -> Result<City, StoreError> {
        let idx = self
            .cities
            .iter()
            .position(|c| c.id == id)
            .ok_or(StoreError::CityNotFound(id))?;
        let city = self.cities.remove(idx);
        let before = self.records.len();
        self.records.retain(|r| r.city_id != id);
        log::info!(
            "deleted city {} '{}' and {} records",
            city.id,
            city.name,
            before - self.records.len()
        );
        Ok(city)
    }

    // ---- population records ----

    pub fn add_record(
        &mut self,
        city_id: u64,
        year: i32,
        population_count: u64,
        source: &str,
        created_by: &str,
    ) -> Result<PopulationRecord, StoreError> {
        if !self.cities.iter().any(|c| c.id == city_id) {
            return Err(StoreError::CityNotFound(city_id));
        }
        let record = PopulationRecord {
            id: next_id(&mut self.ids.record),
            city_id,
            year,
            population_count,
            source: source.trim().to_string(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        self.records.push(record.clone());
        Ok(record)
    }

    pub fn record(&self, id: u64) -> Option<&PopulationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn update_record(
        &mut self,
        id: u64,
        patch: &RecordPatch,
    ) -> Result<PopulationRecord, StoreError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::RecordNotFound(id))?;
        if let Some(year) = patch.year {
            record.year = year;
        }
        if let Some(count) = patch.population_count {
            record.population_count = count;
        }
        if let Some(source) = &patch.source {
            record.source = source.trim().to_string();
        }
        Ok(record.clone())
    }

    pub fn delete_record(&mut self, id: u64) -> Result<PopulationRecord, StoreError> {
        let idx = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::RecordNotFound(id))?;
        Ok(self.records.remove(idx))
    }

    // ---- users ----

    fn add_user(&mut self, username: &str, email: &str, role: Role) -> Result<User, StoreError> {
        let username = non_blank(Some(username)).ok_or(StoreError::MissingField("username"))?;
        if self.users.iter().any(|u| u.username == username) {
            return Err(StoreError::DuplicateUser(username.to_string()));
        }
        let user = User {
            id: next_id(&mut self.ids.user),
            username: username.to_string(),
            email: email.trim().to_string(),
            role,
        };
        log::info!("created {} '{}'", user.role, user.username);
        self.users.push(user.clone());
        Ok(user)
    }

    pub fn create_admin(&mut self, username: &str, email: &str) -> Result<User, StoreError> {
        self.add_user(username, email, Role::Admin)
    }

    pub fn create_superadmin(&mut self, username: &str, email: &str) -> Result<User, StoreError> {
        self.add_user(username, email, Role::SuperAdmin)
    }

    pub fn has_superadmin(&self) -> bool {
        self.users.iter().any(|u| u.role == Role::SuperAdmin)
    }

    pub fn admins(&self) -> Vec<User> {
        self.users
            .iter()
            .filter(|u| u.role == Role::Admin)
            .cloned()
            .collect()
    }

    /// Delete a user with role `Admin`; superadmins are never matched.
    pub fn delete_admin(&mut self, id: u64) -> Result<User, StoreError> {
        let idx = self
            .users
            .iter()
            .position(|u| u.id == id && u.role == Role::Admin)
            .ok_or(StoreError::AdminNotFound(id))?;
        Ok(self.users.remove(idx))
    }

    pub fn user_by_name(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }
}

impl SeriesRepository for Store {
    fn cities(&self) -> Vec<City> {
        let mut out = self.cities.clone();
        out.sort_by_key(|c| c.id);
        out
    }

    fn city(&self, id: u64) -> Option<City> {
        self.cities.iter().find(|c| c.id == id).cloned()
    }

    fn fetch_series(&self, city_id: u64) -> Result<Vec<PopulationRecord>, StoreError> {
        if !self.cities.iter().any(|c| c.id == city_id) {
            return Err(StoreError::CityNotFound(city_id));
        }
        let mut out: Vec<PopulationRecord> = self
            .records
            .iter()
            .filter(|r| r.city_id == city_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.year, r.id));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn city_names_are_unique_case_insensitively() {
        let mut s = Store::new();
        s.add_city("Manila", "NCR").unwrap();
        let err = s.add_city("  manila ", "").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCity(n) if n == "manila"));
        assert!(matches!(
            s.add_city("   ", "x").unwrap_err(),
            StoreError::MissingField(_)
        ));
    }

    #[test]
    fn update_city_keeps_blank_fields() {
        let mut s = Store::new();
        let c = s.add_city("Cebu", "Visayas").unwrap();
        s.add_city("Davao", "Mindanao").unwrap();
        let patch = CityPatch {
            name: Some(" ".into()),
            region: Some("Central Visayas".into()),
        };
        let u = s.update_city(c.id, &patch).unwrap();
        assert_eq!(u.name, "Cebu");
        assert_eq!(u.region, "Central Visayas");

        let clash = CityPatch {
            name: Some("DAVAO".into()),
            region: None,
        };
        assert!(matches!(
            s.update_city(c.id, &clash),
            Err(StoreError::DuplicateCity(_))
        ));
        // renaming to its own name (different case) is fine
        let same = CityPatch {
            name: Some("CEBU".into()),
            region: None,
        };
        assert_eq!(s.update_city(c.id, &same).unwrap().name, "CEBU");
    }

    #[test]
    fn update_unknown_city_reports_not_found_before_name_clash() {
        let mut s = Store::new();
        s.add_city("Davao", "Mindanao").unwrap();
        let clash = CityPatch {
            name: Some("davao".into()),
            region: None,
        };
        assert!(matches!(
            s.update_city(99, &clash),
            Err(StoreError::CityNotFound(99))
        ));
    }

    #[test]
    fn delete_city_cascades_and_ids_are_not_reused() {
        let mut s = Store::new();
        let a = s.add_city("A", "").unwrap();
        let b = s.add_city("B", "").unwrap();
        s.add_record(a.id, 2020, 10, "", "root").unwrap();
        s.add_record(b.id, 2020, 20, "", "root").unwrap();
        s.delete_city(a.id).unwrap();
        assert_eq!(s.records.len(), 1);
        assert!(matches!(s.fetch_series(a.id), Err(StoreError::CityNotFound(_))));
        let c = s.add_city("C", "").unwrap();
        assert_eq!(c.id, 3);
    }

    #[test]
    fn series_is_sorted_by_year() {
        let mut s = Store::new();
        let c = s.add_city("X", "").unwrap();
        s.add_record(c.id, 2022, 3, "", "u").unwrap();
        s.add_record(c.id, 2020, 1, "", "u").unwrap();
        s.add_record(c.id, 2021, 2, "census", "u").unwrap();
        let years: Vec<i32> = s.fetch_series(c.id).unwrap().iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2020, 2021, 2022]);
        assert!(matches!(
            s.add_record(99, 2020, 1, "", "u"),
            Err(StoreError::CityNotFound(99))
        ));
    }

    #[test]
    fn update_and_delete_records() {
        let mut s = Store::new();
        let c = s.add_city("X", "").unwrap();
        let r = s.add_record(c.id, 2020, 100, "old", "u").unwrap();
        let patch = RecordPatch {
            population_count: Some(150),
            source: Some("new".into()),
            ..Default::default()
        };
        let u = s.update_record(r.id, &patch).unwrap();
        assert_eq!((u.year, u.population_count, u.source.as_str()), (2020, 150, "new"));
        s.delete_record(r.id).unwrap();
        assert!(s.record(r.id).is_none());
        assert!(matches!(
            s.delete_record(r.id),
            Err(StoreError::RecordNotFound(_))
        ));
    }

    #[test]
    fn admins_only_delete_admin_role() {
        let mut s = Store::new();
        let root = s.create_superadmin("root", "root@example.com").unwrap();
        let a = s.create_admin("alice", "a@example.com").unwrap();
        assert!(matches!(
            s.create_admin("alice", ""),
            Err(StoreError::DuplicateUser(_))
        ));
        assert_eq!(s.admins().len(), 1);
        assert!(matches!(
            s.delete_admin(root.id),
            Err(StoreError::AdminNotFound(_))
        ));
        s.delete_admin(a.id).unwrap();
        assert!(s.admins().is_empty());
        assert!(s.has_superadmin());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        assert_eq!(Store::load(&path).unwrap(), Store::default());

        let mut s = Store::new();
        let c = s.add_city("Quezon City", "NCR").unwrap();
        s.add_record(c.id, 2020, 2_960_048, "PSA", "root").unwrap();
        s.save(&path).unwrap();
        let loaded = Store::load(&path).unwrap();
        assert_eq!(loaded, s);

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(Store::load(&path), Err(StoreError::Json { .. })));
    }
}
