//! # Postal Code Store
//!
//! The authoritative set of postal code records, keyed by code.
//!
//! ## Architecture
//!
//! The store has one backend at a time. When a Postgres pool is configured
//! the `postal_codes` table is the store of record: every read and every
//! write is a single SQL statement, so records written by another process
//! (a `postal import` run against the same database) are visible at once.
//! Without a pool, records live in an in-memory [`Store`] and every operation
//! is one critical section of its lock.
//!
//! Records are addressed by their lookup key: the code without whitespace,
//! upper-cased. Country rules already produce canonical codes, so two
//! spellings of one code never become two records.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use postal_core::{
    validate_radius, Coordinates, CountryCode, CountryRegistry, PostalCodeRecord, UpsertOutcome,
    ValidationError, EARTH_RADIUS_KM,
};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use utoipa::ToSchema;

use crate::db;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory map ordered by key.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not `tokio::sync`)
/// because the lock is never held across `.await` points.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<BTreeMap<String, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Insert a value, returning the previous value if the key existed.
    pub fn insert(&self, key: String, value: T) -> Option<T> {
        self.data.write().insert(key, value)
    }

    /// Insert only if the key is absent. Returns `false` when it was present.
    pub fn insert_new(&self, key: String, value: T) -> bool {
        let mut guard = self.data.write();
        if guard.contains_key(&key) {
            return false;
        }
        guard.insert(key, value);
        true
    }

    /// Insert `value` under one write lock, letting `merge` carry fields over
    /// from the value it replaces. Returns whether a value was replaced, and
    /// the value as stored.
    pub fn replace_with(
        &self,
        key: String,
        mut value: T,
        merge: impl FnOnce(&T, &mut T),
    ) -> (bool, T) {
        let mut guard = self.data.write();
        let replaced = match guard.get(&key) {
            Some(old) => {
                merge(old, &mut value);
                true
            }
            None => false,
        };
        guard.insert(key, value.clone());
        (replaced, value)
    }

    /// Retrieve a value by key.
    pub fn get(&self, key: &str) -> Option<T> {
        self.data.read().get(key).cloned()
    }

    /// Remove a value by key.
    pub fn remove(&self, key: &str) -> Option<T> {
        self.data.write().remove(key)
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Values matching `predicate`, in key order.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| predicate(v))
            .cloned()
            .collect()
    }

    /// Fold over all values in key order without cloning them.
    pub fn fold<A>(&self, init: A, f: impl FnMut(A, &T) -> A) -> A {
        self.data.read().values().fold(init, f)
    }

    /// Return the number of values.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Query types --------------------------------------------------------------

/// Store operation failure.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record with this code already exists.
    #[error("postal code {0} already exists")]
    Conflict(String),

    /// The query arguments were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The database rejected the operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Record filter for listings. Text filters are case-insensitive substring
/// matches; `country` is exact.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Only records of this country.
    pub country: Option<CountryCode>,
    /// Substring of the district name.
    pub district: Option<String>,
    /// Substring of the county name.
    pub county: Option<String>,
    /// Substring of the locality name.
    pub locality: Option<String>,
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
    }
}

impl ListFilter {
    /// Whether `record` passes every set filter.
    pub fn matches(&self, record: &PostalCodeRecord) -> bool {
        self.country.as_ref().map_or(true, |c| &record.country == c)
            && contains_ci(&record.district, self.district.as_deref())
            && contains_ci(&record.county, self.county.as_deref())
            && contains_ci(&record.locality, self.locality.as_deref())
    }
}

/// Administrative level for distinct-name listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionLevel {
    /// Top-level administrative area.
    District,
    /// Municipality within a district.
    County,
    /// Delivery locality.
    Locality,
}

impl RegionLevel {
    fn name_of(self, record: &PostalCodeRecord) -> &str {
        match self {
            Self::District => &record.district,
            Self::County => &record.county,
            Self::Locality => &record.locality,
        }
    }

    /// Column holding this level in the `postal_codes` table.
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::District => "district",
            Self::County => "county",
            Self::Locality => "locality",
        }
    }
}

/// A distinct region name and how many codes it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RegionCount {
    /// District, county or locality name.
    pub name: String,
    /// Number of postal codes carrying this name.
    pub count: usize,
}

/// A radius search hit.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NearbyRecord {
    /// Great-circle distance from the search center.
    pub distance_km: f64,
    /// The matching record.
    pub record: PostalCodeRecord,
}

// -- Postal Code Store --------------------------------------------------------

/// Postal code records in Postgres, or in memory when no pool is given.
///
/// Clone-friendly: clones share the same records, registry and pool.
#[derive(Debug, Clone)]
pub struct PostalCodeStore {
    records: Store<PostalCodeRecord>,
    countries: Arc<CountryRegistry>,
    db_pool: Option<PgPool>,
}

/// Lookup key for a code as typed by a caller: whitespace removed, upper-case.
pub fn lookup_key(code: &str) -> String {
    code.split_whitespace().collect::<String>().to_ascii_uppercase()
}

impl PostalCodeStore {
    /// Create a store over `countries`, persisting to `db_pool` when given.
    pub fn new(countries: Arc<CountryRegistry>, db_pool: Option<PgPool>) -> Self {
        Self {
            records: Store::new(),
            countries,
            db_pool,
        }
    }

    /// In-memory store with the built-in countries.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(CountryRegistry::builtin()), None)
    }

    /// The country rules this store validates against.
    pub fn countries(&self) -> &CountryRegistry {
        &self.countries
    }

    /// Whether records live in Postgres.
    pub fn is_persistent(&self) -> bool {
        self.db_pool.is_some()
    }

    /// Number of records.
    pub async fn count(&self) -> Result<usize, StoreError> {
        match &self.db_pool {
            Some(pool) => Ok(db::postal_codes::count(pool).await?),
            None => Ok(self.records.len()),
        }
    }

    /// Record with this code, matched by lookup key. Absence is `Ok(None)`.
    pub async fn get(&self, code: &str) -> Result<Option<PostalCodeRecord>, StoreError> {
        let key = lookup_key(code);
        match &self.db_pool {
            Some(pool) => Ok(db::postal_codes::get(pool, &key).await?),
            None => Ok(self.records.get(&key)),
        }
    }

    /// Validate `code` against the rule of `country`, returning the
    /// normalized code.
    pub fn validate_code(&self, country: &str, code: &str) -> Result<String, ValidationError> {
        self.countries.lookup(country)?.validate(code)
    }

    /// All records with coordinates within `radius_km` of `center`,
    /// nearest first (ties broken by code).
    pub async fn within_radius(
        &self,
        center: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<NearbyRecord>, StoreError> {
        let radius_km = validate_radius(radius_km)?;
        let candidates = match &self.db_pool {
            Some(pool) => {
                // No point farther than the radius in latitude alone can be
                // within it. The margin absorbs rounding at the band edge.
                let band = (radius_km / EARTH_RADIUS_KM).to_degrees() + 1e-6;
                db::postal_codes::located_between(
                    pool,
                    center.latitude() - band,
                    center.latitude() + band,
                )
                .await?
            }
            None => self.records.filter(|r| r.coordinates().is_some()),
        };

        let mut hits: Vec<NearbyRecord> = candidates
            .into_iter()
            .filter_map(|record| {
                let distance_km = center.distance_km(&record.coordinates()?);
                (distance_km <= radius_km).then_some(NearbyRecord {
                    distance_km,
                    record,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.record.code.cmp(&b.record.code))
        });
        Ok(hits)
    }

    /// Filtered records in code order: `(total matches, requested page)`.
    pub async fn list(
        &self,
        filter: &ListFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(usize, Vec<PostalCodeRecord>), StoreError> {
        if let Some(pool) = &self.db_pool {
            return Ok(db::postal_codes::list(pool, filter, limit, offset).await?);
        }
        let matches = self.records.filter(|r| filter.matches(r));
        let total = matches.len();
        let page = matches.into_iter().skip(offset).take(limit).collect();
        Ok((total, page))
    }

    /// Distinct names at `level` among records passing `filter`, with counts,
    /// sorted by name.
    pub async fn distinct(
        &self,
        level: RegionLevel,
        filter: &ListFilter,
    ) -> Result<Vec<RegionCount>, StoreError> {
        if let Some(pool) = &self.db_pool {
            return Ok(db::postal_codes::distinct(pool, level, filter).await?);
        }
        let counts = self.records.fold(BTreeMap::<String, usize>::new(), |mut acc, r| {
            if filter.matches(r) {
                *acc.entry(level.name_of(r).to_string()).or_default() += 1;
            }
            acc
        });
        Ok(counts
            .into_iter()
            .map(|(name, count)| RegionCount { name, count })
            .collect())
    }

    /// Number of records per country.
    pub async fn count_by_country(&self) -> Result<BTreeMap<CountryCode, usize>, StoreError> {
        if let Some(pool) = &self.db_pool {
            let rows = db::postal_codes::count_by_country(pool).await?;
            return Ok(rows
                .into_iter()
                .filter_map(|(country, count)| Some((CountryCode::new(country).ok()?, count)))
                .collect());
        }
        Ok(self.records.fold(BTreeMap::new(), |mut acc, r| {
            *acc.entry(r.country.clone()).or_default() += 1;
            acc
        }))
    }

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] if the code is already stored;
    /// [`StoreError::Database`] if persistence fails.
    pub async fn insert(&self, record: PostalCodeRecord) -> Result<PostalCodeRecord, StoreError> {
        let key = lookup_key(&record.code);
        match &self.db_pool {
            Some(pool) => {
                db::postal_codes::insert(pool, &record)
                    .await
                    .map_err(|e| {
                        if let sqlx::Error::Database(d) = &e {
                            if d.is_unique_violation() {
                                return StoreError::Conflict(record.code.clone());
                            }
                        }
                        StoreError::Database(e)
                    })?;
            }
            None => {
                if !self.records.insert_new(key, record.clone()) {
                    return Err(StoreError::Conflict(record.code));
                }
            }
        }
        tracing::debug!(code = %record.code, "postal code inserted");
        Ok(record)
    }

    /// Insert or replace the record with the same code.
    ///
    /// An existing record keeps its `created_at`; the returned record carries
    /// the value actually stored.
    pub async fn upsert(
        &self,
        mut record: PostalCodeRecord,
    ) -> Result<(UpsertOutcome, PostalCodeRecord), StoreError> {
        let inserted = match &self.db_pool {
            Some(pool) => {
                let written = db::postal_codes::upsert(pool, &record).await?;
                record.created_at = written.created_at;
                written.inserted
            }
            None => {
                let (replaced, stored) =
                    self.records
                        .replace_with(lookup_key(&record.code), record, |old, new| {
                            new.created_at = old.created_at;
                        });
                record = stored;
                !replaced
            }
        };
        let outcome = if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        };
        tracing::debug!(code = %record.code, ?outcome, "postal code upserted");
        Ok((outcome, record))
    }

    /// Delete the record with this code. Returns `false` if none existed.
    pub async fn remove(&self, code: &str) -> Result<bool, StoreError> {
        let key = lookup_key(code);
        match &self.db_pool {
            Some(pool) => Ok(db::postal_codes::delete(pool, &key).await?),
            None => Ok(self.records.remove(&key).is_some()),
        }
    }

    /// Round-trip to the database, if one is configured.
    pub async fn ping(&self) -> Result<(), StoreError> {
        if let Some(pool) = &self.db_pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
