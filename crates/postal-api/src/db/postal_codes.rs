//! Postal code persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `postal_codes` table.
//! Codes are validated against their country's rule at the application layer
//! before they reach these functions. Rows are addressed by their lookup
//! key: the code without whitespace, upper-cased (see the
//! `postal_codes_lookup_key` index).

use chrono::{DateTime, Utc};
use postal_core::{CountryCode, PostalCodeRecord};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};

use crate::store::{ListFilter, RegionCount, RegionLevel};

const COLUMNS: &str = "code, locality, county, district, country, latitude, longitude,
                       street, designation, created_at, updated_at";

/// Filter clause over `$1..=$4`, bound by [`bind_filter`]. Text filters are
/// substring matches ignoring case, without LIKE wildcards.
const FILTER: &str = "($1::text IS NULL OR country = $1)
     AND ($2::text IS NULL OR strpos(lower(district), lower($2)) > 0)
     AND ($3::text IS NULL OR strpos(lower(county), lower($3)) > 0)
     AND ($4::text IS NULL OR strpos(lower(locality), lower($4)) > 0)";

fn bind_filter<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    filter: &'q ListFilter,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    query
        .bind(filter.country.as_ref().map(CountryCode::as_str))
        .bind(filter.district.as_deref())
        .bind(filter.county.as_deref())
        .bind(filter.locality.as_deref())
}

/// Outcome of [`upsert`] as seen by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Written {
    /// `created_at` of the stored row; kept from the old row on update.
    pub created_at: DateTime<Utc>,
    /// Whether the row was new.
    pub inserted: bool,
}

/// Insert a new record. Fails with a unique violation if the code exists.
pub async fn insert(pool: &PgPool, record: &PostalCodeRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO postal_codes (code, locality, county, district, country, latitude, longitude,
                                   street, designation, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(&record.code)
    .bind(&record.locality)
    .bind(&record.county)
    .bind(&record.district)
    .bind(record.country.as_str())
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(&record.street)
    .bind(&record.designation)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a record, or replace every field except `created_at` of the row
/// with the same lookup key, in one statement.
pub async fn upsert(pool: &PgPool, record: &PostalCodeRecord) -> Result<Written, sqlx::Error> {
    let (created_at, inserted) = sqlx::query_as::<_, (DateTime<Utc>, bool)>(
        "INSERT INTO postal_codes (code, locality, county, district, country, latitude, longitude,
                                   street, designation, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT ((upper(regexp_replace(code, '\\s', '', 'g')))) DO UPDATE SET
             code = EXCLUDED.code,
             locality = EXCLUDED.locality,
             county = EXCLUDED.county,
             district = EXCLUDED.district,
             country = EXCLUDED.country,
             latitude = EXCLUDED.latitude,
             longitude = EXCLUDED.longitude,
             street = EXCLUDED.street,
             designation = EXCLUDED.designation,
             updated_at = EXCLUDED.updated_at
         RETURNING created_at, (xmax = 0) AS inserted",
    )
    .bind(&record.code)
    .bind(&record.locality)
    .bind(&record.county)
    .bind(&record.district)
    .bind(record.country.as_str())
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(&record.street)
    .bind(&record.designation)
    .bind(record.created_at)
    .bind(record.updated_at)
    .fetch_one(pool)
    .await?;

    Ok(Written {
        created_at,
        inserted,
    })
}

/// Delete the row with lookup key `key`. Returns whether a row was removed.
pub async fn delete(pool: &PgPool, key: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM postal_codes WHERE upper(regexp_replace(code, '\\s', '', 'g')) = $1")
            .bind(key)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Fetch the row with lookup key `key`.
pub async fn get(pool: &PgPool, key: &str) -> Result<Option<PostalCodeRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, PostalCodeRow>(&format!(
        "SELECT {COLUMNS} FROM postal_codes
         WHERE upper(regexp_replace(code, '\\s', '', 'g')) = $1"
    ))
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(PostalCodeRow::into_record))
}

/// Rows passing `filter` in lookup-key order: `(total matches, page)`.
pub async fn list(
    pool: &PgPool,
    filter: &ListFilter,
    limit: usize,
    offset: usize,
) -> Result<(usize, Vec<PostalCodeRecord>), sqlx::Error> {
    let count_sql = format!("SELECT COUNT(*) FROM postal_codes WHERE {FILTER}");
    let (total,) = bind_filter(sqlx::query_as::<_, (i64,)>(&count_sql), filter)
        .fetch_one(pool)
        .await?;

    let page_sql = format!(
        "SELECT {COLUMNS} FROM postal_codes WHERE {FILTER}
         ORDER BY upper(regexp_replace(code, '\\s', '', 'g')) COLLATE \"C\"
         LIMIT $5 OFFSET $6"
    );
    let rows = bind_filter(sqlx::query_as::<_, PostalCodeRow>(&page_sql), filter)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await?;

    Ok((
        total.max(0) as usize,
        rows.into_iter().filter_map(PostalCodeRow::into_record).collect(),
    ))
}

/// Rows with coordinates whose latitude lies in `min_lat..=max_lat`.
pub async fn located_between(
    pool: &PgPool,
    min_lat: f64,
    max_lat: f64,
) -> Result<Vec<PostalCodeRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PostalCodeRow>(&format!(
        "SELECT {COLUMNS} FROM postal_codes
         WHERE latitude IS NOT NULL AND longitude IS NOT NULL
           AND latitude BETWEEN $1 AND $2"
    ))
    .bind(min_lat)
    .bind(max_lat)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(PostalCodeRow::into_record).collect())
}

/// Distinct names at `level` among rows passing `filter`, sorted by name.
pub async fn distinct(
    pool: &PgPool,
    level: RegionLevel,
    filter: &ListFilter,
) -> Result<Vec<RegionCount>, sqlx::Error> {
    let column = level.column();
    let sql = format!(
        "SELECT {column}, COUNT(*) FROM postal_codes WHERE {FILTER}
         GROUP BY {column} ORDER BY {column} COLLATE \"C\""
    );
    let rows = bind_filter(sqlx::query_as::<_, (String, i64)>(&sql), filter)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(name, count)| RegionCount {
            name,
            count: count.max(0) as usize,
        })
        .collect())
}

/// Number of rows per stored country code.
pub async fn count_by_country(pool: &PgPool) -> Result<Vec<(String, usize)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT country, COUNT(*) FROM postal_codes GROUP BY country",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(country, count)| (country, count.max(0) as usize))
        .collect())
}

/// Total number of rows.
pub async fn count(pool: &PgPool) -> Result<usize, sqlx::Error> {
    let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM postal_codes")
        .fetch_one(pool)
        .await?;
    Ok(count.max(0) as usize)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct PostalCodeRow {
    code: String,
    locality: String,
    county: String,
    district: String,
    country: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    street: Option<String>,
    designation: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostalCodeRow {
    fn into_record(self) -> Option<PostalCodeRecord> {
        let country = match CountryCode::new(&self.country) {
            Ok(country) => country,
            Err(e) => {
                tracing::warn!(
                    code = %self.code,
                    country = %self.country,
                    error = %e,
                    "invalid country code in database, skipping row"
                );
                return None;
            }
        };

        Some(PostalCodeRecord {
            code: self.code,
            locality: self.locality,
            county: self.county,
            district: self.district,
            country,
            latitude: self.latitude,
            longitude: self.longitude,
            street: self.street,
            designation: self.designation,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
