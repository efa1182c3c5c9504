//! # Postal Code Records
//!
//! [`PostalCodeRecord`] is the single persisted entity. It is produced only by
//! validating a [`NewPostalCode`] draft against a [`CountryRegistry`], whether
//! the draft came from an API request body or an import row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::country::{CountryCode, CountryRegistry};
use crate::error::ValidationError;
use crate::geo::Coordinates;

/// A validated postal code record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PostalCodeRecord {
    /// Normalized postal code, unique across the store.
    pub code: String,
    /// Locality (parish / town).
    pub locality: String,
    /// County ("concelho" in Portugal).
    pub county: String,
    /// District.
    pub district: String,
    /// Country the code belongs to.
    pub country: CountryCode,
    /// Latitude in decimal degrees; present iff `longitude` is.
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees; present iff `latitude` is.
    pub longitude: Option<f64>,
    /// Street or artery served by the code.
    #[serde(default)]
    pub street: Option<String>,
    /// Postal designation (delivery office name).
    #[serde(default)]
    pub designation: Option<String>,
    /// When the code was first stored.
    pub created_at: DateTime<Utc>,
    /// When the code was last written.
    pub updated_at: DateTime<Utc>,
}

impl PostalCodeRecord {
    /// The record's coordinates, if it has both parts.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon).ok(),
            _ => None,
        }
    }

    /// Human-readable address line.
    ///
    /// Street first when known, then locality (left out when it repeats the
    /// county name), county, district and country code.
    pub fn full_address(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(5);
        if let Some(street) = self.street.as_deref() {
            parts.push(street);
        }
        if self.locality != self.county {
            parts.push(&self.locality);
        }
        parts.push(&self.county);
        parts.push(&self.district);
        parts.push(self.country.as_str());
        parts.join(", ")
    }
}

/// An unvalidated postal code, as received from a client or a dataset row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewPostalCode {
    /// Postal code as written by the source. May be omitted when the code
    /// is given elsewhere, as in the path of a PUT.
    #[serde(default)]
    pub code: String,
    /// Locality.
    pub locality: String,
    /// County.
    pub county: String,
    /// District.
    pub district: String,
    /// Country; defaults to Portugal when omitted.
    #[serde(default)]
    pub country: Option<CountryCode>,
    /// Latitude in decimal degrees.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Street or artery.
    #[serde(default)]
    pub street: Option<String>,
    /// Postal designation.
    #[serde(default)]
    pub designation: Option<String>,
}

fn required(value: String, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl NewPostalCode {
    /// Validate the draft and build a record stamped with the current time.
    pub fn validate(self, registry: &CountryRegistry) -> Result<PostalCodeRecord, ValidationError> {
        self.validate_at(registry, Utc::now())
    }

    /// Validate the draft and build a record stamped with `now`.
    ///
    /// Checks, in order: required text fields, the country's code rule, and
    /// coordinate completeness and ranges.
    pub fn validate_at(
        self,
        registry: &CountryRegistry,
        now: DateTime<Utc>,
    ) -> Result<PostalCodeRecord, ValidationError> {
        let code = required(self.code, "code")?;
        let locality = required(self.locality, "locality")?;
        let county = required(self.county, "county")?;
        let district = required(self.district, "district")?;
        let country = self.country.unwrap_or_default();
        let code = registry.validate(&country, &code)?;
        let coordinates = Coordinates::from_parts(self.latitude, self.longitude)?;

        Ok(PostalCodeRecord {
            code,
            locality,
            county,
            district,
            country,
            latitude: coordinates.map(|c| c.latitude()),
            longitude: coordinates.map(|c| c.longitude()),
            street: optional(self.street),
            designation: optional(self.designation),
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coimbra() -> NewPostalCode {
        NewPostalCode {
            code: "3030".into(),
            locality: "Santo António dos Olivais".into(),
            county: "Coimbra".into(),
            district: "Coimbra".into(),
            ..Default::default()
        }
    }

    #[test]
    fn validate_defaults_country_to_portugal() {
        let record = coimbra().validate(&CountryRegistry::builtin()).unwrap();
        assert_eq!(record.country, CountryCode::portugal());
        assert_eq!(record.code, "3030");
        assert_eq!(record.locality, "Santo António dos Olivais");
        assert!(record.coordinates().is_none());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn validate_trims_text_and_drops_blank_optionals() {
        let draft = NewPostalCode {
            code: " 1000-001 ".into(),
            locality: " Lisboa ".into(),
            street: Some("   ".into()),
            designation: Some(" LISBOA ".into()),
            ..coimbra()
        };
        let record = draft.validate(&CountryRegistry::builtin()).unwrap();
        assert_eq!(record.code, "1000-001");
        assert_eq!(record.locality, "Lisboa");
        assert_eq!(record.street, None);
        assert_eq!(record.designation.as_deref(), Some("LISBOA"));
    }

    #[test]
    fn validate_rejects_empty_required_field() {
        let draft = NewPostalCode {
            county: "  ".into(),
            ..coimbra()
        };
        assert_eq!(
            draft.validate(&CountryRegistry::builtin()),
            Err(ValidationError::EmptyField("county"))
        );
    }

    #[test]
    fn validate_rejects_code_for_wrong_country() {
        let draft = NewPostalCode {
            country: Some(CountryCode::new("US").unwrap()),
            ..coimbra()
        };
        assert!(matches!(
            draft.validate(&CountryRegistry::builtin()),
            Err(ValidationError::InvalidCode { .. })
        ));
    }

    #[test]
    fn validate_rejects_unknown_country() {
        let draft = NewPostalCode {
            country: Some(CountryCode::new("ZZ").unwrap()),
            ..coimbra()
        };
        assert!(matches!(
            draft.validate(&CountryRegistry::builtin()),
            Err(ValidationError::UnknownCountry(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_coordinates() {
        let half = NewPostalCode {
            latitude: Some(40.2),
            ..coimbra()
        };
        assert_eq!(
            half.validate(&CountryRegistry::builtin()),
            Err(ValidationError::IncompleteCoordinates)
        );

        let out_of_range = NewPostalCode {
            latitude: Some(140.0),
            longitude: Some(-8.4),
            ..coimbra()
        };
        assert!(matches!(
            out_of_range.validate(&CountryRegistry::builtin()),
            Err(ValidationError::LatitudeOutOfRange(_))
        ));
    }

    #[test]
    fn full_address_skips_locality_equal_to_county() {
        let mut record = coimbra().validate(&CountryRegistry::builtin()).unwrap();
        assert_eq!(
            record.full_address(),
            "Santo António dos Olivais, Coimbra, Coimbra, PT"
        );

        record.locality = "Coimbra".into();
        record.street = Some("Rua da Sofia".into());
        assert_eq!(record.full_address(), "Rua da Sofia, Coimbra, Coimbra, PT");
    }

    #[test]
    fn draft_deserializes_with_defaults() {
        let draft: NewPostalCode = serde_json::from_str(
            r#"{"code": "3030", "locality": "L", "county": "C", "district": "D"}"#,
        )
        .unwrap();
        assert_eq!(draft.country, None);
        assert_eq!(draft.latitude, None);
    }
}
