//! # Country Rules
//!
//! The per-country table that drives both validation and import.
//!
//! Each [`CountryRule`] pairs a [`CodeRule`] (how a postal code of that country
//! looks) with a [`RowLayout`] (how that country's dataset rows are laid out).
//! The [`CountryRegistry`] holds the rules keyed by [`CountryCode`]; callers
//! may [`register`](CountryRegistry::register) additional countries at runtime
//! or load them from a JSON file (see [`crate::config`]).
//!
//! ## Built-in countries
//!
//! | Code | Rule |
//! |------|------|
//! | `PT` | `^[1-9]\d{3}(-\d{3})?$` (CP4 with optional CP3 extension) |
//! | `ES` | five digits, province prefix `01..=52` |
//! | `US` | `^\d{5}(-\d{4})?$` (ZIP or ZIP+4) |
//! | `NL` | `^[1-9]\d{3} [A-Z]{2}$`, space inserted after the fourth character |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// ISO 3166-1 alpha-2 country code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse a country code, accepting either case.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCountryCode`] unless the trimmed input
    /// is exactly two ASCII letters.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = value.as_ref();
        let trimmed = raw.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCountryCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Portugal, the default country.
    pub fn portugal() -> Self {
        Self("PT".to_string())
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CountryCode {
    fn default() -> Self {
        Self::portugal()
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CountryCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

/// How a country's postal codes are recognised.
#[derive(Debug, Clone)]
pub enum CodeRule {
    /// A regular expression the whole (normalized) code must match.
    Pattern(Regex),
    /// A programmatic check, for rules a regex expresses poorly
    /// (checksums, range tables).
    Function {
        /// Human-readable description used in error messages.
        description: String,
        /// Returns `true` when the normalized code is valid.
        check: fn(&str) -> bool,
    },
}

impl CodeRule {
    /// Compile a pattern rule. The pattern is anchored by the caller.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    /// Whether `code` satisfies this rule.
    pub fn matches(&self, code: &str) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(code),
            Self::Function { check, .. } => check(code),
        }
    }

    /// Description of the rule for error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Pattern(re) => format!("pattern {}", re.as_str()),
            Self::Function { description, .. } => description.clone(),
        }
    }
}

/// Column positions (zero-based) of a dataset row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    /// Postal code column.
    pub code: usize,
    /// Locality column.
    pub locality: usize,
    /// County column.
    pub county: usize,
    /// District column.
    pub district: usize,
    /// Latitude column, if the dataset carries coordinates.
    pub latitude: Option<usize>,
    /// Longitude column, if the dataset carries coordinates.
    pub longitude: Option<usize>,
    /// Street / artery column.
    pub street: Option<usize>,
    /// Postal designation column.
    pub designation: Option<usize>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            code: 0,
            locality: 1,
            county: 2,
            district: 3,
            latitude: Some(4),
            longitude: Some(5),
            street: Some(6),
            designation: Some(7),
        }
    }
}

/// Shape of a country's dataset rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowLayout {
    /// Field delimiter byte (`,` or `|` in the datasets seen so far).
    pub delimiter: u8,
    /// Whether the first row is a header and must be skipped.
    pub has_headers: bool,
    /// Column positions.
    pub columns: ColumnMap,
}

impl Default for RowLayout {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: false,
            columns: ColumnMap::default(),
        }
    }
}

impl RowLayout {
    /// Replace the delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Replace header presence.
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }
}

/// Everything the service knows about one country.
#[derive(Debug, Clone)]
pub struct CountryRule {
    /// Country code.
    pub code: CountryCode,
    /// Display name.
    pub name: String,
    /// Postal code format rule.
    pub rule: CodeRule,
    /// Dataset row layout.
    pub layout: RowLayout,
    /// Canonical codes carry exactly one space after this many characters.
    /// `None` keeps the code's own spacing, with inner runs collapsed.
    pub space_after: Option<usize>,
}

impl CountryRule {
    /// Canonical form of a code for this country: trimmed, upper-case, and
    /// spaced per [`space_after`](Self::space_after).
    pub fn normalize(&self, code: &str) -> String {
        let upper = code.trim().to_ascii_uppercase();
        match self.space_after {
            Some(at) => {
                let compact: String = upper.split_whitespace().collect();
                if at > 0 && at < compact.len() && compact.is_char_boundary(at) {
                    format!("{} {}", &compact[..at], &compact[at..])
                } else {
                    compact
                }
            }
            None => upper.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }

    /// Normalize `code` and check it against the rule.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCode`] when the normalized code does
    /// not satisfy the rule.
    pub fn validate(&self, code: &str) -> Result<String, ValidationError> {
        let normalized = self.normalize(code);
        if self.rule.matches(&normalized) {
            Ok(normalized)
        } else {
            Err(ValidationError::InvalidCode {
                country: self.code.to_string(),
                code: code.to_string(),
                expected: self.rule.describe(),
            })
        }
    }
}

/// Spanish codes: five digits whose first two are a province number 01..=52.
fn spain_province_check(code: &str) -> bool {
    if code.len() != 5 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    matches!(code[..2].parse::<u8>(), Ok(1..=52))
}

/// Registry of country rules keyed by [`CountryCode`].
#[derive(Debug, Clone, Default)]
pub struct CountryRegistry {
    rules: BTreeMap<CountryCode, CountryRule>,
}

impl CountryRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in countries.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        // These patterns are literals; compile failure would be a typo caught by tests.
        let patterns = [
            ("PT", "Portugal", r"^[1-9]\d{3}(-\d{3})?$", None),
            ("US", "United States", r"^\d{5}(-\d{4})?$", None),
            ("NL", "Netherlands", r"^[1-9]\d{3} [A-Z]{2}$", Some(4)),
        ];
        for (code, name, pattern, space_after) in patterns {
            match CodeRule::pattern(pattern) {
                Ok(rule) => {
                    registry.register(CountryRule {
                        code: CountryCode(code.to_string()),
                        name: name.to_string(),
                        rule,
                        layout: RowLayout::default(),
                        space_after,
                    });
                }
                Err(e) => tracing::error!(country = code, error = %e, "built-in pattern failed to compile"),
            }
        }
        registry.register(CountryRule {
            code: CountryCode("ES".to_string()),
            name: "Spain".to_string(),
            rule: CodeRule::Function {
                description: "five digits with province prefix 01-52".to_string(),
                check: spain_province_check,
            },
            layout: RowLayout::default(),
            space_after: None,
        });
        registry
    }

    /// Add or replace a country rule. Returns the rule it replaced, if any.
    pub fn register(&mut self, rule: CountryRule) -> Option<CountryRule> {
        self.rules.insert(rule.code.clone(), rule)
    }

    /// Rule for a parsed country code.
    pub fn get(&self, code: &CountryCode) -> Option<&CountryRule> {
        self.rules.get(code)
    }

    /// Parse `code` and return its rule.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidCountryCode`] for malformed input,
    /// [`ValidationError::UnknownCountry`] when no rule is registered.
    pub fn lookup(&self, code: &str) -> Result<&CountryRule, ValidationError> {
        let parsed = CountryCode::new(code)?;
        self.rules
            .get(&parsed)
            .ok_or_else(|| ValidationError::UnknownCountry(parsed.to_string()))
    }

    /// Validate a postal code for a country, returning its normalized form.
    pub fn validate(&self, country: &CountryCode, code: &str) -> Result<String, ValidationError> {
        self.rules
            .get(country)
            .ok_or_else(|| ValidationError::UnknownCountry(country.to_string()))?
            .validate(code)
    }

    /// Iterate rules in country-code order.
    pub fn iter(&self) -> impl Iterator<Item = &CountryRule> {
        self.rules.values()
    }

    /// Number of registered countries.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no countries are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_code_normalizes_case_and_whitespace() {
        let code = CountryCode::new(" pt ").unwrap();
        assert_eq!(code.as_str(), "PT");
        assert_eq!(code, CountryCode::portugal());
    }

    #[test]
    fn country_code_rejects_bad_shapes() {
        for bad in ["", "P", "PRT", "P1", "1T"] {
            assert!(
                matches!(CountryCode::new(bad), Err(ValidationError::InvalidCountryCode(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn country_code_serde_validates() {
        let code: CountryCode = serde_json::from_str("\"es\"").unwrap();
        assert_eq!(code.as_str(), "ES");
        assert!(serde_json::from_str::<CountryCode>("\"spain\"").is_err());
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"ES\"");
    }

    #[test]
    fn builtin_registry_has_all_countries() {
        let registry = CountryRegistry::builtin();
        let codes: Vec<&str> = registry.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["ES", "NL", "PT", "US"]);
    }

    #[test]
    fn portugal_accepts_cp4_and_cp7() {
        let registry = CountryRegistry::builtin();
        let pt = CountryCode::portugal();
        assert_eq!(registry.validate(&pt, "3030").unwrap(), "3030");
        assert_eq!(registry.validate(&pt, "1000-001").unwrap(), "1000-001");
        assert!(registry.validate(&pt, "0999").is_err());
        assert!(registry.validate(&pt, "1000-01").is_err());
        assert!(registry.validate(&pt, "10000").is_err());
    }

    #[test]
    fn spain_uses_province_check() {
        let registry = CountryRegistry::builtin();
        let es = CountryCode::new("ES").unwrap();
        assert!(registry.validate(&es, "28013").is_ok());
        assert!(registry.validate(&es, "52001").is_ok());
        assert!(registry.validate(&es, "53001").is_err());
        assert!(registry.validate(&es, "00123").is_err());
        assert!(registry.validate(&es, "2801A").is_err());
    }

    #[test]
    fn netherlands_normalizes_letters() {
        let registry = CountryRegistry::builtin();
        let nl = CountryCode::new("NL").unwrap();
        assert_eq!(registry.validate(&nl, "1012 ab").unwrap(), "1012 AB");
        assert!(registry.validate(&nl, "0123 AB").is_err());
    }

    #[test]
    fn netherlands_spellings_share_one_canonical_form() {
        let registry = CountryRegistry::builtin();
        let nl = CountryCode::new("NL").unwrap();
        for spelling in ["1012AB", "1012 AB", " 1012  ab ", "1012\tAb"] {
            assert_eq!(registry.validate(&nl, spelling).unwrap(), "1012 AB", "{spelling:?}");
        }
        assert!(registry.validate(&nl, "10 12AB").is_ok());
        assert!(registry.validate(&nl, "1012A").is_err());
    }

    #[test]
    fn rules_without_spacing_collapse_inner_whitespace() {
        let mut registry = CountryRegistry::empty();
        registry.register(CountryRule {
            code: CountryCode::new("GB").unwrap(),
            name: "United Kingdom".into(),
            rule: CodeRule::pattern(r"^[A-Z]{1,2}\d[A-Z\d]? ?\d[A-Z]{2}$").unwrap(),
            layout: RowLayout::default(),
            space_after: None,
        });
        let gb = CountryCode::new("GB").unwrap();
        assert_eq!(registry.validate(&gb, "sw1a   1aa").unwrap(), "SW1A 1AA");
        assert_eq!(registry.validate(&gb, "SW1A1AA").unwrap(), "SW1A1AA");
    }

    #[test]
    fn wrong_country_rule_rejects() {
        let registry = CountryRegistry::builtin();
        let us = CountryCode::new("US").unwrap();
        let pt = CountryCode::portugal();
        assert!(registry.validate(&pt, "1000-001").is_ok());
        assert!(registry.validate(&us, "1000-001").is_err());
        assert!(registry.validate(&us, "90210").is_ok());
        assert!(registry.validate(&pt, "90210").is_err());
    }

    #[test]
    fn lookup_distinguishes_malformed_and_unknown() {
        let registry = CountryRegistry::builtin();
        assert!(matches!(
            registry.lookup("XX"),
            Err(ValidationError::UnknownCountry(c)) if c == "XX"
        ));
        assert!(matches!(
            registry.lookup("XXX"),
            Err(ValidationError::InvalidCountryCode(_))
        ));
        assert_eq!(registry.lookup("pt").unwrap().name, "Portugal");
    }

    #[test]
    fn register_replaces_existing_rule() {
        let mut registry = CountryRegistry::builtin();
        let before = registry.len();
        let replaced = registry.register(CountryRule {
            code: CountryCode::portugal(),
            name: "Portugal (CP4 only)".into(),
            rule: CodeRule::pattern(r"^\d{4}$").unwrap(),
            layout: RowLayout::default().with_delimiter(b'|'),
            space_after: None,
        });
        assert!(replaced.is_some());
        assert_eq!(registry.len(), before);
        let pt = registry.get(&CountryCode::portugal()).unwrap();
        assert_eq!(pt.layout.delimiter, b'|');
        assert!(pt.validate("1000-001").is_err());
    }
}
