//! # Country Rule Configuration
//!
//! JSON definitions for countries beyond the built-in set. A rules file is an
//! array of [`CountryRuleConfig`]:
//!
//! ```json
//! [{"code": "BE", "name": "Belgium", "pattern": "[1-9]\\d{3}",
//!   "layout": {"delimiter": ";", "has_headers": true}}]
//! ```
//!
//! Patterns are matched against the whole normalized code. Fields omitted
//! from `layout` take their [`RowLayout::default`] values. An optional
//! `space_after` fixes where the single space of a canonical code goes.

use std::path::Path;

use serde::Deserialize;

use crate::country::{CodeRule, ColumnMap, CountryCode, CountryRegistry, CountryRule, RowLayout};
use crate::error::PostalError;

/// One country entry in a rules file.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryRuleConfig {
    /// ISO 3166-1 alpha-2 code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Regular expression for the postal code.
    pub pattern: String,
    /// Dataset layout overrides.
    #[serde(default)]
    pub layout: Option<RowLayoutConfig>,
    /// Position of the single space in canonical codes, if any.
    #[serde(default)]
    pub space_after: Option<usize>,
}

/// Partial [`RowLayout`] as written in a rules file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RowLayoutConfig {
    /// Single ASCII delimiter character.
    pub delimiter: Option<char>,
    /// Whether the dataset has a header row.
    pub has_headers: Option<bool>,
    /// Column positions.
    pub columns: Option<ColumnMap>,
}

impl RowLayoutConfig {
    fn into_layout(self, country: &str) -> Result<RowLayout, PostalError> {
        let mut layout = RowLayout::default();
        if let Some(delimiter) = self.delimiter {
            if !delimiter.is_ascii() {
                return Err(PostalError::InvalidRule {
                    country: country.to_string(),
                    reason: format!("delimiter {delimiter:?} is not ASCII"),
                });
            }
            layout.delimiter = delimiter as u8;
        }
        if let Some(has_headers) = self.has_headers {
            layout.has_headers = has_headers;
        }
        if let Some(columns) = self.columns {
            layout.columns = columns;
        }
        Ok(layout)
    }
}

impl CountryRuleConfig {
    /// Compile this entry into a [`CountryRule`].
    ///
    /// # Errors
    ///
    /// Fails on a malformed country code, a pattern that does not compile,
    /// or a non-ASCII delimiter.
    pub fn into_rule(self) -> Result<CountryRule, PostalError> {
        let code = CountryCode::new(&self.code)?;
        let anchored = format!("^(?:{})$", self.pattern);
        let rule = CodeRule::pattern(&anchored).map_err(|e| PostalError::InvalidRule {
            country: self.code.clone(),
            reason: e.to_string(),
        })?;
        let layout = self.layout.unwrap_or_default().into_layout(&self.code)?;
        Ok(CountryRule {
            code,
            name: self.name,
            rule,
            layout,
            space_after: self.space_after,
        })
    }
}

impl CountryRegistry {
    /// Register every country from a JSON rules document.
    ///
    /// Entries replace built-in rules with the same code. Returns the number
    /// of entries registered. Nothing is registered if any entry is invalid.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize, PostalError> {
        let entries: Vec<CountryRuleConfig> = serde_json::from_str(json)?;
        let rules = entries
            .into_iter()
            .map(CountryRuleConfig::into_rule)
            .collect::<Result<Vec<_>, _>>()?;
        let count = rules.len();
        for rule in rules {
            tracing::debug!(country = %rule.code, name = %rule.name, "registered country rule");
            self.register(rule);
        }
        Ok(count)
    }

    /// Read a JSON rules file and register its countries.
    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize, PostalError> {
        let json = std::fs::read_to_string(path)?;
        self.extend_from_json(&json)
    }
}
