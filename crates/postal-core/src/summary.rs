//! # Import Summary
//!
//! Tally of an import run: how many rows were written and which were skipped.

use serde::Serialize;

use crate::error::RowError;

/// Result of writing one record keyed by its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// No record with that code existed.
    Inserted,
    /// An existing record was replaced.
    Updated,
}

/// A skipped row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    /// 1-based line number in the source.
    pub line: u64,
    /// Why the row was skipped.
    pub reason: String,
}

/// Counts for a finished import run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    /// Rows read (excluding header, comments and blank lines).
    pub total: u64,
    /// Rows that created a new record.
    pub inserted: u64,
    /// Rows that replaced an existing record.
    pub updated: u64,
    /// Rows skipped because of a [`RowError`].
    pub skipped: u64,
    /// Details of every skipped row, in source order.
    pub failures: Vec<RowFailure>,
}

impl ImportSummary {
    /// Record a successful write.
    pub fn record_success(&mut self, outcome: UpsertOutcome) {
        self.total += 1;
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }

    /// Record a skipped row.
    pub fn record_failure(&mut self, line: u64, error: &RowError) {
        self.total += 1;
        self.skipped += 1;
        self.failures.push(RowFailure {
            line,
            reason: error.to_string(),
        });
    }

    /// Rows written, inserted or updated.
    pub fn imported(&self) -> u64 {
        self.inserted + self.updated
    }
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rows: {} imported ({} new, {} updated), {} skipped",
            self.total,
            self.imported(),
            self.inserted,
            self.updated,
            self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_add_up() {
        let mut summary = ImportSummary::default();
        summary.record_success(UpsertOutcome::Inserted);
        summary.record_success(UpsertOutcome::Updated);
        summary.record_failure(3, &RowError::MissingField("code"));

        assert_eq!(summary.total, 3);
        assert_eq!(summary.imported(), 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failures[0].line, 3);
        assert!(summary.failures[0].reason.contains("code"));
        assert_eq!(
            summary.to_string(),
            "3 rows: 2 imported (1 new, 1 updated), 1 skipped"
        );
    }
}
