//! # Bulk Importer
//!
//! Sequential pass over one country's dataset: each row is parsed by a
//! [`RowReader`], validated against the country's rule, and upserted into the
//! [`PostalCodeStore`]. Rows that fail at any stage are logged with their line
//! number and counted as skipped; the run itself only fails if the country
//! is unknown.
//!
//! The source is read on a blocking thread and rows reach the async writer
//! through a bounded channel, so a slow file never stalls the runtime.

use std::io::Read;

use postal_core::{
    CountryCode, ImportSummary, ParsedRow, RowError, RowLayout, RowReader, ValidationError,
};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::store::PostalCodeStore;

/// Rows buffered between the reader thread and the writer.
const ROW_BUFFER: usize = 256;

/// Failure of a whole import run.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The country is malformed or has no rule.
    #[error(transparent)]
    Country(#[from] ValidationError),

    /// The reader thread panicked or was cancelled.
    #[error("dataset reader failed: {0}")]
    Reader(#[from] tokio::task::JoinError),
}

/// Per-run overrides of the country's row layout.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Country whose rule and layout apply to every row.
    pub country: CountryCode,
    /// Replaces the layout's delimiter.
    pub delimiter: Option<u8>,
    /// Replaces the layout's header flag.
    pub has_headers: Option<bool>,
}

impl ImportOptions {
    /// Options using the country's layout unchanged.
    pub fn new(country: CountryCode) -> Self {
        Self {
            country,
            delimiter: None,
            has_headers: None,
        }
    }

    fn layout(&self, base: &RowLayout) -> RowLayout {
        let mut layout = base.clone();
        if let Some(delimiter) = self.delimiter {
            layout = layout.with_delimiter(delimiter);
        }
        if let Some(has_headers) = self.has_headers {
            layout = layout.with_headers(has_headers);
        }
        layout
    }
}

/// Import every row of `source` into `store`.
///
/// # Errors
///
/// [`ImportError::Country`] if the store's registry has no rule for
/// `options.country`. Row-level problems never fail the run.
pub async fn run_import<R: Read + Send + 'static>(
    store: &PostalCodeStore,
    source: R,
    options: &ImportOptions,
) -> Result<ImportSummary, ImportError> {
    let rule = store.countries().lookup(options.country.as_str())?;
    let layout = options.layout(&rule.layout);
    tracing::info!(
        country = %options.country,
        delimiter = %char::from(layout.delimiter),
        has_headers = layout.has_headers,
        "starting import"
    );

    let (tx, mut rx) = mpsc::channel::<ParsedRow>(ROW_BUFFER);
    let country = options.country.clone();
    let reader = tokio::task::spawn_blocking(move || {
        for row in RowReader::new(source, country, layout) {
            if tx.blocking_send(row).is_err() {
                break;
            }
        }
    });

    let mut summary = ImportSummary::default();
    while let Some(ParsedRow { line, result }) = rx.recv().await {
        match import_row(store, result).await {
            Ok(outcome) => summary.record_success(outcome),
            Err(error) => {
                tracing::warn!(line, %error, "skipping row");
                summary.record_failure(line, &error);
            }
        }
    }
    reader.await?;

    tracing::info!(
        country = %options.country,
        total = summary.total,
        inserted = summary.inserted,
        updated = summary.updated,
        skipped = summary.skipped,
        "import finished"
    );
    Ok(summary)
}

async fn import_row(
    store: &PostalCodeStore,
    draft: Result<postal_core::NewPostalCode, RowError>,
) -> Result<postal_core::UpsertOutcome, RowError> {
    let record = draft?.validate(store.countries())?;
    let (outcome, _) = store
        .upsert(record)
        .await
        .map_err(|e| RowError::Persistence(e.to_string()))?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portugal() -> ImportOptions {
        ImportOptions::new(CountryCode::portugal())
    }

    #[tokio::test]
    async fn imports_coimbra_row() {
        let store = PostalCodeStore::in_memory();
        let summary = run_import(
            &store,
            "3030,Santo António dos Olivais,Coimbra,Coimbra\n".as_bytes(),
            &portugal(),
        )
        .await
        .unwrap();

        assert_eq!(summary.inserted, 1);
        let record = store.get("3030").await.unwrap().unwrap();
        assert_eq!(record.locality, "Santo António dos Olivais");
        assert_eq!(record.county, "Coimbra");
        assert_eq!(record.district, "Coimbra");
    }

    #[tokio::test]
    async fn reimport_is_idempotent() {
        let data = "3030,Olivais,Coimbra,Coimbra\n4000-001,Porto,Porto,Porto\n";
        let store = PostalCodeStore::in_memory();

        let first = run_import(&store, data.as_bytes(), &portugal()).await.unwrap();
        let second = run_import(&store, data.as_bytes(), &portugal()).await.unwrap();

        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn bad_rows_are_skipped_and_counted() {
        let data = "3030,Olivais,,Coimbra\n\
                    ABCD,Nowhere,Lisboa,Lisboa\n\
                    1100-148,Lisboa,Lisboa,Lisboa,98.0,-9.1\n\
                    4000-001,Porto,Porto,Porto\n";
        let store = PostalCodeStore::in_memory();
        let summary = run_import(&store, data.as_bytes(), &portugal()).await.unwrap();

        assert_eq!(summary.total, 4);
        assert_eq!(summary.imported(), 1);
        assert_eq!(summary.skipped, 3);
        let lines: Vec<u64> = summary.failures.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
        assert!(store.get("4000-001").await.unwrap().is_some());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rows_are_validated_against_selected_country() {
        let store = PostalCodeStore::in_memory();
        let options = ImportOptions::new(CountryCode::new("US").unwrap());
        let summary = run_import(
            &store,
            "3030,Olivais,Coimbra,Coimbra\n10001,New York,New York,NY\n".as_bytes(),
            &options,
        )
        .await
        .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(
            store.get("10001").await.unwrap().unwrap().country.as_str(),
            "US"
        );
    }

    #[tokio::test]
    async fn layout_overrides_apply() {
        let store = PostalCodeStore::in_memory();
        let options = ImportOptions {
            delimiter: Some(b'|'),
            has_headers: Some(true),
            ..portugal()
        };
        let summary = run_import(
            &store,
            "code|locality|county|district\n3030|Olivais|Coimbra|Coimbra\n".as_bytes(),
            &options,
        )
        .await
        .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(summary.inserted, 1);
    }

    #[tokio::test]
    async fn unknown_country_fails_the_run() {
        let store = PostalCodeStore::in_memory();
        let options = ImportOptions::new(CountryCode::new("ZZ").unwrap());
        let err = run_import(&store, "".as_bytes(), &options).await.unwrap_err();
        assert!(matches!(err, ImportError::Country(ValidationError::UnknownCountry(_))));
    }

    #[tokio::test]
    async fn large_source_streams_through_row_buffer() {
        let data: String = (1000..1000 + ROW_BUFFER as u32 * 3)
            .map(|n| format!("{n},Locality,County,District\n"))
            .collect();
        let store = PostalCodeStore::in_memory();
        let summary = run_import(&store, std::io::Cursor::new(data), &portugal())
            .await
            .unwrap();
        assert_eq!(summary.inserted, ROW_BUFFER as u64 * 3);
        assert_eq!(summary.skipped, 0);
    }
}
