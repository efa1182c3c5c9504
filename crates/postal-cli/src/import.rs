//! # Import Subcommand
//!
//! Bulk import of one country's dataset into the store. Row failures are
//! logged and reported in the summary; they do not change the exit code.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use postal_api::import::{run_import as import_rows, ImportOptions};
use postal_api::PostalCodeStore;
use postal_core::{CountryCode, ImportSummary};

use crate::{bundled_dataset, GlobalOptions};

/// Arguments for the `postal import` subcommand.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Country whose code rule and row layout apply (e.g. PT).
    #[arg(long, default_value = "PT")]
    pub country: String,

    /// Dataset to read. Defaults to the bundled dataset for the country.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Field delimiter, overriding the country's layout.
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Whether the first row is a header, overriding the country's layout.
    /// `--has-headers` alone means `true`.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub has_headers: Option<bool>,
}

impl ImportArgs {
    fn options(&self) -> Result<ImportOptions> {
        let country = CountryCode::new(&self.country)?;
        let delimiter = match self.delimiter {
            None => None,
            Some(c) if c.is_ascii() => Some(c as u8),
            Some(c) => bail!("delimiter must be a single ASCII character, got {c:?}"),
        };
        Ok(ImportOptions {
            country,
            delimiter,
            has_headers: self.has_headers,
        })
    }
}

/// Execute the import subcommand.
///
/// Returns exit code 0 when the run completes. Operational errors (unknown
/// country, unreadable file, database failure) are returned as `Err`.
pub async fn run_import(args: &ImportArgs, global: &GlobalOptions) -> Result<u8> {
    let options = args.options()?;
    let store = global.open_store().await?;
    let summary = import_into(&store, args, &options).await?;

    println!("{summary}");
    if !store.is_persistent() {
        println!("(no database configured; records were not persisted)");
    }
    Ok(0)
}

/// Run the import against an already opened store.
pub async fn import_into(
    store: &PostalCodeStore,
    args: &ImportArgs,
    options: &ImportOptions,
) -> Result<ImportSummary> {
    let summary = match &args.file {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            import_from(store, file, options).await?
        }
        None => {
            let data = bundled_dataset(&options.country).with_context(|| {
                format!(
                    "no bundled dataset for {}; pass --file",
                    options.country
                )
            })?;
            import_from(store, data.as_bytes(), options).await?
        }
    };
    Ok(summary)
}

async fn import_from<R: Read + Send + 'static>(
    store: &PostalCodeStore,
    source: R,
    options: &ImportOptions,
) -> Result<ImportSummary> {
    import_rows(store, source, options)
        .await
        .with_context(|| format!("cannot import for country {}", options.country))
}

#[cfg(test)]
mod tests {
    use super::*;
    use postal_core::CountryRegistry;
    use std::io::Write;

    fn args(country: &str, file: Option<PathBuf>) -> ImportArgs {
        ImportArgs {
            country: country.into(),
            file,
            delimiter: None,
            has_headers: None,
        }
    }

    #[tokio::test]
    async fn imports_bundled_portugal_dataset() {
        let store = PostalCodeStore::in_memory();
        let args = args("pt", None);
        let summary = import_into(&store, &args, &args.options().unwrap())
            .await
            .unwrap();
        assert_eq!(summary.skipped, 0);
        assert_eq!(store.count().await.unwrap() as u64, summary.inserted);
    }

    #[tokio::test]
    async fn imports_pipe_delimited_file_with_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "codigo|localidade|concelho|distrito").unwrap();
        writeln!(file, "3030|Santo António dos Olivais|Coimbra|Coimbra").unwrap();
        writeln!(file, "4000-001|Porto||Porto").unwrap();

        let store = PostalCodeStore::in_memory();
        let args = ImportArgs {
            delimiter: Some('|'),
            has_headers: Some(true),
            ..args("PT", Some(file.path().to_path_buf()))
        };
        let summary = import_into(&store, &args, &args.options().unwrap())
            .await
            .unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failures[0].line, 3);
    }

    #[tokio::test]
    async fn country_without_bundle_needs_file() {
        let store = PostalCodeStore::in_memory();
        let args = args("ES", None);
        let err = import_into(&store, &args, &args.options().unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no bundled dataset for ES"));
    }

    #[tokio::test]
    async fn unreadable_file_is_error() {
        let store = PostalCodeStore::in_memory();
        let args = args("PT", Some(PathBuf::from("/nonexistent/pt.csv")));
        assert!(import_into(&store, &args, &args.options().unwrap())
            .await
            .is_err());
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let args = ImportArgs {
            delimiter: Some('§'),
            ..args("PT", None)
        };
        assert!(args.options().is_err());
    }

    #[test]
    fn has_headers_flag_overrides_both_ways() {
        use clap::Parser;

        #[derive(Parser)]
        struct Cmd {
            #[command(flatten)]
            args: ImportArgs,
        }

        let parse = |argv: &[&str]| Cmd::try_parse_from(argv).unwrap().args.has_headers;
        assert_eq!(parse(&["postal"]), None);
        assert_eq!(parse(&["postal", "--has-headers"]), Some(true));
        assert_eq!(parse(&["postal", "--has-headers=true"]), Some(true));
        assert_eq!(parse(&["postal", "--has-headers=false"]), Some(false));

        let args = ImportArgs {
            has_headers: Some(false),
            ..args("PT", None)
        };
        assert_eq!(args.options().unwrap().has_headers, Some(false));
    }

    #[tokio::test]
    async fn headers_can_be_switched_off_for_a_headed_layout() {
        let mut registry = CountryRegistry::builtin();
        registry
            .extend_from_json(
                r#"[{"code": "PT", "name": "Portugal", "pattern": "[1-9]\\d{3}(-\\d{3})?",
                     "layout": {"has_headers": true}}]"#,
            )
            .unwrap();
        let store = PostalCodeStore::new(std::sync::Arc::new(registry), None);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "3030,Olivais,Coimbra,Coimbra").unwrap();
        writeln!(file, "4000-001,Porto,Porto,Porto").unwrap();
        let args = ImportArgs {
            has_headers: Some(false),
            ..args("PT", Some(file.path().to_path_buf()))
        };
        let summary = import_into(&store, &args, &args.options().unwrap())
            .await
            .unwrap();
        assert_eq!(summary.inserted, 2);
    }

    #[test]
    fn malformed_country_is_rejected() {
        assert!(args("Portugal", None).options().is_err());
    }
}
