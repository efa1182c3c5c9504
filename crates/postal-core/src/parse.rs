//! # Dataset Row Parser
//!
//! Turns a delimited dataset into [`NewPostalCode`] drafts according to a
//! country's [`RowLayout`]. Rows are independent: a bad row yields a
//! [`RowError`] for that line and reading continues with the next one.
//!
//! Rows may be shorter than the layout's optional columns (coordinates,
//! street, designation); missing trailing columns read as absent. Blank lines
//! and lines starting with `#` are ignored.

use std::io::Read;

use csv::{StringRecord, StringRecordsIntoIter};

use crate::country::{CountryCode, RowLayout};
use crate::error::RowError;
use crate::record::NewPostalCode;

/// One row from the dataset, tagged with its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    /// Line number in the source.
    pub line: u64,
    /// The draft, or why the row could not become one.
    pub result: Result<NewPostalCode, RowError>,
}

/// Iterator over the rows of one country's dataset.
pub struct RowReader<R: Read> {
    records: StringRecordsIntoIter<R>,
    layout: RowLayout,
    country: CountryCode,
    last_line: u64,
}

impl<R: Read> RowReader<R> {
    /// Read `source` using `layout`, tagging every draft with `country`.
    pub fn new(source: R, country: CountryCode, layout: RowLayout) -> Self {
        let records = csv::ReaderBuilder::new()
            .delimiter(layout.delimiter)
            .has_headers(layout.has_headers)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(source)
            .into_records();
        Self {
            records,
            layout,
            country,
            last_line: 0,
        }
    }

    fn draft(&self, record: &StringRecord) -> Result<NewPostalCode, RowError> {
        let columns = &self.layout.columns;
        Ok(NewPostalCode {
            code: required(record, columns.code, "code")?,
            locality: required(record, columns.locality, "locality")?,
            county: required(record, columns.county, "county")?,
            district: required(record, columns.district, "district")?,
            country: Some(self.country.clone()),
            latitude: number(record, columns.latitude, "latitude")?,
            longitude: number(record, columns.longitude, "longitude")?,
            street: optional(record, columns.street),
            designation: optional(record, columns.designation),
        })
    }
}

fn field(record: &StringRecord, index: usize) -> Option<&str> {
    record.get(index).map(str::trim).filter(|v| !v.is_empty())
}

fn required(record: &StringRecord, index: usize, name: &'static str) -> Result<String, RowError> {
    field(record, index)
        .map(str::to_string)
        .ok_or(RowError::MissingField(name))
}

fn optional(record: &StringRecord, index: Option<usize>) -> Option<String> {
    index.and_then(|i| field(record, i)).map(str::to_string)
}

fn number(
    record: &StringRecord,
    index: Option<usize>,
    name: &'static str,
) -> Result<Option<f64>, RowError> {
    match index.and_then(|i| field(record, i)) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| RowError::InvalidNumber {
                field: name,
                value: raw.to_string(),
            }),
    }
}

impl<R: Read> Iterator for RowReader<R> {
    type Item = ParsedRow;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.records.next()?;
        let row = match item {
            Ok(record) => {
                let line = record
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(self.last_line + 1);
                ParsedRow {
                    line,
                    result: self.draft(&record),
                }
            }
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(self.last_line + 1);
                ParsedRow {
                    line,
                    result: Err(RowError::Malformed(e.to_string())),
                }
            }
        };
        self.last_line = row.line;
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(input: &str, layout: RowLayout) -> Vec<ParsedRow> {
        RowReader::new(input.as_bytes(), CountryCode::portugal(), layout).collect()
    }

    #[test]
    fn parses_minimal_row() {
        let parsed = rows(
            "3030,Santo António dos Olivais,Coimbra,Coimbra\n",
            RowLayout::default(),
        );
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].line, 1);
        let draft = parsed[0].result.as_ref().unwrap();
        assert_eq!(draft.code, "3030");
        assert_eq!(draft.locality, "Santo António dos Olivais");
        assert_eq!(draft.county, "Coimbra");
        assert_eq!(draft.district, "Coimbra");
        assert_eq!(draft.country, Some(CountryCode::portugal()));
        assert_eq!(draft.latitude, None);
    }

    #[test]
    fn parses_extended_columns() {
        let parsed = rows(
            "1100-148,Lisboa,Lisboa,Lisboa,38.7139,-9.1394,Rua Augusta,LISBOA\n",
            RowLayout::default(),
        );
        let draft = parsed[0].result.as_ref().unwrap();
        assert_eq!(draft.latitude, Some(38.7139));
        assert_eq!(draft.longitude, Some(-9.1394));
        assert_eq!(draft.street.as_deref(), Some("Rua Augusta"));
        assert_eq!(draft.designation.as_deref(), Some("LISBOA"));
    }

    #[test]
    fn pipe_delimited_with_header() {
        let layout = RowLayout::default().with_delimiter(b'|').with_headers(true);
        let parsed = rows(
            "code|locality|county|district\n4000-001|Porto|Porto|Porto\n",
            layout,
        );
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].line, 2);
        assert_eq!(parsed[0].result.as_ref().unwrap().locality, "Porto");
    }

    #[test]
    fn missing_required_field_is_row_error() {
        let parsed = rows("3030,Olivais,,Coimbra\n3000,Sé Nova\n", RowLayout::default());
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].result, Err(RowError::MissingField("county")));
        assert_eq!(parsed[1].result, Err(RowError::MissingField("county")));
        assert_eq!(parsed[1].line, 2);
    }

    #[test]
    fn unparseable_coordinate_is_row_error() {
        let parsed = rows("3030,Olivais,Coimbra,Coimbra,north,-8.4\n", RowLayout::default());
        assert!(matches!(
            &parsed[0].result,
            Err(RowError::InvalidNumber { field: "latitude", value }) if value == "north"
        ));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let parsed = rows(
            "# bundled sample\n\n3030,Olivais,Coimbra,Coimbra\n",
            RowLayout::default(),
        );
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].result.as_ref().unwrap().code, "3030");
    }

    #[test]
    fn bad_row_does_not_stop_iteration() {
        let parsed = rows(
            ",,,\n3030,Olivais,Coimbra,Coimbra\n",
            RowLayout::default(),
        );
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].result.is_err());
        assert!(parsed[1].result.is_ok());
    }
}
