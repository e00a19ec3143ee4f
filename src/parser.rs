//! Delimited-text parser for the upstream CSV resources.

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use crate::error::ParseError;

/// Field delimiter used by both upstream datasets.
pub const DEFAULT_DELIMITER: u8 = b';';

/// Rows of a parsed resource, with columns addressed by header name.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub dataset: String,
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
    /// Lines the reader rejected (wrong field count and similar).
    pub skipped: usize,
}

impl RawTable {
    /// Returns the index of the column named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingColumn`] when the upstream schema no
    /// longer carries the column.
    pub fn column(&self, name: &str) -> Result<usize, ParseError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ParseError::MissingColumn {
                dataset: self.dataset.clone(),
                column: name.to_string(),
            })
    }

    /// Resolves several columns at once, failing on the first missing one.
    pub fn require<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N], ParseError> {
        let mut indices = [0; N];
        for (slot, name) in indices.iter_mut().zip(names) {
            *slot = self.column(name)?;
        }
        Ok(indices)
    }

    /// Number of lines read, accepted or not.
    pub fn lines_read(&self) -> usize {
        self.rows.len() + self.skipped
    }
}

/// Parses `text` into a [`RawTable`], skipping malformed lines.
///
/// # Errors
///
/// Returns [`ParseError::NoHeader`] if the text has no header row.
pub fn parse_table(text: &str, delimiter: u8, dataset: &str) -> Result<RawTable, ParseError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(ParseError::NoHeader {
            dataset: dataset.to_string(),
        });
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.records() {
        match result {
            Ok(record) => rows.push(record),
            Err(e) => {
                skipped += 1;
                debug!(dataset, error = %e, "Skipping malformed line");
            }
        }
    }

    if skipped > 0 {
        warn!(dataset, skipped, "Malformed lines skipped");
    }
    debug!(dataset, rows = rows.len(), "Table parsed");

    Ok(RawTable {
        dataset: dataset.to_string(),
        headers,
        rows,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_semicolon_table() {
        let table = parse_table("UF;MUNICIPIO\nRJ;NITEROI\nSP;SANTOS\n", b';', "postos").unwrap();
        assert_eq!(table.headers.len(), 2);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.skipped, 0);
        assert_eq!(&table.rows[1][1], "SANTOS");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let text = "Ano;Agente\n2020;A\n2020;B;extra\n2021\n2021;C\n";
        let table = parse_table(text, b';', "vendas").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.skipped, 2);
        assert_eq!(table.lines_read(), 4);
    }

    #[test]
    fn test_headers_are_trimmed() {
        let table = parse_table(" Ano ; UF Destino \n2020;RJ\n", b';', "vendas").unwrap();
        assert_eq!(table.column("UF Destino").unwrap(), 1);
    }

    #[test]
    fn test_empty_text_has_no_header() {
        let err = parse_table("", b';', "vendas").unwrap_err();
        assert!(matches!(err, ParseError::NoHeader { .. }));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let table = parse_table("UF;MUNICIPIO\n", b';', "postos").unwrap();
        let err = table.require(["UF", "BANDEIRA"]).unwrap_err();
        match err {
            ParseError::MissingColumn { dataset, column } => {
                assert_eq!(dataset, "postos");
                assert_eq!(column, "BANDEIRA");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_require_returns_indices_in_order() {
        let table = parse_table("A;B;C\n", b';', "t").unwrap();
        assert_eq!(table.require(["C", "A"]).unwrap(), [2, 0]);
    }
}
