use memchr::memchr_iter;
use memmap2::Mmap;
use std::{fs::File, path::Path};
use tracing::{info, warn};

use crate::processor::{ParseError, ParseSummary, ProcessorError};

/// Raw sales extract: header names plus one string per field, untouched.
#[derive(Debug, Clone, Default)]
pub struct RawSalesTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// One row of a [`RawSalesTable`], addressed by column name
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    headers: &'a [String],
    values: &'a [String],
}

impl<'a> RawRecord<'a> {
    /// Value of `column`, or `None` if the extract has no such column
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.values.get(idx).map(String::as_str)
    }
}

impl RawSalesTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, values: Vec<String>) -> Result<(), ProcessorError> {
        if values.len() != self.headers.len() {
            return Err(ProcessorError::Parse(format!(
                "Expected {} fields, got {}",
                self.headers.len(),
                values.len()
            )));
        }
        self.rows.push(values);
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn records(&self) -> impl Iterator<Item = RawRecord<'_>> {
        self.rows.iter().map(|values| RawRecord {
            headers: &self.headers,
            values,
        })
    }
}

/// Reads comma-separated sales extracts from disk.
///
/// Fields are split on bare commas; quoted fields are not supported.
#[derive(Debug, Default)]
pub struct SalesCsvReader;

impl SalesCsvReader {
    pub fn new() -> Self {
        SalesCsvReader
    }

    /// Memory-maps `path` and splits it into a [`RawSalesTable`].
    ///
    /// Lines whose field count differs from the header are skipped and
    /// reported in the returned [`ParseSummary`].
    ///
    /// # Errors
    /// Returns a [`ProcessorError`] if:
    /// - the file cannot be opened or mapped
    /// - the file has no header line
    pub fn load(&self, path: &Path) -> Result<(RawSalesTable, ParseSummary), ProcessorError> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(ProcessorError::MissingHeader);
        }
        let mmap = unsafe { Mmap::map(&file)? };
        let (table, summary) = Self::parse(&mmap[..])?;

        info!(
            path = %path.display(),
            rows = summary.rows_processed,
            errors = summary.errors.len(),
            "sales extract loaded"
        );
        Ok((table, summary))
    }

    /// Parses an in-memory CSV buffer.
    pub fn parse(buf: &[u8]) -> Result<(RawSalesTable, ParseSummary), ProcessorError> {
        let header_end = memchr::memchr(b'\n', buf).unwrap_or(buf.len());
        let header_line = trim_line(&buf[..header_end]);
        if header_line.is_empty() {
            return Err(ProcessorError::MissingHeader);
        }

        let headers = split_fields(header_line)
            .map(|f| std::str::from_utf8(f).map(|s| s.trim().to_string()))
            .collect::<Result<Vec<String>, _>>()?;
        let num_cols = headers.len();

        let mut table = RawSalesTable::new(headers);
        let mut summary = ParseSummary::default();

        let data = buf.get(header_end + 1..).unwrap_or(&[]);
        let mut start = 0;
        let mut line_no = 1;
        let line_ends = memchr_iter(b'\n', data).chain(std::iter::once(data.len()));

        for end in line_ends {
            let line = trim_line(&data[start..end]);
            start = end + 1;
            line_no += 1;

            if line.is_empty() {
                continue;
            }

            let fields = split_fields(line)
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect::<Vec<String>>();

            if fields.len() != num_cols {
                warn!(line = line_no, fields = fields.len(), "field count mismatch");
                summary.errors.push(ParseError {
                    row: line_no,
                    column: "".to_string(),
                    value: String::from_utf8_lossy(line).into_owned(),
                    error: Some(format!(
                        "Expected {} fields, got {}",
                        num_cols,
                        fields.len()
                    )),
                });
                continue;
            }

            table.push_row(fields)?;
            summary.rows_processed += 1;
        }

        Ok((table, summary))
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn split_fields(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut field_start = 0;
    memchr_iter(b',', line)
        .chain(std::iter::once(line.len()))
        .map(move |comma_pos| {
            let field = &line[field_start..comma_pos];
            field_start = comma_pos + 1;
            field
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_and_headers() {
        let csv = b"SaleID,ProductID,Price\r\n1,10,$5.00\r\n2,11,3\r\n";
        let (table, summary) = SalesCsvReader::parse(csv).unwrap();

        assert_eq!(table.headers(), &["SaleID", "ProductID", "Price"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(summary.rows_processed, 2);
        assert!(summary.errors.is_empty());

        let first = table.records().next().unwrap();
        assert_eq!(first.get("Price"), Some("$5.00"));
        assert_eq!(first.get("Brand"), None);
    }

    #[test]
    fn test_last_line_without_newline() {
        let (table, _) = SalesCsvReader::parse(b"a,b\n1,2\n3,4").unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_field_count_mismatch_is_reported() {
        let (table, summary) = SalesCsvReader::parse(b"a,b\n1,2\n1,2,3\n\n4,5\n").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].row, 3);
    }

    #[test]
    fn test_empty_fields_are_kept() {
        let (table, _) = SalesCsvReader::parse(b"a,b,c\n,,x\n").unwrap();
        let record = table.records().next().unwrap();
        assert_eq!(record.get("a"), Some(""));
        assert_eq!(record.get("c"), Some("x"));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            SalesCsvReader::parse(b"\n1,2\n"),
            Err(ProcessorError::MissingHeader)
        ));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "id,value\n1,10\n2,20\n").unwrap();

        let (table, summary) = SalesCsvReader::new().load(tmp.path()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(summary.rows_processed, 2);
    }
}
