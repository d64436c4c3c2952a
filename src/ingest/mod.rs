//! Sales extract ingestion: CSV reading, cleaning, validation and the
//! star-schema split.

use std::path::Path;
use tracing::info;

use crate::processor::{ParseError, ProcessorError};

pub mod cleaning;
pub mod csv_reader;
pub mod star_schema;

use cleaning::{clean_data, validate_data};
use csv_reader::SalesCsvReader;
use star_schema::StarSchema;

/// What happened to the rows of one extract
#[derive(Debug, Default)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub duplicates: usize,
    /// Malformed lines and rows rejected during cleaning
    pub errors: Vec<ParseError>,
}

/// Loads `path` and runs it through cleaning, validation and the star-schema split.
pub fn load_star_schema<S: AsRef<str>>(
    path: &Path,
    id_fields: &[S],
) -> Result<(StarSchema, IngestReport), ProcessorError> {
    let (table, summary) = SalesCsvReader::new().load(path)?;
    let cleaned = clean_data(&table, id_fields);
    let records = validate_data(cleaned.records);
    let schema = StarSchema::from_records(&records);

    let mut errors = summary.errors;
    errors.extend(cleaned.rejected);

    let report = IngestReport {
        rows_read: summary.rows_processed,
        rows_kept: records.len(),
        duplicates: cleaned.duplicates,
        errors,
    };

    info!(
        rows_read = report.rows_read,
        rows_kept = report.rows_kept,
        facts = schema.facts().len(),
        "ingest complete"
    );
    Ok((schema, report))
}
