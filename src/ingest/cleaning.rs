use rust_decimal::Decimal;
use std::{collections::HashSet, str::FromStr};
use tracing::{debug, warn};

use crate::{
    ingest::csv_reader::{RawRecord, RawSalesTable},
    processor::{ParseError, ProductId, RetailerId, SaleId},
};

/// Column names of the sales extract
pub mod columns {
    pub const SALE_ID: &str = "SaleID";
    pub const PRODUCT_ID: &str = "ProductID";
    pub const PRODUCT_NAME: &str = "ProductName";
    pub const BRAND: &str = "Brand";
    pub const CATEGORY: &str = "Category";
    pub const RETAILER_ID: &str = "RetailerID";
    pub const RETAILER_NAME: &str = "RetailerName";
    pub const CHANNEL: &str = "Channel";
    pub const LOCATION: &str = "Location";
    pub const QUANTITY: &str = "Quantity";
    pub const PRICE: &str = "Price";
    pub const DATE: &str = "Date";
}

/// Ids a row must carry to be loaded
pub const DEFAULT_ID_FIELDS: [&str; 3] =
    [columns::PRODUCT_ID, columns::SALE_ID, columns::RETAILER_ID];

/// A row after whitespace stripping and per-column cleaning. Empty text is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CleanRecord {
    pub sale_id: Option<SaleId>,
    pub product_id: Option<ProductId>,
    pub retailer_id: Option<RetailerId>,
    pub product_name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub retailer_name: Option<String>,
    pub channel: Option<String>,
    pub location: Option<String>,
    pub quantity: i64,
    pub price: Decimal,
    pub date: Option<String>,
}

/// A cleaned row that carries all three ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRecord {
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub retailer_id: RetailerId,
    pub product_name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub retailer_name: Option<String>,
    pub channel: Option<String>,
    pub location: Option<String>,
    pub quantity: i64,
    pub price: Decimal,
    pub date: Option<String>,
}

#[derive(Debug, Default)]
pub struct CleanOutcome {
    pub records: Vec<CleanRecord>,
    pub rejected: Vec<ParseError>,
    pub duplicates: usize,
}

/// Strips and cleans every row, dropping rows with bad ids and exact duplicates.
///
/// A row is rejected when any of `id_fields` is missing, empty or not all
/// ASCII digits before stripping, when its price cannot be read as a decimal,
/// or when `quantity * price` does not fit in a decimal.
pub fn clean_data<S: AsRef<str>>(table: &RawSalesTable, id_fields: &[S]) -> CleanOutcome {
    let mut outcome = CleanOutcome::default();
    let mut seen: HashSet<CleanRecord> = HashSet::new();

    for (idx, record) in table.records().enumerate() {
        let line = idx + 2;

        if let Err(rejection) = check_id_fields(&record, id_fields, line) {
            warn!(
                line,
                column = %rejection.column,
                value = %rejection.value,
                "row excluded: {}",
                rejection.error.as_deref().unwrap_or_default()
            );
            outcome.rejected.push(rejection);
            continue;
        }

        let cleaned = match clean_record(&record) {
            Ok(cleaned) => cleaned,
            Err(mut rejection) => {
                rejection.row = line;
                warn!(
                    line,
                    value = %rejection.value,
                    "row excluded: {}",
                    rejection.error.as_deref().unwrap_or_default()
                );
                outcome.rejected.push(rejection);
                continue;
            }
        };

        if seen.insert(cleaned.clone()) {
            outcome.records.push(cleaned);
        } else {
            outcome.duplicates += 1;
        }
    }

    debug!(
        kept = outcome.records.len(),
        rejected = outcome.rejected.len(),
        duplicates = outcome.duplicates,
        "cleaning complete"
    );
    outcome
}

fn check_id_fields<S: AsRef<str>>(
    record: &RawRecord<'_>,
    id_fields: &[S],
    line: usize,
) -> Result<(), ParseError> {
    for field in id_fields {
        let field = field.as_ref();
        let value = record.get(field).unwrap_or_default();

        if value.is_empty() {
            return Err(ParseError {
                row: line,
                column: field.to_string(),
                value: value.to_string(),
                error: Some(format!("missing field: {}", field)),
            });
        }
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError {
                row: line,
                column: field.to_string(),
                value: value.to_string(),
                error: Some(format!("invalid {}: {}", field, value)),
            });
        }
    }
    Ok(())
}

fn clean_record(record: &RawRecord<'_>) -> Result<CleanRecord, ParseError> {
    let text = |column: &str| record.get(column).and_then(clean_text);
    let raw_price = record.get(columns::PRICE).unwrap_or_default();
    let price_error = |reason: &str| ParseError {
        row: 0,
        column: columns::PRICE.to_string(),
        value: raw_price.to_string(),
        error: Some(reason.to_string()),
    };

    let quantity = record
        .get(columns::QUANTITY)
        .map(clean_quantity)
        .unwrap_or(0);
    let price = clean_price(raw_price).ok_or_else(|| price_error("not a decimal number"))?;
    if Decimal::from(quantity).checked_mul(price).is_none() {
        return Err(price_error("quantity x price overflows"));
    }

    Ok(CleanRecord {
        sale_id: parse_id(record.get(columns::SALE_ID)),
        product_id: parse_id(record.get(columns::PRODUCT_ID)),
        retailer_id: parse_id(record.get(columns::RETAILER_ID)),
        product_name: text(columns::PRODUCT_NAME),
        brand: text(columns::BRAND),
        category: text(columns::CATEGORY),
        retailer_name: text(columns::RETAILER_NAME),
        channel: text(columns::CHANNEL),
        location: text(columns::LOCATION),
        quantity,
        price,
        date: text(columns::DATE).map(|d| clean_date(&d)),
    })
}

fn parse_id(value: Option<&str>) -> Option<u64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    atoi_simd::parse::<u64>(value.as_bytes()).ok()
}

/// Trims whitespace; empty values become `None`.
pub fn clean_text(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Keeps only digits and `.`, so `"$1,299.50"` reads as `1299.50`.
///
/// An empty result is zero. Returns `None` when the remaining text is
/// not a decimal number (e.g. `"1.2.3"`).
pub fn clean_price(value: &str) -> Option<Decimal> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(&cleaned).ok()
}

/// Normalizes `/` separators to `-`.
pub fn clean_date(value: &str) -> String {
    value.trim().replace('/', "-")
}

/// Integer quantity; negative or unreadable values count as zero.
pub fn clean_quantity(value: &str) -> i64 {
    match atoi_simd::parse::<i64>(value.trim().as_bytes()) {
        Ok(q) if q >= 0 => q,
        _ => 0,
    }
}

/// Keeps rows that carry sale, product and retailer ids.
pub fn validate_data(records: Vec<CleanRecord>) -> Vec<SalesRecord> {
    records
        .into_iter()
        .filter_map(|r| {
            let (Some(sale_id), Some(product_id), Some(retailer_id)) =
                (r.sale_id, r.product_id, r.retailer_id)
            else {
                warn!(record = ?r, "row excluded: missing id field");
                return None;
            };
            Some(SalesRecord {
                sale_id,
                product_id,
                retailer_id,
                product_name: r.product_name,
                brand: r.brand,
                category: r.category,
                retailer_name: r.retailer_name,
                channel: r.channel,
                location: r.location,
                quantity: r.quantity,
                price: r.price,
                date: r.date,
            })
        })
        .collect()
}
