use chrono::{Datelike, NaiveDate};
use std::{
    collections::HashSet,
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::{debug, warn};

use crate::{
    ingest::cleaning::SalesRecord,
    processor::{
        DateDim, DimensionLookup, DimensionTables, FactRow, FactSource, ProcessorError, ProductDim,
        ProductId, RetailerDim, RetailerId, SaleId,
    },
};

static NEXT_SNAPSHOT_ID: AtomicU64 = AtomicU64::new(1);

/// `product_dim`, `retailer_dim`, `date_dim` and `sales_fact` built from one extract.
///
/// A schema is immutable once built. Each one gets a process-unique
/// [`snapshot_id`](Self::snapshot_id); clones share it, since they hold the same rows.
#[derive(Debug, Clone)]
pub struct StarSchema {
    snapshot_id: u64,
    dimensions: DimensionTables,
    facts: Vec<FactRow>,
}

impl StarSchema {
    pub fn new(dimensions: DimensionTables, facts: Vec<FactRow>) -> Self {
        Self {
            snapshot_id: NEXT_SNAPSHOT_ID.fetch_add(1, Ordering::Relaxed),
            dimensions,
            facts,
        }
    }

    /// Splits cleaned records into dimension and fact tables.
    ///
    /// The first record wins for each product, retailer, date and sale id.
    /// Products and retailers need a name to enter their dimension. A record
    /// whose date is missing or not `YYYY-MM-DD` adds no date and no fact.
    pub fn from_records(records: &[SalesRecord]) -> Self {
        let mut dims = DimensionTables::new();
        let mut facts: Vec<FactRow> = Vec::with_capacity(records.len());
        let mut seen_sales: HashSet<SaleId> = HashSet::new();
        let mut bad_dates = 0usize;

        for record in records {
            if let Some(name) = &record.product_name {
                dims.products
                    .entry(record.product_id)
                    .or_insert_with(|| ProductDim {
                        product_id: record.product_id,
                        name: name.clone(),
                        brand: record.brand.clone(),
                        category: record.category.clone(),
                    });
            }

            if let Some(name) = &record.retailer_name {
                dims.retailers
                    .entry(record.retailer_id)
                    .or_insert_with(|| RetailerDim {
                        retailer_id: record.retailer_id,
                        name: name.clone(),
                        channel: record.channel.clone(),
                        location: record.location.clone(),
                    });
            }

            let date = match record.date.as_deref().map(parse_date) {
                Some(Ok(date)) => date,
                Some(Err(e)) => {
                    warn!(sale_id = record.sale_id, error = %e, "fact excluded: bad date");
                    bad_dates += 1;
                    continue;
                }
                None => {
                    warn!(sale_id = record.sale_id, "fact excluded: missing date");
                    bad_dates += 1;
                    continue;
                }
            };
            dims.dates.entry(date).or_insert_with(|| date_dim_for(date));

            if seen_sales.insert(record.sale_id) {
                facts.push(FactRow {
                    sale_id: record.sale_id,
                    product_id: record.product_id,
                    retailer_id: record.retailer_id,
                    date,
                    quantity: record.quantity,
                    price: record.price,
                });
            }
        }

        debug!(
            products = dims.products.len(),
            retailers = dims.retailers.len(),
            dates = dims.dates.len(),
            facts = facts.len(),
            bad_dates,
            "star schema built"
        );
        Self::new(dims, facts)
    }

    /// Identifies this snapshot in a shared report cache
    pub fn snapshot_id(&self) -> u64 {
        self.snapshot_id
    }

    pub fn facts(&self) -> &[FactRow] {
        &self.facts
    }

    pub fn dimensions(&self) -> &DimensionTables {
        &self.dimensions
    }

    pub fn product_count(&self) -> usize {
        self.dimensions.products.len()
    }

    pub fn retailer_count(&self) -> usize {
        self.dimensions.retailers.len()
    }

    pub fn date_count(&self) -> usize {
        self.dimensions.dates.len()
    }
}

impl Default for StarSchema {
    fn default() -> Self {
        Self::new(DimensionTables::default(), Vec::new())
    }
}

impl FactSource for StarSchema {
    fn rows(&self) -> impl Iterator<Item = &FactRow> {
        self.facts.iter()
    }
}

impl DimensionLookup for StarSchema {
    fn product(&self, id: ProductId) -> Option<&ProductDim> {
        self.dimensions.product(id)
    }

    fn retailer(&self, id: RetailerId) -> Option<&RetailerDim> {
        self.dimensions.retailer(id)
    }

    fn date(&self, date: NaiveDate) -> Option<&DateDim> {
        self.dimensions.date(date)
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ProcessorError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| ProcessorError::InvalidDate {
        value: value.to_string(),
        source,
    })
}

/// Calendar attributes of `date`; the week is the ISO week number.
pub fn date_dim_for(date: NaiveDate) -> DateDim {
    DateDim {
        date,
        day: date.day(),
        month: date.month(),
        year: date.year(),
        quarter: (date.month() - 1) / 3 + 1,
        day_of_week: date.format("%A").to_string(),
        week_of_year: date.iso_week().week(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record(sale_id: u64, product_id: u64, retailer_id: u64, date: Option<&str>) -> SalesRecord {
        SalesRecord {
            sale_id,
            product_id,
            retailer_id,
            product_name: Some(format!("Product {}", product_id)),
            brand: None,
            category: Some("Tools".to_string()),
            retailer_name: Some(format!("Retailer {}", retailer_id)),
            channel: Some("online".to_string()),
            location: None,
            quantity: 1,
            price: Decimal::from(3),
            date: date.map(str::to_string),
        }
    }

    #[test]
    fn test_date_dim_attributes() {
        let d = date_dim_for(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(d.day, 1);
        assert_eq!(d.month, 1);
        assert_eq!(d.year, 2024);
        assert_eq!(d.quarter, 1);
        assert_eq!(d.day_of_week, "Monday");
        assert_eq!(d.week_of_year, 1);

        let d = date_dim_for(NaiveDate::from_ymd_opt(2023, 11, 30).unwrap());
        assert_eq!(d.quarter, 4);
        assert_eq!(d.day_of_week, "Thursday");
        assert_eq!(d.week_of_year, 48);
    }

    #[test]
    fn test_first_record_wins() {
        let mut second = record(1, 10, 100, Some("2024-01-02"));
        second.product_name = Some("Renamed".to_string());
        second.quantity = 50;

        let schema = StarSchema::from_records(&[record(1, 10, 100, Some("2024-01-01")), second]);

        assert_eq!(schema.facts().len(), 1);
        assert_eq!(schema.facts()[0].quantity, 1);
        assert_eq!(schema.product(10).unwrap().name, "Product 10");
        assert_eq!(schema.date_count(), 2);
    }

    #[test]
    fn test_nameless_product_has_no_dimension_row() {
        let mut r = record(1, 10, 100, Some("2024-01-01"));
        r.product_name = None;
        let schema = StarSchema::from_records(&[r]);

        assert_eq!(schema.product_count(), 0);
        assert_eq!(schema.retailer_count(), 1);
        assert_eq!(schema.facts().len(), 1);
    }

    #[test]
    fn test_bad_dates_drop_the_fact() {
        let schema = StarSchema::from_records(&[
            record(1, 10, 100, Some("01-05-2024")),
            record(2, 10, 100, None),
            record(3, 10, 100, Some("2024-02-29")),
        ]);

        assert_eq!(schema.facts().len(), 1);
        assert_eq!(schema.facts()[0].sale_id, 3);
        assert_eq!(schema.date_count(), 1);
        assert!(matches!(
            parse_date("2023-02-29"),
            Err(ProcessorError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_snapshot_ids_are_unique_per_build() {
        let records = [record(1, 10, 100, Some("2024-01-01"))];
        let a = StarSchema::from_records(&records);
        let b = StarSchema::from_records(&records);

        assert_ne!(a.snapshot_id(), b.snapshot_id());
        assert_eq!(a.clone().snapshot_id(), a.snapshot_id());
    }
}
