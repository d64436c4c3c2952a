use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

pub mod arrow_export;
pub mod ranked_aggregator;
pub mod sales_reports;
pub mod warehouse;

pub type SaleId = u64;
pub type ProductId = u64;
pub type RetailerId = u64;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Schema/parse error: {0}")]
    Parse(String),

    #[error("Missing header line")]
    MissingHeader,

    #[error("Invalid date '{value}': {source}")]
    InvalidDate {
        value: String,
        source: chrono::ParseError,
    },

    #[error("Data integrity error for sale {sale_id}: {reason}")]
    DataIntegrity { sale_id: SaleId, reason: String },

    #[error("Config error: {0}")]
    Config(String),
}

#[derive(Debug, Default)]
pub struct ParseSummary {
    pub rows_processed: usize,
    pub errors: Vec<ParseError>,
}

#[derive(Debug, Clone)]
pub struct ParseError {
    /// 1-based line number in the source file (header is line 1)
    pub row: usize,
    pub column: String,
    pub value: String,
    pub error: Option<String>,
}

/// One sale event from `sales_fact`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRow {
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub retailer_id: RetailerId,
    pub date: NaiveDate,
    pub quantity: i64,
    pub price: Decimal,
}

impl FactRow {
    /// Line amount, `quantity * price`
    ///
    /// # Errors
    /// Returns [`ProcessorError::DataIntegrity`] when the product does not fit
    /// in a [`Decimal`].
    pub fn amount(&self) -> Result<Decimal, ProcessorError> {
        Decimal::from(self.quantity)
            .checked_mul(self.price)
            .ok_or_else(|| ProcessorError::DataIntegrity {
                sale_id: self.sale_id,
                reason: format!("amount {} x {} overflows", self.quantity, self.price),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDim {
    pub product_id: ProductId,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetailerDim {
    pub retailer_id: RetailerId,
    pub name: String,
    pub channel: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateDim {
    pub date: NaiveDate,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub quarter: u32,
    pub day_of_week: String,
    pub week_of_year: u32,
}

/// Anything that can hand out the fact rows of a snapshot.
pub trait FactSource {
    fn rows(&self) -> impl Iterator<Item = &FactRow>;
}

impl FactSource for [FactRow] {
    fn rows(&self) -> impl Iterator<Item = &FactRow> {
        self.iter()
    }
}

impl FactSource for Vec<FactRow> {
    fn rows(&self) -> impl Iterator<Item = &FactRow> {
        self.iter()
    }
}

/// Dimension lookups used by the joins. A missing id yields `None`, which is
/// how left-join semantics surface to the aggregation code.
pub trait DimensionLookup {
    fn product(&self, id: ProductId) -> Option<&ProductDim>;

    fn retailer(&self, id: RetailerId) -> Option<&RetailerDim>;

    fn date(&self, _date: NaiveDate) -> Option<&DateDim> {
        None
    }
}

/// Plain in-memory lookup tables
#[derive(Debug, Default, Clone)]
pub struct DimensionTables {
    pub products: HashMap<ProductId, ProductDim>,
    pub retailers: HashMap<RetailerId, RetailerDim>,
    pub dates: HashMap<NaiveDate, DateDim>,
}

impl DimensionTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product: ProductDim) -> Self {
        self.products.insert(product.product_id, product);
        self
    }

    pub fn with_retailer(mut self, retailer: RetailerDim) -> Self {
        self.retailers.insert(retailer.retailer_id, retailer);
        self
    }

    pub fn with_date(mut self, date: DateDim) -> Self {
        self.dates.insert(date.date, date);
        self
    }
}

impl DimensionLookup for DimensionTables {
    fn product(&self, id: ProductId) -> Option<&ProductDim> {
        self.products.get(&id)
    }

    fn retailer(&self, id: RetailerId) -> Option<&RetailerDim> {
        self.retailers.get(&id)
    }

    fn date(&self, date: NaiveDate) -> Option<&DateDim> {
        self.dates.get(&date)
    }
}

/// Final row of the top-seller report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopSeller {
    pub retailer_id: RetailerId,
    pub category: String,
    pub product_id: ProductId,
    pub name: String,
    pub total_sales: Decimal,
}

/// Total sales for one retailer channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSales {
    pub channel: String,
    pub total_sales: Decimal,
}

/// Total sales for one calendar month
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlySales {
    pub year: i32,
    pub month: u32,
    pub total_sales: Decimal,
}

/// Whether fact rows are checked for negative amounts before aggregating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Validation {
    /// Trust upstream data
    #[default]
    Lenient,
    /// Reject negative quantity or price with [`ProcessorError::DataIntegrity`]
    Strict,
}
