//! # retail-analytics
//!
//! Loads a flat retail sales extract into a small star schema (`product_dim`,
//! `retailer_dim`, `date_dim`, `sales_fact`) and runs three reports over it:
//!
//! - total sales per retailer channel
//! - total sales per calendar month
//! - the top-selling product per category per retailer
//!
//! # Features
//!
//! - **Memory-mapped CSV loading** split with `memchr`
//! - **Cleaning**: id checks, price/quantity/date normalization, de-duplication
//! - **Exact money arithmetic** with `rust_decimal`
//! - **Dense ranking** within `(category, retailer)` partitions; tied winners
//!   are all reported
//! - **Parallel ranking** across partitions with Rayon
//! - **Cached reports** in an LRU keyed by report
//! - **Arrow export** of top-seller rows
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use retail_analytics::processor::{
//!     DimensionTables, FactRow, ProductDim, RetailerDim,
//!     ranked_aggregator::top_selling_by_category_and_retailer,
//! };
//! use rust_decimal::Decimal;
//!
//! let lookup = DimensionTables::new()
//!     .with_product(ProductDim {
//!         product_id: 1,
//!         name: "A".into(),
//!         brand: None,
//!         category: Some("X".into()),
//!     })
//!     .with_retailer(RetailerDim {
//!         retailer_id: 1,
//!         name: "Shop".into(),
//!         channel: Some("online".into()),
//!         location: None,
//!     });
//! let facts = vec![FactRow {
//!     sale_id: 1,
//!     product_id: 1,
//!     retailer_id: 1,
//!     date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     quantity: 2,
//!     price: Decimal::from(10),
//! }];
//!
//! let top = top_selling_by_category_and_retailer(&facts, &lookup)?;
//! assert_eq!(top[0].total_sales, Decimal::from(20));
//! # Ok::<(), retail_analytics::processor::ProcessorError>(())
//! ```

pub mod config;
pub mod ingest;
pub mod processor;
