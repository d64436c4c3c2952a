use std::{io::Write, rc::Rc};

use rust_decimal::Decimal;
use tempfile::NamedTempFile;

use retail_analytics::{
    config::AnalyticsConfig,
    ingest::load_star_schema,
    processor::{
        ProcessorError, Validation,
        arrow_export::top_sellers_to_arrow,
        ranked_aggregator::{RankedAggregator, top_selling_by_category_and_retailer},
        warehouse::ReportCache,
    },
};

const SALES_CSV: &str = "\
SaleID,ProductID,ProductName,Brand,Category,RetailerID,RetailerName,Channel,Location,Quantity,Price,Date
1,101,Espresso Maker,Brewline,Kitchen,1,Corner Shop,store,Lyon,2,$89.90,2024/01/05
2,102,Milk Frother,Brewline,Kitchen,1,Corner Shop,store,Lyon,5,$24.99,2024-01-07
3,103,Garden Hose,GreenCo,Garden,1,Corner Shop,store,Lyon,3,$19.50,2024-02-11
4,101,Espresso Maker,Brewline,Kitchen,2,WebMart,online,,1,$89.90,2024-02-14
5,104,Chef Knife,Edge,Kitchen,2,WebMart,online,,4,$45.00,2024-02-15
6,105,Cutting Board,Edge,Kitchen,2,WebMart,online,,9,$20.00,2024-03-01
7,103,Garden Hose,GreenCo,Garden,2,WebMart,online,,2,$19.50,2024-03-02
8,106,Rake,GreenCo,Garden,2,WebMart,online,,3,$13.00,2024-03-03
9,,Broken Row,,Kitchen,1,Corner Shop,store,Lyon,1,$1.00,2024-03-04
10,107,Mystery Item,,,3,Pop-up,,,-2,abc,2024-03-05
10,107,Mystery Item,,,3,Pop-up,,,-2,abc,2024-03-05
";

fn write_csv(content: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "{}", content).unwrap();
    tmp
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn test_ingest_counts() {
    let tmp = write_csv(SALES_CSV);
    let config = AnalyticsConfig::default();
    let (schema, report) = load_star_schema(tmp.path(), &config.id_fields).unwrap();

    assert_eq!(report.rows_read, 11);
    assert_eq!(report.rows_kept, 9);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(schema.facts().len(), 9);
    assert_eq!(schema.product_count(), 7);
    assert_eq!(schema.retailer_count(), 3);
}

#[test]
fn test_top_sellers_include_ties() {
    let tmp = write_csv(SALES_CSV);
    let (schema, _) = load_star_schema(tmp.path(), &AnalyticsConfig::default().id_fields).unwrap();

    let top = top_selling_by_category_and_retailer(&schema, &schema).unwrap();
    let rows: Vec<(u64, &str, u64, Decimal)> = top
        .iter()
        .map(|t| (t.retailer_id, t.category.as_str(), t.product_id, t.total_sales))
        .collect();

    assert_eq!(
        rows,
        vec![
            (1, "Garden", 103, dec("58.50")),
            (1, "Kitchen", 101, dec("179.80")),
            (2, "Garden", 103, dec("39.00")),
            (2, "Garden", 106, dec("39.00")),
            (2, "Kitchen", 104, dec("180.00")),
            (2, "Kitchen", 105, dec("180.00")),
        ]
    );
}

#[test]
fn test_warehouse_reports() {
    let tmp = write_csv(SALES_CSV);
    let config = AnalyticsConfig::default();
    let (schema, _) = load_star_schema(tmp.path(), &config.id_fields).unwrap();
    let schema = Rc::new(schema);
    let cache = Rc::new(ReportCache::with_capacity(config.cache_capacity().unwrap()));
    let warehouse = schema
        .warehouse_with_cache(&cache)
        .with_aggregator(config.aggregator());

    let channels: Vec<(String, Decimal)> = warehouse
        .sales_by_channel()
        .unwrap()
        .into_iter()
        .map(|c| (c.channel, c.total_sales))
        .collect();
    assert_eq!(
        channels,
        vec![
            ("online".to_string(), dec("527.90")),
            ("store".to_string(), dec("363.25")),
        ]
    );

    let months: Vec<(i32, u32, Decimal)> = warehouse
        .sales_by_month()
        .unwrap()
        .into_iter()
        .map(|m| (m.year, m.month, m.total_sales))
        .collect();
    assert_eq!(
        months,
        vec![
            (2024, 1, dec("304.75")),
            (2024, 2, dec("328.40")),
            (2024, 3, dec("258.00")),
        ]
    );

    let top = warehouse.top_sellers().unwrap();
    assert_eq!(top, schema.warehouse().top_sellers().unwrap());
    assert_eq!(cache.len(), 3);

    let (arrow_schema, chunk) = top_sellers_to_arrow(&top).unwrap();
    assert_eq!(arrow_schema.fields.len(), 5);
    assert_eq!(chunk.len(), top.len());
}

#[test]
fn test_strict_validation_on_loaded_data() {
    // quantities are clamped to zero while cleaning, so strict mode passes
    let tmp = write_csv(SALES_CSV);
    let (schema, _) = load_star_schema(tmp.path(), &AnalyticsConfig::default().id_fields).unwrap();
    let strict = RankedAggregator::new().validation(Validation::Strict);
    assert!(strict.top_selling(&schema, &schema).is_ok());
}

#[test]
fn test_header_only_file() {
    let tmp = write_csv("SaleID,ProductID,RetailerID\n");
    let (schema, report) =
        load_star_schema(tmp.path(), &AnalyticsConfig::default().id_fields).unwrap();
    assert_eq!(report.rows_read, 0);
    assert!(top_selling_by_category_and_retailer(&schema, &schema).unwrap().is_empty());
}

#[test]
fn test_empty_file_is_an_error() {
    let tmp = write_csv("");
    let result = load_star_schema(tmp.path(), &AnalyticsConfig::default().id_fields);
    assert!(matches!(result, Err(ProcessorError::MissingHeader)));
}

#[test]
fn test_oversized_amounts_do_not_panic() {
    let max = Decimal::MAX;
    let csv = format!(
        "SaleID,ProductID,ProductName,Brand,Category,RetailerID,RetailerName,Channel,Location,Quantity,Price,Date\n\
         1,101,Vault,,Safes,1,Bank,store,,2,{max},2024-01-01\n\
         2,101,Vault,,Safes,1,Bank,store,,1,{max},2024-01-02\n\
         3,101,Vault,,Safes,1,Bank,store,,1,{max},2024-01-03\n"
    );
    let tmp = write_csv(&csv);
    let (schema, report) =
        load_star_schema(tmp.path(), &AnalyticsConfig::default().id_fields).unwrap();

    // the first row's line amount cannot be represented
    assert_eq!(report.rows_kept, 2);
    assert_eq!(report.errors.len(), 1);

    let schema = Rc::new(schema);
    assert!(matches!(
        schema.warehouse().top_sellers(),
        Err(ProcessorError::DataIntegrity { sale_id: 3, .. })
    ));
    assert!(matches!(
        schema.warehouse().sales_by_month(),
        Err(ProcessorError::DataIntegrity { sale_id: 3, .. })
    ));
}
