use std::{path::PathBuf, rc::Rc};

use retail_analytics::{
    config::AnalyticsConfig,
    ingest::load_star_schema,
    processor::arrow_export::top_sellers_to_arrow,
};

fn sample_csv_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("sample_sales.csv")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AnalyticsConfig::default();
    let (schema, ingest) = load_star_schema(&sample_csv_path(), &config.id_fields)?;
    println!(
        "Loaded {} facts ({} rows rejected, {} duplicates)",
        schema.facts().len(),
        ingest.errors.len(),
        ingest.duplicates
    );

    let warehouse = Rc::new(schema).warehouse().with_aggregator(config.aggregator());
    let top = warehouse.top_sellers()?;
    for row in &top {
        println!(
            "Retailer {} / {} => {} ({}) {}",
            row.retailer_id, row.category, row.name, row.product_id, row.total_sales
        );
    }

    let (arrow_schema, chunk) = top_sellers_to_arrow(&top)?;
    println!(
        "Arrow export: {} columns, {} rows",
        arrow_schema.fields.len(),
        chunk.len()
    );

    Ok(())
}
