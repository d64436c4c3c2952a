use chrono::{Duration, NaiveDate};
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};

const CATEGORIES: [&str; 4] = ["Electronics", "Grocery", "Toys", "Garden"];
const CHANNELS: [&str; 3] = ["online", "store", "wholesale"];
const LOCATIONS: [&str; 6] = ["US", "EU", "ASIA", "AFRICA", "AUSTRALIA", ""];

fn main() -> std::io::Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "data/sales_1m.csv".to_string());
    let rows: u64 = args.next().and_then(|n| n.parse().ok()).unwrap_or(1_000_000);

    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "SaleID,ProductID,ProductName,Brand,Category,RetailerID,RetailerName,Channel,Location,Quantity,Price,Date"
    )?;

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let mut rng = rand::rng();
    for sale_id in 1..=rows {
        let product_id = rng.random_range(1..=500u64);
        let retailer_id = rng.random_range(1..=40u64);
        let date = start + Duration::days(rng.random_range(0..366));
        let cents: u32 = rng.random_range(99..50_000);

        writeln!(
            writer,
            "{},{},Product {},Brand {},{},{},Retailer {},{},{},{},${}.{:02},{}",
            sale_id,
            product_id,
            product_id,
            product_id % 37,
            CATEGORIES[(product_id % 4) as usize],
            retailer_id,
            retailer_id,
            CHANNELS[(retailer_id % 3) as usize],
            LOCATIONS[(retailer_id % 6) as usize],
            rng.random_range(0..20),
            cents / 100,
            cents % 100,
            date.format("%Y/%m/%d"),
        )?;
    }
    writer.flush()?;

    println!("Sample sales CSV generated: {}", path);
    Ok(())
}
