use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::{path::PathBuf, rc::Rc};
use tracing::{info, warn};

use retail_analytics::{
    config::AnalyticsConfig,
    ingest::load_star_schema,
    processor::warehouse::ReportCache,
};

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Report {
    /// Total sales per retailer channel
    Channel,
    /// Total sales per calendar month
    Month,
    /// Top-selling product per category per retailer
    TopSellers,
    All,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sales extract (CSV)
    #[arg(short, long)]
    input: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report to print
    #[arg(short, long, value_enum, default_value_t = Report::All)]
    report: Report,

    /// Log level, overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Fail on negative quantity or price
    #[arg(long)]
    strict: bool,

    /// Rank partitions on a single thread
    #[arg(long)]
    serial: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AnalyticsConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalyticsConfig::default(),
    };
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    config.strict_validation |= args.strict;
    config.parallel_ranking &= !args.serial;
    config.validate()?;

    init_logging(&config.log_level);

    let (schema, ingest) = load_star_schema(&args.input, &config.id_fields)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    info!(
        products = schema.product_count(),
        retailers = schema.retailer_count(),
        dates = schema.date_count(),
        facts = schema.facts().len(),
        "star schema ready"
    );
    if !ingest.errors.is_empty() {
        warn!(
            rejected = ingest.errors.len(),
            duplicates = ingest.duplicates,
            "some rows were not loaded"
        );
    }

    let cache = Rc::new(ReportCache::with_capacity(config.cache_capacity()?));
    let warehouse = Rc::new(schema)
        .warehouse_with_cache(&cache)
        .with_aggregator(config.aggregator());

    if matches!(args.report, Report::Channel | Report::All) {
        println!("== Sales by channel");
        for row in warehouse.sales_by_channel()? {
            println!("{:<20} {:>14}", row.channel, row.total_sales);
        }
    }

    if matches!(args.report, Report::Month | Report::All) {
        println!("== Sales by month");
        for row in warehouse.sales_by_month()? {
            println!("{:04}-{:02} {:>14}", row.year, row.month, row.total_sales);
        }
    }

    if matches!(args.report, Report::TopSellers | Report::All) {
        println!("== Top sellers by category and retailer");
        for row in warehouse.top_sellers()? {
            println!(
                "{:>8} {:<16} {:>8} {:<24} {:>14}",
                row.retailer_id, row.category, row.product_id, row.name, row.total_sales
            );
        }
    }

    Ok(())
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
