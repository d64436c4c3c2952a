use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use retail_analytics::processor::{
    DimensionTables, FactRow, ProductDim, RetailerDim,
    ranked_aggregator::{RankedAggregator, enrich, group_by_category_and_retailer},
};
use rust_decimal::Decimal;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

const PRODUCTS: u64 = 2_000;
const RETAILERS: u64 = 200;

fn make_dims() -> DimensionTables {
    let mut dims = DimensionTables::new();
    for id in 0..PRODUCTS {
        dims = dims.with_product(ProductDim {
            product_id: id,
            name: format!("Product {}", id),
            brand: None,
            category: Some(format!("C{}", id % 16)),
        });
    }
    for id in 0..RETAILERS {
        dims = dims.with_retailer(RetailerDim {
            retailer_id: id,
            name: format!("Retailer {}", id),
            channel: Some("online".to_string()),
            location: None,
        });
    }
    dims
}

fn make_facts(n: u64) -> Vec<FactRow> {
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n)
        .map(|i| FactRow {
            sale_id: i,
            product_id: (i * 7919) % PRODUCTS,
            retailer_id: (i * 104_729) % RETAILERS,
            date,
            quantity: (i % 13) as i64,
            price: Decimal::new((i % 5000) as i64 + 99, 2),
        })
        .collect()
}

fn bench_top_sellers(c: &mut Criterion) {
    let dims = make_dims();
    let mut group = c.benchmark_group("RankedAggregator");
    group.sample_size(10);

    for &rows in &[100_000u64, 1_000_000] {
        let facts = make_facts(rows);
        group.throughput(Throughput::Elements(rows));

        group.bench_with_input(BenchmarkId::new("group_only", rows), &facts, |b, facts| {
            b.iter(|| group_by_category_and_retailer(enrich(facts, &dims)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("top_serial", rows), &facts, |b, facts| {
            let aggregator = RankedAggregator::new();
            b.iter(|| aggregator.top_selling(facts, &dims).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("top_parallel", rows), &facts, |b, facts| {
            let aggregator = RankedAggregator::new().parallel(true);
            b.iter(|| aggregator.top_selling(facts, &dims).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_top_sellers);
criterion_main!(benches);
