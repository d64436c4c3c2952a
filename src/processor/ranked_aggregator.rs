use rayon::prelude::*;
use rust_decimal::Decimal;
use std::{collections::HashMap, hash::Hash};
use tracing::debug;

use crate::processor::{
    DateDim, DimensionLookup, FactRow, FactSource, ProcessorError, ProductDim, ProductId,
    RetailerDim, RetailerId, TopSeller, Validation,
};

/// A fact row with its dimension rows attached. Unmatched dimensions are
/// `None`, as with a SQL left join.
#[derive(Debug, Clone, Copy)]
pub struct EnrichedRow<'a> {
    pub fact: &'a FactRow,
    pub product: Option<&'a ProductDim>,
    pub retailer: Option<&'a RetailerDim>,
    pub date: Option<&'a DateDim>,
}

impl<'a> EnrichedRow<'a> {
    pub fn category(&self) -> Option<&'a str> {
        self.product.and_then(|p| p.category.as_deref())
    }

    /// Retailer id as seen through the join: `None` when the retailer is unknown
    pub fn retailer_id(&self) -> Option<RetailerId> {
        self.retailer.map(|r| r.retailer_id)
    }

    pub fn channel(&self) -> Option<&'a str> {
        self.retailer.and_then(|r| r.channel.as_deref())
    }

    /// `(category, retailer_id)`, or `None` if either half is null
    pub fn partition_key(&self) -> Option<(&'a str, RetailerId)> {
        Some((self.category()?, self.retailer_id()?))
    }

    pub fn amount(&self) -> Result<Decimal, ProcessorError> {
        self.fact.amount()
    }
}

/// Partition of the top-seller ranking
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    pub category: String,
    pub retailer_id: RetailerId,
}

/// Summed sales of one product inside one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAggregate {
    pub partition: PartitionKey,
    pub product_id: ProductId,
    pub name: String,
    pub total_sales: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedAggregate {
    pub aggregate: GroupAggregate,
    pub rank: u32,
}

/// Joins every fact row against the product, retailer and date dimensions.
///
/// Lazy: nothing is resolved until the iterator is driven.
pub fn enrich<'a, S, L>(facts: &'a S, lookup: &'a L) -> impl Iterator<Item = EnrichedRow<'a>>
where
    S: FactSource + ?Sized,
    L: DimensionLookup + ?Sized,
{
    facts.rows().map(move |fact| EnrichedRow {
        fact,
        product: lookup.product(fact.product_id),
        retailer: lookup.retailer(fact.retailer_id),
        date: lookup.date(fact.date),
    })
}

/// Sums `quantity * price` per `(partition, entity)`.
///
/// Rows for which either extractor returns `None` are skipped: a null
/// grouping key cannot form a group.
///
/// # Errors
/// Returns [`ProcessorError::DataIntegrity`] naming the first sale whose
/// amount, or whose addition to its group total, overflows a [`Decimal`].
pub fn grouped_sum<'a, I, P, E, FP, FE>(
    rows: I,
    partition: FP,
    entity: FE,
) -> Result<HashMap<(P, E), Decimal>, ProcessorError>
where
    I: IntoIterator<Item = EnrichedRow<'a>>,
    P: Eq + Hash,
    E: Eq + Hash,
    FP: Fn(&EnrichedRow<'a>) -> Option<P>,
    FE: Fn(&EnrichedRow<'a>) -> Option<E>,
{
    let mut sums: HashMap<(P, E), Decimal> = HashMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let (Some(p), Some(e)) = (partition(&row), entity(&row)) else {
            skipped += 1;
            continue;
        };
        let amount = row.amount()?;
        let total = sums.entry((p, e)).or_insert(Decimal::ZERO);
        *total = total
            .checked_add(amount)
            .ok_or_else(|| ProcessorError::DataIntegrity {
                sale_id: row.fact.sale_id,
                reason: format!("group total overflows adding {}", amount),
            })?;
    }

    debug!(groups = sums.len(), skipped, "grouped sum complete");
    Ok(sums)
}

/// Builds one [`GroupAggregate`] per `(category, retailer, product)` seen in the facts.
pub fn group_by_category_and_retailer<'a, I>(
    rows: I,
) -> Result<Vec<GroupAggregate>, ProcessorError>
where
    I: IntoIterator<Item = EnrichedRow<'a>>,
{
    let sums = grouped_sum(
        rows,
        |row| row.partition_key(),
        |row| row.product.map(|p| (p.product_id, p.name.as_str())),
    )?;

    Ok(sums
        .into_iter()
        .map(
            |(((category, retailer_id), (product_id, name)), total_sales)| GroupAggregate {
                partition: PartitionKey {
                    category: category.to_string(),
                    retailer_id,
                },
                product_id,
                name: name.to_string(),
                total_sales,
            },
        )
        .collect())
}

/// Dense-ranks aggregates by `total_sales` descending inside each partition.
///
/// Equal totals share a rank and the next distinct total gets the next
/// integer, so `[100, 100, 80]` ranks as `[1, 1, 2]`.
pub fn dense_rank_within_partition(
    aggregates: Vec<GroupAggregate>,
    parallel: bool,
) -> Vec<RankedAggregate> {
    let mut partitions: HashMap<PartitionKey, Vec<GroupAggregate>> = HashMap::new();
    for aggregate in aggregates {
        partitions
            .entry(aggregate.partition.clone())
            .or_default()
            .push(aggregate);
    }

    debug!(partitions = partitions.len(), parallel, "ranking partitions");

    if parallel {
        partitions
            .into_par_iter()
            .flat_map_iter(|(_, members)| rank_partition(members))
            .collect()
    } else {
        partitions.into_values().flat_map(rank_partition).collect()
    }
}

fn rank_partition(mut members: Vec<GroupAggregate>) -> Vec<RankedAggregate> {
    members.sort_by(|a, b| {
        b.total_sales
            .cmp(&a.total_sales)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    let ranks = dense_ranks(members.iter().map(|m| m.total_sales));
    members
        .into_iter()
        .zip(ranks)
        .map(|(aggregate, rank)| RankedAggregate { aggregate, rank })
        .collect()
}

/// Dense ranks for values already sorted descending
pub fn dense_ranks<I>(sorted_desc: I) -> Vec<u32>
where
    I: IntoIterator<Item = Decimal>,
{
    let mut rank = 0u32;
    let mut previous: Option<Decimal> = None;

    sorted_desc
        .into_iter()
        .map(|value| {
            if previous != Some(value) {
                rank += 1;
                previous = Some(value);
            }
            rank
        })
        .collect()
}

/// Keeps every rank-1 row and orders by retailer, then category and product.
pub fn select_top_sellers(ranked: Vec<RankedAggregate>) -> Vec<TopSeller> {
    let mut winners: Vec<TopSeller> = ranked
        .into_iter()
        .filter(|r| r.rank == 1)
        .map(|r| TopSeller {
            retailer_id: r.aggregate.partition.retailer_id,
            category: r.aggregate.partition.category,
            product_id: r.aggregate.product_id,
            name: r.aggregate.name,
            total_sales: r.aggregate.total_sales,
        })
        .collect();

    winners.sort_by(|a, b| {
        a.retailer_id
            .cmp(&b.retailer_id)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    winners
}

/// Rejects negative quantities and prices.
pub fn validate_facts<S>(facts: &S) -> Result<(), ProcessorError>
where
    S: FactSource + ?Sized,
{
    for fact in facts.rows() {
        if fact.quantity < 0 {
            return Err(ProcessorError::DataIntegrity {
                sale_id: fact.sale_id,
                reason: format!("negative quantity {}", fact.quantity),
            });
        }
        if fact.price.is_sign_negative() && !fact.price.is_zero() {
            return Err(ProcessorError::DataIntegrity {
                sale_id: fact.sale_id,
                reason: format!("negative price {}", fact.price),
            });
        }
    }
    Ok(())
}

/// Top-selling product per category per retailer.
///
/// Products tied for the highest total in a partition are all returned.
/// Output is ordered by retailer id ascending.
pub fn top_selling_by_category_and_retailer<S, L>(
    facts: &S,
    lookup: &L,
) -> Result<Vec<TopSeller>, ProcessorError>
where
    S: FactSource + ?Sized,
    L: DimensionLookup + ?Sized,
{
    let aggregates = group_by_category_and_retailer(enrich(facts, lookup))?;
    Ok(select_top_sellers(dense_rank_within_partition(aggregates, false)))
}

/// Configurable entry point for the top-seller computation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RankedAggregator {
    parallel: bool,
    validation: Validation,
}

impl RankedAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rank partitions on the rayon pool
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    pub fn top_selling<S, L>(
        &self,
        facts: &S,
        lookup: &L,
    ) -> Result<Vec<TopSeller>, ProcessorError>
    where
        S: FactSource + ?Sized,
        L: DimensionLookup + ?Sized,
    {
        if self.validation == Validation::Strict {
            validate_facts(facts)?;
        }

        let aggregates = group_by_category_and_retailer(enrich(facts, lookup))?;
        let ranked = dense_rank_within_partition(aggregates, self.parallel);
        let winners = select_top_sellers(ranked);

        debug!(rows = winners.len(), "top sellers selected");
        Ok(winners)
    }
}
