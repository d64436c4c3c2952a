use crate::processor::{
    ChannelSales, DimensionLookup, FactSource, MonthlySales, ProcessorError,
    ranked_aggregator::{enrich, grouped_sum},
};

/// Total sales per retailer channel, largest first.
///
/// Rows whose retailer is unknown or has no channel are left out.
pub fn sales_by_channel<S, L>(facts: &S, lookup: &L) -> Result<Vec<ChannelSales>, ProcessorError>
where
    S: FactSource + ?Sized,
    L: DimensionLookup + ?Sized,
{
    let mut out: Vec<ChannelSales> = grouped_sum(
        enrich(facts, lookup),
        |row| row.channel(),
        |_| Some(()),
    )?
    .into_iter()
    .map(|((channel, ()), total_sales)| ChannelSales {
        channel: channel.to_string(),
        total_sales,
    })
    .collect();

    out.sort_by(|a, b| {
        b.total_sales
            .cmp(&a.total_sales)
            .then_with(|| a.channel.cmp(&b.channel))
    });
    Ok(out)
}

/// Total sales per calendar month, oldest first.
///
/// Months come from the date dimension; facts dated outside it are left out.
pub fn sales_by_month<S, L>(facts: &S, lookup: &L) -> Result<Vec<MonthlySales>, ProcessorError>
where
    S: FactSource + ?Sized,
    L: DimensionLookup + ?Sized,
{
    let mut out: Vec<MonthlySales> = grouped_sum(
        enrich(facts, lookup),
        |row| row.date.map(|d| d.year),
        |row| row.date.map(|d| d.month),
    )?
    .into_iter()
    .map(|((year, month), total_sales)| MonthlySales {
        year,
        month,
        total_sales,
    })
    .collect();

    out.sort_by_key(|m| (m.year, m.month));
    Ok(out)
}
