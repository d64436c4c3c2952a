use lru::LruCache;
use std::{cell::RefCell, num::NonZeroUsize, rc::Rc};
use tracing::debug;

use crate::ingest::star_schema::StarSchema;
use crate::processor::{
    ChannelSales, MonthlySales, ProcessorError, TopSeller,
    ranked_aggregator::RankedAggregator,
    sales_reports::{sales_by_channel, sales_by_month},
};

pub const DEFAULT_CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::new(128).unwrap();

/// Which report, and for the top sellers, the aggregator settings that shaped it
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub enum ReportKind {
    TopSellers(RankedAggregator),
    SalesByChannel,
    SalesByMonth,
}

/// Cache key: one report of one [`StarSchema`] snapshot
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub struct ReportKey {
    pub snapshot_id: u64,
    pub kind: ReportKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportResult {
    TopSellers(Vec<TopSeller>),
    SalesByChannel(Vec<ChannelSales>),
    SalesByMonth(Vec<MonthlySales>),
}

#[derive(Debug)]
pub struct ReportCache {
    cache: RefCell<LruCache<ReportKey, ReportResult>>,
}

impl ReportCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &ReportKey) -> Option<ReportResult> {
        self.cache.borrow_mut().get(key).cloned()
    }

    pub fn put(&self, key: ReportKey, value: ReportResult) {
        self.cache.borrow_mut().put(key, value);
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view over one [`StarSchema`] snapshot that serves the three reports,
/// optionally through a shared [`ReportCache`]. Cached entries are keyed by
/// snapshot id and, for the top sellers, by the aggregator settings.
#[derive(Debug, Clone)]
pub struct Warehouse {
    schema: Rc<StarSchema>,
    cache: Option<Rc<ReportCache>>,
    aggregator: RankedAggregator,
}

impl Warehouse {
    pub fn new(schema: Rc<StarSchema>, cache: Option<Rc<ReportCache>>) -> Self {
        Self {
            schema,
            cache,
            aggregator: RankedAggregator::new(),
        }
    }

    /// Use `aggregator` for the top-seller report
    pub fn with_aggregator(mut self, aggregator: RankedAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Disable caching
    pub fn no_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn schema(&self) -> &StarSchema {
        &self.schema
    }

    /// Report 3: top-selling product per category per retailer
    pub fn top_sellers(&self) -> Result<Vec<TopSeller>, ProcessorError> {
        match self.cached(ReportKind::TopSellers(self.aggregator), || {
            Ok(ReportResult::TopSellers(
                self.aggregator.top_selling(&*self.schema, &*self.schema)?,
            ))
        })? {
            ReportResult::TopSellers(rows) => Ok(rows),
            _ => Err(ProcessorError::Parse("cached report has the wrong shape".into())),
        }
    }

    /// Report 1: total sales per retailer channel
    pub fn sales_by_channel(&self) -> Result<Vec<ChannelSales>, ProcessorError> {
        match self.cached(ReportKind::SalesByChannel, || {
            Ok(ReportResult::SalesByChannel(sales_by_channel(
                &*self.schema,
                &*self.schema,
            )?))
        })? {
            ReportResult::SalesByChannel(rows) => Ok(rows),
            _ => Err(ProcessorError::Parse("cached report has the wrong shape".into())),
        }
    }

    /// Report 2: total sales per calendar month
    pub fn sales_by_month(&self) -> Result<Vec<MonthlySales>, ProcessorError> {
        match self.cached(ReportKind::SalesByMonth, || {
            Ok(ReportResult::SalesByMonth(sales_by_month(
                &*self.schema,
                &*self.schema,
            )?))
        })? {
            ReportResult::SalesByMonth(rows) => Ok(rows),
            _ => Err(ProcessorError::Parse("cached report has the wrong shape".into())),
        }
    }

    fn cached<F>(&self, kind: ReportKind, compute: F) -> Result<ReportResult, ProcessorError>
    where
        F: FnOnce() -> Result<ReportResult, ProcessorError>,
    {
        let key = ReportKey {
            snapshot_id: self.schema.snapshot_id(),
            kind,
        };
        match &self.cache {
            Some(lru) => {
                if let Some(result) = lru.get(&key) {
                    debug!(?key, "report served from cache");
                    return Ok(result);
                }
                let result = compute()?;
                lru.put(key, result.clone());
                Ok(result)
            }
            None => compute(),
        }
    }
}

impl StarSchema {
    pub fn warehouse(self: &Rc<Self>) -> Warehouse {
        Warehouse::new(self.clone(), None)
    }

    pub fn warehouse_with_cache(self: &Rc<Self>, cache: &Rc<ReportCache>) -> Warehouse {
        Warehouse::new(self.clone(), Some(cache.clone()))
    }
}
