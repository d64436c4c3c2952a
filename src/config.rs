//! Runtime configuration

use serde::{Deserialize, Serialize};
use std::{num::NonZeroUsize, path::Path};

use crate::{
    ingest::cleaning::DEFAULT_ID_FIELDS,
    processor::{ProcessorError, Validation, ranked_aggregator::RankedAggregator},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Columns that must hold a numeric id for a row to be loaded
    pub id_fields: Vec<String>,

    /// Fail the top-seller report on negative quantity or price
    pub strict_validation: bool,

    /// Rank partitions on the rayon pool
    pub parallel_ranking: bool,

    /// Number of report results kept in the LRU cache, counted per
    /// snapshot, report and aggregator setting
    pub report_cache_capacity: usize,

    /// Log level, overridden by `RUST_LOG`
    pub log_level: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            id_fields: DEFAULT_ID_FIELDS.iter().map(|f| f.to_string()).collect(),
            strict_validation: false,
            parallel_ranking: true,
            report_cache_capacity: 128,
            log_level: "info".to_string(),
        }
    }
}

impl AnalyticsConfig {
    pub fn from_file(path: &Path) -> Result<Self, ProcessorError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ProcessorError> {
        toml::from_str(content).map_err(|e| ProcessorError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ProcessorError> {
        if self.report_cache_capacity == 0 {
            return Err(ProcessorError::Config(
                "report_cache_capacity cannot be 0".to_string(),
            ));
        }
        if self.id_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ProcessorError::Config(
                "id_fields cannot contain empty names".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_capacity(&self) -> Result<NonZeroUsize, ProcessorError> {
        NonZeroUsize::new(self.report_cache_capacity).ok_or_else(|| {
            ProcessorError::Config("report_cache_capacity cannot be 0".to_string())
        })
    }

    pub fn validation(&self) -> Validation {
        if self.strict_validation {
            Validation::Strict
        } else {
            Validation::Lenient
        }
    }

    pub fn aggregator(&self) -> RankedAggregator {
        RankedAggregator::new()
            .parallel(self.parallel_ranking)
            .validation(self.validation())
    }
}
