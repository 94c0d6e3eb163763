use crate::counter::BucketGeometry;
use crate::error::{AnomalyError, Result};
use crate::matcher::{AtomMatcher, FieldValueMatcher, MatcherId};
use crate::producer::CountMetricProducer;
use crate::projection::DimensionSpec;
use crate::tracker::AlertSpec;
use serde::{Deserialize, Serialize};
use slicewatch_common::{FieldPath, NS_PER_SEC};
use std::collections::HashSet;
use std::path::Path;

/// Named bucket sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    OneMinute,
    FiveMinutes,
    TenMinutes,
    ThirtyMinutes,
    OneHour,
    ThreeHours,
    SixHours,
    TwelveHours,
    OneDay,
}

impl TimeUnit {
    pub fn bucket_size_ns(self) -> u64 {
        let minutes: u64 = match self {
            Self::OneMinute => 1,
            Self::FiveMinutes => 5,
            Self::TenMinutes => 10,
            Self::ThirtyMinutes => 30,
            Self::OneHour => 60,
            Self::ThreeHours => 3 * 60,
            Self::SixHours => 6 * 60,
            Self::TwelveHours => 12 * 60,
            Self::OneDay => 24 * 60,
        };
        minutes * 60 * NS_PER_SEC
    }
}

/// Full detector configuration, usually loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub start_time_ns: u64,
    #[serde(default)]
    pub matchers: Vec<MatcherConfig>,
    #[serde(default)]
    pub count_metrics: Vec<CountMetricConfig>,
}

impl DetectorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Checks the whole configuration and returns the first problem found.
    pub fn validate(&self) -> Result<()> {
        let mut matcher_ids = HashSet::new();
        for matcher in &self.matchers {
            if !matcher_ids.insert(matcher.id) {
                return Err(AnomalyError::rejected(
                    "matcher",
                    matcher.id,
                    "duplicate matcher id",
                ));
            }
        }

        let mut metric_ids = HashSet::new();
        let mut alert_ids = HashSet::new();
        for metric in &self.count_metrics {
            if !metric_ids.insert(metric.id) {
                return Err(AnomalyError::rejected(
                    "metric",
                    metric.id,
                    "duplicate metric id",
                ));
            }
            if !matcher_ids.contains(&metric.what) {
                return Err(AnomalyError::rejected(
                    "metric",
                    metric.id,
                    format!("unknown matcher {}", metric.what),
                ));
            }
            metric.validate()?;
            for alert in &metric.alerts {
                if !alert_ids.insert(alert.id) {
                    return Err(AnomalyError::rejected(
                        "alert",
                        alert.id,
                        "duplicate alert id",
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub id: u64,
    pub atom_id: u32,
    #[serde(default)]
    pub fields: Vec<FieldValueMatcher>,
}

impl MatcherConfig {
    pub fn build(&self) -> AtomMatcher {
        AtomMatcher {
            id: MatcherId(self.id),
            atom_id: self.atom_id,
            fields: self.fields.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountMetricConfig {
    pub id: u64,
    /// Matcher whose events are counted.
    pub what: u64,
    /// Field paths forming the slice key; empty means a single slice.
    #[serde(default)]
    pub dimensions: Vec<FieldPath>,
    #[serde(default)]
    pub bucket: Option<TimeUnit>,
    /// Overrides `bucket` when set.
    #[serde(default)]
    pub bucket_size_ns: Option<u64>,
    #[serde(default)]
    pub alerts: Vec<AlertConfig>,
}

impl CountMetricConfig {
    pub fn resolved_bucket_size_ns(&self) -> Option<u64> {
        self.bucket_size_ns
            .or_else(|| self.bucket.map(TimeUnit::bucket_size_ns))
    }

    /// Checks the metric on its own. Matcher references and id uniqueness
    /// across metrics are checked by the caller.
    pub fn validate(&self) -> Result<()> {
        match self.resolved_bucket_size_ns() {
            None => {
                return Err(AnomalyError::rejected(
                    "metric",
                    self.id,
                    "bucket size is not set",
                ))
            }
            Some(0) => {
                return Err(AnomalyError::rejected(
                    "metric",
                    self.id,
                    "bucket_size_ns must be greater than 0",
                ))
            }
            Some(_) => {}
        }

        let mut alert_ids = HashSet::new();
        for alert in &self.alerts {
            alert.validate()?;
            if !alert_ids.insert(alert.id) {
                return Err(AnomalyError::rejected(
                    "alert",
                    alert.id,
                    "duplicate alert id",
                ));
            }
        }
        Ok(())
    }

    /// Validates the metric and builds its producer.
    pub fn build(&self, start_time_ns: u64) -> Result<CountMetricProducer> {
        self.validate()?;
        let bucket_size_ns = self.resolved_bucket_size_ns().unwrap_or_default();
        let mut producer = CountMetricProducer::new(
            self.id,
            MatcherId(self.what),
            DimensionSpec::new(self.dimensions.iter().copied()),
            BucketGeometry::new(start_time_ns, bucket_size_ns),
        );
        for alert in &self.alerts {
            producer.add_alert(alert.to_spec(self.id));
        }
        Ok(producer)
    }
}

/// Largest accepted window length. Every live slice holds one count per
/// bucket.
pub const MAX_NUM_BUCKETS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub id: u64,
    pub num_buckets: u32,
    #[serde(alias = "threshold")]
    pub trigger_if_sum_gt: i64,
    #[serde(default)]
    pub refractory_period_sec: u32,
}

impl AlertConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_buckets < 1 {
            return Err(AnomalyError::rejected(
                "alert",
                self.id,
                "num_buckets must be at least 1",
            ));
        }
        if self.num_buckets > MAX_NUM_BUCKETS {
            return Err(AnomalyError::rejected(
                "alert",
                self.id,
                format!("num_buckets must be at most {MAX_NUM_BUCKETS}"),
            ));
        }
        if self.trigger_if_sum_gt < 0 {
            return Err(AnomalyError::rejected(
                "alert",
                self.id,
                "trigger_if_sum_gt must not be negative",
            ));
        }
        Ok(())
    }

    pub fn to_spec(&self, metric_id: u64) -> AlertSpec {
        AlertSpec {
            id: self.id,
            metric_id,
            num_buckets: self.num_buckets,
            threshold: self.trigger_if_sum_gt,
            refractory_period_sec: self.refractory_period_sec,
        }
    }
}
