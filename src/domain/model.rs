use crate::utils::error::{ExporterError, Result};
use crate::utils::validation::validate_bucket_boundaries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Recording side: measures, aggregations and views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MeasureKind {
    Long,
    Double,
}

/// A named quantity that can be recorded, e.g. `example/latency` in `ms`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Measure {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub kind: MeasureKind,
}

impl Measure {
    pub fn long(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unit: unit.into(),
            kind: MeasureKind::Long,
        }
    }

    pub fn double(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unit: unit.into(),
            kind: MeasureKind::Double,
        }
    }
}

/// Explicit histogram bucket boundaries. A value `v` falls into bucket `i`
/// where `i` is the number of boundaries `<= v`, so there are `len + 1` buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketBoundaries(Vec<f64>);

impl BucketBoundaries {
    pub fn new(bounds: Vec<f64>) -> Result<Self> {
        validate_bucket_boundaries("bucket_boundaries", &bounds).map_err(|e| {
            ExporterError::InvalidBucketBoundaries {
                reason: e.to_string(),
            }
        })?;
        Ok(Self(bounds))
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.0
    }

    pub fn bucket_count(&self) -> usize {
        self.0.len() + 1
    }

    pub fn bucket_index(&self, value: f64) -> usize {
        self.0.partition_point(|bound| *bound <= value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Aggregation {
    Sum,
    Count,
    LastValue,
    Distribution(BucketBoundaries),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TagKey(String);

impl TagKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TagValue(String);

impl TagValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How recorded values of one measure are aggregated and broken down by tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub name: String,
    pub description: String,
    pub measure: Measure,
    pub aggregation: Aggregation,
    pub columns: Vec<TagKey>,
}

impl View {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        measure: Measure,
        aggregation: Aggregation,
        columns: Vec<TagKey>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            measure,
            aggregation,
            columns,
        }
    }
}

// ---------------------------------------------------------------------------
// Export side: metrics handed to exporters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        Utc::now().into()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(time: DateTime<Utc>) -> Self {
        Self {
            seconds: time.timestamp(),
            nanos: time.timestamp_subsec_nanos(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp{{seconds={}, nanos={}}}", self.seconds, self.nanos)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelKey {
    pub key: String,
    pub description: String,
}

/// `None` means the tag was not present when the value was recorded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LabelValue(pub Option<String>);

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => write!(f, "{}", value),
            None => write!(f, "<unset>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricDescriptorType {
    GaugeInt64,
    GaugeDouble,
    CumulativeInt64,
    CumulativeDouble,
    CumulativeDistribution,
}

impl MetricDescriptorType {
    pub fn is_gauge(&self) -> bool {
        matches!(
            self,
            MetricDescriptorType::GaugeInt64 | MetricDescriptorType::GaugeDouble
        )
    }
}

impl fmt::Display for MetricDescriptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricDescriptorType::GaugeInt64 => "GAUGE_INT64",
            MetricDescriptorType::GaugeDouble => "GAUGE_DOUBLE",
            MetricDescriptorType::CumulativeInt64 => "CUMULATIVE_INT64",
            MetricDescriptorType::CumulativeDouble => "CUMULATIVE_DOUBLE",
            MetricDescriptorType::CumulativeDistribution => "CUMULATIVE_DISTRIBUTION",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDescriptor {
    pub name: String,
    pub description: String,
    pub unit: String,
    #[serde(rename = "type")]
    pub kind: MetricDescriptorType,
    pub label_keys: Vec<LabelKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionValue {
    pub count: u64,
    pub sum: f64,
    pub sum_of_squared_deviations: f64,
    pub bucket_boundaries: Vec<f64>,
    pub buckets: Vec<u64>,
}

impl DistributionValue {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Int64(i64),
    Double(f64),
    Distribution(DistributionValue),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int64(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Distribution(d) => write!(
                f,
                "Distribution{{count={}, sum={}, mean={:.3}, sumOfSquaredDeviations={:.3}, buckets={:?}}}",
                d.count,
                d.sum,
                d.mean(),
                d.sum_of_squared_deviations,
                d.buckets
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub value: Value,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub label_values: Vec<LabelValue>,
    pub points: Vec<Point>,
    /// Absent for gauges.
    pub start_timestamp: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub descriptor: MetricDescriptor,
    pub time_series: Vec<TimeSeries>,
}

// ---------------------------------------------------------------------------
// Host side
// ---------------------------------------------------------------------------

/// Static content shown by the host when it is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub name: String,
    pub lines: Vec<String>,
}

impl Layout {
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    pub fn activity_main() -> Self {
        Self::new(
            "activity_main",
            vec!["Stats exporter is running in the background".to_string()],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index_uses_lower_inclusive_bounds() {
        let bounds = BucketBoundaries::new(vec![0.0, 5.0, 10.0, 15.0, 20.0]).unwrap();

        assert_eq!(bounds.bucket_count(), 6);
        assert_eq!(bounds.bucket_index(-1.0), 0);
        assert_eq!(bounds.bucket_index(0.0), 1);
        assert_eq!(bounds.bucket_index(4.9), 1);
        assert_eq!(bounds.bucket_index(5.0), 2);
        assert_eq!(bounds.bucket_index(19.0), 4);
        assert_eq!(bounds.bucket_index(20.0), 5);
        assert_eq!(bounds.bucket_index(1000.0), 5);
    }

    #[test]
    fn test_bucket_boundaries_reject_unsorted_input() {
        let err = BucketBoundaries::new(vec![0.0, 10.0, 5.0]).unwrap_err();
        assert!(matches!(err, ExporterError::InvalidBucketBoundaries { .. }));
    }

    #[test]
    fn test_empty_boundaries_form_a_single_bucket() {
        let bounds = BucketBoundaries::new(vec![]).unwrap();
        assert_eq!(bounds.bucket_count(), 1);
        assert_eq!(bounds.bucket_index(42.0), 0);
    }

    #[test]
    fn test_timestamp_from_datetime() {
        let time = DateTime::from_timestamp(1_700_000_000, 250).unwrap();
        let ts = Timestamp::from(time);
        assert_eq!(ts.seconds, 1_700_000_000);
        assert_eq!(ts.nanos, 250);
        assert_eq!(ts.to_string(), "Timestamp{seconds=1700000000, nanos=250}");
    }

    #[test]
    fn test_distribution_display() {
        let value = Value::Distribution(DistributionValue {
            count: 2,
            sum: 6.0,
            sum_of_squared_deviations: 2.0,
            bucket_boundaries: vec![5.0],
            buckets: vec![1, 1],
        });
        let rendered = value.to_string();
        assert!(rendered.starts_with("Distribution{count=2, sum=6, mean=3.000"));
        assert!(rendered.ends_with("buckets=[1, 1]}"));
    }

    #[test]
    fn test_descriptor_type_serializes_like_its_display() {
        let json = serde_json::to_string(&MetricDescriptorType::CumulativeDistribution).unwrap();
        assert_eq!(json, "\"CUMULATIVE_DISTRIBUTION\"");
        assert_eq!(
            MetricDescriptorType::CumulativeDistribution.to_string(),
            "CUMULATIVE_DISTRIBUTION"
        );
    }
}
