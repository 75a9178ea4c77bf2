use crate::core::reader::MetricProducerManager;
use crate::domain::model::{
    Aggregation, BucketBoundaries, DistributionValue, LabelKey, LabelValue, Measure, MeasureKind,
    Metric, MetricDescriptor, MetricDescriptorType, Point, TagKey, TagValue, TimeSeries,
    Timestamp, Value, View,
};
use crate::domain::ports::MetricProducer;
use crate::utils::error::{ExporterError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Explicit handle to the stats subsystem: views, the recorder and the
/// producers readers pull from. Clones share the same state.
#[derive(Clone)]
pub struct Stats {
    view_manager: ViewManager,
    recorder: StatsRecorder,
    producer_manager: MetricProducerManager,
}

impl Stats {
    pub fn new() -> Self {
        let view_manager = ViewManager::new();
        let recorder = StatsRecorder {
            views: view_manager.clone(),
        };
        let producer_manager = MetricProducerManager::new();
        producer_manager.add(Arc::new(view_manager.clone()));

        Self {
            view_manager,
            recorder,
            producer_manager,
        }
    }

    pub fn view_manager(&self) -> &ViewManager {
        &self.view_manager
    }

    pub fn recorder(&self) -> &StatsRecorder {
        &self.recorder
    }

    pub fn producer_manager(&self) -> &MetricProducerManager {
        &self.producer_manager
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
struct DistributionAggregator {
    boundaries: BucketBoundaries,
    count: u64,
    sum: f64,
    mean: f64,
    sum_of_squared_deviations: f64,
    buckets: Vec<u64>,
}

impl DistributionAggregator {
    fn new(boundaries: BucketBoundaries) -> Self {
        let buckets = vec![0; boundaries.bucket_count()];
        Self {
            boundaries,
            count: 0,
            sum: 0.0,
            mean: 0.0,
            sum_of_squared_deviations: 0.0,
            buckets,
        }
    }

    // Welford's online update
    fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.sum_of_squared_deviations += delta * (value - self.mean);
        self.sum += value;
        self.buckets[self.boundaries.bucket_index(value)] += 1;
    }

    fn snapshot(&self) -> DistributionValue {
        DistributionValue {
            count: self.count,
            sum: self.sum,
            sum_of_squared_deviations: self.sum_of_squared_deviations,
            bucket_boundaries: self.boundaries.boundaries().to_vec(),
            buckets: self.buckets.clone(),
        }
    }
}

/// A recorded value, keeping integer measurements exact.
#[derive(Debug, Clone, Copy, PartialEq)]
enum MeasureValue {
    Long(i64),
    Double(f64),
}

impl MeasureValue {
    fn kind(self) -> MeasureKind {
        match self {
            MeasureValue::Long(_) => MeasureKind::Long,
            MeasureValue::Double(_) => MeasureKind::Double,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            MeasureValue::Long(v) => v as f64,
            MeasureValue::Double(v) => v,
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            MeasureValue::Long(v) => v,
            MeasureValue::Double(v) => v as i64,
        }
    }
}

#[derive(Debug, Clone)]
enum Aggregator {
    SumLong(i64),
    SumDouble(f64),
    Count(u64),
    LastLong(i64),
    LastDouble(f64),
    Distribution(DistributionAggregator),
}

impl Aggregator {
    fn for_view(aggregation: &Aggregation, kind: MeasureKind) -> Self {
        match (aggregation, kind) {
            (Aggregation::Sum, MeasureKind::Long) => Aggregator::SumLong(0),
            (Aggregation::Sum, MeasureKind::Double) => Aggregator::SumDouble(0.0),
            (Aggregation::Count, _) => Aggregator::Count(0),
            (Aggregation::LastValue, MeasureKind::Long) => Aggregator::LastLong(0),
            (Aggregation::LastValue, MeasureKind::Double) => Aggregator::LastDouble(0.0),
            (Aggregation::Distribution(bounds), _) => {
                Aggregator::Distribution(DistributionAggregator::new(bounds.clone()))
            }
        }
    }

    fn add(&mut self, value: MeasureValue) {
        match self {
            // saturates instead of wrapping on overflow
            Aggregator::SumLong(sum) => *sum = sum.saturating_add(value.as_i64()),
            Aggregator::SumDouble(sum) => *sum += value.as_f64(),
            Aggregator::Count(count) => *count += 1,
            Aggregator::LastLong(last) => *last = value.as_i64(),
            Aggregator::LastDouble(last) => *last = value.as_f64(),
            Aggregator::Distribution(dist) => dist.add(value.as_f64()),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Aggregator::SumLong(v) | Aggregator::LastLong(v) => Value::Int64(*v),
            Aggregator::SumDouble(v) | Aggregator::LastDouble(v) => Value::Double(*v),
            Aggregator::Count(count) => Value::Int64(*count as i64),
            Aggregator::Distribution(dist) => Value::Distribution(dist.snapshot()),
        }
    }
}

struct ViewData {
    view: View,
    start: Timestamp,
    rows: BTreeMap<Vec<LabelValue>, Aggregator>,
}

impl ViewData {
    fn descriptor_type(&self) -> MetricDescriptorType {
        match (&self.view.aggregation, self.view.measure.kind) {
            (Aggregation::Distribution(_), _) => MetricDescriptorType::CumulativeDistribution,
            (Aggregation::Count, _) => MetricDescriptorType::CumulativeInt64,
            (Aggregation::Sum, MeasureKind::Long) => MetricDescriptorType::CumulativeInt64,
            (Aggregation::Sum, MeasureKind::Double) => MetricDescriptorType::CumulativeDouble,
            (Aggregation::LastValue, MeasureKind::Long) => MetricDescriptorType::GaugeInt64,
            (Aggregation::LastValue, MeasureKind::Double) => MetricDescriptorType::GaugeDouble,
        }
    }

    fn to_metric(&self, now: Timestamp) -> Metric {
        let kind = self.descriptor_type();
        let unit = match self.view.aggregation {
            Aggregation::Count => "1".to_string(),
            _ => self.view.measure.unit.clone(),
        };
        let start_timestamp = if kind.is_gauge() {
            None
        } else {
            Some(self.start)
        };

        let time_series = self
            .rows
            .iter()
            .map(|(labels, aggregator)| TimeSeries {
                label_values: labels.clone(),
                points: vec![Point {
                    value: aggregator.to_value(),
                    timestamp: now,
                }],
                start_timestamp,
            })
            .collect();

        Metric {
            descriptor: MetricDescriptor {
                name: self.view.name.clone(),
                description: self.view.description.clone(),
                unit,
                kind,
                label_keys: self
                    .view
                    .columns
                    .iter()
                    .map(|column| LabelKey {
                        key: column.name().to_string(),
                        description: String::new(),
                    })
                    .collect(),
            },
            time_series,
        }
    }
}

#[derive(Default)]
struct ViewRegistry {
    views: HashMap<String, ViewData>,
    views_by_measure: HashMap<String, Vec<String>>,
}

/// Registers views and produces one metric per view that has recorded data.
#[derive(Clone, Default)]
pub struct ViewManager {
    registry: Arc<Mutex<ViewRegistry>>,
}

impl ViewManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, ViewRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registering an identical view twice is a no-op; a different view
    /// under an existing name is rejected.
    pub fn register_view(&self, view: View) -> Result<()> {
        let mut registry = self.registry();

        if let Some(existing) = registry.views.get(&view.name) {
            if existing.view == view {
                tracing::debug!("View {} already registered", view.name);
                return Ok(());
            }
            return Err(ExporterError::ViewConflict { name: view.name });
        }

        tracing::debug!(
            "Registering view {} on measure {}",
            view.name,
            view.measure.name
        );
        registry
            .views_by_measure
            .entry(view.measure.name.clone())
            .or_default()
            .push(view.name.clone());
        registry.views.insert(
            view.name.clone(),
            ViewData {
                view,
                start: Timestamp::now(),
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub fn get_view(&self, name: &str) -> Option<View> {
        self.registry().views.get(name).map(|data| data.view.clone())
    }

    pub fn all_views(&self) -> Vec<View> {
        let mut views: Vec<View> = self
            .registry()
            .views
            .values()
            .map(|data| data.view.clone())
            .collect();
        views.sort_by(|a, b| a.name.cmp(&b.name));
        views
    }

    fn record(
        &self,
        measurements: &[(Measure, MeasureValue)],
        tags: &HashMap<TagKey, TagValue>,
    ) {
        let mut registry = self.registry();
        let ViewRegistry {
            views,
            views_by_measure,
        } = &mut *registry;

        for (measure, value) in measurements {
            let Some(view_names) = views_by_measure.get(&measure.name) else {
                tracing::trace!("No views registered for measure {}", measure.name);
                continue;
            };
            for view_name in view_names {
                let Some(data) = views.get_mut(view_name) else {
                    continue;
                };
                if data.view.measure.kind != value.kind() {
                    tracing::trace!(
                        "Skipping view {}: measure {} is {:?}, recorded value is {:?}",
                        view_name,
                        measure.name,
                        data.view.measure.kind,
                        value.kind()
                    );
                    continue;
                }
                let labels: Vec<LabelValue> = data
                    .view
                    .columns
                    .iter()
                    .map(|column| LabelValue(tags.get(column).map(|v| v.as_str().to_string())))
                    .collect();
                let view = &data.view;
                data.rows
                    .entry(labels)
                    .or_insert_with(|| Aggregator::for_view(&view.aggregation, view.measure.kind))
                    .add(*value);
            }
        }
    }
}

impl MetricProducer for ViewManager {
    fn produce_metrics(&self) -> Vec<Metric> {
        let now = Timestamp::now();
        let registry = self.registry();
        let mut metrics: Vec<Metric> = registry
            .views
            .values()
            .filter(|data| !data.rows.is_empty())
            .map(|data| data.to_metric(now))
            .collect();
        metrics.sort_by(|a, b| a.descriptor.name.cmp(&b.descriptor.name));
        metrics
    }
}

#[derive(Clone)]
pub struct StatsRecorder {
    views: ViewManager,
}

impl StatsRecorder {
    pub fn new_measure_map(&self) -> MeasureMap<'_> {
        MeasureMap {
            recorder: self,
            measurements: Vec::new(),
            tags: HashMap::new(),
        }
    }
}

/// A batch of measurements recorded together under the same tags.
pub struct MeasureMap<'a> {
    recorder: &'a StatsRecorder,
    measurements: Vec<(Measure, MeasureValue)>,
    tags: HashMap<TagKey, TagValue>,
}

impl MeasureMap<'_> {
    pub fn put_long(mut self, measure: &Measure, value: i64) -> Self {
        self.measurements.push((measure.clone(), MeasureValue::Long(value)));
        self
    }

    pub fn put_double(mut self, measure: &Measure, value: f64) -> Self {
        self.measurements.push((measure.clone(), MeasureValue::Double(value)));
        self
    }

    pub fn tag(mut self, key: TagKey, value: TagValue) -> Self {
        self.tags.insert(key, value);
        self
    }

    pub fn record(self) {
        self.recorder.views.record(&self.measurements, &self.tags);
    }
}
