use common::{ClusterKey, Error};
use opentelemetry::trace::TraceId;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, exemplar::HistogramWithExemplars, family::Family},
    registry::{Registry, Unit},
};
use std::{sync::Arc, time::Instant};

#[derive(Clone)]
pub struct Metrics {
    pub kyma: ReconcileMetrics,
    pub mapping: ReconcileMetrics,
    pub compass: CompassMetrics,
    pub registry: Arc<Registry>,
}

impl Default for Metrics {
    fn default() -> Self {
        let mut registry = Registry::with_prefix("compass_manager");
        let kyma = ReconcileMetrics::default().register(registry.sub_registry_with_prefix("kyma_reconcile"));
        let mapping =
            ReconcileMetrics::default().register(registry.sub_registry_with_prefix("mapping_reconcile"));
        let compass = CompassMetrics::default().register(&mut registry);
        Self {
            kyma,
            mapping,
            compass,
            registry: Arc::new(registry),
        }
    }
}

impl Metrics {
    /// OpenMetrics text rendering of the registry
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = prometheus_client::encoding::text::encode(&mut buffer, &self.registry) {
            tracing::warn!("Failed to encode metrics: {e}");
        }
        buffer
    }
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug, Default)]
pub struct TraceLabel {
    pub trace_id: String,
}
impl TryFrom<&TraceId> for TraceLabel {
    type Error = Error;

    fn try_from(id: &TraceId) -> Result<TraceLabel, Error> {
        if std::matches!(id, &TraceId::INVALID) {
            Err(Error::Other("Invalid trace ID".to_string()))
        } else {
            let trace_id = id.to_string();
            Ok(Self { trace_id })
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub instance: String,
    pub error: String,
}

#[derive(Clone)]
pub struct ReconcileMetrics {
    pub runs: Counter,
    pub failures: Family<ErrorLabels, Counter>,
    pub duration: HistogramWithExemplars<TraceLabel>,
}

impl Default for ReconcileMetrics {
    fn default() -> Self {
        Self {
            runs: Counter::default(),
            failures: Family::<ErrorLabels, Counter>::default(),
            duration: HistogramWithExemplars::new([0.01, 0.1, 0.25, 0.5, 1., 5., 15., 60.].into_iter()),
        }
    }
}

impl ReconcileMetrics {
    /// Register API metrics to start tracking them.
    pub fn register(self, r: &mut Registry) -> Self {
        r.register_with_unit(
            "duration",
            "reconcile duration",
            Unit::Seconds,
            self.duration.clone(),
        );
        r.register("failures", "reconciliation errors", self.failures.clone());
        r.register("runs", "reconciliations", self.runs.clone());
        self
    }

    pub fn reconcile_failure(&self, key: &ClusterKey, e: &Error) {
        self.failures
            .get_or_create(&ErrorLabels {
                instance: key.to_string(),
                error: e.metric_label(),
            })
            .inc();
    }

    pub fn count_and_measure(&self, trace_id: &TraceId) -> ReconcileMeasurer {
        self.runs.inc();
        ReconcileMeasurer {
            start: Instant::now(),
            labels: trace_id.try_into().ok(),
            metric: self.duration.clone(),
        }
    }
}

/// Successful calls to the director and the runtime agent configurator
#[derive(Clone, Default)]
pub struct CompassMetrics {
    pub registered: Counter,
    pub configured: Counter,
    pub deregistered: Counter,
}

impl CompassMetrics {
    pub fn register(self, r: &mut Registry) -> Self {
        r.register("registered", "runtimes registered in compass", self.registered.clone());
        r.register("configured", "runtime agents configured", self.configured.clone());
        r.register("deregistered", "runtimes removed from compass", self.deregistered.clone());
        self
    }
}

/// Smart function duration measurer
///
/// Relies on Drop to calculate duration and register the observation in the histogram
pub struct ReconcileMeasurer {
    start: Instant,
    labels: Option<TraceLabel>,
    metric: HistogramWithExemplars<TraceLabel>,
}

impl Drop for ReconcileMeasurer {
    fn drop(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let duration = self.start.elapsed().as_millis() as f64 / 1000.0;
        let labels = self.labels.take();
        self.metric.observe(duration, labels);
    }
}
