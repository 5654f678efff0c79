use std::sync::{Arc, OnceLock};

use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

/// Per-batch latency buckets, tuned for sub-millisecond operators.
const LATENCY_BUCKETS: &[f64] = &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0];

/// Prometheus registry for pipeline runtime metrics.
///
/// Cheap to clone; all clones share the same underlying registry.
#[derive(Clone, Debug)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    registry: Registry,
    rows_processed: CounterVec,
    batches_processed: CounterVec,
    batch_latency: HistogramVec,
    errors: CounterVec,
}

impl MetricsRegistry {
    /// Create an empty registry with all weir metric families registered.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::new()),
        }
    }

    /// Pre-labeled metric handles for one operator instance.
    pub fn operator(&self, operator_id: &str, operator_name: &str) -> OperatorMetrics {
        let labels = [operator_id, operator_name];
        OperatorMetrics {
            rows_processed: self.inner.rows_processed.with_label_values(&labels),
            batches_processed: self.inner.batches_processed.with_label_values(&labels),
            batch_latency: self.inner.batch_latency.with_label_values(&labels),
            errors: self.inner.errors.with_label_values(&labels),
        }
    }

    /// Render all families in the Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let metric_families = self.inner.registry.gather();
        let mut out = Vec::new();
        let enc = TextEncoder::new();
        if enc.encode(&metric_families, &mut out).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&out).to_string()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsInner {
    fn new() -> Self {
        let registry = Registry::new();
        let labels = &["operator_id", "operator_name"];

        let rows_processed = counter_vec(
            &registry,
            "weir_rows_processed_total",
            "Total number of rows processed by operator",
            labels,
        );
        let batches_processed = counter_vec(
            &registry,
            "weir_batches_processed_total",
            "Total number of batches processed by operator",
            labels,
        );
        let batch_latency = histogram_vec(
            &registry,
            "weir_batch_latency_seconds",
            "Latency of batch processing in seconds",
            labels,
        );
        let errors = counter_vec(
            &registry,
            "weir_errors_total",
            "Total number of errors by operator",
            labels,
        );

        Self {
            registry,
            rows_processed,
            batches_processed,
            batch_latency,
            errors,
        }
    }
}

/// Metric handles for a single operator, labeled with its id and name.
///
/// Counters are atomic; handles can be cloned into operator tasks freely.
#[derive(Clone, Debug)]
pub struct OperatorMetrics {
    rows_processed: Counter,
    batches_processed: Counter,
    batch_latency: Histogram,
    errors: Counter,
}

impl OperatorMetrics {
    /// Record rows flowing through the operator.
    pub fn inc_rows(&self, rows: u64) {
        self.rows_processed.inc_by(rows as f64);
    }

    /// Record one processed batch.
    pub fn inc_batches(&self) {
        self.batches_processed.inc();
    }

    /// Record one batch's processing latency.
    pub fn observe_latency(&self, secs: f64) {
        self.batch_latency.observe(secs.max(0.0));
    }

    /// Record one operator error.
    pub fn inc_errors(&self) {
        self.errors.inc();
    }
}

fn counter_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let c = CounterVec::new(Opts::new(name, help), labels).expect("counter vec");
    registry
        .register(Box::new(c.clone()))
        .expect("register counter");
    c
}

fn histogram_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> HistogramVec {
    let h = HistogramVec::new(
        HistogramOpts::new(name, help).buckets(LATENCY_BUCKETS.to_vec()),
        labels,
    )
    .expect("histogram vec");
    registry
        .register(Box::new(h.clone()))
        .expect("register histogram");
    h
}

static GLOBAL_METRICS: OnceLock<MetricsRegistry> = OnceLock::new();

/// Process-wide metrics registry used by operator contexts and the exporter.
pub fn global_metrics() -> &'static MetricsRegistry {
    GLOBAL_METRICS.get_or_init(MetricsRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::MetricsRegistry;

    #[test]
    fn renders_prometheus_text() {
        let m = MetricsRegistry::new();
        let op = m.operator("filter-1", "filter");
        op.inc_batches();
        op.inc_rows(128);
        op.observe_latency(0.002);

        let text = m.render_prometheus();
        assert!(text.contains("weir_rows_processed_total"));
        assert!(text.contains("filter-1"));
    }

    #[test]
    fn renders_all_metric_families() {
        let m = MetricsRegistry::new();
        let op = m.operator("map-1", "map");
        op.inc_batches();
        op.inc_rows(10);
        op.observe_latency(0.01);
        op.inc_errors();

        let text = m.render_prometheus();
        assert!(text.contains("weir_rows_processed_total"));
        assert!(text.contains("weir_batches_processed_total"));
        assert!(text.contains("weir_batch_latency_seconds"));
        assert!(text.contains("weir_errors_total"));
    }
}
