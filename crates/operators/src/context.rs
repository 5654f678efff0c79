//! Per-operator execution environment.

use tokio_util::sync::CancellationToken;
use weir_common::{global_metrics, OperatorMetrics};

/// Execution environment handed to an operator at open time.
#[derive(Clone, Debug)]
pub struct OperatorContext {
    /// Unique operator id within the plan.
    pub operator_id: String,
    /// Human-readable operator name.
    pub operator_name: String,
    /// Total parallel instances of this operator.
    pub parallelism: usize,
    /// Zero-based index of this instance.
    pub instance_index: usize,
    /// Pre-labeled metric handles for this operator.
    pub metrics: OperatorMetrics,
    /// Shutdown signal observable by all tasks of the pipeline.
    pub cancel: CancellationToken,
}

impl OperatorContext {
    /// Build a context with metrics registered under the operator labels.
    pub fn new(
        operator_id: impl Into<String>,
        operator_name: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        let operator_id = operator_id.into();
        let operator_name = operator_name.into();
        let metrics = global_metrics().operator(&operator_id, &operator_name);
        Self {
            operator_id,
            operator_name,
            parallelism: 1,
            instance_index: 0,
            metrics,
            cancel,
        }
    }

    /// True once shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
