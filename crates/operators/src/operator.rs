//! Core lifecycle interfaces implemented by all stream operators.

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use tokio::sync::mpsc;
use weir_common::Result;

use crate::context::OperatorContext;

/// A watermark advancing event time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    /// Milliseconds since the epoch.
    pub timestamp_ms: i64,
}

/// Signals that a checkpoint should be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointBarrier {
    /// Monotonic checkpoint id.
    pub checkpoint_id: i64,
}

/// Core interface for transformation operators.
///
/// The lifecycle is `open` → `process_batch`* → `close`.
#[async_trait]
pub trait Operator: Send {
    /// Initialize the operator. Called once before any `process_batch`.
    fn open(&mut self, ctx: &OperatorContext) -> Result<()>;

    /// Process one record batch into zero or more output batches.
    ///
    /// The operator consumes the input; keeping a column alive beyond the
    /// call is an `Arc` clone. Returned batches are owned by the caller.
    async fn process_batch(&mut self, batch: RecordBatch) -> Result<Vec<RecordBatch>>;

    /// Handle an advancing watermark. Stateless operators ignore it.
    fn process_watermark(&mut self, _watermark: Watermark) -> Result<()> {
        Ok(())
    }

    /// Handle a checkpoint barrier. Stateless operators ignore it.
    fn process_checkpoint(&mut self, _barrier: CheckpointBarrier) -> Result<()> {
        Ok(())
    }

    /// Release resources. Called once during shutdown.
    fn close(&mut self) -> Result<()>;
}

/// A connector that produces data.
///
/// Sources run in their own task and push batches to the output channel.
#[async_trait]
pub trait Source: Send {
    /// Initialize the source.
    fn open(&mut self, ctx: &OperatorContext) -> Result<()>;

    /// Produce batches until exhausted or `ctx` is cancelled.
    ///
    /// The output channel closes when this returns; the sender is consumed.
    async fn run(&mut self, ctx: &OperatorContext, out: mpsc::Sender<RecordBatch>) -> Result<()>;

    /// Release resources.
    fn close(&mut self) -> Result<()>;
}

/// A connector that consumes data.
pub trait Sink: Send {
    /// Initialize the sink.
    fn open(&mut self, ctx: &OperatorContext) -> Result<()>;

    /// Write one record batch to the external system.
    fn write_batch(&mut self, batch: RecordBatch) -> Result<()>;

    /// Flush and release resources.
    fn close(&mut self) -> Result<()>;
}
