use std::sync::{Arc, Mutex};

use arrow::record_batch::RecordBatch;
use weir_common::{Result, WeirError};
use weir_operators::{OperatorContext, Sink};

/// Accumulates every received batch behind a shared handle.
///
/// Intended for tests and examples: keep a [`CollectHandle`] before handing
/// the sink to the engine, then inspect the batches after the run.
pub struct Collect {
    batches: Arc<Mutex<Vec<RecordBatch>>>,
}

impl Collect {
    /// Create an empty collecting sink.
    pub fn new() -> Self {
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle for inspecting batches after the pipeline ends.
    pub fn handle(&self) -> CollectHandle {
        CollectHandle(Arc::clone(&self.batches))
    }
}

impl Default for Collect {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for Collect {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<()> {
        Ok(())
    }

    fn write_batch(&mut self, batch: RecordBatch) -> Result<()> {
        self.batches
            .lock()
            .map_err(|_| WeirError::Execution("collect sink lock poisoned".to_string()))?
            .push(batch);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Read-side view of a [`Collect`] sink.
#[derive(Clone)]
pub struct CollectHandle(Arc<Mutex<Vec<RecordBatch>>>);

impl CollectHandle {
    /// Snapshot of all collected batches.
    pub fn batches(&self) -> Vec<RecordBatch> {
        self.0.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Total rows across all collected batches.
    pub fn total_rows(&self) -> usize {
        self.0
            .lock()
            .map(|b| b.iter().map(|batch| batch.num_rows()).sum())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Int64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use tokio_util::sync::CancellationToken;
    use weir_operators::{OperatorContext, Sink};

    use super::Collect;

    #[test]
    fn accumulates_batches() {
        let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Int64, false)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef],
        )
        .expect("batch");

        let mut sink = Collect::new();
        let handle = sink.handle();
        sink.open(&OperatorContext::new("sink", "collect", CancellationToken::new()))
            .expect("open");

        sink.write_batch(batch.clone()).expect("write");
        sink.write_batch(batch).expect("write");
        sink.close().expect("close");

        assert_eq!(handle.batches().len(), 2);
        assert_eq!(handle.total_rows(), 6);
    }
}
