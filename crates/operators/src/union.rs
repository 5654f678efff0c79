use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use weir_common::Result;

use crate::context::OperatorContext;
use crate::operator::Operator;

/// Merges batches from multiple inputs in arrival order.
///
/// The engine feeds every input channel into the same operator task, so
/// Union itself is a pass-through.
pub struct Union;

impl Union {
    /// Create a union operator.
    pub fn new() -> Self {
        Self
    }
}

impl Default for Union {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for Union {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<()> {
        Ok(())
    }

    async fn process_batch(&mut self, batch: RecordBatch) -> Result<Vec<RecordBatch>> {
        Ok(vec![batch])
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
