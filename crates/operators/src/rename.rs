use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use weir_common::{Result, WeirError};

use crate::context::OperatorContext;
use crate::operator::Operator;

/// Renames columns per the configured mapping; columns are shared with the
/// input by reference.
pub struct Rename {
    columns: HashMap<String, String>,
}

impl Rename {
    /// Create a rename from `(old_name, new_name)` pairs.
    pub fn new(columns: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Operator for Rename {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<()> {
        Ok(())
    }

    async fn process_batch(&mut self, batch: RecordBatch) -> Result<Vec<RecordBatch>> {
        let schema = batch.schema();
        let fields = schema
            .fields()
            .iter()
            .map(|f| match self.columns.get(f.name()) {
                Some(new_name) => Field::new(new_name, f.data_type().clone(), f.is_nullable()),
                None => f.as_ref().clone(),
            })
            .collect::<Vec<_>>();

        let result = RecordBatch::try_new(Arc::new(Schema::new(fields)), batch.columns().to_vec())
            .map_err(|e| WeirError::Execution(format!("rename: {e}")))?;
        Ok(vec![result])
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
