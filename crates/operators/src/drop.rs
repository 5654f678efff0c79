use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use async_trait::async_trait;
use weir_common::{Result, WeirError};

use crate::context::OperatorContext;
use crate::operator::Operator;

/// Removes the named columns; remaining columns are shared by reference.
pub struct Drop {
    columns: HashSet<String>,
}

impl Drop {
    /// Create a drop from the column names to remove.
    pub fn new(columns: impl IntoIterator<Item = String>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Operator for Drop {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<()> {
        Ok(())
    }

    async fn process_batch(&mut self, batch: RecordBatch) -> Result<Vec<RecordBatch>> {
        let schema = batch.schema();
        let mut fields: Vec<Field> = Vec::new();
        let mut arrays: Vec<ArrayRef> = Vec::new();
        for (i, f) in schema.fields().iter().enumerate() {
            if self.columns.contains(f.name()) {
                continue;
            }
            fields.push(f.as_ref().clone());
            arrays.push(batch.column(i).clone());
        }

        // Dropping every column still yields a batch with the row count.
        let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
        let result = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)
            .map_err(|e| WeirError::Execution(format!("drop: {e}")))?;
        Ok(vec![result])
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Drop;
    use crate::operator::Operator;
    use crate::test_util::{int64_array, make_batch, test_ctx};

    #[tokio::test]
    async fn drops_named_columns() {
        let batch = make_batch(vec![
            ("a", int64_array(&[1, 2])),
            ("b", int64_array(&[3, 4])),
            ("c", int64_array(&[5, 6])),
        ]);

        let mut drop = Drop::new(["b".to_string()]);
        drop.open(&test_ctx()).expect("open");

        let results = drop.process_batch(batch).await.expect("process");
        let out = &results[0];
        assert_eq!(out.num_columns(), 2);
        assert_eq!(out.schema().field(0).name(), "a");
        assert_eq!(out.schema().field(1).name(), "c");
        assert_eq!(out.num_rows(), 2);
    }

    #[tokio::test]
    async fn dropping_all_columns_keeps_row_count() {
        let batch = make_batch(vec![("only", int64_array(&[1, 2, 3]))]);

        let mut drop = Drop::new(["only".to_string()]);
        drop.open(&test_ctx()).expect("open");

        let results = drop.process_batch(batch).await.expect("process");
        assert_eq!(results[0].num_columns(), 0);
        assert_eq!(results[0].num_rows(), 3);
    }
}
