use arrow::compute::filter_record_batch;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use weir_common::{Result, WeirError};
use weir_expr::Evaluator;

use crate::context::OperatorContext;
use crate::operator::Operator;

/// Keeps only the rows matching a SQL boolean condition.
pub struct Filter {
    condition: String,
    eval: Evaluator,
}

impl Filter {
    /// Create a filter from its SQL condition text.
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            eval: Evaluator::new(),
        }
    }
}

#[async_trait]
impl Operator for Filter {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<()> {
        Ok(())
    }

    async fn process_batch(&mut self, batch: RecordBatch) -> Result<Vec<RecordBatch>> {
        let mask = self.eval.eval_bool(&batch, &self.condition)?;
        let result = filter_record_batch(&batch, &mask)
            .map_err(|e| WeirError::Execution(format!("filter: {e}")))?;
        if result.num_rows() == 0 {
            return Ok(vec![]);
        }
        Ok(vec![result])
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, Int64Array};

    use super::Filter;
    use crate::operator::Operator;
    use crate::test_util::{int64_array, make_batch, string_array, test_ctx};

    #[tokio::test]
    async fn keeps_matching_rows() {
        let batch = make_batch(vec![
            ("amount", int64_array(&[50, 150, 100, 200])),
            ("country", string_array(&["US", "UK", "US", "CA"])),
        ]);

        let mut filter = Filter::new("amount > 100");
        filter.open(&test_ctx()).expect("open");

        let results = filter.process_batch(batch).await.expect("process");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].num_rows(), 2);

        let amounts = results[0]
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("int64");
        assert_eq!(amounts.value(0), 150);
        assert_eq!(amounts.value(1), 200);
        filter.close().expect("close");
    }

    #[tokio::test]
    async fn emits_nothing_without_matches() {
        let batch = make_batch(vec![("x", int64_array(&[1, 2, 3]))]);

        let mut filter = Filter::new("x > 100");
        filter.open(&test_ctx()).expect("open");

        let results = filter.process_batch(batch).await.expect("process");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn null_condition_rows_are_dropped() {
        let batch = make_batch(vec![(
            "v",
            std::sync::Arc::new(Int64Array::from(vec![Some(1), None, Some(3)])) as _,
        )]);

        let mut filter = Filter::new("v > 0");
        filter.open(&test_ctx()).expect("open");

        let results = filter.process_batch(batch).await.expect("process");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].num_rows(), 2);
    }

    #[tokio::test]
    async fn preserves_schema_across_sizes() {
        for size in [1usize, 100, 4096, 8192] {
            let vals: Vec<i64> = (0..size as i64).collect();
            let batch = make_batch(vec![("x", int64_array(&vals))]);
            let schema = batch.schema();

            let mut filter = Filter::new("x >= 0");
            filter.open(&test_ctx()).expect("open");

            let results = filter.process_batch(batch).await.expect("process");
            assert_eq!(results.len(), 1, "size={size}");
            assert_eq!(results[0].num_rows(), size);
            assert_eq!(results[0].schema(), schema);
        }
    }
}
