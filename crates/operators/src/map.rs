use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use weir_common::{Result, WeirError};
use weir_expr::Evaluator;

use crate::context::OperatorContext;
use crate::operator::Operator;

/// Projects SQL expressions into a new batch, one column per entry.
///
/// Columns are emitted in sorted output-name order so the output schema is
/// deterministic regardless of configuration order.
pub struct Map {
    columns: BTreeMap<String, String>,
    eval: Evaluator,
}

impl Map {
    /// Create a map from `(output_name, sql_expression)` pairs.
    pub fn new(columns: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            eval: Evaluator::new(),
        }
    }
}

#[async_trait]
impl Operator for Map {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<()> {
        Ok(())
    }

    async fn process_batch(&mut self, batch: RecordBatch) -> Result<Vec<RecordBatch>> {
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());
        for (name, expr_sql) in &self.columns {
            let arr = self.eval.eval(&batch, expr_sql)?;
            fields.push(Field::new(name, arr.data_type().clone(), true));
            arrays.push(arr);
        }

        let result = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(|e| WeirError::Execution(format!("map: {e}")))?;
        Ok(vec![result])
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, Int64Array, StringArray};

    use super::Map;
    use crate::operator::Operator;
    use crate::test_util::{int64_array, make_batch, string_array, test_ctx};

    #[tokio::test]
    async fn projects_sorted_output_columns() {
        let batch = make_batch(vec![
            ("price", int64_array(&[10, 20, 30])),
            ("name", string_array(&["a", "b", "c"])),
        ]);

        let mut map = Map::new([
            ("upper_name".to_string(), "UPPER(name)".to_string()),
            ("double_price".to_string(), "price * 2".to_string()),
        ]);
        map.open(&test_ctx()).expect("open");

        let results = map.process_batch(batch).await.expect("process");
        assert_eq!(results.len(), 1);
        let out = &results[0];
        assert_eq!(out.num_rows(), 3);
        assert_eq!(out.num_columns(), 2);

        // Output names are sorted, independent of configuration order.
        assert_eq!(out.schema().field(0).name(), "double_price");
        assert_eq!(out.schema().field(1).name(), "upper_name");

        let prices = out
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("int64");
        assert_eq!(
            (0..3).map(|i| prices.value(i)).collect::<Vec<_>>(),
            vec![20, 40, 60]
        );

        let names = out
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("utf8");
        assert_eq!(
            (0..3).map(|i| names.value(i)).collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );
    }

    #[tokio::test]
    async fn bad_expression_fails_the_batch() {
        let batch = make_batch(vec![("x", int64_array(&[1]))]);

        let mut map = Map::new([("y".to_string(), "missing_col + 1".to_string())]);
        map.open(&test_ctx()).expect("open");

        assert!(map.process_batch(batch).await.is_err());
    }
}
