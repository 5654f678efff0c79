use arrow::array::{Array, BooleanArray, BooleanBuilder};
use arrow::compute::filter_record_batch;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;
use weir_common::{Result, WeirError};
use weir_expr::Evaluator;

use crate::context::OperatorContext;
use crate::operator::Operator;

/// One Route branch: a condition and an optional downstream channel.
pub struct RouteBranch {
    /// SQL boolean condition claiming rows for this branch.
    pub condition: String,
    /// Channel receiving the claimed rows; `None` drops them.
    pub output: Option<mpsc::Sender<RecordBatch>>,
}

/// Splits each batch across branch channels by condition.
///
/// Branches are evaluated in order and each row goes to the first branch
/// whose condition is true and non-null. Unclaimed rows are returned from
/// `process_batch` as the default output.
pub struct Route {
    branches: Vec<RouteBranch>,
    eval: Evaluator,
}

impl Route {
    /// Create a route over the given branches.
    pub fn new(branches: Vec<RouteBranch>) -> Self {
        Self {
            branches,
            eval: Evaluator::new(),
        }
    }
}

#[async_trait]
impl Operator for Route {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<()> {
        Ok(())
    }

    async fn process_batch(&mut self, batch: RecordBatch) -> Result<Vec<RecordBatch>> {
        let num_rows = batch.num_rows();
        let mut routed = vec![false; num_rows];

        for branch in &self.branches {
            let mask = self
                .eval
                .eval_bool(&batch, &branch.condition)
                .map_err(|e| {
                    WeirError::Expression(format!(
                        "route condition {:?}: {e}",
                        branch.condition
                    ))
                })?;

            // Claim rows that match and were not taken by an earlier branch.
            let mut effective = BooleanBuilder::with_capacity(num_rows);
            let mut any_match = false;
            for row in 0..num_rows {
                let claimed = !routed[row] && !mask.is_null(row) && mask.value(row);
                effective.append_value(claimed);
                if claimed {
                    routed[row] = true;
                    any_match = true;
                }
            }

            let Some(output) = &branch.output else {
                continue;
            };
            if !any_match {
                continue;
            }

            let claimed = filter_record_batch(&batch, &effective.finish())
                .map_err(|e| WeirError::Execution(format!("route: {e}")))?;
            if claimed.num_rows() > 0 && output.send(claimed).await.is_err() {
                debug!(condition = %branch.condition, "route branch receiver dropped");
            }
        }

        if routed.iter().all(|claimed| *claimed) {
            return Ok(vec![]);
        }

        let unmatched: BooleanArray = routed.iter().map(|claimed| Some(!claimed)).collect();
        let rest = filter_record_batch(&batch, &unmatched)
            .map_err(|e| WeirError::Execution(format!("route: {e}")))?;
        if rest.num_rows() == 0 {
            return Ok(vec![]);
        }
        Ok(vec![rest])
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::Int64Array;
    use tokio::sync::mpsc;

    use super::{Route, RouteBranch};
    use crate::operator::Operator;
    use crate::test_util::{int64_array, make_batch, test_ctx};

    #[tokio::test]
    async fn splits_rows_between_branch_and_default() {
        let batch = make_batch(vec![("val", int64_array(&[10, 50, 20, 80]))]);

        let (tx, mut rx) = mpsc::channel(10);
        let mut route = Route::new(vec![RouteBranch {
            condition: "val > 30".to_string(),
            output: Some(tx),
        }]);
        route.open(&test_ctx()).expect("open");

        let results = route.process_batch(batch).await.expect("process");

        let routed = rx.try_recv().expect("routed batch");
        assert_eq!(routed.num_rows(), 2);
        let vals = routed
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("int64");
        assert_eq!(vals.value(0), 50);
        assert_eq!(vals.value(1), 80);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].num_rows(), 2);
        let rest = results[0]
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("int64");
        assert_eq!(rest.value(0), 10);
        assert_eq!(rest.value(1), 20);
    }

    #[tokio::test]
    async fn first_matching_branch_wins() {
        let batch = make_batch(vec![("val", int64_array(&[5, 60, 90]))]);

        let (high_tx, mut high_rx) = mpsc::channel(10);
        let (any_tx, mut any_rx) = mpsc::channel(10);
        let mut route = Route::new(vec![
            RouteBranch {
                condition: "val > 80".to_string(),
                output: Some(high_tx),
            },
            RouteBranch {
                condition: "val > 50".to_string(),
                output: Some(any_tx),
            },
        ]);
        route.open(&test_ctx()).expect("open");

        let results = route.process_batch(batch).await.expect("process");

        // 90 goes to the first branch, 60 only to the second.
        let high = high_rx.try_recv().expect("high batch");
        assert_eq!(high.num_rows(), 1);
        let any = any_rx.try_recv().expect("any batch");
        assert_eq!(any.num_rows(), 1);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].num_rows(), 1);
    }

    #[tokio::test]
    async fn fully_claimed_batches_have_no_default_output() {
        let batch = make_batch(vec![("val", int64_array(&[100, 200]))]);

        let (tx, mut rx) = mpsc::channel(10);
        let mut route = Route::new(vec![RouteBranch {
            condition: "val > 0".to_string(),
            output: Some(tx),
        }]);
        route.open(&test_ctx()).expect("open");

        let results = route.process_batch(batch).await.expect("process");
        assert!(results.is_empty());
        assert_eq!(rx.try_recv().expect("routed").num_rows(), 2);
    }
}
