use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arrow::array::{
    make_builder, ArrayBuilder, ArrayRef, BooleanBuilder, Float32Builder, Float64Builder,
    Int32Builder, Int64Builder, StringBuilder, TimestampMicrosecondBuilder,
    TimestampMillisecondBuilder,
};
use arrow::datatypes::{DataType, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use weir_common::{Result, WeirError};
use weir_operators::{OperatorContext, Source};
use weir_plan::schema as plan_schema;
use weir_plan::Schema;

const DEFAULT_BATCH_SIZE: i64 = 1024;

/// Produces synthetic record batches at a configurable rate.
///
/// Column values are derived from a monotonically increasing row sequence:
/// integers carry the sequence itself, floats `seq * 1.1`, strings
/// `"{field}_{seq}"`, booleans the sequence parity, and timestamps the
/// current time offset by the sequence.
pub struct Generator {
    schema: Schema,
    rows_per_second: i64,
    max_rows: i64,
}

impl Generator {
    /// Create a generator for the given plan schema.
    ///
    /// `rows_per_second <= 0` falls back to 1000; `max_rows == 0` runs
    /// unbounded.
    pub fn new(schema: Schema, rows_per_second: i64, max_rows: i64) -> Self {
        Self {
            schema,
            rows_per_second,
            max_rows,
        }
    }
}

#[async_trait]
impl Source for Generator {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<()> {
        Ok(())
    }

    async fn run(&mut self, ctx: &OperatorContext, out: mpsc::Sender<RecordBatch>) -> Result<()> {
        let arrow_schema = Arc::new(
            plan_schema::to_arrow(&self.schema)
                .map_err(|e| WeirError::Execution(format!("generator: build schema: {e}")))?,
        );

        let rps = if self.rows_per_second <= 0 {
            1000
        } else {
            self.rows_per_second
        };
        let batch_size = DEFAULT_BATCH_SIZE.min(rps);
        // The tick spacing keeps the configured rate once the batch has been
        // shrunk to it; the clamp bounds the wait for degenerate configs.
        let tick = Duration::from_secs_f64(batch_size as f64 / rps as f64)
            .min(Duration::from_secs(1));
        let mut ticker = interval_at(Instant::now() + tick, tick);

        let mut total_emitted: i64 = 0;
        let mut seq: i64 = 0;

        loop {
            tokio::select! {
                _ = ctx.cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }

            let mut rows = batch_size;
            if self.max_rows > 0 {
                let left = self.max_rows - total_emitted;
                if left <= 0 {
                    return Ok(());
                }
                rows = rows.min(left);
            }

            let batch = generate_batch(&arrow_schema, seq, rows as usize)?;
            tokio::select! {
                sent = out.send(batch) => {
                    if sent.is_err() {
                        // Downstream is gone; nothing left to produce for.
                        return Ok(());
                    }
                    total_emitted += rows;
                    seq += rows;
                    ctx.metrics.inc_batches();
                    ctx.metrics.inc_rows(rows as u64);
                }
                _ = ctx.cancel.cancelled() => return Ok(()),
            }

            if self.max_rows > 0 && total_emitted >= self.max_rows {
                return Ok(());
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn generate_batch(schema: &SchemaRef, start_seq: i64, num_rows: usize) -> Result<RecordBatch> {
    let mut builders: Vec<Box<dyn ArrayBuilder>> = schema
        .fields()
        .iter()
        .map(|f| make_builder(f.data_type(), num_rows))
        .collect();

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);

    for row in 0..num_rows {
        let seq = start_seq + row as i64;
        for (i, field) in schema.fields().iter().enumerate() {
            let builder = builders[i].as_mut();
            match field.data_type() {
                DataType::Int64 => {
                    downcast_builder::<Int64Builder>(builder)?.append_value(seq);
                }
                DataType::Int32 => {
                    downcast_builder::<Int32Builder>(builder)?.append_value(seq as i32);
                }
                DataType::Float64 => {
                    downcast_builder::<Float64Builder>(builder)?.append_value(seq as f64 * 1.1);
                }
                DataType::Float32 => {
                    downcast_builder::<Float32Builder>(builder)?.append_value(seq as f32 * 1.1);
                }
                DataType::Utf8 => {
                    downcast_builder::<StringBuilder>(builder)?
                        .append_value(format!("{}_{seq}", field.name()));
                }
                DataType::Boolean => {
                    downcast_builder::<BooleanBuilder>(builder)?.append_value(seq % 2 == 0);
                }
                DataType::Timestamp(TimeUnit::Millisecond, _) => {
                    downcast_builder::<TimestampMillisecondBuilder>(builder)?
                        .append_value(now_ms + seq);
                }
                DataType::Timestamp(TimeUnit::Microsecond, _) => {
                    downcast_builder::<TimestampMicrosecondBuilder>(builder)?
                        .append_value(now_ms * 1000 + seq);
                }
                other => {
                    return Err(WeirError::Unsupported(format!(
                        "generator column type {other}"
                    )));
                }
            }
        }
    }

    let arrays: Vec<ArrayRef> = builders.iter_mut().map(|b| b.finish()).collect();
    RecordBatch::try_new(schema.clone(), arrays)
        .map_err(|e| WeirError::Execution(format!("generator: {e}")))
}

fn downcast_builder<T: 'static>(builder: &mut dyn ArrayBuilder) -> Result<&mut T> {
    builder
        .as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| WeirError::Execution("generator: builder type mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, Int64Array, StringArray};
    use arrow::datatypes::DataType;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;
    use weir_operators::{OperatorContext, Source};
    use weir_plan::{ColumnType, Schema, SchemaField};

    use super::Generator;

    fn test_schema() -> Schema {
        Schema {
            fields: vec![
                SchemaField {
                    name: "id".to_string(),
                    column_type: ColumnType::Int64 as i32,
                    nullable: false,
                },
                SchemaField {
                    name: "name".to_string(),
                    column_type: ColumnType::String as i32,
                    nullable: false,
                },
            ],
        }
    }

    fn test_ctx(cancel: CancellationToken) -> OperatorContext {
        OperatorContext::new("gen", "generator", cancel)
    }

    #[tokio::test]
    async fn emits_max_rows_then_closes() {
        let mut gen = Generator::new(test_schema(), 100_000, 100);
        let ctx = test_ctx(CancellationToken::new());
        let (tx, mut rx) = mpsc::channel(16);

        let producer = tokio::spawn(async move { gen.run(&ctx, tx).await });

        let mut total = 0usize;
        let mut first_id = None;
        while let Some(batch) = rx.recv().await {
            assert_eq!(batch.schema().field(0).data_type(), &DataType::Int64);
            let ids = batch
                .column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .expect("int64");
            let names = batch
                .column(1)
                .as_any()
                .downcast_ref::<StringArray>()
                .expect("utf8");
            if first_id.is_none() && ids.len() > 0 {
                first_id = Some(ids.value(0));
                assert_eq!(names.value(0), format!("name_{}", ids.value(0)));
            }
            total += batch.num_rows();
        }
        producer.await.expect("join").expect("run");

        assert_eq!(total, 100);
        assert_eq!(first_id, Some(0));
    }

    #[tokio::test]
    async fn stops_promptly_on_cancellation() {
        let mut gen = Generator::new(test_schema(), 10, 0);
        let cancel = CancellationToken::new();
        let ctx = test_ctx(cancel.clone());
        let (tx, mut rx) = mpsc::channel(16);

        let producer = tokio::spawn(async move { gen.run(&ctx, tx).await });
        cancel.cancel();

        // Drain anything emitted before the cancel landed; the channel must
        // close once the source returns.
        while rx.recv().await.is_some() {}
        tokio::time::timeout(std::time::Duration::from_secs(5), producer)
            .await
            .expect("source should stop quickly")
            .expect("join")
            .expect("run");
    }
}
