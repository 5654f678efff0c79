use std::sync::Arc;

use arrow::array::{
    make_builder, Array, ArrayBuilder, ArrayRef, BooleanArray, BooleanBuilder, Float32Array,
    Float64Array, Float64Builder, Int32Array, Int32Builder, Int64Array, Int64Builder, ListArray,
    StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use weir_common::{Result, WeirError};

use crate::context::OperatorContext;
use crate::operator::Operator;

/// Explodes a list column, replicating the other columns per element.
///
/// A row with a null list is dropped. The output schema replaces the list
/// column's type with its element type.
pub struct FlatMap {
    column: String,
}

impl FlatMap {
    /// Create a flat-map over the named list column.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

#[async_trait]
impl Operator for FlatMap {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<()> {
        Ok(())
    }

    async fn process_batch(&mut self, batch: RecordBatch) -> Result<Vec<RecordBatch>> {
        let schema = batch.schema();
        let unnest_idx = schema.index_of(&self.column).map_err(|_| {
            WeirError::Execution(format!("flatmap: column {:?} not found", self.column))
        })?;

        let list = batch
            .column(unnest_idx)
            .as_any()
            .downcast_ref::<ListArray>()
            .ok_or_else(|| {
                WeirError::Execution(format!(
                    "flatmap: column {:?} is not a list type, got {}",
                    self.column,
                    batch.column(unnest_idx).data_type()
                ))
            })?;
        let DataType::List(elem_field) = batch.column(unnest_idx).data_type() else {
            return Err(WeirError::Execution(format!(
                "flatmap: column {:?} has no list element type",
                self.column
            )));
        };

        let offsets = list.value_offsets();
        let values = list.values();
        let num_rows = batch.num_rows();

        let total: usize = (0..num_rows)
            .filter(|&row| !list.is_null(row))
            .map(|row| (offsets[row + 1] - offsets[row]) as usize)
            .sum();
        if total == 0 {
            return Ok(vec![]);
        }

        let fields: Vec<Field> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| {
                if i == unnest_idx {
                    Field::new(f.name(), elem_field.data_type().clone(), f.is_nullable())
                } else {
                    f.as_ref().clone()
                }
            })
            .collect();

        let mut builders: Vec<Box<dyn ArrayBuilder>> = fields
            .iter()
            .map(|f| make_builder(f.data_type(), total))
            .collect();

        for row in 0..num_rows {
            if list.is_null(row) {
                continue;
            }
            let start = offsets[row] as usize;
            let end = offsets[row + 1] as usize;
            for elem in start..end {
                for (col, builder) in builders.iter_mut().enumerate() {
                    if col == unnest_idx {
                        append_from_array(builder.as_mut(), values, elem)?;
                    } else {
                        append_from_array(builder.as_mut(), batch.column(col), row)?;
                    }
                }
            }
        }

        let arrays: Vec<ArrayRef> = builders.iter_mut().map(|b| b.finish()).collect();
        let result = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(|e| WeirError::Execution(format!("flatmap: {e}")))?;
        Ok(vec![result])
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Append `src[row]` to a builder of the matching type.
fn append_from_array(builder: &mut dyn ArrayBuilder, src: &ArrayRef, row: usize) -> Result<()> {
    let unsupported = || {
        WeirError::Execution(format!(
            "flatmap: unsupported column type {}",
            src.data_type()
        ))
    };

    if let Some(b) = builder.as_any_mut().downcast_mut::<Int64Builder>() {
        let a = src
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(unsupported)?;
        if a.is_null(row) {
            b.append_null();
        } else {
            b.append_value(a.value(row));
        }
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<Int32Builder>() {
        let a = src
            .as_any()
            .downcast_ref::<Int32Array>()
            .ok_or_else(unsupported)?;
        if a.is_null(row) {
            b.append_null();
        } else {
            b.append_value(a.value(row));
        }
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<Float64Builder>() {
        let a = src
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(unsupported)?;
        if a.is_null(row) {
            b.append_null();
        } else {
            b.append_value(a.value(row));
        }
    } else if let Some(b) = builder
        .as_any_mut()
        .downcast_mut::<arrow::array::Float32Builder>()
    {
        let a = src
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(unsupported)?;
        if a.is_null(row) {
            b.append_null();
        } else {
            b.append_value(a.value(row));
        }
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<StringBuilder>() {
        let a = src
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(unsupported)?;
        if a.is_null(row) {
            b.append_null();
        } else {
            b.append_value(a.value(row));
        }
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<BooleanBuilder>() {
        let a = src
            .as_any()
            .downcast_ref::<BooleanArray>()
            .ok_or_else(unsupported)?;
        if a.is_null(row) {
            b.append_null();
        } else {
            b.append_value(a.value(row));
        }
    } else {
        return Err(unsupported());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Array, Int64Array, ListArray, StringArray};
    use arrow::datatypes::{DataType, Field, Int64Type, Schema};
    use arrow::record_batch::RecordBatch;

    use super::FlatMap;
    use crate::operator::Operator;
    use crate::test_util::test_ctx;

    fn list_batch() -> RecordBatch {
        // Rows: ["a", [1,2]], ["b", null], ["c", [3,4,5]]
        let tags = ListArray::from_iter_primitive::<Int64Type, _, _>(vec![
            Some(vec![Some(1), Some(2)]),
            None,
            Some(vec![Some(3), Some(4), Some(5)]),
        ]);
        let schema = Schema::new(vec![
            Field::new("label", DataType::Utf8, false),
            Field::new(
                "tags",
                DataType::List(Arc::new(Field::new("item", DataType::Int64, true))),
                true,
            ),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["a", "b", "c"])),
                Arc::new(tags),
            ],
        )
        .expect("batch")
    }

    #[tokio::test]
    async fn explodes_list_rows() {
        let mut flatmap = FlatMap::new("tags");
        flatmap.open(&test_ctx()).expect("open");

        let results = flatmap.process_batch(list_batch()).await.expect("process");
        assert_eq!(results.len(), 1);
        let out = &results[0];

        // Two elements from row 0, null row dropped, three from row 2.
        assert_eq!(out.num_rows(), 5);
        assert_eq!(out.schema().field(1).data_type(), &DataType::Int64);

        let labels = out
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("utf8");
        assert_eq!(
            (0..5).map(|i| labels.value(i)).collect::<Vec<_>>(),
            vec!["a", "a", "c", "c", "c"]
        );

        let tags = out
            .column(1)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("int64");
        assert_eq!(
            (0..5).map(|i| tags.value(i)).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[tokio::test]
    async fn all_null_lists_emit_nothing() {
        let tags = ListArray::from_iter_primitive::<Int64Type, _, _>(vec![
            None::<Vec<Option<i64>>>,
            None,
        ]);
        let schema = Schema::new(vec![Field::new(
            "tags",
            DataType::List(Arc::new(Field::new("item", DataType::Int64, true))),
            true,
        )]);
        let batch =
            RecordBatch::try_new(Arc::new(schema), vec![Arc::new(tags)]).expect("batch");

        let mut flatmap = FlatMap::new("tags");
        flatmap.open(&test_ctx()).expect("open");

        let results = flatmap.process_batch(batch).await.expect("process");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn non_list_column_is_an_error() {
        let mut flatmap = FlatMap::new("label");
        flatmap.open(&test_ctx()).expect("open");
        assert!(flatmap.process_batch(list_batch()).await.is_err());
    }

    #[tokio::test]
    async fn missing_column_is_an_error() {
        let mut flatmap = FlatMap::new("nope");
        flatmap.open(&test_ctx()).expect("open");
        assert!(flatmap.process_batch(list_batch()).await.is_err());
    }
}
