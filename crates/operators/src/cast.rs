use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Float32Array, Float64Array, Float64Builder,
    Int16Array, Int32Array, Int64Array, Int64Builder, Int8Array, StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use weir_common::{Result, WeirError};

use crate::context::OperatorContext;
use crate::operator::Operator;

/// A column to convert and its target Arrow type.
#[derive(Debug, Clone)]
pub struct CastColumn {
    /// Column name.
    pub name: String,
    /// Target data type.
    pub target: DataType,
}

/// Converts the listed columns to new types element-wise.
///
/// Columns already at their target type, and columns not listed, pass
/// through by reference. The null mask is preserved.
pub struct Cast {
    columns: Vec<CastColumn>,
}

impl Cast {
    /// Create a cast over the given column conversions.
    pub fn new(columns: Vec<CastColumn>) -> Self {
        Self { columns }
    }
}

#[async_trait]
impl Operator for Cast {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<()> {
        Ok(())
    }

    async fn process_batch(&mut self, batch: RecordBatch) -> Result<Vec<RecordBatch>> {
        let cast_map: HashMap<&str, &DataType> = self
            .columns
            .iter()
            .map(|c| (c.name.as_str(), &c.target))
            .collect();

        let schema = batch.schema();
        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
        for (i, f) in schema.fields().iter().enumerate() {
            let col = batch.column(i);
            match cast_map.get(f.name().as_str()) {
                Some(target) if col.data_type() != *target => {
                    let converted = cast_array(col, target).map_err(|e| {
                        WeirError::Execution(format!(
                            "cast column {:?} to {target}: {e}",
                            f.name()
                        ))
                    })?;
                    fields.push(Field::new(f.name(), (*target).clone(), f.is_nullable()));
                    arrays.push(converted);
                }
                _ => {
                    fields.push(f.as_ref().clone());
                    arrays.push(col.clone());
                }
            }
        }

        let result = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(|e| WeirError::Execution(format!("cast: {e}")))?;
        Ok(vec![result])
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Element-wise conversion to the target type.
///
/// Numeric sources widen or truncate; numeric and boolean sources format to
/// text for string targets. String sources never convert to numeric types.
fn cast_array(arr: &ArrayRef, target: &DataType) -> Result<ArrayRef> {
    let len = arr.len();
    match target {
        DataType::Int64 => {
            let mut builder = Int64Builder::with_capacity(len);
            for i in 0..len {
                if arr.is_null(i) {
                    builder.append_null();
                } else {
                    builder.append_value(numeric_as_i64(arr, i)?);
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(len);
            for i in 0..len {
                if arr.is_null(i) {
                    builder.append_null();
                } else {
                    builder.append_value(numeric_as_f64(arr, i)?);
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Utf8 => {
            let mut builder = StringBuilder::new();
            for i in 0..len {
                if arr.is_null(i) {
                    builder.append_null();
                } else {
                    builder.append_value(value_as_string(arr, i)?);
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(len);
            for i in 0..len {
                if arr.is_null(i) {
                    builder.append_null();
                } else {
                    builder.append_value(value_as_bool(arr, i)?);
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        other => Err(WeirError::Unsupported(format!(
            "cast target type {other}"
        ))),
    }
}

fn numeric_as_i64(arr: &ArrayRef, i: usize) -> Result<i64> {
    let any = arr.as_any();
    if let Some(a) = any.downcast_ref::<Int8Array>() {
        Ok(a.value(i) as i64)
    } else if let Some(a) = any.downcast_ref::<Int16Array>() {
        Ok(a.value(i) as i64)
    } else if let Some(a) = any.downcast_ref::<Int32Array>() {
        Ok(a.value(i) as i64)
    } else if let Some(a) = any.downcast_ref::<Int64Array>() {
        Ok(a.value(i))
    } else if let Some(a) = any.downcast_ref::<Float32Array>() {
        Ok(a.value(i) as i64)
    } else if let Some(a) = any.downcast_ref::<Float64Array>() {
        Ok(a.value(i) as i64)
    } else {
        Err(WeirError::Unsupported(format!(
            "cast {} to a numeric type",
            arr.data_type()
        )))
    }
}

fn numeric_as_f64(arr: &ArrayRef, i: usize) -> Result<f64> {
    let any = arr.as_any();
    if let Some(a) = any.downcast_ref::<Int8Array>() {
        Ok(a.value(i) as f64)
    } else if let Some(a) = any.downcast_ref::<Int16Array>() {
        Ok(a.value(i) as f64)
    } else if let Some(a) = any.downcast_ref::<Int32Array>() {
        Ok(a.value(i) as f64)
    } else if let Some(a) = any.downcast_ref::<Int64Array>() {
        Ok(a.value(i) as f64)
    } else if let Some(a) = any.downcast_ref::<Float32Array>() {
        Ok(a.value(i) as f64)
    } else if let Some(a) = any.downcast_ref::<Float64Array>() {
        Ok(a.value(i))
    } else {
        Err(WeirError::Unsupported(format!(
            "cast {} to a numeric type",
            arr.data_type()
        )))
    }
}

fn value_as_string(arr: &ArrayRef, i: usize) -> Result<String> {
    let any = arr.as_any();
    if let Some(a) = any.downcast_ref::<StringArray>() {
        Ok(a.value(i).to_string())
    } else if let Some(a) = any.downcast_ref::<BooleanArray>() {
        Ok(if a.value(i) { "true" } else { "false" }.to_string())
    } else if let Some(a) = any.downcast_ref::<Int64Array>() {
        Ok(a.value(i).to_string())
    } else if let Some(a) = any.downcast_ref::<Int32Array>() {
        Ok(a.value(i).to_string())
    } else if let Some(a) = any.downcast_ref::<Float64Array>() {
        Ok(a.value(i).to_string())
    } else if let Some(a) = any.downcast_ref::<Float32Array>() {
        Ok(a.value(i).to_string())
    } else {
        Err(WeirError::Unsupported(format!(
            "cast {} to string",
            arr.data_type()
        )))
    }
}

fn value_as_bool(arr: &ArrayRef, i: usize) -> Result<bool> {
    let any = arr.as_any();
    if let Some(a) = any.downcast_ref::<BooleanArray>() {
        Ok(a.value(i))
    } else if let Some(a) = any.downcast_ref::<Int64Array>() {
        Ok(a.value(i) != 0)
    } else {
        Err(WeirError::Unsupported(format!(
            "cast {} to boolean",
            arr.data_type()
        )))
    }
}
