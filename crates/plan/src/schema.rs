//! Plan-schema to Arrow schema conversion.

use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, TimeUnit};
use weir_common::{Result, WeirError};

use crate::model::{ColumnType, Schema};

/// Map a plan column type to its Arrow data type.
pub fn column_type_to_arrow(t: ColumnType) -> Result<DataType> {
    match t {
        ColumnType::Int8 => Ok(DataType::Int8),
        ColumnType::Int16 => Ok(DataType::Int16),
        ColumnType::Int32 => Ok(DataType::Int32),
        ColumnType::Int64 => Ok(DataType::Int64),
        ColumnType::Float32 => Ok(DataType::Float32),
        ColumnType::Float64 => Ok(DataType::Float64),
        ColumnType::String => Ok(DataType::Utf8),
        ColumnType::Boolean => Ok(DataType::Boolean),
        ColumnType::TimestampMs => Ok(DataType::Timestamp(TimeUnit::Millisecond, None)),
        ColumnType::TimestampUs => Ok(DataType::Timestamp(TimeUnit::Microsecond, None)),
        ColumnType::Unspecified => Err(WeirError::Unsupported(
            "unspecified column type".to_string(),
        )),
    }
}

/// Convert a plan schema to an Arrow schema.
pub fn to_arrow(schema: &Schema) -> Result<ArrowSchema> {
    let fields = schema
        .fields
        .iter()
        .map(|f| {
            let dt = column_type_to_arrow(f.column_type())
                .map_err(|e| WeirError::InvalidPlan(format!("field {:?}: {e}", f.name)))?;
            Ok(Field::new(&f.name, dt, f.nullable))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ArrowSchema::new(fields))
}
