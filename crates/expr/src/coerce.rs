//! Numeric type promotion for binary kernels.

use arrow::array::{Array, ArrayRef};
use arrow::compute::cast;
use arrow::datatypes::DataType;

use crate::error::EvalError;

/// Promotion rank; the higher rank wins when the sides differ.
fn type_rank(t: &DataType) -> Option<u8> {
    match t {
        DataType::Int8 => Some(1),
        DataType::Int16 => Some(2),
        DataType::Int32 => Some(3),
        DataType::Int64 => Some(4),
        DataType::Float32 => Some(5),
        DataType::Float64 => Some(6),
        _ => None,
    }
}

/// Common type for two data types, if a numeric promotion is defined.
pub fn promote_type(a: &DataType, b: &DataType) -> Option<DataType> {
    let rank_a = type_rank(a)?;
    let rank_b = type_rank(b)?;
    if rank_a >= rank_b {
        Some(a.clone())
    } else {
        Some(b.clone())
    }
}

/// Promote two arrays to a common numeric type before a binary kernel.
///
/// Pairs without a defined promotion (for example string equality) are
/// returned untouched; the kernel decides whether it accepts them. Casts
/// propagate nulls.
pub fn coerce_pair(left: &ArrayRef, right: &ArrayRef) -> Result<(ArrayRef, ArrayRef), EvalError> {
    if left.data_type() == right.data_type() {
        return Ok((left.clone(), right.clone()));
    }

    let Some(target) = promote_type(left.data_type(), right.data_type()) else {
        return Ok((left.clone(), right.clone()));
    };

    let coerced_left = cast(left.as_ref(), &target)
        .map_err(|e| EvalError::Coercion(format!("cast left to {target}: {e}")))?;
    let coerced_right = cast(right.as_ref(), &target)
        .map_err(|e| EvalError::Coercion(format!("cast right to {target}: {e}")))?;
    Ok((coerced_left, coerced_right))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};
    use arrow::datatypes::DataType;

    use super::{coerce_pair, promote_type};

    #[test]
    fn promotes_to_higher_rank() {
        assert_eq!(
            promote_type(&DataType::Int32, &DataType::Int64),
            Some(DataType::Int64)
        );
        assert_eq!(
            promote_type(&DataType::Int64, &DataType::Float64),
            Some(DataType::Float64)
        );
        assert_eq!(
            promote_type(&DataType::Float32, &DataType::Int8),
            Some(DataType::Float32)
        );
        assert_eq!(promote_type(&DataType::Utf8, &DataType::Int64), None);
    }

    #[test]
    fn coerces_mixed_ints() {
        let left: ArrayRef = Arc::new(Int32Array::from(vec![1, 2]));
        let right: ArrayRef = Arc::new(Int64Array::from(vec![3, 4]));
        let (l, r) = coerce_pair(&left, &right).expect("coerce");
        assert_eq!(l.data_type(), &DataType::Int64);
        assert_eq!(r.data_type(), &DataType::Int64);
    }

    #[test]
    fn coerces_int_float_to_float() {
        let left: ArrayRef = Arc::new(Int64Array::from(vec![1, 2]));
        let right: ArrayRef = Arc::new(Float64Array::from(vec![0.5, 1.5]));
        let (l, r) = coerce_pair(&left, &right).expect("coerce");
        assert_eq!(l.data_type(), &DataType::Float64);
        assert_eq!(r.data_type(), &DataType::Float64);
    }

    #[test]
    fn leaves_non_numeric_pairs_untouched() {
        let left: ArrayRef = Arc::new(StringArray::from(vec!["a", "b"]));
        let right: ArrayRef = Arc::new(Int64Array::from(vec![1, 2]));
        let (l, r) = coerce_pair(&left, &right).expect("coerce");
        assert_eq!(l.data_type(), &DataType::Utf8);
        assert_eq!(r.data_type(), &DataType::Int64);
    }
}
