//! Operator lifecycle contract and built-in stateless operators.
//!
//! Architecture role:
//! - defines the [`Operator`] / [`Source`] / [`Sink`] lifecycle traits and
//!   the per-operator [`OperatorContext`]
//! - implements the stateless transformation set: Filter, Map, Route,
//!   Rename, Drop, Cast, Union, FlatMap
//!
//! Batch ownership: batches are `Arc`-backed; an operator consumes its
//! input, shares columns by cloning the `Arc`, and the last drop releases
//! the buffers.

pub mod cast;
pub mod context;
pub mod drop;
pub mod filter;
pub mod flatmap;
pub mod map;
pub mod operator;
pub mod rename;
pub mod route;
pub mod union;

pub use cast::{Cast, CastColumn};
pub use context::OperatorContext;
pub use drop::Drop;
pub use filter::Filter;
pub use flatmap::FlatMap;
pub use map::Map;
pub use operator::{CheckpointBarrier, Operator, Sink, Source, Watermark};
pub use rename::Rename;
pub use route::{Route, RouteBranch};
pub use union::Union;

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::Arc;

    use arrow::array::{Array, ArrayRef, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use tokio_util::sync::CancellationToken;

    use crate::context::OperatorContext;

    pub fn test_ctx() -> OperatorContext {
        OperatorContext::new("test-op", "test", CancellationToken::new())
    }

    pub fn make_batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        let fields = columns
            .iter()
            .map(|(name, arr)| Field::new(*name, arr.data_type().clone(), true))
            .collect::<Vec<_>>();
        let arrays = columns.into_iter().map(|(_, arr)| arr).collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).expect("batch")
    }

    pub fn int64_array(vals: &[i64]) -> ArrayRef {
        Arc::new(Int64Array::from(vals.to_vec()))
    }

    pub fn string_array(vals: &[&str]) -> ArrayRef {
        Arc::new(StringArray::from(vals.to_vec()))
    }
}
