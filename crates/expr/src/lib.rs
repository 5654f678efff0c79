//! SQL scalar-expression evaluation for weir operators.
//!
//! Architecture role:
//! - parses expression text into a sqlparser AST (cached per text)
//! - evaluates the AST against Arrow record batches, one result column out
//! - promotes mismatched numeric operand types before binary kernels

pub mod coerce;
pub mod error;
pub mod eval;

pub use error::EvalError;
pub use eval::Evaluator;
