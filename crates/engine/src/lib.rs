//! Execution engine for weir pipeline plans.
//!
//! Architecture role:
//! - validates plan structure (ids, edges, cycles, schema compatibility)
//! - builds the operator DAG through a caller-provided factory
//! - fuses linear FORWARD chains into single cooperative tasks
//! - wires bounded channels and drives batches until sources finish or the
//!   shutdown token fires

pub mod engine;
pub mod shutdown;
pub mod validator;

pub use engine::{Engine, OperatorFactory, OperatorKind};
pub use shutdown::run_with_graceful_shutdown;
pub use validator::{validate_plan, ValidationError};
