//! Plan file loading and binary deserialization.

use std::path::Path;

use prost::Message;
use weir_common::{Result, WeirError};

use crate::model::ExecutionPlan;

/// Read a serialized [`ExecutionPlan`] from a file path.
pub fn load_plan(path: impl AsRef<Path>) -> Result<ExecutionPlan> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| WeirError::PlanLoad(format!("read plan file {}: {e}", path.display())))?;
    deserialize_plan(&bytes)
}

/// Parse a serialized [`ExecutionPlan`] from bytes.
pub fn deserialize_plan(bytes: &[u8]) -> Result<ExecutionPlan> {
    ExecutionPlan::decode(bytes)
        .map_err(|e| WeirError::PlanLoad(format!("decode execution plan: {e}")))
}

/// Serialize an [`ExecutionPlan`] to its binary wire format.
pub fn serialize_plan(plan: &ExecutionPlan) -> Vec<u8> {
    plan.encode_to_vec()
}
