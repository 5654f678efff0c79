//! Execution-plan model and binary plan loading for weir.
//!
//! Architecture role:
//! - defines the protobuf plan messages (pipeline, operators, edges, schemas)
//! - loads and deserializes plan files
//! - converts plan schemas to Arrow schemas for sources and validation

pub mod loader;
pub mod model;
pub mod schema;

pub use loader::{deserialize_plan, load_plan, serialize_plan};
pub use model::{
    CastColumnConfig, CastConfig, ColumnType, ConsoleConfig, DropConfig, Edge, ExecutionPlan,
    FilterConfig, FlatMapConfig, GeneratorConfig, MapConfig, OperatorNode, OperatorType,
    PipelineMode, RenameConfig, RouteBranchConfig, RouteConfig, Schema, SchemaField,
    ShuffleStrategy,
};
