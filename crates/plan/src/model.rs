//! Protobuf execution-plan model.
//!
//! Messages are hand-maintained in prost-generated style (field tags and
//! enum accessors) so the wire format stays stable protobuf while the crate
//! builds without a protoc step. Tags are part of the versioned format; never
//! reuse a retired tag.

/// A named pipeline: an operator DAG plus execution hints.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecutionPlan {
    /// Unique pipeline name, required.
    #[prost(string, tag = "1")]
    pub pipeline_name: String,
    /// Streaming or batch execution mode.
    #[prost(enumeration = "PipelineMode", tag = "2")]
    pub mode: i32,
    /// Default parallelism hint for operators without an explicit setting.
    #[prost(int32, tag = "3")]
    pub default_parallelism: i32,
    /// Operators keyed by unique id.
    #[prost(message, repeated, tag = "4")]
    pub operators: Vec<OperatorNode>,
    /// Directed edges between operator ids.
    #[prost(message, repeated, tag = "5")]
    pub edges: Vec<Edge>,
}

/// One operator in the plan DAG.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OperatorNode {
    /// Unique operator id within the plan.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Human-readable display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Operator type tag used by the factory.
    #[prost(enumeration = "OperatorType", tag = "3")]
    pub operator_type: i32,
    /// Declared input schema, if known at plan time.
    #[prost(message, optional, tag = "4")]
    pub input_schema: Option<Schema>,
    /// Declared output schema, if known at plan time.
    #[prost(message, optional, tag = "5")]
    pub output_schema: Option<Schema>,
    /// Type-specific configuration payload.
    #[prost(
        oneof = "operator_node::Config",
        tags = "10, 11, 12, 13, 14, 15, 16, 17, 18"
    )]
    pub config: Option<operator_node::Config>,
}

/// Nested types for [`OperatorNode`].
pub mod operator_node {
    /// Operator-type-specific configuration.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Config {
        /// Generator source settings.
        #[prost(message, tag = "10")]
        Generator(super::GeneratorConfig),
        /// Filter settings.
        #[prost(message, tag = "11")]
        Filter(super::FilterConfig),
        /// Map settings.
        #[prost(message, tag = "12")]
        Map(super::MapConfig),
        /// Route settings.
        #[prost(message, tag = "13")]
        Route(super::RouteConfig),
        /// Rename settings.
        #[prost(message, tag = "14")]
        Rename(super::RenameConfig),
        /// Drop settings.
        #[prost(message, tag = "15")]
        Drop(super::DropConfig),
        /// Cast settings.
        #[prost(message, tag = "16")]
        Cast(super::CastConfig),
        /// FlatMap settings.
        #[prost(message, tag = "17")]
        FlatMap(super::FlatMapConfig),
        /// Console sink settings.
        #[prost(message, tag = "18")]
        Console(super::ConsoleConfig),
    }
}

/// A directed edge between two operators.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Edge {
    /// Producer operator id.
    #[prost(string, tag = "1")]
    pub from_operator: String,
    /// Consumer operator id.
    #[prost(string, tag = "2")]
    pub to_operator: String,
    /// Data-distribution strategy on this edge.
    #[prost(enumeration = "ShuffleStrategy", tag = "3")]
    pub shuffle: i32,
}

/// Ordered list of named, typed fields.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Schema {
    /// Fields in column order.
    #[prost(message, repeated, tag = "1")]
    pub fields: Vec<SchemaField>,
}

/// A single schema field.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SchemaField {
    /// Field name; duplicate names resolve to the first match on lookup.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Column type.
    #[prost(enumeration = "ColumnType", tag = "2")]
    pub column_type: i32,
    /// Whether rows may be null in this column.
    #[prost(bool, tag = "3")]
    pub nullable: bool,
}

/// Generator source configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GeneratorConfig {
    /// Target emission rate; non-positive values fall back to 1000.
    #[prost(int64, tag = "1")]
    pub rows_per_second: i64,
    /// Stop after this many rows; zero means unbounded.
    #[prost(int64, tag = "2")]
    pub max_rows: i64,
}

/// Filter operator configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilterConfig {
    /// SQL boolean condition evaluated per row.
    #[prost(string, tag = "1")]
    pub condition: String,
}

/// Map operator configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MapConfig {
    /// Output column name to SQL expression.
    #[prost(map = "string, string", tag = "1")]
    pub exprs: ::std::collections::HashMap<String, String>,
}

/// One Route branch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteBranchConfig {
    /// Branch name, used for wiring and diagnostics.
    #[prost(string, tag = "1")]
    pub name: String,
    /// SQL boolean condition claiming rows for this branch.
    #[prost(string, tag = "2")]
    pub condition: String,
}

/// Route operator configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteConfig {
    /// Branches evaluated in order; first match wins.
    #[prost(message, repeated, tag = "1")]
    pub branches: Vec<RouteBranchConfig>,
}

/// Rename operator configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RenameConfig {
    /// Old column name to new column name.
    #[prost(map = "string, string", tag = "1")]
    pub renames: ::std::collections::HashMap<String, String>,
}

/// Drop operator configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DropConfig {
    /// Columns removed from the batch.
    #[prost(string, repeated, tag = "1")]
    pub columns: Vec<String>,
}

/// One Cast target.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CastColumnConfig {
    /// Column to convert.
    #[prost(string, tag = "1")]
    pub column: String,
    /// Target column type.
    #[prost(enumeration = "ColumnType", tag = "2")]
    pub target_type: i32,
}

/// Cast operator configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CastConfig {
    /// Per-column conversions; unlisted columns pass through.
    #[prost(message, repeated, tag = "1")]
    pub casts: Vec<CastColumnConfig>,
}

/// FlatMap operator configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FlatMapConfig {
    /// List-typed column to explode.
    #[prost(string, tag = "1")]
    pub column: String,
}

/// Console sink configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConsoleConfig {
    /// Print at most this many rows per batch; zero prints all.
    #[prost(int32, tag = "1")]
    pub max_rows: i32,
}

/// Pipeline execution mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PipelineMode {
    /// Unknown or unset.
    Unspecified = 0,
    /// Unbounded streaming execution.
    Streaming = 1,
    /// Bounded batch execution.
    Batch = 2,
}

/// Data-distribution strategy between an operator and its downstream.
///
/// Only `Forward` edges are eligible for operator fusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ShuffleStrategy {
    /// Unknown or unset.
    Unspecified = 0,
    /// One-to-one producer to consumer.
    Forward = 1,
    /// Hash partition by key.
    Hash = 2,
    /// Replicate to all downstream instances.
    Broadcast = 3,
    /// Round-robin redistribution.
    Rebalance = 4,
}

/// Operator type tag dispatched by the operator factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OperatorType {
    /// Unknown or unset.
    Unspecified = 0,
    /// Synthetic data generator source.
    GeneratorSource = 1,
    /// Row filter.
    Filter = 2,
    /// Column-expression projection.
    Map = 3,
    /// Conditional row routing.
    Route = 4,
    /// Column rename.
    Rename = 5,
    /// Column removal.
    Drop = 6,
    /// Column type conversion.
    Cast = 7,
    /// Multi-input pass-through union.
    Union = 8,
    /// List-column explosion.
    FlatMap = 9,
    /// Formatted stdout sink.
    ConsoleSink = 10,
}

/// Column types supported by the plan schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ColumnType {
    /// Unknown or unset.
    Unspecified = 0,
    /// Signed 8-bit integer.
    Int8 = 1,
    /// Signed 16-bit integer.
    Int16 = 2,
    /// Signed 32-bit integer.
    Int32 = 3,
    /// Signed 64-bit integer.
    Int64 = 4,
    /// 32-bit float.
    Float32 = 5,
    /// 64-bit float.
    Float64 = 6,
    /// UTF-8 string.
    String = 7,
    /// Boolean.
    Boolean = 8,
    /// Millisecond timestamp.
    TimestampMs = 9,
    /// Microsecond timestamp.
    TimestampUs = 10,
}
