use thiserror::Error;

/// Canonical weir error taxonomy used across crates.
///
/// Classification guidance:
/// - [`WeirError::InvalidPlan`]: structural or typing violations discovered before execution
/// - [`WeirError::PlanLoad`]: plan file IO or protobuf decode failures
/// - [`WeirError::UnknownOperator`]: operator factory has no implementation for a descriptor
/// - [`WeirError::Expression`]: SQL expression parse/analysis/evaluation failures
/// - [`WeirError::Execution`]: runtime operator, channel, or data-shape failures
/// - [`WeirError::Unsupported`]: syntactically valid but intentionally unimplemented behavior
/// - [`WeirError::Io`]: raw filesystem/network IO failures from std APIs
#[derive(Debug, Error)]
pub enum WeirError {
    /// Plan failed structural validation.
    ///
    /// Examples:
    /// - missing pipeline name, empty operator list
    /// - duplicate/unknown operator ids, self-loops, cycles
    /// - producer/consumer schema mismatch on an edge
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Plan file could not be read or decoded.
    #[error("plan load error: {0}")]
    PlanLoad(String),

    /// Operator factory was handed a descriptor it cannot instantiate.
    #[error("unknown operator type: {0}")]
    UnknownOperator(String),

    /// SQL expression parse or evaluation failure.
    ///
    /// Examples:
    /// - unparsable expression text
    /// - unknown column, non-boolean filter condition
    /// - unsupported function or operator
    #[error("expression error: {0}")]
    Expression(String),

    /// Runtime execution failure after the plan was accepted.
    ///
    /// Examples:
    /// - operator batch processing failures
    /// - Arrow kernel/type mismatches at runtime
    #[error("execution error: {0}")]
    Execution(String),

    /// Valid request for behavior not implemented in the current version.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Transparent std IO failures.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Standard weir result alias.
pub type Result<T> = std::result::Result<T, WeirError>;
