use arrow::error::ArrowError;
use thiserror::Error;
use weir_common::WeirError;

/// Expression parse and evaluation failures.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Expression text failed to parse as a SQL scalar expression.
    #[error("parse expression {text:?}: {message}")]
    Parse {
        /// Original expression text.
        text: String,
        /// Parser diagnostic.
        message: String,
    },

    /// Column reference did not resolve against the batch schema.
    #[error("column {0:?} not found in schema")]
    ColumnNotFound(String),

    /// Expression kind the evaluator does not handle.
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// Operator the evaluator does not handle.
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Function name the evaluator does not handle.
    #[error("unsupported function: {0}")]
    UnsupportedFunction(String),

    /// `eval_bool` got a non-boolean result column.
    #[error("expression {text:?} did not produce a boolean result, got {actual}")]
    NotABooleanResult {
        /// Original expression text.
        text: String,
        /// Actual result column type.
        actual: String,
    },

    /// REGEXP_EXTRACT pattern failed to compile.
    #[error("invalid regex pattern {pattern:?}: {message}")]
    RegexCompile {
        /// Offending pattern.
        pattern: String,
        /// Compiler diagnostic.
        message: String,
    },

    /// Function called with the wrong number of arguments.
    #[error("{function} requires {expected} arguments, got {actual}")]
    ArgCount {
        /// Function name.
        function: &'static str,
        /// Expected argument shape.
        expected: &'static str,
        /// Actual argument count.
        actual: usize,
    },

    /// Operand types could not be promoted to a common kernel type.
    #[error("type coercion failed: {0}")]
    Coercion(String),

    /// Arrow kernel failure.
    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

impl From<EvalError> for WeirError {
    fn from(e: EvalError) -> Self {
        WeirError::Expression(e.to_string())
    }
}
