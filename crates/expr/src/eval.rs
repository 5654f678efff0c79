//! SQL scalar-expression evaluation against Arrow record batches.
//!
//! Expressions are parsed with sqlparser (wrapped in a `SELECT`, first
//! projection extracted) and dispatched to Arrow compute kernels where one
//! exists, with row-wise builder loops for the constructs Arrow has no
//! kernel for (CASE, COALESCE, string functions, REGEXP_EXTRACT).

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{
    make_builder, new_null_array, Array, ArrayBuilder, ArrayRef, BooleanArray, BooleanBuilder,
    Float32Array, Float64Array, Float64Builder, Int16Array, Int32Array, Int32Builder, Int64Array,
    Int64Builder, Int8Array, StringArray, StringBuilder,
};
use arrow::compute;
use arrow::compute::kernels::{cmp, numeric};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use regex::Regex;
use sqlparser::ast::{
    BinaryOperator, Expr as SqlExpr, Function, FunctionArg, FunctionArgExpr, FunctionArguments,
    SelectItem, SetExpr, Statement, UnaryOperator, Value,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::coerce::coerce_pair;
use crate::error::EvalError;

type Result<T> = std::result::Result<T, EvalError>;

/// Evaluates SQL scalar expressions against [`RecordBatch`]es.
///
/// Parsed ASTs are cached per expression text: operators evaluate the same
/// configured expression on every batch they see.
pub struct Evaluator {
    cache: HashMap<String, SqlExpr>,
}

impl Evaluator {
    /// Create an evaluator with an empty parse cache.
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Parse and evaluate a SQL expression against a batch.
    ///
    /// The returned column has the batch's row count and is owned by the
    /// caller.
    pub fn eval(&mut self, batch: &RecordBatch, expr_sql: &str) -> Result<ArrayRef> {
        let expr = self.parse_expr(expr_sql)?;
        eval_expr(batch, expr)
    }

    /// Evaluate a SQL expression that must produce a boolean column.
    pub fn eval_bool(&mut self, batch: &RecordBatch, expr_sql: &str) -> Result<BooleanArray> {
        let result = self.eval(batch, expr_sql)?;
        match result.as_any().downcast_ref::<BooleanArray>() {
            Some(bools) => Ok(bools.clone()),
            None => Err(EvalError::NotABooleanResult {
                text: expr_sql.to_string(),
                actual: result.data_type().to_string(),
            }),
        }
    }

    fn parse_expr(&mut self, expr_sql: &str) -> Result<&SqlExpr> {
        match self.cache.entry(expr_sql.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(parse_scalar_expr(expr_sql)?)),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a standalone SQL expression by wrapping it in a SELECT statement.
fn parse_scalar_expr(expr_sql: &str) -> Result<SqlExpr> {
    let parse_err = |message: String| EvalError::Parse {
        text: expr_sql.to_string(),
        message,
    };

    let statements = Parser::parse_sql(&GenericDialect {}, &format!("SELECT {expr_sql}"))
        .map_err(|e| parse_err(e.to_string()))?;
    let Some(Statement::Query(query)) = statements.into_iter().next() else {
        return Err(parse_err("expected a single query".to_string()));
    };
    let SetExpr::Select(select) = *query.body else {
        return Err(parse_err("expected a plain SELECT".to_string()));
    };
    match select.projection.into_iter().next() {
        Some(SelectItem::UnnamedExpr(expr)) | Some(SelectItem::ExprWithAlias { expr, .. }) => {
            Ok(expr)
        }
        _ => Err(parse_err("expected a scalar projection".to_string())),
    }
}

fn eval_expr(batch: &RecordBatch, expr: &SqlExpr) -> Result<ArrayRef> {
    match expr {
        SqlExpr::Identifier(ident) => eval_column_ref(batch, &ident.value),
        SqlExpr::CompoundIdentifier(parts) => {
            let name = parts.last().map(|p| p.value.as_str()).unwrap_or_default();
            eval_column_ref(batch, name)
        }
        SqlExpr::Value(value) => eval_literal(batch, value),
        SqlExpr::Nested(inner) => eval_expr(batch, inner),
        SqlExpr::BinaryOp { left, op, right } => eval_binary_op(batch, left, op, right),
        SqlExpr::UnaryOp { op, expr } => eval_unary_op(batch, op, expr),
        SqlExpr::IsNull(inner) => {
            let arr = eval_expr(batch, inner)?;
            Ok(Arc::new(compute::is_null(arr.as_ref())?))
        }
        SqlExpr::IsNotNull(inner) => {
            let arr = eval_expr(batch, inner)?;
            Ok(Arc::new(compute::is_not_null(arr.as_ref())?))
        }
        SqlExpr::Case {
            operand,
            conditions,
            results,
            else_result,
        } => eval_case(
            batch,
            operand.as_deref(),
            conditions,
            results,
            else_result.as_deref(),
        ),
        SqlExpr::Function(func) => eval_func_call(batch, func),
        // TRIM and SUBSTRING have dedicated AST forms rather than plain calls.
        SqlExpr::Trim {
            expr,
            trim_where,
            trim_what,
            trim_characters,
        } => {
            if trim_where.is_some() || trim_what.is_some() || trim_characters.is_some() {
                return Err(EvalError::UnsupportedFunction(
                    "TRIM with position or custom characters".to_string(),
                ));
            }
            let arg = eval_expr(batch, expr)?;
            Ok(string_map(&arg, |s| s.trim().to_string()))
        }
        SqlExpr::Substring {
            expr,
            substring_from,
            substring_for,
            ..
        } => eval_substring(
            batch,
            expr,
            substring_from.as_deref(),
            substring_for.as_deref(),
        ),
        other => Err(EvalError::UnsupportedExpression(other.to_string())),
    }
}

// ── Column references and literals ──────────────────────────────────

fn eval_column_ref(batch: &RecordBatch, name: &str) -> Result<ArrayRef> {
    // index_of resolves to the first field with a matching name.
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| EvalError::ColumnNotFound(name.to_string()))?;
    Ok(batch.column(idx).clone())
}

fn eval_literal(batch: &RecordBatch, value: &Value) -> Result<ArrayRef> {
    let num_rows = batch.num_rows();
    match value {
        Value::Number(text, _) => {
            if let Ok(v) = text.parse::<i64>() {
                Ok(Arc::new(Int64Array::from(vec![v; num_rows])))
            } else {
                let v = text.parse::<f64>().map_err(|e| EvalError::Parse {
                    text: text.clone(),
                    message: e.to_string(),
                })?;
                Ok(Arc::new(Float64Array::from(vec![v; num_rows])))
            }
        }
        Value::SingleQuotedString(s) | Value::DoubleQuotedString(s) => {
            Ok(Arc::new(StringArray::from(vec![s.as_str(); num_rows])))
        }
        Value::Boolean(b) => Ok(Arc::new(BooleanArray::from(vec![*b; num_rows]))),
        Value::Null => Ok(new_null_array(&DataType::Int64, num_rows)),
        other => Err(EvalError::UnsupportedExpression(format!("literal {other}"))),
    }
}

// ── Binary and unary operations ─────────────────────────────────────

fn eval_binary_op(
    batch: &RecordBatch,
    left: &SqlExpr,
    op: &BinaryOperator,
    right: &SqlExpr,
) -> Result<ArrayRef> {
    let left = eval_expr(batch, left)?;
    let right = eval_expr(batch, right)?;

    match op {
        BinaryOperator::And | BinaryOperator::Or => {
            let l = as_boolean(&left, "AND/OR")?;
            let r = as_boolean(&right, "AND/OR")?;
            let out = if matches!(op, BinaryOperator::And) {
                compute::and(l, r)?
            } else {
                compute::or(l, r)?
            };
            Ok(Arc::new(out))
        }
        _ => {
            let (l, r) = coerce_pair(&left, &right)?;
            match op {
                BinaryOperator::Eq => Ok(Arc::new(cmp::eq(&l, &r)?)),
                BinaryOperator::NotEq => Ok(Arc::new(cmp::neq(&l, &r)?)),
                BinaryOperator::Lt => Ok(Arc::new(cmp::lt(&l, &r)?)),
                BinaryOperator::LtEq => Ok(Arc::new(cmp::lt_eq(&l, &r)?)),
                BinaryOperator::Gt => Ok(Arc::new(cmp::gt(&l, &r)?)),
                BinaryOperator::GtEq => Ok(Arc::new(cmp::gt_eq(&l, &r)?)),
                BinaryOperator::Plus => Ok(numeric::add(&l, &r)?),
                BinaryOperator::Minus => Ok(numeric::sub(&l, &r)?),
                BinaryOperator::Multiply => Ok(numeric::mul(&l, &r)?),
                BinaryOperator::Divide => Ok(numeric::div(&l, &r)?),
                other => Err(EvalError::UnsupportedOperator(other.to_string())),
            }
        }
    }
}

fn eval_unary_op(batch: &RecordBatch, op: &UnaryOperator, expr: &SqlExpr) -> Result<ArrayRef> {
    let inner = eval_expr(batch, expr)?;
    match op {
        UnaryOperator::Not => {
            let bools = as_boolean(&inner, "NOT")?;
            Ok(Arc::new(compute::not(bools)?))
        }
        UnaryOperator::Minus => Ok(numeric::neg(inner.as_ref())?),
        other => Err(EvalError::UnsupportedOperator(other.to_string())),
    }
}

// ── CASE WHEN ───────────────────────────────────────────────────────

fn eval_case(
    batch: &RecordBatch,
    operand: Option<&SqlExpr>,
    conditions: &[SqlExpr],
    results: &[SqlExpr],
    else_result: Option<&SqlExpr>,
) -> Result<ArrayRef> {
    if operand.is_some() {
        return Err(EvalError::UnsupportedExpression(
            "CASE <operand> WHEN".to_string(),
        ));
    }

    // Evaluate all WHEN conditions and THEN values up front.
    let mut cond_arrays = Vec::with_capacity(conditions.len());
    let mut value_arrays = Vec::with_capacity(results.len());
    for (cond, value) in conditions.iter().zip(results) {
        cond_arrays.push(eval_expr(batch, cond)?);
        value_arrays.push(eval_expr(batch, value)?);
    }
    let else_array = else_result.map(|e| eval_expr(batch, e)).transpose()?;

    // The result type follows the first THEN value.
    let Some(first_value) = value_arrays.first() else {
        return Err(EvalError::UnsupportedExpression(
            "CASE without WHEN clauses".to_string(),
        ));
    };
    let result_type = first_value.data_type().clone();

    let num_rows = batch.num_rows();
    let mut builder = make_builder(&result_type, num_rows);
    for row in 0..num_rows {
        let mut matched = false;
        for (cond, value) in cond_arrays.iter().zip(&value_arrays) {
            let Some(flags) = cond.as_any().downcast_ref::<BooleanArray>() else {
                continue;
            };
            if !flags.is_null(row) && flags.value(row) {
                append_value(builder.as_mut(), value, row)?;
                matched = true;
                break;
            }
        }
        if !matched {
            match &else_array {
                Some(arr) => append_value(builder.as_mut(), arr, row)?,
                None => append_null(builder.as_mut())?,
            }
        }
    }

    Ok(builder.finish())
}

// ── Function calls ──────────────────────────────────────────────────

fn eval_func_call(batch: &RecordBatch, func: &Function) -> Result<ArrayRef> {
    let name = func.name.to_string().to_lowercase();
    let args = function_args(func)?;

    match name.as_str() {
        "upper" => {
            let arg = eval_expr(batch, single_arg("UPPER", &args)?)?;
            Ok(string_map(&arg, |s| s.to_uppercase()))
        }
        "lower" => {
            let arg = eval_expr(batch, single_arg("LOWER", &args)?)?;
            Ok(string_map(&arg, |s| s.to_lowercase()))
        }
        "trim" => {
            let arg = eval_expr(batch, single_arg("TRIM", &args)?)?;
            Ok(string_map(&arg, |s| s.trim().to_string()))
        }
        "concat" => eval_concat(batch, &args),
        "substring" | "substr" => {
            if args.len() < 2 || args.len() > 3 {
                return Err(EvalError::ArgCount {
                    function: "SUBSTRING",
                    expected: "2-3",
                    actual: args.len(),
                });
            }
            eval_substring(batch, args[0], Some(args[1]), args.get(2).copied())
        }
        "regexp_extract" => eval_regexp_extract(batch, &args),
        "coalesce" => eval_coalesce(batch, &args),
        other => Err(EvalError::UnsupportedFunction(other.to_string())),
    }
}

fn function_args<'a>(func: &'a Function) -> Result<Vec<&'a SqlExpr>> {
    let FunctionArguments::List(list) = &func.args else {
        return Err(EvalError::UnsupportedExpression(format!(
            "argument form of function {}",
            func.name
        )));
    };
    list.args
        .iter()
        .map(|arg| match arg {
            FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => Ok(e),
            other => Err(EvalError::UnsupportedExpression(format!(
                "function argument {other}"
            ))),
        })
        .collect()
}

fn single_arg<'a>(function: &'static str, args: &[&'a SqlExpr]) -> Result<&'a SqlExpr> {
    match args {
        [only] => Ok(*only),
        _ => Err(EvalError::ArgCount {
            function,
            expected: "1",
            actual: args.len(),
        }),
    }
}

fn eval_concat(batch: &RecordBatch, args: &[&SqlExpr]) -> Result<ArrayRef> {
    if args.len() < 2 {
        return Err(EvalError::ArgCount {
            function: "CONCAT",
            expected: "at least 2",
            actual: args.len(),
        });
    }

    let arrays = args
        .iter()
        .map(|arg| eval_expr(batch, arg))
        .collect::<Result<Vec<_>>>()?;

    let mut builder = StringBuilder::new();
    for row in 0..batch.num_rows() {
        // Any null argument nulls the whole row.
        if arrays.iter().any(|a| a.is_null(row)) {
            builder.append_null();
            continue;
        }
        let mut out = String::new();
        for arr in &arrays {
            out.push_str(&string_value(arr, row));
        }
        builder.append_value(out);
    }
    Ok(Arc::new(builder.finish()))
}

fn eval_substring(
    batch: &RecordBatch,
    str_expr: &SqlExpr,
    from: Option<&SqlExpr>,
    length: Option<&SqlExpr>,
) -> Result<ArrayRef> {
    let Some(from) = from else {
        return Err(EvalError::ArgCount {
            function: "SUBSTRING",
            expected: "2-3",
            actual: 1,
        });
    };

    let strings = eval_expr(batch, str_expr)?;
    let starts = eval_expr(batch, from)?;
    let lengths = length.map(|e| eval_expr(batch, e)).transpose()?;

    let mut builder = StringBuilder::new();
    for row in 0..strings.len() {
        if strings.is_null(row) {
            builder.append_null();
            continue;
        }
        let s = string_value(&strings, row);
        let chars: Vec<char> = s.chars().collect();
        // SQL substrings are 1-indexed; out-of-bounds values clamp.
        let start = (int_value(&starts, row) - 1).max(0) as usize;
        if start > chars.len() {
            builder.append_value("");
            continue;
        }
        let piece: String = match &lengths {
            Some(lengths) => {
                let len = int_value(lengths, row).max(0) as usize;
                chars[start..].iter().take(len).collect()
            }
            None => chars[start..].iter().collect(),
        };
        builder.append_value(piece);
    }
    Ok(Arc::new(builder.finish()))
}

fn eval_regexp_extract(batch: &RecordBatch, args: &[&SqlExpr]) -> Result<ArrayRef> {
    if args.len() != 3 {
        return Err(EvalError::ArgCount {
            function: "REGEXP_EXTRACT",
            expected: "3 (col, pattern, group)",
            actual: args.len(),
        });
    }

    let strings = eval_expr(batch, args[0])?;
    if strings.is_empty() {
        return Ok(Arc::new(StringBuilder::new().finish()));
    }
    let patterns = eval_expr(batch, args[1])?;
    let groups = eval_expr(batch, args[2])?;

    // Pattern and group are taken from row 0 and treated as constants
    // across the batch.
    let pattern = string_value(&patterns, 0);
    let group = usize::try_from(int_value(&groups, 0)).ok();

    let re = Regex::new(&pattern).map_err(|e| EvalError::RegexCompile {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;

    let mut builder = StringBuilder::new();
    for row in 0..strings.len() {
        if strings.is_null(row) {
            builder.append_null();
            continue;
        }
        let s = string_value(&strings, row);
        let captured = re
            .captures(&s)
            .and_then(|caps| group.and_then(|g| caps.get(g)));
        match captured {
            Some(m) => builder.append_value(m.as_str()),
            None => builder.append_null(),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn eval_coalesce(batch: &RecordBatch, args: &[&SqlExpr]) -> Result<ArrayRef> {
    if args.is_empty() {
        return Err(EvalError::ArgCount {
            function: "COALESCE",
            expected: "at least 1",
            actual: 0,
        });
    }

    let arrays = args
        .iter()
        .map(|arg| eval_expr(batch, arg))
        .collect::<Result<Vec<_>>>()?;

    // The result type follows the first argument.
    let result_type = arrays[0].data_type().clone();
    let mut builder = make_builder(&result_type, batch.num_rows());
    for row in 0..batch.num_rows() {
        match arrays.iter().find(|a| !a.is_null(row)) {
            Some(arr) => append_value(builder.as_mut(), arr, row)?,
            None => append_null(builder.as_mut())?,
        }
    }
    Ok(builder.finish())
}

// ── String and row-value helpers ────────────────────────────────────

fn as_boolean<'a>(arr: &'a ArrayRef, context: &str) -> Result<&'a BooleanArray> {
    arr.as_any()
        .downcast_ref::<BooleanArray>()
        .ok_or_else(|| {
            EvalError::Coercion(format!(
                "{context} requires boolean inputs, got {}",
                arr.data_type()
            ))
        })
}

/// Apply a string function element-wise, coercing non-string inputs through
/// their textual form. Nulls propagate.
fn string_map(arr: &ArrayRef, f: impl Fn(&str) -> String) -> ArrayRef {
    let mut builder = StringBuilder::new();
    for row in 0..arr.len() {
        if arr.is_null(row) {
            builder.append_null();
        } else {
            builder.append_value(f(&string_value(arr, row)));
        }
    }
    Arc::new(builder.finish())
}

/// Append `src[row]` to a dynamically-typed builder.
fn append_value(builder: &mut dyn ArrayBuilder, src: &ArrayRef, row: usize) -> Result<()> {
    if src.is_null(row) {
        return append_null(builder);
    }
    if let Some(b) = builder.as_any_mut().downcast_mut::<Int64Builder>() {
        b.append_value(int_value(src, row));
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<Int32Builder>() {
        b.append_value(int_value(src, row) as i32);
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<Float64Builder>() {
        b.append_value(float_value(src, row));
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<StringBuilder>() {
        b.append_value(string_value(src, row));
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<BooleanBuilder>() {
        b.append_value(bool_value(src, row));
    } else {
        return Err(EvalError::UnsupportedExpression(format!(
            "row-wise result of type {}",
            src.data_type()
        )));
    }
    Ok(())
}

fn append_null(builder: &mut dyn ArrayBuilder) -> Result<()> {
    if let Some(b) = builder.as_any_mut().downcast_mut::<Int64Builder>() {
        b.append_null();
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<Int32Builder>() {
        b.append_null();
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<Float64Builder>() {
        b.append_null();
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<StringBuilder>() {
        b.append_null();
    } else if let Some(b) = builder.as_any_mut().downcast_mut::<BooleanBuilder>() {
        b.append_null();
    } else {
        return Err(EvalError::UnsupportedExpression(
            "row-wise null append for unsupported builder".to_string(),
        ));
    }
    Ok(())
}

fn int_value(arr: &ArrayRef, row: usize) -> i64 {
    let any = arr.as_any();
    if let Some(a) = any.downcast_ref::<Int64Array>() {
        a.value(row)
    } else if let Some(a) = any.downcast_ref::<Int32Array>() {
        a.value(row) as i64
    } else if let Some(a) = any.downcast_ref::<Int16Array>() {
        a.value(row) as i64
    } else if let Some(a) = any.downcast_ref::<Int8Array>() {
        a.value(row) as i64
    } else if let Some(a) = any.downcast_ref::<Float64Array>() {
        a.value(row) as i64
    } else if let Some(a) = any.downcast_ref::<Float32Array>() {
        a.value(row) as i64
    } else {
        0
    }
}

fn float_value(arr: &ArrayRef, row: usize) -> f64 {
    let any = arr.as_any();
    if let Some(a) = any.downcast_ref::<Float64Array>() {
        a.value(row)
    } else if let Some(a) = any.downcast_ref::<Float32Array>() {
        a.value(row) as f64
    } else if let Some(a) = any.downcast_ref::<Int64Array>() {
        a.value(row) as f64
    } else if let Some(a) = any.downcast_ref::<Int32Array>() {
        a.value(row) as f64
    } else {
        0.0
    }
}

fn string_value(arr: &ArrayRef, row: usize) -> String {
    let any = arr.as_any();
    if let Some(a) = any.downcast_ref::<StringArray>() {
        a.value(row).to_string()
    } else if let Some(a) = any.downcast_ref::<Int64Array>() {
        a.value(row).to_string()
    } else if let Some(a) = any.downcast_ref::<Int32Array>() {
        a.value(row).to_string()
    } else if let Some(a) = any.downcast_ref::<Float64Array>() {
        a.value(row).to_string()
    } else if let Some(a) = any.downcast_ref::<Float32Array>() {
        a.value(row).to_string()
    } else if let Some(a) = any.downcast_ref::<BooleanArray>() {
        if a.value(row) {
            "true".to_string()
        } else {
            "false".to_string()
        }
    } else {
        String::new()
    }
}

fn bool_value(arr: &ArrayRef, row: usize) -> bool {
    arr.as_any()
        .downcast_ref::<BooleanArray>()
        .map(|a| a.value(row))
        .unwrap_or(false)
}
