//! Structural validation of execution plans.

use std::collections::HashMap;

use thiserror::Error;
use weir_common::WeirError;
use weir_plan::{ExecutionPlan, OperatorNode, Schema};

/// Plan validation failures, in check order.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The plan has no pipeline name.
    #[error("pipeline name is required")]
    MissingPipelineName,

    /// The plan has no operators.
    #[error("plan must contain at least one operator")]
    NoOperators,

    /// An operator has an empty id.
    #[error("operator has empty id")]
    EmptyOperatorId,

    /// Two operators share an id.
    #[error("duplicate operator id: {0}")]
    DuplicateOperatorId(String),

    /// An edge endpoint does not resolve to an operator.
    #[error("edge[{index}]: operator {id:?} does not exist")]
    UnknownOperator {
        /// Edge position in the plan.
        index: usize,
        /// Unresolved operator id.
        id: String,
    },

    /// An edge connects an operator to itself.
    #[error("edge[{index}]: self-loop on operator {id:?}")]
    SelfLoop {
        /// Edge position in the plan.
        index: usize,
        /// Looping operator id.
        id: String,
    },

    /// The operator graph contains a directed cycle.
    #[error("cycle detected: {0}")]
    CycleDetected(String),

    /// Producer and consumer schemas disagree on an edge.
    #[error("edge[{index}] ({from} -> {to}): schema mismatch: {detail}")]
    SchemaMismatch {
        /// Edge position in the plan.
        index: usize,
        /// Producer id.
        from: String,
        /// Consumer id.
        to: String,
        /// Field-level diagnostic.
        detail: String,
    },
}

impl From<ValidationError> for WeirError {
    fn from(e: ValidationError) -> Self {
        WeirError::InvalidPlan(e.to_string())
    }
}

/// Check the execution plan for structural integrity.
pub fn validate_plan(plan: &ExecutionPlan) -> Result<(), ValidationError> {
    if plan.pipeline_name.is_empty() {
        return Err(ValidationError::MissingPipelineName);
    }
    if plan.operators.is_empty() {
        return Err(ValidationError::NoOperators);
    }

    let mut operators: HashMap<&str, &OperatorNode> = HashMap::with_capacity(plan.operators.len());
    for op in &plan.operators {
        if op.id.is_empty() {
            return Err(ValidationError::EmptyOperatorId);
        }
        if operators.insert(op.id.as_str(), op).is_some() {
            return Err(ValidationError::DuplicateOperatorId(op.id.clone()));
        }
    }

    for (index, edge) in plan.edges.iter().enumerate() {
        if !operators.contains_key(edge.from_operator.as_str()) {
            return Err(ValidationError::UnknownOperator {
                index,
                id: edge.from_operator.clone(),
            });
        }
        if !operators.contains_key(edge.to_operator.as_str()) {
            return Err(ValidationError::UnknownOperator {
                index,
                id: edge.to_operator.clone(),
            });
        }
        if edge.from_operator == edge.to_operator {
            return Err(ValidationError::SelfLoop {
                index,
                id: edge.from_operator.clone(),
            });
        }
    }

    detect_cycles(plan)?;
    validate_schema_consistency(plan, &operators)?;
    Ok(())
}

/// Three-color DFS cycle check reporting the offending path.
fn detect_cycles(plan: &ExecutionPlan) -> Result<(), ValidationError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    fn dfs<'a>(
        node: &'a str,
        adj: &HashMap<&'a str, Vec<&'a str>>,
        color: &mut HashMap<&'a str, Color>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), ValidationError> {
        color.insert(node, Color::Gray);
        path.push(node);

        for &next in adj.get(node).into_iter().flatten() {
            match color.get(next).copied().unwrap_or(Color::White) {
                Color::Gray => {
                    // Report from the first occurrence to the repeated node.
                    let start = path.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle: Vec<&str> = path[start..].to_vec();
                    cycle.push(next);
                    return Err(ValidationError::CycleDetected(cycle.join(" -> ")));
                }
                Color::White => dfs(next, adj, color, path)?,
                Color::Black => {}
            }
        }

        path.pop();
        color.insert(node, Color::Black);
        Ok(())
    }

    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &plan.edges {
        adj.entry(edge.from_operator.as_str())
            .or_default()
            .push(edge.to_operator.as_str());
    }

    let mut color: HashMap<&str, Color> = plan
        .operators
        .iter()
        .map(|op| (op.id.as_str(), Color::White))
        .collect();
    let mut path: Vec<&str> = Vec::new();

    for op in &plan.operators {
        if color.get(op.id.as_str()).copied() == Some(Color::White) {
            dfs(op.id.as_str(), &adj, &mut color, &mut path)?;
        }
    }
    Ok(())
}

fn validate_schema_consistency(
    plan: &ExecutionPlan,
    operators: &HashMap<&str, &OperatorNode>,
) -> Result<(), ValidationError> {
    for (index, edge) in plan.edges.iter().enumerate() {
        let (Some(from), Some(to)) = (
            operators.get(edge.from_operator.as_str()),
            operators.get(edge.to_operator.as_str()),
        ) else {
            continue;
        };

        // Schemas are optional at plan time; unset sides skip the check.
        let (Some(output), Some(input)) = (&from.output_schema, &to.input_schema) else {
            continue;
        };

        if let Err(detail) = schemas_compatible(output, input) {
            return Err(ValidationError::SchemaMismatch {
                index,
                from: edge.from_operator.clone(),
                to: edge.to_operator.clone(),
                detail,
            });
        }
    }
    Ok(())
}

/// Field-wise comparison of length, order, name, and type.
///
/// Nullability is intentionally not compared: a producer may emit non-null
/// values into a nullable consumer field.
fn schemas_compatible(output: &Schema, input: &Schema) -> Result<(), String> {
    if output.fields.len() != input.fields.len() {
        return Err(format!(
            "field count mismatch: output has {}, input has {}",
            output.fields.len(),
            input.fields.len()
        ));
    }

    for (i, (of, inf)) in output.fields.iter().zip(&input.fields).enumerate() {
        if of.name != inf.name {
            return Err(format!(
                "field[{i}] name mismatch: output {:?} vs input {:?}",
                of.name, inf.name
            ));
        }
        if of.column_type != inf.column_type {
            return Err(format!(
                "field {:?} type mismatch: output {:?} vs input {:?}",
                of.name,
                of.column_type(),
                inf.column_type()
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use weir_plan::{
        ColumnType, Edge, ExecutionPlan, OperatorNode, OperatorType, Schema, SchemaField,
        ShuffleStrategy,
    };

    use super::{validate_plan, ValidationError};

    fn op(id: &str) -> OperatorNode {
        OperatorNode {
            id: id.to_string(),
            name: id.to_string(),
            operator_type: OperatorType::Filter as i32,
            ..Default::default()
        }
    }

    fn forward(from: &str, to: &str) -> Edge {
        Edge {
            from_operator: from.to_string(),
            to_operator: to.to_string(),
            shuffle: ShuffleStrategy::Forward as i32,
        }
    }

    fn plan(operators: Vec<OperatorNode>, edges: Vec<Edge>) -> ExecutionPlan {
        ExecutionPlan {
            pipeline_name: "test".to_string(),
            operators,
            edges,
            ..Default::default()
        }
    }

    fn schema(fields: Vec<(&str, ColumnType)>) -> Schema {
        Schema {
            fields: fields
                .into_iter()
                .map(|(name, t)| SchemaField {
                    name: name.to_string(),
                    column_type: t as i32,
                    nullable: false,
                })
                .collect(),
        }
    }

    #[test]
    fn accepts_a_linear_plan() {
        let p = plan(
            vec![op("a"), op("b"), op("c")],
            vec![forward("a", "b"), forward("b", "c")],
        );
        validate_plan(&p).expect("valid plan");
    }

    #[test]
    fn rejects_missing_pipeline_name() {
        let mut p = plan(vec![op("a")], vec![]);
        p.pipeline_name.clear();
        assert!(matches!(
            validate_plan(&p),
            Err(ValidationError::MissingPipelineName)
        ));
    }

    #[test]
    fn rejects_empty_operator_list() {
        let p = plan(vec![], vec![]);
        assert!(matches!(validate_plan(&p), Err(ValidationError::NoOperators)));
    }

    #[test]
    fn rejects_empty_operator_id() {
        let p = plan(vec![op("")], vec![]);
        assert!(matches!(
            validate_plan(&p),
            Err(ValidationError::EmptyOperatorId)
        ));
    }

    #[test]
    fn rejects_duplicate_operator_ids() {
        let p = plan(vec![op("a"), op("a")], vec![]);
        assert!(matches!(
            validate_plan(&p),
            Err(ValidationError::DuplicateOperatorId(id)) if id == "a"
        ));
    }

    #[test]
    fn rejects_unknown_edge_endpoints() {
        let p = plan(vec![op("a")], vec![forward("a", "ghost")]);
        assert!(matches!(
            validate_plan(&p),
            Err(ValidationError::UnknownOperator { id, .. }) if id == "ghost"
        ));
    }

    #[test]
    fn rejects_self_loops() {
        let p = plan(vec![op("a")], vec![forward("a", "a")]);
        assert!(matches!(
            validate_plan(&p),
            Err(ValidationError::SelfLoop { id, .. }) if id == "a"
        ));
    }

    #[test]
    fn rejects_cycles_with_the_offending_path() {
        let p = plan(
            vec![op("a"), op("b"), op("c")],
            vec![forward("a", "b"), forward("b", "c"), forward("c", "a")],
        );
        let err = validate_plan(&p).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cycle detected"), "{message}");
        assert!(message.contains("a -> b -> c -> a"), "{message}");
    }

    #[test]
    fn rejects_schema_mismatch_on_an_edge() {
        let mut producer = op("a");
        producer.output_schema = Some(schema(vec![("id", ColumnType::Int64)]));
        let mut consumer = op("b");
        consumer.input_schema = Some(schema(vec![("id", ColumnType::String)]));

        let p = plan(vec![producer, consumer], vec![forward("a", "b")]);
        let err = validate_plan(&p).unwrap_err();
        assert!(matches!(err, ValidationError::SchemaMismatch { .. }));
        assert!(err.to_string().contains("type mismatch"));
    }

    #[test]
    fn ignores_nullability_in_schema_comparison() {
        let mut producer = op("a");
        producer.output_schema = Some(schema(vec![("id", ColumnType::Int64)]));
        let mut consumer = op("b");
        let mut input = schema(vec![("id", ColumnType::Int64)]);
        input.fields[0].nullable = true;
        consumer.input_schema = Some(input);

        let p = plan(vec![producer, consumer], vec![forward("a", "b")]);
        validate_plan(&p).expect("nullability must not fail validation");
    }

    #[test]
    fn skips_schema_check_when_either_side_is_unset() {
        let mut producer = op("a");
        producer.output_schema = Some(schema(vec![("id", ColumnType::Int64)]));
        let consumer = op("b");

        let p = plan(vec![producer, consumer], vec![forward("a", "b")]);
        validate_plan(&p).expect("unset consumer schema skips the check");
    }
}
