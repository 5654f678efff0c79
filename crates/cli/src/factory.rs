//! Default operator factory: plan descriptors to built-in implementations.

use weir_common::{Result, WeirError};
use weir_connectors::{Console, Generator};
use weir_engine::OperatorKind;
use weir_operators::{
    Cast, CastColumn, Drop, Filter, FlatMap, Map, Rename, Route, RouteBranch, Union,
};
use weir_plan::model::operator_node::Config;
use weir_plan::schema as plan_schema;
use weir_plan::{OperatorNode, OperatorType};

/// Instantiate a built-in operator from its plan descriptor.
pub fn create_operator(node: &OperatorNode) -> Result<OperatorKind> {
    match node.operator_type() {
        OperatorType::GeneratorSource => {
            let schema = node
                .output_schema
                .clone()
                .ok_or_else(|| invalid(node, "generator requires an output schema"))?;
            let (rows_per_second, max_rows) = match &node.config {
                Some(Config::Generator(cfg)) => (cfg.rows_per_second, cfg.max_rows),
                _ => (0, 0),
            };
            Ok(OperatorKind::Source(Box::new(Generator::new(
                schema,
                rows_per_second,
                max_rows,
            ))))
        }

        OperatorType::Filter => {
            let Some(Config::Filter(cfg)) = &node.config else {
                return Err(invalid(node, "filter requires a condition"));
            };
            Ok(OperatorKind::Transform(Box::new(Filter::new(
                cfg.condition.clone(),
            ))))
        }

        OperatorType::Map => {
            let Some(Config::Map(cfg)) = &node.config else {
                return Err(invalid(node, "map requires output expressions"));
            };
            Ok(OperatorKind::Transform(Box::new(Map::new(
                cfg.exprs.clone(),
            ))))
        }

        OperatorType::Route => {
            let Some(Config::Route(cfg)) = &node.config else {
                return Err(invalid(node, "route requires branches"));
            };
            // Branch channels are wired by embedding programs; the default
            // factory sends every unclaimed row downstream.
            let branches = cfg
                .branches
                .iter()
                .map(|b| RouteBranch {
                    condition: b.condition.clone(),
                    output: None,
                })
                .collect();
            Ok(OperatorKind::Transform(Box::new(Route::new(branches))))
        }

        OperatorType::Rename => {
            let Some(Config::Rename(cfg)) = &node.config else {
                return Err(invalid(node, "rename requires a column mapping"));
            };
            Ok(OperatorKind::Transform(Box::new(Rename::new(
                cfg.renames.clone(),
            ))))
        }

        OperatorType::Drop => {
            let Some(Config::Drop(cfg)) = &node.config else {
                return Err(invalid(node, "drop requires column names"));
            };
            Ok(OperatorKind::Transform(Box::new(Drop::new(
                cfg.columns.iter().cloned(),
            ))))
        }

        OperatorType::Cast => {
            let Some(Config::Cast(cfg)) = &node.config else {
                return Err(invalid(node, "cast requires column conversions"));
            };
            let columns = cfg
                .casts
                .iter()
                .map(|c| {
                    Ok(CastColumn {
                        name: c.column.clone(),
                        target: plan_schema::column_type_to_arrow(c.target_type())?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(OperatorKind::Transform(Box::new(Cast::new(columns))))
        }

        OperatorType::Union => Ok(OperatorKind::Transform(Box::new(Union::new()))),

        OperatorType::FlatMap => {
            let Some(Config::FlatMap(cfg)) = &node.config else {
                return Err(invalid(node, "flatmap requires a list column"));
            };
            Ok(OperatorKind::Transform(Box::new(FlatMap::new(
                cfg.column.clone(),
            ))))
        }

        OperatorType::ConsoleSink => {
            let max_rows = match &node.config {
                Some(Config::Console(cfg)) => cfg.max_rows,
                _ => 0,
            };
            Ok(OperatorKind::Sink(Box::new(Console::new(max_rows))))
        }

        OperatorType::Unspecified => Err(WeirError::UnknownOperator(format!(
            "operator {} has no type",
            node.id
        ))),
    }
}

fn invalid(node: &OperatorNode, message: &str) -> WeirError {
    WeirError::InvalidPlan(format!("operator {}: {message}", node.id))
}
