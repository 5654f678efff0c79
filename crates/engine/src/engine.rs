//! Channel-wired, concurrent operator runtime.
//!
//! The engine builds the operator DAG from a validated plan, fuses maximal
//! linear FORWARD chains into single tasks, wires bounded channels across
//! every remaining edge, and drives batches until the sources finish or the
//! cancellation token fires.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use arrow::record_batch::RecordBatch;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use weir_common::{EngineConfig, Result, WeirError};
use weir_operators::{Operator, OperatorContext, Sink, Source};
use weir_plan::{ExecutionPlan, OperatorNode, ShuffleStrategy};

use crate::validator::validate_plan;

/// An instantiated operator, as returned by the factory.
pub enum OperatorKind {
    /// Data producer; runs in its own task until exhausted or cancelled.
    Source(Box<dyn Source>),
    /// Stateless transformation.
    Transform(Box<dyn Operator>),
    /// Data consumer.
    Sink(Box<dyn Sink>),
}

impl std::fmt::Debug for OperatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            OperatorKind::Source(_) => "Source",
            OperatorKind::Transform(_) => "Transform",
            OperatorKind::Sink(_) => "Sink",
        };
        f.debug_tuple("OperatorKind").field(&variant).finish()
    }
}

/// Creates operator instances from plan descriptors.
///
/// The engine never synthesizes operator implementations; every descriptor
/// goes through the caller-provided factory.
pub trait OperatorFactory: Send + Sync {
    /// Instantiate the operator described by `node`.
    fn create(&self, node: &OperatorNode) -> Result<OperatorKind>;
}

impl<F> OperatorFactory for F
where
    F: Fn(&OperatorNode) -> Result<OperatorKind> + Send + Sync,
{
    fn create(&self, node: &OperatorNode) -> Result<OperatorKind> {
        self(node)
    }
}

/// Executes an operator DAG from an execution plan.
pub struct Engine {
    plan: ExecutionPlan,
    factory: Box<dyn OperatorFactory>,
    config: EngineConfig,
    cancel: CancellationToken,
}

/// An instantiated operator with its wiring state.
struct Instance {
    node: OperatorNode,
    kind: OperatorKind,
    inputs: Vec<mpsc::Receiver<RecordBatch>>,
    output: Option<mpsc::Sender<RecordBatch>>,
}

impl Engine {
    /// Create an engine with default configuration.
    pub fn new(plan: ExecutionPlan, factory: impl OperatorFactory + 'static) -> Self {
        Self::with_config(plan, factory, EngineConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(
        plan: ExecutionPlan,
        factory: impl OperatorFactory + 'static,
        config: EngineConfig,
    ) -> Self {
        Self {
            plan,
            factory: Box::new(factory),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Trigger a graceful shutdown: sources stop, end-of-stream drains
    /// through the graph, sinks exit once their inputs close.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// The token observed by every operator task.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Build the DAG, wire channels, start all operators, and block until
    /// the pipeline terminates.
    pub async fn run(&self) -> Result<()> {
        validate_plan(&self.plan)?;

        let adjacency = build_adjacency(&self.plan);
        let chains = identify_chains(&self.plan, &adjacency);

        let mut instances: HashMap<String, Instance> =
            HashMap::with_capacity(self.plan.operators.len());
        for node in &self.plan.operators {
            let kind = self.factory.create(node).map_err(|e| {
                WeirError::Execution(format!(
                    "create operator {} ({}): {e}",
                    node.id, node.name
                ))
            })?;
            instances.insert(
                node.id.clone(),
                Instance {
                    node: node.clone(),
                    kind,
                    inputs: Vec::new(),
                    output: None,
                },
            );
        }

        // Wire a bounded channel for every edge not fused into a chain.
        for edge in &self.plan.edges {
            if is_chained_edge(&chains, &edge.from_operator, &edge.to_operator) {
                continue;
            }
            let (tx, rx) = mpsc::channel(self.config.channel_capacity);
            if let Some(from) = instances.get_mut(&edge.from_operator) {
                from.output = Some(tx);
            }
            if let Some(to) = instances.get_mut(&edge.to_operator) {
                to.inputs.push(rx);
            }
        }

        let mut tasks = JoinSet::new();
        for chain in &chains {
            let members: Vec<Instance> = chain
                .iter()
                .filter_map(|id| instances.remove(id))
                .collect();
            self.spawn_chain(members, &mut tasks);
        }
        for instance in instances.into_values() {
            self.spawn_single(instance, &mut tasks);
        }

        while tasks.join_next().await.is_some() {}
        Ok(())
    }

    /// Start one operator in its own task.
    fn spawn_single(&self, instance: Instance, tasks: &mut JoinSet<()>) {
        let Instance {
            node,
            kind,
            inputs,
            output,
        } = instance;
        let ctx = OperatorContext::new(node.id, node.name, self.cancel.clone());

        match kind {
            OperatorKind::Source(mut source) => {
                // A source without a wired consumer still gets a channel;
                // the dropped receiver ends its sends immediately instead of
                // parking it forever.
                let out = output.unwrap_or_else(|| mpsc::channel(self.config.channel_capacity).0);
                tasks.spawn(async move {
                    if let Err(e) = source.open(&ctx) {
                        ctx.metrics.inc_errors();
                        error!(operator = %ctx.operator_id, error = %e, "source open failed");
                        return;
                    }
                    if let Err(e) = source.run(&ctx, out).await {
                        ctx.metrics.inc_errors();
                        error!(operator = %ctx.operator_id, error = %e, "source run failed");
                    }
                    if let Err(e) = source.close() {
                        error!(operator = %ctx.operator_id, error = %e, "source close failed");
                    }
                });
            }

            OperatorKind::Sink(mut sink) => {
                tasks.spawn(async move {
                    if let Err(e) = sink.open(&ctx) {
                        ctx.metrics.inc_errors();
                        error!(operator = %ctx.operator_id, error = %e, "sink open failed");
                        return;
                    }
                    // Inputs drain sequentially: a multi-input sink observes
                    // input i+1 only after input i closes.
                    for mut rx in inputs {
                        while let Some(batch) = rx.recv().await {
                            let rows = batch.num_rows() as u64;
                            let started = Instant::now();
                            match sink.write_batch(batch) {
                                Ok(()) => {
                                    ctx.metrics.inc_batches();
                                    ctx.metrics.inc_rows(rows);
                                    ctx.metrics.observe_latency(started.elapsed().as_secs_f64());
                                }
                                Err(e) => {
                                    ctx.metrics.inc_errors();
                                    error!(operator = %ctx.operator_id, error = %e, "sink write failed");
                                }
                            }
                        }
                    }
                    if let Err(e) = sink.close() {
                        error!(operator = %ctx.operator_id, error = %e, "sink close failed");
                    }
                });
            }

            OperatorKind::Transform(mut op) => {
                tasks.spawn(async move {
                    if let Err(e) = op.open(&ctx) {
                        ctx.metrics.inc_errors();
                        error!(operator = %ctx.operator_id, error = %e, "operator open failed");
                        return;
                    }
                    for mut rx in inputs {
                        while let Some(batch) = rx.recv().await {
                            let rows = batch.num_rows() as u64;
                            let started = Instant::now();
                            match op.process_batch(batch).await {
                                Ok(outputs) => {
                                    ctx.metrics.inc_batches();
                                    ctx.metrics.inc_rows(rows);
                                    ctx.metrics.observe_latency(started.elapsed().as_secs_f64());
                                    for out_batch in outputs {
                                        // Without a consumer (or with a closed
                                        // one) the batch is dropped here.
                                        if let Some(tx) = &output {
                                            let _ = tx.send(out_batch).await;
                                        }
                                    }
                                }
                                Err(e) => {
                                    // A bad batch is dropped; the operator
                                    // keeps running.
                                    ctx.metrics.inc_errors();
                                    error!(operator = %ctx.operator_id, error = %e, "process batch failed");
                                }
                            }
                        }
                    }
                    if let Err(e) = op.close() {
                        error!(operator = %ctx.operator_id, error = %e, "operator close failed");
                    }
                    // `output` drops here, closing the downstream channel.
                });
            }
        }
    }

    /// Run a fused chain of FORWARD-connected transforms in a single task.
    fn spawn_chain(&self, mut members: Vec<Instance>, tasks: &mut JoinSet<()>) {
        if members.is_empty() {
            return;
        }

        // Interior chain vertices are transforms by construction; anything
        // else falls back to individual tasks.
        if !members
            .iter()
            .all(|m| matches!(m.kind, OperatorKind::Transform(_)))
        {
            warn!("non-transform operator in fused chain, starting members individually");
            for member in members {
                self.spawn_single(member, tasks);
            }
            return;
        }

        // The chain reads from the first member's inputs and writes to the
        // last member's output; interior edges have no channel.
        let first_inputs = std::mem::take(&mut members[0].inputs);
        let last_output = members.last_mut().and_then(|m| m.output.take());
        let cancel = self.cancel.clone();

        let mut ops: Vec<(OperatorContext, Box<dyn Operator>)> = Vec::with_capacity(members.len());
        for member in members {
            let OperatorKind::Transform(op) = member.kind else {
                continue;
            };
            let ctx = OperatorContext::new(member.node.id, member.node.name, cancel.clone());
            ops.push((ctx, op));
        }

        tasks.spawn(async move {
            // Open every operator in declaration order; bail out cleanly if
            // any fails.
            for (ctx, op) in ops.iter_mut() {
                if let Err(e) = op.open(ctx) {
                    ctx.metrics.inc_errors();
                    error!(operator = %ctx.operator_id, error = %e, "chain operator open failed");
                    return;
                }
            }

            for mut rx in first_inputs {
                while let Some(batch) = rx.recv().await {
                    // Carry the batch through every operator via in-memory
                    // handoff lists.
                    let mut batches = vec![batch];
                    for (ctx, op) in ops.iter_mut() {
                        let mut next = Vec::new();
                        for b in batches {
                            let rows = b.num_rows() as u64;
                            let started = Instant::now();
                            match op.process_batch(b).await {
                                Ok(outputs) => {
                                    ctx.metrics.inc_batches();
                                    ctx.metrics.inc_rows(rows);
                                    ctx.metrics.observe_latency(started.elapsed().as_secs_f64());
                                    next.extend(outputs);
                                }
                                Err(e) => {
                                    ctx.metrics.inc_errors();
                                    error!(operator = %ctx.operator_id, error = %e, "chain process batch failed");
                                }
                            }
                        }
                        batches = next;
                    }

                    for out_batch in batches {
                        if let Some(tx) = &last_output {
                            if tx.send(out_batch).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }

            for (ctx, op) in ops.iter_mut() {
                if let Err(e) = op.close() {
                    error!(operator = %ctx.operator_id, error = %e, "chain operator close failed");
                }
            }
            // `last_output` drops here, closing the downstream channel.
        });
    }
}

// ── DAG adjacency and chain identification ──────────────────────────

/// Downstream and upstream adjacency with the shuffle strategy retained.
#[derive(Debug, Default)]
pub(crate) struct Adjacency {
    downstream: HashMap<String, Vec<EdgeInfo>>,
    upstream: HashMap<String, Vec<EdgeInfo>>,
}

#[derive(Debug, Clone)]
pub(crate) struct EdgeInfo {
    operator_id: String,
    shuffle: ShuffleStrategy,
}

pub(crate) fn build_adjacency(plan: &ExecutionPlan) -> Adjacency {
    let mut adj = Adjacency::default();
    for edge in &plan.edges {
        adj.downstream
            .entry(edge.from_operator.clone())
            .or_default()
            .push(EdgeInfo {
                operator_id: edge.to_operator.clone(),
                shuffle: edge.shuffle(),
            });
        adj.upstream
            .entry(edge.to_operator.clone())
            .or_default()
            .push(EdgeInfo {
                operator_id: edge.from_operator.clone(),
                shuffle: edge.shuffle(),
            });
    }
    adj
}

/// Find maximal linear chains of FORWARD-connected operators.
///
/// A chain head has at least one upstream edge (so sources never start a
/// chain) and exactly one FORWARD downstream. The walk extends while each
/// vertex has exactly one FORWARD upstream and at least one downstream
/// (sinks, with no downstream, end the walk before inclusion). Only chains
/// of length two or more are returned; a vertex belongs to at most one.
pub(crate) fn identify_chains(plan: &ExecutionPlan, adj: &Adjacency) -> Vec<Vec<String>> {
    let mut chains = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();

    for op in &plan.operators {
        if visited.contains(&op.id) {
            continue;
        }

        let ups = adj.upstream.get(&op.id).map(Vec::as_slice).unwrap_or(&[]);
        if ups.is_empty() {
            continue;
        }

        let downs = adj.downstream.get(&op.id).map(Vec::as_slice).unwrap_or(&[]);
        if downs.len() != 1 || downs[0].shuffle != ShuffleStrategy::Forward {
            continue;
        }

        let mut chain = vec![op.id.clone()];
        visited.insert(op.id.clone());
        let mut current = downs[0].operator_id.clone();

        loop {
            let ups = adj.upstream.get(&current).map(Vec::as_slice).unwrap_or(&[]);
            let downs = adj
                .downstream
                .get(&current)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            if ups.len() != 1 || ups[0].shuffle != ShuffleStrategy::Forward || downs.is_empty() {
                break;
            }

            chain.push(current.clone());
            visited.insert(current.clone());

            if downs.len() != 1 || downs[0].shuffle != ShuffleStrategy::Forward {
                break;
            }
            current = downs[0].operator_id.clone();
        }

        if chain.len() > 1 {
            chains.push(chain);
        }
    }

    chains
}

/// True when `from -> to` connects consecutive vertices of one chain.
pub(crate) fn is_chained_edge(chains: &[Vec<String>], from: &str, to: &str) -> bool {
    chains.iter().any(|chain| {
        chain
            .windows(2)
            .any(|pair| pair[0] == from && pair[1] == to)
    })
}

#[cfg(test)]
mod tests {
    use weir_plan::{Edge, ExecutionPlan, OperatorNode, OperatorType, ShuffleStrategy};

    use super::{build_adjacency, identify_chains, is_chained_edge};

    fn op(id: &str, operator_type: OperatorType) -> OperatorNode {
        OperatorNode {
            id: id.to_string(),
            name: id.to_string(),
            operator_type: operator_type as i32,
            ..Default::default()
        }
    }

    fn edge(from: &str, to: &str, shuffle: ShuffleStrategy) -> Edge {
        Edge {
            from_operator: from.to_string(),
            to_operator: to.to_string(),
            shuffle: shuffle as i32,
        }
    }

    fn linear_plan() -> ExecutionPlan {
        ExecutionPlan {
            pipeline_name: "chain".to_string(),
            operators: vec![
                op("src", OperatorType::GeneratorSource),
                op("f1", OperatorType::Filter),
                op("f2", OperatorType::Filter),
                op("sink", OperatorType::ConsoleSink),
            ],
            edges: vec![
                edge("src", "f1", ShuffleStrategy::Forward),
                edge("f1", "f2", ShuffleStrategy::Forward),
                edge("f2", "sink", ShuffleStrategy::Forward),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn fuses_interior_transforms_only() {
        let plan = linear_plan();
        let chains = identify_chains(&plan, &build_adjacency(&plan));
        assert_eq!(chains, vec![vec!["f1".to_string(), "f2".to_string()]]);
    }

    #[test]
    fn fused_plan_wires_exactly_two_channels() {
        let plan = linear_plan();
        let chains = identify_chains(&plan, &build_adjacency(&plan));

        let channel_edges = plan
            .edges
            .iter()
            .filter(|e| !is_chained_edge(&chains, &e.from_operator, &e.to_operator))
            .count();
        assert_eq!(channel_edges, 2, "src->chain and chain->sink");
        assert!(is_chained_edge(&chains, "f1", "f2"));
    }

    #[test]
    fn non_forward_edges_break_chains() {
        let mut plan = linear_plan();
        plan.edges[1] = edge("f1", "f2", ShuffleStrategy::Hash);
        let chains = identify_chains(&plan, &build_adjacency(&plan));
        assert!(chains.is_empty(), "{chains:?}");
    }

    #[test]
    fn fan_out_breaks_chains() {
        let mut plan = linear_plan();
        plan.operators
            .push(op("side", OperatorType::ConsoleSink));
        plan.edges
            .push(edge("f1", "side", ShuffleStrategy::Forward));
        let chains = identify_chains(&plan, &build_adjacency(&plan));
        // f1 now has two downstream edges and cannot head a chain; f2 alone
        // is a length-1 chain and is ignored.
        assert!(chains.is_empty(), "{chains:?}");
    }

    #[test]
    fn fan_in_vertices_do_not_extend_chains() {
        let plan = ExecutionPlan {
            pipeline_name: "union".to_string(),
            operators: vec![
                op("src1", OperatorType::GeneratorSource),
                op("src2", OperatorType::GeneratorSource),
                op("union", OperatorType::Union),
                op("sink", OperatorType::ConsoleSink),
            ],
            edges: vec![
                edge("src1", "union", ShuffleStrategy::Forward),
                edge("src2", "union", ShuffleStrategy::Forward),
                edge("union", "sink", ShuffleStrategy::Forward),
            ],
            ..Default::default()
        };
        let chains = identify_chains(&plan, &build_adjacency(&plan));
        assert!(chains.is_empty(), "{chains:?}");
    }

    #[test]
    fn long_chain_is_maximal() {
        let plan = ExecutionPlan {
            pipeline_name: "long".to_string(),
            operators: vec![
                op("src", OperatorType::GeneratorSource),
                op("a", OperatorType::Filter),
                op("b", OperatorType::Map),
                op("c", OperatorType::Rename),
                op("sink", OperatorType::ConsoleSink),
            ],
            edges: vec![
                edge("src", "a", ShuffleStrategy::Forward),
                edge("a", "b", ShuffleStrategy::Forward),
                edge("b", "c", ShuffleStrategy::Forward),
                edge("c", "sink", ShuffleStrategy::Forward),
            ],
            ..Default::default()
        };
        let chains = identify_chains(&plan, &build_adjacency(&plan));
        assert_eq!(
            chains,
            vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]]
        );
    }
}
