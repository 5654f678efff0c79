//! Command `weir`: load a serialized execution plan and run it.
//!
//! Exit code 0 on clean termination, 1 on load or fatal run errors.
//! Per-batch runtime errors surface via logs and the `/metrics` endpoint.

use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use weir_common::{run_metrics_exporter, EngineConfig};
use weir_engine::{run_with_graceful_shutdown, Engine};
use weir_plan::load_plan;

mod factory;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(plan_path) = std::env::args().nth(1) else {
        eprintln!("usage: weir <plan.pb>");
        return ExitCode::from(1);
    };

    let plan = match load_plan(&plan_path) {
        Ok(plan) => plan,
        Err(e) => {
            error!(path = %plan_path, error = %e, "failed to load plan");
            return ExitCode::from(1);
        }
    };

    info!(
        pipeline = %plan.pipeline_name,
        operators = plan.operators.len(),
        edges = plan.edges.len(),
        "loaded execution plan"
    );

    let config = EngineConfig::default();
    let metrics_addr = config.metrics_addr;
    tokio::spawn(async move {
        if let Err(e) = run_metrics_exporter(metrics_addr).await {
            warn!(addr = %metrics_addr, error = %e, "metrics exporter stopped");
        }
    });

    let engine = Engine::with_config(plan, factory::create_operator, config.clone());
    match run_with_graceful_shutdown(engine, config.shutdown_timeout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "engine failed");
            ExitCode::from(1)
        }
    }
}
