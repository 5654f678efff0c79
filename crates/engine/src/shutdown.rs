//! Signal handling and graceful-drain wrapper around [`Engine::run`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tracing::{info, warn};
use weir_common::{Result, WeirError};

use crate::engine::Engine;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Run the engine, stopping gracefully on SIGINT/SIGTERM.
///
/// A signal fires the engine's cancellation token and the pipeline drains;
/// if the drain exceeds `timeout` (zero selects the 30 s default) the run
/// task is aborted and the call returns.
pub async fn run_with_graceful_shutdown(engine: Engine, timeout: Duration) -> Result<()> {
    let timeout = if timeout.is_zero() {
        DEFAULT_SHUTDOWN_TIMEOUT
    } else {
        timeout
    };

    let engine = Arc::new(engine);
    let mut runner = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.run().await })
    };

    tokio::select! {
        joined = &mut runner => return flatten_join(joined),
        _ = shutdown_signal() => {
            info!("received shutdown signal, draining pipeline");
            engine.stop();
        }
    }

    match tokio::time::timeout(timeout, &mut runner).await {
        Ok(joined) => flatten_join(joined),
        Err(_) => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "shutdown timeout expired, forcing exit"
            );
            runner.abort();
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn flatten_join(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    joined.map_err(|e| WeirError::Execution(format!("engine task failed: {e}")))?
}
