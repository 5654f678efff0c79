use std::io;
use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::net::TcpListener;

use crate::metrics::global_metrics;

/// Serve the Prometheus `/metrics` endpoint on the given address.
pub async fn run_metrics_exporter(addr: SocketAddr) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_metrics_listener(listener).await
}

/// Serve `/metrics` on an already-bound listener.
pub async fn serve_metrics_listener(listener: TcpListener) -> io::Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));
    axum::serve(listener, app).await.map_err(io::Error::other)
}

async fn metrics_handler() -> String {
    global_metrics().render_prometheus()
}

#[cfg(test)]
mod tests {
    use super::metrics_handler;
    use crate::metrics::global_metrics;

    #[tokio::test]
    async fn metrics_handler_returns_prometheus_text() {
        let op = global_metrics().operator("src-1", "generator");
        op.inc_batches();
        op.inc_rows(42);

        let body = metrics_handler().await;
        assert!(body.contains("weir_rows_processed_total"));
        assert!(body.contains("src-1"));
    }
}
