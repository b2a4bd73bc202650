use crate::api::response::{full, text_response, RespBody};
use crate::error::{GuardError, Result};
use crate::guard::Guard;
use crate::telemetry::{health_check_response, live_check_response, ready_check_response};
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Start the observability server that handles metrics and health checks
/// This server runs on a dedicated port and serves:
/// - `/metrics` - Prometheus metrics
/// - `/health` - Health check endpoint
/// - `/ready` - Readiness check endpoint
/// - `/live` - Liveness check endpoint
pub async fn start_observability_server(
    port: u16,
    registry: Registry,
    guard: Arc<Guard>,
    shutdown: CancellationToken,
) -> Result<()> {
    let registry = Arc::new(registry);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(?addr, "Observability server started (metrics + health checks)");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Observability server: shutdown requested");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "Observability server: accept error");
                        continue;
                    }
                };

                let registry = registry.clone();
                let guard = guard.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let registry = registry.clone();
                        let guard = guard.clone();
                        async move {
                            Ok::<_, hyper::Error>(route(req.uri().path(), &registry, &guard))
                        }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "Observability server: serve_connection error");
                    }
                });
            }
        }
    }

    info!("Observability server stopped");
    Ok(())
}

fn route(path: &str, registry: &Registry, guard: &Guard) -> Response<RespBody> {
    let result = match path {
        "/health" => health_check_response(),
        "/ready" => ready_check_response(guard),
        "/live" => live_check_response(),
        "/metrics" => metrics_response(registry),
        _ => return text_response(StatusCode::NOT_FOUND, "Not Found"),
    };

    result.unwrap_or_else(|e| {
        warn!(path, error = %e, "Observability server: failed to build response");
        text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    })
}

/// Prometheus text exposition of every metric family in `registry`.
pub fn metrics_response(registry: &Registry) -> Result<Response<RespBody>> {
    let encoder = TextEncoder::new();
    let text = encoder
        .encode_to_string(&registry.gather())
        .map_err(|e| GuardError::Http(format!("Failed to encode metrics: {e}")))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, encoder.format_type())
        .body(full(text))
        .map_err(|e| GuardError::Http(format!("Failed to build response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_route_serves_probes_and_metrics() {
        let registry = Registry::new();
        let guard = Guard::new(&Config::default());

        for path in ["/health", "/ready", "/live", "/metrics"] {
            assert_eq!(route(path, &registry, &guard).status(), StatusCode::OK, "{path}");
        }
        assert_eq!(route("/nope", &registry, &guard).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_metrics_response_is_prometheus_text() -> Result<()> {
        let response = metrics_response(&Registry::new())?;
        let content_type = response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        assert_eq!(content_type.map(|v| v.starts_with("text/plain")), Some(true));
        Ok(())
    }
}
