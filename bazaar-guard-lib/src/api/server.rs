use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::handlers::dispatch;
use super::response::{error_response, RespBody};
use crate::config::Config;
use crate::error::Result;
use crate::guard::Guard;

/// Decrements the active connection counter when dropped
struct ConnectionGuard(Arc<AtomicUsize>);

impl ConnectionGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Settings the accept loop needs from [`Config`]
#[derive(Debug, Clone, Copy)]
pub struct ServeOptions {
    pub max_body_bytes: usize,
    pub shutdown_timeout: Duration,
}

impl From<&Config> for ServeOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_body_bytes: config.max_body_bytes,
            shutdown_timeout: Duration::from_secs(config.shutdown_secs),
        }
    }
}

/// Bind `config.listen` and serve the guard API until `shutdown` is cancelled.
pub async fn run(config: &Config, guard: Arc<Guard>, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(config.listen).await?;
    serve(listener, ServeOptions::from(config), guard, shutdown).await
}

/// Serve the guard API on an already bound listener.
///
/// Once `shutdown` fires no new connection is accepted, open connections are
/// asked to finish their in-flight request and the call returns when all of
/// them are closed or `shutdown_timeout` elapses.
pub async fn serve(
    listener: TcpListener,
    options: ServeOptions,
    guard: Arc<Guard>,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "guard API listening");

    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("guard API: shutdown requested, no longer accepting connections");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };
                debug!(%peer, "connection accepted");

                let conn_guard = ConnectionGuard::new(active_connections.clone());
                let guard = guard.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let _conn_guard = conn_guard;
                    serve_connection(stream, peer, guard, options.max_body_bytes, shutdown).await;
                });
            }
        }
    }

    drain(&active_connections, options.shutdown_timeout).await;
    Ok(())
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    guard: Arc<Guard>,
    max_body_bytes: usize,
    shutdown: CancellationToken,
) {
    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
        let guard = guard.clone();
        async move { Ok::<_, hyper::Error>(handle(req, &guard, max_body_bytes).await) }
    });

    let builder = ConnBuilder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(stream), svc);
    tokio::pin!(conn);

    let result = tokio::select! {
        res = conn.as_mut() => res,
        _ = shutdown.cancelled() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };
    if let Err(e) = result {
        warn!(%peer, error = %e, "serve_connection error");
    }
}

async fn handle(
    req: Request<Incoming>,
    guard: &Guard,
    max_body_bytes: usize,
) -> Response<RespBody> {
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
        }
        Err(e) => {
            debug!(error = %e, "failed to read request body");
            return error_response(StatusCode::BAD_REQUEST, "failed to read request body");
        }
    };

    dispatch(guard, &parts.method, parts.uri.path(), parts.uri.query(), body).await
}

async fn drain(active_connections: &AtomicUsize, timeout: Duration) {
    info!(timeout_secs = timeout.as_secs(), "waiting for active connections to finish");
    let start = Instant::now();

    loop {
        let active = active_connections.load(Ordering::Relaxed);
        if active == 0 {
            info!("all connections closed, shutdown complete");
            return;
        }
        if start.elapsed() >= timeout {
            warn!(active_connections = active, "shutdown timeout reached");
            return;
        }
        debug!(active_connections = active, "waiting for connections to close");
        sleep(Duration::from_millis(100)).await;
    }
}
