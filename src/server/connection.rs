// Connection handling module
// Serves one accepted TCP connection on its own task

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::guard::{self, RequestGuard};
use crate::config::AppState;
use crate::handler;
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};

/// Accept a connection and serve it in a spawned task.
pub fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, state: &Arc<AppState>) {
    logger::log_connection_accepted(&peer_addr);
    tokio::spawn(serve_connection(stream, peer_addr, Arc::clone(state)));
}

/// Serve HTTP/1 requests on `stream` until the client closes it, keep-alive is off, or no
/// request headers arrive within the header read timeout.
///
/// Request heads pass through [`RequestGuard`] first. A head it refuses is answered here,
/// after hyper has finished the responses owed for earlier requests.
async fn serve_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    let io = TokioIo::new(RequestGuard::new(stream));

    let perf = &state.config.performance;
    let mut builder = http1::Builder::new();
    builder
        .keep_alive(perf.keep_alive)
        .half_close(true)
        .timer(TokioTimer::new());
    if perf.header_read_timeout > 0 {
        builder.header_read_timeout(Duration::from_secs(perf.header_read_timeout));
    }

    let service_state = Arc::clone(&state);
    let service =
        service_fn(move |req| serve_request(req, peer_addr, Arc::clone(&service_state)));

    // Client disconnects mid-response land in the error arm too
    let parts = match builder.serve_connection(io, service).without_shutdown().await {
        Ok(parts) => parts,
        Err(err) => {
            logger::log_connection_error(&err);
            return;
        }
    };

    let guarded = parts.io.into_inner();
    let rejection = guarded.rejection();
    let mut stream = guarded.into_inner();
    match rejection {
        Some(rejection) => {
            logger::log_request_rejected(&peer_addr, rejection.status());
            if let Err(e) = guard::reject(stream, rejection).await {
                logger::log_connection_error(&e);
            }
        }
        None => {
            let _ = stream.shutdown().await;
        }
    }
}

/// Run the file handler, then decorate its response with the isolation headers
async fn serve_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<ResponseBody>, Infallible> {
    let mut entry = state
        .config
        .logging
        .access_log
        .then(|| AccessLogEntry::from_request(&peer_addr, &req));

    let response = handler::handle_request(req, state).await.map(http::isolate)?;

    if let Some(entry) = entry.as_mut() {
        entry.finish(&response);
        logger::log_access(entry);
    }
    Ok(response)
}
