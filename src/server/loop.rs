// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Accept and serve connections on `listener` until `shutdown` completes.
///
/// The listener is owned by the loop and closed when it returns, so the port can be bound
/// again immediately. Connections still in flight keep running on their own tasks until the
/// runtime is dropped.
pub async fn run<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    logger::log_server_start(&listener.local_addr()?, &state.root);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = &mut shutdown => {
                logger::log_server_stop();
                break;
            }
        }
    }

    drop(listener);
    Ok(())
}
