// Listener module
// Creates the process's single TCP listener

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Create a non-blocking `TcpListener` bound to `addr`.
///
/// `SO_REUSEADDR` is enabled (except on Windows, where it would allow hijacking a live port)
/// so a restarted server can bind while old connections sit in `TIME_WAIT`. `SO_REUSEPORT`
/// is left off: binding a port another process is listening on fails with `AddrInUse`.
///
/// Must be called from within a Tokio runtime.
pub fn create_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    #[cfg(not(windows))]
    socket.set_reuse_address(true)?;

    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
