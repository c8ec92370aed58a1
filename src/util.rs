//! Internal utilities.

use std::io;
use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Bind a non-blocking UDP socket for the agent or a client transport.
///
/// IPv6 addresses get a dual-stack socket (`IPV6_V6ONLY` off), so `[::]:161`
/// also receives IPv4 traffic. `recv_buffer_size` is a request; the kernel
/// caps it at `net.core.rmem_max`.
pub(crate) async fn bind_udp_socket(
    addr: SocketAddr,
    recv_buffer_size: Option<usize>,
) -> io::Result<UdpSocket> {
    let domain = match addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    // an agent restarted on a fixed port must not wait for the old socket
    socket.set_reuse_address(true)?;
    if let Some(size) = recv_buffer_size {
        // best effort
        let _ = socket.set_recv_buffer_size(size);
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;

    UdpSocket::from_std(socket.into())
}

/// Join a host and port into a `host:port` string, bracketing IPv6 literals.
pub(crate) fn host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
