use std::{fmt, net::SocketAddr};

/// Endpoint a datagram arrived from; the target for direct replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientAddress(SocketAddr);

impl ClientAddress {
    /// Wrap a peer address.
    pub fn new(address: SocketAddr) -> Self {
        Self(address)
    }

    /// The socket address replies are sent to.
    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }

    /// The peer's IP address as a string, without the port.
    pub fn host(&self) -> String {
        self.0.ip().to_string()
    }
}

impl From<SocketAddr> for ClientAddress {
    fn from(address: SocketAddr) -> Self {
        Self(address)
    }
}

impl fmt::Display for ClientAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
