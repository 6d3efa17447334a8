//! Immutable per-server configuration.

use shared::{CipherSpec, DEFAULT_COMMAND_PORT, DEFAULT_TELEMETRY_PORT};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Where a server listens and which key material it decrypts with.
///
/// The two servers each get their own instance; nothing is shared between
/// them, key material included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub cipher: CipherSpec,
}

impl ServerConfig {
    pub fn new(host: IpAddr, port: u16, cipher: CipherSpec) -> Self {
        Self { host, port, cipher }
    }

    /// Telemetry defaults: all interfaces, port 4211, PKCS7 codec
    pub fn telemetry() -> Self {
        Self::new(
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            DEFAULT_TELEMETRY_PORT,
            CipherSpec::telemetry(),
        )
    }

    /// Command defaults: all interfaces, port 6000, unpadded codec
    pub fn command() -> Self {
        Self::new(
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            DEFAULT_COMMAND_PORT,
            CipherSpec::command(),
        )
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Port `0` asks the OS for an ephemeral port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
