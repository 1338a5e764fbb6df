//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::server::http::STATUS_PATHS;

/// Default listening port
pub const DEFAULT_PORT: u16 = 3001;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Path of the WebSocket signaling endpoint
    pub ws_path: String,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Largest accepted WebSocket message, in bytes
    pub max_message_size: usize,

    /// Directory of viewer assets served for unmatched paths
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            ws_path: "/ws".to_string(),
            max_connections: 0, // Unlimited
            max_message_size: 64 * 1024,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the WebSocket endpoint path
    pub fn ws_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.ws_path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set maximum message size
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Serve viewer assets from a directory
    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Load overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load overrides through an arbitrary key lookup
    ///
    /// `ATMOS_BIND_ADDR` wins over `PORT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("ATMOS_BIND_ADDR") {
            config.bind_addr = parse_bind_addr(&addr).map_err(Error::Config)?;
        } else if let Some(port) = lookup("PORT") {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PORT: invalid port '{port}'")))?;
            config.bind_addr.set_port(port);
        }

        if let Some(path) = lookup("ATMOS_WS_PATH") {
            config = config.ws_path(path.trim());
        }
        if let Some(max) = lookup("ATMOS_MAX_CONNECTIONS") {
            config.max_connections = parse_usize("ATMOS_MAX_CONNECTIONS", &max)?;
        }
        if let Some(size) = lookup("ATMOS_MAX_MESSAGE_SIZE") {
            config.max_message_size = parse_usize("ATMOS_MAX_MESSAGE_SIZE", &size)?;
        }
        if let Some(dir) = lookup("ATMOS_STATIC_DIR").filter(|d| !d.trim().is_empty()) {
            config.static_dir = Some(PathBuf::from(dir.trim()));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values the HTTP router cannot be built with
    pub fn validate(&self) -> Result<()> {
        let path = self.ws_path.as_str();

        if STATUS_PATHS.contains(&path) {
            return Err(Error::Config(format!(
                "WebSocket path '{path}' collides with a status endpoint"
            )));
        }
        if !path.starts_with('/') || path.contains([':', '*', '{', '}']) {
            return Err(Error::Config(format!(
                "WebSocket path '{path}' must be a literal path starting with '/'"
            )));
        }

        Ok(())
    }
}

/// Parse a bind address
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:3001
/// - "localhost:4000" -> 127.0.0.1:4000
/// - "127.0.0.1" -> 127.0.0.1:3001
/// - "0.0.0.0:8080" -> 0.0.0.0:8080
pub fn parse_bind_addr(arg: &str) -> std::result::Result<SocketAddr, String> {
    let normalized = arg.trim().replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::Config(format!("{key}: expected a non-negative integer, got '{value}'")))
}
