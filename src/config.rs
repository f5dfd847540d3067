//! Process-level configuration, read once at startup.
//!
//! Game-mechanical tunables live in [`crate::constants`]; this module only
//! covers how the process itself is deployed (what it binds to, where it
//! looks for a static frontend bundle).

use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub static_dir: String,
}

impl Config {
    /// Reads `SNAKE_HOST`, `SNAKE_PORT`, `SNAKE_STATIC_DIR` from the
    /// environment, falling back to sane defaults for local development.
    pub fn from_env() -> Self {
        let host = std::env::var("SNAKE_HOST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| IpAddr::from([0, 0, 0, 0]));
        let port = std::env::var("SNAKE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);
        let static_dir =
            std::env::var("SNAKE_STATIC_DIR").unwrap_or_else(|_| "static".to_string());

        Config { host, port, static_dir }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
