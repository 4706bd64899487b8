// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub routes: RoutesConfig,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr(&self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Path the heartbeat producer posts to.
    pub receive: String,
    /// Path the uptime checker probes (usually through a reverse proxy).
    pub monitor: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            receive: "/rcv".to_string(),
            monitor: "/mon".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub mode: MonitorMode,
}

/// How a monitor probe reacts to an empty slot. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorMode {
    /// Answer `404` right away when no heartbeat is pending.
    #[default]
    NonBlocking,
    /// Hold the probe open until a heartbeat arrives.
    Blocking,
}

impl MonitorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorMode::NonBlocking => "non_blocking",
            MonitorMode::Blocking => "blocking",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit per-request accept/drop/serve records.
    pub debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { debug: true }
    }
}

impl LoggingConfig {
    pub fn crate_directive(&self) -> &'static str {
        if self.debug {
            "heartbeat_relay=debug"
        } else {
            "heartbeat_relay=info"
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "0.0.0.0".to_string(),
            port: 9100,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr(&self.host, self.port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid listen host '{0}'")]
    InvalidHost(String),

    #[error("Port for {0} must be non-zero")]
    ZeroPort(&'static str),

    #[error("Route '{0}' must start with '/'")]
    RelativeRoute(String),

    #[error("Receive and monitor routes must differ (both are '{0}')")]
    DuplicateRoute(String),

    #[error("Metrics listener {0} collides with the relay listener")]
    MetricsAddrInUse(SocketAddr),
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let ip: IpAddr = host
        .parse()
        .map_err(|_| ConfigError::InvalidHost(host.to_string()))?;
    Ok(SocketAddr::new(ip, port))
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let addr = self.server.listen_addr()?;
        if self.server.port == 0 {
            return Err(ConfigError::ZeroPort("server"));
        }

        for route in [&self.routes.receive, &self.routes.monitor] {
            if !route.starts_with('/') {
                return Err(ConfigError::RelativeRoute(route.clone()));
            }
        }
        if self.routes.receive == self.routes.monitor {
            return Err(ConfigError::DuplicateRoute(self.routes.receive.clone()));
        }

        if self.metrics.enabled {
            let metrics_addr = self.metrics.listen_addr()?;
            if self.metrics.port == 0 {
                return Err(ConfigError::ZeroPort("metrics"));
            }
            if !self.metrics.path.starts_with('/') {
                return Err(ConfigError::RelativeRoute(self.metrics.path.clone()));
            }
            // A wildcard host overlaps every address on the same port.
            let overlaps = metrics_addr.ip() == addr.ip()
                || metrics_addr.ip().is_unspecified()
                || addr.ip().is_unspecified();
            if metrics_addr.port() == addr.port() && overlaps {
                return Err(ConfigError::MetricsAddrInUse(metrics_addr));
            }
        }

        Ok(())
    }
}
