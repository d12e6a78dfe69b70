use crate::env_or;

/// Listener and lifecycle settings.
///
/// # Environment Variables
///
/// - `PORT`: API port (default: `4000`)
/// - `METRICS_PORT`: Prometheus scrape port (default: `9090`)
/// - `SHUTDOWN_DRAIN_SECONDS`: how long shutdown waits for background tasks (default: `30`)
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub shutdown_drain_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 4000),
            metrics_port: env_or("METRICS_PORT", 9090),
            shutdown_drain_secs: env_or("SHUTDOWN_DRAIN_SECONDS", 30),
        }
    }
}
