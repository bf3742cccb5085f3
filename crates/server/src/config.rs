//! Environment-driven server configuration.

use tracing::warn;

/// Runtime configuration, loaded from `RELATA_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL used for `links` generation.
    pub base_url: String,
    /// Upper bound accepted for `page[size]` / `page[limit]`.
    pub max_page_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let host = "127.0.0.1".to_owned();
        let port = 3000;
        Self {
            base_url: format!("http://{host}:{port}"),
            host,
            port,
            max_page_size: 100,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the environment, falling back to defaults
    /// (and warning) on unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("RELATA_HOST").unwrap_or(defaults.host);
        let port = env_parsed("RELATA_PORT", defaults.port);
        let base_url =
            std::env::var("RELATA_BASE_URL").unwrap_or_else(|_| format!("http://{host}:{port}"));
        Self {
            host,
            port,
            base_url,
            max_page_size: env_parsed("RELATA_MAX_PAGE_SIZE", defaults.max_page_size),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parsed<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(%name, value = %raw, "unparsable environment value, using default");
            default
        }),
        Err(_) => default,
    }
}
