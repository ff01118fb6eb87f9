use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDB v3 API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Redis connection URL for signed-in watchlists.
    /// When unset, account watchlists live in process memory only.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Directory backing the on-device (guest) watchlist
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Endpoint probed by the connection monitor.
    /// Defaults to this server's own `/health` route.
    #[serde(default)]
    pub liveness_url: Option<String>,

    #[serde(default = "default_liveness_interval_ms")]
    pub liveness_interval_ms: u64,

    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_liveness_interval_ms() -> u64 {
    2000
}

fn default_liveness_timeout_ms() -> u64 {
    1500
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL the connection monitor polls
    pub fn liveness_url(&self) -> String {
        self.liveness_url
            .clone()
            .unwrap_or_else(|| format!("http://{}/health", self.bind_address()))
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>();
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = from_pairs(&[("TMDB_API_KEY", "abc")]);
        assert_eq!(config.tmdb_api_url, "https://api.themoviedb.org/3");
        assert_eq!(config.redis_url, None);
        assert_eq!(config.port, 3000);
        assert_eq!(config.liveness_url(), "http://127.0.0.1:3000/health");
        assert_eq!(config.liveness_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let result = envy::from_iter::<_, Config>(Vec::<(String, String)>::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let config = from_pairs(&[
            ("TMDB_API_KEY", "abc"),
            ("REDIS_URL", "redis://cache:6379"),
            ("PORT", "8080"),
            ("LIVENESS_URL", "http://upstream/ping"),
        ]);
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.liveness_url(), "http://upstream/ping");
    }
}
