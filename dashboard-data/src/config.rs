use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub cache_ttl_secs: u64,
    pub default_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub fetch: FetchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://iot-carbon-emission-backend.onrender.com".to_string(),
                timeout_secs: 5,
            },
            database: DatabaseConfig {
                path: "data/meter_data.db".to_string(),
            },
            fetch: FetchConfig {
                cache_ttl_secs: 10,
                default_limit: 10_000,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from the path in `DASHBOARD_CONFIG` (default
    /// `dashboard-config.toml`). A missing file falls back to the built-in
    /// defaults; a malformed file is an error.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard-config.toml".to_string());
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let cfg: AppConfig = toml::from_str(&contents)?;
                Ok(cfg)
            }
            Err(_) => Ok(Self::default()),
        }
    }
}
