// Copyright 2025 Fleetlens Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Fleetlens Server Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:47300")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Root of the telemetry export directory tree
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Per-read deadline on a streaming pass, in seconds
    #[serde(default = "default_read_deadline")]
    pub read_deadline_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Time-to-live of cached aggregation results, in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Maximum number of cached results
    #[serde(default = "default_cache_entries")]
    pub max_entries: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            read_deadline_secs: default_read_deadline(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:47300".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./fleetlens-data")
}

fn default_read_deadline() -> u64 {
    30
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_cache_entries() -> u64 {
    1000
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - FLEETLENS_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:47300)
    /// - FLEETLENS_DATA_DIR: Export directory root (default: ./fleetlens-data)
    /// - FLEETLENS_CACHE_TTL_SECS: Result cache TTL in seconds (default: 3600)
    /// - FLEETLENS_READ_DEADLINE_SECS: Streaming read deadline (default: 30)
    /// - FLEETLENS_ENABLE_CORS: Enable CORS (default: true)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("FLEETLENS_HTTP_ADDR") {
            config.server.listen_addr = addr;
        }
        if let Ok(dir) = std::env::var("FLEETLENS_DATA_DIR") {
            config.data.data_dir = PathBuf::from(dir);
        }
        if let Ok(ttl) = std::env::var("FLEETLENS_CACHE_TTL_SECS") {
            if let Ok(val) = ttl.parse() {
                config.cache.ttl_secs = val;
            }
        }
        if let Ok(deadline) = std::env::var("FLEETLENS_READ_DEADLINE_SECS") {
            if let Ok(val) = deadline.parse() {
                config.data.read_deadline_secs = val;
            }
        }
        if let Ok(cors) = std::env::var("FLEETLENS_ENABLE_CORS") {
            if let Ok(val) = cors.parse() {
                config.server.enable_cors = val;
            }
        }

        config
    }

    /// Load from an optional file, then let environment variables override.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        config = Self::merge_with_env(config);

        Ok(config)
    }

    /// Merge config with environment variables (env takes priority)
    fn merge_with_env(mut config: Self) -> Self {
        let env_config = Self::from_env();

        if std::env::var("FLEETLENS_HTTP_ADDR").is_ok() {
            config.server.listen_addr = env_config.server.listen_addr;
        }
        if std::env::var("FLEETLENS_DATA_DIR").is_ok() {
            config.data.data_dir = env_config.data.data_dir;
        }
        if std::env::var("FLEETLENS_CACHE_TTL_SECS").is_ok() {
            config.cache.ttl_secs = env_config.cache.ttl_secs;
        }
        if std::env::var("FLEETLENS_READ_DEADLINE_SECS").is_ok() {
            config.data.read_deadline_secs = env_config.data.read_deadline_secs;
        }
        if std::env::var("FLEETLENS_ENABLE_CORS").is_ok() {
            config.server.enable_cors = env_config.server.enable_cors;
        }

        config
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {}: {e}", self.server.listen_addr))
    }

    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.cache.ttl_secs == 0 {
            anyhow::bail!("cache.ttl_secs must be greater than zero");
        }
        if self.data.read_deadline_secs == 0 {
            anyhow::bail!("data.read_deadline_secs must be greater than zero");
        }
        if !self.data.data_dir.is_dir() {
            anyhow::bail!("data directory does not exist: {:?}", self.data.data_dir);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_as_a_socket_addr() {
        let config = ServerConfig::default();
        assert!(config.socket_addr().is_ok());
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.cache.max_entries, 1000);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [server]
            listen_addr = "0.0.0.0:8080"

            [cache]
            ttl_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.max_entries, 1000);
        assert_eq!(config.data.read_deadline_secs, 30);
    }

    #[test]
    fn validate_rejects_bad_addr_and_zero_ttl() {
        let dir = tempfile::tempdir().unwrap();

        let mut config = ServerConfig::default();
        config.data.data_dir = dir.path().to_path_buf();
        assert!(config.validate().is_ok());

        config.server.listen_addr = "not-an-addr".to_string();
        assert!(config.validate().is_err());

        config.server.listen_addr = default_http_addr();
        config.cache.ttl_secs = 0;
        assert!(config.validate().is_err());
    }
}
