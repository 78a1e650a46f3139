//! Configuration: a YAML server-settings file merged over built-in
//! defaults and then over `NULLROUTE_*` environment overrides, plus a
//! separate YAML document describing blocklist sources/presets/update
//! settings (§6). Both are loaded once at startup and held for the
//! process lifetime — config reload is out of scope for this revision.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::blocklist::parser::BlocklistFormat;
use crate::error::{HeimdallError, Result};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
    #[serde(default = "default_min_ttl")]
    pub min_ttl: u32,
    #[serde(default = "default_max_ttl")]
    pub max_ttl: u32,
}

fn default_cache_max_size() -> usize {
    10_000
}
fn default_min_ttl() -> u32 {
    60
}
fn default_max_ttl() -> u32 {
    86_400
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            max_size: default_cache_max_size(),
            min_ttl: default_min_ttl(),
            max_ttl: default_max_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlocklistSettings {
    #[serde(default = "default_blocklist_file")]
    pub blocklist_file: PathBuf,
    #[serde(default = "default_whitelist_file")]
    pub whitelist_file: PathBuf,
    #[serde(default)]
    pub auto_update: bool,
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    #[serde(default)]
    pub update_preset: Option<String>,
    #[serde(default = "default_true")]
    pub update_on_startup: bool,
}

fn default_blocklist_file() -> PathBuf {
    PathBuf::from("config/blocklist.txt")
}
fn default_whitelist_file() -> PathBuf {
    PathBuf::from("config/whitelist.txt")
}
fn default_update_interval() -> u64 {
    86_400
}

impl Default for BlocklistSettings {
    fn default() -> Self {
        BlocklistSettings {
            blocklist_file: default_blocklist_file(),
            whitelist_file: default_whitelist_file(),
            auto_update: false,
            update_interval: default_update_interval(),
            update_preset: None,
            update_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_upstream")]
    pub upstream: String,
    #[serde(default = "default_true")]
    pub enable_cache: bool,
    #[serde(default)]
    pub enable_database: bool,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub blocklist: BlocklistSettings,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5354
}
fn default_upstream() -> String {
    "8.8.8.8:53".to_string()
}
fn default_max_workers() -> usize {
    50
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
            upstream: default_upstream(),
            enable_cache: true,
            enable_database: false,
            max_workers: default_max_workers(),
            cache: CacheSettings::default(),
            blocklist: BlocklistSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Loads `path` if given (or falls back to defaults, logged at
    /// `warn`, if it doesn't exist), merges it field-by-field over the
    /// defaults above, then applies `NULLROUTE_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path).map_err(|source| HeimdallError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_yaml::from_str(&text).map_err(|e| HeimdallError::Config {
                    path: path.to_path_buf(),
                    source: Box::new(e),
                })?
            }
            Some(path) => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                ServerConfig::default()
            }
            None => ServerConfig::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("NULLROUTE_HOST") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("NULLROUTE_PORT") {
            if let Ok(port) = v.parse() {
                self.port = port;
            }
        }
        if let Ok(v) = std::env::var("NULLROUTE_UPSTREAM") {
            self.upstream = v;
        }
        if let Ok(v) = std::env::var("NULLROUTE_MAX_WORKERS") {
            if let Ok(n) = v.parse() {
                self.max_workers = n;
            }
        }
        if let Ok(v) = std::env::var("NULLROUTE_ENABLE_CACHE") {
            if let Ok(b) = v.parse() {
                self.enable_cache = b;
            }
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        let ip: IpAddr = self
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));
        SocketAddr::new(ip, self.port)
    }

    pub fn upstream_addr(&self) -> Result<SocketAddr> {
        self.upstream.parse().map_err(|_| HeimdallError::Config {
            path: PathBuf::from("<upstream>"),
            source: format!("invalid upstream address: {}", self.upstream).into(),
        })
    }
}

/// A single resolved source: id plus the fields the fetcher/parser need.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: String,
    pub url: String,
    pub format: BlocklistFormat,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct SourceEntry {
    #[serde(default)]
    #[allow(dead_code)]
    name: Option<String>,
    url: String,
    format: BlocklistFormat,
    #[serde(default = "default_true")]
    enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct PresetEntry {
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
    sources: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct UpdateSettings {
    #[serde(default = "default_source_timeout")]
    timeout: u64,
    #[serde(default = "default_true")]
    #[allow(dead_code)]
    include_comments: bool,
    #[serde(default = "default_true")]
    #[allow(dead_code)]
    deduplicate: bool,
}

fn default_source_timeout() -> u64 {
    30
}

impl Default for UpdateSettings {
    fn default() -> Self {
        UpdateSettings {
            timeout: default_source_timeout(),
            include_comments: true,
            deduplicate: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SourceConfig {
    #[serde(default)]
    sources: HashMap<String, SourceEntry>,
    #[serde(default)]
    presets: HashMap<String, PresetEntry>,
    #[serde(default)]
    update: UpdateSettings,
}

impl SourceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| HeimdallError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|e| HeimdallError::Config {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.update.timeout)
    }

    fn resolve(&self, id: &str) -> Option<Source> {
        self.sources.get(id).map(|entry| Source {
            id: id.to_string(),
            url: entry.url.clone(),
            format: entry.format,
            enabled: entry.enabled,
        })
    }

    pub fn enabled_sources(&self) -> Vec<Source> {
        self.sources
            .keys()
            .filter_map(|id| self.resolve(id))
            .filter(|s| s.enabled)
            .collect()
    }

    /// Resolves the sources named by a preset, in the order listed.
    /// Unknown source ids inside the preset are skipped rather than
    /// failing the whole resolution.
    pub fn preset_sources(&self, preset: &str) -> Option<Vec<Source>> {
        let preset = self.presets.get(preset)?;
        Some(preset.sources.iter().filter_map(|id| self.resolve(id)).collect())
    }

    /// Sources to use for an update tick with no explicit list: the named
    /// preset if configured, else all enabled sources.
    pub fn resolve_for_update(&self, preset: Option<&str>) -> Vec<Source> {
        match preset.and_then(|p| self.preset_sources(p)) {
            Some(sources) => sources,
            None => self.enabled_sources(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yml");
        std::fs::write(&path, "port: 9999\n").unwrap();
        let config = ServerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_workers, 50);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ServerConfig::load(Some(Path::new("/nonexistent/path.yml"))).unwrap();
        assert_eq!(config.port, 5354);
    }

    #[test]
    fn env_override_wins_over_yaml_and_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yml");
        std::fs::write(&path, "port: 9999\n").unwrap();
        unsafe {
            std::env::set_var("NULLROUTE_PORT", "1234");
        }
        let config = ServerConfig::load(Some(&path)).unwrap();
        unsafe {
            std::env::remove_var("NULLROUTE_PORT");
        }
        assert_eq!(config.port, 1234);
    }

    #[test]
    fn preset_resolves_named_sources_in_order() {
        let yaml = r#"
sources:
  hagezi:
    name: Hagezi
    url: https://example.com/hagezi.txt
    format: domains
    enabled: true
  steven:
    name: StevenBlack
    url: https://example.com/steven.txt
    format: hosts
    enabled: false
presets:
  recommended:
    description: balanced
    sources: [hagezi, steven]
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.yml");
        std::fs::write(&path, yaml).unwrap();
        let config = SourceConfig::load(&path).unwrap();
        let sources = config.preset_sources("recommended").unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].id, "hagezi");
        assert_eq!(sources[1].id, "steven");
    }
}
