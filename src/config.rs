use std::path::Path;

use serde::Deserialize;

use crate::http::request::Method;

/// Server-wide configuration, loaded from a YAML file with env overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub parser: ParserLimits,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub tls: TlsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { listen_addr: default_listen_addr() }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

/// Hard limits enforced while parsing, before a message even reaches
/// validation.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ParserLimits {
    #[serde(default = "default_true")]
    pub strict_headers: bool,
    #[serde(default = "default_header_line")]
    pub max_header_line: usize,
    #[serde(default = "default_header_count")]
    pub max_header_count: usize,
    #[serde(default = "default_body_size")]
    pub max_body_size: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            strict_headers: true,
            max_header_line: default_header_line(),
            max_header_count: default_header_count(),
            max_body_size: default_body_size(),
        }
    }
}

/// Limits and policies applied by the security validator.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_body_size")]
    pub max_body_size: usize,
    #[serde(default = "default_url_length")]
    pub max_url_length: usize,
    #[serde(default = "default_header_count")]
    pub max_header_count: usize,
    #[serde(default = "default_header_line")]
    pub max_header_value_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_methods: default_allowed_methods(),
            max_body_size: default_body_size(),
            max_url_length: default_url_length(),
            max_header_count: default_header_count(),
            max_header_value_length: default_header_line(),
        }
    }
}

impl SecurityConfig {
    /// The configured method whitelist, unknown tokens dropped.
    pub fn allowed_methods(&self) -> Vec<Method> {
        self.allowed_methods
            .iter()
            .map(|m| Method::from_token(m))
            .filter(|m| *m != Method::UNKNOWN)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub cert_file: Option<String>,
    #[serde(default)]
    pub key_file: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_header_line() -> usize {
    8192
}

fn default_header_count() -> usize {
    100
}

fn default_body_size() -> usize {
    1024 * 1024
}

fn default_url_length() -> usize {
    2048
}

fn default_allowed_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Loads configuration from the YAML file named by `KEYSTONE_CONFIG`
    /// (default `keystone.yaml`) when it exists, else falls back to defaults.
    /// The `LISTEN` env var overrides the listen address either way.
    pub fn load() -> anyhow::Result<Self> {
        let path =
            std::env::var("KEYSTONE_CONFIG").unwrap_or_else(|_| "keystone.yaml".to_string());

        let mut config = if Path::new(&path).exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&raw)?
        } else {
            Config::default()
        };

        if let Ok(listen) = std::env::var("LISTEN") {
            config.server.listen_addr = listen;
        }

        Ok(config)
    }
}
