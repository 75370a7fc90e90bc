//! TOML configuration.
//!
//! Every section has defaults, so an empty file (or no file at all) yields
//! a working simulated service with the demo sources preloaded.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:7680"
//!
//! [simulation]
//! latency_ms = 250
//! failure_rate = 0.0
//! unreachable_hosts = ["db.offline.internal"]
//!
//! [ai]
//! enabled = true
//! auth_url = "https://auth.example.com/oauth/token"
//! endpoint = "https://ai.example.com/v1/genai"
//!
//! [fallback]
//! enabled = true
//! ```
//!
//! AI client credentials are never stored in the file. `[ai]` names the
//! environment variables they are read from.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7680".to_string()
}

/// Behaviour of the simulated backend.
#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Artificial latency added to every backend call.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Probability in `[0, 1]` that a connection probe is rejected.
    #[serde(default)]
    pub failure_rate: f64,
    /// Hosts the simulated backend treats as unreachable.
    #[serde(default)]
    pub unreachable_hosts: Vec<String>,
    /// Preload the demo sources at startup.
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,
    /// Bound on a connection attempt when the credentials carry none.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            failure_rate: 0.0,
            unreachable_hosts: Vec::new(),
            seed_demo_data: true,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl SimulationConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

fn default_latency_ms() -> u64 {
    250
}
fn default_true() -> bool {
    true
}
fn default_connect_timeout_secs() -> u64 {
    10
}

/// Remote AI backend used as the first stage of natural-language queries.
#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    /// OAuth token endpoint for the client-credentials exchange.
    #[serde(default)]
    pub auth_url: Option<String>,
    /// Query endpoint called with the bearer token.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_query_limit")]
    pub max_query_limit: u32,
    #[serde(default = "default_client_id_env")]
    pub client_id_env: String,
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auth_url: None,
            endpoint: None,
            timeout_secs: default_ai_timeout_secs(),
            max_query_limit: default_max_query_limit(),
            client_id_env: default_client_id_env(),
            client_secret_env: default_client_secret_env(),
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_ai_timeout_secs() -> u64 {
    5
}
fn default_max_query_limit() -> u32 {
    5
}
fn default_client_id_env() -> String {
    "DSYN_AI_CLIENT_ID".to_string()
}
fn default_client_secret_env() -> String {
    "DSYN_AI_CLIENT_SECRET".to_string()
}

/// Local responder used when the AI backend is unavailable.
#[derive(Debug, Deserialize, Clone)]
pub struct FallbackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default = "default_fallback_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            latency_ms: 0,
            timeout_secs: default_fallback_timeout_secs(),
        }
    }
}

impl FallbackConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_fallback_timeout_secs() -> u64 {
    5
}

/// Checks cross-field constraints that serde cannot express.
pub fn validate(config: &Config) -> Result<()> {
    if !(0.0..=1.0).contains(&config.simulation.failure_rate) {
        bail!("simulation.failure_rate must be in [0.0, 1.0]");
    }
    if config.simulation.connect_timeout_secs == 0 {
        bail!("simulation.connect_timeout_secs must be > 0");
    }
    if config.ai.timeout_secs == 0 {
        bail!("ai.timeout_secs must be > 0");
    }
    if config.fallback.timeout_secs == 0 {
        bail!("fallback.timeout_secs must be > 0");
    }
    if config.ai.enabled {
        if config.ai.auth_url.as_deref().map_or(true, str::is_empty) {
            bail!("ai.auth_url must be set when ai.enabled = true");
        }
        if config.ai.endpoint.as_deref().map_or(true, str::is_empty) {
            bail!("ai.endpoint must be set when ai.enabled = true");
        }
    }
    Ok(())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}
