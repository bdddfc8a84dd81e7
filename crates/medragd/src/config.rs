//! Configuration management for medragd.
//!
//! Settings come from an optional TOML file (`MEDRAG_CONFIG`) with
//! environment variables applied on top. Read once at startup, immutable
//! afterwards.

use anyhow::{Context, Result};
use medrag_shared::AblationPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Env var naming an optional TOML config file
pub const CONFIG_PATH_VAR: &str = "MEDRAG_CONFIG";

/// ProofPath evidence tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofPathConfig {
    /// Attach evidence trail, confidence and audit metadata (PROOFPATH_ENABLED)
    #[serde(default)]
    pub enabled: bool,

    /// Most evidence references reported per response (PROOFPATH_MAX_PASSAGES)
    #[serde(default = "default_max_passages")]
    pub max_passages: usize,

    /// Match positional `passage_<n>` ids during ablation (PROOFPATH_POSITIONAL_ABLATION)
    #[serde(default)]
    pub positional_ablation: bool,
}

fn default_max_passages() -> usize {
    32
}

impl Default for ProofPathConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_passages: default_max_passages(),
            positional_ablation: false,
        }
    }
}

impl ProofPathConfig {
    pub fn ablation_policy(&self) -> AblationPolicy {
        AblationPolicy {
            match_positional_ids: self.positional_ablation,
        }
    }
}

/// Engine selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_llm_name")]
    pub llm_name: String,

    #[serde(default = "default_retriever_name")]
    pub retriever_name: String,

    #[serde(default = "default_corpus_name")]
    pub corpus_name: String,

    /// Directory searched for `<corpus_name>.json`
    #[serde(default = "default_db_dir")]
    pub db_dir: PathBuf,

    /// Tokenize the corpus once at startup instead of per query
    #[serde(default = "default_corpus_cache")]
    pub corpus_cache: bool,

    /// Substitute labeled fallback content when the engine fails
    #[serde(default)]
    pub fallback_on_error: bool,
}

fn default_llm_name() -> String {
    "OpenAI/gpt-3.5-turbo-16k".to_string()
}

fn default_retriever_name() -> String {
    "Contriever".to_string()
}

fn default_corpus_name() -> String {
    "Textbooks".to_string()
}

fn default_db_dir() -> PathBuf {
    PathBuf::from("./corpus")
}

fn default_corpus_cache() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm_name: default_llm_name(),
            retriever_name: default_retriever_name(),
            corpus_name: default_corpus_name(),
            db_dir: default_db_dir(),
            corpus_cache: default_corpus_cache(),
            fallback_on_error: false,
        }
    }
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

/// Log sinks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level directive used when RUST_LOG is unset (PROOFPATH_LOGGING_LEVEL)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file written alongside stdout; empty disables it
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_log_file() -> String {
    "medrag_service.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Full service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub proofpath: ProofPathConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from the process environment (and `MEDRAG_CONFIG`, if set)
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::load_from_path(Path::new(&path))?,
            None => Config::default(),
        };
        config.apply_env(&lookup);
        Ok(config)
    }

    /// Load config from a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Overlay environment variables onto the current values
    pub fn apply_env<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PROOFPATH_ENABLED") {
            self.proofpath.enabled = parse_flag(&v);
        }
        if let Some(v) = lookup("PROOFPATH_MAX_PASSAGES") {
            self.proofpath.max_passages =
                parse_number("PROOFPATH_MAX_PASSAGES", &v, self.proofpath.max_passages);
        }
        if let Some(v) = lookup("PROOFPATH_POSITIONAL_ABLATION") {
            self.proofpath.positional_ablation = parse_flag(&v);
        }
        if let Some(v) = lookup("PROOFPATH_LOGGING_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("MEDRAG_LOG_FILE") {
            self.logging.file = v;
        }
        if let Some(v) = lookup("MEDRAG_LLM_NAME") {
            self.engine.llm_name = v;
        }
        if let Some(v) = lookup("MEDRAG_RETRIEVER_NAME") {
            self.engine.retriever_name = v;
        }
        if let Some(v) = lookup("MEDRAG_CORPUS_NAME") {
            self.engine.corpus_name = v;
        }
        if let Some(v) = lookup("MEDRAG_DB_DIR") {
            self.engine.db_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDRAG_CORPUS_CACHE") {
            self.engine.corpus_cache = parse_flag(&v);
        }
        if let Some(v) = lookup("MEDRAG_FALLBACK_ON_ENGINE_ERROR") {
            self.engine.fallback_on_error = parse_flag(&v);
        }
        if let Some(v) = lookup("MEDRAG_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("MEDRAG_PORT") {
            self.server.port = parse_number("MEDRAG_PORT", &v, self.server.port);
        }
    }
}

/// Only a case-insensitive "true" enables a flag
fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_number<T>(key: &str, value: &str, current: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match value.trim().parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!("Ignoring invalid {}={:?}, keeping {}", key, value, current);
            current
        }
    }
}
