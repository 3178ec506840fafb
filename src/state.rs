use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::registry::ModelRegistry;
use crate::error::{AppError, Result};

/// Configuration for the application
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Directory holding downloaded model assets
    pub asset_dir: PathBuf,
    /// Name of the model asset to load (without `.json`)
    pub asset_name: String,
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Number of matches returned when a request does not ask for a count
    pub default_k: i64,
    /// Maximum upload size in bytes
    pub max_upload_size: usize,
    /// Allowed file extensions for uploads
    pub allowed_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("models"),
            asset_name: String::from("ImageSimilarity"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            default_k: 5,
            max_upload_size: 20 * 1024 * 1024, // 20MB
            allowed_extensions: vec!["jpg", "jpeg", "png", "webp", "gif"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Config {
    /// Defaults overridden by `IMAGERANK_*` environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        if let Some(dir) = env_var("IMAGERANK_ASSET_DIR") {
            config.asset_dir = PathBuf::from(dir);
        }
        if let Some(name) = env_var("IMAGERANK_ASSET_NAME") {
            config.asset_name = name;
        }
        if let Some(addr) = parse_env("IMAGERANK_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(k) = parse_env("IMAGERANK_DEFAULT_K")? {
            config.default_k = k;
        }
        if let Some(size) = parse_env("IMAGERANK_MAX_UPLOAD_SIZE")? {
            config.max_upload_size = size;
        }
        Ok(config)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| AppError::Config(format!("{}={:?}: {}", key, raw, e)))
        })
        .transpose()
}

/// Application state that can be shared across handlers
#[derive(Debug)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Source of the active similarity model
    pub registry: ModelRegistry,
}

impl AppState {
    /// Create a new application state with default configuration
    pub fn new() -> Arc<Self> {
        Self::with_config(Config::default())
    }

    /// Create a new application state with custom configuration
    ///
    /// The model is not loaded; call [`ModelRegistry::load`] on `registry`.
    pub fn with_config(config: Config) -> Arc<Self> {
        let registry = ModelRegistry::new(config.asset_dir.clone(), config.asset_name.clone());

        Arc::new(Self { config, registry })
    }
}
