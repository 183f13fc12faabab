use log::{info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_TEMP_DIR: &str = "temp";
const DEFAULT_MAX_UPLOAD_MB: usize = 100;

/// Service settings, read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PDF2PPTX_BIND`
    pub bind: SocketAddr,
    /// `PDF2PPTX_TEMP_DIR`; holds uploads and converted decks until download
    pub temp_dir: PathBuf,
    /// `PDF2PPTX_MAX_UPLOAD_MB`, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Read settings from the process environment, after loading `.env` if
    /// one exists. Invalid values are logged and replaced by defaults.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServerConfig::default();

        if let Some(value) = lookup("PDF2PPTX_BIND") {
            match value.trim().parse::<SocketAddr>() {
                Ok(addr) => config.bind = addr,
                Err(e) => warn!(
                    "Failed to parse PDF2PPTX_BIND='{}' ({}), using {}",
                    value, e, DEFAULT_BIND
                ),
            }
        }

        if let Some(value) = lookup("PDF2PPTX_TEMP_DIR") {
            if value.trim().is_empty() {
                warn!("PDF2PPTX_TEMP_DIR is empty, using '{}'", DEFAULT_TEMP_DIR);
            } else {
                config.temp_dir = PathBuf::from(value.trim());
            }
        }

        if let Some(value) = lookup("PDF2PPTX_MAX_UPLOAD_MB") {
            match value.trim().parse::<usize>() {
                Ok(mb) if mb > 0 => config.max_upload_bytes = mb * 1024 * 1024,
                _ => warn!(
                    "Invalid PDF2PPTX_MAX_UPLOAD_MB='{}' (must be a positive integer), using {} MB",
                    value, DEFAULT_MAX_UPLOAD_MB
                ),
            }
        }

        config
    }
}
