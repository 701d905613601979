use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_POLLS_DIR: &str = "polls";
const DEFAULT_BUCKET: &str = "electronic-voting-system";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown STORAGE_BACKEND {0:?} (expected local, supabase or memory)")]
    UnknownBackend(String),
    #[error("{0} must be set when STORAGE_BACKEND=supabase")]
    Missing(&'static str),
    #[error("invalid BIND_ADDR {0:?}")]
    InvalidBindAddr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Local {
        dir: PathBuf,
    },
    Supabase {
        url: String,
        api_key: String,
        bucket: String,
    },
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend = var("STORAGE_BACKEND").unwrap_or_else(|| "local".to_owned());
        let storage = match backend.to_ascii_lowercase().as_str() {
            "local" => StorageConfig::Local {
                dir: var("POLLS_DIR")
                    .unwrap_or_else(|| DEFAULT_POLLS_DIR.to_owned())
                    .into(),
            },
            "supabase" => StorageConfig::Supabase {
                url: var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?,
                api_key: var("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?,
                bucket: var("SUPABASE_BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET.to_owned()),
            },
            "memory" => StorageConfig::Memory,
            _ => return Err(ConfigError::UnknownBackend(backend)),
        };

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(bind_addr))?;

        Ok(Config { storage, bind_addr })
    }
}
