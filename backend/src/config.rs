use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Server and artifact settings read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: num_cpus::get(),
            model_path: PathBuf::from("abnormal_usage_model.json"),
            scaler_path: PathBuf::from("scaler.json"),
            static_dir: PathBuf::from("./static"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
        }
        if let Some(workers) = lookup("WORKERS") {
            config.workers = workers
                .parse()
                .with_context(|| format!("WORKERS must be a positive integer, got {:?}", workers))?;
            anyhow::ensure!(config.workers > 0, "WORKERS must be at least 1");
        }
        if let Some(path) = lookup("MODEL_PATH") {
            config.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("SCALER_PATH") {
            config.scaler_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
