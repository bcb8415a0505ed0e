use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DATA_DIR: &str = "fc_predictor";
const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base: String,
    pub http_timeout: Duration,
    pub data_dir: Option<PathBuf>,
    pub workers: usize,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Reads `PREDICTOR_*` variables; bad values fall back to defaults.
    pub fn from_env() -> Self {
        let api_base = opt_env("PREDICTOR_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let http_timeout = Duration::from_secs(
            env::var("PREDICTOR_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(10)
                .clamp(1, 120),
        );
        let workers = env::var("PREDICTOR_WORKERS")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(4)
            .clamp(1, 16);
        let data_dir = opt_env("PREDICTOR_DATA_DIR")
            .map(PathBuf::from)
            .or_else(default_data_dir);
        let log_file = opt_env("PREDICTOR_LOG_FILE").map(PathBuf::from);
        Self {
            api_base,
            http_timeout,
            data_dir,
            workers,
            log_file,
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

fn default_data_dir() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Some(base) = opt_env("XDG_CACHE_HOME") {
        return Some(PathBuf::from(base).join(DATA_DIR));
    }
    let home = opt_env("HOME")?;
    Some(PathBuf::from(home).join(".cache").join(DATA_DIR))
}
