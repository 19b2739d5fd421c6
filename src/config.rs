//! Configuration tunables (§4.6/§5/§9) loaded from an optional INI file.
//!
//! Everything here is a constant in the reference design
//! (`STABILIZE_DELAY`, `PING_MAX_RETRIES`, `PING_RETRY_DELAY`); this crate
//! keeps the same default values but lets an operator override them via
//! `-c/--config` without recompiling, in the manner of the teacher's own
//! `rust-ini`-backed config loader.

use ini::Ini;

const DEFAULT_STABILIZE_DELAY_SECS: u64 = 20;
const DEFAULT_PING_MAX_RETRIES: u32 = 3;
const DEFAULT_PING_RETRY_DELAY_SECS: u64 = 20;
const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 3600;
const DEFAULT_NUM_WORKERS: usize = 4;
const DEFAULT_DATA_DIR: &str = ".";

#[derive(Debug, Clone)]
pub struct Config {
    pub stabilize_delay_secs: u64,
    pub ping_max_retries: u32,
    pub ping_retry_delay_secs: u64,
    pub connection_timeout_ms: u64,
    pub num_workers: usize,
    pub data_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stabilize_delay_secs: DEFAULT_STABILIZE_DELAY_SECS,
            ping_max_retries: DEFAULT_PING_MAX_RETRIES,
            ping_retry_delay_secs: DEFAULT_PING_RETRY_DELAY_SECS,
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            num_workers: DEFAULT_NUM_WORKERS,
            data_dir: DEFAULT_DATA_DIR.to_string(),
        }
    }
}

impl Config {
    /// Loads overrides from the `[node]` section of an INI file, falling
    /// back to the built-in default for any value the file omits.
    pub fn load_from_file(path: &str) -> crate::Result<Config> {
        let ini = Ini::load_from_file(path)?;
        let mut config = Config::default();

        if let Some(section) = ini.section(Some("node")) {
            if let Some(v) = section.get("stabilize_delay_secs") {
                config.stabilize_delay_secs = v.parse()?;
            }
            if let Some(v) = section.get("ping_max_retries") {
                config.ping_max_retries = v.parse()?;
            }
            if let Some(v) = section.get("ping_retry_delay_secs") {
                config.ping_retry_delay_secs = v.parse()?;
            }
            if let Some(v) = section.get("connection_timeout_ms") {
                config.connection_timeout_ms = v.parse()?;
            }
            if let Some(v) = section.get("num_workers") {
                config.num_workers = v.parse()?;
            }
            if let Some(v) = section.get("data_dir") {
                config.data_dir = v.to_string();
            }
        }

        Ok(config)
    }
}
