//! On-disk configuration under `~/.ale/`: `config`, `scanlists`,
//! `lqa_history`, and the `log` stream.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AleError;
use crate::lqa::HistoryEntry;
use crate::scanlist::Scanlists;

/// `radio` section of `~/.ale/config`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RadioConfig {
    pub serial_port: Option<String>,
}

/// `modem` section of `~/.ale/config`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModemConfig {
    #[serde(default = "default_alsa_device")]
    pub alsa_device: String,
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
    #[serde(default = "default_sync_byte")]
    pub sync_byte: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_alsa_device() -> String {
    "QDX".to_string()
}
fn default_baudrate() -> u32 {
    300
}
fn default_sync_byte() -> String {
    "0x23".to_string()
}
fn default_confidence() -> f64 {
    1.5
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            alsa_device: default_alsa_device(),
            baudrate: default_baudrate(),
            sync_byte: default_sync_byte(),
            confidence: default_confidence(),
        }
    }
}

/// `~/.ale/config`. `address` is the only mandatory field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub address: String,
    #[serde(default)]
    pub group_addresses: Vec<String>,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default = "default_scanlist_name")]
    pub scanlist: String,
    #[serde(default)]
    pub radio: RadioConfig,
    #[serde(default)]
    pub modem: ModemConfig,
}

fn default_scanlist_name() -> String {
    "default".to_string()
}

impl Config {
    /// Builds a config for the given address with every other field defaulted.
    pub fn new(address: impl Into<String>) -> Result<Self, AleError> {
        let address = address.into();
        if address.is_empty() {
            return Err(AleError::InvalidAddress);
        }
        Ok(Self {
            address,
            group_addresses: Vec::new(),
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            scanlist: default_scanlist_name(),
            radio: RadioConfig::default(),
            modem: ModemConfig::default(),
        })
    }
}

/// The `~/.ale/` directory, plus the four file paths within it.
#[derive(Clone, Debug)]
pub struct Paths {
    pub dir: PathBuf,
    pub config: PathBuf,
    pub scanlists: PathBuf,
    pub lqa_history: PathBuf,
    pub log: PathBuf,
}

impl Paths {
    /// `~/.ale/`, derived via the `dirs` crate's home-directory lookup.
    pub fn default_dir() -> Result<Self, AleError> {
        let home = dirs::home_dir().ok_or_else(|| AleError::ConfigLoad("no home directory".to_string()))?;
        Ok(Self::at(home.join(".ale")))
    }

    /// An explicit config directory, useful for tests.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            config: dir.join("config"),
            scanlists: dir.join("scanlists"),
            lqa_history: dir.join("lqa_history"),
            log: dir.join("log"),
            dir,
        }
    }

    fn ensure_dir(&self) -> Result<(), AleError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| AleError::ConfigLoad(e.to_string()))?;
        }
        Ok(())
    }
}

/// Loads `paths.config`. There is no "write the default" behavior for this
/// file (address is mandatory and can't be invented), so a missing or
/// malformed config is a hard load failure for the caller to report.
pub fn load_config(paths: &Paths) -> Result<Config, AleError> {
    let text = fs::read_to_string(&paths.config).map_err(|e| AleError::ConfigLoad(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| AleError::ConfigLoad(e.to_string()))
}

/// Loads `paths.scanlists`, writing the default table out first if the file
/// doesn't exist yet.
pub fn load_or_init_scanlists(paths: &Paths) -> Scanlists {
    if !paths.scanlists.exists() {
        let default = Scanlists::default_table();
        if paths.ensure_dir().is_ok() {
            if let Ok(json) = serde_json::to_string_pretty(&default) {
                let _ = fs::write(&paths.scanlists, json);
            }
        }
        return default;
    }

    match fs::read_to_string(&paths.scanlists).and_then(|text| {
        serde_json::from_str(&text).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }) {
        Ok(scanlists) => scanlists,
        Err(_) => Scanlists::default_table(),
    }
}

/// Loads persisted LQA history, tolerating any read/parse failure by
/// returning an empty history.
pub fn load_lqa_history(paths: &Paths) -> Vec<HistoryEntry> {
    fs::read_to_string(&paths.lqa_history)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

/// Persists LQA history. Write failures are logged by the caller, not
/// propagated as a hard error (shutdown must still complete).
pub fn save_lqa_history(paths: &Paths, entries: &[HistoryEntry]) -> Result<(), AleError> {
    paths.ensure_dir()?;
    let json = serde_json::to_string(entries).map_err(|e| AleError::LqaLoad(e.to_string()))?;
    fs::write(&paths.lqa_history, json).map_err(|e| AleError::LqaLoad(e.to_string()))
}

/// Truncates the log file to start this run empty, matching the original
/// implementation's "clear log on startup."
pub fn reset_log(paths: &Paths) -> Result<(), AleError> {
    paths.ensure_dir()?;
    fs::write(&paths.log, b"").map_err(|e| AleError::ConfigLoad(e.to_string()))
}

/// Appends pre-formatted log lines to the log file.
pub fn append_log(path: &Path, lines: &str) -> Result<(), AleError> {
    use std::fs::OpenOptions;
    use std::io::Write;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AleError::ConfigLoad(e.to_string()))?;
    file.write_all(lines.as_bytes())
        .map_err(|e| AleError::ConfigLoad(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_in() {
        let json = r#"{"address": "AL1"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.scanlist, "default");
        assert_eq!(config.modem.baudrate, 300);
        assert_eq!(config.modem.alsa_device, "QDX");
    }

    #[test]
    fn config_rejects_empty_address() {
        assert!(Config::new("").is_err());
    }

    #[test]
    fn scanlist_round_trip_on_disk() {
        let dir = std::env::temp_dir().join(format!("ale-test-{}", std::process::id()));
        let paths = Paths::at(&dir);
        let loaded = load_or_init_scanlists(&paths);
        assert!(!loaded.names().is_empty());
        assert!(paths.scanlists.exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
