use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use dbridge_executor::ConfigStore;

pub const DEFAULT_CONFIG_FILE: &str = "database.json";
pub const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown log format '{0}', expected 'compact' or 'json'")]
pub struct UnknownLogFormat(String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub data_dir: PathBuf,
    pub config_file_name: String,
    pub log_filter: String,
    pub log_format: LogFormat,
    pub channel_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("dbridge"),
            config_file_name: DEFAULT_CONFIG_FILE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl BridgeConfig {
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(&self.config_file_name)
    }

    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(self.config_path())
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Set the base directory. A leading `~` expands to the home directory.
    pub fn set_data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.data_dir = expand_home(dir.as_ref());
        self
    }

    pub fn set_config_file_name(mut self, name: impl Into<String>) -> Self {
        self.config_file_name = name.into();
        self
    }

    pub fn set_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    pub fn set_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
