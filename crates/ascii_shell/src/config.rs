use std::path::{Path, PathBuf};

use ascii_density::RoundingPolicy;
use serde::{Deserialize, Serialize};

use crate::output::OutputMethod;
use crate::shell::CharsetSpec;

pub const DEFAULT_CONFIG_FILE: &str = "ascii_shell.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Starting state of a shell session.
///
/// Every key is optional; missing keys keep their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ShellConfig {
    /// Characters per row of the first conversion.
    pub resolution: u32,
    /// Initial characters, written like an `add` argument (`0-9`, `all`, `x`).
    pub charset: String,
    /// One of `abs`, `up`, `down`.
    pub rounding: String,
    pub output: OutputMethod,
    pub html_path: PathBuf,
    pub font: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            resolution: 2,
            charset: "0-9".into(),
            rounding: RoundingPolicy::default().name().into(),
            output: OutputMethod::Console,
            html_path: PathBuf::from("out.html"),
            font: "Courier New".into(),
        }
    }
}

impl ShellConfig {
    /// Load `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        log::info!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config: ShellConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution == 0 {
            return Err(ConfigError::Validation("resolution must be positive".into()));
        }
        if self.font.trim().is_empty() {
            return Err(ConfigError::Validation("font must not be empty".into()));
        }
        self.charset_spec()?;
        self.rounding_policy()?;
        Ok(())
    }

    pub fn charset_spec(&self) -> Result<CharsetSpec, ConfigError> {
        self.charset.parse().map_err(|_| {
            ConfigError::Validation(format!("unrecognised charset {:?}", self.charset))
        })
    }

    pub fn rounding_policy(&self) -> Result<RoundingPolicy, ConfigError> {
        self.rounding.parse().map_err(|err| ConfigError::Validation(format!("{err}")))
    }
}
