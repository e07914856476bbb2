//! Configuration resolution: defaults, system hostname, file, then flags.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::flags::Flags;
use crate::config::schema::{ConfigOverrides, ProcessConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::platform;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read the partial configuration stored in a TOML file.
pub fn load_overrides(path: &Path) -> Result<ConfigOverrides, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge every configuration source and validate the result.
///
/// The system hostname becomes the default before the file and the flags are
/// applied, so an explicit `hostname` always wins. A failed lookup leaves the
/// hostname empty.
pub fn resolve(
    system_hostname: Option<String>,
    file: Option<ConfigOverrides>,
    flags: ConfigOverrides,
) -> Result<ProcessConfig, ConfigError> {
    let mut config = ProcessConfig::default();

    if let Some(hostname) = system_hostname.filter(|h| !h.is_empty()) {
        config.hostname = hostname;
    }
    if let Some(file) = file {
        file.apply(&mut config);
    }
    flags.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Resolve the process configuration from parsed command-line flags.
pub fn load_config(flags: &Flags) -> Result<ProcessConfig, ConfigError> {
    let file = flags
        .config_file
        .as_deref()
        .map(load_overrides)
        .transpose()?;
    resolve(platform::system_hostname(), file, flags.overrides.clone())
}
