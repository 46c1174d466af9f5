use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[cfg(feature = "logging")]
use tracing_subscriber::filter::LevelFilter;

/// Default settings file, looked up relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "LambdaDeploy.toml";

/// Prefix of environment variables that override settings file values.
pub const ENV_PREFIX: &str = "LAMBDA_DEPLOY_";

/// Implementation of [`serde`]'s deserializer for [`FromStr`] types.
#[cfg(feature = "logging")]
fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error,
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    std::str::FromStr::from_str(&s).map_err(serde::de::Error::custom)
}

/// Logging configuration.
#[cfg(feature = "logging")]
#[derive(Deserialize)]
pub struct Logging {
    /// Log level.
    #[serde(deserialize_with = "deserialize_from_str")]
    pub level: LevelFilter,
}

#[cfg(feature = "logging")]
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
        }
    }
}

/// General tool settings.
///
/// These settings describe how the tool itself behaves. Projects and their
/// deployment targets live in a separate JSON document.
#[derive(Deserialize, Default)]
pub struct Config {
    /// Logging configuration.
    #[cfg(feature = "logging")]
    #[serde(default)]
    pub logging: Logging,

    /// Directory used for scratch archives instead of the projects file directory.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

impl Config {
    /// Create new config using the settings file or environment variables.
    ///
    /// A missing settings file is not an error, every value has a default.
    /// See [`Env`] for more details on how to use environment variables configuration.
    ///
    /// [`Env`]: figment::providers::Env
    pub fn new(path: Option<PathBuf>) -> Result<Self, figment::Error> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(
                    path.unwrap_or(PathBuf::from(DEFAULT_SETTINGS_FILE)),
                ))
                .merge(Env::prefixed(ENV_PREFIX).split("_")),
        )
    }

    /// Extract the config from an already assembled [`Figment`].
    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        figment.extract()
    }
}
