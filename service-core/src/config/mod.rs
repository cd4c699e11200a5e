use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load the common settings.
    ///
    /// Sources, lowest precedence first: optional `configuration` file,
    /// `APP__*` variables, then the bare `PORT` variable used by most hosting
    /// platforms. `.env` is expected to be loaded by the binary beforehand.
    pub fn load() -> Result<Self, AppError> {
        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .set_override_option("port", env::var("PORT").ok().filter(|p| !p.is_empty()))?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Read an environment variable, falling back to `default` when unset.
///
/// Variables without a default are required and produce a configuration
/// error when missing.
pub fn get_env(key: &str, default: Option<&str>) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => match default {
            Some(def) => Ok(def.to_string()),
            None => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required but not set",
                key
            ))),
        },
    }
}

/// Read and parse an optional environment variable, using `default` when it
/// is unset.
pub fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}': {}", key, val, e))
        }),
        Err(_) => Ok(default),
    }
}
