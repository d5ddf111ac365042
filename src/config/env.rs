use std::time::Duration;

use crate::error::ConfigError;

use super::serde::parse_delay;

pub(super) fn env_string(key: &'static str) -> std::result::Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(ConfigError::Other(format!("{key}: {err}"))),
    }
}

pub(super) fn env_parse<T>(key: &'static str) -> std::result::Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)?
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|err| ConfigError::InvalidField {
                    field: key,
                    message: err.to_string(),
                })
        })
        .transpose()
}

pub(super) fn env_delay(key: &'static str) -> std::result::Result<Option<Duration>, ConfigError> {
    env_string(key)?
        .map(|value| {
            parse_delay(&value).map_err(|message| ConfigError::InvalidField {
                field: key,
                message,
            })
        })
        .transpose()
}
