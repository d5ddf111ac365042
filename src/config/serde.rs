use std::fmt;
use std::time::Duration;

use humantime::parse_duration;
use serde::de::{self, Visitor};
use serde_with::DeserializeAs;

/// Duration given either as a bare number of seconds or as a humantime
/// string such as `"90s"` or `"2m"`.
pub(super) struct SecondsOrHumantime;

pub(super) fn parse_delay(raw: &str) -> std::result::Result<Duration, String> {
    let trimmed = raw.trim();
    if let Ok(secs) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    parse_duration(trimmed).map_err(|err| err.to_string())
}

struct DelayVisitor;

impl Visitor<'_> for DelayVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number of seconds or a duration string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Duration, E> {
        Ok(Duration::from_secs(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Duration, E> {
        u64::try_from(value)
            .map(Duration::from_secs)
            .map_err(|_| E::custom(format!("delay cannot be negative, got {value}")))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Duration, E> {
        parse_delay(value).map_err(E::custom)
    }
}

impl<'de> DeserializeAs<'de, Duration> for SecondsOrHumantime {
    fn deserialize_as<D>(deserializer: D) -> std::result::Result<Duration, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(DelayVisitor)
    }
}
