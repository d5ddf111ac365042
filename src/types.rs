use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which ingester produced an event.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    DtEsaApi,
    DtWebhook,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DtEsaApi => "dt_esa_api",
            Self::DtWebhook => "dt_webhook",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context attached to an event. Never holds the credential the event was
/// received with.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventMeta {
    pub source: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

/// The unit placed on the event queue.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EventEnvelope {
    pub payload: Value,
    pub meta: EventMeta,
}

impl EventEnvelope {
    #[must_use]
    pub fn from_problem(raw: Value) -> Self {
        Self {
            payload: raw,
            meta: EventMeta {
                source: SourceKind::DtEsaApi,
                headers: None,
            },
        }
    }

    #[must_use]
    pub fn from_webhook(payload: Value, headers: BTreeMap<String, String>) -> Self {
        Self {
            payload,
            meta: EventMeta {
                source: SourceKind::DtWebhook,
                headers: Some(headers),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EventEnvelope, SourceKind};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn problem_envelope_omits_headers() {
        let env = EventEnvelope::from_problem(json!({"problemId": "P1"}));
        let rendered = serde_json::to_value(&env).unwrap_or_default();
        assert_eq!(
            rendered,
            json!({"payload": {"problemId": "P1"}, "meta": {"source": "dt_esa_api"}})
        );
    }

    #[test]
    fn webhook_envelope_carries_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let env = EventEnvelope::from_webhook(json!({"eventId": "1A2B3C"}), headers);
        assert_eq!(env.meta.source, SourceKind::DtWebhook);
        let rendered = serde_json::to_value(&env).unwrap_or_default();
        assert_eq!(
            rendered["meta"]["headers"]["content-type"],
            json!("application/json")
        );
    }
}
