use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DtError;

pub(crate) const COMMENT_CONTEXT: &str = "Event Driven Ansible";
pub(crate) const COMMENT_MESSAGE: &str = "Sent to EDA Server";

/// One detected problem as returned by `GET /api/v2/problems`.
///
/// Only the fields the poller needs are parsed; the full JSON object is
/// kept untouched for forwarding.
#[derive(Debug, Clone)]
pub struct Problem {
    pub problem_id: String,
    pub display_id: String,
    pub comments: Vec<Comment>,
    raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub content: String,
}

/// Result of posting the forwarded marker on a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Created,
    Unexpected(reqwest::StatusCode),
}

impl Problem {
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }

    #[must_use]
    pub fn into_raw(self) -> Value {
        self.raw
    }
}

impl TryFrom<Value> for Problem {
    type Error = DtError;

    fn try_from(raw: Value) -> std::result::Result<Self, DtError> {
        let parsed = RawProblem::deserialize(&raw).map_err(|err| DtError::Decode {
            message: format!("unreadable problem entry: {err}"),
        })?;
        let comments = parsed
            .recent_comments
            .map(|recent| recent.comments)
            .unwrap_or_default()
            .into_iter()
            .map(|c| Comment {
                content: c.content.unwrap_or_default(),
            })
            .collect();
        Ok(Self {
            display_id: parsed.display_id.unwrap_or_else(|| parsed.problem_id.clone()),
            problem_id: parsed.problem_id,
            comments,
            raw,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProblemsPage {
    #[serde(default)]
    pub(crate) problems: Vec<Value>,
    #[serde(default, rename = "nextPageKey")]
    pub(crate) next_page_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProblem {
    #[serde(rename = "problemId")]
    problem_id: String,
    #[serde(default, rename = "displayId")]
    display_id: Option<String>,
    #[serde(default, rename = "recentComments")]
    recent_comments: Option<RawRecentComments>,
}

#[derive(Debug, Deserialize)]
struct RawRecentComments {
    #[serde(default)]
    comments: Vec<RawComment>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommentBody {
    pub(crate) context: &'static str,
    pub(crate) message: &'static str,
}

impl CommentBody {
    pub(crate) const FORWARDED: Self = Self {
        context: COMMENT_CONTEXT,
        message: COMMENT_MESSAGE,
    };
}

#[cfg(test)]
mod tests {
    use super::Problem;
    use crate::error::DtError;
    use serde_json::json;

    #[test]
    fn keeps_raw_object_and_extracts_comments() {
        let raw = json!({
            "problemId": "-123_456V2",
            "displayId": "P-42",
            "title": "CPU saturation",
            "recentComments": {
                "comments": [
                    {"id": "1", "content": "looking into it"},
                    {"id": "2", "content": "Sent to EDA Server", "context": "Event Driven Ansible"}
                ],
                "totalCount": 2
            }
        });
        let problem = match Problem::try_from(raw.clone()) {
            Ok(p) => p,
            Err(err) => panic!("valid problem rejected: {err}"),
        };
        assert_eq!(problem.problem_id, "-123_456V2");
        assert_eq!(problem.display_id, "P-42");
        assert_eq!(problem.comments.len(), 2);
        assert_eq!(problem.comments[1].content, "Sent to EDA Server");
        assert_eq!(problem.into_raw(), raw);
    }

    #[test]
    fn missing_comment_block_means_no_comments() {
        let problem = Problem::try_from(json!({"problemId": "P1"}));
        assert!(matches!(problem, Ok(ref p) if p.comments.is_empty() && p.display_id == "P1"));
    }

    #[test]
    fn rejects_entry_without_problem_id() {
        let problem = Problem::try_from(json!({"displayId": "P-1"}));
        assert!(matches!(problem, Err(DtError::Decode { .. })));
    }
}
