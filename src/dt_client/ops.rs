use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::Result;
use crate::error::DtError;

use super::DtClient;
use super::client::body_preview;
use super::models::{CommentBody, MarkOutcome, Problem, ProblemsPage};

impl DtClient {
    /// Problems detected within the last `window`, with their recent comments.
    ///
    /// Entries that cannot be read are logged and left out.
    ///
    /// # Errors
    ///
    /// [`DtError::Network`] when the API cannot be reached, [`DtError::Remote`]
    /// for a non-2xx answer and [`DtError::Decode`] for an unreadable body.
    pub async fn recent_problems(&self, window: Duration) -> Result<Vec<Problem>> {
        let minutes = window.as_secs().div_ceil(60).max(1);
        let mut url = self.endpoint(&[]);
        url.query_pairs_mut()
            .append_pair("fields", "recentComments")
            .append_pair("from", &format!("now-{minutes}m"))
            .append_pair("to", "now");

        let response = self.send("problems.list", self.get(url)).await?;
        let status = response.status();
        let body = response.bytes().await.map_err(DtError::from)?;
        if !status.is_success() {
            return Err(DtError::Remote {
                status,
                body: body_preview(&body),
            }
            .into());
        }

        let page: ProblemsPage = serde_json::from_slice(&body).map_err(|err| DtError::Decode {
            message: format!("{err}; body preview: {}", body_preview(&body)),
        })?;
        if page.next_page_key.is_some() {
            debug!("more problems available than one page; only the first page is read");
        }

        Ok(page
            .problems
            .into_iter()
            .filter_map(|raw| match Problem::try_from(raw) {
                Ok(problem) => Some(problem),
                Err(err) => {
                    warn!(error = %err, "skipping problem entry");
                    None
                }
            })
            .collect())
    }

    /// Post the "sent to EDA" comment on a problem.
    ///
    /// Anything but `201 Created` is logged and reported as
    /// [`MarkOutcome::Unexpected`]; it is not an error.
    ///
    /// # Errors
    ///
    /// [`DtError::Network`] when the API cannot be reached.
    pub async fn mark_forwarded(&self, problem_id: &str) -> Result<MarkOutcome> {
        let url = self.endpoint(&[problem_id, "comments"]);
        let request = self.post(url).json(&CommentBody::FORWARDED);
        let response = self.send("problems.comment", request).await?;

        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(MarkOutcome::Created);
        }
        let body = response.bytes().await.unwrap_or_default();
        warn!(
            problem_id,
            status = %status,
            body = %body_preview(&body),
            "problem comment was not created"
        );
        Ok(MarkOutcome::Unexpected(status))
    }
}
