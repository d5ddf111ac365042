//! Periodic poll of recent problems, forwarding the ones not yet marked.
//!
//! Each forwarded problem is enqueued first and marked second, so a failed
//! marking call leads to a repeat delivery on a later cycle rather than a
//! lost one.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::config::{PollerConfig, validate_delay};
use crate::dedup::{CommentMarker, DedupStrategy};
use crate::dt_client::{DtClient, MarkOutcome, PROBLEM_QUERY_WINDOW};
use crate::queue::EventQueue;
use crate::types::EventEnvelope;

/// Counters for one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub fetched: usize,
    pub skipped: usize,
    pub forwarded: usize,
    pub mark_failures: usize,
}

pub struct DedupPoller<D = CommentMarker> {
    client: DtClient,
    queue: EventQueue,
    delay: Duration,
    dedup: D,
}

impl DedupPoller<CommentMarker> {
    /// Validate the configuration and build the API client. No request is
    /// made here.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the delay is not below the query
    /// window, or when the client cannot be built.
    pub fn new(config: &PollerConfig, queue: EventQueue, insecure_http: bool) -> Result<Self> {
        config.validate()?;
        let client = DtClient::new(config, insecure_http)?;
        Self::with_client(client, queue, config.poll_delay)
    }

    /// Poller over an existing client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the delay is zero or not below the
    /// query window.
    pub fn with_client(client: DtClient, queue: EventQueue, delay: Duration) -> Result<Self> {
        validate_delay(delay)?;
        Ok(Self {
            client,
            queue,
            delay,
            dedup: CommentMarker::default(),
        })
    }
}

impl<D: DedupStrategy> DedupPoller<D> {
    #[must_use]
    pub fn with_dedup<E: DedupStrategy>(self, dedup: E) -> DedupPoller<E> {
        DedupPoller {
            client: self.client,
            queue: self.queue,
            delay: self.delay,
            dedup,
        }
    }

    /// Poll until `shutdown` is cancelled. In-flight requests are dropped on
    /// cancellation and the client is released on return.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(delay_s = self.delay.as_secs(), "problem poller started");
        loop {
            let started = Instant::now();
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                res = self.poll_once() => match res {
                    Ok(summary) => info!(
                        fetched = summary.fetched,
                        skipped = summary.skipped,
                        forwarded = summary.forwarded,
                        mark_failures = summary.mark_failures,
                        latency_ms = started.elapsed().as_millis(),
                        "poll cycle finished"
                    ),
                    Err(crate::error::Error::QueueClosed) => {
                        error!("event queue closed, stopping poller");
                        break;
                    }
                    Err(err) => warn!(error = %err, "poll cycle skipped"),
                },
            }

            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = sleep(self.delay) => {}
            }
        }
        info!("problem poller stopped");
    }

    /// One fetch, filter and forward pass.
    ///
    /// # Errors
    ///
    /// Fetch failures are returned untouched and nothing is forwarded.
    /// Marking failures are counted, not returned. [`crate::error::Error::QueueClosed`]
    /// aborts the batch.
    pub async fn poll_once(&self) -> Result<PollSummary> {
        let problems = self.client.recent_problems(PROBLEM_QUERY_WINDOW).await?;
        let mut summary = PollSummary {
            fetched: problems.len(),
            ..PollSummary::default()
        };

        for problem in problems {
            if self.dedup.is_already_forwarded(&problem) {
                debug!(display_id = %problem.display_id, "problem already sent to EDA");
                summary.skipped += 1;
                continue;
            }

            let problem_id = problem.problem_id.clone();
            let display_id = problem.display_id.clone();
            self.queue
                .enqueue(EventEnvelope::from_problem(problem.into_raw()))?;
            summary.forwarded += 1;
            debug!(%display_id, "new problem added to event queue");

            match self.client.mark_forwarded(&problem_id).await {
                Ok(MarkOutcome::Created) => {}
                Ok(MarkOutcome::Unexpected(_)) => summary.mark_failures += 1,
                Err(err) => {
                    warn!(%display_id, error = %err, "failed to mark problem as forwarded");
                    summary.mark_failures += 1;
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::DedupPoller;
    use crate::config::PollerConfig;
    use crate::dt_client::DtClient;
    use crate::error::{ConfigError, Error};
    use crate::queue::EventQueue;
    use std::time::Duration;

    #[test]
    fn refuses_delay_at_query_window() {
        let config = PollerConfig {
            api_host: url::Url::parse("https://abc123.live.dynatrace.com")
                .unwrap_or_else(|err| panic!("{err}")),
            api_token: "dt0c01.sample".into(),
            poll_delay: Duration::from_secs(600),
            proxy: None,
        };
        let res = DedupPoller::new(&config, EventQueue::new(), false);
        assert!(matches!(
            res,
            Err(Error::Config(ConfigError::InvalidField {
                field: "poller.delay",
                ..
            }))
        ));
    }

    fn local_client() -> DtClient {
        DtClient::with_timeout(
            url::Url::parse("http://127.0.0.1:9").unwrap_or_else(|err| panic!("{err}")),
            &"dt0c01.sample".into(),
            None,
            Duration::from_secs(1),
            true,
        )
        .unwrap_or_else(|err| panic!("{err}"))
    }

    #[test]
    fn existing_client_gets_the_same_delay_checks() {
        for secs in [0, 600, 3600] {
            let res =
                DedupPoller::with_client(local_client(), EventQueue::new(), Duration::from_secs(secs));
            assert!(
                matches!(
                    res,
                    Err(Error::Config(ConfigError::InvalidField {
                        field: "poller.delay",
                        ..
                    }))
                ),
                "{secs}s accepted"
            );
        }
        let ok = DedupPoller::with_client(local_client(), EventQueue::new(), Duration::from_millis(20));
        assert!(ok.is_ok());
    }
}
