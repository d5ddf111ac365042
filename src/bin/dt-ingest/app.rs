use std::path::PathBuf;

use dt_ingest::Result;
use dt_ingest::config::Config;
use dt_ingest::error::ConfigError;
use dt_ingest::poller::DedupPoller;
use dt_ingest::queue::EventQueue;
use dt_ingest::telemetry::init_tracing;
use dt_ingest::types::EventEnvelope;
use dt_ingest::webhook::WebhookServer;
use tokio::signal;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::cli::Cli;

const DEFAULT_CONFIG: &str = "dt-ingest.toml";

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut config = Config::from_env_and_file(&config_path)?;

    if let Some(delay) = cli.delay {
        match config.poller.as_mut() {
            Some(poller) => poller.poll_delay = delay,
            None => warn!("--delay ignored: no poller configured"),
        }
    }

    let queue = EventQueue::new();
    // Validated before anything starts listening or polling.
    let poller = config
        .poller
        .as_ref()
        .map(|cfg| DedupPoller::new(cfg, queue.clone(), cli.insecure))
        .transpose()?;

    if cli.once {
        let poller = poller.ok_or(ConfigError::MissingField { field: "poller" })?;
        let summary = poller.poll_once().await?;
        drain(&queue);
        info!(
            fetched = summary.fetched,
            skipped = summary.skipped,
            forwarded = summary.forwarded,
            mark_failures = summary.mark_failures,
            "single poll cycle finished"
        );
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let consumer = tokio::spawn(print_events(queue.clone(), shutdown.clone()));
    let poller_task = poller.map(|p| tokio::spawn(p.run(shutdown.clone())));
    let mut webhook_task = config
        .webhook
        .map(|cfg| tokio::spawn(WebhookServer::new(cfg, queue.clone()).run(shutdown.clone())));

    let early_exit = tokio::select! {
        res = signal::ctrl_c() => {
            if let Err(err) = res {
                warn!(error = %err, "cannot listen for ctrl-c, shutting down");
            }
            info!("shutdown signal received");
            None
        }
        res = wait_webhook(&mut webhook_task) => Some(res),
    };
    if early_exit.is_some() {
        webhook_task = None;
    }

    shutdown.cancel();
    if let Some(task) = poller_task {
        log_join("poller", task.await);
    }
    let mut result = early_exit.unwrap_or(Ok(()));
    if let Some(task) = webhook_task {
        result = result.and(webhook_outcome(task.await));
    }
    log_join("consumer", consumer.await);
    result
}

async fn wait_webhook(task: &mut Option<JoinHandle<Result<()>>>) -> Result<()> {
    match task {
        Some(handle) => webhook_outcome(handle.await),
        None => std::future::pending().await,
    }
}

fn webhook_outcome(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(res) => res,
        Err(err) => {
            warn!(error = %err, "webhook task terminated unexpectedly");
            Ok(())
        }
    }
}

fn log_join(task: &'static str, joined: std::result::Result<(), JoinError>) {
    if let Err(err) = joined {
        warn!(task, error = %err, "task terminated unexpectedly");
    }
}

/// Stand-in for the rule engine: one JSON document per line on stdout.
async fn print_events(queue: EventQueue, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            event = queue.dequeue() => match event {
                Some(event) => emit(&event),
                None => return,
            },
        }
    }
    drain(&queue);
}

fn drain(queue: &EventQueue) {
    while let Some(event) = queue.try_dequeue() {
        emit(&event);
    }
}

fn emit(event: &EventEnvelope) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!(error = %err, "failed to serialize event"),
    }
}
