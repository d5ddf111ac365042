#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod dedup;
pub mod dt_client;
pub mod error;
pub mod poller;
pub mod queue;
pub mod telemetry;
pub mod types;
pub mod webhook;

pub type Result<T> = std::result::Result<T, error::Error>;
