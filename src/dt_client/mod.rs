//! Client for the Dynatrace problems API (v2).

use std::time::Duration;

pub(crate) mod client;
pub(crate) mod models;
pub(crate) mod ops;

pub use client::DtClient;
pub use models::{Comment, MarkOutcome, Problem};

/// How far back each poll looks for problems.
pub const PROBLEM_QUERY_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Connect and read timeout applied to every API call.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
