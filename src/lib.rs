//! # Campus Scheduler
//!
//! Outbound request scheduler for the campus API.
//!
//! The campus API rate-limits each OAuth application separately. This crate
//! spreads outbound traffic across several client-credential tokens while
//! keeping the combined request rate under their shared budget.
//!
//! ## How it works
//!
//! - **Token pool**: one bearer token per configured `CLIENT_ID{i}` /
//!   `CLIENT_SECRET{i}` pair, exchanged lazily on first use. Concurrent first
//!   callers share a single initialization.
//! - **Single drain loop**: requests go through one FIFO queue and are
//!   dispatched one at a time, at most one in flight.
//! - **Pacing**: consecutive dispatches are at least
//!   `1s / (requests_per_token_per_second * pool_size)` apart.
//! - **Rotation**: each dispatch takes the next token round-robin.
//! - **429 backoff**: a rate-limited request waits `1s * 2^retries` and goes
//!   back to the head of the queue. After 3 retries the 429 is returned to the
//!   caller as an ordinary response.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use campus_scheduler::builders::build_from_env;
//! use campus_scheduler::core::RequestOptions;
//! use campus_scheduler::runtime::CampusApi;
//!
//! # async fn run() -> anyhow::Result<()> {
//! campus_scheduler::util::init_tracing();
//! let scheduler = build_from_env()?;
//!
//! // Raw response: callers inspect the status themselves.
//! let response = scheduler.fetch("/users/me", RequestOptions::get()).await?;
//! println!("{} {}", response.status(), response.text());
//!
//! // Typed helpers for dashboard handlers.
//! let api = CampusApi::new(scheduler);
//! let events: Vec<serde_json::Value> = api.get_all_pages("/campus/1/events", 100).await?;
//! # Ok(())
//! # }
//! ```
//!
//! For complete scenarios see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: queue, pacing, retries, token pool and the drain loop.
pub mod core;
/// Configuration models for the scheduler and its upstream.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters for the upstream HTTP API.
pub mod infra;
/// Runtime adapters and the consumer-facing API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::config::SchedulerConfig;
pub use crate::core::{ApiResponse, RequestOptions, RequestScheduler, SchedulerError};
