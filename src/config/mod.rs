//! Configuration models for the scheduler and its upstream.

pub mod scheduler;

pub use scheduler::{CredentialPair, SchedulerConfig, DEFAULT_API_BASE_URL};
