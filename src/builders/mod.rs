//! Builders to construct schedulers from configuration.

pub mod scheduler_builder;

pub use scheduler_builder::{build_from_env, build_http_scheduler, build_scheduler};
