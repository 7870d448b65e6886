//! Runtime adapters and the consumer-facing API surface.

pub mod api;
pub mod tokio_spawner;

pub use api::{health, snapshot, CampusApi, Health, SchedulerSnapshot};
pub use tokio_spawner::TokioSpawner;
