//! Builders to construct schedulers from configuration.

use anyhow::Context;

use crate::config::SchedulerConfig;
use crate::core::{AppResult, RequestScheduler, SchedulerError, Spawn, Upstream};
use crate::infra::HttpUpstream;
use crate::runtime::TokioSpawner;

/// Validate `cfg` and build a scheduler around the given upstream and spawner.
pub fn build_scheduler<U, S>(
    cfg: &SchedulerConfig,
    upstream: U,
    spawner: S,
) -> Result<RequestScheduler<U, S>, SchedulerError>
where
    U: Upstream,
    S: Spawn,
{
    cfg.validate().map_err(SchedulerError::Config)?;

    let complete = cfg.credentials.iter().filter(|p| p.is_complete()).count();
    tracing::info!(
        configured = cfg.credentials.len(),
        complete,
        api_root = %cfg.api_root(),
        "building request scheduler"
    );
    Ok(RequestScheduler::new(cfg, upstream, spawner))
}

/// Build a scheduler that talks to the configured campus API over HTTP.
pub fn build_http_scheduler<S: Spawn>(
    cfg: &SchedulerConfig,
    spawner: S,
) -> Result<RequestScheduler<HttpUpstream, S>, SchedulerError> {
    let upstream = HttpUpstream::new(cfg)?;
    build_scheduler(cfg, upstream, spawner)
}

/// Read configuration from `.env` and the environment, then build an HTTP
/// scheduler on the current tokio runtime.
pub fn build_from_env() -> AppResult<RequestScheduler<HttpUpstream, TokioSpawner>> {
    let cfg = SchedulerConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("loading scheduler configuration")?;
    let spawner = TokioSpawner::try_current().context("no tokio runtime available")?;
    build_http_scheduler(&cfg, spawner).context("building HTTP scheduler")
}
