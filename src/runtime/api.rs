//! Consumer-facing API surface: typed JSON helpers, pagination and status
//! snapshots on top of a [`RequestScheduler`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::{
    ApiResponse, RequestOptions, RequestScheduler, SchedulerError, SchedulerStats, Spawn,
    Upstream,
};

/// Upper bound on pages fetched by [`CampusApi::get_all_pages`].
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// Scheduler state for status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    /// Token pool size, once initialized.
    pub pool_size: Option<usize>,
    /// Minimum dispatch spacing in milliseconds, once initialized.
    pub dispatch_interval_ms: Option<u64>,
    /// Requests waiting for dispatch.
    pub queue_depth: usize,
    /// Whether a drain loop is active.
    pub draining: bool,
    /// Cached fatal initialization error.
    pub initialization_error: Option<String>,
    /// Activity counters.
    pub stats: SchedulerStats,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// False once token initialization has failed fatally.
    pub ok: bool,
}

/// Campus API client used by the dashboard's handlers.
pub struct CampusApi<U, S> {
    scheduler: RequestScheduler<U, S>,
    max_pages: u32,
}

impl<U, S: Clone> Clone for CampusApi<U, S> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            max_pages: self.max_pages,
        }
    }
}

impl<U, S> CampusApi<U, S>
where
    U: Upstream,
    S: Spawn,
{
    /// Wrap a scheduler.
    pub const fn new(scheduler: RequestScheduler<U, S>) -> Self {
        Self {
            scheduler,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Cap the number of pages [`get_all_pages`](Self::get_all_pages) fetches.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Underlying scheduler.
    pub const fn scheduler(&self) -> &RequestScheduler<U, S> {
        &self.scheduler
    }

    /// Raw GET through the scheduler.
    pub async fn get(&self, path: &str) -> Result<ApiResponse, SchedulerError> {
        self.scheduler.fetch(path, RequestOptions::get()).await
    }

    /// GET and decode a JSON body. Non-2xx statuses, an exhausted 429
    /// included, become [`SchedulerError::UpstreamStatus`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SchedulerError> {
        let response = self.get(path).await?;
        decode(path, &response)
    }

    /// Fetch every page of a list endpoint and concatenate the items.
    ///
    /// Stops at the first page shorter than `page_size` or after the page cap.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        page_size: u32,
    ) -> Result<Vec<T>, SchedulerError> {
        let page_size = page_size.max(1);
        let mut items = Vec::new();

        for page in 1..=self.max_pages {
            let batch: Vec<T> = self.get_json(&paged_path(path, page_size, page)).await?;
            let fetched = batch.len();
            items.extend(batch);
            if fetched < page_size as usize {
                return Ok(items);
            }
        }

        tracing::warn!(path, max_pages = self.max_pages, "page cap reached");
        Ok(items)
    }
}

impl<U, S> CampusApi<U, S> {
    /// Snapshot of scheduler state.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        snapshot(&self.scheduler)
    }

    /// Health payload.
    pub fn health(&self) -> Health {
        health(&self.scheduler)
    }
}

/// Build a snapshot of scheduler state.
pub fn snapshot<U, S>(scheduler: &RequestScheduler<U, S>) -> SchedulerSnapshot {
    SchedulerSnapshot {
        pool_size: scheduler.pool_size(),
        dispatch_interval_ms: scheduler
            .dispatch_interval()
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        queue_depth: scheduler.queue_len(),
        draining: scheduler.is_draining(),
        initialization_error: scheduler.initialization_error().map(|e| e.to_string()),
        stats: scheduler.stats(),
    }
}

/// Return a health payload.
pub fn health<U, S>(scheduler: &RequestScheduler<U, S>) -> Health {
    Health {
        ok: scheduler.initialization_error().is_none(),
    }
}

fn decode<T: DeserializeOwned>(path: &str, response: &ApiResponse) -> Result<T, SchedulerError> {
    if !response.is_success() {
        return Err(SchedulerError::UpstreamStatus {
            status: response.status().as_u16(),
            path: path.to_string(),
        });
    }
    response.json().map_err(|e| SchedulerError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn paged_path(path: &str, page_size: u32, page: u32) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}page[size]={page_size}&page[number]={page}")
}
