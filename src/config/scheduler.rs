//! Scheduler configuration: upstream endpoints, pacing budget, retry policy
//! and the numbered client credential pairs.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{ClientCredential, RetryPolicy};

/// Default campus API host.
pub const DEFAULT_API_BASE_URL: &str = "https://api.intra.42.fr";

const CLIENT_ID_PREFIX: &str = "CLIENT_ID";
const CLIENT_SECRET_PREFIX: &str = "CLIENT_SECRET";

/// One numbered credential slot. Either half may be missing, in which case
/// the slot is skipped at initialization.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    /// Slot number, the `i` in `CLIENT_ID{i}`.
    pub index: u32,
    /// OAuth client id.
    #[serde(default)]
    pub client_id: Option<String>,
    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl CredentialPair {
    /// A slot with both halves present.
    pub fn new(index: u32, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            index,
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
        }
    }

    /// Both halves present and non-blank.
    pub fn is_complete(&self) -> bool {
        self.to_credential().is_some()
    }

    /// The usable credential, if complete.
    pub fn to_credential(&self) -> Option<ClientCredential> {
        let client_id = non_blank(self.client_id.as_deref())?;
        let client_secret = non_blank(self.client_secret.as_deref())?;
        Some(ClientCredential {
            index: self.index,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("index", &self.index)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Root scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Scheme and host of the campus API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Versioned prefix prepended to every request path.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Path of the OAuth token endpoint, relative to the base URL.
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// Request budget each token is allowed per second.
    #[serde(default = "default_requests_per_token_per_second")]
    pub requests_per_token_per_second: u32,

    /// Retries after a 429 before the response is handed back.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry, doubled each time.
    #[serde(default = "default_base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    /// Per-request timeout enforced by the HTTP client. None means no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Re-exchange a token once its reported expiry has passed.
    #[serde(default)]
    pub refresh_expired_tokens: bool,

    /// Numbered credential slots, in rotation order.
    #[serde(default)]
    pub credentials: Vec<CredentialPair>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_api_prefix() -> String {
    "/v2".to_string()
}

fn default_token_path() -> String {
    "/oauth/token".to_string()
}

const fn default_requests_per_token_per_second() -> u32 {
    2
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_base_retry_delay_ms() -> u64 {
    1000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_prefix: default_api_prefix(),
            token_path: default_token_path(),
            requests_per_token_per_second: default_requests_per_token_per_second(),
            max_retries: default_max_retries(),
            base_retry_delay_ms: default_base_retry_delay_ms(),
            request_timeout_secs: None,
            refresh_expired_tokens: false,
            credentials: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    ///
    /// An empty credential list is not a configuration error; it surfaces as
    /// a fatal initialization failure on first use.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(format!(
                "api_base_url must be an http(s) URL, got `{}`",
                self.api_base_url
            ));
        }
        if self.requests_per_token_per_second == 0 {
            return Err("requests_per_token_per_second must be greater than 0".into());
        }
        if self.base_retry_delay_ms == 0 {
            return Err("base_retry_delay_ms must be greater than 0".into());
        }
        if self.request_timeout_secs == Some(0) {
            return Err("request_timeout_secs must be greater than 0 when set".into());
        }
        let mut seen = HashSet::new();
        for pair in &self.credentials {
            if !seen.insert(pair.index) {
                return Err(format!("credential index {} defined twice", pair.index));
            }
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build from key/value pairs such as `std::env::vars()`.
    ///
    /// Reads `CLIENT_ID{i}` / `CLIENT_SECRET{i}` for any `i >= 1`, ordered by
    /// `i`, plus the `CAMPUS_*` overrides. Unrelated keys are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut cfg = Self::default();
        let mut slots: BTreeMap<u32, CredentialPair> = BTreeMap::new();

        for (key, value) in vars {
            let key = key.as_ref();
            let value: String = value.into();

            if let Some(index) = slot_index(key, CLIENT_ID_PREFIX) {
                slot_entry(&mut slots, index).client_id = Some(value);
                continue;
            }
            if let Some(index) = slot_index(key, CLIENT_SECRET_PREFIX) {
                slot_entry(&mut slots, index).client_secret = Some(value);
                continue;
            }

            match key {
                "CAMPUS_API_BASE_URL" => cfg.api_base_url = value,
                "CAMPUS_API_PREFIX" => cfg.api_prefix = value,
                "CAMPUS_TOKEN_PATH" => cfg.token_path = value,
                "CAMPUS_REQUESTS_PER_TOKEN" => {
                    cfg.requests_per_token_per_second = parse_var(key, &value)?;
                }
                "CAMPUS_MAX_RETRIES" => cfg.max_retries = parse_var(key, &value)?,
                "CAMPUS_RETRY_BASE_MS" => cfg.base_retry_delay_ms = parse_var(key, &value)?,
                "CAMPUS_REQUEST_TIMEOUT_SECS" => {
                    cfg.request_timeout_secs = Some(parse_var(key, &value)?);
                }
                "CAMPUS_REFRESH_EXPIRED_TOKENS" => {
                    cfg.refresh_expired_tokens = parse_var(key, &value)?;
                }
                _ => {}
            }
        }

        cfg.credentials = slots.into_values().collect();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `.env` if present, then build from the process environment.
    pub fn from_env() -> Result<Self, String> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(format!("failed to read .env: {e}")),
        }
        Self::from_vars(std::env::vars())
    }

    /// Retry policy derived from `max_retries` and `base_retry_delay_ms`.
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_retry_delay_ms),
        }
    }

    /// Base URL plus API prefix, without a trailing slash.
    pub fn api_root(&self) -> String {
        join_url(&self.api_base_url, &self.api_prefix)
    }

    /// Absolute URL of the token endpoint.
    pub fn token_url(&self) -> String {
        join_url(&self.api_base_url, &self.token_path)
    }

    /// Per-request timeout, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn slot_index(key: &str, prefix: &str) -> Option<u32> {
    let suffix = key.strip_prefix(prefix)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok().filter(|i| *i > 0)
}

fn slot_entry(slots: &mut BTreeMap<u32, CredentialPair>, index: u32) -> &mut CredentialPair {
    slots.entry(index).or_insert_with(|| CredentialPair {
        index,
        client_id: None,
        client_secret: None,
    })
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{key}: invalid value `{value}`: {e}"))
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
