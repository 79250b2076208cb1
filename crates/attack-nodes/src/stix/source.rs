//! STIX data sources
//!
//! `StixSource` is the data-fetch seam of the loader block. The HTTP source
//! downloads the MITRE ATT&CK bundles, the static source serves bundles held
//! in memory, and `CachedStixSource` keeps one fetched bundle per dataset
//! until it is invalidated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use super::model::StixBundle;
use crate::config::StixSourceKind;

/// Default values for STIX source configuration
pub mod defaults {
    pub const ENTERPRISE_URL: &str =
        "https://raw.githubusercontent.com/mitre-attack/attack-stix-data/master/enterprise-attack/enterprise-attack.json";
    pub const MOBILE_URL: &str =
        "https://raw.githubusercontent.com/mitre-attack/attack-stix-data/master/mobile-attack/mobile-attack.json";
    pub const ICS_URL: &str =
        "https://raw.githubusercontent.com/mitre-attack/attack-stix-data/master/ics-attack/ics-attack.json";

    /// Attempts per fetch, including the first
    pub const MAX_ATTEMPTS: u32 = 3;
    /// Backoff unit; attempt `n` waits `n * BACKOFF_MS` before retrying
    pub const BACKOFF_MS: u64 = 500;
    /// The enterprise bundle is tens of megabytes
    pub const REQUEST_TIMEOUT_SECS: u64 = 120;
}

/// Errors fetching or decoding STIX data
#[derive(Debug, Error)]
pub enum StixError {
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse STIX bundle from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unknown STIX source: {0}")]
    UnknownSource(String),

    #[error("No STIX bundle available for source '{0}'")]
    NotFound(StixSourceKind),
}

impl StixError {
    /// Whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            StixError::Http { .. } => true,
            StixError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Source of STIX bundles, keyed by dataset
#[async_trait]
pub trait StixSource: Send + Sync {
    async fn fetch(&self, kind: StixSourceKind) -> Result<Arc<StixBundle>, StixError>;
}

/// Bounded retry with linear backoff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_ATTEMPTS,
            backoff_ms: defaults::BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 0,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Where and how the HTTP source downloads bundles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StixSourceConfig {
    pub enterprise_url: String,
    pub mobile_url: String,
    pub ics_url: String,
    pub retry: RetryPolicy,
    pub timeout_secs: u64,
}

impl Default for StixSourceConfig {
    fn default() -> Self {
        Self {
            enterprise_url: defaults::ENTERPRISE_URL.to_string(),
            mobile_url: defaults::MOBILE_URL.to_string(),
            ics_url: defaults::ICS_URL.to_string(),
            retry: RetryPolicy::default(),
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl StixSourceConfig {
    pub fn url_for(&self, kind: StixSourceKind) -> &str {
        match kind {
            StixSourceKind::Enterprise => &self.enterprise_url,
            StixSourceKind::Mobile => &self.mobile_url,
            StixSourceKind::Ics => &self.ics_url,
        }
    }
}

/// Downloads bundles over HTTP
pub struct HttpStixSource {
    client: reqwest::Client,
    config: StixSourceConfig,
}

impl HttpStixSource {
    pub fn new(config: StixSourceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    pub fn config(&self) -> &StixSourceConfig {
        &self.config
    }

    async fn fetch_once(&self, url: &str) -> Result<StixBundle, StixError> {
        let response = self.client.get(url).send().await.map_err(|source| StixError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StixError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<StixBundle>().await.map_err(|source| {
            let url = url.to_string();
            if source.is_decode() {
                StixError::Decode { url, source }
            } else {
                StixError::Http { url, source }
            }
        })
    }
}

impl Default for HttpStixSource {
    fn default() -> Self {
        Self::new(StixSourceConfig::default())
    }
}

#[async_trait]
impl StixSource for HttpStixSource {
    async fn fetch(&self, kind: StixSourceKind) -> Result<Arc<StixBundle>, StixError> {
        let url = self.config.url_for(kind);
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            log::info!("Fetching {} STIX data from {} (attempt {})", kind, url, attempt);
            match self.fetch_once(url).await {
                Ok(bundle) => {
                    log::info!("STIX data loaded: {} objects", bundle.objects.len());
                    return Ok(Arc::new(bundle));
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.config.retry.delay_after(attempt);
                    log::warn!("Fetching {} STIX data failed: {}; retrying in {:?}", kind, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("Fetching {} STIX data failed: {}", kind, e);
                    return Err(e);
                }
            }
        }
    }
}

/// Serves bundles held in memory
#[derive(Default)]
pub struct StaticStixSource {
    bundles: HashMap<StixSourceKind, Arc<StixBundle>>,
}

impl StaticStixSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(mut self, kind: StixSourceKind, bundle: StixBundle) -> Self {
        self.insert(kind, bundle);
        self
    }

    pub fn insert(&mut self, kind: StixSourceKind, bundle: StixBundle) {
        self.bundles.insert(kind, Arc::new(bundle));
    }
}

#[async_trait]
impl StixSource for StaticStixSource {
    async fn fetch(&self, kind: StixSourceKind) -> Result<Arc<StixBundle>, StixError> {
        self.bundles
            .get(&kind)
            .cloned()
            .ok_or(StixError::NotFound(kind))
    }
}

/// Keeps the first successful fetch of each dataset
pub struct CachedStixSource<S> {
    inner: S,
    cache: RwLock<HashMap<StixSourceKind, Arc<StixBundle>>>,
}

impl<S: StixSource> CachedStixSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn is_cached(&self, kind: StixSourceKind) -> bool {
        self.cache.read().await.contains_key(&kind)
    }

    /// Drop the cached bundle of one dataset; returns whether one was cached
    pub async fn invalidate(&self, kind: StixSourceKind) -> bool {
        self.cache.write().await.remove(&kind).is_some()
    }

    /// Drop every cached bundle
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Fetch a dataset again, replacing the cached bundle on success
    ///
    /// On failure the previously cached bundle is kept.
    pub async fn refresh(&self, kind: StixSourceKind) -> Result<Arc<StixBundle>, StixError> {
        let bundle = self.inner.fetch(kind).await?;
        self.cache.write().await.insert(kind, bundle.clone());
        Ok(bundle)
    }
}

#[async_trait]
impl<S: StixSource> StixSource for CachedStixSource<S> {
    async fn fetch(&self, kind: StixSourceKind) -> Result<Arc<StixBundle>, StixError> {
        if let Some(bundle) = self.cache.read().await.get(&kind) {
            log::debug!("Using cached {} STIX data", kind);
            return Ok(bundle.clone());
        }
        self.refresh(kind).await
    }
}
