//! Admission controller: result cache plus per-client rate limiting

use crate::cache::{CacheLookup, CachedResult};
use crate::clock::{Clock, SystemClock};
use crate::config::AdmissionConfig;
use crate::store::{Store, result_key, window_key};
use crate::window::{ClientWindow, WindowDecision};
use crate::{Error, Result};
use cannon_fingerprint::Fingerprint;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on compare-and-swap rounds for one admission
const MAX_WINDOW_UPDATE_ATTEMPTS: usize = 32;

/// Rate-limit decision for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may execute
    Allowed {
        /// Further admissions available in the current window
        remaining: usize,
    },
    /// The client has exhausted its window
    Denied {
        /// Time until a slot frees up
        retry_after: Duration,
    },
}

impl Admission {
    /// Whether the request may execute
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

impl From<WindowDecision> for Admission {
    fn from(decision: WindowDecision) -> Self {
        match decision {
            WindowDecision::Allowed { remaining } => Self::Allowed { remaining },
            WindowDecision::Denied { retry_after } => Self::Denied { retry_after },
        }
    }
}

/// Gates execution requests against the shared store
///
/// `lookup`, `admit` and `record` are independent calls; no lock is held
/// between admission and recording.
pub struct AdmissionController {
    store: Arc<dyn Store>,
    config: AdmissionConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("store", &self.store.name())
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish()
    }
}

impl AdmissionController {
    /// Create a controller using the wall clock
    pub fn new(store: Arc<dyn Store>, config: AdmissionConfig) -> Result<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a controller with an explicit time source
    pub fn with_clock(
        store: Arc<dyn Store>,
        config: AdmissionConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            clock,
        })
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Look up a cached result for `fingerprint` run in `image`
    ///
    /// With `bypass` set the store is not consulted and the lookup misses.
    pub async fn lookup(
        &self,
        fingerprint: &Fingerprint,
        image: &Fingerprint,
        bypass: bool,
    ) -> Result<CacheLookup> {
        if bypass {
            debug!(fingerprint = %fingerprint.short(), "Cache bypass requested");
            return Ok(CacheLookup::Miss);
        }

        let key = result_key(fingerprint, image);
        match self.timed("get", self.store.get(&key)).await? {
            Some(bytes) => {
                let result = CachedResult::decode(&bytes)?;
                debug!(fingerprint = %fingerprint.short(), "Cache hit");
                Ok(CacheLookup::Hit(result))
            }
            None => {
                debug!(fingerprint = %fingerprint.short(), "Cache miss");
                Ok(CacheLookup::Miss)
            }
        }
    }

    /// Check and update `client_id`'s sliding window
    ///
    /// The window is created on first contact and only written when the
    /// request is allowed. Concurrent admissions for one client are
    /// serialised through compare-and-swap, so at most `capacity` requests
    /// are allowed per window even under contention.
    pub async fn admit(&self, client_id: &str) -> Result<Admission> {
        let key = window_key(client_id);

        for attempt in 1..=MAX_WINDOW_UPDATE_ATTEMPTS {
            let current = self.timed("get", self.store.get(&key)).await?;
            let mut window = match current.as_deref() {
                Some(bytes) => ClientWindow::decode(bytes)?,
                None => ClientWindow::default(),
            };

            let decision = window.try_admit(
                self.clock.now(),
                self.config.capacity,
                self.config.window(),
                self.config.eviction,
            );

            if let WindowDecision::Denied { retry_after } = decision {
                info!(
                    client = %client_id,
                    retry_after_ms = retry_after.as_millis(),
                    "Rate limit exceeded"
                );
                return Ok(decision.into());
            }

            let encoded = window.encode()?;
            let swapped = self
                .timed(
                    "compare_and_swap",
                    self.store.compare_and_swap(&key, current.as_deref(), encoded),
                )
                .await?;
            if swapped {
                debug!(client = %client_id, attempt, ?decision, "Request admitted");
                return Ok(decision.into());
            }
            debug!(client = %client_id, attempt, "Window changed concurrently, re-reading");
        }

        warn!(
            client = %client_id,
            attempts = MAX_WINDOW_UPDATE_ATTEMPTS,
            "Giving up on contended window update"
        );
        Err(Error::Contention {
            key,
            attempts: MAX_WINDOW_UPDATE_ATTEMPTS,
        })
    }

    /// Store captured output under `fingerprint` and `image`
    ///
    /// Re-recording overwrites; the most recent write wins.
    pub async fn record(
        &self,
        fingerprint: &Fingerprint,
        image: &Fingerprint,
        stdout: Vec<String>,
        stderr: Vec<String>,
    ) -> Result<()> {
        let encoded = CachedResult::new(stdout, stderr).encode()?;
        self.timed(
            "set",
            self.store.set(&result_key(fingerprint, image), encoded),
        )
        .await?;
        debug!(
            fingerprint = %fingerprint.short(),
            image = %image.short(),
            "Recorded result"
        );
        Ok(())
    }

    async fn timed<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.store_timeout(), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(
                    store = self.store.name(),
                    operation,
                    error = %err,
                    "Store operation failed"
                );
                Err(err)
            }
            Err(_) => {
                warn!(
                    store = self.store.name(),
                    operation,
                    timeout_ms = self.config.store_timeout_ms,
                    "Store operation timed out"
                );
                Err(Error::store_timeout(operation, self.config.store_timeout_ms))
            }
        }
    }
}
