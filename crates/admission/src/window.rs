//! Per-client sliding-window state

use crate::config::EvictionPolicy;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Recent admissions for one client, oldest first (Unix milliseconds)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientWindow {
    /// Admission timestamps, oldest at the front
    pub timestamps: VecDeque<i64>,
}

/// Outcome of checking one request against a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    /// The request was recorded in the window
    Allowed {
        /// Further admissions available before the window fills
        remaining: usize,
    },
    /// The window is full; nothing was recorded
    Denied {
        /// Time until the oldest entry ages out
        retry_after: Duration,
    },
}

impl ClientWindow {
    /// Decode a stored window
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::serialization(format!("Failed to decode client window: {e}")))
    }

    /// Encode for storage
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::serialization(format!("Failed to encode client window: {e}")))
    }

    /// Number of recorded admissions
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether no admissions are recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Try to admit a request at `now`
    ///
    /// The window is only modified when the request is allowed.
    pub fn try_admit(
        &mut self,
        now: DateTime<Utc>,
        capacity: usize,
        width: Duration,
        policy: EvictionPolicy,
    ) -> WindowDecision {
        let now_ms = now.timestamp_millis();
        let width_ms = i64::try_from(width.as_millis()).unwrap_or(i64::MAX);
        let expired = |ts: i64| now_ms.saturating_sub(ts) >= width_ms;

        let mut next = self.timestamps.clone();
        match policy {
            EvictionPolicy::Oldest => {
                if next.len() >= capacity {
                    match next.front() {
                        Some(&oldest) if expired(oldest) => {
                            // A shrunken capacity can leave more than one surplus entry.
                            while next.len() >= capacity {
                                next.pop_front();
                            }
                        }
                        _ => return denied(next.front().copied(), now_ms, width_ms),
                    }
                }
            }
            EvictionPolicy::Expired => {
                next.retain(|&ts| !expired(ts));
                if next.len() >= capacity {
                    return denied(next.front().copied(), now_ms, width_ms);
                }
            }
        }

        next.push_back(now_ms);
        self.timestamps = next;
        WindowDecision::Allowed {
            remaining: capacity.saturating_sub(self.timestamps.len()),
        }
    }
}

fn denied(oldest: Option<i64>, now_ms: i64, width_ms: i64) -> WindowDecision {
    let elapsed = now_ms.saturating_sub(oldest.unwrap_or(now_ms)).max(0);
    let wait_ms = width_ms.saturating_sub(elapsed).max(0);
    WindowDecision::Denied {
        retry_after: Duration::from_millis(u64::try_from(wait_ms).unwrap_or(0)),
    }
}
