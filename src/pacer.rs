//! Outbound request pacing.
//!
//! The pacer admits at most `limit` tasks per moving `interval`. Waiting tasks
//! are admitted in submission order: the window sits behind a fair
//! `tokio::sync::Mutex`, and the task at the head of the queue holds it while it
//! sleeps for the next free slot.
//!
//! ```text
//!     limit = 2, interval = 1s
//!
//!     t=0.0  A ✓  B ✓  C … D …
//!     t=1.0             C ✓  D ✓
//! ```
//!
//! A task whose output reports remote throttling (HTTP 429) pauses every
//! admission for the advertised `Retry-After` (or one interval) and is queued
//! again, up to `max_retries` times.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

pub const DEFAULT_PACE_LIMIT: u32 = 1;
pub const DEFAULT_PACE_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Longest back-off honoured from a remote `Retry-After`
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaceError {
    #[error("pace limit must be at least 1")]
    ZeroLimit,

    #[error("pace interval must be non-zero")]
    ZeroInterval,

    #[error("not admitted within {0:?}")]
    AdmissionTimeout(Duration),
}

/// Output of a paced task that may tell the pacer to back off
pub trait Throttle {
    /// True when the remote side rejected the call for exceeding its rate limit
    fn is_throttled(&self) -> bool;

    /// Delay requested by the remote side, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Throttle for reqwest::Response {
    fn is_throttled(&self) -> bool {
        self.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
    }

    fn retry_after(&self) -> Option<Duration> {
        self.headers()
            .get(reqwest::header::RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }
}

impl<T: Throttle, E> Throttle for Result<T, E> {
    fn is_throttled(&self) -> bool {
        self.as_ref().is_ok_and(Throttle::is_throttled)
    }

    fn retry_after(&self) -> Option<Duration> {
        self.as_ref().ok().and_then(Throttle::retry_after)
    }
}

#[derive(Debug, Clone)]
pub struct PacerConfig {
    /// Admissions allowed per interval
    pub limit: u32,
    pub interval: Duration,
    /// Re-submissions after a throttled response
    pub max_retries: u32,
    /// Give up waiting for a slot after this long
    pub admission_timeout: Option<Duration>,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PACE_LIMIT,
            interval: DEFAULT_PACE_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            admission_timeout: None,
        }
    }
}

impl PacerConfig {
    pub fn new(limit: u32, interval: Duration) -> Self {
        Self {
            limit,
            interval,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
struct Window {
    admitted: VecDeque<Instant>,
}

impl Window {
    /// When the next slot opens, or `None` if one is free now
    fn next_opening(&mut self, now: Instant, limit: u32, interval: Duration) -> Option<Instant> {
        while let Some(&oldest) = self.admitted.front() {
            if oldest + interval <= now {
                self.admitted.pop_front();
            } else {
                break;
            }
        }

        if self.admitted.len() < limit as usize {
            None
        } else {
            self.admitted.front().map(|&oldest| oldest + interval)
        }
    }
}

/// Moving-window admission control for outbound calls
#[derive(Debug)]
pub struct Pacer {
    config: PacerConfig,
    window: Mutex<Window>,
    paused_until: SyncMutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(config: PacerConfig) -> Result<Self, PaceError> {
        if config.limit == 0 {
            return Err(PaceError::ZeroLimit);
        }
        if config.interval.is_zero() {
            return Err(PaceError::ZeroInterval);
        }
        Ok(Self {
            config,
            window: Mutex::new(Window::default()),
            paused_until: SyncMutex::new(None),
        })
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    /// Run `task` once admitted, re-running it while it reports throttling.
    ///
    /// The last output is returned even if it is still throttled after
    /// `max_retries` re-submissions.
    pub async fn submit<F, Fut, T>(&self, mut task: F) -> Result<T, PaceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        T: Throttle,
    {
        let mut retries = 0;
        loop {
            self.admit().await?;
            let output = task().await;

            if !output.is_throttled() {
                return Ok(output);
            }

            let delay = output
                .retry_after()
                .unwrap_or(self.config.interval)
                .min(MAX_BACKOFF);
            self.pause(delay);

            if retries >= self.config.max_retries {
                warn!(
                    "Still throttled after {} retries, giving up",
                    self.config.max_retries
                );
                return Ok(output);
            }
            retries += 1;
            warn!(
                "Throttled by remote, backing off for {:?} (retry {}/{})",
                delay, retries, self.config.max_retries
            );
        }
    }

    /// Hold every admission until `delay` from now, capped at [`MAX_BACKOFF`]
    pub fn pause(&self, delay: Duration) {
        let now = Instant::now();
        let delay = delay.min(MAX_BACKOFF);
        let until = now.checked_add(delay).unwrap_or(now);
        let mut paused = self.paused_until.lock();
        if paused.map_or(true, |current| current < until) {
            *paused = Some(until);
        }
    }

    async fn admit(&self) -> Result<(), PaceError> {
        match self.config.admission_timeout {
            Some(limit) => tokio::time::timeout(limit, self.wait_for_slot())
                .await
                .map_err(|_| PaceError::AdmissionTimeout(limit)),
            None => {
                self.wait_for_slot().await;
                Ok(())
            }
        }
    }

    async fn wait_for_slot(&self) {
        let mut window = self.window.lock().await;
        loop {
            let now = Instant::now();

            let paused = *self.paused_until.lock();
            if let Some(until) = paused.filter(|until| *until > now) {
                debug!("Admissions paused for {:?}", until - now);
                sleep_until(until).await;
                continue;
            }

            match window.next_opening(now, self.config.limit, self.config.interval) {
                None => {
                    window.admitted.push_back(now);
                    return;
                }
                Some(at) => sleep_until(at).await,
            }
        }
    }
}
