//! Wait loop - Cooperative polling of a remote object until it reaches a
//! terminal state

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio::time::{Instant, sleep, timeout, timeout_at};
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, ErrorKind, ProviderError, ProviderResult, classify};

/// Poll interval used when the caller has no better value
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What one poll saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed<T> {
    Present(T),
    /// The backend answered not-found (or forbidden, when configured so)
    Absent,
}

impl<T> Observed<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Observed::Absent)
    }

    pub fn present(self) -> Option<T> {
        match self {
            Observed::Present(v) => Some(v),
            Observed::Absent => None,
        }
    }
}

/// Timing and interpretation knobs for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub interval: Duration,
    pub timeout: Duration,
    /// Treat HTTP 403 as "the object is gone"
    pub forbidden_is_absent: bool,
}

impl WaitOptions {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            forbidden_is_absent: false,
        }
    }

    pub fn with_forbidden_as_absent(mut self, forbidden_is_absent: bool) -> Self {
        self.forbidden_is_absent = forbidden_is_absent;
        self
    }
}

/// Poll `fetch` every `interval` until `is_terminal` accepts an observation.
///
/// Retryable errors keep the loop going. Not-found becomes
/// [`Observed::Absent`], which the predicate decides about. Any other error
/// ends the wait. The loop stops with `Cancelled` as soon as `cancel` fires
/// and with `Timeout` once the deadline passes.
pub async fn wait_for<T, F, Fut, P>(
    cancel: &CancellationToken,
    what: &str,
    options: WaitOptions,
    mut fetch: F,
    is_terminal: P,
) -> ProviderResult<Observed<T>>
where
    T: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
    P: Fn(&Observed<T>) -> bool,
{
    let started = Instant::now();
    let deadline = started + options.timeout;
    let timed_out = || ProviderError::Timeout {
        what: what.to_string(),
        elapsed: started.elapsed(),
    };

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            polled = timeout_at(deadline, fetch()) => polled,
        };
        let result = polled.map_err(|_| timed_out())?;

        let observed = match result {
            Ok(value) => Some(Observed::Present(value)),
            Err(err) => match classify(&err) {
                ErrorKind::NotFound => Some(Observed::Absent),
                ErrorKind::Forbidden if options.forbidden_is_absent => Some(Observed::Absent),
                ErrorKind::Retryable => {
                    warn!("{}: retryable error on attempt {}: {}", what, attempt, err);
                    None
                }
                _ => return Err(err.into()),
            },
        };

        if let Some(observed) = observed {
            debug!("{}: attempt {} observed {:?}", what, attempt, observed);
            if is_terminal(&observed) {
                return Ok(observed);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out());
        }
        let pause = options.interval.min(deadline - now);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            _ = sleep(pause) => {}
        }
    }
}

/// Run a single vendor call bounded by `cancel` and `limit`
pub async fn guard<T, E, Fut>(
    cancel: &CancellationToken,
    limit: Duration,
    what: &str,
    call: Fut,
) -> ProviderResult<T>
where
    E: Into<ProviderError>,
    Fut: Future<Output = Result<T, E>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        result = timeout(limit, call) => match result {
            Ok(inner) => inner.map_err(Into::into),
            Err(_) => Err(ProviderError::Timeout {
                what: what.to_string(),
                elapsed: limit,
            }),
        },
    }
}
