//! Waiting for asynchronous ARM operations to settle
//!
//! Resource Manager accepts most writes immediately and finishes them in the
//! background. [`StateWaiter`] re-reads the resource until its provisioning
//! state reaches a target, fails, or the time budget runs out.

use std::future::Future;
use std::time::Duration;

use tfplug::Context;
use tokio::time::Instant;

use crate::api::ApiError;

/// State reported for a resource that no longer exists
pub const DELETED_STATE: &str = "Deleted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Target,
    Failed,
    Unknown,
}

pub trait StateClassifier: Send + Sync {
    fn classify(&self, state: &str) -> PollState;

    /// Target states, listed in error messages
    fn targets(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<F> StateClassifier for F
where
    F: Fn(&str) -> PollState + Send + Sync,
{
    fn classify(&self, state: &str) -> PollState {
        self(state)
    }
}

/// Classifies by explicit pending, target and failed lists
#[derive(Debug, Clone, Default)]
pub struct Transitions {
    pending: Vec<String>,
    target: Vec<String>,
    failed: Vec<String>,
}

impl Transitions {
    pub fn new(pending: &[&str], target: &[&str]) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            failed: Vec::new(),
        }
    }

    pub fn failed(mut self, failed: &[&str]) -> Self {
        self.failed = failed.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl StateClassifier for Transitions {
    fn classify(&self, state: &str) -> PollState {
        let contains = |list: &[String]| list.iter().any(|s| s == state);
        if contains(&self.target) {
            PollState::Target
        } else if contains(&self.pending) {
            PollState::Pending
        } else if contains(&self.failed) {
            PollState::Failed
        } else {
            PollState::Unknown
        }
    }

    fn targets(&self) -> Vec<String> {
        self.target.clone()
    }
}

/// Every observed state is pending until the resource is gone
#[derive(Debug, Clone, Copy, Default)]
pub struct UntilDeleted;

impl StateClassifier for UntilDeleted {
    fn classify(&self, state: &str) -> PollState {
        if state == DELETED_STATE {
            PollState::Target
        } else {
            PollState::Pending
        }
    }

    fn targets(&self) -> Vec<String> {
        vec![DELETED_STATE.to_string()]
    }
}

/// One observation: the fetched object (absent once deleted) and its state
#[derive(Debug, Clone, PartialEq)]
pub struct Refreshed<T> {
    pub snapshot: Option<T>,
    pub state: String,
}

impl<T> Refreshed<T> {
    pub fn new(snapshot: T, state: impl Into<String>) -> Self {
        Self {
            snapshot: Some(snapshot),
            state: state.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            snapshot: None,
            state: DELETED_STATE.to_string(),
        }
    }

    /// Turns a GET result into an observation. A 404, or an object without a
    /// state, counts as deleted.
    pub fn from_lookup<F>(result: Result<T, ApiError>, state_of: F) -> Result<Self, ApiError>
    where
        F: FnOnce(&T) -> Option<&str>,
    {
        match result {
            Ok(snapshot) => match state_of(&snapshot).map(str::to_string) {
                Some(state) => Ok(Self::new(snapshot, state)),
                None => Ok(Self::not_found()),
            },
            Err(e) if e.is_not_found() => Ok(Self::not_found()),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error(
        "timeout while waiting for {resource} to become {wanted} (last state: {last:?}, timeout: {timeout:?})",
        wanted = .targets.join("/"),
        last = .last_state.as_deref().unwrap_or("none")
    )]
    Timeout {
        resource: String,
        targets: Vec<String>,
        timeout: Duration,
        last_state: Option<String>,
    },

    #[error("{resource} reached failure state {state:?}")]
    Failed { resource: String, state: String },

    #[error("unexpected state {state:?} for {resource}, wanted {targets:?}")]
    UnexpectedState {
        resource: String,
        state: String,
        targets: Vec<String>,
    },

    #[error("{resource} was not found after {checks} checks")]
    NotFound { resource: String, checks: u32 },

    #[error("cancelled while waiting for {resource}")]
    Cancelled { resource: String },

    #[error("refreshing {resource}: {source}")]
    Refresh {
        resource: String,
        #[source]
        source: ApiError,
    },
}

/// Bounded refresh loop with a minimum interval between fetches
#[derive(Debug, Clone)]
pub struct StateWaiter {
    resource: String,
    delay: Duration,
    min_interval: Duration,
    timeout: Duration,
    not_found_checks: u32,
    continuous_target_occurrence: u32,
}

impl StateWaiter {
    pub fn new(resource: impl Into<String>, timeout: Duration) -> Self {
        Self {
            resource: resource.into(),
            delay: Duration::ZERO,
            min_interval: Duration::from_secs(10),
            timeout,
            not_found_checks: 20,
            continuous_target_occurrence: 1,
        }
    }

    /// Wait before the first fetch
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn continuous_target_occurrence(mut self, occurrences: u32) -> Self {
        self.continuous_target_occurrence = occurrences.max(1);
        self
    }

    /// Poll until `classifier` reports a target state. Returns the last
    /// snapshot, which is `None` when the target was [`DELETED_STATE`].
    pub async fn wait<T, C, F, Fut>(
        &self,
        ctx: &Context,
        classifier: &C,
        mut refresh: F,
    ) -> Result<Option<T>, WaitError>
    where
        C: StateClassifier + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Refreshed<T>, ApiError>>,
    {
        let mut deadline = Instant::now() + self.timeout;
        if let Some(remaining) = ctx.remaining() {
            deadline = deadline.min(Instant::now() + remaining);
        }

        let mut last_state: Option<String> = None;
        let mut not_found = 0u32;
        let mut on_target = 0u32;
        let mut fetches = 0u32;

        if !self.delay.is_zero() {
            self.sleep_until(ctx, (Instant::now() + self.delay).min(deadline))
                .await?;
        }

        loop {
            if ctx.is_cancelled() {
                return Err(self.cancelled());
            }
            if Instant::now() >= deadline {
                return Err(self.timed_out(classifier, last_state, fetches));
            }

            let started = Instant::now();
            // a slow refresh must not outlive the deadline or a cancellation
            let refreshed = tokio::select! {
                result = refresh() => result.map_err(|source| WaitError::Refresh {
                    resource: self.resource.clone(),
                    source,
                })?,
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(self.timed_out(classifier, last_state, fetches));
                }
                _ = ctx.cancelled() => return Err(self.cancelled()),
            };
            fetches += 1;

            let state = refreshed.state;
            let verdict = classifier.classify(&state);
            tracing::debug!(
                resource = %self.resource,
                state = %state,
                verdict = ?verdict,
                fetch = fetches,
                "refreshed"
            );

            match verdict {
                PollState::Target => {
                    on_target += 1;
                    if on_target >= self.continuous_target_occurrence {
                        return Ok(refreshed.snapshot);
                    }
                }
                PollState::Pending => on_target = 0,
                PollState::Failed => {
                    return Err(WaitError::Failed {
                        resource: self.resource.clone(),
                        state,
                    })
                }
                PollState::Unknown if state == DELETED_STATE => {
                    on_target = 0;
                    not_found += 1;
                    if not_found > self.not_found_checks {
                        return Err(WaitError::NotFound {
                            resource: self.resource.clone(),
                            checks: not_found,
                        });
                    }
                }
                PollState::Unknown => {
                    return Err(WaitError::UnexpectedState {
                        resource: self.resource.clone(),
                        state,
                        targets: classifier.targets(),
                    })
                }
            }
            if state != DELETED_STATE {
                not_found = 0;
            }
            last_state = Some(state);

            self.sleep_until(ctx, (started + self.min_interval).min(deadline))
                .await?;
        }
    }

    async fn sleep_until(&self, ctx: &Context, until: Instant) -> Result<(), WaitError> {
        tokio::select! {
            _ = tokio::time::sleep_until(until) => Ok(()),
            _ = ctx.cancelled() => Err(self.cancelled()),
        }
    }

    fn timed_out<C: StateClassifier + ?Sized>(
        &self,
        classifier: &C,
        last_state: Option<String>,
        fetches: u32,
    ) -> WaitError {
        tracing::warn!(
            resource = %self.resource,
            last_state = ?last_state,
            fetches,
            "gave up waiting"
        );
        WaitError::Timeout {
            resource: self.resource.clone(),
            targets: classifier.targets(),
            timeout: self.timeout,
            last_state,
        }
    }

    fn cancelled(&self) -> WaitError {
        WaitError::Cancelled {
            resource: self.resource.clone(),
        }
    }
}
