//! Transient request-status banner
//!
//! Every status change bumps a generation counter and schedules a delayed
//! clear tagged with that generation. A clear only applies while its
//! generation is still current, so an older action's timer can never wipe a
//! newer action's message.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Severity of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusKind {
    /// The action went through
    Success,
    /// The action failed
    Error,
}

/// Outcome of the most recent action. `message` and `status` are always
/// both set or both empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStatus {
    /// Text shown to the user
    pub message: Option<String>,
    /// Severity of `message`
    pub status: Option<StatusKind>,
}

impl RequestStatus {
    /// A success carrying `message`
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            status: Some(StatusKind::Success),
        }
    }

    /// An error carrying `message`
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            status: Some(StatusKind::Error),
        }
    }

    /// Whether nothing is being displayed
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.message.is_none() && self.status.is_none()
    }
}

#[derive(Default)]
struct BannerState {
    request: RequestStatus,
    generation: u64,
}

/// Holds the current [`RequestStatus`] and clears it after a fixed delay
pub struct StatusBanner {
    state: Arc<Mutex<BannerState>>,
    clear_delay: Duration,
    shutdown: CancellationToken,
}

impl StatusBanner {
    /// Creates an empty banner whose messages clear after `clear_delay`
    #[must_use]
    pub fn new(clear_delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(BannerState::default())),
            clear_delay,
            shutdown: CancellationToken::new(),
        }
    }

    /// Delay after which a message is cleared
    #[must_use]
    pub const fn clear_delay(&self) -> Duration {
        self.clear_delay
    }

    /// Snapshot of the current status
    #[must_use]
    pub fn current(&self) -> RequestStatus {
        lock(&self.state).request.clone()
    }

    /// Shows a success message and schedules its clear
    pub fn set_success(&self, message: impl Into<String>) {
        self.set(RequestStatus::success(message));
    }

    /// Shows an error message and schedules its clear
    pub fn set_error(&self, message: impl Into<String>) {
        self.set(RequestStatus::error(message));
    }

    /// Clears the banner immediately and invalidates pending clears
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.request = RequestStatus::default();
    }

    /// Cancels every pending clear. Messages set afterwards stay up.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn set(&self, request: RequestStatus) {
        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.request = request;
            state.generation
        };

        self.schedule_clear(generation);
    }

    fn schedule_clear(&self, generation: u64) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime to schedule status clear, message stays until reset");
            return;
        };

        let state = Arc::clone(&self.state);
        let delay = self.clear_delay;
        let shutdown = self.shutdown.clone();

        handle.spawn(async move {
            tokio::select! {
                () = shutdown.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let mut state = lock(&state);
                    if state.generation == generation {
                        state.request = RequestStatus::default();
                    } else {
                        debug!(generation, current = state.generation, "Stale status clear skipped");
                    }
                }
            }
        });
    }
}

impl Drop for StatusBanner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn lock(state: &Mutex<BannerState>) -> MutexGuard<'_, BannerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
