//! Composable abort signals.
//!
//! # Design
//! An `AbortSignal` is a cheap, cloneable handle over one of three sources:
//! a manual controller (backed by a `CancellationToken`), a deadline, or a
//! set of other signals where the first to fire wins. Deadlines are
//! evaluated lazily against `tokio::time`, so creating a timeout signal does
//! not spawn anything and works with a paused test clock.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{TransportError, TIMEOUT_ERROR};

/// Why a signal fired. Carried into the failure classification as the
/// transport error's name and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortReason {
    pub name: String,
    pub message: String,
}

impl AbortReason {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The reason used by `AbortController::abort`.
    pub fn aborted() -> Self {
        Self::new("AbortError", "This operation was aborted")
    }

    /// The reason used by `AbortSignal::timeout`.
    pub fn timed_out() -> Self {
        Self::new(TIMEOUT_ERROR, "signal timed out")
    }
}

impl From<AbortReason> for TransportError {
    fn from(reason: AbortReason) -> Self {
        TransportError::new(reason.name, reason.message)
    }
}

#[derive(Debug, Default)]
struct Manual {
    token: CancellationToken,
    reason: OnceLock<AbortReason>,
}

#[derive(Debug, Clone)]
enum Source {
    Manual(Arc<Manual>),
    Deadline(Instant),
    Any(Arc<[AbortSignal]>),
}

/// A read-only view of a cancellation source.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    source: Source,
}

impl AbortSignal {
    /// A signal that fires with a `TimeoutError` reason once `after` elapses.
    pub fn timeout(after: Duration) -> Self {
        Self {
            source: Source::Deadline(Instant::now() + after),
        }
    }

    /// A signal that fires as soon as any of `signals` fires, with that
    /// signal's reason.
    pub fn any(signals: impl IntoIterator<Item = AbortSignal>) -> Self {
        Self {
            source: Source::Any(signals.into_iter().collect()),
        }
    }

    /// The reason this signal fired, if it has. When several sources of an
    /// `any` signal have already fired, the first in list order wins.
    pub fn reason(&self) -> Option<AbortReason> {
        match &self.source {
            Source::Manual(manual) => manual.reason.get().cloned(),
            Source::Deadline(at) => (Instant::now() >= *at).then(AbortReason::timed_out),
            Source::Any(signals) => signals.iter().find_map(AbortSignal::reason),
        }
    }

    pub fn aborted(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolves with the reason once the signal fires. Never resolves for a
    /// signal that never fires.
    pub fn cancelled(&self) -> BoxFuture<'_, AbortReason> {
        match &self.source {
            Source::Manual(manual) => async move {
                manual.token.cancelled().await;
                manual.reason.get().cloned().unwrap_or_else(AbortReason::aborted)
            }
            .boxed(),
            Source::Deadline(at) => {
                let at = *at;
                async move {
                    time::sleep_until(at).await;
                    AbortReason::timed_out()
                }
                .boxed()
            }
            Source::Any(signals) => {
                if let Some(reason) = self.reason() {
                    return future::ready(reason).boxed();
                }
                if signals.is_empty() {
                    return future::pending().boxed();
                }
                future::select_all(signals.iter().map(AbortSignal::cancelled))
                    .map(|(reason, _, _)| reason)
                    .boxed()
            }
        }
    }
}

/// Owner side of a manual abort signal.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    inner: Arc<Manual>,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            source: Source::Manual(Arc::clone(&self.inner)),
        }
    }

    pub fn abort(&self) {
        self.abort_with(AbortReason::aborted());
    }

    /// Fires the signal. Only the first reason sticks.
    pub fn abort_with(&self, reason: AbortReason) {
        let _ = self.inner.reason.set(reason);
        self.inner.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timeout_signal_fires_after_duration() {
        let signal = AbortSignal::timeout(Duration::from_millis(50));
        assert!(!signal.aborted());

        let reason = signal.cancelled().await;
        assert_eq!(reason.name, "TimeoutError");
        assert!(signal.aborted());
    }

    #[tokio::test]
    async fn manual_abort_carries_reason() {
        let controller = AbortController::new();
        let signal = controller.signal();
        assert!(signal.reason().is_none());

        controller.abort();
        assert_eq!(signal.cancelled().await, AbortReason::aborted());
    }

    #[test]
    fn first_abort_reason_sticks() {
        let controller = AbortController::new();
        controller.abort_with(AbortReason::new("First", "one"));
        controller.abort_with(AbortReason::new("Second", "two"));
        assert_eq!(controller.signal().reason().unwrap().name, "First");
    }

    #[tokio::test(start_paused = true)]
    async fn any_fires_with_first_source() {
        let controller = AbortController::new();
        let combined = AbortSignal::any([
            controller.signal(),
            AbortSignal::timeout(Duration::from_secs(10)),
        ]);

        let abort_later = {
            let controller = controller.clone();
            async move {
                time::sleep(Duration::from_secs(1)).await;
                controller.abort();
            }
        };
        let (reason, ()) = tokio::join!(combined.cancelled(), abort_later);
        assert_eq!(reason.name, "AbortError");
    }

    #[tokio::test(start_paused = true)]
    async fn any_times_out_when_controller_stays_idle() {
        let controller = AbortController::new();
        let combined = AbortSignal::any([
            controller.signal(),
            AbortSignal::timeout(Duration::from_millis(20)),
        ]);
        assert_eq!(combined.cancelled().await.name, "TimeoutError");
    }

    #[test]
    fn any_prefers_list_order_when_already_fired() {
        let first = AbortController::new();
        let second = AbortController::new();
        second.abort_with(AbortReason::new("Second", ""));
        first.abort_with(AbortReason::new("First", ""));

        let combined = AbortSignal::any([first.signal(), second.signal()]);
        assert_eq!(combined.reason().unwrap().name, "First");
    }
}
