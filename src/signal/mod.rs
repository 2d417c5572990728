use std::future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

// Roughly 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Why a [`Signal`] fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CancelReason {
    /// The signal was canceled explicitly.
    #[error("operation canceled")]
    Canceled,
    /// The signal's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// A cancellation signal observed by the retry loop.
///
/// The loop never creates or cancels a signal; it only asks whether it has fired
/// ([`Signal::reason`]) before each attempt, and waits on [`Signal::done`] alongside the
/// backoff timer.
pub trait Signal {
    /// Returns the reason the signal fired, or `None` while it is still live.
    fn reason(&self) -> Option<CancelReason>;

    /// Resolves with the reason once the signal fires.
    fn done(&self) -> impl Future<Output = CancelReason>;
}

/// A signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl Signal for Never {
    fn reason(&self) -> Option<CancelReason> {
        None
    }

    fn done(&self) -> impl Future<Output = CancelReason> {
        future::pending()
    }
}

impl Signal for CancellationToken {
    fn reason(&self) -> Option<CancelReason> {
        self.is_cancelled().then_some(CancelReason::Canceled)
    }

    async fn done(&self) -> CancelReason {
        self.cancelled().await;
        CancelReason::Canceled
    }
}

/// Wraps a signal with a deadline.
///
/// Fires with [`CancelReason::DeadlineExceeded`] once the deadline passes, or with the inner
/// signal's reason if that fires first. When both have fired by the time [`Signal::reason`]
/// is polled, the inner reason is reported.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use retrier::signal::{Never, Signal, WithDeadline};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let signal = WithDeadline::timeout(Never, Duration::from_millis(5));
/// assert_eq!(signal.reason(), None);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct WithDeadline<S> {
    inner: S,
    deadline: Instant,
}

impl<S> WithDeadline<S> {
    /// Wraps `inner` with an absolute deadline.
    pub fn new(inner: S, deadline: Instant) -> Self {
        WithDeadline { inner, deadline }
    }

    /// A deadline `timeout` from now.
    ///
    /// A timeout too large to represent as an instant becomes a deadline far in the future.
    pub fn timeout(inner: S, timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        WithDeadline::new(inner, deadline)
    }

    /// The instant at which the signal fires with [`CancelReason::DeadlineExceeded`].
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The wrapped signal.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Signal> Signal for WithDeadline<S> {
    fn reason(&self) -> Option<CancelReason> {
        self.inner.reason().or_else(|| {
            (Instant::now() >= self.deadline).then_some(CancelReason::DeadlineExceeded)
        })
    }

    async fn done(&self) -> CancelReason {
        tokio::select! {
            reason = self.inner.done() => reason,
            () = sleep_until(self.deadline) => CancelReason::DeadlineExceeded,
        }
    }
}

impl<S: Signal + ?Sized> Signal for &S {
    fn reason(&self) -> Option<CancelReason> {
        (**self).reason()
    }

    fn done(&self) -> impl Future<Output = CancelReason> {
        (**self).done()
    }
}

impl<S: Signal + ?Sized> Signal for Arc<S> {
    fn reason(&self) -> Option<CancelReason> {
        (**self).reason()
    }

    fn done(&self) -> impl Future<Output = CancelReason> {
        (**self).done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn test_never_does_not_fire() {
        assert_eq!(Never.reason(), None);
        assert!(timeout(Duration::from_secs(3600), Never.done()).await.is_err());
    }

    #[tokio::test]
    async fn test_cancellation_token_signal() {
        let token = CancellationToken::new();
        assert_eq!(token.reason(), None);

        token.cancel();
        assert_eq!(token.reason(), Some(CancelReason::Canceled));
        assert_eq!(Signal::done(&token).await, CancelReason::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let signal = WithDeadline::timeout(Never, Duration::from_millis(50));
        assert_eq!(signal.reason(), None);

        let start = Instant::now();
        assert_eq!(signal.done().await, CancelReason::DeadlineExceeded);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(signal.reason(), Some(CancelReason::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_prefers_inner_cancellation() {
        let token = CancellationToken::new();
        let signal = WithDeadline::timeout(token.clone(), Duration::from_secs(10));

        token.cancel();
        assert_eq!(signal.reason(), Some(CancelReason::Canceled));
        assert_eq!(signal.done().await, CancelReason::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_signal_handles() {
        let token = Arc::new(CancellationToken::new());
        let by_ref = &*token;

        assert_eq!(Signal::reason(&token), None);
        assert_eq!(Signal::reason(&by_ref), None);

        token.cancel();
        assert_eq!(Signal::reason(&token), Some(CancelReason::Canceled));
        assert_eq!(Signal::done(&by_ref).await, CancelReason::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_does_not_overflow() {
        let start = Instant::now();
        let signal = WithDeadline::timeout(Never, Duration::MAX);

        assert!(signal.deadline() >= start + FAR_FUTURE);
        assert_eq!(signal.reason(), None);
        assert!(timeout(Duration::from_secs(3600), signal.done()).await.is_err());
        assert_eq!(signal.reason(), None);
    }

    #[test]
    fn test_cancel_reason_display() {
        assert_eq!(CancelReason::Canceled.to_string(), "operation canceled");
        assert_eq!(CancelReason::DeadlineExceeded.to_string(), "deadline exceeded");
    }
}
