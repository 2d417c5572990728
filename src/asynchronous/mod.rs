use crate::config::RetryConfig;
use crate::error::RetryError;
use crate::signal::Signal;
use log::{debug, info, warn};
use tokio::time::sleep;

/// Retries an asynchronous operation that produces no value.
///
/// This is [`retry_with_data`] with a `()` result; see there for the full behavior.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use retrier::asynchronous::retry;
/// use retrier::config::RetryConfig;
/// use retrier::signal::Never;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = RetryConfig::default()
///     .with_max_attempts(3)
///     .with_min_delay(Duration::from_millis(1));
///
/// let result = retry(&Never, || async { Err::<(), _>("Temporary failure") }, &config).await;
/// assert_eq!(result.unwrap_err().attempts(), 3);
/// # }
/// ```
pub async fn retry<S, F, Fut, E>(
    signal: &S,
    operation: F,
    retry_config: &RetryConfig<E>,
) -> Result<(), RetryError<E>>
where
    S: Signal + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    retry_with_data(signal, operation, retry_config).await
}

/// Retries an asynchronous operation until it succeeds, runs out of attempts, or `signal`
/// fires.
///
/// Each iteration first checks `signal`; if it has fired the loop stops without invoking the
/// operation. Otherwise the operation runs. On success its value is returned immediately. On
/// failure, unless the attempt budget is spent, the delay is computed by
/// `retry_config.backoff` from the zero-based attempt number, the notifier (if any) is called
/// with the error and that delay, and the loop waits for either the delay or the signal.
///
/// # Arguments
/// * `signal` - The cancellation signal. Only observed, never canceled by the loop.
/// * `operation` - A closure that returns a `Future` resolving to a `Result<T, E>`.
/// * `retry_config` - The attempt limit, delay bounds, backoff strategy and notifier.
///
/// # Returns
/// * `Ok(T)` with the value of the first successful attempt.
/// * `Err(RetryError::Exhausted)` with the last attempt's error once `max_attempts`
///   invocations have failed (never, when `max_attempts` is 0).
/// * `Err(RetryError::Canceled)` with the signal's reason once the signal fires, either
///   before an attempt or during a delay. An attempt already running is not interrupted.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
/// use retrier::asynchronous::retry_with_data;
/// use retrier::config::RetryConfig;
/// use retrier::signal::WithDeadline;
/// use retrier::strategies::Backoff;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let token = CancellationToken::new();
/// let signal = WithDeadline::timeout(token.clone(), Duration::from_secs(5));
/// let config = RetryConfig::default()
///     .with_max_attempts(5)
///     .with_min_delay(Duration::from_millis(1))
///     .with_max_delay(Duration::from_millis(20))
///     .with_backoff(Backoff::ExponentialWithDecorrelatedJitter);
///
/// let calls = Arc::new(AtomicU32::new(0));
/// let result = retry_with_data(
///     &signal,
///     || {
///         let calls = Arc::clone(&calls);
///         async move {
///             if calls.fetch_add(1, Ordering::SeqCst) < 2 {
///                 Err("not yet")
///             } else {
///                 Ok(42)
///             }
///         }
///     },
///     &config,
/// )
/// .await;
///
/// assert_eq!(result.unwrap(), 42);
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # }
/// ```
pub async fn retry_with_data<S, F, Fut, T, E>(
    signal: &S,
    mut operation: F,
    retry_config: &RetryConfig<E>,
) -> Result<T, RetryError<E>>
where
    S: Signal + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    let mut last_error: Option<E> = None;

    loop {
        if let Some(reason) = signal.reason() {
            warn!(
                "Retry canceled before attempt {}: {}",
                attempt.saturating_add(1),
                reason
            );
            return Err(RetryError::Canceled {
                reason,
                attempts: attempt,
                last_error,
            });
        }

        let err = match operation().await {
            Ok(output) => {
                if attempt > 0 {
                    info!("Operation succeeded after {} attempts", attempt.saturating_add(1));
                }
                return Ok(output);
            }
            Err(err) => err,
        };

        let attempts = attempt.saturating_add(1);
        if retry_config.max_attempts > 0 && attempts >= retry_config.max_attempts {
            warn!("Operation failed after {} attempts, giving up.", attempts);
            return Err(RetryError::Exhausted {
                error: err,
                attempts,
            });
        }

        let delay = retry_config.backoff.calculate_delay(
            retry_config.min_delay,
            retry_config.max_delay,
            attempt,
        );
        debug!(
            "Operation failed (attempt {}/{}), retrying after {:?}...",
            attempts,
            max_attempts_label(retry_config.max_attempts),
            delay
        );
        retry_config.notify(&err, delay);

        let canceled = tokio::select! {
            () = sleep(delay) => None,
            reason = signal.done() => Some(reason),
        };
        if let Some(reason) = canceled {
            warn!("Retry canceled while waiting after attempt {}: {}", attempts, reason);
            return Err(RetryError::Canceled {
                reason,
                attempts,
                last_error: Some(err),
            });
        }

        last_error = Some(err);
        attempt = attempts;
    }
}

fn max_attempts_label(max_attempts: u32) -> String {
    if max_attempts == 0 {
        "unlimited".to_string()
    } else {
        max_attempts.to_string()
    }
}
