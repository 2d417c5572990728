/// The `asynchronous` module provides the retry loop: `retry` for operations that only
/// succeed or fail, and `retry_with_data` for operations that also produce a value.
pub mod asynchronous;

/// The `config` module provides the retry policy: attempt limit, delay bounds, backoff
/// strategy and notifier, along with the default values.
pub mod config;

/// The `error` module defines the error returned when a retry loop ends without success.
pub mod error;

/// The `jitter` module provides the randomized jitter functions applied to backoff delays,
/// and the shared cryptographically secure random source they draw from.
pub mod jitter;

/// The `signal` module defines how the retry loop observes cancellation and deadlines.
pub mod signal;

/// The `strategies` module defines the backoff strategies used to calculate the delay
/// before each retry attempt.
pub mod strategies;

pub use asynchronous::{retry, retry_with_data};
pub use config::RetryConfig;
pub use error::RetryError;
pub use signal::{CancelReason, Signal};
pub use strategies::Backoff;
