use crate::strategies::Backoff;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of attempts made by [`RetryConfig::default`].
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Minimum delay used by [`RetryConfig::default`].
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);
/// Maximum delay used by [`RetryConfig::default`].
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(1);
/// Backoff strategy used by [`RetryConfig::default`].
pub const DEFAULT_BACKOFF: Backoff = Backoff::Exponential;

/// Callback invoked after every failed attempt that will be retried, with the error and the
/// delay about to be waited.
pub type Notifier<E> = Arc<dyn Fn(&E, Duration) + Send + Sync>;

/// Configuration for retrying operations.
///
/// This struct defines the parameters for retrying an operation: how many attempts may be
/// made, the bounds handed to the backoff strategy, the strategy itself and an optional
/// notifier. A config is read-only while a retry loop runs.
pub struct RetryConfig<E> {
    /// The maximum number of attempts, including the initial one.
    ///
    /// If `max_attempts` is set to 3, the operation is invoked at most 3 times
    /// (1 initial attempt + 2 retries). `0` means there is no limit: the loop keeps going
    /// until the operation succeeds or the signal fires.
    pub max_attempts: u32,

    /// The lower bound passed to the backoff strategy. The first retry waits this long
    /// with the non-jittered strategies.
    pub min_delay: Duration,

    /// The upper bound passed to the backoff strategy. No delay ever exceeds it.
    pub max_delay: Duration,

    /// The strategy used to calculate delays between attempts.
    pub backoff: Backoff,

    /// An optional callback run after each failed attempt, before the delay starts.
    ///
    /// It is advisory only: it cannot change attempt counting or timing.
    pub notifier: Option<Notifier<E>>,
}

impl<E> Default for RetryConfig<E> {
    /// Provides a default configuration for retrying operations.
    ///
    /// The default configuration includes:
    /// - `max_attempts`: 3
    /// - `min_delay`: 100 milliseconds
    /// - `max_delay`: 1 second
    /// - `backoff`: `Exponential`
    /// - `notifier`: `None`
    fn default() -> Self {
        RetryConfig {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff: DEFAULT_BACKOFF,
            notifier: None,
        }
    }
}

impl<E> RetryConfig<E> {
    /// Creates a new `RetryConfig` with the given attempt limit, delay bounds and strategy,
    /// and no notifier.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use retrier::config::RetryConfig;
    /// use retrier::strategies::Backoff;
    ///
    /// let config: RetryConfig<std::io::Error> = RetryConfig::new(
    ///     5,
    ///     Duration::from_millis(50),
    ///     Duration::from_secs(2),
    ///     Backoff::ExponentialWithFullJitter,
    /// );
    /// assert_eq!(config.max_attempts, 5);
    /// ```
    pub fn new(
        max_attempts: u32,
        min_delay: Duration,
        max_delay: Duration,
        backoff: Backoff,
    ) -> Self {
        RetryConfig {
            max_attempts,
            min_delay,
            max_delay,
            backoff,
            notifier: None,
        }
    }

    /// Builds a config by applying `options` over the defaults, in order.
    ///
    /// When several options set the same field, the last one wins.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use retrier::config::{RetryConfig, RetryOption};
    ///
    /// let config: RetryConfig<String> = RetryConfig::from_options([
    ///     RetryOption::MaxAttempts(10),
    ///     RetryOption::MinDelay(Duration::from_millis(5)),
    ///     RetryOption::MaxAttempts(4),
    /// ]);
    /// assert_eq!(config.max_attempts, 4);
    /// assert_eq!(config.min_delay, Duration::from_millis(5));
    /// ```
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = RetryOption<E>>,
    {
        options
            .into_iter()
            .fold(RetryConfig::default(), |config, option| option.apply(config))
    }

    /// Sets the maximum number of attempts. `0` removes the limit.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the minimum delay handed to the backoff strategy.
    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    /// Sets the maximum delay handed to the backoff strategy.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets the backoff strategy.
    ///
    /// # Examples
    /// ```
    /// use retrier::config::RetryConfig;
    /// use retrier::strategies::Backoff;
    ///
    /// let config: RetryConfig<String> = RetryConfig::default()
    ///     .with_backoff(Backoff::ExponentialWithDecorrelatedJitter);
    /// ```
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the notifier, replacing any previous one.
    ///
    /// # Examples
    /// ```
    /// use retrier::config::RetryConfig;
    ///
    /// let config = RetryConfig::default().with_notifier(|err: &String, delay| {
    ///     eprintln!("attempt failed: {}, retrying in {:?}", err, delay);
    /// });
    /// assert!(config.notifier.is_some());
    /// ```
    pub fn with_notifier<F>(mut self, notifier: F) -> Self
    where
        F: Fn(&E, Duration) + Send + Sync + 'static,
    {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    pub(crate) fn notify(&self, err: &E, delay: Duration) {
        if let Some(notifier) = &self.notifier {
            notifier(err, delay);
        }
    }
}

impl<E> Clone for RetryConfig<E> {
    fn clone(&self) -> Self {
        RetryConfig {
            max_attempts: self.max_attempts,
            min_delay: self.min_delay,
            max_delay: self.max_delay,
            backoff: self.backoff.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("min_delay", &self.min_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff", &self.backoff)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

/// A single override of a [`RetryConfig`] field, for building configs from a list.
pub enum RetryOption<E> {
    /// Overrides [`RetryConfig::max_attempts`].
    MaxAttempts(u32),
    /// Overrides [`RetryConfig::min_delay`].
    MinDelay(Duration),
    /// Overrides [`RetryConfig::max_delay`].
    MaxDelay(Duration),
    /// Overrides [`RetryConfig::backoff`].
    Backoff(Backoff),
    /// Overrides [`RetryConfig::notifier`].
    Notifier(Notifier<E>),
}

impl<E> RetryOption<E> {
    /// Applies this override to `config` and returns it.
    pub fn apply(self, config: RetryConfig<E>) -> RetryConfig<E> {
        match self {
            RetryOption::MaxAttempts(max_attempts) => config.with_max_attempts(max_attempts),
            RetryOption::MinDelay(min_delay) => config.with_min_delay(min_delay),
            RetryOption::MaxDelay(max_delay) => config.with_max_delay(max_delay),
            RetryOption::Backoff(backoff) => config.with_backoff(backoff),
            RetryOption::Notifier(notifier) => RetryConfig {
                notifier: Some(notifier),
                ..config
            },
        }
    }
}
