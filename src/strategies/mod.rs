use crate::jitter::RandomSource;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Signature of a caller-supplied backoff function: `(min_delay, max_delay, attempt) -> delay`.
pub type BackoffFn = dyn Fn(Duration, Duration, u32) -> Duration + Send + Sync;

/// Defines how the delay before the next retry attempt is calculated.
///
/// Every strategy is stateless: the delay depends only on the minimum delay, the maximum
/// delay and the zero-based attempt number. The jittered variants draw from the shared
/// [`RandomSource`], which serializes access to its generator internally.
///
/// Whatever the strategy, the final delay is clamped to `max_delay`, and a zero `min_delay`
/// or `max_delay` yields a zero delay.
#[derive(Clone, Default)]
pub enum Backoff {
    /// The delay is always `min_delay`.
    Constant,
    /// The delay doubles with every attempt: `min_delay * 2^attempt`.
    ///
    /// For example, with a minimum of 1ms and a maximum of 1s, attempts wait 1ms, 2ms,
    /// 4ms, ... until the delay reaches 1s.
    #[default]
    Exponential,
    /// Exponential delay plus equal jitter of that delay.
    ExponentialWithEqualJitter,
    /// Exponential delay plus full jitter of that delay.
    ExponentialWithFullJitter,
    /// Exponential delay plus decorrelated jitter seeded with the previous attempt's
    /// exponential delay.
    ExponentialWithDecorrelatedJitter,
    /// The delay follows the Fibonacci sequence scaled by `min_delay`.
    ///
    /// With a minimum of 1s, attempts wait 1s, 1s, 2s, 3s, 5s, 8s, ...
    Fibonacci,
    /// A caller-supplied function. Its result is still clamped to `max_delay`.
    Custom(Arc<BackoffFn>),
}

impl Backoff {
    /// Wraps a function as a [`Backoff::Custom`] strategy.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Duration, Duration, u32) -> Duration + Send + Sync + 'static,
    {
        Backoff::Custom(Arc::new(f))
    }

    /// Calculates the delay to wait after the failure of attempt number `attempt`.
    ///
    /// # Arguments
    /// * `min_delay` - The lower bound, and the un-jittered delay for `attempt = 0`.
    /// * `max_delay` - The ceiling every result is clamped to.
    /// * `attempt` - The zero-based number of the attempt that just failed.
    ///
    /// # Returns
    /// A `Duration` in `[min_delay, max_delay]` when `min_delay <= max_delay`, `max_delay`
    /// when `min_delay > max_delay`, and zero when either bound is zero.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use retrier::strategies::Backoff;
    ///
    /// let min = Duration::from_millis(1);
    /// let max = Duration::from_secs(1);
    /// assert_eq!(Backoff::Exponential.calculate_delay(min, max, 0), Duration::from_millis(1));
    /// assert_eq!(Backoff::Exponential.calculate_delay(min, max, 1), Duration::from_millis(2));
    /// assert_eq!(Backoff::Exponential.calculate_delay(min, max, 10), Duration::from_secs(1));
    /// ```
    pub fn calculate_delay(
        &self,
        min_delay: Duration,
        max_delay: Duration,
        attempt: u32,
    ) -> Duration {
        if min_delay.is_zero() || max_delay.is_zero() {
            return Duration::ZERO;
        }

        let random = RandomSource::shared();
        let delay = match self {
            Backoff::Constant => min_delay,
            Backoff::Exponential => exponential(min_delay, max_delay, attempt),
            Backoff::ExponentialWithEqualJitter => {
                let base = exponential(min_delay, max_delay, attempt);
                base.saturating_add(random.equal(base))
            }
            Backoff::ExponentialWithFullJitter => {
                let base = exponential(min_delay, max_delay, attempt);
                base.saturating_add(random.full(base))
            }
            Backoff::ExponentialWithDecorrelatedJitter => {
                let previous = match attempt.checked_sub(1) {
                    Some(previous_attempt) => exponential(min_delay, max_delay, previous_attempt),
                    None => min_delay,
                };
                let base = exponential(min_delay, max_delay, attempt);
                base.saturating_add(random.decorrelated(min_delay, max_delay, previous))
            }
            Backoff::Fibonacci => fibonacci(min_delay, max_delay, attempt),
            Backoff::Custom(f) => f(min_delay, max_delay, attempt),
        };

        delay.min(max_delay)
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::Constant => write!(f, "Constant"),
            Backoff::Exponential => write!(f, "Exponential"),
            Backoff::ExponentialWithEqualJitter => write!(f, "ExponentialWithEqualJitter"),
            Backoff::ExponentialWithFullJitter => write!(f, "ExponentialWithFullJitter"),
            Backoff::ExponentialWithDecorrelatedJitter => {
                write!(f, "ExponentialWithDecorrelatedJitter")
            }
            Backoff::Fibonacci => write!(f, "Fibonacci"),
            Backoff::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// `min_delay * 2^attempt`, unclamped.
///
/// Doubling stops once the value reaches `max_delay`. A doubling that would overflow
/// yields `max_delay`.
fn exponential(min_delay: Duration, max_delay: Duration, attempt: u32) -> Duration {
    let mut delay = min_delay;
    for _ in 0..attempt {
        if delay >= max_delay {
            break;
        }
        delay = match delay.checked_mul(2) {
            Some(next) => next,
            None => return max_delay,
        };
    }
    delay
}

/// `min_delay * fib(attempt)` with `fib(0) = fib(1) = 1`, unclamped.
fn fibonacci(min_delay: Duration, max_delay: Duration, attempt: u32) -> Duration {
    let mut prev = min_delay;
    let mut curr = min_delay;
    for _ in 1..attempt {
        if curr >= max_delay {
            break;
        }
        let next = match prev.checked_add(curr) {
            Some(next) => next,
            None => return max_delay,
        };
        prev = curr;
        curr = next;
    }
    curr
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Backoff; 6] = [
        Backoff::Constant,
        Backoff::Exponential,
        Backoff::ExponentialWithEqualJitter,
        Backoff::ExponentialWithFullJitter,
        Backoff::ExponentialWithDecorrelatedJitter,
        Backoff::Fibonacci,
    ];

    #[test]
    fn test_exponential_strategy() {
        let min = Duration::from_millis(1);
        let max = Duration::from_secs(1);
        let expo = Backoff::Exponential;

        assert_eq!(expo.calculate_delay(min, max, 0), Duration::from_millis(1));
        assert_eq!(expo.calculate_delay(min, max, 1), Duration::from_millis(2));
        assert_eq!(expo.calculate_delay(min, max, 2), Duration::from_millis(4));
        assert_eq!(expo.calculate_delay(min, max, 9), Duration::from_millis(512));
        assert_eq!(expo.calculate_delay(min, max, 10), Duration::from_secs(1));
    }

    #[test]
    fn test_exponential_strategy_secs() {
        let min = Duration::from_secs(2);
        let max = Duration::from_secs(60);
        let expo = Backoff::Exponential;

        assert_eq!(expo.calculate_delay(min, max, 0), Duration::from_secs(2));
        assert_eq!(expo.calculate_delay(min, max, 1), Duration::from_secs(4));
        assert_eq!(expo.calculate_delay(min, max, 2), Duration::from_secs(8));
        assert_eq!(expo.calculate_delay(min, max, 3), Duration::from_secs(16));
        assert_eq!(expo.calculate_delay(min, max, 4), Duration::from_secs(32));
        assert_eq!(expo.calculate_delay(min, max, 5), Duration::from_secs(60));
    }

    #[test]
    fn test_exponential_strategy_huge_attempt() {
        let min = Duration::from_nanos(1);

        assert_eq!(
            Backoff::Exponential.calculate_delay(min, Duration::from_secs(30), u32::MAX),
            Duration::from_secs(30)
        );
        assert_eq!(
            Backoff::Exponential.calculate_delay(min, Duration::MAX, u32::MAX),
            Duration::MAX
        );
        assert_eq!(
            Backoff::ExponentialWithFullJitter.calculate_delay(min, Duration::MAX, 200),
            Duration::MAX
        );
    }

    #[test]
    fn test_min_above_max_is_clamped() {
        let min = Duration::from_secs(5);
        let max = Duration::from_secs(1);

        for backoff in ALL {
            for attempt in [0, 1, 7] {
                assert_eq!(backoff.calculate_delay(min, max, attempt), max, "{:?}", backoff);
            }
        }
    }

    #[test]
    fn test_degenerate_bounds_yield_zero() {
        let some = Duration::from_millis(100);

        for backoff in ALL {
            for attempt in [0, 3] {
                assert_eq!(backoff.calculate_delay(Duration::ZERO, some, attempt), Duration::ZERO);
                assert_eq!(backoff.calculate_delay(some, Duration::ZERO, attempt), Duration::ZERO);
                assert_eq!(
                    backoff.calculate_delay(Duration::ZERO, Duration::ZERO, attempt),
                    Duration::ZERO
                );
            }
        }
    }

    #[test]
    fn test_all_strategies_stay_within_bounds() {
        let min = Duration::from_millis(10);
        let max = Duration::from_millis(500);

        for backoff in ALL {
            for attempt in 0..20 {
                for _ in 0..10 {
                    let delay = backoff.calculate_delay(min, max, attempt);
                    assert!(delay >= min, "{:?} attempt {} gave {:?}", backoff, attempt, delay);
                    assert!(delay <= max, "{:?} attempt {} gave {:?}", backoff, attempt, delay);
                }
            }
        }
    }

    #[test]
    fn test_exponential_non_decreasing() {
        let min = Duration::from_millis(3);
        let max = Duration::from_secs(10);
        let mut last = Duration::ZERO;

        for attempt in 0..32 {
            let delay = Backoff::Exponential.calculate_delay(min, max, attempt);
            assert!(delay >= last);
            last = delay;
        }
        assert_eq!(last, max);
    }

    #[test]
    fn test_equal_jitter_strategy() {
        let min = Duration::from_millis(100);
        let max = Duration::from_secs(10);
        let backoff = Backoff::ExponentialWithEqualJitter;

        for _ in 0..50 {
            // base 400ms plus equal jitter in [200ms, 400ms)
            let delay = backoff.calculate_delay(min, max, 2);
            assert!(delay >= Duration::from_millis(600));
            assert!(delay < Duration::from_millis(800));
        }
    }

    #[test]
    fn test_full_jitter_strategy() {
        let min = Duration::from_millis(100);
        let max = Duration::from_secs(10);
        let backoff = Backoff::ExponentialWithFullJitter;

        for _ in 0..50 {
            let delay = backoff.calculate_delay(min, max, 3);
            assert!(delay >= Duration::from_millis(800));
            assert!(delay < Duration::from_millis(1600));
        }
    }

    #[test]
    fn test_decorrelated_jitter_strategy() {
        let min = Duration::from_millis(100);
        let max = Duration::from_secs(10);
        let backoff = Backoff::ExponentialWithDecorrelatedJitter;

        for _ in 0..50 {
            // base 100ms + (100ms + random[0, 300ms))
            let first = backoff.calculate_delay(min, max, 0);
            assert!(first >= Duration::from_millis(200));
            assert!(first < Duration::from_millis(500));

            // base 400ms + (100ms + random[0, 600ms))
            let third = backoff.calculate_delay(min, max, 2);
            assert!(third >= Duration::from_millis(500));
            assert!(third < Duration::from_millis(1100));
        }
    }

    #[test]
    fn test_constant_strategy() {
        let min = Duration::from_secs(2);
        let max = Duration::from_secs(10);

        for attempt in 0..5 {
            assert_eq!(Backoff::Constant.calculate_delay(min, max, attempt), min);
        }
    }

    #[test]
    fn test_fibonacci_strategy() {
        let min = Duration::from_secs(1);
        let max = Duration::from_secs(10);
        let fib = Backoff::Fibonacci;

        assert_eq!(fib.calculate_delay(min, max, 0), Duration::from_secs(1));
        assert_eq!(fib.calculate_delay(min, max, 1), Duration::from_secs(1));
        assert_eq!(fib.calculate_delay(min, max, 2), Duration::from_secs(2));
        assert_eq!(fib.calculate_delay(min, max, 3), Duration::from_secs(3));
        assert_eq!(fib.calculate_delay(min, max, 4), Duration::from_secs(5));
        assert_eq!(fib.calculate_delay(min, max, 5), Duration::from_secs(8));
        assert_eq!(fib.calculate_delay(min, max, 6), Duration::from_secs(10));
        assert_eq!(fib.calculate_delay(min, max, u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_custom_strategy_is_clamped() {
        let linear = Backoff::custom(|min, _max, attempt| min * (attempt + 1));
        let min = Duration::from_millis(100);
        let max = Duration::from_millis(350);

        assert_eq!(linear.calculate_delay(min, max, 0), Duration::from_millis(100));
        assert_eq!(linear.calculate_delay(min, max, 2), Duration::from_millis(300));
        assert_eq!(linear.calculate_delay(min, max, 3), max);
        assert_eq!(format!("{:?}", linear), "Custom(..)");
    }
}
