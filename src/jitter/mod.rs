use log::{trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{LazyLock, Mutex};
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

static SHARED: LazyLock<RandomSource> = LazyLock::new(RandomSource::from_os);

/// A cryptographically secure random source for jitter computations.
///
/// The generator is a ChaCha-based [`StdRng`] seeded from the operating system. It sits behind
/// a mutex that is held only while a single value is drawn, so one source can be shared by any
/// number of concurrent retry loops.
///
/// Drawing never fails: if the generator could not be seeded, or the lock has been poisoned,
/// the requested upper bound is returned instead of a random value.
#[derive(Debug)]
pub struct RandomSource {
    rng: Mutex<Option<StdRng>>,
}

impl RandomSource {
    /// Creates a new source seeded from the operating system's entropy pool.
    pub fn from_os() -> Self {
        let rng = match StdRng::try_from_os_rng() {
            Ok(rng) => Some(rng),
            Err(err) => {
                warn!("Could not seed jitter random source from the OS: {}", err);
                None
            }
        };
        RandomSource {
            rng: Mutex::new(rng),
        }
    }

    /// Returns the process-wide source used by the backoff strategies.
    pub fn shared() -> &'static RandomSource {
        &SHARED
    }

    /// Returns a uniformly distributed duration in `[0, upper)`.
    ///
    /// A zero `upper` yields [`Duration::ZERO`].
    pub fn duration_below(&self, upper: Duration) -> Duration {
        if upper.is_zero() {
            return Duration::ZERO;
        }

        let bound = upper.as_nanos();
        let nanos = match self.rng.lock() {
            Ok(mut guard) => match guard.as_mut() {
                Some(rng) => rng.random_range(0..bound),
                None => {
                    trace!("Jitter random source unavailable, using upper bound {:?}", upper);
                    return upper;
                }
            },
            Err(_) => {
                trace!("Jitter random source poisoned, using upper bound {:?}", upper);
                return upper;
            }
        };

        duration_from_nanos(nanos)
    }

    /// Equal jitter: `base/2 + random[0, base/2)`, which lies in `[base/2, base)`.
    pub fn equal(&self, base: Duration) -> Duration {
        if base.is_zero() {
            return Duration::ZERO;
        }

        let midpoint = base / 2;
        midpoint + self.duration_below(midpoint)
    }

    /// Full jitter: `random[0, base)`.
    pub fn full(&self, base: Duration) -> Duration {
        self.duration_below(base)
    }

    /// Decorrelated jitter: `min_delay + random[0, previous * 3)`, capped at `max_delay`.
    ///
    /// A zero `previous` is treated as `min_delay`. When `min_delay > max_delay` the
    /// configuration is meaningless and [`Duration::ZERO`] is returned.
    pub fn decorrelated(
        &self,
        min_delay: Duration,
        max_delay: Duration,
        previous: Duration,
    ) -> Duration {
        if min_delay > max_delay {
            return Duration::ZERO;
        }

        let previous = if previous.is_zero() {
            min_delay
        } else {
            previous
        };

        let jittered = min_delay.saturating_add(self.duration_below(previous.saturating_mul(3)));
        jittered.min(max_delay)
    }

    #[cfg(test)]
    pub(crate) fn unseeded() -> Self {
        RandomSource {
            rng: Mutex::new(None),
        }
    }
}

/// Equal jitter drawn from the shared source. See [`RandomSource::equal`].
pub fn equal(base: Duration) -> Duration {
    RandomSource::shared().equal(base)
}

/// Full jitter drawn from the shared source. See [`RandomSource::full`].
pub fn full(base: Duration) -> Duration {
    RandomSource::shared().full(base)
}

/// Decorrelated jitter drawn from the shared source. See [`RandomSource::decorrelated`].
pub fn decorrelated(min_delay: Duration, max_delay: Duration, previous: Duration) -> Duration {
    RandomSource::shared().decorrelated(min_delay, max_delay, previous)
}

fn duration_from_nanos(nanos: u128) -> Duration {
    // `nanos` is below a value obtained from `Duration::as_nanos`, so the seconds fit in a u64.
    Duration::new(
        (nanos / NANOS_PER_SEC) as u64,
        (nanos % NANOS_PER_SEC) as u32,
    )
}
