use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rand::{Rng, rng};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use retrier::config::RetryConfig;
use retrier::signal::{Never, WithDeadline};
use retrier::strategies::Backoff;
use retrier::{retry, retry_with_data};

// Example 1: an operation that never succeeds, bounded by a 5 second deadline
pub async fn example_deadline_retry() {
    let signal = WithDeadline::timeout(Never, Duration::from_secs(5));
    let config = RetryConfig::default()
        .with_max_attempts(5)
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(1))
        .with_backoff(Backoff::ExponentialWithDecorrelatedJitter)
        .with_notifier(|err: &&str, delay| {
            println!("Operation failed: {}", err);
            println!("...wait {:?} for the next retry\n", delay);
        });

    let result = retry(
        &signal,
        || async {
            println!("Trying operation...");
            Err("operation failed")
        },
        &config,
    )
    .await;

    match result {
        Ok(()) => println!("Operation succeeded"),
        Err(err) => println!("Operation failed after retries: {}", err),
    }
}

// Example 2: a flaky operation that eventually returns a value
pub async fn example_retry_with_data() {
    let config = RetryConfig::default()
        .with_max_attempts(0)
        .with_min_delay(Duration::from_millis(20))
        .with_max_delay(Duration::from_millis(200))
        .with_backoff(Backoff::ExponentialWithFullJitter);

    let result = retry_with_data(
        &Never,
        || async {
            let roll: u8 = rng().random_range(0..10);
            if roll < 7 {
                Err(format!("unlucky roll {}", roll))
            } else {
                Ok(roll)
            }
        },
        &config,
    )
    .await;

    match result {
        Ok(roll) => println!("Success: rolled {}", roll),
        Err(err) => println!("Failed: {}", err),
    }
}

// Example 3: a retry loop stopped by another task
pub async fn example_cancel_from_task() {
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(250)).await;
        println!("Canceling retries");
        canceller.cancel();
    });

    let attempts = Arc::new(AtomicU32::new(0));
    let config = RetryConfig::new(
        0,
        Duration::from_millis(50),
        Duration::from_millis(50),
        Backoff::Constant,
    );

    let result = retry(
        &token,
        || {
            let attempts = Arc::clone(&attempts);
            async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                println!("Attempt #{}", attempt);
                Err::<(), _>("service unavailable")
            }
        },
        &config,
    )
    .await;

    if let Err(err) = result {
        println!(
            "Stopped after {} attempts: {:?}",
            err.attempts(),
            err.cancel_reason()
        );
    }
}
