use crate::signal::CancelReason;
use thiserror::Error;

/// Error returned by the retry loop when it ends without a success.
///
/// The operation's own error is never wrapped or altered: [`RetryError::Exhausted`] carries the
/// error of the final attempt exactly as the operation returned it. Cancellation is reported
/// separately, so callers can tell "gave up" from "was told to stop".
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every allowed attempt failed.
    #[error("operation failed after {attempts} attempts: {error}")]
    Exhausted {
        /// The error from the last attempt.
        error: E,
        /// How many times the operation was invoked.
        attempts: u32,
    },

    /// The signal fired before the operation succeeded.
    #[error("retry stopped after {attempts} attempts: {reason}")]
    Canceled {
        reason: CancelReason,
        /// How many times the operation was invoked.
        attempts: u32,
        /// The error of the most recent failed attempt, if there was one.
        last_error: Option<E>,
    },
}

impl<E> RetryError<E> {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, RetryError::Canceled { .. })
    }

    /// The signal's reason, when the loop was canceled.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            RetryError::Canceled { reason, .. } => Some(*reason),
            RetryError::Exhausted { .. } => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Canceled { attempts, .. } => {
                *attempts
            }
        }
    }

    /// A reference to the most recent operation error, if any attempt failed.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { error, .. } => Some(error),
            RetryError::Canceled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Extracts the most recent operation error, discarding the metadata.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            RetryError::Exhausted { error, .. } => Some(error),
            RetryError::Canceled { last_error, .. } => last_error,
        }
    }
}
