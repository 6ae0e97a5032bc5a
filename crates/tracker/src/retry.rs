//! Retry policies for calls to the status API.
//!
//! A [`Strategy`] classifies each failure and decides how long to wait before the next attempt.
//! The tracking loop consults it through [`Strategy::action`] because it has to interleave the
//! wait with cancellation and deadline checks; one-shot callers use [`retry_with`].

use std::{future::Future, sync::Arc, time::Duration};

/// Type alias for the error handler function to reduce type complexity.
pub type ErrorHandler<E> = Arc<dyn Fn(&E, usize) -> RetryAction + Send + Sync>;

/// Represents the action to take when an error occurs during retry attempts.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RetryAction {
    /// Continue retrying with the specified delay.
    Retry(Duration),

    /// Stop retrying and return the error.
    Stop,
}

/// A retry strategy that determines how to handle errors and when to retry.
#[derive(Clone)]
pub struct Strategy<E> {
    /// Determines the action to take for a given error and zero-based retry attempt.
    error_handler: ErrorHandler<E>,

    /// Maximum number of retry attempts (None for unlimited).
    max_retries: Option<usize>,
}

impl<E> std::fmt::Debug for Strategy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl<E> Strategy<E> {
    /// Creates a new retry strategy with the given error handler.
    ///
    /// This will retry indefinitely unless a maximum number of retries is set later with
    /// [`Self::with_max_retries`].
    pub fn new<F>(error_handler: F) -> Self
    where
        F: Fn(&E, usize) -> RetryAction + Send + Sync + 'static,
    {
        Self {
            error_handler: Arc::new(error_handler),
            max_retries: None,
        }
    }

    /// Sets the maximum number of retry attempts.
    pub const fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Returns the maximum number of retry attempts, if any.
    pub const fn max_retries(&self) -> Option<usize> {
        self.max_retries
    }

    /// Creates a strategy that retries every error with exponential backoff.
    ///
    /// The first retry waits `initial_delay`, each following one `multiplier` times longer, never
    /// more than `max_delay`.
    pub fn exponential_backoff(
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    ) -> Strategy<E>
    where
        E: Send + Sync + 'static,
    {
        let multiplier = multiplier.max(1.0);

        Strategy::new(move |_error, attempt| {
            let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
            let delay_ms = (initial_delay.as_millis() as f64 * multiplier.powi(exponent))
                .min(max_delay.as_millis() as f64) as u64;
            RetryAction::Retry(Duration::from_millis(delay_ms))
        })
    }

    /// Creates a strategy that retries with a fixed delay.
    #[cfg(test)]
    pub(crate) fn fixed_delay(delay: Duration) -> Strategy<E>
    where
        E: Send + Sync + 'static,
    {
        Strategy::new(move |_error, _attempt| RetryAction::Retry(delay))
    }

    /// Restricts this strategy to the errors matching `predicate`; every other error stops.
    pub fn only_if<P>(self, predicate: P) -> Strategy<E>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let handler = self.error_handler;
        Strategy {
            error_handler: Arc::new(move |error, attempt| {
                if predicate(error) {
                    handler(error, attempt)
                } else {
                    RetryAction::Stop
                }
            }),
            max_retries: self.max_retries,
        }
    }

    /// Decides what to do after the failure of the zero-based retry `attempt`.
    ///
    /// Returns [`RetryAction::Stop`] once `attempt` reaches the maximum number of retries.
    pub fn action(&self, error: &E, attempt: usize) -> RetryAction {
        if self.max_retries.is_some_and(|max| attempt >= max) {
            return RetryAction::Stop;
        }

        (self.error_handler)(error, attempt)
    }
}

/// Runs the future produced by `generator` until it succeeds or `strategy` says to stop.
pub async fn retry_with<A, E, Fut, Gen>(strategy: Strategy<E>, mut generator: Gen) -> Result<A, E>
where
    Fut: Future<Output = Result<A, E>>,
    Gen: FnMut() -> Fut,
{
    let mut attempt = 0;

    loop {
        match generator().await {
            Ok(result) => return Ok(result),
            Err(error) => match strategy.action(&error, attempt) {
                RetryAction::Retry(delay) => {
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryAction::Stop => return Err(error),
            },
        }
    }
}
