//! Request cancellation.
//!
//! A [`CancelToken`] is a one-shot signal: it starts pending and moves to
//! cancelled at most once, recording a [`Cancel`] reason. The side that
//! cancels holds a [`Canceler`]; the request pipeline holds the token.
//!
//! # Example
//!
//! ```ignore
//! use courier_client::{CancelToken, Client, RequestConfig};
//!
//! let source = CancelToken::source();
//! let client = Client::new()?;
//!
//! let pending = client.get_with_config(
//!     "https://example.com/slow",
//!     RequestConfig::new().cancel_token(source.token.clone()),
//! );
//!
//! source.cancel.cancel("user navigated away");
//! assert!(pending.await.unwrap_err().is_cancel());
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::ClientError;

/// The reason a request was cancelled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cancel {
    pub message: Option<String>,
}

impl Cancel {
    pub fn new(message: Option<String>) -> Self {
        Self { message }
    }
}

impl fmt::Display for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None => f.write_str("canceled"),
        }
    }
}

enum Waiter {
    Signal(oneshot::Sender<Cancel>),
    Callback(Box<dyn FnOnce(&Cancel) + Send>),
}

#[derive(Default)]
struct State {
    reason: Option<Cancel>,
    waiters: Vec<Waiter>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Observing side of a cancellation signal. Clones share state.
#[derive(Clone, Default)]
pub struct CancelToken {
    shared: Arc<Shared>,
}

/// Cancelling side of a [`CancelToken`].
#[derive(Clone)]
pub struct Canceler {
    shared: Arc<Shared>,
}

/// A token together with the canceler that controls it.
#[derive(Clone)]
pub struct CancelTokenSource {
    pub token: CancelToken,
    pub cancel: Canceler,
}

impl CancelToken {
    /// Create a token and hand its [`Canceler`] to `executor`.
    pub fn new(executor: impl FnOnce(Canceler)) -> Self {
        let token = Self::default();
        executor(Canceler {
            shared: Arc::clone(&token.shared),
        });
        token
    }

    /// Create a token together with its canceler.
    pub fn source() -> CancelTokenSource {
        let token = Self::default();
        let cancel = Canceler {
            shared: Arc::clone(&token.shared),
        };
        CancelTokenSource { token, cancel }
    }

    /// The recorded reason, once cancelled.
    pub fn reason(&self) -> Option<Cancel> {
        self.shared.lock().reason.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.lock().reason.is_some()
    }

    /// Fail with [`ClientError::Cancelled`] if cancellation was requested.
    pub fn throw_if_requested(&self) -> Result<(), ClientError> {
        match self.reason() {
            Some(reason) => Err(ClientError::from(reason)),
            None => Ok(()),
        }
    }

    /// Resolve with the reason once the token is cancelled.
    ///
    /// Resolves immediately if it already is. Dropping the future before then
    /// unsubscribes it.
    pub async fn cancelled(&self) -> Cancel {
        let rx = {
            let mut state = self.shared.lock();
            if let Some(reason) = &state.reason {
                return reason.clone();
            }
            state
                .waiters
                .retain(|waiter| !matches!(waiter, Waiter::Signal(tx) if tx.is_closed()));
            let (tx, rx) = oneshot::channel();
            state.waiters.push(Waiter::Signal(tx));
            rx
        };

        match rx.await {
            Ok(reason) => reason,
            // The sender is only dropped after sending.
            Err(_) => std::future::pending().await,
        }
    }

    /// Run `callback` once when the token is cancelled, or right away if it
    /// already is.
    pub fn on_cancel(&self, callback: impl FnOnce(&Cancel) + Send + 'static) {
        let reason = {
            let mut state = self.shared.lock();
            match &state.reason {
                Some(reason) => reason.clone(),
                None => {
                    state.waiters.push(Waiter::Callback(Box::new(callback)));
                    return;
                }
            }
        };
        callback(&reason);
    }

    /// Returns true if both handles observe the same signal.
    pub fn same_token(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("reason", &self.reason())
            .finish()
    }
}

impl Canceler {
    /// Cancel with a message. Only the first cancellation takes effect;
    /// returns false if the token was already cancelled.
    pub fn cancel(&self, message: impl Into<String>) -> bool {
        self.cancel_with(Cancel::new(Some(message.into())))
    }

    /// Cancel with the given reason.
    pub fn cancel_with(&self, reason: Cancel) -> bool {
        let waiters = {
            let mut state = self.shared.lock();
            if state.reason.is_some() {
                return false;
            }
            state.reason = Some(reason.clone());
            std::mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            match waiter {
                Waiter::Signal(tx) => {
                    let _ = tx.send(reason.clone());
                }
                Waiter::Callback(callback) => callback(&reason),
            }
        }
        true
    }

    /// The token this canceler controls.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl fmt::Debug for Canceler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceler").finish_non_exhaustive()
    }
}

impl fmt::Debug for CancelTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelTokenSource")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_executor_receives_canceler() {
        let mut captured = None;
        let token = CancelToken::new(|cancel| captured = Some(cancel));
        assert!(!token.is_cancelled());

        captured.unwrap().cancel("stop");
        assert_eq!(token.reason(), Some(Cancel::new(Some("stop".into()))));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let source = CancelToken::source();
        assert!(source.cancel.cancel("first"));
        assert!(!source.cancel.cancel("second"));
        assert_eq!(source.token.reason().unwrap().message.as_deref(), Some("first"));
    }

    #[test]
    fn test_throw_if_requested() {
        let source = CancelToken::source();
        assert!(source.token.throw_if_requested().is_ok());
        source.cancel.cancel_with(Cancel::default());
        let err = source.token.throw_if_requested().unwrap_err();
        assert!(err.is_cancel());
        assert_eq!(err.to_string(), "canceled");
    }

    #[test]
    fn test_on_cancel_runs_once() {
        let source = CancelToken::source();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        source.token.on_cancel(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        source.cancel.cancel("a");
        source.cancel.cancel("b");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Late subscribers are notified right away.
        let counter = calls.clone();
        source.token.on_cancel(move |reason| {
            assert_eq!(reason.message.as_deref(), Some("a"));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callbacks_may_reenter_token() {
        let source = CancelToken::source();
        let calls = Arc::new(AtomicUsize::new(0));

        let (token, cancel, counter) = (source.token.clone(), source.cancel.clone(), calls.clone());
        source.token.on_cancel(move |_| {
            assert!(!cancel.cancel("again"));
            let counter = counter.clone();
            token.on_cancel(move |reason| {
                assert_eq!(reason.message.as_deref(), Some("first"));
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        assert!(source.cancel.cancel("first"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.token.reason().unwrap().message.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_cancelled_resolves() {
        let source = CancelToken::source();
        let token = source.token.clone();
        let waiter = tokio::spawn(async move { token.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        source.cancel.cancel("done");
        let reason = waiter.await.unwrap();
        assert_eq!(reason.message.as_deref(), Some("done"));

        // Already cancelled: resolves immediately.
        assert_eq!(source.token.cancelled().await, reason);
    }

    #[tokio::test]
    async fn test_dropped_waiters_are_pruned() {
        let source = CancelToken::source();
        for _ in 0..10 {
            let fut = source.token.cancelled();
            let _ = tokio::time::timeout(Duration::from_millis(1), fut).await;
        }
        assert!(source.token.shared.lock().waiters.len() <= 1);
    }

    #[test]
    fn test_clones_share_state() {
        let source = CancelToken::source();
        let clone = source.token.clone();
        assert!(clone.same_token(&source.cancel.token()));
        source.cancel.cancel("x");
        assert!(clone.is_cancelled());
        assert!(!clone.same_token(&CancelToken::default()));
    }
}
