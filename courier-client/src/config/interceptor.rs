//! Interceptors and the registry that holds them.
//!
//! An [`Interceptor`] is a pair of async functions wrapped around one stage of
//! the request pipeline: `resolved` runs when the previous stage succeeded,
//! `rejected` (optional) runs when it failed and may recover. Request
//! interceptors operate on a [`RequestConfig`], response interceptors on a
//! [`Response`].
//!
//! # Example
//!
//! ```ignore
//! use courier_client::{Client, HeaderInterceptor, Interceptor, RequestConfig};
//!
//! let client = Client::new()?;
//!
//! // Simple header interceptor
//! client.interceptors().request.use_interceptor(
//!     HeaderInterceptor::new("Authorization", "Bearer token123").into(),
//! );
//!
//! // Custom async interceptor with a recovery handler
//! let id = client.interceptors().response.use_interceptor(
//!     Interceptor::new(|response| async move { Ok(response) })
//!         .with_rejected(|err| async move { err.into_response() }),
//! );
//!
//! client.interceptors().response.eject(id);
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(feature = "tracing")]
use tracing::debug;

use super::options::RequestConfig;
use crate::ClientError;
use crate::response::Response;

/// Type alias for a boxed future returning a result.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type ResolvedFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<T, ClientError>> + Send + Sync>;
type RejectedFn<T> =
    Arc<dyn Fn(ClientError) -> BoxFuture<'static, Result<T, ClientError>> + Send + Sync>;

// ============================================================================
// Interceptor
// ============================================================================

/// A `resolved` / `rejected` handler pair for one pipeline stage.
pub struct Interceptor<T> {
    resolved: ResolvedFn<T>,
    rejected: Option<RejectedFn<T>>,
}

impl<T: Send + 'static> Interceptor<T> {
    /// Create an interceptor from an async `resolved` handler.
    pub fn new<F, Fut>(resolved: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        Self {
            resolved: Arc::new(move |value| -> BoxFuture<'static, Result<T, ClientError>> {
                Box::pin(resolved(value))
            }),
            rejected: None,
        }
    }

    /// Create an interceptor from a synchronous `resolved` handler.
    pub fn sync<F>(resolved: F) -> Self
    where
        F: Fn(T) -> Result<T, ClientError> + Send + Sync + 'static,
    {
        Self {
            resolved: Arc::new(move |value| -> BoxFuture<'static, Result<T, ClientError>> {
                let result = resolved(value);
                Box::pin(async move { result })
            }),
            rejected: None,
        }
    }

    /// Attach an async `rejected` handler.
    ///
    /// Returning `Ok` recovers the chain; returning `Err` keeps it failing.
    pub fn with_rejected<F, Fut>(mut self, rejected: F) -> Self
    where
        F: Fn(ClientError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        self.rejected = Some(Arc::new(
            move |err| -> BoxFuture<'static, Result<T, ClientError>> { Box::pin(rejected(err)) },
        ));
        self
    }

    /// Returns true if a `rejected` handler is attached.
    pub fn has_rejected(&self) -> bool {
        self.rejected.is_some()
    }

    /// Run this interceptor against the outcome of the previous stage.
    ///
    /// Success goes to `resolved`. Failure goes to `rejected` when present and
    /// otherwise propagates unchanged.
    pub async fn apply(&self, state: Result<T, ClientError>) -> Result<T, ClientError> {
        match state {
            Ok(value) => (self.resolved)(value).await,
            Err(err) => match &self.rejected {
                Some(rejected) => rejected(err).await,
                None => Err(err),
            },
        }
    }
}

impl<T> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        Self {
            resolved: Arc::clone(&self.resolved),
            rejected: self.rejected.clone(),
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("rejected", &self.rejected.is_some())
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Stable handle of a registered interceptor, used to eject it.
///
/// Identifiers are slot indices and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(usize);

impl InterceptorId {
    /// The slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for InterceptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Slot<T> {
    interceptor: Arc<Interceptor<T>>,
    active: AtomicBool,
}

/// Ordered, shared registry of interceptors for one pipeline stage.
///
/// Clones share the same registry. Ejected entries are tombstoned in place,
/// so identifiers stay valid and are never reused.
pub struct InterceptorManager<T> {
    slots: Arc<RwLock<Vec<Arc<Slot<T>>>>>,
}

impl<T: Send + 'static> InterceptorManager<T> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register an interceptor and return its identifier.
    pub fn use_interceptor(&self, interceptor: Interceptor<T>) -> InterceptorId {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let id = InterceptorId(slots.len());
        slots.push(Arc::new(Slot {
            interceptor: Arc::new(interceptor),
            active: AtomicBool::new(true),
        }));

        #[cfg(feature = "tracing")]
        debug!(interceptor.id = id.0, "interceptor registered");

        id
    }

    /// Remove an interceptor. Ejecting twice or ejecting an unknown id is a
    /// no-op.
    pub fn eject(&self, id: InterceptorId) {
        let slot = self.slot(id.0);
        if let Some(slot) = slot {
            if slot.active.swap(false, Ordering::AcqRel) {
                #[cfg(feature = "tracing")]
                debug!(interceptor.id = id.0, "interceptor ejected");
            }
        }
    }

    /// Visit every live interceptor in registration order.
    ///
    /// The slot count is fixed when traversal starts. Each slot is re-read and
    /// its active flag re-checked right before it is visited, and the
    /// internal lock is not held while `visit` runs.
    pub fn for_each(&self, mut visit: impl FnMut(&Arc<Interceptor<T>>)) {
        let len = self.slots.read().unwrap_or_else(PoisonError::into_inner).len();
        for index in 0..len {
            let Some(slot) = self.slot(index) else {
                continue;
            };
            if slot.active.load(Ordering::Acquire) {
                visit(&slot.interceptor);
            }
        }
    }

    /// Live interceptors in registration order.
    pub fn snapshot(&self) -> Vec<Arc<Interceptor<T>>> {
        let mut live = Vec::new();
        self.for_each(|interceptor| live.push(Arc::clone(interceptor)));
        live
    }

    /// Number of live interceptors.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|slot| slot.active.load(Ordering::Acquire))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Eject every interceptor. Identifiers handed out so far stay retired.
    pub fn clear(&self) {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.iter() {
            slot.active.store(false, Ordering::Release);
        }
    }

    fn slot(&self, index: usize) -> Option<Arc<Slot<T>>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }
}

impl<T: Send + 'static> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for InterceptorManager<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<T> fmt::Debug for InterceptorManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("InterceptorManager")
            .field("slots", &slots.len())
            .finish()
    }
}

/// The request and response registries of a client.
#[derive(Clone, Debug, Default)]
pub struct Interceptors {
    pub request: InterceptorManager<RequestConfig>,
    pub response: InterceptorManager<Response>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Header Interceptor
// ============================================================================

/// A request interceptor that sets one top-level header on every request.
///
/// # Example
///
/// ```ignore
/// use courier_client::{Client, HeaderInterceptor};
///
/// let client = Client::new()?;
/// client
///     .interceptors()
///     .request
///     .use_interceptor(HeaderInterceptor::new("Authorization", "Bearer token123").into());
/// ```
#[derive(Clone, Debug)]
pub struct HeaderInterceptor {
    name: String,
    value: String,
}

impl HeaderInterceptor {
    /// Create a new header interceptor.
    ///
    /// Invalid names or values are not checked here; they reject the request
    /// when it is dispatched. Use [`try_new`](Self::try_new) to validate up
    /// front.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Try to create a new header interceptor, returning an error if invalid.
    pub fn try_new(name: &str, value: &str) -> Result<Self, ClientError> {
        http::HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::invalid_request(format!("invalid header name: {name}")))?;
        http::HeaderValue::from_str(value)
            .map_err(|_| ClientError::invalid_request(format!("invalid header value: {value}")))?;
        Ok(Self::new(name, value))
    }

    /// Apply the header to a config.
    pub fn apply(&self, mut config: RequestConfig) -> RequestConfig {
        config
            .header_map_mut()
            .insert(self.name.clone(), self.value.clone().into());
        config
    }
}

impl From<HeaderInterceptor> for Interceptor<RequestConfig> {
    fn from(header: HeaderInterceptor) -> Self {
        Interceptor::sync(move |config| Ok(header.apply(config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn tagging(tag: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Interceptor<u32> {
        Interceptor::sync(move |value| {
            log.lock().unwrap().push(tag);
            Ok(value)
        })
    }

    #[test]
    fn test_use_returns_sequential_ids() {
        let manager = InterceptorManager::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        assert_eq!(manager.use_interceptor(tagging("a", log.clone())).index(), 0);
        assert_eq!(manager.use_interceptor(tagging("b", log.clone())).index(), 1);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_eject_skips_slot_and_ids_are_not_reused() {
        let manager = InterceptorManager::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = manager.use_interceptor(tagging("a", log.clone()));
        manager.use_interceptor(tagging("b", log.clone()));

        manager.eject(a);
        manager.eject(a);
        manager.eject(InterceptorId(99));
        assert_eq!(manager.len(), 1);

        let c = manager.use_interceptor(tagging("c", log.clone()));
        assert_eq!(c.index(), 2);
        assert_eq!(manager.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_for_each_order() {
        let manager = InterceptorManager::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        manager.use_interceptor(tagging("a", log.clone()));
        let b = manager.use_interceptor(tagging("b", log.clone()));
        manager.use_interceptor(tagging("c", log.clone()));
        manager.eject(b);

        for interceptor in manager.snapshot() {
            interceptor.apply(Ok(1)).await.unwrap();
        }
        assert_eq!(*log.lock().unwrap(), vec!["a", "c"]);
    }

    #[test]
    fn test_visitor_may_eject_and_register() {
        let manager = InterceptorManager::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = manager.use_interceptor(tagging("a", log.clone()));
        let b = manager.use_interceptor(tagging("b", log.clone()));

        let mut visited = 0;
        manager.for_each(|_| {
            visited += 1;
            manager.eject(b);
            manager.eject(a);
            manager.use_interceptor(tagging("late", log.clone()));
        });

        // b was ejected before it was reached; the late entry is past the
        // snapshotted length.
        assert_eq!(visited, 1);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_clear() {
        let manager = InterceptorManager::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        manager.use_interceptor(tagging("a", log.clone()));
        manager.clear();
        assert!(manager.is_empty());
        assert_eq!(manager.use_interceptor(tagging("b", log)).index(), 1);
    }

    #[test]
    fn test_clones_share_registry() {
        let manager = InterceptorManager::<u32>::new();
        let other = manager.clone();
        other.use_interceptor(Interceptor::sync(Ok));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_without_rejected_propagates() {
        let interceptor = Interceptor::<u32>::sync(|v| Ok(v + 1));
        assert_eq!(interceptor.apply(Ok(1)).await.unwrap(), 2);

        let err = interceptor
            .apply(Err(ClientError::invalid_request("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_apply_rejected_recovers() {
        let interceptor =
            Interceptor::<u32>::new(|v| async move { Ok(v) }).with_rejected(|_| async { Ok(7) });
        assert!(interceptor.has_rejected());
        let value = interceptor
            .apply(Err(ClientError::invalid_request("x")))
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_header_interceptor() {
        let interceptor: Interceptor<RequestConfig> =
            HeaderInterceptor::new("x-custom-header", "test-value").into();
        let config = interceptor.apply(Ok(RequestConfig::new())).await.unwrap();
        assert_eq!(config.headers.unwrap()["x-custom-header"], "test-value");
    }

    #[test]
    fn test_header_interceptor_try_new() {
        assert!(HeaderInterceptor::try_new("x-ok", "v").is_ok());
        assert!(HeaderInterceptor::try_new("bad header", "v").is_err());
        assert!(HeaderInterceptor::try_new("x-ok", "bad\nvalue").is_err());
    }
}
