//! Observer registry and broadcast
//!
//! Subscribers are either [`Observer`] objects or plain callbacks. Broadcasts
//! go to a snapshot of the registry taken up front, and every delivery is
//! isolated: an observer that errors or panics is logged and skipped.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};

/// Error type listeners may return
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

pub type ListenerResult = std::result::Result<(), ListenerError>;

/// Events carried by an [`EventBus`]
pub trait Event {
    /// Short name used in logs
    fn event_type(&self) -> &'static str;
}

/// A typed listener
pub trait Observer<E>: Send + Sync {
    fn update(&self, event: &E) -> ListenerResult;
}

type Callback<E> = Arc<dyn Fn(&E) -> ListenerResult + Send + Sync>;

/// Handle returned by `subscribe`, usable to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

enum Subscriber<E> {
    Observer(Arc<dyn Observer<E>>),
    Callback(Callback<E>),
}

impl<E> Clone for Subscriber<E> {
    fn clone(&self) -> Self {
        match self {
            Subscriber::Observer(observer) => Subscriber::Observer(Arc::clone(observer)),
            Subscriber::Callback(callback) => Subscriber::Callback(Arc::clone(callback)),
        }
    }
}

impl<E> Subscriber<E> {
    fn notify(&self, event: &E) -> ListenerResult {
        match self {
            Subscriber::Observer(observer) => observer.update(event),
            Subscriber::Callback(callback) => callback(event),
        }
    }

    fn is_observer(&self, ptr: *const ()) -> bool {
        match self {
            Subscriber::Observer(observer) => Arc::as_ptr(observer).cast::<()>() == ptr,
            Subscriber::Callback(_) => false,
        }
    }
}

/// Registry of subscribers for events of type `E`
pub struct EventBus<E> {
    subscribers: Vec<(SubscriptionId, Subscriber<E>)>,
    next_id: u64,
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register an observer. Registering the same observer twice returns
    /// the original subscription.
    pub fn subscribe(&mut self, observer: Arc<dyn Observer<E>>) -> SubscriptionId {
        let ptr = Arc::as_ptr(&observer).cast::<()>();
        if let Some((id, _)) = self.subscribers.iter().find(|(_, s)| s.is_observer(ptr)) {
            return *id;
        }
        self.register(Subscriber::Observer(observer))
    }

    /// Register a plain callback
    pub fn subscribe_fn<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) -> ListenerResult + Send + Sync + 'static,
    {
        self.register(Subscriber::Callback(Arc::new(callback)))
    }

    /// Remove an observer registered with [`EventBus::subscribe`]
    pub fn unsubscribe<O: ?Sized>(&mut self, observer: &Arc<O>) -> bool {
        let ptr = Arc::as_ptr(observer).cast::<()>();
        let before = self.subscribers.len();
        self.subscribers.retain(|(_, s)| !s.is_observer(ptr));
        self.subscribers.len() != before
    }

    /// Remove any subscriber by its handle
    pub fn unsubscribe_id(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Copy of the current registry, for delivery outside any lock
    pub fn snapshot(&self) -> Dispatch<E> {
        Dispatch {
            subscribers: self.subscribers.clone(),
        }
    }

    fn register(&mut self, subscriber: Subscriber<E>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push((id, subscriber));
        id
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A frozen list of subscribers ready to receive one event
pub struct Dispatch<E> {
    subscribers: Vec<(SubscriptionId, Subscriber<E>)>,
}

impl<E: Event> Dispatch<E> {
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver `event`, returning the number of failed deliveries
    pub fn deliver(&self, event: &E) -> usize {
        let mut failures = 0;
        for (id, subscriber) in &self.subscribers {
            let context = format!("{} subscriber {}", event.event_type(), id);
            if !guarded(&context, || subscriber.notify(event)) {
                failures += 1;
            }
        }
        failures
    }
}

/// Run a listener, catching both returned errors and panics
///
/// Failures are logged with `context`. Returns whether the listener succeeded.
pub(crate) fn guarded<F>(context: &str, listener: F) -> bool
where
    F: FnOnce() -> ListenerResult,
{
    match panic::catch_unwind(AssertUnwindSafe(listener)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(context, error = %e, "Listener returned an error");
            false
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(context, panic = %message, "Listener panicked");
            false
        }
    }
}
