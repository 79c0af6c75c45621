use std::{fmt::Debug, sync::Arc};

use parking_lot::Mutex;

/// Callback registered on an [`EventChannel`]
pub type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Synchronous publish/subscribe channel
///
/// Subscribers are invoked in subscription order on the publishing thread.
/// There is no deduplication: a callback subscribed twice runs twice per publish.
///
/// `publish` iterates over a snapshot of the subscriber list, so a subscriber
/// may subscribe or unsubscribe (on this or another channel) while it runs.
/// Such changes take effect from the next publish.
/// A panic inside a subscriber is not caught and propagates to the publisher.
pub struct EventChannel<T> {
    subscribers: Mutex<Vec<Subscriber<T>>>,
}

impl<T> EventChannel<T> {
    /// Create an empty channel
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Append a subscriber and return the handle needed to unsubscribe it
    pub fn subscribe(&self, callback: Subscriber<T>) -> Subscriber<T> {
        self.subscribers.lock().push(Arc::clone(&callback));
        callback
    }

    /// Convenience wrapper around [`EventChannel::subscribe`] for plain closures
    pub fn subscribe_fn<F>(&self, callback: F) -> Subscriber<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(callback))
    }

    /// Remove the first registration of `callback`
    /// Returns false when it was not subscribed
    pub fn unsubscribe(&self, callback: &Subscriber<T>) -> bool {
        let mut subscribers = self.subscribers.lock();
        match subscribers.iter().position(|s| Arc::ptr_eq(s, callback)) {
            Some(pos) => {
                subscribers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Invoke every current subscriber with `value`
    pub fn publish(&self, value: &T) {
        // lock is released before any callback runs
        let snapshot: Vec<Subscriber<T>> = self.subscribers.lock().clone();
        for subscriber in snapshot {
            subscriber(value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for EventChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
