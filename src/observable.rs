use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use dashmap::DashMap;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;
use uuid::Uuid;

pub type ListenerId = Uuid;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    sender: watch::Sender<Arc<T>>,
    listeners: DashMap<ListenerId, Listener<T>>,
    // held while a new value is computed and sent, never while listeners run
    write: Mutex<()>,
}

trait ListenerRegistry: Send + Sync {
    fn remove_listener(&self, id: &ListenerId);
}

impl<T: Send + Sync + 'static> ListenerRegistry for Inner<T> {
    fn remove_listener(&self, id: &ListenerId) {
        self.listeners.remove(id);
        debug!(listener_id = %id, "listener removed");
    }
}

/// A value with current-value replay.
///
/// Readers get immutable `Arc` snapshots; writers replace the whole value, so
/// a reader never observes a half-applied update.
pub struct Observable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Default + Send + Sync + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Send + Sync + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self {
            inner: Arc::new(Inner {
                sender,
                listeners: DashMap::new(),
                write: Mutex::new(()),
            }),
        }
    }

    pub fn current(&self) -> Arc<T> {
        self.inner.sender.borrow().clone()
    }

    pub fn publish(&self, value: T) {
        let value = Arc::new(value);
        {
            let _write = self.lock_write();
            self.inner.sender.send_replace(value.clone());
        }
        self.notify(&value);
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<T>> {
        self.inner.sender.subscribe()
    }

    /// Stream of values, starting with the current one.
    pub fn stream(&self) -> WatchStream<Arc<T>> {
        WatchStream::new(self.subscribe())
    }

    /// Call `listener` with the current value right away, then on every
    /// publication until the returned handle is dropped.
    pub fn observe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        let listener: Listener<T> = Arc::new(listener);
        listener(&self.current());
        self.inner.listeners.insert(id, listener);
        debug!(listener_id = %id, "listener registered");

        let registry: Arc<dyn ListenerRegistry> = self.inner.clone();
        Subscription {
            id,
            registry: Arc::downgrade(&registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    fn lock_write(&self) -> MutexGuard<'_, ()> {
        self.inner.write.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for listener in listeners {
            listener(value);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Apply `f` to a private copy of the value and publish the result as one
    /// replacement.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let (out, value) = {
            let _write = self.lock_write();
            let mut next = T::clone(&self.current());
            let out = f(&mut next);
            let value = Arc::new(next);
            self.inner.sender.send_replace(value.clone());
            (out, value)
        };
        self.notify(&value);
        out
    }
}

/// Handle returned by [`Observable::observe`]. Dropping it stops delivery.
pub struct Subscription {
    id: ListenerId,
    registry: Weak<dyn ListenerRegistry>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_listener(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::StreamExt;

    use super::*;

    #[test]
    fn observe_replays_current_value() {
        let value = Observable::new(vec![1, 2]);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let _sub = value.observe(move |v: &Vec<i32>| sink.lock().unwrap().push(v.clone()));
        value.publish(vec![3]);

        assert_eq!(*seen.lock().unwrap(), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn dropping_subscription_stops_delivery() {
        let value = Observable::new(0u32);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let sub = value.observe(move |v: &u32| sink.lock().unwrap().push(*v));
        value.publish(1);
        sub.unsubscribe();
        value.publish(2);

        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
        assert_eq!(value.listener_count(), 0);
    }

    #[test]
    fn update_leaves_old_snapshots_untouched() {
        let value = Observable::new(vec!["a".to_string()]);
        let before = value.current();

        let len = value.update(|v| {
            v.push("b".into());
            v.len()
        });

        assert_eq!(len, 2);
        assert_eq!(*before, vec!["a".to_string()]);
        assert_eq!(*value.current(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let value = Observable::new(0u64);

        let writers: Vec<_> = (0..8)
            .map(|_| {
                let value = value.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        value.update(|v| *v += 1);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(*value.current(), 800);
    }

    #[test]
    fn listener_may_update_from_callback() {
        let value = Observable::new(0u32);
        let inner = value.clone();

        let _sub = value.observe(move |v: &u32| {
            if *v == 1 {
                inner.update(|v| *v = 2);
            }
        });
        value.update(|v| *v = 1);

        assert_eq!(*value.current(), 2);
    }

    #[test]
    fn listener_may_subscribe_from_callback() {
        let value = Observable::new(0u32);
        let inner = value.clone();
        let nested = Arc::new(Mutex::new(Vec::new()));

        let holder = nested.clone();
        let _sub = value.observe(move |v: &u32| {
            if *v == 1 {
                holder.lock().unwrap().push(inner.observe(|_: &u32| {}));
            }
        });
        value.publish(1);

        assert_eq!(value.listener_count(), 2);
    }

    #[tokio::test]
    async fn stream_starts_with_current_value() {
        let value = Observable::new(false);
        let mut stream = value.stream();

        assert!(!*stream.next().await.unwrap());
        value.publish(true);
        assert!(*stream.next().await.unwrap());
    }
}
