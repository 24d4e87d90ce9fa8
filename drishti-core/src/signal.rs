//! Lifetime-safe publish/subscribe channel
//!
//! An [`EventChannel`] holds weak references to subscriber records. Each record
//! is kept alive by the [`Subscription`] handle returned from
//! [`EventChannel::connect`]; dropping the handle detaches the record, and a
//! detached record is never invoked again, even if it was detached while a
//! publish was already in progress.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

struct Slot<T> {
    id: u64,
    callback: Callback<T>,
}

struct Table<T> {
    next_id: u64,
    slots: Vec<(u64, Weak<Slot<T>>)>,
}

impl<T> Table<T> {
    fn prune(&mut self) {
        self.slots.retain(|(_, slot)| slot.strong_count() > 0);
    }
}

/// One-to-many notification channel carrying values of type `T`.
pub struct EventChannel<T> {
    table: Arc<Mutex<Table<T>>>,
}

impl<T: 'static> EventChannel<T> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                next_id: 0,
                slots: Vec::new(),
            })),
        }
    }

    /// Register `callback`. It stays connected while the returned handle lives.
    #[must_use = "dropping the subscription disconnects the callback"]
    pub fn connect<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut table = self.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        let slot = Arc::new(Slot {
            id,
            callback: Box::new(callback),
        });
        table.slots.push((id, Arc::downgrade(&slot)));
        Subscription {
            attachment: Some(Box::new(Attached {
                slot,
                table: Arc::downgrade(&self.table),
            })),
        }
    }

    /// Deliver `value` to every connected subscriber in connection order.
    ///
    /// The subscriber list is snapshotted before dispatch and the table lock is
    /// not held while callbacks run, so callbacks may connect, disconnect or
    /// publish on this channel.
    pub fn publish(&self, value: &T) {
        dispatch(&self.table, value);
    }

    /// Weak publishing handle. Publishing through it after this channel has
    /// been dropped does nothing.
    pub fn publisher(&self) -> Publisher<T> {
        Publisher {
            table: Arc::downgrade(&self.table),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut table = self.table.lock();
        table.prune();
        table.slots.len()
    }
}

impl<T: 'static> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.table.lock().slots.len())
            .finish()
    }
}

fn dispatch<T>(table: &Mutex<Table<T>>, value: &T) {
    let snapshot: Vec<Weak<Slot<T>>> = {
        let mut table = table.lock();
        table.prune();
        table.slots.iter().map(|(_, slot)| slot.clone()).collect()
    };
    for slot in snapshot {
        // A record detached since the snapshot no longer upgrades.
        if let Some(slot) = slot.upgrade() {
            (slot.callback)(value);
        }
    }
}

/// Weak handle used to publish onto a channel owned elsewhere.
pub struct Publisher<T> {
    table: Weak<Mutex<Table<T>>>,
}

impl<T> Publisher<T> {
    pub fn publish(&self, value: &T) {
        if let Some(table) = self.table.upgrade() {
            dispatch(&table, value);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.table.strong_count() == 0
    }
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

trait Attachment: Send + Sync {
    fn detach(&self);
}

struct Attached<T> {
    slot: Arc<Slot<T>>,
    table: Weak<Mutex<Table<T>>>,
}

impl<T> Attachment for Attached<T> {
    fn detach(&self) {
        if let Some(table) = self.table.upgrade() {
            let id = self.slot.id;
            table
                .lock()
                .slots
                .retain(|(slot_id, slot)| *slot_id != id && slot.strong_count() > 0);
        }
    }
}

/// Keeps a callback connected to its channel until dropped.
#[derive(Default)]
pub struct Subscription {
    attachment: Option<Box<dyn Attachment>>,
}

impl Subscription {
    /// Detach the callback. Calling this more than once is harmless.
    pub fn disconnect(&mut self) {
        if let Some(attachment) = self.attachment.take() {
            attachment.detach();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.attachment.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_publish_without_subscribers() {
        let channel: EventChannel<u32> = EventChannel::new();
        channel.publish(&1);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_in_connection_order() {
        let channel = EventChannel::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = log.clone();
        let _a = channel.connect(move |v: &i32| l1.lock().push(("a", *v)));
        let l2 = log.clone();
        let _b = channel.connect(move |v: &i32| l2.lock().push(("b", *v)));

        channel.publish(&5);
        assert_eq!(*log.lock(), vec![("a", 5), ("b", 5)]);
    }

    #[test]
    fn test_dropped_subscription_not_invoked() {
        let channel = EventChannel::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let sub = channel.connect(move |_: &()| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        channel.publish(&());
        drop(sub);
        channel.publish(&());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let channel: EventChannel<()> = EventChannel::new();
        let mut sub = channel.connect(|_| {});
        assert!(sub.is_connected());
        sub.disconnect();
        sub.disconnect();
        assert!(!sub.is_connected());
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_subscription_outlives_channel() {
        let channel: EventChannel<()> = EventChannel::new();
        let publisher = channel.publisher();
        let mut sub = channel.connect(|_| {});
        drop(channel);
        assert!(publisher.is_closed());
        publisher.publish(&());
        sub.disconnect();
    }

    #[test]
    fn test_publisher_relays_to_subscribers() {
        let channel = EventChannel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = channel.connect(move |v: &String| s.lock().push(v.clone()));
        let publisher = channel.publisher();
        publisher.clone().publish(&"relayed".to_string());
        assert_eq!(*seen.lock(), vec!["relayed".to_string()]);
    }

    #[test]
    fn test_self_disconnect_during_dispatch() {
        let channel = Arc::new(EventChannel::new());
        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));
        let own: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let own_in_cb = own.clone();
        let fh = first_hits.clone();
        let first = channel.connect(move |_: &()| {
            fh.fetch_add(1, Ordering::SeqCst);
            own_in_cb.lock().take();
        });
        *own.lock() = Some(first);

        let sh = second_hits.clone();
        let _second = channel.connect(move |_: &()| {
            sh.fetch_add(1, Ordering::SeqCst);
        });

        channel.publish(&());
        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);

        channel.publish(&());
        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disconnect_other_during_dispatch() {
        let channel = EventChannel::new();
        let later_hits = Arc::new(AtomicUsize::new(0));
        let later: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let victim = later.clone();
        let _first = channel.connect(move |_: &()| {
            victim.lock().take();
        });
        let lh = later_hits.clone();
        *later.lock() = Some(channel.connect(move |_: &()| {
            lh.fetch_add(1, Ordering::SeqCst);
        }));

        channel.publish(&());
        assert_eq!(later_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_connect_during_dispatch_applies_next_publish() {
        let channel = Arc::new(EventChannel::new());
        let added: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));
        let hits = Arc::new(AtomicUsize::new(0));

        let ch = Arc::downgrade(&channel);
        let store = added.clone();
        let h = hits.clone();
        let _sub = channel.connect(move |_: &()| {
            if let Some(ch) = ch.upgrade() {
                let h = h.clone();
                store.lock().push(ch.connect(move |_: &()| {
                    h.fetch_add(1, Ordering::SeqCst);
                }));
            }
        });

        channel.publish(&());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        channel.publish(&());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
