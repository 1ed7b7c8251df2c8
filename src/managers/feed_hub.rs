//! Live snapshot feeds.
//!
//! A [`FeedHub`] keeps one `tokio::sync::watch` channel per user. Every publish
//! replaces the whole snapshot, so a reader never merges partial updates: the
//! latest value fully supersedes whatever it rendered before.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

/// Per-user registry of snapshot channels for one collection kind.
pub struct FeedHub<T> {
    name: &'static str,
    senders: Mutex<HashMap<String, watch::Sender<Vec<T>>>>,
}

impl<T: Clone> FeedHub<T> {
    /// Creates an empty hub. `name` only labels log lines.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            senders: Mutex::new(HashMap::new()),
        }
    }

    fn senders(&self) -> MutexGuard<'_, HashMap<String, watch::Sender<Vec<T>>>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a subscription whose first delivery is `current`.
    pub fn subscribe(&self, user_id: &str, current: Vec<T>) -> Subscription<T> {
        let mut senders = self.senders();
        let rx = match senders.get(user_id) {
            Some(tx) => {
                tx.send_replace(current);
                tx.subscribe()
            }
            None => {
                let (tx, rx) = watch::channel(current);
                senders.insert(user_id.to_string(), tx);
                rx
            }
        };
        debug!(feed = self.name, user_id, "subscribed");
        Subscription {
            user_id: user_id.to_string(),
            rx,
            primed: false,
        }
    }

    /// Pushes a new snapshot to every live subscriber of `user_id`.
    ///
    /// A channel whose receivers are all gone is dropped instead.
    pub fn publish(&self, user_id: &str, snapshot: Vec<T>) {
        let mut senders = self.senders();
        let Some(tx) = senders.get(user_id) else {
            return;
        };
        if tx.receiver_count() == 0 {
            senders.remove(user_id);
            debug!(feed = self.name, user_id, "dropped idle feed");
            return;
        }
        tx.send_replace(snapshot);
    }

    /// Whether anyone is listening for `user_id`. Lets callers skip loading a
    /// snapshot nobody will read.
    ///
    /// A channel found with no receivers left is dropped on the spot.
    pub fn has_subscribers(&self, user_id: &str) -> bool {
        let mut senders = self.senders();
        match senders.get(user_id).map(|tx| tx.receiver_count()) {
            Some(0) => {
                senders.remove(user_id);
                debug!(feed = self.name, user_id, "dropped idle feed");
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.senders()
            .get(user_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Number of users that currently hold a channel.
    pub fn channel_count(&self) -> usize {
        self.senders().len()
    }

    /// Closes the feed for `user_id`; pending `next()` calls resolve to `None`.
    pub fn close(&self, user_id: &str) {
        if self.senders().remove(user_id).is_some() {
            debug!(feed = self.name, user_id, "closed feed");
        }
    }
}

/// Cancellable stream of full snapshots for one user.
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`]) detaches
/// it from the hub.
pub struct Subscription<T> {
    user_id: String,
    rx: watch::Receiver<Vec<T>>,
    primed: bool,
}

impl<T: Clone> Subscription<T> {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Waits for the next snapshot. The first call yields the snapshot taken
    /// at subscribe time. Returns `None` once the feed is closed.
    pub async fn next(&mut self) -> Option<Vec<T>> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Non-blocking variant of [`Subscription::next`].
    pub fn try_next(&mut self) -> Option<Vec<T>> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }

    /// Explicit teardown.
    pub fn unsubscribe(self) {
        debug!(user_id = %self.user_id, "unsubscribed");
    }
}
