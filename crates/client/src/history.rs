use std::collections::VecDeque;

use taskbell_protocol::Notification;
use taskbell_protocol::constants::HISTORY_CAPACITY;

/// Fixed-capacity, newest-first log of received notifications.
///
/// Backed by a `VecDeque`. When full, the oldest entry (the tail) is
/// evicted on each push. Iteration order is newest → oldest.
#[derive(Debug, Clone)]
pub struct NotificationHistory {
    buf: VecDeque<Notification>,
    capacity: usize,
}

impl NotificationHistory {
    /// History with the default capacity of 50.
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be > 0");
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend a notification, evicting the oldest when at capacity.
    pub fn push(&mut self, notification: Notification) {
        if self.buf.len() == self.capacity {
            self.buf.pop_back();
        }
        self.buf.push_front(notification);
    }

    /// Iterate from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.buf.iter()
    }

    /// The most recently received notification, if any.
    pub fn latest(&self) -> Option<&Notification> {
        self.buf.front()
    }

    /// Owned copy, newest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.buf.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for NotificationHistory {
    fn default() -> Self {
        Self::new()
    }
}
