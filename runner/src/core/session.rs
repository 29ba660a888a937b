//! Bounded conversation history.
//!
//! Keeps only the most recent `max_items` turns of a conversation, oldest
//! first. Appending past capacity evicts from the front in insertion order;
//! reads never return more than the configured capacity.

use std::num::NonZeroUsize;

/// Fixed-capacity sliding window of opaque turn records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHistory<T> {
    session_id: String,
    max_items: NonZeroUsize,
    items: Vec<T>,
}

impl<T> SessionHistory<T> {
    pub fn new(session_id: impl Into<String>, max_items: NonZeroUsize) -> Self {
        Self {
            session_id: session_id.into(),
            max_items,
            items: Vec::new(),
        }
    }

    /// Label supplied at construction. Not used for lookup.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn max_items(&self) -> usize {
        self.max_items.get()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Most recent items, oldest first.
    ///
    /// `limit` is clamped to the capacity first and then to the number of
    /// stored items; `None` means "up to capacity".
    pub fn read_window(&self, limit: Option<usize>) -> &[T] {
        let effective = limit.map_or(self.max_items(), |l| l.min(self.max_items()));
        if effective >= self.items.len() {
            return &self.items;
        }
        &self.items[self.items.len() - effective..]
    }

    /// Append `items` in order, then drop the oldest entries beyond capacity.
    pub fn append(&mut self, items: impl IntoIterator<Item = T>) {
        self.items.extend(items);
        let overflow = self.items.len().saturating_sub(self.max_items());
        if overflow > 0 {
            self.items.drain(..overflow);
        }
    }

    /// Remove and return the newest item, if any.
    pub fn pop_last(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("message-{i}")).collect()
    }

    fn session(max_items: usize) -> SessionHistory<String> {
        SessionHistory::new("test", NonZeroUsize::new(max_items).expect("non-zero"))
    }

    #[test]
    fn append_keeps_only_last_max_items() {
        let mut history = session(4);
        history.append(messages(0..10));
        assert_eq!(history.len(), 4);
        assert_eq!(history.read_window(None), messages(6..10).as_slice());
    }

    #[test]
    fn eviction_is_fifo_across_appends() {
        let mut history = session(3);
        history.append(messages(0..2));
        history.append(messages(2..4));
        assert_eq!(history.read_window(None), messages(1..4).as_slice());
    }

    #[test]
    fn limit_above_capacity_is_clamped() {
        let mut history = session(4);
        history.append(messages(0..10));
        assert_eq!(history.read_window(Some(100)), history.read_window(Some(4)));
        assert_eq!(history.read_window(Some(100)).len(), 4);
    }

    #[test]
    fn limit_below_len_returns_tail_oldest_first() {
        let mut history = session(5);
        history.append(messages(0..5));
        assert_eq!(history.read_window(Some(2)), messages(3..5).as_slice());
        assert!(history.read_window(Some(0)).is_empty());
    }

    #[test]
    fn limit_above_len_returns_everything() {
        let mut history = session(5);
        history.append(messages(0..2));
        assert_eq!(history.read_window(Some(4)), messages(0..2).as_slice());
    }

    #[test]
    fn read_window_on_empty_history_is_empty() {
        let history = session(4);
        assert!(history.read_window(None).is_empty());
        assert!(history.read_window(Some(2)).is_empty());
    }

    #[test]
    fn pop_last_returns_newest_item() {
        let mut history = session(3);
        history.append(messages(0..3));
        assert_eq!(history.pop_last().as_deref(), Some("message-2"));
        assert_eq!(history.read_window(None), messages(0..2).as_slice());
    }

    #[test]
    fn pop_last_on_empty_history_is_none() {
        let mut history = session(3);
        assert_eq!(history.pop_last(), None);
    }

    #[test]
    fn clear_empties_history() {
        let mut history = session(3);
        history.append(messages(0..3));
        history.clear();
        assert!(history.read_window(None).is_empty());
        assert!(history.is_empty());
        assert_eq!(history.max_items(), 3);
    }

    #[test]
    fn appending_nothing_is_noop() {
        let mut history = session(3);
        history.append(messages(0..2));
        let before = history.clone();
        history.append(Vec::new());
        assert_eq!(history, before);
    }

    #[test]
    fn session_id_is_kept_as_label() {
        let history = session(2);
        assert_eq!(history.session_id(), "test");
    }
}
