use ssort_types::{BufferedItem, Priority};

/// Holding area for matched lines awaiting the next flush.
///
/// Insertion order carries no meaning; only the flush-time sort does. The
/// backing vector is reused across flushes.
#[derive(Debug, Default)]
pub struct PriorityBuffer {
    /// Internal storage
    items: Vec<BufferedItem>,
}

impl PriorityBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer with room for `capacity` lines before reallocating
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, item: BufferedItem) {
        self.items.push(item);
    }

    /// Convenience for building an item in place
    pub fn push(&mut self, raw: String, clean: String, priority: Priority) {
        self.append(BufferedItem::new(raw, clean, priority));
    }

    /// Sort by (priority, clean) and drain the raw lines.
    ///
    /// Returns an empty vector without touching anything when the buffer is
    /// empty. The sort is stable, so exact duplicates keep arrival order.
    pub fn flush(&mut self) -> Vec<String> {
        if self.items.is_empty() {
            return Vec::new();
        }

        self.items.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.items.drain(..).map(|item| item.raw).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Buffered lines that matched no filter
    pub fn unmatched_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.priority == Priority::Unmatched)
            .count()
    }
}
