//! Fixed-capacity history buffering shared by both protocol directions.
//!
//! The owner keeps its unacknowledged inputs in one of these; observers keep
//! their snapshot history in another. Overflow silently overwrites the
//! oldest entry: this is rate-limiting memory, not a queue with
//! backpressure, and losing the oldest entry is always acceptable.

/// A fixed-capacity ring buffer ordered oldest to newest.
///
/// Capacity is set at construction and never changes. Pushing into a full
/// buffer overwrites the oldest element. Logical index 0 is always the
/// oldest retained element. Not thread-safe; each instance has exactly one
/// owner context.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    slots: Box<[Option<T>]>,
    start: usize,
    len: usize,
}

impl<T> HistoryBuffer<T> {
    /// Creates a buffer holding at most `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "HistoryBuffer capacity must be positive");

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            slots: slots.into_boxed_slice(),
            start: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slot(&self, index: usize) -> usize {
        (self.start + index) % self.slots.len()
    }

    /// Appends an element. When full, the oldest element is overwritten and
    /// the logical start advances; this never fails.
    pub fn push(&mut self, item: T) {
        if self.len == self.slots.len() {
            self.slots[self.start] = Some(item);
            self.start = (self.start + 1) % self.slots.len();
        } else {
            let slot = self.slot(self.len);
            self.slots[slot] = Some(item);
            self.len += 1;
        }
    }

    /// Returns the element at logical age `index` (0 = oldest), or `None`
    /// if out of range.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        self.slots[self.slot(index)].as_ref()
    }

    /// Returns the oldest element without removing it.
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns the newest element without removing it.
    pub fn back(&self) -> Option<&T> {
        if self.len == 0 {
            None
        } else {
            self.get(self.len - 1)
        }
    }

    /// Removes and returns the oldest element.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        let item = self.slots[self.start].take();
        self.start = (self.start + 1) % self.slots.len();
        self.len -= 1;
        item
    }

    /// Evicts the contiguous prefix of elements satisfying `predicate`,
    /// stopping at the first element for which it is false. Returns how
    /// many were removed.
    ///
    /// The predicate is only ever evaluated on the current oldest element,
    /// so this assumes a monotonic (true-then-false) predicate over the
    /// ordered sequence; it is not a full filter.
    pub fn remove_front_while<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = 0;
        while let Some(front) = self.front() {
            if !predicate(front) {
                break;
            }
            self.pop_front();
            removed += 1;
        }
        removed
    }

    /// Resets to empty without deallocating storage.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.start = 0;
        self.len = 0;
    }

    /// Iterates the retained elements from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).filter_map(move |i| self.get(i))
    }
}

impl<T> std::ops::Index<usize> for HistoryBuffer<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `index` is outside `[0, len)`.
    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(item) => item,
            None => panic!(
                "HistoryBuffer index {} out of range (len {})",
                index, self.len
            ),
        }
    }
}
