use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A fixed-capacity buffer keeping the most recent elements.
///
/// Pushing onto a full buffer evicts the oldest element, so the buffer always
/// holds a sliding window of the last `capacity` items. The execution trace
/// uses this to retain the tail of a run without unbounded growth.
#[derive(Default, Serialize, Deserialize)]
pub struct RingBuffer<T> {
    capacity: usize,
    buffer: VecDeque<T>,
}

impl<T> RingBuffer<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, element: T) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(element);
    }

    /// Iterates the retained elements, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    /// The most recently pushed element, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.buffer.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_empty() {
        let ring: RingBuffer<u8> = RingBuffer::new(10);
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.capacity(), 10);
    }

    #[test]
    fn push_within_capacity() {
        let mut ring: RingBuffer<u8> = RingBuffer::new(3);

        ring.push(1);
        ring.push(2);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(ring.latest(), Some(&2));
    }

    #[test]
    fn push_over_capacity_evicts_oldest() {
        let mut ring: RingBuffer<u8> = RingBuffer::new(3);

        for v in 1..=5 {
            ring.push(v);
        }

        assert_eq!(ring.len(), 3);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn clear_empties_the_window() {
        let mut ring: RingBuffer<u8> = RingBuffer::new(2);
        ring.push(1);
        ring.push(2);

        ring.clear();

        assert!(ring.is_empty());
        assert_eq!(ring.latest(), None);
    }
}
