// Fixed-capacity rolling history
use std::collections::VecDeque;

/// Rolling buffer that keeps the most recent `capacity` values in insertion order.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest one when full.
    pub fn push(&mut self, value: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(value);
    }

    /// Owned copy of the contents, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    /// Replace the contents with `count` copies of `fill` (clamped to capacity).
    pub fn reset(&mut self, fill: T, count: usize) {
        self.items.clear();
        self.items
            .extend(std::iter::repeat(fill).take(count.min(self.capacity)));
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_last_n_in_fifo_order() {
        let mut buffer = RingBuffer::new(60);
        for i in 0..250 {
            buffer.push(i);
        }

        let expected: Vec<i32> = (190..250).collect();
        assert_eq!(buffer.snapshot(), expected);
    }

    #[test]
    fn test_partial_fill_preserves_order() {
        let mut buffer = RingBuffer::new(4);
        buffer.push(1.0);
        buffer.push(2.0);
        assert_eq!(buffer.snapshot(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_snapshot_does_not_alias_storage() {
        let mut buffer = RingBuffer::new(3);
        buffer.push(1);
        let mut snapshot = buffer.snapshot();
        snapshot.push(99);
        assert_eq!(buffer.snapshot(), vec![1]);
    }

    #[test]
    fn test_reset_fills_and_clamps_to_capacity() {
        let mut buffer = RingBuffer::new(5);
        buffer.push(7);
        buffer.reset(3, 100);
        assert_eq!(buffer.snapshot(), vec![3; 5]);

        buffer.reset(4, 2);
        assert_eq!(buffer.snapshot(), vec![4, 4]);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut buffer = RingBuffer::new(0);
        buffer.push('a');
        buffer.push('b');
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.snapshot(), vec!['b']);
    }
}
