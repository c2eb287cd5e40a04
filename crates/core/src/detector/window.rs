use std::collections::VecDeque;

/// Fixed-capacity buffer of the most recent readings, newest first.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    values: VecDeque<i64>,
    capacity: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds a reading at the front, evicting the oldest when full.
    pub fn push(&mut self, value: i64) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_back();
        }
        self.values.push_front(value);
    }

    /// Reading `age` steps back; 0 is the newest.
    pub fn get(&self, age: usize) -> Option<i64> {
        self.values.get(age).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn min(&self) -> Option<i64> {
        self.values.iter().copied().min()
    }

    pub fn max(&self) -> Option<i64> {
        self.values.iter().copied().max()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
