//! Tiered FIFO ready list backing queue dispatch order.
//!
//! Items are partitioned into one bucket per [`Priority`] tier. Dequeue
//! drains tiers from `VeryHigh` to `VeryLow`; within a tier insertion order
//! is preserved.

use std::collections::VecDeque;

use crate::types::Priority;

/// Anything that can be placed in a [`PriorityBucketList`].
pub trait Prioritized {
    fn priority(&self) -> Priority;
}

#[derive(Debug)]
pub struct PriorityBucketList<T> {
    buckets: [VecDeque<T>; 5],
    len: usize,
}

impl<T: Prioritized> PriorityBucketList<T> {
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| VecDeque::new()),
            len: 0,
        }
    }

    /// Append to the bucket for the item's current priority.
    ///
    /// The priority is sampled once here; later changes do not move the item.
    pub fn insert(&mut self, item: T) {
        let tier = item.priority().tier();
        self.buckets[tier].push_back(item);
        self.len += 1;
    }

    /// Remove an item from whichever bucket holds it.
    pub fn remove(&mut self, item: &T) -> bool
    where
        T: PartialEq,
    {
        for bucket in &mut self.buckets {
            if let Some(pos) = bucket.iter().position(|x| x == item) {
                bucket.remove(pos);
                self.len -= 1;
                return true;
            }
        }
        false
    }

    /// Pop the oldest item of the highest non-empty tier.
    pub fn dequeue_highest_priority(&mut self) -> Option<T> {
        let item = self.buckets.iter_mut().find_map(VecDeque::pop_front)?;
        self.len -= 1;
        Some(item)
    }

    /// Take the first item, in dispatch order, for which `pred` holds.
    pub fn dequeue_first_matching<F>(&mut self, mut pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        for bucket in &mut self.buckets {
            if let Some(pos) = bucket.iter().position(&mut pred) {
                self.len -= 1;
                return bucket.remove(pos);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of items queued in one tier.
    pub fn len_for(&self, priority: Priority) -> usize {
        self.buckets[priority.tier()].len()
    }

    /// Iterate in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buckets.iter().flat_map(|b| b.iter())
    }
}

impl<T: Prioritized> Default for PriorityBucketList<T> {
    fn default() -> Self {
        Self::new()
    }
}
