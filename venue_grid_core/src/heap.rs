//! Array-backed binary min-heap used as the A* open-set accelerator.
//!
//! Entries are ordered by an `f64` priority. There is no decrease-key: a
//! caller that finds a cheaper route pushes a second entry and discards the
//! stale one when it surfaces.

#[derive(Debug, Clone, PartialEq)]
struct HeapEntry<T> {
    priority: f64,
    item: T,
}

/// A binary min-heap keyed by `f64` priority.
///
/// Ties are broken by heap shape only; no ordering between equal priorities
/// is guaranteed.
#[derive(Debug, Clone)]
pub struct MinHeap<T> {
    entries: Vec<HeapEntry<T>>,
}

impl<T> Default for MinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MinHeap<T> {
    pub fn new() -> Self {
        MinHeap {
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        MinHeap {
            entries: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends `item` and sifts it up to its place.
    pub fn push(&mut self, item: T, priority: f64) {
        self.entries.push(HeapEntry { priority, item });
        self.sift_up(self.entries.len() - 1);
    }

    /// Removes and returns the entry with the smallest priority.
    pub fn pop(&mut self) -> Option<(T, f64)> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.entries.swap(0, last);
        let HeapEntry { priority, item } = self.entries.pop()?;
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some((item, priority))
    }

    /// The entry `pop` would return next, without removing it.
    pub fn peek(&self) -> Option<(&T, f64)> {
        self.entries.first().map(|entry| (&entry.item, entry.priority))
    }

    /// Drops every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.entries[index].priority >= self.entries[parent].priority {
                break;
            }
            self.entries.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < len && self.entries[left].priority < self.entries[smallest].priority {
                smallest = left;
            }
            if right < len && self.entries[right].priority < self.entries[smallest].priority {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.entries.swap(index, smallest);
            index = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_priority_order() {
        let mut heap = MinHeap::new();
        for (item, priority) in [('e', 5.0), ('a', 1.0), ('d', 4.0), ('b', 2.0), ('c', 3.0)] {
            heap.push(item, priority);
        }
        assert_eq!(heap.peek(), Some((&'a', 1.0)));

        let order: Vec<char> = std::iter::from_fn(|| heap.pop().map(|(item, _)| item)).collect();
        assert_eq!(order, vec!['a', 'b', 'c', 'd', 'e']);
        assert!(heap.is_empty());
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn interleaved_push_pop() {
        let mut heap = MinHeap::with_capacity(8);
        heap.push(10, 10.0);
        heap.push(3, 3.0);
        assert_eq!(heap.pop(), Some((3, 3.0)));
        heap.push(1, 1.0);
        heap.push(7, 7.0);
        assert_eq!(heap.len(), 3);
        assert_eq!(heap.pop(), Some((1, 1.0)));
        assert_eq!(heap.pop(), Some((7, 7.0)));
        assert_eq!(heap.pop(), Some((10, 10.0)));
    }

    #[test]
    fn fractional_priorities_and_duplicates() {
        let mut heap = MinHeap::new();
        heap.push("diag", std::f64::consts::SQRT_2);
        heap.push("ortho", 1.0);
        heap.push("ortho-again", 1.0);
        heap.push("door", 2.0);

        let (first, _) = heap.pop().unwrap();
        let (second, _) = heap.pop().unwrap();
        assert!(first.starts_with("ortho") && second.starts_with("ortho"));
        assert_eq!(heap.pop().map(|(item, _)| item), Some("diag"));
        assert_eq!(heap.pop().map(|(item, _)| item), Some("door"));
    }

    #[test]
    fn clear_resets() {
        let mut heap = MinHeap::new();
        heap.push((), 1.0);
        heap.push((), 2.0);
        heap.clear();
        assert!(heap.is_empty());
        assert!(heap.peek().is_none());
    }
}
