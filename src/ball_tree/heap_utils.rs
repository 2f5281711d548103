//! This module contains utility structures for managing k-best elements using a binary heap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use ordered_float::OrderedFloat; // For using f64 in BinaryHeap

/// Represents an element in the KBestNeighbors heap, pairing a squared distance with data.
///
/// Elements order by distance first and by `data` second, so equal distances still have a
/// well-defined winner.
#[derive(Debug)]
pub struct HeapElement<P> {
    pub distance: OrderedFloat<f64>,
    pub data: P,
}

impl<P: Ord> PartialEq for HeapElement<P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl<P: Ord> Eq for HeapElement<P> {}

impl<P: Ord> PartialOrd for HeapElement<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: Ord> Ord for HeapElement<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: the worst of the k kept elements sits on top.
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.data.cmp(&other.data))
    }
}

/// Upper bound on the space reserved up front; the heap grows past it on demand.
const MAX_PREALLOCATED: usize = 1024;

/// Manages a collection of the K "best" (smallest distance) items seen so far.
#[derive(Debug)]
pub struct KBestNeighbors<P> {
    capacity: usize,
    heap: BinaryHeap<HeapElement<P>>,
}

impl<P: Ord> KBestNeighbors<P> {
    pub fn new(capacity: usize) -> Self {
        KBestNeighbors {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.min(MAX_PREALLOCATED)),
        }
    }

    pub fn add(&mut self, distance: f64, data: P) {
        if self.capacity == 0 {
            return;
        }
        let item = HeapElement { distance: OrderedFloat(distance), data };
        if self.heap.len() < self.capacity {
            self.heap.push(item);
        } else if let Some(mut top) = self.heap.peek_mut() {
            if item < *top {
                // Replacing through PeekMut sifts the new element down when `top` drops.
                *top = item;
            }
        }
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() == self.capacity
    }

    pub fn current_farthest_distance(&self) -> Option<f64> {
        if self.is_full() {
            self.heap.peek().map(|heap_elem| heap_elem.distance.0)
        } else {
            None // Not full yet, effectively infinite radius for pruning
        }
    }

    /// Returns the current number of neighbors stored.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Consumes the collection, closest first.
    pub fn into_sorted_vec(self) -> Vec<HeapElement<P>> {
        self.heap.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distances(best: KBestNeighbors<u32>) -> Vec<(f64, u32)> {
        best.into_sorted_vec()
            .into_iter()
            .map(|e| (e.distance.0, e.data))
            .collect()
    }

    #[test]
    fn test_keeps_k_smallest() {
        let mut best = KBestNeighbors::new(3);
        for (d, id) in [(5.0, 1), (1.0, 2), (4.0, 3), (2.0, 4), (3.0, 5), (9.0, 6)] {
            best.add(d, id);
        }
        assert_eq!(best.len(), 3);
        assert_eq!(distances(best), vec![(1.0, 2), (2.0, 4), (3.0, 5)]);
    }

    #[test]
    fn test_zero_capacity_stays_empty() {
        let mut best = KBestNeighbors::new(0);
        best.add(1.0, 1u32);
        assert!(best.is_empty());
        assert_eq!(best.current_farthest_distance(), None);
    }

    #[test]
    fn test_unbounded_capacity_does_not_reserve() {
        let mut best = KBestNeighbors::new(usize::MAX);
        for id in 0..5u32 {
            best.add(f64::from(id), id);
        }
        assert!(!best.is_full());
        assert_eq!(best.len(), 5);
        assert_eq!(best.current_farthest_distance(), None);
    }

    #[test]
    fn test_farthest_only_reported_when_full() {
        let mut best = KBestNeighbors::new(2);
        best.add(4.0, 1u32);
        assert_eq!(best.current_farthest_distance(), None);
        best.add(1.0, 2);
        assert_eq!(best.current_farthest_distance(), Some(4.0));
        best.add(2.0, 3);
        assert_eq!(best.current_farthest_distance(), Some(2.0));
    }

    #[test]
    fn test_ties_resolved_by_data_regardless_of_order() {
        let mut forward = KBestNeighbors::new(2);
        let mut backward = KBestNeighbors::new(2);
        for id in 0..6u32 {
            forward.add(1.0, id);
            backward.add(1.0, 5 - id);
        }
        assert_eq!(distances(forward), vec![(1.0, 0), (1.0, 1)]);
        assert_eq!(distances(backward), vec![(1.0, 0), (1.0, 1)]);
    }
}
