use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::condition::Candidate;

pub type Rank = fn(&Candidate) -> f64;

#[derive(Debug)]
struct Entry {
    score: f64,
    key: String,
    candidate: Arc<Candidate>,
}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.key.cmp(&other.key))
    }
}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Entry {}

/// Keeps the `capacity` best candidates seen so far as a min-heap, so the
/// weakest retained candidate is always the one compared against.
#[derive(Debug)]
pub struct TopK {
    capacity: usize,
    rank: Rank,
    heap: BinaryHeap<Reverse<Entry>>,
}
impl TopK {
    pub fn new(capacity: usize) -> Self {
        Self::by(capacity, Candidate::score)
    }
    pub fn by(capacity: usize, rank: Rank) -> Self {
        Self {
            capacity,
            rank,
            heap: BinaryHeap::with_capacity(capacity + 1),
        }
    }
    /// Returns whether the candidate was kept.
    pub fn offer(&mut self, candidate: Arc<Candidate>) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let score = (self.rank)(&candidate);
        if self.heap.len() < self.capacity {
            self.push(score, candidate);
            return true;
        }
        match self.heap.peek() {
            Some(Reverse(min)) if score > min.score => {
                self.heap.pop();
                self.push(score, candidate);
                true
            }
            _ => false,
        }
    }
    fn push(&mut self, score: f64, candidate: Arc<Candidate>) {
        let key = candidate.key();
        self.heap.push(Reverse(Entry { score, key, candidate }));
    }
    pub fn len(&self) -> usize {
        self.heap.len()
    }
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
    pub fn min_score(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(e)| e.score)
    }
    /// Drains the store, best first.
    pub fn into_sorted_vec(self) -> Vec<Arc<Candidate>> {
        // ascending order of Reverse<Entry> is descending order of Entry
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(e)| e.candidate)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(correlation: f64) -> Arc<Candidate> {
        Arc::new(Candidate::root(0.0, 10).scored(correlation, 10, 0.0))
    }

    #[test]
    fn keeps_only_the_best() {
        let mut top = TopK::new(3);
        for c in [0.1, 0.5, 0.3, 0.9, 0.2, 0.7] {
            top.offer(candidate(c));
            assert!(top.len() <= 3);
        }
        let scores: Vec<f64> = top.into_sorted_vec().iter().map(|c| c.score()).collect();
        assert_eq!(scores, vec![0.9, 0.7, 0.5]);
    }

    #[test]
    fn equal_score_does_not_evict() {
        let mut top = TopK::new(1);
        assert!(top.offer(candidate(0.4)));
        assert!(!top.offer(candidate(0.4)));
        assert!(!top.offer(candidate(-0.3)));
        assert!(top.offer(candidate(-0.5)));
        assert_eq!(top.min_score(), Some(0.5));
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut top = TopK::new(0);
        assert!(!top.offer(candidate(1.0)));
        assert!(top.is_empty());
    }
}
