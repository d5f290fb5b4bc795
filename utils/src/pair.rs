use crate::non_nan::NonNan;
use std::cmp::Ordering;

/// An (index, distance) element for the priority queues used during search.
/// Ordering is by distance alone; equality is by index.
pub struct Pair {
    pub distance: NonNan,
    pub index: usize,
}

impl Pair {
    pub fn new(distance: NonNan, index: usize) -> Pair {
        Pair { distance, index }
    }
}

impl Eq for Pair { // Marker Trait
}

impl PartialEq for Pair {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl PartialOrd for Pair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.distance.partial_cmp(&other.distance)
    }
}

impl Ord for Pair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap()
    }
}
