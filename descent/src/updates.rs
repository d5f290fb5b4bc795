//! Update records produced by the local join and the two-phase apply:
//! join results are collected in point order, bucketed per target heap,
//! then pushed row-parallel. Rows are disjoint during the apply, so no
//! locking is needed, and the fixed bucket order keeps builds
//! reproducible for a fixed seed whatever the thread count.

use crate::heap::{checked_flagged_heap_push, HeapList};
use ndarray::parallel::prelude::*;
use ndarray::Axis;
use rayon::prelude::*;

/// A candidate edge between two points with its cached distance.
#[derive(Clone, Copy, Debug)]
pub struct NNUpdate {
    pub idx0: i32,
    pub idx1: i32,
    pub key: f32,
}

/// Regroups join output into one bucket per target heap, emitting each
/// edge in both directions.
pub fn bucket_by_target(per_point: Vec<Vec<NNUpdate>>, num_data: usize) -> Vec<Vec<(i32, f32)>> {
    let mut buckets: Vec<Vec<(i32, f32)>> = vec![Vec::new(); num_data];
    for updates in per_point {
        for NNUpdate { idx0, idx1, key } in updates {
            buckets[idx0 as usize].push((idx1, key));
            buckets[idx1 as usize].push((idx0, key));
        }
    }
    buckets
}

/// Pushes every bucketed update into its target heap, flagged new, and
/// returns the number of slots that actually changed.
pub fn apply_updates(current_graph: &mut HeapList, buckets: Vec<Vec<(i32, f32)>>) -> usize {
    current_graph
        .indices
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(current_graph.keys.axis_iter_mut(Axis(0)).into_par_iter())
        .zip(current_graph.flags.axis_iter_mut(Axis(0)).into_par_iter())
        .zip(buckets.into_par_iter())
        .map(|(((mut indices_row, mut keys_row), mut flags_row), bucket)| {
            bucket
                .into_iter()
                .map(|(idx, key)| {
                    checked_flagged_heap_push(&mut indices_row, &mut keys_row, &mut flags_row, idx, key, 1)
                })
                .sum::<usize>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::NONE;

    #[test]
    fn buckets_hold_both_directions() {
        let per_point = vec![
            vec![NNUpdate { idx0: 0, idx1: 2, key: 0.5 }],
            vec![NNUpdate { idx0: 1, idx1: 0, key: 0.3 }],
        ];

        let buckets = bucket_by_target(per_point, 3);

        assert_eq!(buckets[0], vec![(2, 0.5), (1, 0.3)]);
        assert_eq!(buckets[1], vec![(0, 0.3)]);
        assert_eq!(buckets[2], vec![(0, 0.5)]);
    }

    #[test]
    fn apply_counts_only_accepted_pushes() {
        let mut graph = HeapList::new(3, 2, f32::INFINITY, 0);
        graph.checked_push_flagged(0, 1, 0.9, 0);

        let buckets = vec![
            vec![(2, 0.5), (2, 0.4), (1, 0.1)], // second and third carry already-present ids
            vec![(0, 0.2)],
            vec![],
        ];

        let changed = apply_updates(&mut graph, buckets);

        assert_eq!(changed, 2);
        assert!(graph.contains(0, 2));
        assert!(graph.contains(1, 0));
        assert_eq!(graph.indices[[1, 1]], 0);
        assert_eq!(graph.flags[[1, 1]], 1);
        assert_eq!(graph.indices[[2, 0]], NONE);
    }
}
