//! Per-round candidate selection: every edge of the current graph is
//! sampled, at rate `rho`, into either the new or the old candidate list
//! of both of its endpoints. Pushing with a random priority keeps a
//! uniform subset of up to `max_candidates` distinct neighbours per
//! point.

use crate::heap::{HeapList, NONE};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Builds the flagless new/old candidate lists for one round and clears
/// the "new" flag on every graph slot that made it into a new-candidate
/// list. The flag clearing must follow the sampling: a neighbour only
/// counts as explored once it has actually been drawn for a local join.
pub fn build_candidates(
    current_graph: &mut HeapList,
    max_candidates: usize,
    rho: f64,
    rng: &mut ChaCha8Rng,
) -> (HeapList, HeapList) {
    let num_data = current_graph.nheaps();
    let num_neighbours = current_graph.nnodes();

    let mut new_candidates = HeapList::new_flagless(num_data, max_candidates, f32::INFINITY);
    let mut old_candidates = HeapList::new_flagless(num_data, max_candidates, f32::INFINITY);

    for i in 0..num_data {
        for col in 0..num_neighbours {
            let j = current_graph.indices[[i, col]];
            if j == NONE {
                continue;
            }
            if rho < 1.0 && !rng.gen_bool(rho) {
                continue;
            }

            // one priority per edge, shared by both directions
            let priority: f32 = rng.gen();

            if current_graph.flags[[i, col]] != 0 {
                new_candidates.checked_push(i, j, priority);
                new_candidates.checked_push(j as usize, i as i32, priority);
            } else {
                old_candidates.checked_push(i, j, priority);
                old_candidates.checked_push(j as usize, i as i32, priority);
            }
        }
    }

    for i in 0..num_data {
        for col in 0..num_neighbours {
            let j = current_graph.indices[[i, col]];
            if j == NONE {
                continue;
            }
            if new_candidates.contains(i, j) {
                current_graph.flags[[i, col]] = 0;
            }
        }
    }

    (new_candidates, old_candidates)
}
