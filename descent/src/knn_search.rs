//! Best-first traversal of a built graph for novel queries. A bounded
//! max-heap keeps the k best results, a min-ordered frontier drives the
//! exploration and `epsilon` widens the stop bound to trade work for
//! recall.

use crate::heap::{HeapList, NONE};
use crate::NNDescent;
use anyhow::{bail, Result};
use dao::Dao;
use fixedbitset::FixedBitSet;
use metrics::Metric;
use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use utils::non_nan::NonNan;
use utils::pair::Pair;

/// Searches the graph for the `num_neighbours` approximate nearest
/// neighbours of `query`, starting from `seeds`. Returns ascending
/// (ids, distances); unreached slots hold [`NONE`] and +inf.
pub fn knn_search(
    graph: &NNDescent,
    dao: &Dao,
    query: ArrayView1<f32>,
    metric: &Metric,
    num_neighbours: usize,
    epsilon: f32,
    seeds: &[usize],
) -> (Vec<i32>, Vec<f32>) {
    let data = dao.get_data();

    let mut results = HeapList::new_flagless(1, num_neighbours, f32::INFINITY);
    let mut frontier: BinaryHeap<Reverse<Pair>> = BinaryHeap::new(); // smallest distance first
    let mut visited = FixedBitSet::with_capacity(dao.num_data);

    for &seed in seeds {
        if visited.contains(seed) {
            continue;
        }
        visited.insert(seed);
        let key = metric.alternative(query, data.row(seed));
        results.checked_push(0, seed as i32, key);
        frontier.push(Reverse(Pair::new(NonNan::new(key), seed)));
    }

    while let Some(Reverse(nearest)) = frontier.pop() {
        if nearest.distance.as_f32() > (1.0 + epsilon) * results.max(0) {
            break;
        }
        for &j in graph.indices.row(nearest.index) {
            if j == NONE {
                continue;
            }
            let j = j as usize;
            if visited.contains(j) {
                continue;
            }
            visited.insert(j);
            let key = metric.alternative(query, data.row(j));
            if key < results.max(0) {
                results.checked_push(0, j as i32, key);
                frontier.push(Reverse(Pair::new(NonNan::new(key), j)));
            }
        }
    }

    results.heapsort();
    let indices = results.indices.row(0).to_vec();
    let distances = results
        .keys
        .row(0)
        .iter()
        .map(|&key| metric.correct(key))
        .collect();
    (indices, distances)
}

/// Queries every row of `queries` against the graph, deriving a
/// deterministic random seed set per query. Returns ids and distances
/// in ascending-distance order, one row per query.
pub fn knn_search_batch(
    graph: &NNDescent,
    dao: &Dao,
    queries: ArrayView2<f32>,
    metric: &Metric,
    num_neighbours: usize,
    epsilon: f32,
    seed: u64,
) -> Result<(Array2<i32>, Array2<f32>)> {
    if num_neighbours < 1 || num_neighbours > dao.num_data {
        bail!(
            "num_neighbours must be in 1..={}, got {num_neighbours}",
            dao.num_data
        );
    }
    if queries.ncols() != dao.dim {
        bail!(
            "queries have dimension {}, data has dimension {}",
            queries.ncols(),
            dao.dim
        );
    }
    if epsilon < 0.0 {
        bail!("epsilon must be non-negative, got {epsilon}");
    }
    metric.validate(dao.dim)?;

    let num_queries = queries.nrows();
    let num_seeds = num_neighbours.max(10).min(dao.num_data);

    let mut indices = Array2::from_elem((num_queries, num_neighbours), NONE);
    let mut distances = Array2::from_elem((num_queries, num_neighbours), f32::INFINITY);

    indices
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(distances.axis_iter_mut(Axis(0)).into_par_iter())
        .zip(queries.axis_iter(Axis(0)).into_par_iter())
        .enumerate()
        .for_each(|(q, ((mut indices_row, mut distances_row), query))| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(q as u64));
            let seeds: Vec<usize> = (0..num_seeds)
                .map(|_| rng.gen_range(0..dao.num_data))
                .collect();

            let (ids, dists) = knn_search(graph, dao, query, metric, num_neighbours, epsilon, &seeds);
            for col in 0..num_neighbours {
                indices_row[col] = ids[col];
                distances_row[col] = dists[col];
            }
        });

    Ok((indices, distances))
}
