//! Approximate k-nearest-neighbour graph construction by neighbour-of-
//! neighbour descent, with best-first graph search for novel queries.
//!
//! The builder keeps one bounded max-heap of candidates per point and
//! repeatedly improves it: each round samples new/old candidate
//! neighbourhoods, joins every candidate pair locally, and pushes the
//! resulting edges back into the per-point heaps until the number of
//! accepted changes falls below the convergence threshold.

mod candidates;
pub mod heap;
mod knn_search;
mod updates;

pub use heap::{HeapList, NONE};
pub use knn_search::{knn_search, knn_search_batch};
pub use updates::NNUpdate;

use crate::candidates::build_candidates;
use crate::updates::{apply_updates, bucket_by_target};
use anyhow::{bail, Result};
use dao::Dao;
use itertools::Itertools;
use metrics::Metric;
use ndarray::{Array2, ArrayView2};
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[derive(Debug, Clone)]
pub struct BuildParams {
    /// Upper bound on refinement rounds.
    pub n_iters: usize,
    /// Width of the per-round candidate lists; defaults to the number of
    /// neighbours when `None`.
    pub max_candidates: Option<usize>,
    /// Early-termination threshold: stop once a round accepts fewer than
    /// `delta * k * N` graph changes.
    pub delta: f64,
    /// Per-edge sampling rate for candidate selection.
    pub rho: f64,
    /// Seed for the deterministic random number generator.
    pub seed: u64,
    /// Worker threads for the join and apply phases; 0 uses the global
    /// pool's default.
    pub n_threads: usize,
}

impl Default for BuildParams {
    fn default() -> Self {
        BuildParams {
            n_iters: 10,
            max_candidates: None,
            delta: 0.001,
            rho: 1.0,
            seed: 42,
            n_threads: 0,
        }
    }
}

/// A built k-NN graph: per point, ids and true distances of its
/// approximate nearest neighbours in ascending-distance order. Every
/// point lists itself first at distance zero.
#[derive(Serialize, Deserialize)]
pub struct NNDescent {
    pub indices: Array2<i32>,
    pub distances: Array2<f32>,
    /// Rounds actually run before convergence or the iteration cap.
    pub iterations: usize,
}

impl NNDescent {
    /// Builds the graph from a random seeding.
    pub fn build(
        dao: &Dao,
        metric: &Metric,
        num_neighbours: usize,
        params: &BuildParams,
    ) -> Result<NNDescent> {
        Self::build_inner(dao, metric, num_neighbours, params, None)
    }

    /// Builds the graph from an externally supplied seeding graph of
    /// candidate neighbour ids, one row per point ([`NONE`] entries are
    /// skipped). The seeding typically comes from a cheap coarse index;
    /// self links are added here regardless.
    pub fn build_from_seed(
        dao: &Dao,
        metric: &Metric,
        num_neighbours: usize,
        params: &BuildParams,
        seed_neighbours: ArrayView2<i32>,
    ) -> Result<NNDescent> {
        Self::build_inner(dao, metric, num_neighbours, params, Some(seed_neighbours))
    }

    fn build_inner(
        dao: &Dao,
        metric: &Metric,
        num_neighbours: usize,
        params: &BuildParams,
        seed_neighbours: Option<ArrayView2<i32>>,
    ) -> Result<NNDescent> {
        validate_build(dao, metric, num_neighbours, params, seed_neighbours)?;

        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut current_graph = match seed_neighbours {
            Some(seed) => init_from_neighbours(dao, metric, num_neighbours, seed),
            None => init_random(dao, metric, num_neighbours, &mut rng),
        };

        let iterations = run_on_pool(params.n_threads, || {
            nn_descent(&mut current_graph, dao, metric, &mut rng, num_neighbours, params)
        })?;

        current_graph.heapsort();

        let distances = current_graph.keys.mapv(|key| metric.correct(key));

        Ok(NNDescent {
            indices: current_graph.indices,
            distances,
            iterations,
        })
    }
}

fn validate_build(
    dao: &Dao,
    metric: &Metric,
    num_neighbours: usize,
    params: &BuildParams,
    seed_neighbours: Option<ArrayView2<i32>>,
) -> Result<()> {
    if num_neighbours < 1 {
        bail!("num_neighbours must be at least 1, got {num_neighbours}");
    }
    if num_neighbours >= dao.num_data {
        bail!(
            "num_neighbours must be smaller than the number of data points ({})",
            dao.num_data
        );
    }
    if !(params.delta > 0.0 && params.delta <= 1.0) {
        bail!("delta must lie in (0, 1], got {}", params.delta);
    }
    if !(params.rho > 0.0 && params.rho <= 1.0) {
        bail!("rho must lie in (0, 1], got {}", params.rho);
    }
    if params.max_candidates == Some(0) {
        bail!("max_candidates must be at least 1");
    }
    if let Some(seed) = seed_neighbours {
        if seed.nrows() != dao.num_data {
            bail!(
                "seeding graph has {} rows, data has {} points",
                seed.nrows(),
                dao.num_data
            );
        }
        if seed.iter().any(|&s| s != NONE && (s < 0 || s as usize >= dao.num_data)) {
            bail!("seeding graph contains out-of-range ids");
        }
    }
    metric.validate(dao.dim)
}

fn run_on_pool<R: Send>(n_threads: usize, op: impl FnOnce() -> R + Send) -> Result<R> {
    if n_threads == 0 {
        return Ok(op());
    }
    let pool = rayon::ThreadPoolBuilder::new().num_threads(n_threads).build()?;
    Ok(pool.install(op))
}

/// Seeds the graph with the point itself plus distinct random
/// neighbours, everything flagged new. Keys are alternative distances;
/// they stay in that space until the final correction pass.
fn init_random(dao: &Dao, metric: &Metric, num_neighbours: usize, rng: &mut ChaCha8Rng) -> HeapList {
    let num_data = dao.num_data;
    let data = dao.get_data();
    let mut current_graph = HeapList::new(num_data, num_neighbours, f32::INFINITY, 0);

    for i in 0..num_data {
        let self_key = metric.alternative(data.row(i), data.row(i));
        current_graph.checked_push_flagged(i, i as i32, self_key, 1);

        for _ in 0..num_neighbours - 1 {
            let mut j = rng.gen_range(0..num_data);
            while j == i || current_graph.contains(i, j as i32) {
                j = rng.gen_range(0..num_data);
            }
            let key = metric.alternative(data.row(i), data.row(j));
            current_graph.checked_push_flagged(i, j as i32, key, 1);
        }
    }

    current_graph
}

fn init_from_neighbours(
    dao: &Dao,
    metric: &Metric,
    num_neighbours: usize,
    seed_neighbours: ArrayView2<i32>,
) -> HeapList {
    let num_data = dao.num_data;
    let data = dao.get_data();
    let mut current_graph = HeapList::new(num_data, num_neighbours, f32::INFINITY, 0);

    for i in 0..num_data {
        let self_key = metric.alternative(data.row(i), data.row(i));
        current_graph.checked_push_flagged(i, i as i32, self_key, 1);

        for &j in seed_neighbours.row(i) {
            if j == NONE || j as usize == i {
                continue;
            }
            let key = metric.alternative(data.row(i), data.row(j as usize));
            current_graph.checked_push_flagged(i, j, key, 1);
        }
    }

    current_graph
}

/// The outer refinement loop. Returns the number of rounds run.
fn nn_descent(
    current_graph: &mut HeapList,
    dao: &Dao,
    metric: &Metric,
    rng: &mut ChaCha8Rng,
    num_neighbours: usize,
    params: &BuildParams,
) -> usize {
    let num_data = dao.num_data;
    let max_candidates = params.max_candidates.unwrap_or(num_neighbours);
    let stop_threshold = params.delta * num_neighbours as f64 * num_data as f64;

    let mut iterations = 0;
    for n in 0..params.n_iters {
        iterations = n + 1;

        let (new_candidates, old_candidates) =
            build_candidates(current_graph, max_candidates, params.rho, rng);

        let per_point = local_join(current_graph, &new_candidates, &old_candidates, dao, metric);

        let buckets = bucket_by_target(per_point, num_data);
        let count_updates = apply_updates(current_graph, buckets);

        tracing::info!(
            "iteration {}/{}: {} updates",
            n + 1,
            params.n_iters,
            count_updates
        );

        if (count_updates as f64) < stop_threshold {
            tracing::info!("stopping threshold met, exiting after {} iterations", n + 1);
            break;
        }
    }

    iterations
}

/// For every point, joins each new candidate against the later new
/// candidates and all old candidates, emitting an update whenever the
/// pair's distance would improve either endpoint's heap. Point
/// neighbourhoods are independent, so the joins run in parallel; the
/// ordered collect keeps the output deterministic.
fn local_join(
    current_graph: &HeapList,
    new_candidates: &HeapList,
    old_candidates: &HeapList,
    dao: &Dao,
    metric: &Metric,
) -> Vec<Vec<NNUpdate>> {
    let data = dao.get_data();
    let max_candidates = new_candidates.nnodes();

    (0..dao.num_data)
        .into_par_iter()
        .map(|i| {
            let mut updates = Vec::new();

            for p_col in 0..max_candidates {
                let p = new_candidates.indices[[i, p_col]];
                if p == NONE {
                    continue;
                }

                for q_col in p_col + 1..max_candidates {
                    let q = new_candidates.indices[[i, q_col]];
                    if q == NONE {
                        continue;
                    }
                    let key = metric.alternative(data.row(p as usize), data.row(q as usize));
                    if key < current_graph.max(p as usize) || key < current_graph.max(q as usize) {
                        updates.push(NNUpdate { idx0: p, idx1: q, key });
                    }
                }

                for q_col in 0..max_candidates {
                    let q = old_candidates.indices[[i, q_col]];
                    if q == NONE || q == p {
                        continue;
                    }
                    let key = metric.alternative(data.row(p as usize), data.row(q as usize));
                    if key < current_graph.max(p as usize) || key < current_graph.max(q as usize) {
                        updates.push(NNUpdate { idx0: p, idx1: q, key });
                    }
                }
            }

            updates
        })
        .collect()
}

impl Debug for NNDescent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let indices = self
            .indices
            .rows()
            .into_iter()
            .map(|row| format!("[{}]", row.iter().join(", ")))
            .join("\n");
        let distances = self
            .distances
            .rows()
            .into_iter()
            .map(|row| format!("[{}]", row.iter().join(", ")))
            .join("\n");
        write!(f, "indices:\n{indices}\n\ndistances:\n{distances}")
    }
}
