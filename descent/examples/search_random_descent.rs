//! Builds a graph over random data, then batch-queries held-out points
//! and reports recall against brute force.

use anyhow::Result;
use dao::Dao;
use descent::{knn_search_batch, BuildParams, NNDescent};
use metrics::Metric;
use ndarray::{s, Array2};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use utils::arg_sort;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let num_data = 2000;
    let num_queries = 100;
    let dim = 16;
    let num_neighbours = 10;
    let metric = Metric::Euclidean;

    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    let embeddings: Array2<f32> =
        Array2::from_shape_fn((num_data + num_queries, dim), |_| StandardNormal.sample(&mut rng));
    let data = embeddings.slice(s![0..num_data, ..]);
    let queries = embeddings.slice(s![num_data.., ..]);

    let dao = Dao::from_view(data)?;

    tracing::info!("building over {} points in {} dimensions...", dao.num_data, dao.dim);
    let graph = NNDescent::build(&dao, &metric, num_neighbours, &BuildParams::default())?;
    tracing::info!("done after {} iterations", graph.iterations);

    let (indices, _distances) =
        knn_search_batch(&graph, &dao, queries, &metric, num_neighbours, 0.1, 99)?;

    // brute-force ground truth for the queries
    let mut hits = 0;
    for q in 0..num_queries {
        let dists = (0..num_data)
            .map(|j| metric.distance(queries.row(q), data.row(j)))
            .collect::<Vec<f32>>();
        let (exact, _) = arg_sort(dists);
        for &j in exact.iter().take(num_neighbours) {
            if indices.row(q).iter().any(|&x| x == j as i32) {
                hits += 1;
            }
        }
    }
    let recall = hits as f64 / (num_queries * num_neighbours) as f64;

    println!("query recall: {recall}");
    Ok(())
}
