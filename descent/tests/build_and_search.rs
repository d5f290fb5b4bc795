//! End-to-end build and search scenarios checked against brute-force
//! ground truth.

use dao::Dao;
use descent::{knn_search_batch, BuildParams, NNDescent};
use metrics::Metric;
use ndarray::{array, s, Array2};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use utils::arg_sort_2d;

fn normal_data(num_data: usize, dim: usize, seed: u64) -> Array2<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array2::from_shape_fn((num_data, dim), |_| StandardNormal.sample(&mut rng))
}

fn brute_force_knn(data: &Array2<f32>, metric: &Metric, num_neighbours: usize) -> Vec<Vec<usize>> {
    let dists = (0..data.nrows())
        .map(|i| {
            (0..data.nrows())
                .map(|j| metric.distance(data.row(i), data.row(j)))
                .collect()
        })
        .collect::<Vec<Vec<f32>>>();
    let (ords, _) = arg_sort_2d(dists);
    ords.into_iter()
        .map(|row| row.into_iter().take(num_neighbours).collect())
        .collect()
}

fn recall(exact: &[Vec<usize>], indices: &Array2<i32>) -> f64 {
    let mut hits = 0;
    for (i, row) in exact.iter().enumerate() {
        for &j in row {
            if indices.row(i).iter().any(|&x| x == j as i32) {
                hits += 1;
            }
        }
    }
    hits as f64 / (exact.len() * indices.ncols()) as f64
}

fn assert_self_inclusion(graph: &NNDescent) {
    for i in 0..graph.indices.nrows() {
        assert_eq!(graph.indices[[i, 0]], i as i32, "row {i} does not list itself first");
        assert_eq!(graph.distances[[i, 0]], 0.0, "row {i} self distance is not zero");
    }
}

#[test]
fn tiny_build_on_the_unit_square() {
    let data = array![[0.0f32, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let dao = Dao::new(data).unwrap();

    // seed with a single 4-cycle of side edges
    let seed_neighbours = array![[1], [3], [0], [2]];
    let params = BuildParams {
        max_candidates: Some(3),
        ..Default::default()
    };
    let graph = NNDescent::build_from_seed(
        &dao,
        &Metric::Euclidean,
        2,
        &params,
        seed_neighbours.view(),
    )
    .unwrap();

    assert_self_inclusion(&graph);

    // each corner's nearest non-self neighbour is either adjacent corner
    let valid: [&[i32]; 4] = [&[1, 2], &[0, 3], &[0, 3], &[1, 2]];
    for i in 0..4 {
        let second = graph.indices[[i, 1]];
        assert!(
            valid[i].contains(&second),
            "row {i} has unexpected neighbour {second}"
        );
        assert!((graph.distances[[i, 1]] - 1.0).abs() < 1e-6);
    }
}

#[test]
fn converges_early_with_high_recall() {
    let data = normal_data(256, 4, 5);
    let dao = Dao::from_view(data.view()).unwrap();
    let params = BuildParams {
        n_iters: 20,
        ..Default::default()
    };

    let graph = NNDescent::build(&dao, &Metric::Euclidean, 10, &params).unwrap();

    assert!(
        graph.iterations <= 12,
        "expected early termination, ran {} rounds",
        graph.iterations
    );

    let exact = brute_force_knn(&data, &Metric::Euclidean, 10);
    let achieved = recall(&exact, &graph.indices);
    assert!(achieved >= 0.99, "recall {achieved} below 0.99");
}

#[test]
fn recall_on_normal_data() {
    let data = normal_data(1000, 8, 6);
    let dao = Dao::from_view(data.view()).unwrap();
    let params = BuildParams {
        n_iters: 15,
        ..Default::default()
    };

    let graph = NNDescent::build(&dao, &Metric::Euclidean, 10, &params).unwrap();

    assert_self_inclusion(&graph);

    let exact = brute_force_knn(&data, &Metric::Euclidean, 10);
    let achieved = recall(&exact, &graph.indices);
    assert!(achieved >= 0.95, "recall {achieved} below 0.95");
}

#[test]
fn cosine_build_keeps_self_inclusion_for_a_zero_row() {
    let mut data = normal_data(50, 4, 21);
    data.row_mut(0).fill(0.0);
    let dao = Dao::from_view(data.view()).unwrap();

    let graph = NNDescent::build(&dao, &Metric::Cosine, 5, &BuildParams::default()).unwrap();

    // the zero row is at distance one from everything else, but still
    // lists itself first at distance zero
    assert_self_inclusion(&graph);
}

#[test]
fn identical_seeds_build_identical_graphs() {
    let data = normal_data(300, 4, 7);
    let dao = Dao::from_view(data.view()).unwrap();
    let params = BuildParams {
        seed: 1001,
        ..Default::default()
    };

    let first = NNDescent::build(&dao, &Metric::Euclidean, 8, &params).unwrap();
    let second = NNDescent::build(&dao, &Metric::Euclidean, 8, &params).unwrap();

    assert_eq!(first.indices, second.indices);
    assert_eq!(first.distances, second.distances);

    // thread count does not change the result either
    let single_threaded = BuildParams {
        n_threads: 1,
        ..params
    };
    let third = NNDescent::build(&dao, &Metric::Euclidean, 8, &single_threaded).unwrap();
    assert_eq!(first.indices, third.indices);
    assert_eq!(first.distances, third.distances);
}

#[test]
fn querying_a_dataset_point_returns_it_first() {
    let data = normal_data(300, 6, 8);
    let dao = Dao::from_view(data.view()).unwrap();

    let graph = NNDescent::build(&dao, &Metric::Euclidean, 10, &BuildParams::default()).unwrap();

    let queries = data.slice(s![0..20, ..]);
    let (indices, distances) =
        knn_search_batch(&graph, &dao, queries, &Metric::Euclidean, 5, 0.2, 17).unwrap();

    for q in 0..20 {
        assert_eq!(indices[[q, 0]], q as i32, "query {q} did not find itself");
        assert_eq!(distances[[q, 0]], 0.0);
    }
}

#[test]
fn graphs_serialize_round_trip() {
    let data = normal_data(64, 4, 11);
    let dao = Dao::from_view(data.view()).unwrap();
    let graph = NNDescent::build(&dao, &Metric::Euclidean, 5, &BuildParams::default()).unwrap();

    let bytes = bincode::serialize(&graph).unwrap();
    let reloaded: NNDescent = bincode::deserialize(&bytes).unwrap();

    assert_eq!(graph.indices, reloaded.indices);
    assert_eq!(graph.distances, reloaded.distances);
    assert_eq!(graph.iterations, reloaded.iterations);
}

#[test]
fn invalid_arguments_are_rejected_up_front() {
    let data = normal_data(10, 4, 12);
    let dao = Dao::from_view(data.view()).unwrap();
    let metric = Metric::Euclidean;

    assert!(NNDescent::build(&dao, &metric, 0, &BuildParams::default()).is_err());
    assert!(NNDescent::build(&dao, &metric, 10, &BuildParams::default()).is_err());

    let bad_rho = BuildParams {
        rho: 0.0,
        ..Default::default()
    };
    assert!(NNDescent::build(&dao, &metric, 3, &bad_rho).is_err());

    let bad_delta = BuildParams {
        delta: 2.0,
        ..Default::default()
    };
    assert!(NNDescent::build(&dao, &metric, 3, &bad_delta).is_err());

    assert!(NNDescent::build(&dao, &Metric::Minkowski(-1.0), 3, &BuildParams::default()).is_err());

    let variances = ndarray::Array1::from_elem(3, 1.0f32);
    assert!(NNDescent::build(
        &dao,
        &Metric::StandardisedEuclidean(variances),
        3,
        &BuildParams::default()
    )
    .is_err());

    let graph = NNDescent::build(&dao, &metric, 3, &BuildParams::default()).unwrap();
    let narrow = normal_data(4, 3, 13);
    assert!(knn_search_batch(&graph, &dao, narrow.view(), &metric, 3, 0.1, 1).is_err());
    let queries = normal_data(4, 4, 14);
    assert!(knn_search_batch(&graph, &dao, queries.view(), &metric, 3, -0.5, 1).is_err());
    assert!(knn_search_batch(&graph, &dao, queries.view(), &metric, 11, 0.1, 1).is_err());
}
