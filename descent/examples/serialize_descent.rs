//! Round-trips a built graph through bincode on disk.

use anyhow::Result;
use dao::Dao;
use descent::{BuildParams, NNDescent};
use metrics::Metric;
use ndarray::Array2;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use std::fs::File;
use std::io::{BufReader, BufWriter};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut rng = ChaCha8Rng::seed_from_u64(77);
    let data: Array2<f32> = Array2::from_shape_fn((500, 8), |_| StandardNormal.sample(&mut rng));
    let dao = Dao::new(data)?;

    let graph = NNDescent::build(&dao, &Metric::Euclidean, 10, &BuildParams::default())?;

    let path = std::env::temp_dir().join("descent_graph.bin");
    bincode::serialize_into(BufWriter::new(File::create(&path)?), &graph)?;
    let reloaded: NNDescent = bincode::deserialize_from(BufReader::new(File::open(&path)?))?;

    assert_eq!(graph.indices, reloaded.indices);
    assert_eq!(graph.distances, reloaded.distances);

    println!(
        "wrote and reloaded a {} x {} graph via {}",
        reloaded.indices.nrows(),
        reloaded.indices.ncols(),
        path.display()
    );
    Ok(())
}
