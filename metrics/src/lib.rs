//! Pointwise distance functions over pairs of equal-length row views,
//! plus the [`Metric`] dispatch table binding each distance to its
//! ordering-preserving alternative and the monotone correction applied
//! at output time.
//!
//! These run on the hottest loops of graph construction; degenerate
//! inputs (all-zero vectors, zero denominators) return defined sentinel
//! values rather than NaN.

use anyhow::{bail, Result};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

pub fn squared_euclidean(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    x.iter().zip(y.iter()).map(|(a, b)| (a - b) * (a - b)).sum()
}

pub fn euclidean(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    squared_euclidean(x, y).sqrt()
}

/// Euclidean distance standardised against a vector of per-coordinate
/// variances; every `v` entry must be positive.
pub fn standardised_euclidean(x: ArrayView1<f32>, y: ArrayView1<f32>, v: ArrayView1<f32>) -> f32 {
    x.iter()
        .zip(y.iter())
        .zip(v.iter())
        .map(|((a, b), s)| (a - b) * (a - b) / s)
        .sum::<f32>()
        .sqrt()
}

pub fn manhattan(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    x.iter().zip(y.iter()).map(|(a, b)| (a - b).abs()).sum()
}

pub fn chebyshev(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    x.iter()
        .zip(y.iter())
        .fold(0.0f32, |acc, (a, b)| acc.max((a - b).abs()))
}

/// General l-p distance; p = 1 is manhattan, p = 2 euclidean. The
/// specialised functions are cheaper where they apply.
pub fn minkowski(x: ArrayView1<f32>, y: ArrayView1<f32>, p: f32) -> f32 {
    x.iter()
        .zip(y.iter())
        .map(|(a, b)| (a - b).abs().powf(p))
        .sum::<f32>()
        .powf(1.0 / p)
}

/// Minkowski with per-coordinate weights. With weights set to inverse
/// standard deviations this is a standardised Minkowski distance.
pub fn weighted_minkowski(
    x: ArrayView1<f32>,
    y: ArrayView1<f32>,
    w: ArrayView1<f32>,
    p: f32,
) -> f32 {
    x.iter()
        .zip(y.iter())
        .zip(w.iter())
        .map(|((a, b), wi)| wi * (a - b).abs().powf(p))
        .sum::<f32>()
        .powf(1.0 / p)
}

/// Fraction of coordinates that differ.
pub fn hamming(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    if x.is_empty() {
        return 0.0;
    }
    let differing = x.iter().zip(y.iter()).filter(|(a, b)| a != b).count();
    differing as f32 / x.len() as f32
}

/// Terms with a zero denominator are skipped.
pub fn canberra(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    x.iter()
        .zip(y.iter())
        .map(|(a, b)| {
            let denominator = a.abs() + b.abs();
            if denominator > 0.0 {
                (a - b).abs() / denominator
            } else {
                0.0
            }
        })
        .sum()
}

pub fn bray_curtis(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    let (numerator, denominator) = x.iter().zip(y.iter()).fold((0.0f32, 0.0f32), |(n, d), (a, b)| {
        (n + (a - b).abs(), d + (a + b).abs())
    });
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Jaccard distance over the non-zero support of the two vectors.
pub fn jaccard(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    let (num_non_zero, num_equal) = x.iter().zip(y.iter()).fold((0u32, 0u32), |(nz, eq), (a, b)| {
        let a_true = *a != 0.0;
        let b_true = *b != 0.0;
        (nz + (a_true || b_true) as u32, eq + (a_true && b_true) as u32)
    });
    if num_non_zero == 0 {
        return 0.0;
    }
    (num_non_zero - num_equal) as f32 / num_non_zero as f32
}

pub fn cosine(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    let mut result = 0.0f32;
    let mut norm_x = 0.0f32;
    let mut norm_y = 0.0f32;
    for (a, b) in x.iter().zip(y.iter()) {
        result += a * b;
        norm_x += a * a;
        norm_y += b * b;
    }
    if norm_x == 0.0 && norm_y == 0.0 {
        0.0
    } else if norm_x == 0.0 || norm_y == 0.0 {
        1.0
    } else {
        1.0 - (result / (norm_x * norm_y).sqrt())
    }
}

pub fn dot(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    let result: f32 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    if result <= 0.0 {
        1.0
    } else {
        (1.0 - result).max(0.0)
    }
}

/// Order-isomorphic stand-in for [`cosine`], cheaper by one sqrt and one
/// division per call. A pair of zero vectors is at distance zero, like
/// the true cosine; other degenerate pairs (exactly one zero norm,
/// non-positive dot product) map to +inf so they never displace a real
/// candidate.
pub fn alternative_cosine(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    let mut result = 0.0f32;
    let mut norm_x = 0.0f32;
    let mut norm_y = 0.0f32;
    for (a, b) in x.iter().zip(y.iter()) {
        result += a * b;
        norm_x += a * a;
        norm_y += b * b;
    }
    if norm_x == 0.0 && norm_y == 0.0 {
        0.0
    } else if norm_x == 0.0 || norm_y == 0.0 || result <= 0.0 {
        f32::INFINITY
    } else {
        ((norm_x * norm_y).sqrt() / result).log2()
    }
}

/// Order-isomorphic stand-in for [`dot`]; same corrector as
/// [`alternative_cosine`].
pub fn alternative_dot(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    let result: f32 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    if result <= 0.0 {
        f32::INFINITY
    } else {
        -result.log2()
    }
}

/// Monotone correction mapping alternative cosine/dot values back onto
/// the true distance scale.
pub fn correct_alternative_cosine(d: f32) -> f32 {
    1.0 - 2.0f32.powf(-d)
}

/// Distance selector. Each variant binds together the true distance, the
/// alternative used inside the build loop, and the correction applied to
/// the final keys, so callers pick all three with one name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Metric {
    Euclidean,
    SquaredEuclidean,
    StandardisedEuclidean(Array1<f32>),
    Manhattan,
    Chebyshev,
    Minkowski(f32),
    WeightedMinkowski(Array1<f32>, f32),
    Hamming,
    Canberra,
    BrayCurtis,
    Jaccard,
    Cosine,
    Dot,
}

impl Metric {
    /// The true distance between two rows.
    pub fn distance(&self, x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
        match self {
            Metric::Euclidean => euclidean(x, y),
            Metric::SquaredEuclidean => squared_euclidean(x, y),
            Metric::StandardisedEuclidean(v) => standardised_euclidean(x, y, v.view()),
            Metric::Manhattan => manhattan(x, y),
            Metric::Chebyshev => chebyshev(x, y),
            Metric::Minkowski(p) => minkowski(x, y, *p),
            Metric::WeightedMinkowski(w, p) => weighted_minkowski(x, y, w.view(), *p),
            Metric::Hamming => hamming(x, y),
            Metric::Canberra => canberra(x, y),
            Metric::BrayCurtis => bray_curtis(x, y),
            Metric::Jaccard => jaccard(x, y),
            Metric::Cosine => cosine(x, y),
            Metric::Dot => dot(x, y),
        }
    }

    /// The distance used inside the build and search loops: cheaper than
    /// [`Metric::distance`] but inducing the same ordering. Falls back to
    /// the true distance for metrics with no faster alternative.
    pub fn alternative(&self, x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
        match self {
            Metric::Euclidean => squared_euclidean(x, y),
            Metric::Cosine => alternative_cosine(x, y),
            Metric::Dot => alternative_dot(x, y),
            _ => self.distance(x, y),
        }
    }

    /// Maps a value produced by [`Metric::alternative`] back onto the true
    /// distance scale. Identity for metrics with no alternative.
    pub fn correct(&self, d: f32) -> f32 {
        match self {
            Metric::Euclidean => d.sqrt(),
            Metric::Cosine | Metric::Dot => correct_alternative_cosine(d),
            _ => d,
        }
    }

    /// Rejects malformed parameters before any work starts.
    pub fn validate(&self, dim: usize) -> Result<()> {
        match self {
            Metric::Minkowski(p) => {
                if *p <= 0.0 {
                    bail!("minkowski requires p > 0, got {p}");
                }
            }
            Metric::WeightedMinkowski(w, p) => {
                if *p <= 0.0 {
                    bail!("weighted minkowski requires p > 0, got {p}");
                }
                if w.len() != dim {
                    bail!("weight vector has length {}, data has dimension {dim}", w.len());
                }
            }
            Metric::StandardisedEuclidean(v) => {
                if v.len() != dim {
                    bail!("variance vector has length {}, data has dimension {dim}", v.len());
                }
                if v.iter().any(|&s| s <= 0.0) {
                    bail!("standardised euclidean requires every variance to be positive");
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Named lookup for the parameterless metrics, with the usual aliases.
    pub fn from_name(name: &str) -> Option<Metric> {
        match name {
            "euclidean" | "l2" => Some(Metric::Euclidean),
            "sqeuclidean" | "squared_euclidean" => Some(Metric::SquaredEuclidean),
            "manhattan" | "taxicab" | "l1" => Some(Metric::Manhattan),
            "chebyshev" | "linfinity" | "linfty" | "linf" => Some(Metric::Chebyshev),
            "hamming" => Some(Metric::Hamming),
            "canberra" => Some(Metric::Canberra),
            "braycurtis" | "bray_curtis" => Some(Metric::BrayCurtis),
            "jaccard" => Some(Metric::Jaccard),
            "cosine" => Some(Metric::Cosine),
            "dot" => Some(Metric::Dot),
            _ => None,
        }
    }
}
