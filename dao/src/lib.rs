//! Data access object: read-only, row-major f32 matrix with row slicing.
//! The matrix is either owned or borrowed from an external buffer; the
//! borrowed form is used to consume a caller's dataset without copying.

use anyhow::{bail, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, CowArray, Ix2};

pub struct Dao<'a> {
    pub num_data: usize,                 // number of rows
    pub dim: usize,                      // number of columns
    data: CowArray<'a, f32, Ix2>,
}

impl<'a> Dao<'a> {
    /// Takes ownership of the data matrix.
    pub fn new(data: Array2<f32>) -> Result<Dao<'static>> {
        check_shape(data.nrows(), data.ncols())?;
        Ok(Dao {
            num_data: data.nrows(),
            dim: data.ncols(),
            data: CowArray::from(data),
        })
    }

    /// Wraps an externally owned matrix without copying it.
    pub fn from_view(data: ArrayView2<'a, f32>) -> Result<Dao<'a>> {
        check_shape(data.nrows(), data.ncols())?;
        Ok(Dao {
            num_data: data.nrows(),
            dim: data.ncols(),
            data: CowArray::from(data),
        })
    }

    pub fn get_datum(&self, id: usize) -> ArrayView1<f32> {
        if id >= self.num_data {
            panic!("id {} out of bounds for {} data items", id, self.num_data);
        }
        self.data.row(id)
    }

    pub fn get_data(&self) -> ArrayView2<f32> {
        self.data.view()
    }
}

fn check_shape(rows: usize, cols: usize) -> Result<()> {
    if rows == 0 || cols == 0 {
        bail!("data matrix must be non-empty, got {} x {}", rows, cols);
    }
    Ok(())
}
