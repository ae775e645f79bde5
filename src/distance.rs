use ndarray::ArrayView1;
use num_traits::Float;

use crate::error::{Error, Result};

/// Sum of squared per-dimension differences. Callers must ensure equal lengths.
pub(crate) fn squared_euclidean<F: Float>(us: ArrayView1<F>, them: ArrayView1<F>) -> F {
    us.iter()
        .zip(them.iter())
        .fold(F::zero(), |acc, (&a, &b)| {
            let diff = a - b;
            acc + diff * diff
        })
}

/// Euclidean distance between two vectors of equal length.
pub fn euclidean_distance<F: Float>(us: ArrayView1<F>, them: ArrayView1<F>) -> Result<F> {
    if us.len() != them.len() {
        return Err(Error::dimension_mismatch(us.len(), them.len()));
    }

    Ok(squared_euclidean(us, them).sqrt())
}
