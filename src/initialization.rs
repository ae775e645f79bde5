use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::centroid::CentroidSet;
use crate::error::{Error, Result};

/// Observed per-feature range of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBounds {
    pub min: Array1<f64>,
    pub max: Array1<f64>,
}

impl FeatureBounds {
    /// Fails on an empty dataset, on any non-finite value, and on feature
    /// ranges too wide to sample uniformly.
    pub fn from_dataset(data: ArrayView2<f64>) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(Error::invalid_argument("dataset has no instances"));
        }
        if let Some(((row, col), value)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::invalid_argument(format!(
                "dataset value {} at row {}, column {} is not finite",
                value, row, col
            )));
        }

        let min = data.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
        let max = data.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));
        // The uniform sampler scales the range by 1 / (1 - EPSILON).
        let too_wide = |(lo, hi): (&f64, &f64)| !((hi - lo) / (1.0 - f64::EPSILON)).is_finite();
        if let Some(j) = min.iter().zip(max.iter()).position(too_wide) {
            return Err(Error::invalid_argument(format!(
                "range of feature {} overflows",
                j
            )));
        }

        Ok(Self { min, max })
    }

    pub fn dims(&self) -> usize {
        self.min.len()
    }

    /// One point drawn uniformly inside the bounding box.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        self.min
            .iter()
            .zip(self.max.iter())
            .map(|(&lo, &hi)| rng.sample(Uniform::new_inclusive(lo, hi)))
            .collect()
    }
}

/// Draws `k` centroids column by column, each coordinate uniform in that
/// feature's observed range.
pub fn random_in_bounds<R: Rng + ?Sized>(bounds: &FeatureBounds, k: usize, rng: &mut R) -> CentroidSet {
    let mut centroids = Array2::zeros((k, bounds.dims()));
    for (j, mut column) in centroids.axis_iter_mut(Axis(1)).enumerate() {
        let draws = Array1::random_using(k, Uniform::new_inclusive(bounds.min[j], bounds.max[j]), rng);
        column.assign(&draws);
    }
    centroids
}

pub(crate) fn check_cluster_count(k: usize, instances: usize) -> Result<()> {
    if k < 1 {
        return Err(Error::invalid_argument("k must be at least 1"));
    }
    if k > instances {
        return Err(Error::invalid_argument(format!(
            "k = {} exceeds the number of instances ({})",
            k, instances
        )));
    }
    Ok(())
}

pub(crate) fn initialize_using<R: Rng + ?Sized>(
    data: ArrayView2<f64>,
    k: usize,
    rng: &mut R,
) -> Result<(CentroidSet, FeatureBounds)> {
    check_cluster_count(k, data.nrows())?;
    let bounds = FeatureBounds::from_dataset(data)?;
    let centroids = random_in_bounds(&bounds, k, rng);
    Ok((centroids, bounds))
}

/// Random centroids within the dataset's per-feature bounds, reproducible from `seed`.
pub fn initialize(data: ArrayView2<f64>, k: usize, seed: u64) -> Result<CentroidSet> {
    let mut rng = StdRng::seed_from_u64(seed);
    initialize_using(data, k, &mut rng).map(|(centroids, _)| centroids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample_data() -> Array2<f64> {
        array![[0.0, -5.0, 2.0], [4.0, 5.0, 2.0], [1.0, 0.0, 2.0], [3.0, 1.0, 2.0]]
    }

    #[test]
    fn test_bounds() {
        let data = sample_data();
        let bounds = FeatureBounds::from_dataset(data.view()).unwrap();
        assert_eq!(bounds.min, array![0.0, -5.0, 2.0]);
        assert_eq!(bounds.max, array![4.0, 5.0, 2.0]);
    }

    #[test]
    fn test_centroids_within_bounds() {
        let data = sample_data();
        for seed in 0..16 {
            let centroids = initialize(data.view(), 3, seed).unwrap();
            assert_eq!(centroids.dim(), (3, 3));
            for row in centroids.rows() {
                assert!((0.0..=4.0).contains(&row[0]));
                assert!((-5.0..=5.0).contains(&row[1]));
                assert_eq!(row[2], 2.0);
            }
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let data = sample_data();
        let a = initialize(data.view(), 4, 42).unwrap();
        let b = initialize(data.view(), 4, 42).unwrap();
        assert_eq!(a, b);
        let c = initialize(data.view(), 4, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_rejects_bad_k() {
        let data = sample_data();
        assert!(matches!(initialize(data.view(), 0, 1), Err(Error::InvalidArgument(_))));
        assert!(matches!(initialize(data.view(), 5, 1), Err(Error::InvalidArgument(_))));
        assert!(initialize(data.view(), 4, 1).is_ok());
    }

    #[test]
    fn test_rejects_non_finite() {
        let data = array![[0.0, 1.0], [f64::NAN, 2.0]];
        assert!(matches!(initialize(data.view(), 1, 1), Err(Error::InvalidArgument(_))));
        let data = array![[0.0, 1.0], [f64::INFINITY, 2.0]];
        assert!(matches!(initialize(data.view(), 1, 1), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_rejects_ranges_too_wide_to_sample() {
        let data = array![[-f64::MAX / 2.0], [f64::MAX / 2.0]];
        assert!(matches!(initialize(data.view(), 2, 0), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            crate::algorithm::cluster(data.view(), 2, 0),
            Err(Error::InvalidArgument(_))
        ));

        let data = array![[-f64::MAX / 4.0], [f64::MAX / 4.0]];
        let centroids = initialize(data.view(), 2, 0).unwrap();
        assert!(centroids.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_sample_single_row() {
        let data = sample_data();
        let bounds = FeatureBounds::from_dataset(data.view()).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let point = bounds.sample(&mut rng);
        assert_eq!(point.len(), 3);
        assert!((0.0..=4.0).contains(&point[0]));
        assert_eq!(point[2], 2.0);
    }
}
