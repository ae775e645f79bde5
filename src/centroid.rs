use std::str::FromStr;

use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::Rng;

use crate::algorithm::Assignment;
use crate::error::{Error, Result};
use crate::initialization::FeatureBounds;

/// k rows, one per cluster, with the dataset's feature count as columns.
pub type CentroidSet = Array2<f64>;

/// What happens to a centroid when no instance is assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyClusterPolicy {
    /// Keep the centroid from the previous round.
    #[default]
    RetainPrevious,
    /// Draw a fresh centroid uniformly inside the dataset's feature bounds.
    Redraw,
}

impl FromStr for EmptyClusterPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "retain" | "retain-previous" => Ok(Self::RetainPrevious),
            "redraw" => Ok(Self::Redraw),
            other => Err(Error::invalid_argument(format!(
                "unknown empty cluster policy '{}'",
                other
            ))),
        }
    }
}

/// Running per-cluster sums and member counts.
struct CentroidAccumulator {
    sums: Array2<f64>,
    counts: Vec<usize>,
}

impl CentroidAccumulator {
    fn new(k: usize, dims: usize) -> Self {
        Self {
            sums: Array2::zeros((k, dims)),
            counts: vec![0; k],
        }
    }

    fn add(&mut self, label: usize, point: ArrayView1<f64>) {
        let mut sum = self.sums.row_mut(label);
        sum += &point;
        self.counts[label] += 1;
    }

    /// Turns sums into means. Empty clusters are resolved by `policy`.
    fn finalize<R: Rng + ?Sized>(
        mut self,
        previous: ArrayView2<f64>,
        policy: EmptyClusterPolicy,
        bounds: &FeatureBounds,
        rng: &mut R,
    ) -> CentroidSet {
        for (cluster, (mut row, &count)) in self
            .sums
            .rows_mut()
            .into_iter()
            .zip(self.counts.iter())
            .enumerate()
        {
            if count > 0 {
                row /= count as f64;
                continue;
            }
            match policy {
                EmptyClusterPolicy::RetainPrevious => {
                    log::warn!("cluster {} is empty, keeping its previous centroid", cluster);
                    row.assign(&previous.row(cluster));
                }
                EmptyClusterPolicy::Redraw => {
                    log::warn!("cluster {} is empty, drawing a new centroid", cluster);
                    row.assign(&bounds.sample(rng));
                }
            }
        }
        self.sums
    }
}

/// Recomputes every centroid as the mean of its assigned instances.
///
/// `previous` fixes k and is consulted only for empty clusters under
/// [`EmptyClusterPolicy::RetainPrevious`]. A new set is always returned.
pub fn update_centroids<R: Rng + ?Sized>(
    data: ArrayView2<f64>,
    assignment: &Assignment,
    previous: ArrayView2<f64>,
    policy: EmptyClusterPolicy,
    bounds: &FeatureBounds,
    rng: &mut R,
) -> Result<CentroidSet> {
    let (k, dims) = previous.dim();
    if dims != data.ncols() {
        return Err(Error::dimension_mismatch(data.ncols(), dims));
    }
    if assignment.len() != data.nrows() {
        return Err(Error::dimension_mismatch(data.nrows(), assignment.len()));
    }
    if bounds.dims() != dims {
        return Err(Error::dimension_mismatch(dims, bounds.dims()));
    }
    if let Some(&label) = assignment.labels().iter().find(|&&label| label >= k) {
        return Err(Error::invalid_argument(format!(
            "cluster index {} is outside 0..{}",
            label, k
        )));
    }

    let mut accumulator = CentroidAccumulator::new(k, dims);
    for (point, &label) in data.rows().into_iter().zip(assignment.labels()) {
        accumulator.add(label, point);
    }

    Ok(accumulator.finalize(previous, policy, bounds, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    fn assignment(labels: Vec<usize>) -> Assignment {
        let squared = vec![0.0; labels.len()];
        Assignment::new(labels, squared).unwrap()
    }

    #[test]
    fn test_means_per_cluster() {
        let data = array![[0.0, 0.0], [0.0, 1.0], [10.0, 10.0], [10.0, 11.0]];
        let bounds = FeatureBounds::from_dataset(data.view()).unwrap();
        let previous = array![[1.0, 1.0], [9.0, 9.0]];
        let mut rng = StdRng::seed_from_u64(0);
        let updated = update_centroids(
            data.view(),
            &assignment(vec![0, 0, 1, 1]),
            previous.view(),
            EmptyClusterPolicy::RetainPrevious,
            &bounds,
            &mut rng,
        )
        .unwrap();
        assert_eq!(updated, array![[0.0, 0.5], [10.0, 10.5]]);
        assert_eq!(previous, array![[1.0, 1.0], [9.0, 9.0]]);
    }

    #[test]
    fn test_empty_cluster_retains_previous() {
        let data = array![[1.0, 1.0], [1.0, 1.002], [1.002, 1.0]];
        let bounds = FeatureBounds::from_dataset(data.view()).unwrap();
        let previous = array![[0.0, 0.0], [100.0, 100.0]];
        let mut rng = StdRng::seed_from_u64(0);
        let updated = update_centroids(
            data.view(),
            &assignment(vec![0, 0, 0]),
            previous.view(),
            EmptyClusterPolicy::RetainPrevious,
            &bounds,
            &mut rng,
        )
        .unwrap();
        assert_eq!(updated.row(1), previous.row(1));
        assert!(updated.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_empty_cluster_redraw_stays_in_bounds() {
        let data = array![[1.0, 1.0], [1.0, 1.002], [1.002, 1.0]];
        let bounds = FeatureBounds::from_dataset(data.view()).unwrap();
        let previous = array![[0.0, 0.0], [100.0, 100.0]];
        let mut rng = StdRng::seed_from_u64(3);
        let updated = update_centroids(
            data.view(),
            &assignment(vec![0, 0, 0]),
            previous.view(),
            EmptyClusterPolicy::Redraw,
            &bounds,
            &mut rng,
        )
        .unwrap();
        let redrawn = updated.row(1);
        assert!((1.0..=1.002).contains(&redrawn[0]));
        assert!((1.0..=1.002).contains(&redrawn[1]));
    }

    #[test]
    fn test_shape_checks() {
        let data = array![[0.0, 0.0], [1.0, 1.0]];
        let bounds = FeatureBounds::from_dataset(data.view()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let wide = array![[0.0, 0.0, 0.0]];
        let err = update_centroids(
            data.view(),
            &assignment(vec![0, 0]),
            wide.view(),
            EmptyClusterPolicy::RetainPrevious,
            &bounds,
            &mut rng,
        );
        assert!(matches!(err, Err(Error::DimensionMismatch { .. })));

        let previous = array![[0.0, 0.0]];
        let err = update_centroids(
            data.view(),
            &assignment(vec![0]),
            previous.view(),
            EmptyClusterPolicy::RetainPrevious,
            &bounds,
            &mut rng,
        );
        assert!(matches!(err, Err(Error::DimensionMismatch { .. })));

        let err = update_centroids(
            data.view(),
            &assignment(vec![0, 1]),
            previous.view(),
            EmptyClusterPolicy::RetainPrevious,
            &bounds,
            &mut rng,
        );
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("retain".parse::<EmptyClusterPolicy>().unwrap(), EmptyClusterPolicy::RetainPrevious);
        assert_eq!("Redraw".parse::<EmptyClusterPolicy>().unwrap(), EmptyClusterPolicy::Redraw);
        assert!("nearest".parse::<EmptyClusterPolicy>().is_err());
    }
}
