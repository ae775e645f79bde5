use ndarray::{ArrayView1, ArrayView2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use crate::centroid::{update_centroids, CentroidSet, EmptyClusterPolicy};
use crate::distance::euclidean_distance;
use crate::error::{Error, Result};
use crate::inertia::calculate_inertia;
use crate::initialization::{check_cluster_count, initialize_using, FeatureBounds};

pub const DEFAULT_MAX_ROUNDS: usize = 300;

/// Per-instance cluster label and squared distance to that cluster's centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    labels: Vec<usize>,
    squared_distances: Vec<f64>,
}

impl Assignment {
    /// Fails when the two vectors disagree in length.
    pub fn new(labels: Vec<usize>, squared_distances: Vec<f64>) -> Result<Self> {
        if labels.len() != squared_distances.len() {
            return Err(Error::dimension_mismatch(labels.len(), squared_distances.len()));
        }
        Ok(Self {
            labels,
            squared_distances,
        })
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn squared_distances(&self) -> &[f64] {
        &self.squared_distances
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(cluster, squared distance)` of instance `i`.
    pub fn get(&self, i: usize) -> Option<(usize, f64)> {
        Some((*self.labels.get(i)?, *self.squared_distances.get(i)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.labels
            .iter()
            .copied()
            .zip(self.squared_distances.iter().copied())
    }

    /// Member count of each of the `k` clusters.
    pub fn cluster_sizes(&self, k: usize) -> Vec<usize> {
        let mut sizes = vec![0; k];
        for &label in &self.labels {
            if label < k {
                sizes[label] += 1;
            }
        }
        sizes
    }
}

/// Nearest centroid and the squared distance to it. The lowest index wins ties.
fn nearest_centroid(point: ArrayView1<f64>, centroids: ArrayView2<f64>) -> Result<(usize, f64)> {
    let mut min_index = 0;
    let mut min_dist = euclidean_distance(point, centroids.row(0))?;
    for (centroid_idx, centroid) in centroids.rows().into_iter().enumerate().skip(1) {
        let distance = euclidean_distance(point, centroid)?;
        if distance < min_dist {
            min_dist = distance;
            min_index = centroid_idx;
        }
    }
    Ok((min_index, min_dist * min_dist))
}

pub(crate) fn assign_with(
    data: ArrayView2<f64>,
    centroids: ArrayView2<f64>,
    previous: Option<&Assignment>,
    parallel: bool,
) -> Result<(Assignment, bool)> {
    if centroids.nrows() == 0 {
        return Err(Error::invalid_argument("k must be at least 1"));
    }
    if centroids.ncols() != data.ncols() {
        return Err(Error::dimension_mismatch(data.ncols(), centroids.ncols()));
    }
    if let Some(previous) = previous {
        if previous.len() != data.nrows() {
            return Err(Error::dimension_mismatch(data.nrows(), previous.len()));
        }
    }

    let nearest: Vec<(usize, f64)> = if parallel {
        (0..data.nrows())
            .into_par_iter()
            .map(|i| nearest_centroid(data.row(i), centroids))
            .collect::<Result<_>>()?
    } else {
        data.rows()
            .into_iter()
            .map(|point| nearest_centroid(point, centroids))
            .collect::<Result<_>>()?
    };
    let (labels, squared_distances): (Vec<usize>, Vec<f64>) = nearest.into_iter().unzip();

    let changed = match previous {
        None => true,
        Some(previous) => {
            let moved = labels
                .iter()
                .zip(previous.labels())
                .filter(|(new, old)| new != old)
                .count();
            log::debug!("{} instances changed cluster", moved);
            moved > 0
        }
    };

    Ok((
        Assignment {
            labels,
            squared_distances,
        },
        changed,
    ))
}

/// Labels every instance with its nearest centroid.
///
/// With no `previous` assignment the result always counts as changed, so the
/// first round of a run is never mistaken for convergence.
pub fn assign(
    data: ArrayView2<f64>,
    centroids: ArrayView2<f64>,
    previous: Option<&Assignment>,
) -> Result<(Assignment, bool)> {
    assign_with(data, centroids, previous, false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// The last assignment step moved no instance.
    Converged,
    /// Stopped after `max_rounds` updates with labels still moving.
    RoundLimitReached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansConfig {
    pub k: usize,
    pub seed: u64,
    pub max_rounds: usize,
    pub empty_cluster: EmptyClusterPolicy,
    /// Spread the assignment step over the rayon pool. Output is identical either way.
    pub parallel: bool,
}

impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            seed: 0,
            max_rounds: DEFAULT_MAX_ROUNDS,
            empty_cluster: EmptyClusterPolicy::default(),
            parallel: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_empty_cluster(mut self, policy: EmptyClusterPolicy) -> Self {
        self.empty_cluster = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(Error::invalid_argument("max_rounds must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResult {
    pub centroids: CentroidSet,
    pub assignment: Assignment,
    /// Number of update steps performed.
    pub rounds: usize,
    /// Centroids as they were before the first update.
    pub original_centroids: CentroidSet,
    pub status: ConvergenceStatus,
}

impl ClusterResult {
    pub fn converged(&self) -> bool {
        self.status == ConvergenceStatus::Converged
    }

    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    pub fn inertia(&self) -> f64 {
        calculate_inertia(&self.assignment)
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.assignment.cluster_sizes(self.k())
    }
}

fn run_rounds<R: Rng + ?Sized>(
    data: ArrayView2<f64>,
    initial: CentroidSet,
    bounds: &FeatureBounds,
    config: &KMeansConfig,
    rng: &mut R,
) -> Result<ClusterResult> {
    let original_centroids = initial.clone();
    let mut centroids = initial;
    let mut previous: Option<Assignment> = None;
    let mut rounds = 0;

    let (assignment, status) = loop {
        let (assignment, changed) = assign_with(data, centroids.view(), previous.as_ref(), config.parallel)?;
        if !changed {
            log::info!("Converged after {} rounds", rounds);
            break (assignment, ConvergenceStatus::Converged);
        }
        if rounds == config.max_rounds {
            log::warn!("Stopped after {} rounds without converging", rounds);
            break (assignment, ConvergenceStatus::RoundLimitReached);
        }

        centroids = update_centroids(
            data,
            &assignment,
            centroids.view(),
            config.empty_cluster,
            bounds,
            rng,
        )?;
        rounds += 1;
        if rounds % 10 == 0 {
            log::info!("Finished round {}", rounds);
        }
        previous = Some(assignment);
    };

    Ok(ClusterResult {
        centroids,
        assignment,
        rounds,
        original_centroids,
        status,
    })
}

/// Runs Lloyd's algorithm from random centroids drawn with `config.seed`.
pub fn cluster_with_config(data: ArrayView2<f64>, config: &KMeansConfig) -> Result<ClusterResult> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let (initial, bounds) = initialize_using(data, config.k, &mut rng)?;
    log::info!(
        "Starting k-means with k = {} on {} instances x {} features (seed {})",
        config.k,
        data.nrows(),
        data.ncols(),
        config.seed
    );
    run_rounds(data, initial, &bounds, config, &mut rng)
}

/// Runs Lloyd's algorithm from caller-supplied centroids; `config.k` is ignored
/// in favour of the row count of `initial`.
pub fn cluster_from_centroids(
    data: ArrayView2<f64>,
    initial: ArrayView2<f64>,
    config: &KMeansConfig,
) -> Result<ClusterResult> {
    config.validate()?;
    check_cluster_count(initial.nrows(), data.nrows())?;
    if initial.ncols() != data.ncols() {
        return Err(Error::dimension_mismatch(data.ncols(), initial.ncols()));
    }
    if initial.iter().any(|v| !v.is_finite()) {
        return Err(Error::invalid_argument("initial centroids must be finite"));
    }
    let bounds = FeatureBounds::from_dataset(data)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    run_rounds(data, initial.to_owned(), &bounds, config, &mut rng)
}

/// Clusters `data` into `k` groups with default settings and the given seed.
pub fn cluster(data: ArrayView2<f64>, k: usize, seed: u64) -> Result<ClusterResult> {
    cluster_with_config(data, &KMeansConfig::new(k).with_seed(seed))
}
