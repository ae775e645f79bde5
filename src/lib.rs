//! Lloyd's k-means clustering over `ndarray` matrices, with seeded
//! initialization, an explicit empty-cluster policy and a round cap,
//! plus the table loading helpers that feed it.

pub mod algorithm;
pub mod centroid;
pub mod distance;
pub mod error;
pub mod inertia;
pub mod initialization;
pub mod load;
pub mod logger;

pub use algorithm::{
    assign, cluster, cluster_from_centroids, cluster_with_config, Assignment, ClusterResult,
    ConvergenceStatus, KMeansConfig, DEFAULT_MAX_ROUNDS,
};
pub use centroid::{update_centroids, CentroidSet, EmptyClusterPolicy};
pub use distance::euclidean_distance;
pub use error::{Error, Result};
pub use inertia::calculate_inertia;
pub use initialization::{initialize, FeatureBounds};
pub use load::{coerce_numeric, encode_categorical, load_table, to_matrix, Cell, Table, TableFormat, ValueMapping};
