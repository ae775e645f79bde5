use std::io;

use clap::Parser;
use itertools::Itertools;
use ndarray::Array2;

use kmeans_lloyd::logger::init_logger;
use kmeans_lloyd::{
    cluster_with_config, coerce_numeric, encode_categorical, load_table, to_matrix, ClusterResult,
    EmptyClusterPolicy, KMeansConfig, TableFormat, DEFAULT_MAX_ROUNDS,
};

/// Cluster the rows of a delimited file with Lloyd's k-means
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the input table
    #[arg(long)]
    data: String,
    /// Table format: csv or tsv
    #[arg(long, default_value = "csv")]
    format: TableFormat,
    /// The first non-comment line is data, not a header
    #[arg(long)]
    no_header: bool,
    /// Number of clusters
    #[arg(long)]
    k: usize,
    /// Seed of the first run
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Upper bound on update rounds per run
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: usize,
    /// Empty cluster handling: retain or redraw
    #[arg(long, default_value = "retain")]
    empty_cluster: EmptyClusterPolicy,
    /// Categorical column to encode as integer codes (repeatable)
    #[arg(long)]
    categorical: Vec<String>,
    /// Text column to convert to numbers (repeatable)
    #[arg(long)]
    numeric: Vec<String>,
    /// Columns to cluster on (repeatable, default: all)
    #[arg(long)]
    columns: Vec<String>,
    /// Number of runs with consecutive seeds; the lowest inertia is kept
    #[arg(long, default_value_t = 1)]
    restarts: usize,
    /// Disable the rayon assignment step
    #[arg(long)]
    sequential: bool,
}

fn prepare(args: &Args) -> Result<Array2<f64>, Box<dyn std::error::Error>> {
    let mut table = load_table(&args.data, args.format, !args.no_header)?;
    for column in &args.categorical {
        let (encoded, mapping) = encode_categorical(table, column)?;
        log::info!("Encoded '{}' into {} distinct codes", column, mapping.len());
        table = encoded;
    }
    let numeric = args.numeric.iter().map(String::as_str).collect_vec();
    table = coerce_numeric(table, &numeric)?;
    if !args.columns.is_empty() {
        table = table.select(&args.columns.iter().map(String::as_str).collect_vec())?;
    }
    Ok(to_matrix(&table)?)
}

fn kmeans(data: &Array2<f64>, args: &Args) -> Result<ClusterResult, Box<dyn std::error::Error>> {
    let mut best: Option<ClusterResult> = None;
    let mut inertia_per_run: Vec<f64> = vec![];
    let mut best_run = 0;

    for run in 0..args.restarts.max(1) {
        let config = KMeansConfig::new(args.k)
            .with_seed(args.seed.wrapping_add(run as u64))
            .with_max_rounds(args.max_rounds)
            .with_empty_cluster(args.empty_cluster)
            .with_parallel(!args.sequential);
        let result = cluster_with_config(data.view(), &config)?;
        let inertia = result.inertia();
        log::info!(
            "Finished run #{} (seed {}) - {:?} after {} rounds, inertia {}",
            run,
            config.seed,
            result.status,
            result.rounds,
            inertia
        );
        inertia_per_run.push(inertia);

        if best.as_ref().map_or(true, |b| inertia < b.inertia()) {
            best_run = run;
            best = Some(result);
        }
    }

    log::info!("Inertia per run: {:?}", inertia_per_run);
    log::info!("Best run is #{}", best_run);
    best.ok_or_else(|| "no clustering run was performed".into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger()?;
    let args = Args::parse();

    let data = prepare(&args)?;
    let result = kmeans(&data, &args)?;

    for (cluster, (centroid, size)) in result.centroids.rows().into_iter().zip(result.cluster_sizes()).enumerate() {
        log::info!("Cluster {}: {} instances, centroid {}", cluster, size, centroid);
    }

    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    writer.write_record(["index", "cluster", "squared_distance"])?;
    for (index, (cluster, squared)) in result.assignment.iter().enumerate() {
        writer.write_record([index.to_string(), cluster.to_string(), squared.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}
