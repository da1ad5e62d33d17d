//! seriesdb command-line tool
//!
//! Adds, queries and inspects measurements in a local data directory.

use std::process;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{ArgGroup, Parser, Subcommand};
use seriesdb::storage::GenerationList;
use seriesdb::{Config, DiskStore, FilterDefinition, Measurement};
use tracing_subscriber::{fmt, EnvFilter};

/// seriesdb CLI
#[derive(Parser, Debug)]
#[command(name = "seriesdb")]
#[command(about = "Embedded time-series measurement store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./seriesdb_data")]
    data_dir: String,

    /// Generation size in MB before it is sealed
    #[arg(long, default_value = "10")]
    max_generation_mb: u64,

    /// Total disk budget in MB before the oldest generation is evicted
    #[arg(long, default_value = "1024")]
    max_disk_mb: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a measurement
    #[command(group(ArgGroup::new("value").required(true)))]
    Add {
        /// Series name
        name: String,

        /// Numerical value
        #[arg(long, group = "value")]
        numerical: Option<f64>,

        /// Categorical value
        #[arg(long, group = "value")]
        categorical: Option<String>,

        /// Raw value (stored as UTF-8 bytes)
        #[arg(long, group = "value")]
        raw: Option<String>,

        /// Timestamp in nanoseconds (defaults to now)
        #[arg(long)]
        ts: Option<i64>,
    },

    /// Print measurements in a time range
    Query {
        /// Range start in nanoseconds (inclusive)
        #[arg(long, default_value = "0")]
        start: i64,

        /// Range end in nanoseconds (inclusive, defaults to now)
        #[arg(long)]
        end: Option<i64>,

        /// Only these series (comma separated)
        #[arg(long, value_delimiter = ',')]
        names: Vec<String>,

        /// Minimum distance between returned measurements of one series
        #[arg(long, default_value = "0")]
        granularity_ms: u64,
    },

    /// List stored series and their types
    Series,

    /// List sealed generations
    Generations,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,seriesdb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> seriesdb::Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .max_generation_bytes(args.max_generation_mb * 1024 * 1024)
        .max_total_disk_bytes(args.max_disk_mb * 1024 * 1024)
        .build();

    if let Commands::Generations = args.command {
        let generations = GenerationList::scan(&config.data_dir)?;
        for generation in generations.iter() {
            println!(
                "{}\t{}\t{}\t{} bytes",
                generation.index_path.display(),
                generation.oldest_ts,
                generation.newest_ts,
                generation.size()
            );
        }
        println!("total: {} bytes", generations.total_size());
        return Ok(());
    }

    let store = DiskStore::open(config)?;

    match args.command {
        Commands::Add {
            name,
            numerical,
            categorical,
            raw,
            ts,
        } => {
            let ts = ts.unwrap_or_else(now_nanos);
            let measurement = match (numerical, categorical, raw) {
                (Some(value), _, _) => Measurement::numerical(ts, value),
                (_, Some(value), _) => Measurement::categorical(ts, value),
                (_, _, Some(value)) => Measurement::raw(ts, value.into_bytes()),
                (None, None, None) => {
                    return Err(seriesdb::StoreError::Config(
                        "one of --numerical, --categorical or --raw is required".to_string(),
                    ))
                }
            };
            store.add(&name, measurement)?;
        }
        Commands::Query {
            start,
            end,
            names,
            granularity_ms,
        } => {
            let filter = FilterDefinition::all()
                .with_names(names)
                .with_granularity(Duration::from_millis(granularity_ms));
            let end = end.unwrap_or_else(now_nanos);

            let result = store.measurements_in_range(start, end, &filter)?;
            let mut names: Vec<&String> = result.keys().collect();
            names.sort();
            for name in names {
                for measurement in &result[name] {
                    println!("{}\t{}", name, measurement);
                }
            }
        }
        Commands::Series => {
            for info in store.all_series_info() {
                println!("{}\t{}", info.name, info.measurement_type);
            }
        }
        Commands::Generations => {}
    }

    store.shutdown()
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
