//! simgroup CLI - near-duplicate grouping for document streams.

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use simgroup_cluster::{
    BandHash, ClusterConfig, FieldNames, GroupingRunner, JsonlIndex, KvStore, MinHashLsh,
    Preprocessor, RunConfig, RunStats, SimplePreprocessor, StreamClustering,
};
use simgroup_core::MemoryStore;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// JSON output for a grouping run.
#[derive(Serialize)]
struct JsonOutput {
    input: String,
    output: Option<String>,
    store: String,
    #[serde(flatten)]
    stats: RunStats,
    duplicate_ratio: f64,
    throughput_docs_s: f64,
}

/// Backend for clustering state.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum StoreKind {
    /// In-process map, lost on exit
    Memory,
    /// Redis server, one hash per namespace
    Redis,
}

/// Bucket-key hash.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum BandHashArg {
    Xxh3,
    Blake3,
}

impl From<BandHashArg> for BandHash {
    fn from(arg: BandHashArg) -> Self {
        match arg {
            BandHashArg::Xxh3 => BandHash::Xxh3,
            BandHashArg::Blake3 => BandHash::Blake3,
        }
    }
}

/// Near-duplicate grouping for text document streams.
///
/// Assigns every document a group id using MinHash signatures and LSH
/// banding, with clustering state kept in memory or in Redis.
#[derive(Parser, Debug)]
#[command(name = "simgroup")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input JSONL file.
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output JSONL file with `group_id` and `is_sim` added.
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Field holding the document id.
    #[arg(long, default_value = "id")]
    id_field: String,

    /// Field holding the text to group.
    #[arg(short = 'f', long, default_value = "text")]
    field: String,

    /// Field holding the document date (YYYY-MM-DD prefix).
    #[arg(long, default_value = "date")]
    date_field: String,

    /// First day to process.
    #[arg(long, value_name = "YYYY-MM-DD", requires = "to")]
    from: Option<NaiveDate>,

    /// Day after the last one to process.
    #[arg(long, value_name = "YYYY-MM-DD", requires = "from")]
    to: Option<NaiveDate>,

    /// Signature length (number of MinHash permutations).
    #[arg(short, long, default_value = "100")]
    dim: usize,

    /// Number of LSH bands. Must divide --dim.
    #[arg(short, long, default_value = "20")]
    length: usize,

    /// Target similarity (0.0-1.0). Recorded, not used as a filter.
    #[arg(short, long, default_value = "0.9")]
    threshold: f64,

    /// Seed of the MinHash permutation family.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// N-gram size for shingling.
    #[arg(short = 'n', long, default_value = "1")]
    ngram: usize,

    /// Hash used for bucket keys.
    #[arg(long, value_enum, default_value = "xxh3")]
    band_hash: BandHashArg,

    /// Documents per sink update.
    #[arg(short, long, default_value = "1000")]
    batch_size: usize,

    /// Group lookups in flight against the store.
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Log progress every N documents.
    #[arg(long, default_value = "1000")]
    report_interval: usize,

    /// Where clustering state lives.
    #[arg(long, value_enum, default_value = "memory")]
    store: StoreKind,

    /// Redis connection URL.
    #[arg(long, env = "SIMGROUP_REDIS_URL", default_value = "redis://127.0.0.1:6379/")]
    redis_url: String,

    /// Keep existing clustering state instead of resetting it.
    #[arg(long)]
    keep_state: bool,

    /// Print statistics only, don't write output.
    #[arg(long)]
    stats_only: bool,

    /// Output results as JSON.
    #[arg(long)]
    json: bool,

    /// Show progress spinner.
    #[arg(long)]
    progress: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the tokens of a text as JSON
    Tokenize {
        /// Text to tokenize
        text: String,

        /// Print sentences of token contents instead of full tokens
        #[arg(long)]
        sentences: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            num_permutations: self.dim,
            num_bands: self.length,
            threshold: self.threshold,
            seed: self.seed,
            ngram_size: self.ngram,
            band_hash: self.band_hash.into(),
        }
    }

    fn run_config(&self) -> RunConfig {
        RunConfig {
            from_date: self.from,
            to_date: self.to,
            batch_size: self.batch_size,
            workers: self.workers,
            report_interval: self.report_interval,
            reset_state: !self.keep_state,
        }
    }

    fn field_names(&self) -> FieldNames {
        FieldNames {
            id: self.id_field.clone(),
            text: self.field.clone(),
            date: self.date_field.clone(),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "simgroup_cluster=debug,simgroup_core=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();
}

/// Create a spinner for indeterminate progress.
fn create_spinner(msg: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn tokenize(text: &str, sentences: bool) -> Result<(), Box<dyn std::error::Error>> {
    let pre = SimplePreprocessor::new();
    let json = if sentences {
        let contents: Vec<Vec<String>> = pre
            .process_document(text)
            .into_iter()
            .map(|s| s.into_iter().map(|t| t.content).collect())
            .collect();
        serde_json::to_string_pretty(&contents)?
    } else {
        let tokens = simgroup_cluster::Tokenizer::new().tokenize(text, None);
        serde_json::to_string_pretty(&tokens)?
    };
    println!("{json}");
    Ok(())
}

async fn run_with_store<S: KvStore>(
    args: &Cli,
    input: &Path,
    store: S,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let pb = if args.progress && !args.json {
        Some(create_spinner("Loading documents...")?)
    } else {
        None
    };

    let mut index = JsonlIndex::open(input, args.field_names())?;
    info!(documents = index.len(), input = %input.display(), "Loaded input");

    if index.is_empty() {
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        if !args.json {
            eprintln!("Warning: No documents found in input file");
        }
        return Ok(());
    }

    let hasher = MinHashLsh::from_config(&args.cluster_config())?;
    let engine = StreamClustering::new(hasher, store);
    let runner = GroupingRunner::new(SimplePreprocessor::new(), engine, args.run_config())?;

    if let Some(ref pb) = pb {
        pb.set_message(format!("Grouping {} documents...", index.len()));
    }

    let stats = runner.run(&mut index).await?;

    if let Some(ref pb) = pb {
        pb.set_message("Writing output...");
    }
    if !args.stats_only {
        if let Some(output_path) = &args.output {
            index.save(output_path)?;
            info!(output = %output_path.display(), "Wrote annotated documents");
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if args.json {
        let output = JsonOutput {
            input: input.display().to_string(),
            output: args
                .output
                .as_ref()
                .filter(|_| !args.stats_only)
                .map(|p| p.display().to_string()),
            store: format!("{:?}", args.store).to_lowercase(),
            duplicate_ratio: stats.duplicate_ratio(),
            throughput_docs_s: stats.throughput(),
            stats,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        eprintln!();
        eprintln!("Grouping Results:");
        eprintln!("  Total documents:   {}", stats.total);
        eprintln!("  Groups:            {}", stats.groups);
        eprintln!("  Duplicates found:  {}", stats.duplicates);
        eprintln!("  Duplicate ratio:   {:.2}%", stats.duplicate_ratio() * 100.0);
        eprintln!("  Updates failed:    {}", stats.failed);
        eprintln!();
        eprintln!("Performance:");
        eprintln!("  Processing time:   {:.3}s", stats.elapsed_secs);
        eprintln!("  Throughput:        {:.0} docs/sec", stats.throughput());
        eprintln!();
        eprintln!("Total time: {:.3}s", start.elapsed().as_secs_f64());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    match &args.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "simgroup", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::Tokenize { text, sentences }) => return tokenize(text, *sentences),
        None => {}
    }

    init_tracing(args.verbose);

    let input = args.input.clone().ok_or("Input file is required")?;

    if !args.stats_only && args.output.is_none() {
        return Err("output file required (use -o/--output or --stats-only)".into());
    }

    // Fail on bad parameters before touching the store.
    args.cluster_config().validate()?;
    args.run_config().validate()?;

    match args.store {
        StoreKind::Memory => run_with_store(&args, &input, MemoryStore::new()).await,
        #[cfg(feature = "redis")]
        StoreKind::Redis => {
            let store = simgroup_core::RedisStore::connect(&args.redis_url).await?;
            run_with_store(&args, &input, store).await
        }
        #[cfg(not(feature = "redis"))]
        StoreKind::Redis => Err("built without the `redis` feature".into()),
    }
}
