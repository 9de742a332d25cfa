use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use slicekit::config::Config;
use slicekit::manifest::{MembershipManifest, TaskManifest, TaskSummary};
use slicekit::slicing::{add_slice_labels, convert_to_slice_tasks, LabelStore};
use slicekit::{sklog, sklog_error, Result};

/// slicekit - slice-aware multi-task graph construction
#[derive(Parser, Debug)]
#[command(name = "slicekit")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    SLICEKIT_DEBUG=1     Enable debug logging (alternative to --debug)"
)]
pub struct Cli {
    /// Enable debug logging (writes to ~/.slicekit/slicekit.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Expand a base task into indicator, predictor and master tasks
    Expand {
        /// Task manifest (JSON)
        #[arg(long)]
        task: PathBuf,

        /// Comma-separated slice names; the base slice is always added
        #[arg(long, value_delimiter = ',')]
        slices: Vec<String>,

        /// Config file (defaults to ~/.slicekit/slicekit.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Materialize slice labels next to a base task's labels
    Labels {
        /// Name of the base task whose labels are sliced
        #[arg(long)]
        task_name: String,

        /// Label store (JSON object of task name to integer labels)
        #[arg(long)]
        labels: PathBuf,

        /// Sparse slice membership (JSON with rows, names, entries)
        #[arg(long)]
        membership: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    slicekit::log::init_with_debug(cli.debug);

    let result = match cli.command {
        Command::Expand {
            task,
            slices,
            config,
        } => run_expand(&task, &slices, config.as_deref()),
        Command::Labels {
            task_name,
            labels,
            membership,
        } => run_labels(&task_name, &labels, &membership),
    };

    if let Err(e) = &result {
        sklog_error!("Command failed: {}", e);
    }
    result
}

/// Build the manifest's task, expand it, and print one summary per task.
fn run_expand(task_path: &Path, slices: &[String], config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    sklog!(
        "Expand command: task={}, slices={:?}",
        task_path.display(),
        slices
    );

    let manifest = TaskManifest::from_json(&fs::read_to_string(task_path)?)?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let base = manifest.build(&mut rng);

    let tasks = convert_to_slice_tasks(&base, slices, &config)?;
    let summaries = tasks
        .iter()
        .map(TaskSummary::from_task)
        .collect::<Result<Vec<_>>>()?;

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}

/// Add slice labels to the store and print the updated store.
fn run_labels(task_name: &str, labels_path: &Path, membership_path: &Path) -> Result<()> {
    sklog!(
        "Labels command: task={}, labels={}, membership={}",
        task_name,
        labels_path.display(),
        membership_path.display()
    );

    let mut store: LabelStore = serde_json::from_str(&fs::read_to_string(labels_path)?)?;
    let membership =
        MembershipManifest::from_json(&fs::read_to_string(membership_path)?)?.build()?;

    let slices = add_slice_labels(&mut store, task_name, membership)?;
    sklog!("Labels command: materialized {} slices", slices.len());

    println!("{}", serde_json::to_string_pretty(&store)?);
    Ok(())
}
