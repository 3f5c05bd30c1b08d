//! Command-line argument definitions.

use clap::{Parser, Subcommand, ValueEnum};
use deepsearch_types::Depth;

#[derive(Parser)]
#[command(name = "deepsearch")]
#[command(about = "Run and serve the deep research engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log verbosity; overridden by `RUST_LOG` when set.
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan and execute a single query synchronously, then print the result.
    Run(QueryArgs),
    /// Start a job queue, enqueue one query, and stream progress to stdout
    /// until the job reaches a terminal state.
    Serve {
        #[command(flatten)]
        query: QueryArgs,
        /// Number of background workers draining the queue.
        #[arg(long, default_value_t = 2)]
        workers: usize,
        /// Buffered dispatch slots before `enqueue` reports the queue full.
        #[arg(long, default_value_t = 16)]
        queue_capacity: usize,
    },
}

#[derive(Parser)]
pub struct QueryArgs {
    /// The research question or topic.
    #[arg(long)]
    pub text: String,
    /// How thoroughly to research.
    #[arg(long, value_enum, default_value_t = DepthArg::Medium)]
    pub depth: DepthArg,
    /// Paths to attached documents to analyze; may be repeated.
    #[arg(long = "doc")]
    pub documents: Vec<String>,
    /// Allow the web search tool.
    #[arg(long)]
    pub web: bool,
    /// Allow the Wikipedia tool.
    #[arg(long)]
    pub wiki: bool,
    /// Upper bound on plan length; 0 uses the engine default.
    #[arg(long, default_value_t = 0)]
    pub max_steps: u32,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DepthArg {
    Shallow,
    Medium,
    Deep,
}

impl From<DepthArg> for Depth {
    fn from(d: DepthArg) -> Self {
        match d {
            DepthArg::Shallow => Depth::Shallow,
            DepthArg::Medium => Depth::Medium,
            DepthArg::Deep => Depth::Deep,
        }
    }
}
