// src/cli/mod.rs — CLI definition (clap derive)

pub mod analyze;
pub mod chat;
pub mod explore;
pub mod ping;
pub mod preview;
pub mod progress;
pub mod render;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::infra::config::Config;
use crate::infra::errors::DataScribeError;
use crate::pipeline::session::Session;
use crate::pipeline::Pipeline;
use crate::provider::ModelProvider;
use crate::sandbox::rhai_executor::RhaiExecutor;

#[derive(Parser)]
#[command(
    name = "datascribe",
    about = "Ask for an analysis of a CSV file in plain words and run the generated code",
    version
)]
pub struct Cli {
    /// Model to use (provider/model, or a model name for the configured provider)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate and run analysis code for one request
    Analyze {
        /// CSV file to analyze
        csv: PathBuf,
        /// The analysis request, e.g. "total sales per region"
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
        /// Filter rows first (col=min..max, col=a,b, col=2023-01-01..2023-06-30); repeatable
        #[arg(short, long = "filter")]
        filters: Vec<String>,
        /// Run the sanitized code without asking
        #[arg(short, long)]
        yes: bool,
        /// Print the prompt sent to the model
        #[arg(long)]
        show_prompt: bool,
    },
    /// Interactive session: ask repeatedly about one dataset
    Chat {
        /// CSV file to analyze
        csv: PathBuf,
        /// Run generated code as soon as it passes the screen
        #[arg(short, long)]
        yes: bool,
    },
    /// Manual charts with filtering and aggregation, no model involved
    Explore {
        /// CSV file to explore
        csv: PathBuf,
        /// bar, scatter, line, heatmap, correlation, timeseries
        #[arg(short, long, default_value = "bar")]
        chart: String,
        /// X-axis column
        #[arg(short = 'x', long)]
        x: Option<String>,
        /// Y-axis column
        #[arg(short = 'y', long)]
        y: Option<String>,
        /// Y aggregation: none, sum, mean, max, min, count
        #[arg(short, long, default_value = "none")]
        agg: String,
        /// Time series: one line per value of this column
        #[arg(long)]
        series: Option<String>,
        /// Time series: only these values of the series column (comma separated)
        #[arg(long, value_delimiter = ',')]
        series_values: Vec<String>,
        /// Filter rows first; repeatable
        #[arg(short, long = "filter")]
        filters: Vec<String>,
        /// X label display: thin, shrink, auto
        #[arg(long)]
        labels: Option<String>,
    },
    /// Show the first rows and the inferred column types
    Preview {
        /// CSV file to preview
        csv: PathBuf,
        /// Rows to show
        #[arg(short = 'n', long, default_value = "5")]
        rows: usize,
    },
    /// Check that the configured model answers
    Ping,
}

/// A session wired with the configured pipeline and the Rhai executor.
pub fn open_session(
    config: &Config,
    provider: Arc<dyn ModelProvider>,
) -> Result<Session, DataScribeError> {
    let pipeline = Pipeline::new(config, provider)?;
    let executor = Arc::new(RhaiExecutor::from_config(&config.execution));
    Ok(Session::new(pipeline, executor, config.bindings.clone()))
}

/// Ask before running generated code. Anything but an explicit yes
/// (including a non-interactive stdin) declines.
pub fn confirm_run() -> bool {
    match inquire::Confirm::new("Run this code?")
        .with_default(true)
        .prompt()
    {
        Ok(answer) => answer,
        Err(e) => {
            tracing::debug!("Confirmation prompt unavailable: {e}");
            eprintln!("Not running (no confirmation). Pass --yes to run without asking.");
            false
        }
    }
}
