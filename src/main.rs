// src/main.rs — datascribe entry point

use clap::Parser;

use datascribe::cli::analyze::{self, AnalyzeOptions};
use datascribe::cli::explore::{self, ExploreOptions};
use datascribe::cli::{self as commands, Cli, Commands};
use datascribe::dataset::aggregate::Aggregation;
use datascribe::infra::config::Config;
use datascribe::infra::logger;
use datascribe::provider::resolver;
use datascribe::viz::{ChartKind, LabelMode};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging (respects RUST_LOG / DATASCRIBE_LOG)
    logger::init_logging(if cli.verbose { "debug" } else { "warn" });

    // API keys may live in a .env file next to the data
    dotenvy::dotenv().ok();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let mut config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };
    if let Some(ref spec) = cli.model {
        resolver::apply_model_override(&mut config, spec)?;
    }
    config.validate()?;

    // Commands that don't need a provider
    match cli.command {
        Commands::Preview { csv, rows } => commands::preview::run_preview(&csv, rows),
        Commands::Explore {
            csv,
            chart,
            x,
            y,
            agg,
            series,
            series_values,
            filters,
            labels,
        } => {
            let opts = ExploreOptions {
                chart: chart.parse::<ChartKind>()?,
                x,
                y,
                agg: agg.parse::<Aggregation>()?,
                series,
                series_values,
                filters,
            };
            let labels = labels.map(|l| l.parse::<LabelMode>()).transpose()?;
            explore::run_explore(&config, &csv, &opts, labels)
        }
        Commands::Ping => commands::ping::run_ping(&config).await,
        Commands::Analyze {
            csv,
            query,
            filters,
            yes,
            show_prompt,
        } => {
            let provider = resolver::build_provider(&config)?;
            let session = commands::open_session(&config, provider)?;
            let query = query.join(" ");
            analyze::run_analyze(
                session,
                &config,
                AnalyzeOptions {
                    csv: &csv,
                    query: &query,
                    filters: &filters,
                    yes,
                    show_prompt,
                },
            )
            .await
        }
        Commands::Chat { csv, yes } => {
            let provider = resolver::build_provider(&config)?;
            let session = commands::open_session(&config, provider)?;
            commands::chat::run_chat(session, &config, &csv, yes).await
        }
    }
}
