// src/cli/analyze.rs — One-shot analysis: load, ask, screen, confirm, run

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::progress::{self, Stage};
use super::render::TerminalRenderer;
use crate::infra::config::Config;
use crate::pipeline::session::Session;

pub struct AnalyzeOptions<'a> {
    pub csv: &'a Path,
    pub query: &'a str,
    pub filters: &'a [String],
    pub yes: bool,
    pub show_prompt: bool,
}

/// Session-level failures are printed, not returned: only start-up
/// problems make the process exit non-zero.
pub async fn run_analyze(
    mut session: Session,
    config: &Config,
    opts: AnalyzeOptions<'_>,
) -> anyhow::Result<()> {
    let loaded = match session.load_csv(opts.csv) {
        Ok(d) => (d.len(), d.width()),
        Err(e) => {
            progress::report(Stage::Failed(&e));
            return Ok(());
        }
    };
    progress::report(Stage::Loaded {
        rows: loaded.0,
        columns: loaded.1,
    });

    for spec in opts.filters {
        if let Err(e) = session.apply_filter(spec) {
            progress::report(Stage::Failed(&e));
            return Ok(());
        }
    }
    if !opts.filters.is_empty() {
        let rows = session.dataset().map_or(0, |d| d.len());
        progress::report(Stage::Filtered { rows, of: loaded.0 });
    }

    if opts.show_prompt {
        if let Some(dataset) = session.dataset() {
            progress::show_code("prompt", &session.pipeline().build_prompt(opts.query, dataset));
        }
    }

    if generate(&mut session, opts.query).await && (opts.yes || super::confirm_run()) {
        run_pending(&mut session, config);
    }
    Ok(())
}

/// Submit a query and show what came back. True when code is ready to run.
pub(crate) async fn generate(session: &mut Session, query: &str) -> bool {
    progress::report(Stage::Requesting {
        provider: session.pipeline().provider().id(),
        model: session.pipeline().model(),
    });

    let result = session.submit_query(query).await.map(|c| c.as_str().lines().count());

    if let Some(raw) = session.raw_response() {
        progress::show_code("model response", raw);
    }
    match result {
        Ok(lines) => {
            progress::report(Stage::Generated { lines });
            if let Some(code) = session.pending_code() {
                progress::show_code("code to run", code.as_str());
            }
            progress::report(Stage::Ready);
            true
        }
        Err(e) => {
            if let Some(extracted) = session.extracted_code() {
                progress::show_code("refused code", &session.pipeline().rewrite(extracted));
            }
            progress::report(Stage::Failed(&e));
            false
        }
    }
}

/// Execute the pending code with a terminal renderer.
pub(crate) fn run_pending(session: &mut Session, config: &Config) {
    let renderer = Arc::new(TerminalRenderer::new(config.display.clone()));
    progress::report(Stage::Running);
    let started = Instant::now();
    match session.execute(renderer) {
        Ok(()) => progress::report(Stage::Finished {
            elapsed_ms: started.elapsed().as_millis(),
        }),
        Err(e) => progress::report(Stage::Failed(&e)),
    }
}
