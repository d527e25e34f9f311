// src/cli/chat.rs — Interactive REPL over one dataset

use std::path::Path;

use super::analyze::{generate, run_pending};
use super::progress::{self, Stage};
use crate::infra::config::Config;
use crate::pipeline::session::Session;

/// Run the interactive session. Every failure is reported and the loop
/// goes on; only EOF or `/quit` ends it.
pub async fn run_chat(
    mut session: Session,
    config: &Config,
    csv: &Path,
    auto_run: bool,
) -> anyhow::Result<()> {
    match session.load_csv(csv) {
        Ok(d) => progress::report(Stage::Loaded {
            rows: d.len(),
            columns: d.width(),
        }),
        Err(e) => {
            progress::report(Stage::Failed(&e));
            return Ok(());
        }
    }

    eprintln!(
        "datascribe v{} | {}/{} | {}\nDescribe an analysis, or /help for commands.\n",
        env!("CARGO_PKG_VERSION"),
        session.pipeline().provider().id(),
        session.pipeline().model(),
        csv.display(),
    );

    let mut queries = 0u32;
    let mut runs = 0u32;

    while let Some(input) = read_input() {
        let trimmed = input.trim();

        if trimmed == "quit" || trimmed == "exit" || trimmed == "/quit" {
            break;
        }

        if trimmed.starts_with('/') {
            if handle_slash_command(trimmed, &mut session, config) {
                runs += 1;
            }
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        queries += 1;
        if generate(&mut session, trimmed).await {
            if auto_run {
                run_pending(&mut session, config);
                runs += 1;
            } else {
                eprintln!("Type /run to execute it.");
            }
        }
    }

    eprintln!("\nSession total: {queries} request(s), {runs} run(s)");
    Ok(())
}

fn read_input() -> Option<String> {
    use std::io::{self, BufRead, Write};

    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
        Ok(0) => None, // EOF
        Ok(_) => Some(line),
        Err(_) => None,
    }
}

/// Returns true when the command executed code.
fn handle_slash_command(input: &str, session: &mut Session, config: &Config) -> bool {
    let (cmd, arg) = match input.split_once(' ') {
        Some((c, a)) => (c, a.trim()),
        None => (input, ""),
    };

    match cmd {
        "/run" => {
            if session.can_execute() {
                run_pending(session, config);
                return true;
            }
            eprintln!("  Nothing to run. Describe an analysis first.");
        }

        "/filter" => {
            if arg.is_empty() {
                if session.filters().is_empty() {
                    eprintln!("  No filters.");
                } else {
                    for f in session.filters() {
                        eprintln!("  {f}");
                    }
                }
                eprintln!("  Usage: /filter col=min..max | col=a,b | col=2023-01-01..2023-03-31");
            } else {
                let total = session.original().map_or(0, |d| d.len());
                match session.apply_filter(arg) {
                    Ok(d) => progress::report(Stage::Filtered {
                        rows: d.len(),
                        of: total,
                    }),
                    Err(e) => progress::report(Stage::Failed(&e)),
                }
            }
        }

        "/clear" => match session.clear_filters() {
            Ok(d) => eprintln!("  Filters cleared ({} rows).", d.len()),
            Err(e) => progress::report(Stage::Failed(&e)),
        },

        "/preview" => {
            let rows = arg.parse().unwrap_or(5);
            match session.dataset() {
                Some(d) => println!("{}", super::preview::preview_text(d, rows)),
                None => eprintln!("  No dataset loaded."),
            }
        }

        "/code" => {
            match session.raw_response() {
                Some(raw) => progress::show_code("model response", raw),
                None => eprintln!("  No generated code yet."),
            }
            if let Some(code) = session.pending_code() {
                progress::show_code("code to run", code.as_str());
            }
        }

        "/state" => {
            eprintln!("  State: {}", session.state());
            if let Some(path) = session.source() {
                eprintln!("  File: {}", path.display());
            }
            if let Some(d) = session.dataset() {
                eprintln!("  Rows: {} | Filters: {}", d.len(), session.filters().len());
            }
            if let Some(q) = session.query() {
                eprintln!("  Last request: {q}");
            }
            eprintln!("  Code pending: {}", if session.can_execute() { "yes" } else { "no" });
        }

        "/help" => {
            eprintln!("Slash commands:");
            eprintln!("  /run               Run the generated code");
            eprintln!("  /filter [spec]     Show or add a row filter");
            eprintln!("  /clear             Remove all filters");
            eprintln!("  /preview [n]       Show the first rows");
            eprintln!("  /code              Show the last model response and code");
            eprintln!("  /state             Show session state");
            eprintln!("  /help              Show this help");
            eprintln!("  /quit, quit, exit  End session");
        }

        _ => {
            eprintln!("Unknown command: {}. Type /help for commands.", cmd);
        }
    }
    false
}
