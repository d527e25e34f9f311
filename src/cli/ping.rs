// src/cli/ping.rs — Check that the configured model answers

use std::time::{Duration, Instant};

use crate::infra::config::Config;
use crate::infra::errors::DataScribeError;
use crate::provider::{resolver, GenerateRequest};

pub async fn run_ping(config: &Config) -> anyhow::Result<()> {
    let provider = resolver::build_provider(config)?;
    let model = if config.model.model.is_empty() {
        provider.default_model().to_string()
    } else {
        config.model.model.clone()
    };
    eprintln!("Pinging {}/{}...", provider.id(), model);

    let mut request = GenerateRequest::new(&model, "Reply with the single word: pong");
    request.max_tokens = Some(16);

    let seconds = config.model.timeout_seconds;
    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(seconds), provider.generate(request))
        .await
        .map_err(|_| DataScribeError::ModelTimeout {
            provider: provider.id().to_string(),
            seconds,
        })
        .and_then(|r| r);

    match result {
        Ok(response) => {
            println!(
                "{} ({} ms, {} tokens)",
                response.content.trim(),
                started.elapsed().as_millis(),
                response.usage.total()
            );
        }
        Err(e) => eprintln!("[error] {}", e.user_message()),
    }
    Ok(())
}
