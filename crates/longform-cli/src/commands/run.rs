//! `longform run` — load a `BatchInput`, run the orchestrator, write the
//! output directory tree. Contains no pipeline logic of its own (§1
//! Non-goals: this crate is a thin request adapter over `longform-core`).

use std::io::Read;
use std::sync::Arc;

use longform_core::config::{PipelineSettings, ProviderCredentials};
use longform_core::domain::BatchInput;
use longform_core::orchestrator;
use longform_core::providers::ProviderSet;
use tokio_util::sync::CancellationToken;

use super::RunArgs;

/// Run one batch, returning the process exit code implied by the result
/// (§6: `0` all succeeded, `1` partial failure, `2` a fatal pre-article
/// error such as invalid input or an unresolvable company context).
pub async fn execute(args: RunArgs) -> anyhow::Result<i32> {
    let input = read_batch_input(args.input.as_deref())?;

    let credentials = ProviderCredentials::from_env();
    tracing::debug!(credentials = ?credentials, "loaded provider credentials");
    let settings = PipelineSettings::default().from_env_overrides();
    let providers = Arc::new(ProviderSet::from_credentials(&credentials, &settings));

    let cancel = CancellationToken::new();
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::warn!("shutdown signal received; cancelling in-flight article workers");
        shutdown_cancel.cancel();
    });

    tracing::info!(
        keywords = input.keywords.len(),
        company_url = %input.company_url,
        output = %args.output.display(),
        "starting batch"
    );

    let report = orchestrator::run_batch(input, args.output, settings, providers, cancel).await?;

    tracing::info!(
        total = report.articles_total,
        succeeded = report.articles_successful,
        failed = report.articles_failed,
        wall_time_ms = report.wall_time_ms,
        "batch finished"
    );

    Ok(report.exit_code())
}

fn read_batch_input(path: Option<&std::path::Path>) -> anyhow::Result<BatchInput> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read batch input file {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| anyhow::anyhow!("failed to read batch input from stdin: {e}"))?;
            buf
        }
    };
    serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse batch input JSON: {e}"))
}

/// Wait for an OS shutdown signal (Ctrl+C or SIGTERM).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler, using Ctrl+C only");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for Ctrl+C");
                }
                return;
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Ctrl+C handler error");
                }
            }
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    }
}
