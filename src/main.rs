use std::process::ExitCode;

use anyhow::Context as _;
use model_snap::{RenderConfig, RenderRequest, cli::CliArgs};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let args = CliArgs::parse(std::env::args().skip(1))?;
    let request = RenderRequest::from(args);
    log::info!(
        "rendering {} at {} to {}",
        request.model.display(),
        request.dimensions,
        request.output.display()
    );

    let report = model_snap::render_model(&request, &RenderConfig::default())
        .await
        .with_context(|| format!("could not render {}", request.model.display()))?;

    if !report.warnings.is_empty() {
        log::warn!("{} texture(s) could not be resolved and were left out", report.warnings.len());
    }
    log::info!(
        "saved {}x{} snapshot to {}",
        report.width,
        report.height,
        report.output.display()
    );
    Ok(())
}
