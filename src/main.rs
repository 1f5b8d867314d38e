use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use audio_extractor::api::{self, AppState};
use audio_extractor::cli::{Cli, Commands};
use audio_extractor::extractors::YtDlpExtractor;
use audio_extractor::storage::S3Store;
use audio_extractor::{output, utils, Config, ExtractRequest, ExtractionPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load()?;

    match cli.command {
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::Extract {
            url,
            user_id,
            transcription_id,
            format,
        } => {
            let pipeline = build_pipeline(&config).await?;
            let request = ExtractRequest {
                url,
                user_id,
                transcription_id,
            };

            let progress = if cli.quiet {
                ProgressBar::hidden()
            } else {
                ProgressBar::new_spinner()
            };
            progress.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .context("Invalid progress template")?,
            );
            progress.enable_steady_tick(Duration::from_millis(120));
            progress.set_message("Extracting audio with yt-dlp...");

            let result = pipeline.run(&request).await;
            progress.finish_and_clear();

            output::print_to_console(&result?, &format)
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Settings come from CONFIG_PATH or ./config.yaml, overridden by environment variables.");
                println!("Run `audio-extractor config --show` to print the effective values.");
            }
            Ok(())
        }
        Commands::Check => {
            let missing = utils::check_dependencies(&config.extractor.ytdlp_path).await;
            if missing.is_empty() {
                println!("All external tools are available.");
                Ok(())
            } else {
                for dep in &missing {
                    println!("   • missing: {}", dep);
                }
                anyhow::bail!("{} required tool(s) missing", missing.len())
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "audio_extractor=debug"
    } else {
        "audio_extractor=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let json = std::env::var("LOG_FORMAT")
        .map(|value| value.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_pipeline(config: &Config) -> Result<ExtractionPipeline> {
    config.validate()?;

    let extractor = Arc::new(YtDlpExtractor::new(config.extractor.clone()));
    let store = Arc::new(S3Store::new(config).await?);

    Ok(ExtractionPipeline::new(config, extractor, store))
}

async fn serve(mut config: Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    // Non-fatal: the tools may live somewhere PATH lookup does not reach
    let missing_deps = utils::check_dependencies(&config.extractor.ytdlp_path).await;
    for dep in &missing_deps {
        tracing::warn!("Dependency check warning: {}", dep);
    }

    if config.server.api_key.is_none() {
        tracing::warn!("API_KEY is not set; every /extract request will be rejected");
    }

    let pipeline = build_pipeline(&config).await?;
    let state = AppState::new(pipeline, config.server.api_key.clone());
    let app = api::router(state);

    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind_address))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = shutdown_signal()?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped");

    Ok(())
}

/// Future resolving on Ctrl-C or SIGTERM (what a container stop sends).
///
/// The SIGTERM handler is registered before this returns, so the default
/// terminate action never applies once the server is listening.
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    Ok(async move {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", err);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            terminate.recv().await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
        tracing::info!("Shutting down");
    })
}
