use std::error::Error;

use clap::Parser;
use tracing::info;

use cafebot::app;
use cafebot::chat;
use cafebot::cli::{Cli, Command};
use cafebot::config::{Secrets, ServeOverrides, Settings};
use cafebot::logging;

/// Main entry point for the Coffee Corner bot
///
/// Loads `.env`, the layered settings and logging, then dispatches the
/// subcommand. `serve` gets a runtime with exactly the configured number of
/// worker threads; the other commands use a small default runtime.
///
/// # Errors
/// Returns an error if configuration is invalid, a required secret is
/// missing, or the selected command fails
fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    // A missing .env file is normal in containers
    let _ = dotenvy::dotenv();

    let mut settings = match &cli.config_dir {
        Some(dir) => Settings::load(dir)?,
        None => Settings::new()?,
    };

    let _guard = logging::init(&settings.logging);
    info!("Coffee Corner bot starting up...");

    let secrets = Secrets::from_env();

    match cli.command {
        Command::Serve(args) => {
            settings.apply_overrides(ServeOverrides::from(args))?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(settings.server.threads)
                .thread_name("cafebot-worker")
                .enable_all()
                .build()?;
            runtime.block_on(app::serve(&settings, &secrets))?;
        }
        Command::Prefetch => app::prefetch(&settings)?,
        Command::Setup { data, skip_verify } => {
            runtime()?.block_on(app::setup(&settings, &secrets, data.as_deref(), skip_verify))?;
        }
        Command::Selftest => runtime()?.block_on(app::selftest(&settings, &secrets))?,
        Command::Chat { url } => {
            let url = url.unwrap_or_else(|| {
                let host = match settings.server.host.as_str() {
                    "0.0.0.0" => "127.0.0.1",
                    host => host,
                };
                format!("http://{}:{}", host, settings.server.port)
            });
            runtime()?.block_on(chat::chat_loop(&url))?;
        }
    }

    Ok(())
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
}
