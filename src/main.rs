use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio_util::sync::CancellationToken;

use thermolog::Config;

#[derive(Parser, Debug)]
#[command(name = "thermolog")]
#[command(about = "Log simulated temperature readings and serve them over HTTP")]
struct Cli {
    /// JSON configuration file; defaults apply when it does not exist
    #[arg(short, long, default_value = "thermolog.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    info!("thermolog starting up with {}", cli.config.display());

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            ctrl_c_token.cancel();
        }
    });

    thermolog::run(config, cancel_token).await
}
