//! fakedatafs mount daemon

use clap::Parser;
use fakedatafs_fuse::cli::Cli;
use fakedatafs_fuse::mount;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = cli.build_config()?;
    let options = mount::parse_mount_options(&cli.options)?;
    info!(
        seed = config.seed,
        files_per_dir = config.files_per_dir,
        max_size_kib = config.max_size_kib,
        "fakedatafs starting"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(mount::cancel_on_signal(
        tokio::signal::ctrl_c(),
        shutdown.clone(),
    ));

    mount::serve(&cli.mountpoint, config, &options, shutdown).await?;
    Ok(())
}
