//! Object exchange server.
//!
//! Serves the default catalog until Ctrl-C.

use clap::Parser;
use tracing::info;

use object_exchange::config::AppConfig;
use object_exchange::service::server::start_server;
use object_exchange::utils::logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "object-server", about = "Serve typed object collections over TCP")]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listen address
    #[arg(short, long)]
    address: Option<String>,

    /// Override the maximum number of concurrent clients
    #[arg(short, long)]
    max_clients: Option<usize>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("{}", AppConfig::example_config());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(max_clients) = args.max_clients {
        config.server.max_clients = max_clients;
    }

    init_logging(&config.logging)?;
    info!(address = %config.server.address, "Starting object server");

    start_server(&config.server).await?;
    Ok(())
}
