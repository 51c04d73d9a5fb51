//! Interactive object exchange client.
//!
//! Takes the next identifier from the counter file, connects, and offers a
//! small menu: list classes, request a class, or end the session.

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::warn;

use object_exchange::config::AppConfig;
use object_exchange::protocol::catalog::Category;
use object_exchange::service::client::{connect, ClientSession, Connect};
use object_exchange::utils::client_id::ClientIdCounter;
use object_exchange::utils::logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "object-client", about = "Request typed object collections from a server")]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Override the server address
    #[arg(short, long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(address) = args.address {
        config.client.address = address;
    }
    init_logging(&config.logging)?;

    let client_id = ClientIdCounter::new(&config.client.id_file).next_id()?;
    let mut session = match connect(&config.client.address, client_id).await? {
        Connect::Admitted(session) => {
            println!("[client {client_id}] STATUS = OK - connected");
            session
        }
        Connect::Refused => {
            println!("[client {client_id}] STATUS = REFUSED");
            return Ok(());
        }
    };

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("\n=== MENU ===");
        println!("1. List classes");
        println!("2. Request objects");
        println!("3. End session");

        let Some(choice) = prompt(&mut input, "Choose an option: ").await? else {
            break;
        };

        match choice.as_str() {
            "1" => {
                println!("\nAvailable classes:");
                for category in Category::ALL {
                    println!("- {category}");
                }
            }
            "2" => {
                let Some(name) = prompt(&mut input, "Class name: ").await? else {
                    break;
                };
                match Category::from_class_name(&name) {
                    Some(category) => request(&mut session, category).await?,
                    None => println!("Unknown class"),
                }
            }
            "3" => break,
            _ => println!("Invalid option"),
        }
    }

    let client_id = session.client_id();
    if let Err(e) = session.bye().await {
        warn!(error = %e, "Failed to say goodbye");
    }
    println!("[client {client_id}] DISCONNECTED");
    Ok(())
}

/// Print `label` and read one trimmed line; `None` on end of input
async fn prompt(input: &mut Lines<BufReader<Stdin>>, label: &str) -> anyhow::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

/// Request one class and print what came back.
///
/// Decode and type errors are shown and the session carries on; only a
/// broken connection ends the run.
async fn request(session: &mut ClientSession, category: Category) -> anyhow::Result<()> {
    let client_id = session.client_id();
    match session.request(category).await {
        Ok(records) => {
            for record in records {
                println!("[client {client_id}] {record}");
            }
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            println!("[client {client_id}] ERROR ({category}): {e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
