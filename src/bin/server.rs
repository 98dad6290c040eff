//! Reflex server binary.
//!
//! Usage: reflex-server [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>  Run with the given configuration file
//!   -g, --generate       Print a fresh example configuration
//!   -h, --help           Print help information

use std::env;
use std::sync::Arc;

use reflex::server::{ReflexServer, ServerConfigFile};
use reflex::session::DirectDispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Respects RUST_LOG (e.g. RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "-h" | "--help" => {
            print_usage();
        }
        "-g" | "--generate" => {
            generate_config()?;
        }
        "-c" | "--config" => {
            if args.len() < 3 {
                eprintln!("Error: --config requires a file path");
                std::process::exit(1);
            }
            run_server(&args[2]).await?;
        }
        other => {
            eprintln!("Unknown option: {other}");
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_usage() {
    println!("Reflex server");
    println!();
    println!("Usage: reflex-server [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <FILE>  Run with the given configuration file");
    println!("  -g, --generate       Print a fresh example configuration");
    println!("  -h, --help           Print help information");
}

fn generate_config() -> anyhow::Result<()> {
    let example = ServerConfigFile::example();
    println!("{}", serde_json::to_string_pretty(&example)?);
    Ok(())
}

async fn run_server(path: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let file: ServerConfigFile = serde_json::from_str(&raw)?;
    let config = file.to_config()?;

    let server = ReflexServer::new(config, Arc::new(DirectDispatcher))?;
    server.run().await?;
    Ok(())
}
