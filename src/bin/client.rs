//! Reflex client binary.
//!
//! Listens on a local TCP port and tunnels every accepted connection
//! through a Reflex server to a fixed destination.
//!
//! Usage: reflex-client [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>  Run with the given configuration file
//!   -g, --generate       Print a fresh example configuration
//!   -h, --help           Print help information

use std::env;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use reflex::session::{Command, Destination, Outbound};
use reflex::validator::User;

/// Client configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClientConfigFile {
    /// Reflex server address, "host:port"
    server: String,
    /// Local listen address, e.g. "127.0.0.1:1080"
    listen: String,
    /// User ID as a UUID string
    id: String,
    /// Morphing policy tag
    #[serde(default)]
    policy: String,
    /// Whether to morph request traffic
    #[serde(default = "default_morphing")]
    morphing: bool,
    /// Destination to request, "host:port"
    target: String,
}

fn default_morphing() -> bool {
    true
}

impl ClientConfigFile {
    fn example() -> Self {
        Self {
            server: "proxy.example.com:8443".to_string(),
            listen: "127.0.0.1:1080".to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            policy: "http2-api".to_string(),
            morphing: true,
            target: "example.com:80".to_string(),
        }
    }

    fn target_destination(&self) -> anyhow::Result<Destination> {
        let (host, port) = self
            .target
            .rsplit_once(':')
            .context("target must be host:port")?;
        let port: u16 = port.parse().context("invalid target port")?;
        Ok(match host.parse() {
            Ok(std::net::IpAddr::V4(ip)) => Destination {
                address: reflex::session::Address::Ipv4(ip),
                port,
            },
            Ok(std::net::IpAddr::V6(ip)) => Destination {
                address: reflex::session::Address::Ipv6(ip),
                port,
            },
            Err(_) => Destination::domain(host, port),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
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
            println!("{}", serde_json::to_string_pretty(&ClientConfigFile::example())?);
        }
        "-c" | "--config" => {
            if args.len() < 3 {
                eprintln!("Error: --config requires a file path");
                std::process::exit(1);
            }
            run_client(&args[2]).await?;
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
    println!("Reflex client");
    println!();
    println!("Usage: reflex-client [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <FILE>  Run with the given configuration file");
    println!("  -g, --generate       Print a fresh example configuration");
    println!("  -h, --help           Print help information");
}

async fn run_client(path: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let config: ClientConfigFile = serde_json::from_str(&raw)?;

    let user = User::new(&config.id, "local", config.policy.clone(), 0)?;
    let destination = config.target_destination()?;
    let outbound = Arc::new(Outbound::new(&user).with_morphing(config.morphing));

    let listener = TcpListener::bind(&config.listen).await?;
    info!(listen = %config.listen, server = %config.server, target = %destination,
        "reflex client listening");

    loop {
        let (local, peer) = listener.accept().await?;
        local.set_nodelay(true).ok();

        let outbound = Arc::clone(&outbound);
        let server_addr = config.server.clone();
        let destination = destination.clone();

        tokio::spawn(async move {
            let server = match TcpStream::connect(&server_addr).await {
                Ok(stream) => {
                    stream.set_nodelay(true).ok();
                    stream
                }
                Err(e) => {
                    debug!(%peer, error = %e, "failed to reach server");
                    return;
                }
            };

            match outbound.run(server, Command::Tcp, &destination, local).await {
                Ok(()) => debug!(%peer, "tunnel finished"),
                Err(e) => debug!(%peer, error = %e, "tunnel failed"),
            }
        });
    }
}
