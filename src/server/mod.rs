//! Server infrastructure.
//!
//! Owns the listening socket and the shared state every connection needs:
//! the validator, the fallback table and the metrics collector. Each
//! accepted connection runs on its own task; independent connections never
//! block one another.

mod config;
mod metrics;

pub use config::{ClientEntry, FallbackFileEntry, ServerConfig, ServerConfigFile};
pub use metrics::{MetricsSnapshot, ServerMetrics};

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fallback::FallbackTable;
use crate::session::{Dispatcher, Inbound, InboundOutcome};
use crate::validator::Validator;

/// A running Reflex server instance.
pub struct ReflexServer {
    listen: String,
    inbound: Arc<Inbound>,
    validator: Arc<Validator>,
    metrics: Arc<ServerMetrics>,
}

impl ReflexServer {
    /// Build a server from configuration and a dispatcher.
    pub fn new(config: ServerConfig, dispatcher: Arc<dyn Dispatcher>) -> Result<Self> {
        config.validate()?;

        let validator = Arc::new(Validator::new());
        for user in &config.users {
            validator.add(user.clone());
        }

        let inbound = Inbound::new(
            Arc::clone(&validator),
            FallbackTable::new(config.fallbacks),
            dispatcher,
        )
        .with_handshake_timeout(config.handshake_timeout)
        .with_morphing(config.morphing);

        Ok(Self {
            listen: config.listen,
            inbound: Arc::new(inbound),
            validator,
            metrics: Arc::new(ServerMetrics::new()),
        })
    }

    /// The user validator, for runtime account management.
    pub fn validator(&self) -> Arc<Validator> {
        Arc::clone(&self.validator)
    }

    /// The metrics collector.
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Bind the configured address and serve until the task is dropped.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.listen).await?;
        info!(listen = %self.listen, "reflex server listening");
        self.run_on(listener).await
    }

    /// Serve connections from an already-bound listener.
    pub async fn run_on(&self, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    stream.set_nodelay(true).ok();

                    let inbound = Arc::clone(&self.inbound);
                    let metrics = Arc::clone(&self.metrics);

                    tokio::spawn(async move {
                        metrics.connection_opened();

                        match inbound.handle(stream).await {
                            Ok(InboundOutcome::Session) => {
                                metrics.session_completed();
                                debug!(%peer, "session finished");
                            }
                            Ok(InboundOutcome::Fallback) => {
                                metrics.fallback_taken();
                                debug!(%peer, "fallback finished");
                            }
                            Err(e) => {
                                metrics.connection_failed();
                                debug!(%peer, error = %e, "connection failed");
                            }
                        }

                        metrics.connection_closed();
                    });
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
