//! Server configuration.
//!
//! The on-disk form (`ServerConfigFile`) is plain JSON with string-encoded
//! fields; `to_config` turns it into the runtime form, validating user IDs
//! and fallback destinations on the way.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fallback::FallbackEntry;
use crate::validator::User;

/// Runtime server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to listen on, e.g. "0.0.0.0:8443"
    pub listen: String,
    /// User accounts loaded at startup
    pub users: Vec<User>,
    /// Fallback table entries
    pub fallbacks: Vec<FallbackEntry>,
    /// Whether response traffic is morphed per user policy
    pub morphing: bool,
    /// Handshake deadline
    pub handshake_timeout: Duration,
}

impl ServerConfig {
    /// Validate invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.listen.is_empty() {
            return Err(Error::config("listen address cannot be empty"));
        }
        if self.users.is_empty() {
            return Err(Error::config("at least one client must be configured"));
        }
        for fb in &self.fallbacks {
            if fb.dest.is_empty() {
                return Err(Error::config("fallback dest cannot be empty"));
            }
        }
        Ok(())
    }
}

/// One client account in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientEntry {
    /// User ID as a UUID string
    pub id: String,
    /// Unique email handle
    pub email: String,
    /// Morphing policy: "", "youtube", "zoom", "http2-api" or "default"
    #[serde(default)]
    pub policy: String,
    /// Policy level
    #[serde(default)]
    pub level: u32,
}

/// One fallback entry in the configuration file. Empty strings match any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackFileEntry {
    /// SNI or Host to match
    #[serde(default)]
    pub name: String,
    /// ALPN to match
    #[serde(default)]
    pub alpn: String,
    /// HTTP path to match
    #[serde(default)]
    pub path: String,
    /// "host:port", or a bare port for 127.0.0.1
    pub dest: String,
    /// PROXY-protocol version toward the destination; 0 = off
    #[serde(default)]
    pub xver: u64,
}

fn default_morphing() -> bool {
    true
}

fn default_handshake_timeout_secs() -> u64 {
    crate::HANDSHAKE_TIMEOUT_MS / 1000
}

/// Configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfigFile {
    /// Listen address
    pub listen: String,
    /// Client accounts
    pub clients: Vec<ClientEntry>,
    /// Fallback entries
    #[serde(default)]
    pub fallbacks: Vec<FallbackFileEntry>,
    /// Traffic morphing switch
    #[serde(default = "default_morphing")]
    pub morphing: bool,
    /// Handshake deadline in seconds
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

impl ServerConfigFile {
    /// Convert to the runtime configuration.
    pub fn to_config(&self) -> Result<ServerConfig> {
        let mut users = Vec::with_capacity(self.clients.len());
        for client in &self.clients {
            users.push(User::new(
                &client.id,
                client.email.clone(),
                client.policy.clone(),
                client.level,
            )?);
        }

        let fallbacks = self
            .fallbacks
            .iter()
            .map(|fb| FallbackEntry {
                name: fb.name.clone(),
                alpn: fb.alpn.clone(),
                path: fb.path.clone(),
                dest: fb.dest.clone(),
                xver: fb.xver,
            })
            .collect();

        let config = ServerConfig {
            listen: self.listen.clone(),
            users,
            fallbacks,
            morphing: self.morphing,
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// An example configuration with a freshly generated client.
    pub fn example() -> Self {
        Self {
            listen: "0.0.0.0:8443".to_string(),
            clients: vec![ClientEntry {
                id: uuid::Uuid::new_v4().to_string(),
                email: "user@example.com".to_string(),
                policy: "http2-api".to_string(),
                level: 0,
            }],
            fallbacks: vec![FallbackFileEntry {
                name: String::new(),
                alpn: String::new(),
                path: String::new(),
                dest: "80".to_string(),
                xver: 0,
            }],
            morphing: true,
            handshake_timeout_secs: default_handshake_timeout_secs(),
        }
    }
}
