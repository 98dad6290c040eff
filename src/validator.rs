//! User validation.
//!
//! Maps the 16-byte user ID presented in a client handshake to an account
//! record. Lookups happen once per connection on the hot accept path, so
//! the map sits behind a readers/writer lock: any number of concurrent
//! readers, one writer at a time.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A Reflex user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// 16-byte identifier, unique within one validator
    pub id: [u8; 16],
    /// Email, used as the human-facing handle for removal
    pub email: String,
    /// Traffic-morphing policy tag ("youtube", "zoom", "http2-api", "")
    pub policy: String,
    /// Policy level, forwarded to the platform's session policy
    pub level: u32,
}

impl User {
    /// Create a user from a UUID string.
    pub fn new(id: &str, email: impl Into<String>, policy: impl Into<String>, level: u32) -> Result<Self> {
        let uuid = Uuid::parse_str(id).map_err(|_| Error::InvalidUuid)?;
        Ok(Self {
            id: *uuid.as_bytes(),
            email: email.into(),
            policy: policy.into(),
            level,
        })
    }
}

/// Concurrent map from user ID to account record.
#[derive(Default)]
pub struct Validator {
    users: RwLock<HashMap<[u8; 16], Arc<User>>>,
}

impl Validator {
    /// Create an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user. A duplicate ID overwrites the existing record; the last
    /// write wins.
    pub fn add(&self, user: User) {
        self.users.write().insert(user.id, Arc::new(user));
    }

    /// Look up a user by raw ID bytes.
    pub fn get(&self, user_id: &[u8; 16]) -> Result<Arc<User>> {
        self.users
            .read()
            .get(user_id)
            .cloned()
            .ok_or(Error::UserNotFound)
    }

    /// Look up a user by UUID string.
    pub fn get_by_uuid(&self, id: &str) -> Result<Arc<User>> {
        let uuid = Uuid::parse_str(id).map_err(|_| Error::InvalidUuid)?;
        self.get(uuid.as_bytes())
    }

    /// Remove the first user whose email matches.
    pub fn remove(&self, email: &str) -> Result<()> {
        let mut users = self.users.write();
        let id = users
            .iter()
            .find(|(_, user)| user.email == email)
            .map(|(id, _)| *id)
            .ok_or(Error::UserNotFound)?;
        users.remove(&id);
        Ok(())
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Whether the validator has no users.
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}
