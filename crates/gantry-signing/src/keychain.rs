//! Credential context: the keychain identity searches are restricted to

use serde::{Deserialize, Serialize};

/// Names the credential container signing identities are looked up in.
///
/// Created once per build run by the caller (keychain creation itself is out
/// of scope) and read-only for the run's duration. Absence means the default
/// system-wide store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialContext {
    keychain: Option<String>,
}

impl CredentialContext {
    /// Search the default system-wide store
    pub fn default_store() -> Self {
        Self { keychain: None }
    }

    /// Restrict searches to a named keychain
    pub fn keychain(name: impl Into<String>) -> Self {
        Self {
            keychain: Some(name.into()),
        }
    }

    /// The keychain name, when searches are restricted
    pub fn keychain_name(&self) -> Option<&str> {
        self.keychain.as_deref()
    }
}

impl std::fmt::Display for CredentialContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.keychain {
            Some(name) => write!(f, "keychain '{name}'"),
            None => write!(f, "default keychain"),
        }
    }
}
