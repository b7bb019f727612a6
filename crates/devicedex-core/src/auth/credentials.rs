use anyhow::{Context, Result};
use keyring::Entry;

use crate::config::APP_NAME;

/// Keychain access for the admin upload token, one entry per admin username.
pub struct CredentialStore;

impl CredentialStore {
    /// Store an admin token in the OS keychain
    pub fn store_token(username: &str, token: &str) -> Result<()> {
        let entry = Entry::new(APP_NAME, username).context("Failed to create keyring entry")?;
        entry
            .set_password(token)
            .context("Failed to store admin token in keychain")?;
        Ok(())
    }

    /// Retrieve the admin token for a username from the OS keychain
    pub fn get_token(username: &str) -> Result<String> {
        let entry = Entry::new(APP_NAME, username).context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve admin token from keychain")
    }

    /// Delete the stored token for a username. A missing entry is not an error.
    pub fn delete(username: &str) -> Result<()> {
        let entry = Entry::new(APP_NAME, username).context("Failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete admin token from keychain"),
        }
    }

    /// Check if a token exists for a username
    pub fn has_token(username: &str) -> bool {
        Entry::new(APP_NAME, username)
            .and_then(|entry| entry.get_password())
            .is_ok()
    }
}
