// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! Local session persistence.
//!
//! The session token and the last-seen user projection are stored under
//! fixed file names in the client state directory. Both are cleared on
//! logout; the token alone is replaced on refresh.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::models::UserProjection;

use super::ClientError;

const TOKEN_FILE: &str = "session_token.jwt";
const USER_FILE: &str = "session_user.json";

/// File-backed store for the current session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    state_dir: PathBuf,
}

impl SessionStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            state_dir: state_dir.as_ref().to_path_buf(),
        }
    }

    /// Persist a token and the user it belongs to.
    pub fn save(&self, token: &str, user: &UserProjection) -> Result<(), ClientError> {
        if !self.state_dir.exists() {
            fs::create_dir_all(&self.state_dir)?;
        }

        let token_path = self.state_dir.join(TOKEN_FILE);
        fs::write(&token_path, token)?;
        let mut perms = fs::metadata(&token_path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&token_path, perms)?;

        let json = serde_json::to_vec_pretty(user)
            .map_err(|e| ClientError::Key(format!("user serialization failed: {e}")))?;
        fs::write(self.state_dir.join(USER_FILE), json)?;
        Ok(())
    }

    /// Replace only the stored token, keeping the user projection.
    pub fn replace_token(&self, token: &str) -> Result<(), ClientError> {
        if !self.state_dir.exists() {
            fs::create_dir_all(&self.state_dir)?;
        }
        let token_path = self.state_dir.join(TOKEN_FILE);
        fs::write(&token_path, token)?;
        let mut perms = fs::metadata(&token_path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&token_path, perms)?;
        Ok(())
    }

    /// The stored session token, if any.
    pub fn token(&self) -> Option<String> {
        fs::read_to_string(self.state_dir.join(TOKEN_FILE))
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// The stored user projection, if any.
    pub fn user(&self) -> Option<UserProjection> {
        let bytes = fs::read(self.state_dir.join(USER_FILE)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Remove the stored session.
    pub fn clear(&self) -> Result<(), ClientError> {
        for file in [TOKEN_FILE, USER_FILE] {
            let path = self.state_dir.join(file);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WalletAddress;
    use tempfile::TempDir;

    fn sample_user() -> UserProjection {
        UserProjection {
            id: "user_1".into(),
            wallet_address: WalletAddress::from("0xAAA"),
            identity: None,
            profile: None,
        }
    }

    #[test]
    fn save_load_clear_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());

        assert!(store.token().is_none());
        assert!(store.user().is_none());

        store.save("token-abc", &sample_user()).unwrap();
        assert_eq!(store.token().as_deref(), Some("token-abc"));
        assert_eq!(store.user().unwrap().id, "user_1");

        store.clear().unwrap();
        assert!(store.token().is_none());
        assert!(store.user().is_none());
    }

    #[test]
    fn replace_token_keeps_user() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());

        store.save("token-old", &sample_user()).unwrap();
        store.replace_token("token-new").unwrap();

        assert_eq!(store.token().as_deref(), Some("token-new"));
        assert_eq!(store.user().unwrap().id, "user_1");
    }

    #[test]
    fn token_file_is_owner_only() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        store.save("token", &sample_user()).unwrap();

        let metadata = fs::metadata(dir.path().join(TOKEN_FILE)).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }
}
