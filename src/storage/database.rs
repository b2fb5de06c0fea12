// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! Embedded auth database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `challenges`: challenge_id → serialized StoredChallenge
//! - `users`: user_id → serialized StoredUser
//! - `wallet_user_map`: lowercase wallet address → user_id
//! - `profiles`: user_id → serialized StoredProfile
//! - `identities`: user_id → serialized StoredIdentity
//!
//! The single-use challenge invariant rides on redb's serialized write
//! transactions: `consume_challenge` reads, checks `used == false`, and marks
//! the row used inside one write transaction, so two racing verifications can
//! never both succeed. Challenges are kept after use as an audit trail;
//! `prune_challenges_expired_before` implements optional retention cleanup.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::auth::challenge::generate_id;
use crate::models::{IdentityProjection, ProfileProjection, UserProjection, WalletAddress};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: challenge_id → serialized StoredChallenge (JSON bytes).
const CHALLENGES: TableDefinition<&str, &[u8]> = TableDefinition::new("challenges");

/// Primary table: user_id → serialized StoredUser (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Index: lowercase wallet address → user_id.
const WALLET_USER_MAP: TableDefinition<&str, &str> = TableDefinition::new("wallet_user_map");

/// Profiles: user_id → serialized StoredProfile (JSON bytes).
const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

/// Identities: user_id → serialized StoredIdentity (JSON bytes).
const IDENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("identities");

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("id generation failed: {0}")]
    IdGeneration(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type AuthDbResult<T> = Result<T, AuthDbError>;

/// Outcome of a failed challenge consumption.
///
/// `NotFound` and `AlreadyUsed` are distinct here for logging and tests, but
/// the API layer maps both to the same external error.
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("challenge not found")]
    NotFound,
    #[error("challenge already used")]
    AlreadyUsed,
    #[error("challenge expired")]
    Expired,
    #[error(transparent)]
    Db(#[from] AuthDbError),
}

// =============================================================================
// Stored Entities
// =============================================================================

/// A server-issued authentication challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredChallenge {
    /// Opaque challenge identifier (`chal_` prefix).
    pub id: String,
    /// The random challenge string the wallet signs.
    pub challenge: String,
    /// Device public key (JWK) the challenge is bound to.
    pub public_key: String,
    /// Wallet address, filled in on successful verification.
    pub wallet_address: Option<String>,
    /// Whether the challenge has been consumed. Monotonic false→true.
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A network user keyed by verified wallet address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    /// Opaque user identifier (`user_` prefix).
    pub id: String,
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
}

/// A user's profile. Created empty when the user is provisioned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredProfile {
    /// Opaque profile identifier (`prof_` prefix).
    pub id: String,
    pub user_id: String,
    pub display_name: Option<String>,
    pub region: Option<String>,
}

/// A claimed identity number. Written by the identity claiming flow; the
/// auth service only reads it into session projections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredIdentity {
    pub user_id: String,
    pub number: String,
    pub is_active: bool,
}

// =============================================================================
// AuthDatabase
// =============================================================================

/// Embedded ACID database for challenges and users.
pub struct AuthDatabase {
    db: Database,
}

impl AuthDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> AuthDbResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CHALLENGES)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(WALLET_USER_MAP)?;
            let _ = write_txn.open_table(PROFILES)?;
            let _ = write_txn.open_table(IDENTITIES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Challenges
    // =========================================================================

    /// Persist a freshly issued challenge.
    pub fn insert_challenge(&self, challenge: &StoredChallenge) -> AuthDbResult<()> {
        let json = serde_json::to_vec(challenge)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CHALLENGES)?;
            table.insert(challenge.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a challenge by id.
    pub fn get_challenge(&self, challenge_id: &str) -> AuthDbResult<Option<StoredChallenge>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHALLENGES)?;
        match table.get(challenge_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Atomically consume a challenge: check `used == false` and not expired,
    /// then mark it used and record the verified wallet address.
    ///
    /// The read-check-mark sequence runs inside a single write transaction,
    /// so at most one of any number of concurrent calls for the same id can
    /// succeed. An expired challenge is left untouched (`used` stays false)
    /// but can never be consumed.
    pub fn consume_challenge(
        &self,
        challenge_id: &str,
        wallet_address: &WalletAddress,
        now: DateTime<Utc>,
    ) -> Result<StoredChallenge, ConsumeError> {
        let write_txn = self.db.begin_write().map_err(AuthDbError::from)?;
        let consumed = {
            let mut table = write_txn.open_table(CHALLENGES).map_err(AuthDbError::from)?;

            let mut challenge: StoredChallenge = {
                let guard = table
                    .get(challenge_id)
                    .map_err(AuthDbError::from)?
                    .ok_or(ConsumeError::NotFound)?;
                serde_json::from_slice(guard.value()).map_err(AuthDbError::from)?
            };

            if challenge.used {
                return Err(ConsumeError::AlreadyUsed);
            }
            if now > challenge.expires_at {
                // Dropping the transaction aborts it; the row stays unused.
                return Err(ConsumeError::Expired);
            }

            challenge.used = true;
            challenge.wallet_address = Some(wallet_address.normalized());

            let json = serde_json::to_vec(&challenge).map_err(AuthDbError::from)?;
            table
                .insert(challenge_id, json.as_slice())
                .map_err(AuthDbError::from)?;
            challenge
        };
        write_txn.commit().map_err(AuthDbError::from)?;
        Ok(consumed)
    }

    /// Retention pruning: delete unused challenges that expired before
    /// `cutoff`. Consumed challenges are kept as an audit trail.
    ///
    /// Returns the number of rows removed.
    pub fn prune_challenges_expired_before(&self, cutoff: DateTime<Utc>) -> AuthDbResult<usize> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(CHALLENGES)?;

            let mut expired_ids = Vec::new();
            for entry in table.iter()? {
                let entry = entry?;
                let challenge: StoredChallenge = serde_json::from_slice(entry.1.value())?;
                if !challenge.used && challenge.expires_at < cutoff {
                    expired_ids.push(entry.0.value().to_string());
                }
            }

            for id in &expired_ids {
                table.remove(id.as_str())?;
            }
            expired_ids.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Resolve the user for a wallet address, provisioning a new user and an
    /// empty profile on first sight.
    ///
    /// Returns the user and whether it was newly created.
    pub fn resolve_or_create_user(
        &self,
        wallet_address: &WalletAddress,
    ) -> AuthDbResult<(StoredUser, bool)> {
        let normalized = wallet_address.normalized();

        let write_txn = self.db.begin_write()?;
        let (user, created) = {
            let mut map = write_txn.open_table(WALLET_USER_MAP)?;
            let mut users = write_txn.open_table(USERS)?;

            let existing_id = map.get(normalized.as_str())?.map(|v| v.value().to_string());
            if let Some(user_id) = existing_id {
                let guard = users
                    .get(user_id.as_str())?
                    .ok_or_else(|| AuthDbError::NotFound(format!("User {user_id}")))?;
                let user: StoredUser = serde_json::from_slice(guard.value())?;
                (user, false)
            } else {
                let user = StoredUser {
                    id: generate_id("user").map_err(|e| AuthDbError::IdGeneration(e.to_string()))?,
                    wallet_address: normalized.clone(),
                    created_at: Utc::now(),
                };
                let json = serde_json::to_vec(&user)?;
                users.insert(user.id.as_str(), json.as_slice())?;
                map.insert(normalized.as_str(), user.id.as_str())?;

                let profile = StoredProfile {
                    id: generate_id("prof").map_err(|e| AuthDbError::IdGeneration(e.to_string()))?,
                    user_id: user.id.clone(),
                    display_name: None,
                    region: None,
                };
                let mut profiles = write_txn.open_table(PROFILES)?;
                let json = serde_json::to_vec(&profile)?;
                profiles.insert(user.id.as_str(), json.as_slice())?;

                (user, true)
            }
        };
        write_txn.commit()?;
        Ok((user, created))
    }

    /// Look up a user by id.
    pub fn get_user(&self, user_id: &str) -> AuthDbResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a user's profile.
    pub fn get_profile(&self, user_id: &str) -> AuthDbResult<Option<StoredProfile>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROFILES)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Update a user's profile fields.
    pub fn update_profile(&self, profile: &StoredProfile) -> AuthDbResult<()> {
        let json = serde_json::to_vec(profile)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PROFILES)?;
            if table.get(profile.user_id.as_str())?.is_none() {
                return Err(AuthDbError::NotFound(format!(
                    "Profile for user {}",
                    profile.user_id
                )));
            }
            table.insert(profile.user_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a user's active identity, if any.
    pub fn get_identity(&self, user_id: &str) -> AuthDbResult<Option<StoredIdentity>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(IDENTITIES)?;
        match table.get(user_id)? {
            Some(value) => {
                let identity: StoredIdentity = serde_json::from_slice(value.value())?;
                Ok(identity.is_active.then_some(identity))
            }
            None => Ok(None),
        }
    }

    /// Record a claimed identity number for a user.
    ///
    /// Called by the identity claiming flow, which lives outside this
    /// service; the auth endpoints only read identities.
    pub fn set_identity(&self, identity: &StoredIdentity) -> AuthDbResult<()> {
        let json = serde_json::to_vec(identity)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(IDENTITIES)?;
            table.insert(identity.user_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Assemble the user projection embedded in auth responses.
    pub fn user_projection(&self, user_id: &str) -> AuthDbResult<Option<UserProjection>> {
        let Some(user) = self.get_user(user_id)? else {
            return Ok(None);
        };

        let identity = self
            .get_identity(user_id)?
            .map(|identity| IdentityProjection {
                number: identity.number,
            });
        let profile = self.get_profile(user_id)?.map(|profile| ProfileProjection {
            display_name: profile.display_name,
            region: profile.region,
        });

        Ok(Some(UserProjection {
            id: user.id,
            wallet_address: WalletAddress::from(user.wallet_address),
            identity,
            profile,
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================
