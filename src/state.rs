// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! Shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::token::TokenIssuer;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::storage::AuthDatabase;

/// Application state shared across all request handlers.
///
/// Cheap to clone: the database handle is reference-counted and the token
/// issuer holds only derived keys.
#[derive(Clone)]
pub struct AppState {
    /// Embedded challenge/user database.
    pub db: Arc<AuthDatabase>,
    /// Session token issuer.
    pub tokens: TokenIssuer,
    /// Data directory, checked by the readiness probe.
    pub data_dir: PathBuf,
}

impl AppState {
    /// Build state from configuration: open the database and derive keys.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ApiError> {
        let db = AuthDatabase::open(&config.data_dir.join("auth.redb"))
            .map_err(|e| ApiError::internal(format!("failed to open database: {e}")))?;

        Ok(Self {
            db: Arc::new(db),
            tokens: TokenIssuer::new(&config.jwt_secret),
            data_dir: config.data_dir.clone(),
        })
    }
}
