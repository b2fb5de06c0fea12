// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! Axum extractors for authenticated and proof-bound requests.
//!
//! Use the `Auth` extractor in handlers to require a valid session token:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```
//!
//! Use `DpopBound` where the route additionally requires a fresh DPoP proof
//! signed by the device key the session is bound to.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{error::AuthError, proof};
use crate::models::WalletAddress;
use crate::state::AppState;

/// Header carrying the per-request proof envelope.
const DPOP_HEADER: &str = "dpop";

/// An authenticated user, as established by a verified session token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Canonical user id (token `sub`).
    pub user_id: String,
    /// Wallet address the session was authenticated with.
    pub wallet_address: WalletAddress,
    /// Device public key (JWK) the session is bound to.
    pub public_key: String,
    /// Token expiration timestamp (seconds).
    pub expires_at: i64,
}

/// Extractor for authenticated users.
///
/// Validates the Bearer token from the Authorization header. Does NOT check
/// the DPoP proof; use [`DpopBound`] for routes that require possession of
/// the device key.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        // Extract Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let claims = state.tokens.verify(token)?;

        Ok(Auth(AuthenticatedUser {
            user_id: claims.sub,
            wallet_address: WalletAddress::from(claims.wallet_address),
            public_key: claims.public_key,
            expires_at: claims.exp,
        }))
    }
}

/// Extractor for proof-of-possession-bound requests.
///
/// Runs [`Auth`] first, then validates the `DPoP` header against the
/// request's method, path, and the public key embedded in the session token.
/// A valid stolen token without the device private key cannot produce the
/// proof, so it fails here.
pub struct DpopBound(pub AuthenticatedUser);

impl FromRequestParts<AppState> for DpopBound {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        let proof_header = parts
            .headers
            .get(DPOP_HEADER)
            .ok_or(AuthError::InvalidProof)?
            .to_str()
            .map_err(|_| AuthError::InvalidProof)?;

        // Origin-form URL: path plus query, the form the client signs.
        let url = parts.uri.to_string();

        proof::verify_proof(
            proof_header,
            parts.method.as_str(),
            &url,
            &user.public_key,
        )
        .map_err(|e| {
            tracing::warn!(user_id = %user.user_id, error = %e, "DPoP proof rejected");
            AuthError::InvalidProof
        })?;

        Ok(DpopBound(user))
    }
}
