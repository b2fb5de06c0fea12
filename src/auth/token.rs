// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! Session token issuance and verification.
//!
//! Session tokens are HS256 JWTs embedding the user id, wallet address, and
//! the device public key the session is bound to. The server keeps no token
//! state; validity is determined entirely by signature and expiry. A refresh
//! re-issues a token with the same embedded public key, so the DPoP binding
//! survives for the lifetime of the device keypair.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Fixed session token lifetime (7 days).
pub const TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Canonical user id.
    pub sub: String,
    /// Wallet address the session was authenticated with.
    #[serde(rename = "walletAddress")]
    pub wallet_address: String,
    /// Device public key (JWK) the token is bound to.
    #[serde(rename = "publicKey")]
    pub public_key: String,
    /// Issued-at timestamp (seconds).
    pub iat: i64,
    /// Expiration timestamp (seconds).
    pub exp: i64,
}

/// Issues and verifies HS256 session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    /// Create an issuer from the shared HMAC secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a new token bound to (user id, wallet address, public key).
    pub fn issue(
        &self,
        user_id: &str,
        wallet_address: &str,
        public_key: &str,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            wallet_address: wallet_address.to_string(),
            public_key: public_key.to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECONDS,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verify a token and return its claims.
    ///
    /// Expired tokens fail with `TokenExpired` and require a fresh challenge
    /// flow; any other defect maps to `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}
