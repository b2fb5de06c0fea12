// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! Authentication errors.
//!
//! All credential-validity failures (unknown/used/expired challenge, bad
//! wallet signature, invalid or expired token, bad DPoP proof) map to 401
//! with a single generic body. Distinguishing them in the response would
//! leak challenge state to an attacker probing the verify endpoint, so the
//! specific variant only ever reaches the server-side log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,
    /// Invalid authorization header format
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// Session token is malformed or carries a bad signature
    #[error("Session token is invalid")]
    InvalidToken,
    /// Session token has expired
    #[error("Session token has expired")]
    TokenExpired,
    /// Challenge does not exist or has already been consumed.
    /// Both cases are deliberately indistinguishable to the caller.
    #[error("Challenge not found or already used")]
    ChallengeNotFound,
    /// Challenge expired before verification
    #[error("Challenge has expired")]
    ChallengeExpired,
    /// Wallet signature did not recover to the claimed address
    #[error("Wallet signature verification failed")]
    InvalidSignature,
    /// DPoP proof failed validation
    #[error("DPoP proof verification failed")]
    InvalidProof,
    /// Internal error
    #[error("Internal authentication error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    success: bool,
    error: String,
}

impl AuthError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::ChallengeNotFound
            | AuthError::ChallengeExpired
            | AuthError::InvalidSignature
            | AuthError::InvalidProof => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message exposed in the response body.
    ///
    /// Header-format problems get an actionable message; everything else is
    /// collapsed so the response does not disclose which check failed.
    pub(crate) fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "Authorization header is required",
            AuthError::InvalidAuthHeader => {
                "Invalid authorization header format (expected 'Bearer <token>')"
            }
            AuthError::Internal(_) => "Internal server error",
            _ => "Authentication failed",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(error = %self, status = %status, "authentication rejected");
        let body = Json(AuthErrorBody {
            success: false,
            error: self.public_message().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_auth_returns_401() {
        let response = AuthError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Authorization header is required");
    }

    #[tokio::test]
    async fn credential_failures_share_one_body() {
        for error in [
            AuthError::ChallengeNotFound,
            AuthError::ChallengeExpired,
            AuthError::InvalidSignature,
            AuthError::TokenExpired,
            AuthError::InvalidToken,
            AuthError::InvalidProof,
        ] {
            let response = error.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
            assert_eq!(body["error"], "Authentication failed");
        }
    }

    #[test]
    fn internal_maps_to_500() {
        let error = AuthError::Internal("db down".into());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
