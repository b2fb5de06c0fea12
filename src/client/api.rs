// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! HTTP client for the auth endpoints.
//!
//! Thin typed wrapper over reqwest. Error bodies are parsed into
//! [`ClientError::Api`] so callers see the server's status and message
//! rather than a bare deserialization failure.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::{
    AuthResponse, ChallengeRequest, ChallengeResponse, UserResponse, VerifyRequest,
};

use super::ClientError;

/// Request timeout for all calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body shape shared by all endpoints.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Typed client for the auth API.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    /// Create a client for the given server base URL.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `POST /v1/auth/challenge`: request a challenge bound to the device key.
    pub async fn request_challenge(
        &self,
        public_key_jwk: &str,
    ) -> Result<ChallengeResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/v1/auth/challenge", self.base_url))
            .json(&ChallengeRequest {
                public_key: public_key_jwk.to_string(),
            })
            .send()
            .await?;
        parse(response).await
    }

    /// `POST /v1/auth/verify`: exchange a signed challenge for a session.
    pub async fn verify(&self, request: &VerifyRequest) -> Result<AuthResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/v1/auth/verify", self.base_url))
            .json(request)
            .send()
            .await?;
        parse(response).await
    }

    /// `POST /v1/auth/refresh`: re-issue the session token.
    pub async fn refresh(&self, token: &str) -> Result<AuthResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/v1/auth/refresh", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        parse(response).await
    }

    /// `GET /v1/users/me`: fetch the current user, proving key possession.
    pub async fn me(&self, token: &str, proof: &str) -> Result<UserResponse, ClientError> {
        let response = self
            .http
            .get(format!("{}/v1/users/me", self.base_url))
            .bearer_auth(token)
            .header("DPoP", proof)
            .send()
            .await?;
        parse(response).await
    }

    /// The origin-form URL a proof for `GET /v1/users/me` must bind.
    pub fn me_proof_url() -> &'static str {
        "/v1/users/me"
    }
}

async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
