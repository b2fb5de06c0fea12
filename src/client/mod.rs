// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! # Device Client
//!
//! Client-side pieces of the auth flow: the persistent device keypair
//! ([`keystore`]), local session storage ([`session`]), the typed HTTP
//! client ([`api`]), and [`DeviceContext`] composing all three.
//!
//! A login runs in two halves. [`DeviceContext::begin_login`] ensures the
//! device keypair exists and requests a challenge; the challenge string
//! then travels out-of-band to the companion wallet for signing. Once the
//! signature comes back, [`DeviceContext::complete_login`] exchanges it for
//! a session token and persists the session locally.

pub mod api;
pub mod keystore;
pub mod session;

pub use api::AuthClient;
pub use keystore::{DeviceKeypair, DeviceKeystore};
pub use session::SessionStore;

use std::path::Path;

use crate::auth::proof::{self, ProofError};
use crate::models::{AuthResponse, ChallengeResponse, UserProjection, VerifyRequest, WalletAddress};

/// Client-side error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("key error: {0}")]
    Key(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("device keypair has not been generated yet")]
    KeyNotReady,

    #[error("no active session; log in first")]
    MissingSession,

    #[error("proof generation failed: {0}")]
    Proof(#[from] ProofError),
}

/// Composes keystore, session store, and HTTP client into the login flow.
pub struct DeviceContext {
    keystore: DeviceKeystore,
    session: SessionStore,
    api: AuthClient,
}

impl DeviceContext {
    /// Create a context storing keys and session under `state_dir`.
    pub fn new(base_url: &str, state_dir: impl AsRef<Path>) -> Result<Self, ClientError> {
        let state_dir = state_dir.as_ref();
        Ok(Self {
            keystore: DeviceKeystore::new(state_dir),
            session: SessionStore::new(state_dir),
            api: AuthClient::new(base_url)?,
        })
    }

    /// Start a login: ensure the device keypair exists and request a
    /// challenge bound to its public key.
    ///
    /// The returned challenge string must be signed by the wallet before
    /// calling [`complete_login`].
    pub async fn begin_login(&self) -> Result<ChallengeResponse, ClientError> {
        let keypair = self.keystore.ensure_keypair()?;
        self.api.request_challenge(keypair.public_key_jwk()).await
    }

    /// Finish a login with the wallet's signature over the challenge.
    pub async fn complete_login(
        &self,
        challenge_id: &str,
        signature: &str,
        wallet_address: WalletAddress,
    ) -> Result<AuthResponse, ClientError> {
        let response = self
            .api
            .verify(&VerifyRequest {
                challenge_id: challenge_id.to_string(),
                signature: signature.to_string(),
                wallet_address,
            })
            .await?;

        self.session.save(&response.token, &response.user)?;
        Ok(response)
    }

    /// Re-issue the session token, keeping the device key binding.
    pub async fn refresh_session(&self) -> Result<AuthResponse, ClientError> {
        let token = self.session.token().ok_or(ClientError::MissingSession)?;
        let response = self.api.refresh(&token).await?;
        self.session.save(&response.token, &response.user)?;
        Ok(response)
    }

    /// Fetch the current user over the proof-bound endpoint.
    pub async fn fetch_me(&self) -> Result<UserProjection, ClientError> {
        let token = self.session.token().ok_or(ClientError::MissingSession)?;
        let keypair = self
            .keystore
            .load_keypair()?
            .ok_or(ClientError::KeyNotReady)?;

        let nonce = proof::generate_nonce()?;
        let proof = proof::generate_proof(
            keypair.signing_key(),
            keypair.public_key_jwk(),
            "GET",
            AuthClient::me_proof_url(),
            &nonce,
        )?;

        let response = self.api.me(&token, &proof).await?;
        Ok(response.user)
    }

    /// The locally cached user, if a session exists.
    pub fn cached_user(&self) -> Option<UserProjection> {
        self.session.user()
    }

    /// End the session: drop the token, cached user, and device keypair.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.session.clear()?;
        self.keystore.clear()?;
        Ok(())
    }
}
