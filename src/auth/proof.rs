// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! DPoP proof envelopes.
//!
//! A proof is a short-lived, per-request artifact binding the request's
//! method and URL to the device keypair:
//!
//! ```text
//! base64( { "payload": "<json string>", "signature": "<base64 r||s>" } )
//! payload = { "method", "url", "nonce", "timestamp", "publicKey" }
//! ```
//!
//! The signature is P-256 ECDSA (SHA-256) over the exact payload string.
//! Signing the serialized string rather than a re-encoded structure means
//! verifier and prover never have to agree on JSON canonicalization.
//!
//! Proofs are never persisted; the server validates and discards them.

use base64ct::{Base64, Encoding};
use chrono::Utc;
use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

/// Maximum accepted proof age (60 seconds).
pub const PROOF_MAX_AGE_MS: i64 = 60_000;

/// Tolerance for clocks slightly ahead of the server (5 seconds).
pub const PROOF_MAX_FUTURE_SKEW_MS: i64 = 5_000;

/// Proof validation failure. Callers must treat every variant as request
/// rejection; none are retryable.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("proof envelope is malformed")]
    Malformed,
    #[error("proof method does not match request")]
    MethodMismatch,
    #[error("proof url does not match request")]
    UrlMismatch,
    #[error("proof public key does not match session binding")]
    KeyMismatch,
    #[error("proof timestamp outside the replay window")]
    TimestampOutOfWindow,
    #[error("proof signature verification failed")]
    InvalidSignature,
    #[error("proof generation failed: {0}")]
    Generation(String),
}

/// Outer proof envelope.
#[derive(Debug, Serialize, Deserialize)]
struct ProofEnvelope {
    /// The serialized payload string, exactly as signed.
    payload: String,
    /// Base64-encoded raw P-256 signature (64 bytes, r||s).
    signature: String,
}

/// Signed proof payload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofPayload {
    method: String,
    url: String,
    nonce: String,
    /// Epoch milliseconds at generation time.
    timestamp: i64,
    public_key: String,
}

/// Generate a random base64 nonce for a proof.
pub fn generate_nonce() -> Result<String, ProofError> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| ProofError::Generation("system RNG failure".to_string()))?;
    Ok(Base64::encode_string(&bytes))
}

/// Generate a proof for a request about to be sent.
pub fn generate_proof(
    signing_key: &SigningKey,
    public_key_jwk: &str,
    method: &str,
    url: &str,
    nonce: &str,
) -> Result<String, ProofError> {
    let payload = ProofPayload {
        method: method.to_string(),
        url: url.to_string(),
        nonce: nonce.to_string(),
        timestamp: Utc::now().timestamp_millis(),
        public_key: public_key_jwk.to_string(),
    };
    encode_envelope(signing_key, &payload)
}

fn encode_envelope(signing_key: &SigningKey, payload: &ProofPayload) -> Result<String, ProofError> {
    let payload_string = serde_json::to_string(payload)
        .map_err(|e| ProofError::Generation(format!("payload serialization: {e}")))?;

    let signature: Signature = signing_key.sign(payload_string.as_bytes());
    let envelope = ProofEnvelope {
        payload: payload_string,
        signature: Base64::encode_string(signature.to_bytes().as_slice()),
    };

    let envelope_json = serde_json::to_string(&envelope)
        .map_err(|e| ProofError::Generation(format!("envelope serialization: {e}")))?;
    Ok(Base64::encode_string(envelope_json.as_bytes()))
}

/// Verify a proof header against the incoming request and the public key
/// bound to the session token.
///
/// Checks, in order: envelope decoding (fail closed), method and URL
/// binding, key binding, replay window, and finally the signature over the
/// payload string.
pub fn verify_proof(
    proof_header: &str,
    method: &str,
    url: &str,
    expected_public_key: &str,
) -> Result<(), ProofError> {
    let envelope_json = Base64::decode_vec(proof_header).map_err(|_| ProofError::Malformed)?;
    let envelope: ProofEnvelope =
        serde_json::from_slice(&envelope_json).map_err(|_| ProofError::Malformed)?;
    let payload: ProofPayload =
        serde_json::from_str(&envelope.payload).map_err(|_| ProofError::Malformed)?;

    if payload.method != method {
        return Err(ProofError::MethodMismatch);
    }
    if payload.url != url {
        return Err(ProofError::UrlMismatch);
    }
    if payload.public_key != expected_public_key {
        return Err(ProofError::KeyMismatch);
    }

    let age = Utc::now().timestamp_millis() - payload.timestamp;
    if age > PROOF_MAX_AGE_MS || age < -PROOF_MAX_FUTURE_SKEW_MS {
        return Err(ProofError::TimestampOutOfWindow);
    }

    let public_key =
        p256::PublicKey::from_jwk_str(expected_public_key).map_err(|_| ProofError::Malformed)?;
    let verifying_key = VerifyingKey::from(&public_key);

    let signature_bytes =
        Base64::decode_vec(&envelope.signature).map_err(|_| ProofError::Malformed)?;
    let signature =
        Signature::from_slice(&signature_bytes).map_err(|_| ProofError::Malformed)?;

    verifying_key
        .verify(envelope.payload.as_bytes(), &signature)
        .map_err(|_| ProofError::InvalidSignature)
}
