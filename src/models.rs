// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize`, `Deserialize`, and `ToSchema`
//! for automatic JSON handling and OpenAPI documentation.
//!
//! Wire field names are camelCase to match the mobile and web clients.
//!
//! ## Wallet Address Type
//!
//! The [`WalletAddress`] newtype wraps Ethereum-style addresses (0x-prefixed,
//! 40 hex characters). Addresses compare case-insensitively; signatures are
//! recovered to checksummed form before comparison.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Wallet Address Type
// =============================================================================

/// Ethereum-compatible wallet address wrapper.
///
/// Provides type safety for wallet addresses throughout the API.
/// Format: `0x` followed by 40 hexadecimal characters (20 bytes).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// Lowercased form, used as the canonical storage/index key.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    /// Case-insensitive equality against another address string.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(value: String) -> Self {
        WalletAddress(value)
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        WalletAddress(value.to_string())
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

// =============================================================================
// Challenge Flow
// =============================================================================

/// Request body for `POST /v1/auth/challenge`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    /// Device public key in JWK form; the issued challenge is bound to it.
    pub public_key: String,
}

/// Response body for `POST /v1/auth/challenge`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub success: bool,
    /// Opaque challenge identifier, echoed back on verify.
    pub challenge_id: String,
    /// Random challenge string the wallet must sign.
    pub challenge: String,
    /// Challenge expiry as epoch milliseconds.
    pub expires_at: i64,
}

/// Request body for `POST /v1/auth/verify`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Identifier returned by the challenge endpoint.
    pub challenge_id: String,
    /// EIP-191 wallet signature over the challenge string (hex, 65 bytes).
    pub signature: String,
    /// Address the signature is claimed to come from.
    pub wallet_address: WalletAddress,
}

// =============================================================================
// Session Responses
// =============================================================================

/// Identity projection embedded in auth responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProjection {
    /// The claimed identity number.
    pub number: String,
}

/// Profile projection embedded in auth responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileProjection {
    pub display_name: Option<String>,
    pub region: Option<String>,
}

/// User projection returned by verify, refresh, and `/users/me`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProjection {
    pub id: String,
    pub wallet_address: WalletAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileProjection>,
}

/// Response body for `POST /v1/auth/verify` and `POST /v1/auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    /// Signed session token bound to the device public key.
    pub token: String,
    pub user: UserProjection,
}

/// Response body for `GET /v1/users/me`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub success: bool,
    pub user: UserProjection,
}
