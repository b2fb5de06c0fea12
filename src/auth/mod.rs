// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! # Authentication
//!
//! Challenge/response wallet authentication with proof-of-possession-bound
//! sessions:
//!
//! 1. A device asks for a challenge, presenting its P-256 public key (JWK).
//! 2. The companion wallet signs the challenge (EIP-191 `personal_sign`).
//! 3. The server verifies the signature, consumes the challenge exactly
//!    once, and issues a session token bound to the device key.
//! 4. Protected requests carry the token plus a fresh DPoP proof signed by
//!    the device key, so a stolen token alone is not enough.
//!
//! Module map: [`challenge`] generates challenges and ids, [`wallet`]
//! verifies wallet signatures, [`token`] issues and checks session JWTs,
//! [`proof`] handles DPoP envelopes, and [`extractor`] wires it all into
//! axum request extraction.

pub mod challenge;
pub mod error;
pub mod extractor;
pub mod proof;
pub mod token;
pub mod wallet;

pub use error::AuthError;
pub use extractor::{Auth, AuthenticatedUser, DpopBound};
