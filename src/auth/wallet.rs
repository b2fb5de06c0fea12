// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! Wallet signature verification for the challenge path.
//!
//! The companion wallet app signs the challenge string with EIP-191
//! `personal_sign`: the message is prefixed with
//! `"\x19Ethereum Signed Message:\n" + length` and keccak256-hashed, and the
//! secp256k1 signature is recoverable (65 bytes, r||s||v, hex-encoded).
//! Verification recovers the signer address from the signature and compares
//! it to the claimed wallet address, case-insensitively.

use std::str::FromStr;

use alloy::primitives::Signature;

use super::error::AuthError;
use crate::models::WalletAddress;

/// Verify an EIP-191 wallet signature over `message`.
///
/// Returns `InvalidSignature` when the signature is malformed, does not
/// recover, or recovers to an address other than `expected`.
pub fn verify_wallet_signature(
    message: &str,
    signature_hex: &str,
    expected: &WalletAddress,
) -> Result<(), AuthError> {
    let signature =
        Signature::from_str(signature_hex).map_err(|_| AuthError::InvalidSignature)?;

    let recovered = signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|_| AuthError::InvalidSignature)?;

    if expected.matches(&recovered.to_checksum(None)) {
        Ok(())
    } else {
        Err(AuthError::InvalidSignature)
    }
}
