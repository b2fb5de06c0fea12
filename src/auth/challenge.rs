// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! Challenge generation.
//!
//! A challenge is 32 bytes from the system CSPRNG, base64-encoded, with a
//! fixed 5-minute lifetime: short enough to limit the replay window, long
//! enough for a human to scan a QR code and approve in the companion app.

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};

use super::error::AuthError;

/// Fixed challenge lifetime.
pub const CHALLENGE_TTL_SECONDS: i64 = 5 * 60;

/// A freshly generated challenge value and its expiry.
#[derive(Debug, Clone)]
pub struct GeneratedChallenge {
    /// Base64-encoded 32-byte random value.
    pub challenge: String,
    pub expires_at: DateTime<Utc>,
}

/// Generate a new random challenge with the fixed TTL.
pub fn generate_challenge() -> Result<GeneratedChallenge, AuthError> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AuthError::Internal("system RNG failure".to_string()))?;

    Ok(GeneratedChallenge {
        challenge: Base64::encode_string(&bytes),
        expires_at: Utc::now() + Duration::seconds(CHALLENGE_TTL_SECONDS),
    })
}

/// Generate a prefixed opaque identifier: `<prefix>_<millis base36><8 random bytes hex>`.
///
/// The timestamp component keeps ids roughly sortable by creation time; the
/// random component makes them unguessable.
pub fn generate_id(prefix: &str) -> Result<String, AuthError> {
    let mut random = [0u8; 8];
    SystemRandom::new()
        .fill(&mut random)
        .map_err(|_| AuthError::Internal("system RNG failure".to_string()))?;

    let timestamp = to_base36(Utc::now().timestamp_millis() as u64);
    let random_part = alloy::hex::encode(random);

    if prefix.is_empty() {
        Ok(format!("{timestamp}{random_part}"))
    } else {
        Ok(format!("{prefix}_{timestamp}{random_part}"))
    }
}

fn to_base36(mut n: u64) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).expect("base36 digits are ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn challenge_has_full_entropy_encoding() {
        let generated = generate_challenge().unwrap();
        let decoded = Base64::decode_vec(&generated.challenge).unwrap();
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn challenge_expiry_is_five_minutes_out() {
        let before = Utc::now();
        let generated = generate_challenge().unwrap();
        let ttl = (generated.expires_at - before).num_seconds();
        assert!((CHALLENGE_TTL_SECONDS - 2..=CHALLENGE_TTL_SECONDS + 2).contains(&ttl));
    }

    #[test]
    fn challenges_are_unique_across_many_issuances() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let generated = generate_challenge().unwrap();
            assert!(
                seen.insert(generated.challenge),
                "duplicate challenge produced"
            );
        }
    }

    #[test]
    fn challenge_bytes_are_not_degenerate() {
        // A crude distribution check: across many samples every byte value
        // range should be populated and no single value should dominate.
        let mut counts = [0usize; 256];
        for _ in 0..1_000 {
            let generated = generate_challenge().unwrap();
            for byte in Base64::decode_vec(&generated.challenge).unwrap() {
                counts[byte as usize] += 1;
            }
        }
        let total: usize = counts.iter().sum();
        assert_eq!(total, 32_000);
        let max = counts.iter().max().copied().unwrap();
        assert!(max < total / 32, "byte distribution is badly skewed");
    }

    #[test]
    fn generated_ids_carry_prefix_and_are_unique() {
        let id = generate_id("chal").unwrap();
        assert!(id.starts_with("chal_"));

        let bare = generate_id("").unwrap();
        assert!(!bare.contains('_'));

        let mut seen = HashSet::new();
        for _ in 0..1_000 {
            assert!(seen.insert(generate_id("user").unwrap()));
        }
    }

    #[test]
    fn base36_encodes_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
