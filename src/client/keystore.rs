// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! Persistent device keypair storage.
//!
//! The device keypair is a P-256 keypair generated on first use and kept
//! for the lifetime of the installation. The private key is stored as
//! PKCS#8 PEM with 0600 permissions; the public key is stored alongside it
//! in JWK form, which is the exact string sent to the server and embedded
//! in session tokens. The JWK file is a cache of a derivable value, but
//! persisting it keeps the binding string byte-stable across restarts.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use p256::ecdsa::SigningKey;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use p256::SecretKey;

use super::ClientError;

const PRIVATE_KEY_FILE: &str = "device_key.pem";
const PUBLIC_KEY_FILE: &str = "device_key.jwk";

/// A loaded device keypair ready for proof signing.
#[derive(Clone)]
pub struct DeviceKeypair {
    signing_key: SigningKey,
    public_key_jwk: String,
}

impl DeviceKeypair {
    /// The signing key used for DPoP proofs.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// The public key JWK string, as sent to the server.
    pub fn public_key_jwk(&self) -> &str {
        &self.public_key_jwk
    }
}

/// Manages persistence of the device keypair.
#[derive(Debug, Clone)]
pub struct DeviceKeystore {
    key_dir: PathBuf,
}

impl DeviceKeystore {
    /// Create a keystore rooted at the given directory.
    pub fn new(key_dir: impl AsRef<Path>) -> Self {
        Self {
            key_dir: key_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the existing keypair or generate and persist a new one.
    pub fn ensure_keypair(&self) -> Result<DeviceKeypair, ClientError> {
        if let Some(keypair) = self.load_keypair()? {
            return Ok(keypair);
        }

        let secret = SecretKey::random(&mut p256::elliptic_curve::rand_core::OsRng);
        let keypair = DeviceKeypair {
            signing_key: SigningKey::from(&secret),
            public_key_jwk: secret.public_key().to_jwk_string(),
        };
        self.save(&secret, &keypair.public_key_jwk)?;
        Ok(keypair)
    }

    /// Load the keypair from disk, if one has been generated.
    pub fn load_keypair(&self) -> Result<Option<DeviceKeypair>, ClientError> {
        let pem_path = self.key_dir.join(PRIVATE_KEY_FILE);
        if !pem_path.exists() {
            return Ok(None);
        }

        let pem = fs::read_to_string(&pem_path)?;
        let secret = SecretKey::from_pkcs8_pem(&pem)
            .map_err(|e| ClientError::Key(format!("stored private key is unreadable: {e}")))?;

        // Prefer the persisted JWK so the binding string never drifts.
        let jwk_path = self.key_dir.join(PUBLIC_KEY_FILE);
        let public_key_jwk = match fs::read_to_string(&jwk_path) {
            Ok(jwk) => jwk.trim().to_string(),
            Err(_) => secret.public_key().to_jwk_string(),
        };

        Ok(Some(DeviceKeypair {
            signing_key: SigningKey::from(&secret),
            public_key_jwk,
        }))
    }

    /// Sign raw bytes with the device key (P-256 ECDSA, raw r||s output).
    ///
    /// Fails with `KeyNotReady` until `ensure_keypair` has run once.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ClientError> {
        use p256::ecdsa::signature::Signer;

        let keypair = self.load_keypair()?.ok_or(ClientError::KeyNotReady)?;
        let signature: p256::ecdsa::Signature = keypair.signing_key().sign(message);
        Ok(signature.to_bytes().as_slice().to_vec())
    }

    /// Delete the stored keypair. Sessions bound to it become unusable.
    pub fn clear(&self) -> Result<(), ClientError> {
        for file in [PRIVATE_KEY_FILE, PUBLIC_KEY_FILE] {
            let path = self.key_dir.join(file);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn save(&self, secret: &SecretKey, public_key_jwk: &str) -> Result<(), ClientError> {
        if !self.key_dir.exists() {
            fs::create_dir_all(&self.key_dir)?;
        }

        let pem = secret
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| ClientError::Key(format!("private key encoding failed: {e}")))?;

        let pem_path = self.key_dir.join(PRIVATE_KEY_FILE);
        fs::write(&pem_path, pem.as_bytes())?;

        let mut perms = fs::metadata(&pem_path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&pem_path, perms)?;

        fs::write(self.key_dir.join(PUBLIC_KEY_FILE), public_key_jwk)?;
        Ok(())
    }
}
