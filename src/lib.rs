// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! Meshwork Auth - DPoP Challenge/Response Authentication Service
//!
//! This crate provides wallet-based authentication for the Meshwork community
//! network. Clients hold a device-local P-256 keypair; the server issues
//! single-use challenges bound to that public key, verifies an EIP-191 wallet
//! signature over the challenge, and mints bearer tokens bound to
//! (user id, wallet address, public key). Per-request DPoP proofs bind
//! individual requests to the same keypair.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Challenge lifecycle, signature verification, session tokens
//! - `client` - Device-side keystore, session storage, and HTTP client
//! - `storage` - Embedded challenge/user database (redb)

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
