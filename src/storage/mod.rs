// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

//! # Storage
//!
//! Persistence for the auth service: a single embedded redb database holding
//! challenges, users, and their projections. See [`database`] for the table
//! layout and the single-use consume transaction.

pub mod database;

pub use database::{
    AuthDatabase, AuthDbError, AuthDbResult, ConsumeError, StoredChallenge, StoredIdentity,
    StoredProfile, StoredUser,
};
