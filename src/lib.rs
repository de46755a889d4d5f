// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Profile-Sync: Google sign-in session and Firestore profile synchronization
//!
//! This crate provides the session state machine behind a single-screen
//! profile app: sign in with Google, load or create the user's profile
//! document, edit the display name, sign out.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod ui;
