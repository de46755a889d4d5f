// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod google_oidc;
pub mod identity;
pub mod profile;
pub mod session;
pub mod terminal_signin;

pub use google_oidc::{GoogleIdTokenExchange, GoogleIdTokenVerifier, OidcError};
pub use identity::{CredentialExchange, IdentityProvider, SignInOutcome};
pub use profile::{FetchOutcome, ProfileStore};
pub use session::{SessionController, SessionOptions};
pub use terminal_signin::TerminalGoogleSignIn;
