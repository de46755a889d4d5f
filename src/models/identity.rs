// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity returned by the sign-in provider, and the principal it is
//! exchanged for.

use std::fmt;

/// Credential bundle handed back by the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable provider subject (Google `sub`); also the profile document ID
    pub id: String,
    pub email: String,
    /// Profile picture URL, if the account has one
    pub photo_url: Option<String>,
    /// Raw Google ID token
    pub token: String,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("photo_url", &self.photo_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Store-side principal obtained by exchanging a verified identity.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    /// Equals the identity ID the principal was issued for
    pub uid: String,
    pub email: String,
    /// HS256 session token
    pub session_token: String,
}

impl fmt::Debug for AuthenticatedPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedPrincipal")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("session_token", &"<redacted>")
            .finish()
    }
}
