// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google ID token verification and exchange for a session token.
//!
//! Signing keys come from Google's published JWKS, located through the
//! OpenID discovery document. Both documents are cached for as long as
//! their `Cache-Control: max-age` allows; an unknown `kid` forces one
//! refetch before the token is rejected, since Google rotates keys.

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::models::{AuthenticatedPrincipal, Identity};
use crate::services::identity::CredentialExchange;
use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

const DISCOVERY_URL: &str = "https://accounts.google.com/.well-known/openid-configuration";
const FALLBACK_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const FALLBACK_MAX_AGE: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;
const SESSION_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Google account asserted by a valid ID token.
#[derive(Debug, Clone)]
pub struct VerifiedGoogleIdentity {
    pub subject: String,
    pub email: String,
    pub picture: Option<String>,
}

/// Why an ID token could not be verified.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OidcError {
    /// Bad signature, wrong audience or missing claims. Retrying is pointless.
    #[error("{0}")]
    Rejected(String),
    /// Google's keys could not be fetched.
    #[error("{0}")]
    Transient(String),
}

fn rejected(message: impl Into<String>) -> OidcError {
    OidcError::Rejected(message.into())
}

/// A cached value and the instant it goes stale.
struct Cached<T> {
    value: T,
    fresh_until: Instant,
}

impl<T> Cached<T> {
    fn fresh(&self) -> Option<&T> {
        (Instant::now() < self.fresh_until).then_some(&self.value)
    }
}

#[derive(Default)]
struct KeyCache {
    jwks_uri: Option<Cached<String>>,
    keys: Option<Cached<HashMap<String, Arc<DecodingKey>>>>,
}

/// Google's signing keys, fetched on demand.
struct GoogleKeys {
    http: reqwest::Client,
    // Held across the fetch so concurrent misses trigger a single refresh.
    cache: Mutex<KeyCache>,
}

impl GoogleKeys {
    async fn key(&self, kid: &str) -> std::result::Result<Arc<DecodingKey>, OidcError> {
        let mut cache = self.cache.lock().await;

        if let Some(key) = cache.keys.as_ref().and_then(Cached::fresh).and_then(|k| k.get(kid)) {
            return Ok(key.clone());
        }

        // A stale cache gets one ordinary refresh; a fresh cache that lacks
        // the kid gets a forced one that also re-reads discovery.
        let keys_stale = cache.keys.as_ref().and_then(Cached::fresh).is_none();
        if keys_stale {
            self.refresh(&mut cache, false).await?;
            if let Some(key) = lookup(&cache, kid) {
                return Ok(key);
            }
        }

        self.refresh(&mut cache, true).await?;
        lookup(&cache, kid).ok_or_else(|| rejected(format!("unknown JWT kid: {kid}")))
    }

    async fn refresh(
        &self,
        cache: &mut KeyCache,
        rediscover: bool,
    ) -> std::result::Result<(), OidcError> {
        let jwks_uri = self.jwks_uri(cache, rediscover).await;
        tracing::debug!(jwks_uri = %jwks_uri, "Fetching Google signing keys");

        let response = self
            .http
            .get(&jwks_uri)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| OidcError::Transient(format!("JWKS request failed: {e}")))?;
        let max_age = max_age(response.headers());
        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| OidcError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys = usable_rsa_keys(jwks);
        if keys.is_empty() {
            return Err(OidcError::Transient(
                "JWKS response had no usable RSA keys".to_string(),
            ));
        }

        tracing::debug!(keys = keys.len(), max_age_secs = max_age.as_secs(), "Google signing keys cached");
        cache.keys = Some(Cached {
            value: keys,
            fresh_until: Instant::now() + max_age,
        });
        Ok(())
    }

    /// JWKS location from the discovery document. Discovery failures fall
    /// back to the last known location, then to Google's well-known one.
    async fn jwks_uri(&self, cache: &mut KeyCache, rediscover: bool) -> String {
        if !rediscover {
            if let Some(uri) = cache.jwks_uri.as_ref().and_then(Cached::fresh) {
                return uri.clone();
            }
        }

        let discovered = async {
            let response = self.http.get(DISCOVERY_URL).send().await?.error_for_status()?;
            let max_age = max_age(response.headers());
            let config: OpenIdConfig = response.json().await?;
            Ok::<_, reqwest::Error>((config.jwks_uri, max_age))
        }
        .await;

        match discovered {
            Ok((uri, max_age)) => {
                cache.jwks_uri = Some(Cached {
                    value: uri.clone(),
                    fresh_until: Instant::now() + max_age,
                });
                uri
            }
            Err(e) => {
                tracing::warn!(error = %e, "OIDC discovery failed; using fallback JWKS URI");
                cache
                    .jwks_uri
                    .as_ref()
                    .map(|c| c.value.clone())
                    .unwrap_or_else(|| FALLBACK_JWKS_URL.to_string())
            }
        }
    }
}

fn lookup(cache: &KeyCache, kid: &str) -> Option<Arc<DecodingKey>> {
    cache.keys.as_ref()?.value.get(kid).cloned()
}

enum KeySource {
    Google(GoogleKeys),
    /// Single fixed key, for tests and offline runs.
    Pinned { kid: String, key: Arc<DecodingKey> },
}

/// Verifies Google-issued ID tokens minted for our OAuth client.
pub struct GoogleIdTokenVerifier {
    audience: String,
    keys: KeySource,
}

impl GoogleIdTokenVerifier {
    /// Verifier that fetches Google's published signing keys.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building OIDC HTTP client")?;

        let verifier = Self {
            audience: config.google_client_id.trim().to_string(),
            keys: KeySource::Google(GoogleKeys {
                http,
                cache: Mutex::new(KeyCache::default()),
            }),
        };
        tracing::info!(audience = %verifier.audience, "Initialized Google ID token verifier");
        Ok(verifier)
    }

    /// Verifier that trusts exactly one RSA public key under `kid`.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static OIDC kid must not be empty");
        }

        Ok(Self {
            audience: config.google_client_id.trim().to_string(),
            keys: KeySource::Pinned {
                kid,
                key: Arc::new(decoding_key),
            },
        })
    }

    /// Check signature, issuer, audience and lifetime of a raw ID token
    /// and return the account it asserts.
    pub async fn verify_id_token(
        &self,
        token: &str,
    ) -> std::result::Result<VerifiedGoogleIdentity, OidcError> {
        if token.is_empty() {
            return Err(rejected("ID token is empty"));
        }

        let header =
            decode_header(token).map_err(|e| rejected(format!("invalid JWT header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(rejected(format!("unexpected JWT alg: {:?}", header.alg)));
        }
        let kid = header.kid.ok_or_else(|| rejected("missing JWT kid"))?;

        let key = match &self.keys {
            KeySource::Google(google) => google.key(&kid).await?,
            KeySource::Pinned { kid: pinned, key } if *pinned == kid => key.clone(),
            KeySource::Pinned { .. } => return Err(rejected(format!("unknown JWT kid: {kid}"))),
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_audience(&[self.audience.as_str()]);
        validation.validate_nbf = true;
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<GoogleIdTokenClaims>(token, &key, &validation)
            .map_err(|e| rejected(format!("JWT validation failed: {e}")))?
            .claims;

        check_claims(claims, now_unix_secs())
    }
}

/// Checks `jsonwebtoken` does not cover: issue time and a verified email.
fn check_claims(
    claims: GoogleIdTokenClaims,
    now: u64,
) -> std::result::Result<VerifiedGoogleIdentity, OidcError> {
    match claims.iat {
        None => return Err(rejected("missing iat claim")),
        Some(iat) if iat > now + CLOCK_SKEW_SECS => {
            return Err(rejected("iat claim is in the future"))
        }
        Some(_) => {}
    }

    let email = claims.email.ok_or_else(|| rejected("missing email claim"))?;
    match claims.email_verified {
        Some(true) => {}
        Some(false) => return Err(rejected("email_verified claim is false")),
        None => return Err(rejected("email_verified claim is missing")),
    }

    Ok(VerifiedGoogleIdentity {
        subject: claims.sub,
        email,
        picture: claims.picture,
    })
}

// ─── Session tokens ──────────────────────────────────────────────

/// Claims of the session token issued after a successful exchange.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (identity ID)
    pub sub: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Sign an HS256 session token for a verified identity, valid for 30 days.
pub fn create_session_token(
    subject: &str,
    email: &str,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;
    let claims = SessionClaims {
        sub: subject.to_string(),
        email: email.to_string(),
        iat: now,
        exp: now + SESSION_TOKEN_TTL_SECS as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .context("failed to sign session token")
}

pub fn decode_session_token(token: &str, signing_key: &[u8]) -> anyhow::Result<SessionClaims> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(signing_key),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .context("invalid session token")
}

/// [`CredentialExchange`] that verifies the Google ID token carried by the
/// identity and issues a session token for it.
pub struct GoogleIdTokenExchange {
    verifier: GoogleIdTokenVerifier,
    signing_key: Vec<u8>,
}

impl GoogleIdTokenExchange {
    pub fn new(verifier: GoogleIdTokenVerifier, signing_key: Vec<u8>) -> Self {
        Self {
            verifier,
            signing_key,
        }
    }
}

#[async_trait]
impl CredentialExchange for GoogleIdTokenExchange {
    async fn exchange(&self, identity: &Identity) -> Result<AuthenticatedPrincipal> {
        let verified = self
            .verifier
            .verify_id_token(&identity.token)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, user_id = %identity.id, "ID token rejected");
                SyncError::ExchangeFailed(e.to_string())
            })?;

        if verified.subject != identity.id {
            return Err(SyncError::ExchangeFailed(
                "ID token subject does not match identity".to_string(),
            ));
        }

        tracing::debug!(
            user_id = %verified.subject,
            has_picture = verified.picture.is_some(),
            "ID token verified"
        );

        let session_token =
            create_session_token(&verified.subject, &verified.email, &self.signing_key)
                .map_err(|e| SyncError::ExchangeFailed(format!("session token: {e}")))?;

        Ok(AuthenticatedPrincipal {
            uid: verified.subject,
            email: verified.email,
            session_token,
        })
    }
}

// ─── Wire formats ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OpenIdConfig {
    jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    key_use: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleIdTokenClaims {
    sub: String,
    iat: Option<u64>,
    email: Option<String>,
    email_verified: Option<bool>,
    picture: Option<String>,
}

/// RS256 signing keys from `jwks`, keyed by `kid`.
fn usable_rsa_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    jwks.keys
        .into_iter()
        .filter(|jwk| jwk.kty == "RSA" && !jwk.kid.trim().is_empty())
        .filter(|jwk| jwk.alg.as_deref().map_or(true, |alg| alg == "RS256"))
        .filter(|jwk| jwk.key_use.as_deref().map_or(true, |u| u == "sig"))
        .filter_map(|jwk| match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => Some((jwk.kid, Arc::new(key))),
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                None
            }
        })
        .collect()
}

fn max_age(headers: &HeaderMap) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_max_age)
        .map(Duration::from_secs)
        .unwrap_or(FALLBACK_MAX_AGE)
}

fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim_matches('"').parse().ok())
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
