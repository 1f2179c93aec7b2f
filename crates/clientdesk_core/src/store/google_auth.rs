//! Service-account OAuth for the Google Sheets backend.
//!
//! # Responsibility
//! - Load service-account credentials from inline JSON or a key file.
//! - Exchange a signed JWT assertion for a bearer access token.
//! - Cache the token until shortly before it expires.

use super::{StoreError, StoreResult};
use crate::config::CredentialsSource;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::{error, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

pub(crate) const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// Fields of a Google service-account key file this client needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parses a key from its JSON text.
    ///
    /// # Errors
    /// - `StoreError::Auth` when the JSON is malformed or lacks a key.
    pub fn from_json(raw: &str) -> StoreResult<Self> {
        let key: Self = serde_json::from_str(raw)
            .map_err(|err| StoreError::Auth(format!("invalid service account JSON: {err}")))?;
        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            return Err(StoreError::Auth(
                "service account JSON lacks client_email or private_key".to_string(),
            ));
        }
        Ok(key)
    }

    pub fn load(source: &CredentialsSource) -> StoreResult<Self> {
        match source {
            CredentialsSource::Inline(raw) => Self::from_json(raw),
            CredentialsSource::File(path) => {
                let raw = std::fs::read_to_string(path).map_err(|err| {
                    StoreError::Auth(format!(
                        "failed to read credentials file `{}`: {err}",
                        path.display()
                    ))
                })?;
                Self::from_json(&raw)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Issues and caches bearer tokens for one service account.
pub(crate) struct TokenProvider {
    key: ServiceAccountKey,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub(crate) fn new(key: ServiceAccountKey, http: Client) -> Self {
        Self {
            key,
            http,
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid access token, fetching a new one when needed.
    pub(crate) fn access_token(&self) -> StoreResult<String> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| StoreError::Unavailable("token cache lock poisoned".to_string()))?;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let started_at = Instant::now();
        let assertion = self.sign_assertion(unix_now()?)?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|err| {
                error!("event=token_fetch module=store status=error error={err}");
                StoreError::Unavailable(format!("token request failed: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            error!(
                "event=token_fetch module=store status=error http_status={}",
                status.as_u16()
            );
            return Err(StoreError::Auth(format!(
                "token endpoint returned {status}: {}",
                super::google::truncate_body(&body)
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|err| StoreError::InvalidResponse(format!("token response: {err}")))?;
        let lifetime = Duration::from_secs(token.expires_in);
        info!(
            "event=token_fetch module=store status=ok duration_ms={} expires_in_s={}",
            started_at.elapsed().as_millis(),
            token.expires_in
        );

        let value = token.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        });
        Ok(value)
    }

    fn sign_assertion(&self, now: u64) -> StoreResult<String> {
        let claims = assertion_claims(&self.key, now);
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|err| StoreError::Auth(format!("invalid service account key: {err}")))?;
        encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|err| StoreError::Auth(format!("failed to sign token assertion: {err}")))
    }
}

fn assertion_claims(key: &ServiceAccountKey, now: u64) -> AssertionClaims<'_> {
    AssertionClaims {
        iss: key.client_email.as_str(),
        scope: SCOPES.join(" "),
        aud: key.token_uri.as_str(),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    }
}

fn unix_now() -> StoreResult<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|err| StoreError::Auth(format!("system clock before unix epoch: {err}")))
}

#[cfg(test)]
mod tests {
    use super::{assertion_claims, ServiceAccountKey, DEFAULT_TOKEN_URI};
    use crate::store::StoreError;

    #[test]
    fn from_json_defaults_token_uri() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email":"svc@proj.iam.gserviceaccount.com","private_key":"pem"}"#,
        )
        .expect("valid key");
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn from_json_rejects_missing_fields() {
        let err = ServiceAccountKey::from_json(r#"{"client_email":"","private_key":"pem"}"#)
            .expect_err("empty email must fail");
        assert!(matches!(err, StoreError::Auth(_)));
        assert!(ServiceAccountKey::from_json("not json").is_err());
    }

    #[test]
    fn debug_output_hides_private_key() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email":"svc@x","private_key":"SECRET-PEM"}"#,
        )
        .expect("valid key");
        assert!(!format!("{key:?}").contains("SECRET-PEM"));
    }

    #[test]
    fn claims_span_one_hour_and_request_sheet_scopes() {
        let key = ServiceAccountKey::from_json(r#"{"client_email":"svc@x","private_key":"k"}"#)
            .expect("valid key");
        let claims = assertion_claims(&key, 1_000);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(claims.scope.contains("auth/spreadsheets"));
        assert_eq!(claims.aud, DEFAULT_TOKEN_URI);
    }
}
