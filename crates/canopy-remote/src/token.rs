//! Service-account token exchange (JWT-bearer grant).

use crate::{HttpResponse, HttpTransport, RemoteError, Result, ServiceAccountCredential};
use canopy_metrics::{metric_defs, metrics};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Token endpoint used when neither the exchanger nor the credential names one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scope requested for remote compute calls.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/earthengine";

/// OAuth2 grant type for signed assertions.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a signed assertion, and the assumed token lifetime when the
/// endpoint does not report `expires_in`.
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Claims of the signed assertion sent to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Service identity.
    pub iss: String,
    /// Requested permission scope.
    pub scope: String,
    /// Token endpoint.
    pub aud: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// A short-lived bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    /// Token type reported by the endpoint, normally `Bearer`.
    pub token_type: String,
    /// When the token stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Wrap an already-issued token.
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            token_type: "Bearer".to_string(),
            expires_at,
        }
    }

    /// The bearer secret. Never log this.
    pub fn secret(&self) -> &str {
        &self.token
    }

    /// Whether the token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the token has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges a service-account credential for a bearer token.
///
/// Holds no state between calls; every call signs a fresh assertion and
/// performs one round-trip. Failures are not retried here.
pub struct TokenExchanger {
    transport: Arc<dyn HttpTransport>,
    scope: String,
    token_uri: Option<String>,
}

impl TokenExchanger {
    /// Create an exchanger requesting `scope`.
    pub fn new(transport: Arc<dyn HttpTransport>, scope: impl Into<String>) -> Self {
        Self {
            transport,
            scope: scope.into(),
            token_uri: None,
        }
    }

    /// Use this token endpoint instead of the one named by the credential.
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = Some(token_uri.into());
        self
    }

    /// The endpoint (and assertion audience) used for `credential`.
    pub fn token_uri_for<'a>(&'a self, credential: &'a ServiceAccountCredential) -> &'a str {
        self.token_uri
            .as_deref()
            .or(credential.token_uri.as_deref())
            .unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// Build the claims for an assertion issued at `now`.
    pub fn claims(&self, credential: &ServiceAccountCredential, now: DateTime<Utc>) -> AssertionClaims {
        let iat = now.timestamp();
        AssertionClaims {
            iss: credential.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.token_uri_for(credential).to_string(),
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        }
    }

    /// Sign an RS256 assertion with the credential's private key.
    pub fn build_assertion(&self, credential: &ServiceAccountCredential, now: DateTime<Utc>) -> Result<String> {
        let key = EncodingKey::from_rsa_pem(credential.private_key.as_bytes())
            .map_err(|e| RemoteError::Configuration(format!("service-account private key is unusable: {e}")))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = credential.private_key_id.clone();

        jsonwebtoken::encode(&header, &self.claims(credential, now), &key)
            .map_err(|e| RemoteError::Configuration(format!("failed to sign assertion: {e}")))
    }

    /// Obtain a bearer token for `credential`.
    pub fn get_access_token(&self, credential: &ServiceAccountCredential) -> Result<AccessToken> {
        self.get_access_token_at(credential, Utc::now())
    }

    /// Obtain a bearer token, treating `now` as the current time.
    pub fn get_access_token_at(
        &self,
        credential: &ServiceAccountCredential,
        now: DateTime<Utc>,
    ) -> Result<AccessToken> {
        let assertion = self.build_assertion(credential, now)?;
        let token_uri = self.token_uri_for(credential);
        debug!(issuer = %credential.client_email, token_uri, "exchanging service-account assertion");

        let result = self
            .transport
            .post_form(token_uri, &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .and_then(|response| parse_token_response(&response, now));

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) if e.is_retryable() => "transient",
            Err(_) => "rejected",
        };
        metrics::counter!(metric_defs::REMOTE_TOKEN_EXCHANGES.name, "outcome" => outcome).increment(1);

        if let Err(e) = &result {
            warn!(token_uri, error = %e, "token exchange failed");
        }
        result
    }
}

fn parse_token_response(response: &HttpResponse, now: DateTime<Utc>) -> Result<AccessToken> {
    match response.status {
        200..=299 => {
            let body: TokenResponse = response.json()?;
            if body.access_token.is_empty() {
                return Err(RemoteError::InvalidResponse(
                    "token endpoint returned an empty access_token".to_string(),
                ));
            }
            let lifetime = body.expires_in.unwrap_or(TOKEN_LIFETIME_SECS);
            Ok(AccessToken {
                token: body.access_token,
                token_type: body.token_type.unwrap_or_else(|| "Bearer".to_string()),
                expires_at: now + Duration::seconds(lifetime),
            })
        }
        408 | 429 | 500..=599 => Err(RemoteError::Transient(format!(
            "token endpoint returned HTTP {}: {}",
            response.status,
            response.error_message()
        ))),
        _ => Err(RemoteError::Authentication(format!(
            "token endpoint returned HTTP {}: {}",
            response.status,
            response.error_message()
        ))),
    }
}
