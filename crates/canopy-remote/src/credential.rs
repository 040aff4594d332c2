//! Service-account credential parsing.

use crate::{RemoteError, Result};
use serde::Deserialize;
use std::path::Path;

/// The fields of a service-account key file that the token exchange needs.
#[derive(Clone)]
pub struct ServiceAccountCredential {
    /// Service identity, used as the assertion issuer.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// Key identifier, sent as the JWT `kid` header when present.
    pub private_key_id: Option<String>,
    /// Token endpoint named by the key file.
    pub token_uri: Option<String>,
    /// Project the key belongs to.
    pub project_id: Option<String>,
}

#[derive(Deserialize)]
struct RawCredential {
    #[serde(rename = "type")]
    kind: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    private_key_id: Option<String>,
    token_uri: Option<String>,
    project_id: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(RemoteError::Configuration(format!(
            "service-account credential is missing '{field}'"
        ))),
    }
}

impl ServiceAccountCredential {
    /// Parse a service-account key from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawCredential = serde_json::from_str(json).map_err(|e| {
            RemoteError::Configuration(format!("service-account credential is not valid JSON: {e}"))
        })?;

        if let Some(kind) = raw.kind.as_deref() {
            if kind != "service_account" {
                return Err(RemoteError::Configuration(format!(
                    "credential type '{kind}' is not a service account"
                )));
            }
        }

        Ok(Self {
            client_email: required(raw.client_email, "client_email")?,
            private_key: required(raw.private_key, "private_key")?,
            private_key_id: raw.private_key_id.filter(|s| !s.is_empty()),
            token_uri: raw.token_uri.filter(|s| !s.is_empty()),
            project_id: raw.project_id.filter(|s| !s.is_empty()),
        })
    }

    /// Read and parse a service-account key file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RemoteError::Configuration(format!("cannot read credential file {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

impl std::fmt::Debug for ServiceAccountCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredential")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}
