//! Remote backend contract: tables, password auth, object storage.
//!
//! Two implementations share the contract:
//! - [`RestBackend`]: the hosted backend-as-a-service over HTTP
//! - [`LocalBackend`]: a SQLite store for offline development and tests

mod local;
mod rest;
mod schema;

pub use local::*;
pub use rest::*;
pub use schema::*;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Table holding patient rows.
pub const PATIENTS_TABLE: &str = "patients";

/// Table holding appointment rows.
pub const APPOINTMENTS_TABLE: &str = "appointments";

/// Backend errors.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unable to connect to {0}")]
    Connection(String),

    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl BackendError {
    /// Message suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Remote { message, .. } => message.clone(),
            BackendError::Auth(message) => message.clone(),
            BackendError::Conflict(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// A signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Metadata supplied at sign-up (organization, NPI, role, ...)
    #[serde(default)]
    pub user_metadata: Value,
    /// Linked identities; empty for an unconfirmed duplicate sign-up
    #[serde(default)]
    pub identities: Vec<Value>,
}

/// An authenticated session.
///
/// `Debug` redacts both tokens so sessions can appear in logs.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

impl AuthSession {
    /// Check expiry against `now` (unix seconds). Sessions without expiry never expire.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

/// What the auth service returned for a sign-up.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: Option<AuthUser>,
    /// Present when the account is usable without email confirmation
    pub session: Option<AuthSession>,
}

/// Object upload options.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    /// Cache lifetime in seconds
    pub cache_control_secs: u32,
    /// Overwrite an existing object at the same path
    pub upsert: bool,
    pub content_type: String,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            cache_control_secs: 3600,
            upsert: false,
            content_type: "application/octet-stream".to_string(),
        }
    }
}

/// An object stored by an upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredObject {
    /// "{bucket}/{path}"
    pub key: String,
}

/// Row-level access to the remote tables.
///
/// `token` is the signed-in user's access token; without it requests run
/// with the anonymous key.
pub trait TableStore {
    /// Every row of `table`.
    fn select_all(&self, table: &str, token: Option<&str>) -> BackendResult<Vec<Value>>;

    /// Insert one row and return it as stored (with its assigned `id`).
    fn insert(&self, table: &str, row: &Value, token: Option<&str>) -> BackendResult<Value>;

    /// Update the row with `id`, returning the updated rows (empty if none matched).
    fn update(
        &self,
        table: &str,
        id: &str,
        patch: &Value,
        token: Option<&str>,
    ) -> BackendResult<Vec<Value>>;

    /// Delete the row with `id`. Deleting a missing row is not an error.
    fn delete(&self, table: &str, id: &str, token: Option<&str>) -> BackendResult<()>;
}

/// Email/password authentication.
pub trait AuthProvider {
    fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<AuthSession>;

    fn sign_up(&self, email: &str, password: &str, metadata: &Value)
        -> BackendResult<SignUpResponse>;

    fn sign_out(&self, access_token: &str) -> BackendResult<()>;

    /// Probe the auth service.
    fn health(&self) -> BackendResult<()>;
}

/// Object storage.
pub trait ObjectStore {
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        options: &UploadOptions,
        token: Option<&str>,
    ) -> BackendResult<StoredObject>;
}

/// Everything the front-end needs from its backend.
pub trait Backend: TableStore + AuthProvider + ObjectStore + Send {
    fn as_auth(&self) -> &dyn AuthProvider;

    fn as_object_store(&self) -> &dyn ObjectStore;
}

impl<T: TableStore + AuthProvider + ObjectStore + Send> Backend for T {
    fn as_auth(&self) -> &dyn AuthProvider {
        self
    }

    fn as_object_store(&self) -> &dyn ObjectStore {
        self
    }
}

/// Deserialize table rows into a model type.
pub fn decode_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> BackendResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(BackendError::from))
        .collect()
}

/// Read the `id` column of a returned row as a string.
pub fn row_id(row: &Value) -> BackendResult<String> {
    match row.get("id") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(BackendError::Remote {
            status: 200,
            message: "Returned row has no id".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_id_forms() {
        assert_eq!(row_id(&json!({"id": 17})).unwrap(), "17");
        assert_eq!(row_id(&json!({"id": "a-b"})).unwrap(), "a-b");
        assert!(row_id(&json!({"name": "x"})).is_err());
    }

    #[test]
    fn test_session_expiry() {
        let session = AuthSession {
            access_token: "t".into(),
            refresh_token: String::new(),
            expires_at: Some(1_000),
            user: AuthUser {
                id: "u".into(),
                email: None,
                user_metadata: Value::Null,
                identities: vec![],
            },
        };
        assert!(!session.is_expired(999));
        assert!(session.is_expired(1_000));
    }

    #[test]
    fn test_session_debug_hides_tokens() {
        let session = AuthSession {
            access_token: "eyJhbGciOiJIUzI1NiJ9.secret".into(),
            refresh_token: "refresh-secret".into(),
            expires_at: Some(1_000),
            user: AuthUser {
                id: "u".into(),
                email: Some("dr@clinic.org".into()),
                user_metadata: Value::Null,
                identities: vec![],
            },
        };
        let printed = format!("{:?}", session);
        assert!(!printed.contains("eyJhbGciOiJIUzI1NiJ9.secret"));
        assert!(!printed.contains("refresh-secret"));
        assert!(printed.contains("dr@clinic.org"));
    }

    #[test]
    fn test_user_message_strips_status() {
        let err = BackendError::Remote {
            status: 400,
            message: "duplicate key value".into(),
        };
        assert_eq!(err.user_message(), "duplicate key value");
        assert_eq!(
            BackendError::NotFound("appointment 9".into()).user_message(),
            "Record not found: appointment 9"
        );
    }
}
