//! Hosted backend over HTTP.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde_json::{json, Value};

use super::{
    AuthProvider, AuthSession, AuthUser, BackendError, BackendResult, ObjectStore,
    SignUpResponse, StoredObject, TableStore, UploadOptions,
};
use crate::config::BackendConfig;

/// REST client for the hosted table, auth and storage APIs.
pub struct RestBackend {
    base_url: String,
    anon_key: String,
    client: Client,
    timeout_secs: u64,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.url.trim().trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, endpoint)
    }

    /// Object URL with every bucket and path segment percent-encoded.
    fn object_url(&self, bucket: &str, path: &str) -> BackendResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| BackendError::Http(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::Http(format!("Invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["storage", "v1", "object", bucket])
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    /// Attach the API key and bearer token. Anonymous requests bear the key itself.
    fn authorize(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }

    fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().map_err(|e| {
            if e.is_connect() {
                BackendError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                BackendError::Http(format!("Request timed out after {}s", self.timeout_secs))
            } else {
                BackendError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Remote {
                status: status.as_u16(),
                message: remote_error_message(&body),
            });
        }
        Ok(response)
    }

    fn json_body(response: Response) -> BackendResult<Value> {
        let text = response
            .text()
            .map_err(|e| BackendError::Http(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn rows(response: Response) -> BackendResult<Vec<Value>> {
        match Self::json_body(response)? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }
}

impl TableStore for RestBackend {
    fn select_all(&self, table: &str, token: Option<&str>) -> BackendResult<Vec<Value>> {
        tracing::debug!(table, "select all");
        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*")]);
        let response = self.send(self.authorize(request, token))?;
        Self::rows(response)
    }

    fn insert(&self, table: &str, row: &Value, token: Option<&str>) -> BackendResult<Value> {
        tracing::debug!(table, %row, "insert");
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&json!([row]));
        let response = self.send(self.authorize(request, token))?;

        Self::rows(response)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Remote {
                status: 201,
                message: format!("Insert into {} returned no rows", table),
            })
    }

    fn update(
        &self,
        table: &str,
        id: &str,
        patch: &Value,
        token: Option<&str>,
    ) -> BackendResult<Vec<Value>> {
        tracing::debug!(table, id, "update");
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", id_filter(id))])
            .header("Prefer", "return=representation")
            .json(patch);
        let response = self.send(self.authorize(request, token))?;
        Self::rows(response)
    }

    fn delete(&self, table: &str, id: &str, token: Option<&str>) -> BackendResult<()> {
        tracing::debug!(table, id, "delete");
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", id_filter(id))]);
        self.send(self.authorize(request, token))?;
        Ok(())
    }
}

impl AuthProvider for RestBackend {
    fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let response = self
            .send(self.authorize(request, None))
            .map_err(|e| match e {
                BackendError::Remote { status, message } if (400..500).contains(&status) => {
                    BackendError::Auth(message)
                }
                other => other,
            })?;
        Ok(serde_json::from_value(Self::json_body(response)?)?)
    }

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &Value,
    ) -> BackendResult<SignUpResponse> {
        let request = self.client.post(self.auth_url("signup")).json(&json!({
            "email": email,
            "password": password,
            "data": metadata,
        }));
        let response = self.send(self.authorize(request, None))?;
        parse_sign_up(Self::json_body(response)?)
    }

    fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let request = self.client.post(self.auth_url("logout"));
        self.send(self.authorize(request, Some(access_token)))?;
        Ok(())
    }

    fn health(&self) -> BackendResult<()> {
        let request = self.client.get(self.auth_url("health"));
        self.send(self.authorize(request, None))?;
        Ok(())
    }
}

impl ObjectStore for RestBackend {
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        options: &UploadOptions,
        token: Option<&str>,
    ) -> BackendResult<StoredObject> {
        tracing::debug!(bucket, path, size = bytes.len(), "upload");
        let request = self
            .client
            .post(self.object_url(bucket, path)?)
            .header("cache-control", format!("max-age={}", options.cache_control_secs))
            .header("x-upsert", options.upsert.to_string())
            .header("content-type", &options.content_type)
            .body(bytes.to_vec());
        let response = self.send(self.authorize(request, token))?;

        let key = Self::json_body(response)?
            .get("Key")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/{}", bucket, path));
        Ok(StoredObject { key })
    }
}

/// Row filter matching a single id.
fn id_filter(id: &str) -> String {
    format!("eq.{}", id)
}

/// Pull a human-readable message out of an error body.
///
/// The table, auth and storage APIs each name the field differently.
pub fn remote_error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        ["message", "msg", "error_description", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_str))
    });

    match message {
        Some(m) => m.to_string(),
        None if body.trim().is_empty() => "Empty response".to_string(),
        None => body.trim().to_string(),
    }
}

/// Interpret a sign-up response.
///
/// With email confirmation disabled the service answers with a full session;
/// otherwise it answers with the bare user.
pub fn parse_sign_up(body: Value) -> BackendResult<SignUpResponse> {
    if body.get("access_token").is_some() {
        let session: AuthSession = serde_json::from_value(body)?;
        return Ok(SignUpResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }

    let nested = body.get("user").filter(|u| !u.is_null()).cloned();
    let user = match nested {
        Some(user) => Some(serde_json::from_value::<AuthUser>(user)?),
        None if body.get("id").is_some() => Some(serde_json::from_value::<AuthUser>(body)?),
        None => None,
    };
    Ok(SignUpResponse {
        user,
        session: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> RestBackend {
        RestBackend::new(&BackendConfig::new("https://demo.supabase.co/", "anon-key")).unwrap()
    }

    #[test]
    fn test_urls() {
        let backend = backend();
        assert_eq!(backend.base_url(), "https://demo.supabase.co");
        assert_eq!(
            backend.table_url("patients"),
            "https://demo.supabase.co/rest/v1/patients"
        );
        assert_eq!(
            backend.auth_url("signup"),
            "https://demo.supabase.co/auth/v1/signup"
        );
        assert_eq!(
            backend
                .object_url("patient-files", "uploads/u1/1-scan.pdf")
                .unwrap()
                .as_str(),
            "https://demo.supabase.co/storage/v1/object/patient-files/uploads/u1/1-scan.pdf"
        );
        assert_eq!(id_filter("42"), "eq.42");
    }

    #[test]
    fn test_object_url_encodes_file_names() {
        let url = backend()
            .object_url("patient-files", "uploads/u1/1700000000000-lab results #2?.pdf")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/storage/v1/object/patient-files/uploads/u1/1700000000000-lab%20results%20%232%3F.pdf"
        );
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_remote_error_message_fields() {
        assert_eq!(
            remote_error_message(r#"{"message": "duplicate key value"}"#),
            "duplicate key value"
        );
        assert_eq!(
            remote_error_message(r#"{"error": "invalid_grant", "error_description": "Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(remote_error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(remote_error_message(""), "Empty response");
    }

    #[test]
    fn test_parse_sign_up_with_session() {
        let body = json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_at": 1_800_000_000,
            "user": {"id": "u1", "email": "dr@clinic.org", "identities": [{"id": "i1"}]}
        });
        let parsed = parse_sign_up(body).unwrap();
        assert_eq!(parsed.session.unwrap().access_token, "at");
        assert_eq!(parsed.user.unwrap().identities.len(), 1);
    }

    #[test]
    fn test_parse_sign_up_bare_user() {
        let body = json!({"id": "u2", "email": "dr@clinic.org", "identities": []});
        let parsed = parse_sign_up(body).unwrap();
        assert!(parsed.session.is_none());
        let user = parsed.user.unwrap();
        assert_eq!(user.id, "u2");
        assert!(user.identities.is_empty());
    }
}
