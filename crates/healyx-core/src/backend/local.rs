//! SQLite implementation of the backend contract.
//!
//! Mirrors the hosted service closely enough for offline development and
//! tests: rows get increasing integer ids per table, sign-up confirms
//! immediately, and a duplicate sign-up answers with an identity-less user
//! the way the hosted service does.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::{
    AuthProvider, AuthSession, AuthUser, BackendError, BackendResult, ObjectStore,
    SignUpResponse, StoredObject, TableStore, UploadOptions, KNOWN_TABLES, SCHEMA,
};

/// Session lifetime in seconds.
const SESSION_TTL_SECS: i64 = 3600;

/// SQLite-backed store.
pub struct LocalBackend {
    conn: Connection,
}

impl LocalBackend {
    /// Open store at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> BackendResult<Self> {
        let conn = Connection::open(path)?;
        let backend = Self { conn };
        backend.initialize()?;
        Ok(backend)
    }

    /// Create in-memory store (for testing).
    pub fn open_in_memory() -> BackendResult<Self> {
        let conn = Connection::open_in_memory()?;
        let backend = Self { conn };
        backend.initialize()?;
        Ok(backend)
    }

    fn initialize(&self) -> BackendResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Content of a stored object.
    pub fn object_bytes(&self, bucket: &str, path: &str) -> BackendResult<Option<Vec<u8>>> {
        Ok(self
            .conn
            .query_row(
                "SELECT content FROM storage_objects WHERE bucket = ?1 AND path = ?2",
                params![bucket, path],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn check_table(table: &str) -> BackendResult<()> {
        if KNOWN_TABLES.contains(&table) {
            Ok(())
        } else {
            Err(BackendError::NotFound(format!("table {}", table)))
        }
    }

    /// Issue the next id for `table`. Stores created before the sequence
    /// table existed continue from their highest stored id.
    fn next_id(&self, table: &str) -> BackendResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO table_sequences (table_name, last_id)
            VALUES (?1, (SELECT COALESCE(MAX(id), 0) + 1 FROM table_rows WHERE table_name = ?1))
            ON CONFLICT(table_name) DO UPDATE SET last_id = last_id + 1
            "#,
            [table],
        )?;
        Ok(self.conn.query_row(
            "SELECT last_id FROM table_sequences WHERE table_name = ?",
            [table],
            |row| row.get(0),
        )?)
    }

    fn load_row(&self, table: &str, id: i64) -> BackendResult<Option<Map<String, Value>>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM table_rows WHERE table_name = ?1 AND id = ?2",
                params![table, id],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(text) => match serde_json::from_str(&text)? {
                Value::Object(map) => Ok(Some(map)),
                _ => Ok(Some(Map::new())),
            },
            None => Ok(None),
        }
    }

    fn user_by_id(&self, id: &str) -> BackendResult<AuthUser> {
        let (email, metadata): (String, String) = self
            .conn
            .query_row(
                "SELECT email, user_metadata FROM auth_users WHERE id = ?",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| BackendError::NotFound(format!("user {}", id)))?;

        Ok(AuthUser {
            id: id.to_string(),
            email: Some(email),
            user_metadata: serde_json::from_str(&metadata)?,
            identities: vec![serde_json::json!({ "provider": "email", "user_id": id })],
        })
    }

    fn create_session(&self, user: AuthUser) -> BackendResult<AuthSession> {
        let access_token = uuid::Uuid::new_v4().simple().to_string();
        let refresh_token = uuid::Uuid::new_v4().simple().to_string();
        let expires_at = chrono::Utc::now().timestamp() + SESSION_TTL_SECS;

        self.conn.execute(
            r#"
            INSERT INTO auth_sessions (access_token, refresh_token, user_id, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![access_token, refresh_token, user.id, expires_at],
        )?;

        Ok(AuthSession {
            access_token,
            refresh_token,
            expires_at: Some(expires_at),
            user,
        })
    }
}

/// Parse a row id; ids the store could never have issued match nothing.
fn parse_id(id: &str) -> Option<i64> {
    id.trim().parse().ok()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl TableStore for LocalBackend {
    fn select_all(&self, table: &str, _token: Option<&str>) -> BackendResult<Vec<Value>> {
        Self::check_table(table)?;
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM table_rows WHERE table_name = ? ORDER BY id")?;
        let bodies = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        bodies
            .iter()
            .map(|b| serde_json::from_str(b).map_err(BackendError::from))
            .collect()
    }

    fn insert(&self, table: &str, row: &Value, _token: Option<&str>) -> BackendResult<Value> {
        Self::check_table(table)?;
        let mut body = match row {
            Value::Object(map) => map.clone(),
            _ => {
                return Err(BackendError::Remote {
                    status: 400,
                    message: "Row must be a JSON object".to_string(),
                })
            }
        };

        let id = self.next_id(table)?;
        body.insert("id".to_string(), Value::from(id));
        let body = Value::Object(body);

        self.conn.execute(
            "INSERT INTO table_rows (table_name, id, body) VALUES (?1, ?2, ?3)",
            params![table, id, serde_json::to_string(&body)?],
        )?;
        Ok(body)
    }

    fn update(
        &self,
        table: &str,
        id: &str,
        patch: &Value,
        _token: Option<&str>,
    ) -> BackendResult<Vec<Value>> {
        Self::check_table(table)?;
        let Some(id) = parse_id(id) else {
            return Ok(Vec::new());
        };
        let Some(mut body) = self.load_row(table, id)? else {
            return Ok(Vec::new());
        };

        if let Value::Object(changes) = patch {
            for (column, value) in changes {
                if column != "id" {
                    body.insert(column.clone(), value.clone());
                }
            }
        }
        let body = Value::Object(body);

        self.conn.execute(
            r#"
            UPDATE table_rows SET body = ?3, updated_at = datetime('now')
            WHERE table_name = ?1 AND id = ?2
            "#,
            params![table, id, serde_json::to_string(&body)?],
        )?;
        Ok(vec![body])
    }

    fn delete(&self, table: &str, id: &str, _token: Option<&str>) -> BackendResult<()> {
        Self::check_table(table)?;
        if let Some(id) = parse_id(id) {
            self.conn.execute(
                "DELETE FROM table_rows WHERE table_name = ?1 AND id = ?2",
                params![table, id],
            )?;
        }
        Ok(())
    }
}

impl AuthProvider for LocalBackend {
    fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        let found: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT id, password_salt, password_hash FROM auth_users WHERE email = ?",
                [email.trim()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match found {
            Some((id, salt, hash)) if hash_password(&salt, password) == hash => {
                let user = self.user_by_id(&id)?;
                self.create_session(user)
            }
            _ => Err(BackendError::Auth("Invalid login credentials".to_string())),
        }
    }

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &Value,
    ) -> BackendResult<SignUpResponse> {
        let email = email.trim();
        let existing: Option<String> = self
            .conn
            .query_row("SELECT id FROM auth_users WHERE email = ?", [email], |row| {
                row.get(0)
            })
            .optional()?;

        if let Some(id) = existing {
            let mut user = self.user_by_id(&id)?;
            user.identities.clear();
            return Ok(SignUpResponse {
                user: Some(user),
                session: None,
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let salt = uuid::Uuid::new_v4().simple().to_string();
        self.conn.execute(
            r#"
            INSERT INTO auth_users (id, email, password_salt, password_hash, user_metadata)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                id,
                email,
                salt,
                hash_password(&salt, password),
                serde_json::to_string(metadata)?,
            ],
        )?;

        let user = self.user_by_id(&id)?;
        let session = self.create_session(user.clone())?;
        Ok(SignUpResponse {
            user: Some(user),
            session: Some(session),
        })
    }

    fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        self.conn.execute(
            "DELETE FROM auth_sessions WHERE access_token = ?",
            [access_token],
        )?;
        Ok(())
    }

    fn health(&self) -> BackendResult<()> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

impl ObjectStore for LocalBackend {
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        options: &UploadOptions,
        _token: Option<&str>,
    ) -> BackendResult<StoredObject> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM storage_objects WHERE bucket = ?1 AND path = ?2)",
            params![bucket, path],
            |row| row.get(0),
        )?;
        if exists && !options.upsert {
            return Err(BackendError::Conflict("The resource already exists".to_string()));
        }

        let digest = hex::encode(Sha256::digest(bytes));
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO storage_objects
                (bucket, path, content, size, content_type, cache_control, sha256)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                bucket,
                path,
                bytes,
                bytes.len() as i64,
                options.content_type,
                options.cache_control_secs.to_string(),
                digest,
            ],
        )?;

        Ok(StoredObject {
            key: format!("{}/{}", bucket, path),
        })
    }
}
