//! Patient file uploads.
//!
//! Files are uploaded one at a time to `uploads/{user_id}/{unix_millis}-{name}`
//! in the patient-files bucket. The batch stops at the first failure.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::backend::{BackendError, ObjectStore, UploadOptions};

/// Upload errors.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Please select files to upload")]
    NothingSelected,

    #[error("Could not upload file: {file_name}. Reason: {reason}")]
    Failed {
        file_name: String,
        reason: String,
        /// Files stored before the failure
        uploaded: Vec<UploadReceipt>,
    },
}

pub type UploadResult<T> = Result<T, UploadError>;

/// A file picked by the user, not yet uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: "application/octet-stream".to_string(),
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// A stored file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadReceipt {
    pub file_name: String,
    /// Object path inside the bucket
    pub path: String,
    /// Key reported by the store, "{bucket}/{path}"
    pub key: String,
    pub size: u64,
    /// Hex SHA-256 of the content
    pub sha256: String,
}

/// Files waiting to be uploaded and the progress of the current batch.
#[derive(Debug, Clone, Default)]
pub struct UploadSelection {
    files: Vec<PendingFile>,
    progress: f64,
}

impl UploadSelection {
    /// Replace the selection.
    pub fn select(&mut self, files: Vec<PendingFile>) {
        self.files = files;
    }

    pub fn files(&self) -> &[PendingFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Percent complete of the running batch; 0 when idle.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.progress = 0.0;
    }
}

/// Object path for an uploaded file.
pub fn object_path(user_id: &str, unix_millis: i64, file_name: &str) -> String {
    format!("uploads/{}/{}-{}", user_id, unix_millis, file_name)
}

/// Hex SHA-256 digest of file content.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Uploads a selection into one bucket.
#[derive(Debug, Clone)]
pub struct Uploader {
    bucket: String,
    cache_control_secs: u32,
}

impl Uploader {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            cache_control_secs: 3600,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload every selected file in order.
    ///
    /// `on_progress` is called with the running percentage after each stored
    /// file. Progress resets to 0 when the batch ends, successful or not.
    pub fn upload_all(
        &self,
        store: &dyn ObjectStore,
        user_id: &str,
        token: Option<&str>,
        selection: &mut UploadSelection,
        on_progress: &mut dyn FnMut(f64),
    ) -> UploadResult<Vec<UploadReceipt>> {
        if selection.is_empty() {
            return Err(UploadError::NothingSelected);
        }

        let UploadSelection { files, progress } = selection;
        let step = 100.0 / files.len() as f64;
        *progress = 0.0;
        let mut receipts = Vec::with_capacity(files.len());

        for file in files.iter() {
            match self.upload_one(store, user_id, token, file) {
                Ok(receipt) => {
                    tracing::info!(path = %receipt.path, size = receipt.size, "File uploaded");
                    receipts.push(receipt);
                    *progress += step;
                    on_progress(*progress);
                }
                Err(e) => {
                    tracing::error!(file = %file.name, error = %e, "Error uploading file");
                    *progress = 0.0;
                    return Err(UploadError::Failed {
                        file_name: file.name.clone(),
                        reason: e.user_message(),
                        uploaded: receipts,
                    });
                }
            }
        }

        *progress = 0.0;
        Ok(receipts)
    }

    fn upload_one(
        &self,
        store: &dyn ObjectStore,
        user_id: &str,
        token: Option<&str>,
        file: &PendingFile,
    ) -> Result<UploadReceipt, BackendError> {
        let path = object_path(user_id, chrono::Utc::now().timestamp_millis(), &file.name);
        let options = UploadOptions {
            cache_control_secs: self.cache_control_secs,
            upsert: false,
            content_type: file.content_type.clone(),
        };

        let stored = store.upload(&self.bucket, &path, &file.bytes, &options, token)?;
        Ok(UploadReceipt {
            file_name: file.name.clone(),
            path,
            key: stored.key,
            size: file.bytes.len() as u64,
            sha256: content_digest(&file.bytes),
        })
    }
}
