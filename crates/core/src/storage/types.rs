//! Backend kinds and file descriptors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// AWS S3 (or any S3-compatible endpoint).
    S3,
    /// Cloudflare R2.
    R2,
    /// Local disk.
    Disk,
    /// Database-backed blob storage.
    Database,
}

impl BackendKind {
    /// Preference order used when no specific rule matches.
    pub const PREFERENCE_ORDER: [Self; 4] = [Self::S3, Self::R2, Self::Disk, Self::Database];

    /// Stable name used in configuration and cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::R2 => "r2",
            Self::Disk => "disk",
            Self::Database => "database",
        }
    }

    /// URI scheme for objects stored in this backend.
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::S3 => "s3://",
            Self::R2 => "r2://",
            Self::Disk => "file://",
            Self::Database => "db://",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a backend name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported storage provider: {0}")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "r2" | "cloudflare_r2" | "cloudflarer2" => Ok(Self::R2),
            "disk" => Ok(Self::Disk),
            "database" | "db" => Ok(Self::Database),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

/// Hints a caller can attach to steer provider selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHints {
    /// Explicit backend preference.
    pub known_provider: Option<BackendKind>,
    /// Module the file belongs to.
    pub module: Option<String>,
    /// Template kind the file was produced from.
    pub template_kind: Option<String>,
    /// Organization that owns the file.
    pub organization_id: Option<String>,
    /// Free-form hints.
    pub metadata: BTreeMap<String, String>,
}

/// Options for an upload request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    pub content_type: String,
    /// Declared size in bytes.
    pub size: u64,
    /// Folder within the bucket. A random folder is used when absent.
    pub folder: Option<String>,
    /// Provider selection hints.
    pub hints: ProviderHints,
}

/// A file stored in one of the backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Unique identifier assigned by the host.
    pub id: String,
    /// Backend the file lives in.
    pub provider: Option<BackendKind>,
    /// Bucket (base path for disk).
    pub bucket: String,
    /// Object key within the bucket.
    pub key: String,
    /// Folder portion of the key.
    pub folder: String,
    /// Fully-qualified object URI, e.g. `s3://bucket/folder/file`.
    pub full_uri: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub content_type: String,
    /// Name supplied on upload.
    pub original_name: String,
    /// Hints recorded at upload time so later operations route back.
    pub hints: ProviderHints,
}

impl StoredFile {
    /// Returns the fully-qualified object locator.
    ///
    /// Falls back to `{provider}:{bucket}:{key}` when no URI was recorded.
    #[must_use]
    pub fn object_uri(&self) -> Option<String> {
        if !self.full_uri.is_empty() {
            return Some(self.full_uri.clone());
        }
        match self.provider {
            Some(kind) if !self.key.is_empty() => {
                Some(format!("{}:{}:{}", kind.as_str(), self.bucket, self.key))
            }
            _ => None,
        }
    }
}

/// An object handed to a provider for upload.
#[derive(Debug, Clone)]
pub struct UploadObject {
    /// Object key.
    pub key: String,
    /// MIME type.
    pub content_type: String,
    /// Object content.
    pub data: Bytes,
}

/// Metadata returned by a provider after upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Backend that stored the object.
    pub provider: BackendKind,
    /// Bucket (base path for disk).
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Fully-qualified URI.
    pub full_uri: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub content_type: String,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
}

/// A downloaded object.
#[derive(Debug, Clone)]
pub struct DownloadedObject {
    /// Object content.
    pub data: Bytes,
    /// Size in bytes.
    pub size: u64,
    /// Download time.
    pub downloaded_at: DateTime<Utc>,
}

impl DownloadedObject {
    pub(crate) fn new(data: Bytes) -> Self {
        Self {
            size: data.len() as u64,
            data,
            downloaded_at: Utc::now(),
        }
    }
}
