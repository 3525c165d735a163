//! Error types for the file service.
//!
//! Native failures arrive from the platform as numeric codes ([`FileError`],
//! [`TransferError`]). The service maps those codes to human readable text
//! through an [`ErrorCodeTable`] and surfaces them as [`ServiceError`].

use std::collections::HashMap;

use thiserror::Error;

/// Text used for codes that have no entry in the table.
pub const UNKNOWN_CODE: &str = "Unknown";

/// Number of characters of a transfer source or target kept in error messages.
pub const TRUNCATED_URL_LEN: usize = 100;

/// Filesystem error codes of the native plugin interface.
pub mod file_codes {
    pub const NOT_FOUND_ERR: i32 = 1;
    pub const SECURITY_ERR: i32 = 2;
    pub const ABORT_ERR: i32 = 3;
    pub const NOT_READABLE_ERR: i32 = 4;
    pub const ENCODING_ERR: i32 = 5;
    pub const NO_MODIFICATION_ALLOWED_ERR: i32 = 6;
    pub const INVALID_STATE_ERR: i32 = 7;
    pub const SYNTAX_ERR: i32 = 8;
    pub const INVALID_MODIFICATION_ERR: i32 = 9;
    pub const QUOTA_EXCEEDED_ERR: i32 = 10;
    pub const TYPE_MISMATCH_ERR: i32 = 11;
    pub const PATH_EXISTS_ERR: i32 = 12;
}

/// Transfer error codes of the native plugin interface.
pub mod transfer_codes {
    pub const FILE_NOT_FOUND_ERR: i32 = 1;
    pub const INVALID_URL_ERR: i32 = 2;
    pub const CONNECTION_ERR: i32 = 3;
    pub const ABORT_ERR: i32 = 4;
    pub const NOT_MODIFIED_ERR: i32 = 5;
}

const FILE_MESSAGES: &[(i32, &str)] = &[
    (file_codes::NOT_FOUND_ERR, "File not found"),
    (file_codes::SECURITY_ERR, "Security error"),
    (file_codes::ABORT_ERR, "Aborted"),
    (file_codes::NOT_READABLE_ERR, "Not readable"),
    (file_codes::ENCODING_ERR, "Encoding error"),
    (file_codes::NO_MODIFICATION_ALLOWED_ERR, "No modification allowed"),
    (file_codes::INVALID_STATE_ERR, "Invalid state"),
    (file_codes::SYNTAX_ERR, "Syntax error"),
    (file_codes::INVALID_MODIFICATION_ERR, "Invalid modification"),
    (file_codes::QUOTA_EXCEEDED_ERR, "Quota exceeded"),
    (file_codes::TYPE_MISMATCH_ERR, "Type mismatch"),
    (file_codes::PATH_EXISTS_ERR, "Path already exists"),
];

const TRANSFER_MESSAGES: &[(i32, &str)] = &[
    (transfer_codes::FILE_NOT_FOUND_ERR, "File not found"),
    (transfer_codes::INVALID_URL_ERR, "Invalid URL"),
    (transfer_codes::CONNECTION_ERR, "Connection error"),
    (transfer_codes::ABORT_ERR, "Transfer aborted"),
    (transfer_codes::NOT_MODIFIED_ERR, "Not modified"),
];

/// Lookup tables from native error codes to human readable text.
#[derive(Debug, Clone)]
pub struct ErrorCodeTable {
    file: HashMap<i32, &'static str>,
    transfer: HashMap<i32, &'static str>,
}

impl ErrorCodeTable {
    /// Build the tables from the plugin interface constants.
    pub fn new() -> Self {
        Self {
            file: FILE_MESSAGES.iter().copied().collect(),
            transfer: TRANSFER_MESSAGES.iter().copied().collect(),
        }
    }

    /// Text for a filesystem error code.
    pub fn file(&self, code: i32) -> &'static str {
        self.file.get(&code).copied().unwrap_or(UNKNOWN_CODE)
    }

    /// Text for a transfer error code.
    pub fn transfer(&self, code: i32) -> &'static str {
        self.transfer.get(&code).copied().unwrap_or(UNKNOWN_CODE)
    }
}

impl Default for ErrorCodeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure reported by the native filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("filesystem error code {code}")]
pub struct FileError {
    /// One of the [`file_codes`] constants.
    pub code: i32,
}

impl FileError {
    pub fn new(code: i32) -> Self {
        Self { code }
    }
}

/// Failure reported by the native transfer facility.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transfer error code {code} ({source_url} -> {target})")]
pub struct TransferError {
    /// One of the [`transfer_codes`] constants.
    pub code: i32,
    /// HTTP status of the response, when one was received.
    pub http_status: Option<u16>,
    /// Source of the transfer.
    pub source_url: String,
    /// Target of the transfer.
    pub target: String,
    /// Response body, when one was received.
    pub body: Option<String>,
}

impl TransferError {
    pub fn new(code: i32, source_url: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            code,
            http_status: None,
            source_url: source_url.into(),
            target: target.into(),
            body: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }
}

/// Errors surfaced by [`FileService`](crate::FileService) operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The host platform never became ready.
    #[error("platform not ready: {0}")]
    NotReady(String),

    /// The device root path could not be resolved.
    #[error("failed to resolve root path: {0}")]
    RootPath(String),

    /// The platform refused to provide a filesystem.
    #[error("Error getting file system ({code})")]
    FileSystem { code: i32 },

    /// A directory could not be retrieved or created.
    #[error("Failed to retrieve directory ({path}): {reason}")]
    Directory {
        path: String,
        code: i32,
        reason: &'static str,
    },

    /// A file entry could not be retrieved.
    #[error("Failed to retrieve file ({path}): {reason}")]
    FileEntry {
        path: String,
        code: i32,
        reason: &'static str,
    },

    /// A directory's children could not be read.
    #[error("Failed to retrieve file list for {name}: {reason}")]
    ListDirectory {
        name: String,
        code: i32,
        reason: &'static str,
    },

    /// A download failed after all attempts.
    #[error("Error downloading file ({source_url}...): {reason}")]
    Download {
        /// Source URL, truncated to [`TRUNCATED_URL_LEN`] characters.
        source_url: String,
        code: i32,
        http_status: Option<u16>,
        reason: &'static str,
    },

    /// An upload failed.
    #[error("Error uploading file ({target}...): {reason}")]
    Upload {
        /// Server URL, truncated to [`TRUNCATED_URL_LEN`] characters.
        target: String,
        code: i32,
        http_status: Option<u16>,
        reason: &'static str,
    },

    /// Upload was requested without a file name.
    #[error("No filename defined for Upload")]
    MissingFileName,

    /// Copying a file failed.
    #[error("Failed to copy file ({from} to {to}): {reason}")]
    Copy {
        from: String,
        to: String,
        code: i32,
        reason: &'static str,
    },

    /// Moving a file failed.
    #[error("Failed to move file ({from} to {to}): {reason}")]
    Move {
        from: String,
        to: String,
        code: i32,
        reason: &'static str,
    },
}

impl ServiceError {
    /// The native error code behind this error, if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::FileSystem { code }
            | Self::Directory { code, .. }
            | Self::FileEntry { code, .. }
            | Self::ListDirectory { code, .. }
            | Self::Download { code, .. }
            | Self::Upload { code, .. }
            | Self::Copy { code, .. }
            | Self::Move { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Keep the first [`TRUNCATED_URL_LEN`] characters of `value`.
pub(crate) fn truncate_url(value: &str) -> String {
    value.chars().take(TRUNCATED_URL_LEN).collect()
}
