//! MIME type guessing from file extensions.

use super::locator::FileSource;
use super::naming::file_extension;
use super::service::{FileOf, FileService};
use crate::platform::Platform;

const MIME_BY_EXTENSION: &[(&str, &str)] = &[
    ("jpe", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("mp4", "video/mp4"),
    ("mp4v", "video/mp4"),
    ("mpg4", "video/mp4"),
    ("moov", "video/quicktime"),
    ("mov", "video/quicktime"),
    ("qt", "video/quicktime"),
    // 3gpp may also be video; audio is assumed
    ("3gpp", "audio/3gpp"),
    ("wav", "audio/wav"),
    ("amr", "audio/amr"),
];

const EXTENSION_BY_MIME: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("video/mp4", "mp4"),
    ("video/3gpp", "mp4"),
    ("video/quicktime", "mov"),
    ("audio/3gpp", "3gpp"),
    ("audio/wav", "wav"),
    ("audio/amr", "amr"),
];

/// Guess the MIME type of a file from its extension. Empty when unknown.
pub fn guess_mime_type(file: &str) -> &'static str {
    let ext = file_extension(file, true, false);
    MIME_BY_EXTENSION
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or("")
}

/// Guess a file extension for a MIME type. Empty when unknown.
pub fn guess_extension(mime_type: &str, include_dot: bool) -> String {
    match EXTENSION_BY_MIME.iter().find(|(m, _)| *m == mime_type) {
        Some((_, ext)) if include_dot => format!(".{}", ext),
        Some((_, ext)) => ext.to_string(),
        None => String::new(),
    }
}

impl<P: Platform> FileService<P> {
    /// MIME type of a file.
    ///
    /// Uses the type reported by the platform, falling back to a guess from
    /// the name unless `dont_guess` is set. Files that cannot be resolved
    /// have an empty MIME type.
    pub async fn get_file_mime_type(&self, source: FileSource<FileOf<P>>, dont_guess: bool) -> String {
        let info = match source {
            FileSource::Info(info) => info,
            other => match self.get_file(other).await {
                Ok(info) => info,
                Err(e) => {
                    tracing::debug!(error = %e, "Unable to read file for MIME type");
                    return String::new();
                }
            },
        };

        match info.mime_type.filter(|m| !m.is_empty()) {
            Some(mime) => mime,
            None if !dont_guess => guess_mime_type(&info.name).to_string(),
            None => String::new(),
        }
    }

    /// Guess the MIME type from the file's name only.
    pub fn guess_file_mime_type(&self, source: &FileSource<FileOf<P>>) -> String {
        guess_mime_type(&self.get_file_name(source)).to_string()
    }

    /// Guess an extension from the MIME type the platform reports for the file.
    pub async fn guess_file_extension(&self, source: FileSource<FileOf<P>>, include_dot: bool) -> String {
        let mime = self.get_file_mime_type(source, true).await;
        guess_extension(&mime, include_dot)
    }
}
