//! Downloads, uploads, copies and moves.
//!
//! Each operation resolves its prerequisites concurrently (target directory,
//! source file, transfer object) before handing the actual work to the
//! platform. Downloads are retried; everything else fails on the first fault.

use url::Url;

use super::locator::FileSource;
use super::naming::{file_name_from_url, UNKNOWN_FILE_NAME};
use super::service::{FileOf, FileService};
use crate::error::{file_codes, truncate_url, Result, ServiceError};
use crate::platform::{
    DownloadOptions, Entry, FileSystem, Platform, Transport, UploadOptions, UploadResult,
};

/// URL of `file_name` inside the directory at `dir_url`, with the name
/// percent-encoded as a single path segment.
fn child_url(dir_url: &str, file_name: &str) -> Option<String> {
    let mut url = Url::parse(dir_url).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(file_name);
    Some(url.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relocation {
    Copy,
    Move,
}

impl<P: Platform> FileService<P> {
    /// Download `url` into the directory `path`, creating it as needed.
    ///
    /// Without `file_name` the name is taken from the end of the URL
    /// (`"unknown"` if there is none). `attempts` is the number of retries
    /// after the first failed try; `None` or `0` uses the service default.
    pub async fn download_file(
        &self,
        url: &str,
        path: &str,
        file_name: Option<&str>,
        options: Option<&DownloadOptions>,
        attempts: Option<u32>,
    ) -> Result<FileOf<P>> {
        let (dir, transport) = tokio::try_join!(
            self.get_directory_recursive(path, None),
            self.file_transfer()
        )?;

        let file_name = file_name
            .filter(|name| !name.is_empty())
            .or_else(|| file_name_from_url(url))
            .unwrap_or(UNKNOWN_FILE_NAME);
        let dir_url = dir.to_url();
        let target = child_url(&dir_url, file_name).ok_or_else(|| {
            let code = file_codes::ENCODING_ERR;
            tracing::warn!(dir = %dir_url, file_name, "Unable to build download target");
            ServiceError::FileEntry {
                path: format!("{}/{}", dir.full_path(), file_name),
                code,
                reason: self.codes.file(code),
            }
        })?;

        let default_options = DownloadOptions::default();
        let options = options.unwrap_or(&default_options);
        let attempts = attempts
            .filter(|n| *n > 0)
            .unwrap_or(self.default_attempts);

        self.download_with_retry(transport, url, &target, options, attempts)
            .await?;

        let fs = self.file_system().await?;
        let file = fs.resolve_url(&target).await.map_err(|e| {
            let reason = self.codes.file(e.code);
            ServiceError::FileEntry {
                path: target.clone(),
                code: e.code,
                reason,
            }
        })?;

        tracing::info!(source = url, destination = %file.to_url(), "Download complete");
        Ok(file)
    }

    async fn download_with_retry(
        &self,
        transport: &P::Transport,
        url: &str,
        target: &str,
        options: &DownloadOptions,
        attempts: u32,
    ) -> Result<()> {
        let mut failures: u32 = 0;

        loop {
            tracing::info!(attempt = failures + 1, source = url, destination = target, "Downloading file");

            let err = match transport.download(url, target, false, options).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            failures += 1;
            let reason = self.codes.transfer(err.code);
            tracing::warn!(
                attempt = failures,
                code = err.code,
                reason,
                status = ?err.http_status,
                source = %err.source_url,
                destination = %err.target,
                "File download error"
            );

            if failures > attempts {
                return Err(ServiceError::Download {
                    source_url: truncate_url(&err.source_url),
                    code: err.code,
                    http_status: err.http_status,
                    reason,
                });
            }

            tracing::info!(source = %err.source_url, destination = target, "Re-trying download");
        }
    }

    /// Upload the file at `file_path` to `server_url` as `file_name`.
    ///
    /// The MIME type is inferred when `options` carries none; an unknown type
    /// is sent as empty and does not stop the upload.
    pub async fn upload_file(
        &self,
        file_path: &str,
        server_url: &str,
        file_name: &str,
        options: Option<UploadOptions>,
        trust_all: bool,
    ) -> Result<UploadResult> {
        if file_name.is_empty() {
            return Err(ServiceError::MissingFileName);
        }

        tracing::info!(file_path, server_url, file_name, "Uploading file");

        let (entry, transport) = tokio::try_join!(
            self.get_file_entry(file_path, None, None),
            self.file_transfer()
        )?;

        let mut options = options.unwrap_or_default();
        options.file_name = file_name.to_string();
        if options.mime_type.as_deref().is_none_or(str::is_empty) {
            let mime = self
                .get_file_mime_type(FileSource::Entry(entry.clone()), false)
                .await;
            options.mime_type = Some(mime);
        }

        let native_url = entry.to_native_url();
        match transport
            .upload(&native_url, server_url, &options, trust_all)
            .await
        {
            Ok(result) => {
                tracing::info!(source = %native_url, server_url, file_name, "Upload complete");
                Ok(result)
            }
            Err(err) => {
                let reason = self.codes.transfer(err.code);
                tracing::warn!(
                    code = err.code,
                    reason,
                    status = ?err.http_status,
                    source = %err.source_url,
                    destination = %err.target,
                    "File upload error"
                );
                Err(ServiceError::Upload {
                    target: truncate_url(&err.target),
                    code: err.code,
                    http_status: err.http_status,
                    reason,
                })
            }
        }
    }

    /// Copy the file at `from` into the directory `to`, creating it as needed.
    pub async fn copy_file(&self, from: &str, to: &str, new_name: Option<&str>) -> Result<FileOf<P>> {
        self.relocate(Relocation::Copy, from, to, new_name).await
    }

    /// Move the file at `from` into the directory `to`, creating it as needed.
    pub async fn move_file(&self, from: &str, to: &str, new_name: Option<&str>) -> Result<FileOf<P>> {
        self.relocate(Relocation::Move, from, to, new_name).await
    }

    async fn relocate(
        &self,
        op: Relocation,
        from: &str,
        to: &str,
        new_name: Option<&str>,
    ) -> Result<FileOf<P>> {
        tracing::info!(?op, from, to, new_name = ?new_name, "Relocating file");

        let (entry, dir) = tokio::try_join!(
            self.get_file_entry(from, None, None),
            self.get_directory_recursive(to, None)
        )
        .inspect_err(|e| {
            tracing::warn!(?op, from, to, new_name = ?new_name, error = %e, "Error getting file to relocate");
        })?;

        let fs = self.file_system().await?;
        let result = match op {
            Relocation::Copy => fs.copy_to(&entry, &dir, new_name).await,
            Relocation::Move => fs.move_to(&entry, &dir, new_name).await,
        };

        match result {
            Ok(file) => {
                tracing::info!(?op, from, destination = %file.to_url(), "Relocation complete");
                Ok(file)
            }
            Err(e) => {
                let reason = self.codes.file(e.code);
                tracing::warn!(?op, from, to, new_name = ?new_name, code = e.code, reason, "Error relocating file");
                let (from, to) = (from.to_string(), to.to_string());
                Err(match op {
                    Relocation::Copy => ServiceError::Copy {
                        from,
                        to,
                        code: e.code,
                        reason,
                    },
                    Relocation::Move => ServiceError::Move {
                        from,
                        to,
                        code: e.code,
                        reason,
                    },
                })
            }
        }
    }
}
