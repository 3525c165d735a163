//! HTTP transport for downloads and uploads.
//!
//! Downloads stream into a temporary file next to the target and are
//! renamed into place once the body is complete, so a failed attempt never
//! leaves a truncated file behind. Uploads stream the file as part of a multipart form.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use url::Url;

use super::{DownloadOptions, Transport, UploadMethod, UploadOptions, UploadResult};
use crate::error::{transfer_codes, TransferError};

/// Transfer object speaking HTTP(S).
#[derive(Debug)]
pub struct HttpTransport {
    user_agent: String,
    client: OnceCell<Client>,
    /// Client that accepts any TLS certificate.
    insecure_client: OnceCell<Client>,
}

impl HttpTransport {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            client: OnceCell::new(),
            insecure_client: OnceCell::new(),
        }
    }

    async fn client(&self, trust_all: bool) -> Result<&Client, reqwest::Error> {
        let cell = if trust_all {
            &self.insecure_client
        } else {
            &self.client
        };

        cell.get_or_try_init(|| async {
            Client::builder()
                .user_agent(self.user_agent.clone())
                .danger_accept_invalid_certs(trust_all)
                .build()
        })
        .await
    }
}

/// Transfer error code for an unsuccessful HTTP status.
pub fn status_error_code(status: StatusCode) -> i32 {
    match status {
        StatusCode::NOT_FOUND => transfer_codes::FILE_NOT_FOUND_ERR,
        StatusCode::NOT_MODIFIED => transfer_codes::NOT_MODIFIED_ERR,
        _ => transfer_codes::CONNECTION_ERR,
    }
}

/// Transfer error code for a request failure.
fn request_error_code(err: &reqwest::Error) -> i32 {
    if err.is_builder() {
        transfer_codes::INVALID_URL_ERR
    } else {
        transfer_codes::CONNECTION_ERR
    }
}

/// Parse a remote URL, accepting only HTTP(S).
fn parse_remote(url: &str) -> Option<Url> {
    Url::parse(url)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// Local path behind a `file://` URL. Plain paths are accepted as-is.
fn local_path(target: &str) -> Option<PathBuf> {
    match Url::parse(target) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
        Ok(_) => None,
        Err(_) => Some(PathBuf::from(target)),
    }
}

/// Temporary sibling of `path` used while a download is in flight.
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let partial = format!(
        ".{}.{:x}_{}.part",
        name,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos(),
        rand::random::<u32>()
    );
    path.with_file_name(partial)
}

async fn write_body(response: &mut reqwest::Response, path: &Path) -> Result<(), WriteFailure> {
    let mut file = fs::File::create(path).await.map_err(WriteFailure::Io)?;
    while let Some(chunk) = response.chunk().await.map_err(WriteFailure::Body)? {
        file.write_all(&chunk).await.map_err(WriteFailure::Io)?;
    }
    file.flush().await.map_err(WriteFailure::Io)?;
    Ok(())
}

enum WriteFailure {
    Io(std::io::Error),
    Body(reqwest::Error),
}

impl Transport for HttpTransport {
    async fn download(
        &self,
        source: &str,
        target: &str,
        trust_all: bool,
        options: &DownloadOptions,
    ) -> Result<(), TransferError> {
        let fail = |code: i32| TransferError::new(code, source, target);

        let url = parse_remote(source).ok_or_else(|| fail(transfer_codes::INVALID_URL_ERR))?;
        let path = local_path(target).ok_or_else(|| fail(transfer_codes::FILE_NOT_FOUND_ERR))?;

        let client = self
            .client(trust_all)
            .await
            .map_err(|_| fail(transfer_codes::CONNECTION_ERR))?;

        let mut request = client.get(url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| fail(request_error_code(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fail(status_error_code(status))
                .with_status(status.as_u16())
                .with_body(body));
        }

        let partial = partial_path(&path);
        let written = match write_body(&mut response, &partial).await {
            Ok(()) => fs::rename(&partial, &path).await.map_err(WriteFailure::Io),
            Err(e) => Err(e),
        };

        if let Err(failure) = written {
            if let Err(e) = fs::remove_file(&partial).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = ?partial, error = %e, "Failed to cleanup partial download");
                }
            }
            let code = match failure {
                WriteFailure::Io(e) => {
                    tracing::warn!(path = ?path, error = %e, "Failed to store download");
                    transfer_codes::FILE_NOT_FOUND_ERR
                }
                WriteFailure::Body(e) => {
                    tracing::warn!(source, error = %e, "Download body interrupted");
                    transfer_codes::CONNECTION_ERR
                }
            };
            return Err(fail(code).with_status(status.as_u16()));
        }

        Ok(())
    }

    async fn upload(
        &self,
        file_url: &str,
        server_url: &str,
        options: &UploadOptions,
        trust_all: bool,
    ) -> Result<UploadResult, TransferError> {
        let fail = |code: i32| TransferError::new(code, file_url, server_url);

        let server = parse_remote(server_url).ok_or_else(|| fail(transfer_codes::INVALID_URL_ERR))?;
        let path = local_path(file_url).ok_or_else(|| fail(transfer_codes::FILE_NOT_FOUND_ERR))?;

        let file = fs::File::open(&path)
            .await
            .map_err(|_| fail(transfer_codes::FILE_NOT_FOUND_ERR))?;
        let meta = file
            .metadata()
            .await
            .map_err(|_| fail(transfer_codes::FILE_NOT_FOUND_ERR))?;
        if !meta.is_file() {
            return Err(fail(transfer_codes::FILE_NOT_FOUND_ERR));
        }
        let bytes_sent = meta.len();

        let mut part = Part::stream_with_length(Body::from(file), bytes_sent)
            .file_name(options.file_name.clone());
        if let Some(mime) = options.mime_type.as_deref().filter(|m| !m.is_empty()) {
            part = part.mime_str(mime).map_err(|_| {
                tracing::warn!(mime, "Rejected MIME type for upload");
                fail(transfer_codes::ABORT_ERR)
            })?;
        }

        let mut form = Form::new().part(options.file_key.clone(), part);
        for (name, value) in &options.params {
            form = form.text(name.clone(), value.clone());
        }

        let client = self
            .client(trust_all)
            .await
            .map_err(|_| fail(transfer_codes::CONNECTION_ERR))?;

        let mut request = match options.method {
            UploadMethod::Post => client.post(server),
            UploadMethod::Put => client.put(server),
        };
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .multipart(form)
            .send()
            .await
            .map_err(|e| fail(request_error_code(&e)))?;

        let status = response.status();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(fail(status_error_code(status))
                .with_status(status.as_u16())
                .with_body(body));
        }

        Ok(UploadResult {
            bytes_sent,
            response_code: status.as_u16(),
            response: body,
            headers,
        })
    }
}
