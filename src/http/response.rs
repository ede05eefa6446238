//! HTTP Response with body access.

#[cfg(feature = "json")]
use crate::base::neterror::NetError;
use crate::base::neterror::{CURLE_COULDNT_RESOLVE_HOST, CURLE_COULDNT_RESOLVE_PROXY};
use crate::http::headerparser::HeaderBlock;
use crate::http::transaction::TransferInfo;
use bytes::Bytes;
use http::StatusCode;
use std::path::{Path, PathBuf};

/// The result of one transfer.
#[derive(Debug, Clone)]
pub struct Response {
    pub(crate) headers: HeaderBlock,
    pub(crate) request_headers: HeaderBlock,
    pub(crate) body: Option<Bytes>,
    pub(crate) info: TransferInfo,
    pub(crate) error_number: i32,
    pub(crate) error: Option<String>,
    pub(crate) file: Option<PathBuf>,
}

impl Response {
    /// Status code from the status line, falling back to the engine's record.
    pub fn status_code(&self) -> u16 {
        match self.info.http_code {
            0 => self.headers.status_code().unwrap_or(0),
            code => code,
        }
    }

    /// Get the status code as an `http::StatusCode`.
    pub fn status(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status_code()).ok()
    }

    /// Code and reason phrase, e.g. `404 Not Found`.
    pub fn status_line(&self) -> &str {
        self.headers.status().unwrap_or("")
    }

    /// Get a reference to the response headers.
    pub fn headers(&self) -> &HeaderBlock {
        &self.headers
    }

    /// The header block that was actually sent.
    pub fn request_headers(&self) -> &HeaderBlock {
        &self.request_headers
    }

    /// Body bytes; `None` when the transfer failed.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Body as text (lossy UTF-8); empty when the transfer failed.
    pub fn text(&self) -> String {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// Decode the body as JSON.
    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| NetError::InvalidState("response has no body".to_string()))?;
        serde_json::from_slice(body)
            .map_err(|e| NetError::InvalidState(format!("response is not valid JSON: {}", e)))
    }

    pub fn info(&self) -> &TransferInfo {
        &self.info
    }

    /// Native error code; 0 on success.
    pub fn error_number(&self) -> i32 {
        self.error_number
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// File the body was stored in, for `DOWNLOAD` requests.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// The same "ok" rule the transport reports: no native error and a
    /// status outside `300..600`.
    pub fn is_ok(&self) -> bool {
        !(300..600).contains(&self.status_code()) && self.error_number == 0
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status_code(), 301 | 302 | 303 | 307 | 308)
            && self.headers.contains("Location")
    }

    /// True when the proxy or the host could not be resolved.
    pub fn is_proxy_fail(&self) -> bool {
        self.error_number == CURLE_COULDNT_RESOLVE_PROXY
            || self.error_number == CURLE_COULDNT_RESOLVE_HOST
    }
}
