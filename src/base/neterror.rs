use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::transaction::TransferInfo;
use std::sync::Arc;
use thiserror::Error;

/// libcurl `CURLE_COULDNT_RESOLVE_PROXY`.
pub const CURLE_COULDNT_RESOLVE_PROXY: i32 = 5;
/// libcurl `CURLE_COULDNT_RESOLVE_HOST`.
pub const CURLE_COULDNT_RESOLVE_HOST: i32 = 6;

#[derive(Debug, Error)]
pub enum NetError {
    // Configuration errors, raised before any I/O happens
    #[error("There is no option \"{name}\", therefore it cannot be set")]
    InvalidOption { name: String },
    #[error("Option \"{option}\" expects {expected}")]
    InvalidOptionValue {
        option: &'static str,
        expected: &'static str,
    },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Not supported: {0}")]
    NotSupported(String),

    // Native engine errors
    #[error("cURL error {code}: {message}")]
    Curl { code: i32, message: String },
    #[error("{message} {authority}")]
    FailedRequest {
        code: i32,
        message: String,
        authority: String,
        info: Box<TransferInfo>,
        request: Box<Request>,
    },

    // Caller-level failures
    #[error("Response status {}", .response.status_code())]
    BadStatus {
        request: Box<Request>,
        response: Box<Response>,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: Arc<std::io::Error>,
    },
    #[error("Transfer task failed: {0}")]
    TaskFailed(String),
}

impl NetError {
    /// Build an `Io` error for the given path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        NetError::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Build a configuration-time `Curl` error (no native code involved).
    pub fn curl(message: impl Into<String>) -> Self {
        NetError::Curl {
            code: 0,
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            NetError::BadStatus { response, .. } => Some(response.status_code()),
            _ => None,
        }
    }

    /// Native error code carried by the error, if any.
    pub fn curl_code(&self) -> Option<i32> {
        match self {
            NetError::Curl { code, .. } | NetError::FailedRequest { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the transfer failed because the proxy or host could not be resolved.
    pub fn is_proxy_fail(&self) -> bool {
        matches!(
            self,
            NetError::FailedRequest { code, .. }
                if *code == CURLE_COULDNT_RESOLVE_PROXY || *code == CURLE_COULDNT_RESOLVE_HOST
        )
    }

    /// The request that produced a caller-level failure.
    pub fn request(&self) -> Option<&Request> {
        match self {
            NetError::BadStatus { request, .. } | NetError::FailedRequest { request, .. } => {
                Some(request)
            }
            _ => None,
        }
    }

    /// The response that produced a caller-level failure.
    pub fn response(&self) -> Option<&Response> {
        match self {
            NetError::BadStatus { response, .. } => Some(response),
            _ => None,
        }
    }
}

impl From<curl::Error> for NetError {
    fn from(err: curl::Error) -> Self {
        let message = match err.extra_description() {
            Some(extra) => format!("{}: {}", err.description(), extra),
            None => err.description().to_string(),
        };
        NetError::Curl {
            code: err.code() as i32,
            message,
        }
    }
}
