//! The native transfer engine seam.
//!
//! [`Transport`](crate::http::transaction::Transport) never talks to libcurl
//! directly. It opens a [`TransferHandle`] through a [`TransferEngine`],
//! pushes options into it, performs the transfer once and closes it.
//! [`CurlEngine`] is the production engine; tests plug in scripted ones.

pub mod curl;

pub use self::curl::CurlEngine;

use crate::base::neterror::NetError;
use crate::http::options::{CurlOption, OptionValue};
use crate::http::transaction::TransferInfo;
use bytes::Bytes;

/// Creates native handles.
pub trait TransferEngine: Send + Sync {
    /// Open a handle for `url`.
    fn open(&self, url: &str) -> Result<Box<dyn TransferHandle>, NetError>;
}

/// One configured native handle.
pub trait TransferHandle: Send {
    /// Apply one option. Fails when the value has the wrong shape for the
    /// option or the engine rejects it.
    fn set_option(&mut self, option: CurlOption, value: &OptionValue) -> Result<(), NetError>;

    /// Run the transfer. Native failures are reported in the outcome, not
    /// as an error.
    fn perform(&mut self) -> TransferOutcome;

    /// Release the handle.
    fn close(self: Box<Self>);
}

/// Raw result of one transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferOutcome {
    /// Response body; `None` when the transfer failed.
    pub body: Option<Bytes>,
    /// Native error code, 0 on success.
    pub error_code: i32,
    pub error_message: Option<String>,
    pub info: TransferInfo,
    /// Header block as sent on the wire, when the engine captured it.
    pub request_header: Option<String>,
    /// Raw response header block, status lines included.
    pub response_header: String,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }
}
