//! # curlreq
//!
//! Declarative HTTP requests on top of libcurl.
//!
//! A [`Request`](http::request::Request) describes what to send: URL, method,
//! headers, body, files, proxy and cookie jar. A
//! [`Transport`](http::transaction::Transport) turns it into libcurl options,
//! runs the transfer and parses the raw header blocks into a
//! [`Response`](http::response::Response).
//!
//! ## Features
//!
//! - **Validated options**: libcurl knobs addressed by name, unknown names rejected
//! - **Canonical headers**: `accept_charset` is sent as `Accept-Charset`
//! - **Header parsing**: status lines and repeated headers kept in order
//! - **Forms**: nested fields flattened to `a[b]`, files sent as multipart
//! - **Redirects**: relative `Location` targets resolved against the previous URL
//! - **Cookie jars**: one temporary jar shared across a redirect chain
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use curlreq::http::request::Request;
//!
//! let mut request = Request::new("https://example.com/search")?;
//! request.set_header("accept", Some("text/html"));
//! let response = request.get(Some("q=rust"))?;
//! println!("Status: {}", response.status_code());
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error type and transport states
//! - [`client`] - Caller-level send path and configuration
//! - [`engine`] - Native transfer engine seam and the libcurl engine
//! - [`http`] - Requests, responses, options, headers, forms and redirects
//! - [`socket`] - Proxy settings

pub mod base;
pub mod client;
pub mod engine;
pub mod http;
pub mod socket;

pub use base::neterror::NetError;
pub use client::{Client, ClientBuilder, ClientConfig};
pub use http::{Method, Request, Response};
