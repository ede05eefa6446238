//! Connection-level settings handed to the transfer engine.
//!
//! - [`proxy`]: HTTP proxy host, port, credentials and timeout

pub mod proxy;
