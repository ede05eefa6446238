//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): every failure the crate reports
//! - [`LoadState`](loadstate::LoadState): transport lifecycle states

pub mod context;
pub mod loadstate;
pub mod neterror;
