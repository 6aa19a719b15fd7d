//! Request authentication for sqslite
//!
//! Implements query-string Signature Version 2 (HMAC-SHA256) for signing and
//! verifying requests.

pub mod sigv2;

pub use sigv2::{sign, verify_signature, SignatureError};
