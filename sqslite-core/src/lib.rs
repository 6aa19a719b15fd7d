//! Core types for sqslite
//!
//! This crate provides the value types shared by the signer, the client and
//! the test server.

pub mod credentials;
pub mod params;

pub use credentials::{Credentials, Region};
pub use params::Params;

/// Protocol version sent with every request
pub const API_VERSION: &str = "2009-02-01";

/// Wire format of the `Timestamp` parameter (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
