//! Test utilities for sqslite
//!
//! Provides an in-process queue service for integration tests:
//! - Start/stop a server on a random port
//! - Verify request signatures against a known key pair
//! - Inspect queue state directly
//! - Answer with canned responses and record what was sent
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sqslite_test::TestServer;
//!
//! let server = TestServer::start().unwrap();
//! println!("Server running at: {}", server.url());
//! ```

pub mod error;
pub mod handlers;
pub mod server;
pub mod storage;

pub use server::{RecordedRequest, StubServer, TestError, TestServer, TEST_ACCESS_KEY, TEST_SECRET_KEY};
pub use storage::SqsStorage;

/// Account id used in queue URLs and ARNs
pub const ACCOUNT_ID: &str = "000000000000";
