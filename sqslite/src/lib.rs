//! Blocking client for the SQS query API
//!
//! Every operation builds a parameter set, signs it (Signature Version 2),
//! issues one HTTP round trip and decodes the XML answer into a typed result
//! or an [`SqsError`].
//!
//! ```rust,no_run
//! use sqslite::{Credentials, Region, Sqs};
//!
//! # fn main() -> Result<(), sqslite::SqsError> {
//! let sqs = Sqs::new(
//!     Credentials::new("AKID", "SECRET"),
//!     Region::from_name("us-east-1").unwrap(),
//! )?;
//!
//! let queue = sqs.create_queue("orders", None)?;
//! let id = queue.send_message("hello world")?;
//!
//! if let Some(message) = queue.receive_message()? {
//!     println!("{} {}", message.id, message.body);
//!     queue.delete_message(&message.receipt_handle)?;
//! }
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod queue;
pub mod request;
mod response;
pub mod transport;

pub use attribute::{Attribute, AttributeValue, QueueAttributes};
pub use client::{Context, CreateQueueOptions, Sqs};
pub use config::ClientConfig;
pub use error::{ErrorCause, ErrorKind, ErrorType, SqsError};
pub use message::{Message, ReceiveOptions};
pub use queue::{Grant, Queue};
pub use sqslite_core::{Credentials, Params, Region};
