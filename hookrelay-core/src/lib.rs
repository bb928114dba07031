//! Shared foundations of the hookrelay webhook pipeline.
//!
//! An [`Event`] is the parsed payload of one log record: an opaque body plus
//! the metadata describing where and how to POST it. [`WebhookClient`] turns
//! an event into an HTTP request and hands back the raw response body, and
//! [`needs_retry`] decides whether that body counts as an acknowledgement.
//!
//! The two external collaborators the pipeline consumes are expressed as
//! traits here: [`LogBroker`] for the partitioned, ordered log the events
//! arrive on, and [`RetryStore`] for the key/value+list store the retry
//! tiers live in. Production implementations sit in `hookrelay-service`;
//! tests substitute in-memory doubles.
//!
//! ```no_run
//! use hookrelay_core::{needs_retry, WebhookClient};
//!
//! async fn run() -> hookrelay_core::Result<()> {
//!     let client = WebhookClient::new();
//!     let body = client
//!         .post(r#"{"x":1}"#, "http://target.local/hook", "")
//!         .await?;
//!     if needs_retry(&body) {
//!         // park the event in a retry tier
//!     }
//!     Ok(())
//! }
//! ```

// Test README examples without overriding module docs.
// We want to keep the in-code docs separate as those allow for automatic linking to crate
// documentation.
#[doc = include_str!("../../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;

mod broker;
mod error;
mod event;
mod store;
mod webhook;

pub use broker::{LogBroker, LogRecord, PartitionStream, StartOffset};
pub use error::{Error, Result};
pub use event::{Event, EventMeta};
pub use store::RetryStore;
pub use webhook::{needs_retry, WebhookClient};
pub use rquest;
