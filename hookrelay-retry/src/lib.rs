//! The retry half of the hookrelay pipeline: the tier schedule, the
//! per-event bookkeeping, the delivery engine that promotes failures into
//! tiers, and the driver that replays them when they fall due.
//!
//! A failed delivery walks a fixed seven-tier schedule (4m, 10m, 10m, 1h,
//! 2h, 6h, 15h). Each tier is a FIFO list in the [`RetryStore`] holding log
//! offsets; each parked event keeps a [`RetryRecord`] hash with its attempt
//! counter and next deadline. [`DeliveryEngine::fire`] is the single entry
//! point for both fresh and replayed events; [`RetryDriver`] sweeps the
//! tiers once a minute and re-dispatches whatever is due.
//!
//! ```no_run
//! use std::sync::Arc;
//! use hookrelay_retry::{BrokerDispatch, DeliveryEngine, RetryDriver};
//!
//! async fn run<S, B>(store: S, broker: B, topic: &str)
//! where
//!     S: hookrelay_core::RetryStore + Clone + Send + Sync + 'static,
//!     B: hookrelay_core::LogBroker + 'static,
//! {
//!     let engine = Arc::new(DeliveryEngine::new(store.clone()));
//!     let dispatch = BrokerDispatch::new(broker, engine);
//!     RetryDriver::new(store, dispatch, topic).run().await;
//! }
//! ```
//!
//! [`RetryStore`]: hookrelay_core::RetryStore

mod advance;
mod driver;
mod engine;
mod record;
pub mod schedule;

pub use advance::{advance, AdvanceError};
pub use driver::{BrokerDispatch, RetryDispatch, RetryDriver};
pub use engine::DeliveryEngine;
pub use record::RetryRecord;
