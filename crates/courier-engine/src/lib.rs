//! # courier-engine
//!
//! The application core sitting between the [`courier_store`] tables and the
//! chat transport: content ingestion with subscriber fan-out, ephemeral
//! delivery with timed retraction, batch management, search and read views.
//! The transport itself stays behind the [`Transport`] trait so the engine
//! can be driven by any messaging backend, or by mocks in tests.

mod engine;
mod ephemeral;
mod error;
mod notify;
mod render;
mod transport;

pub use engine::Engine;
pub use error::{EngineError, Result};
pub use transport::{DeliveryError, Transport};
