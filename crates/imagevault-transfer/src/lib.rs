//! ImageVault Transfer - the streaming transfer protocol handler
//!
//! Implements the `ImageTransfer` gRPC service: chunked uploads accumulated
//! under a byte-size ceiling, metadata listing, and full-content downloads.
//! Each call is admitted through a bounded semaphore, honors the caller's
//! deadline at every receive step, and responds exactly once.

pub mod deadline;
pub mod service;

pub use service::{TransferLimits, TransferService};
