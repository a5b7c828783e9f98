//! # Processor Handlers
//!
//! Concrete [`ProcessorHandler`](crate::orchestration::ProcessorHandler)
//! implementations, one module per product type.

pub mod lai;

pub use lai::LaiRetrievalHandler;
