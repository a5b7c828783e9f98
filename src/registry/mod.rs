//! # Registry Infrastructure
//!
//! Processor-type dispatch table.
//!
//! ## Architecture
//!
//! ```text
//! OrchestratorEvent -> processor id -> HandlerRegistry -> framework wrapper -> ProcessorHandler
//! ```
//!
//! Dispatch is a table lookup; an event for an unregistered processor is a
//! programming error.

pub mod handler_registry;

pub use handler_registry::{HandlerRegistry, RegistryStats};
