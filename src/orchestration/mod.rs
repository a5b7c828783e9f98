//! # Orchestration
//!
//! Task/step model, the handler framework boundary and the shared utilities
//! processor handlers build on.
//!
//! ## Components
//!
//! - [`types`]: tasks, steps and submission batches
//! - [`step_decorator`]: the single step creation point
//! - [`task_graph`]: batch builder enforcing parent ordering
//! - [`handler`] / [`framework`]: handler contract and its uniform wrappers
//! - [`support`], [`sidecar`], [`product_output`]: helpers shared by handlers
//! - [`dispatcher`]: channel-driven event loop

pub mod dispatcher;
pub mod framework;
pub mod handler;
pub mod product_output;
pub mod sidecar;
pub mod step_decorator;
pub mod support;
pub mod task_graph;
pub mod types;

pub use dispatcher::{DispatchStats, EventDispatcher};
pub use handler::{ProcessorHandler, ProcessorJobDefinitionParams};
pub use step_decorator::StepDecorator;
pub use task_graph::{validate_batch, TaskGraph};
pub use types::{ExecutionHints, Step, SubmissionBatch, Task};
