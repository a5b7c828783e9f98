#![allow(clippy::doc_markdown)] // Allow technical terms like Sen2Agri, GeoTIFF in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Sen2Agri Orchestrator Core
//!
//! Processing-job orchestration for the Sen2Agri agricultural satellite-imagery
//! system.
//!
//! ## Overview
//!
//! The orchestrator turns events (a job was submitted, a task finished, a new
//! product landed in the catalog) into task graphs executed by an external
//! executor. Every processor plugs in through a [`ProcessorHandler`]; the first
//! one shipped here is LAI retrieval, producing mono-date vegetation status
//! products (L3B) from atmospherically corrected L2A products.
//!
//! ## Architecture
//!
//! ```text
//! events ──▶ EventDispatcher ──▶ HandlerRegistry ──▶ ProcessorHandler
//!                                                         │
//!                       catalog ◀── ExecutionContext ◀────┤
//!                                                         ▼
//!                                         TaskGraph ──▶ SubmissionBatch
//! ```
//!
//! ## Module Organization
//!
//! - [`season`] - Season resolution for scheduled processing
//! - [`catalog`] - Gateway to products, sites and seasons
//! - [`provenance`] - Which source products were already processed
//! - [`orchestration`] - Task graph model and handler framework
//! - [`registry`] - Handler registration and event routing
//! - [`processors`] - Concrete processor handlers (LAI retrieval)
//! - [`formatter`] - Raster classification for the product formatter
//! - [`engine`] - Local execution of submitted batches
//! - [`state_machine`] - Job lifecycle
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sen2agri_orchestrator::catalog::InMemoryCatalog;
//! use sen2agri_orchestrator::config::ConfigManager;
//! use sen2agri_orchestrator::context::InMemoryExecutionContext;
//! use sen2agri_orchestrator::processors::LaiRetrievalHandler;
//! use sen2agri_orchestrator::registry::HandlerRegistry;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//! let context = InMemoryExecutionContext::from_config(config, Arc::new(InMemoryCatalog::new()));
//!
//! let mut registry = HandlerRegistry::new();
//! if let Some(l3b) = config.processor("l3b") {
//!     let indices = Arc::new(config.indices.clone());
//!     registry.register(Arc::new(LaiRetrievalHandler::new(l3b.descriptor(), indices)));
//! }
//! # let _ = context;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod constants;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod formatter;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod processors;
pub mod provenance;
pub mod registry;
pub mod season;
pub mod state_machine;

pub use catalog::{CatalogGateway, InMemoryCatalog};
pub use config::{ConfigManager, OrchestratorConfig};
pub use context::{ExecutionContext, InMemoryExecutionContext, SchedulingContext};
pub use engine::{LocalExecutionEngine, ProcessStepRunner};
pub use error::{ErrorCategory, OrchestratorError, Result};
pub use events::{JobSubmittedEvent, OrchestratorEvent, ProductAvailableEvent, TaskFinishedEvent};
pub use models::{Job, NewProduct, Product, ProductType, Season};
pub use orchestration::{
    EventDispatcher, ProcessorHandler, ProcessorJobDefinitionParams, SubmissionBatch, TaskGraph,
};
pub use processors::LaiRetrievalHandler;
pub use registry::HandlerRegistry;
pub use season::{resolve_season, SeasonPolicy, SeasonWindow};
