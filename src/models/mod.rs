//! # Data Models
//!
//! Identifiers and read-only records exchanged with the catalog and carried
//! through job processing.

pub mod job;
pub mod product;
pub mod season;

pub use job::Job;
pub use product::{NewProduct, Product, ProductType};
pub use season::Season;

use serde::{Deserialize, Serialize};

pub type JobId = i64;
/// Identifier of a task, unique within its job
pub type TaskId = i64;
pub type SiteId = i64;
pub type ProcessorId = i64;
pub type ProductId = i64;
pub type SeasonId = i64;

/// Registered processor identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessorDescriptor {
    pub id: ProcessorId,
    /// Short name used in configuration keys, e.g. `l3b`
    pub short_name: String,
    pub name: String,
}

impl ProcessorDescriptor {
    pub fn new(id: ProcessorId, short_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            short_name: short_name.into(),
            name: name.into(),
        }
    }

    /// Prefix of this processor's tunables, e.g. `processor.l3b.`
    pub fn config_prefix(&self) -> String {
        format!("{}{}.", crate::constants::keys::PROCESSOR_PREFIX, self.short_name)
    }
}

/// Site reference data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub short_name: String,
}
