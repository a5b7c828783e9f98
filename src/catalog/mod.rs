//! # Catalog Gateway
//!
//! Typed accessors over the product catalog. The persistence layer behind them
//! is an external collaborator; [`InMemoryCatalog`] backs tests and local runs.
//!
//! All calls are synchronous: the orchestration core has no suspension points.

pub mod memory;

pub use memory::InMemoryCatalog;

use crate::error::Result;
use crate::models::{
    JobId, NewProduct, ProcessorId, Product, ProductId, ProductType, Season, SiteId,
};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

pub trait CatalogGateway: Send + Sync {
    /// Products of one type on a site created within `[start, end]`
    fn products(
        &self,
        site_id: SiteId,
        product_type: ProductType,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Product>>;

    fn products_by_ids(&self, product_ids: &[ProductId]) -> Result<Vec<Product>>;

    fn products_by_names(&self, site_id: SiteId, names: &[String]) -> Result<Vec<Product>>;

    /// Full storage path keyed by product name, for the names that exist
    fn product_full_paths(
        &self,
        site_id: SiteId,
        names: &[String],
    ) -> Result<BTreeMap<String, String>>;

    fn site_seasons(&self, site_id: SiteId) -> Result<Vec<Season>>;

    fn site_name(&self, site_id: SiteId) -> Result<String>;

    fn site_short_name(&self, site_id: SiteId) -> Result<String>;

    fn processor_short_name(&self, processor_id: ProcessorId) -> Result<String>;

    /// Source products already linked to a product of `derived_type`
    fn parent_products_in_provenance(
        &self,
        site_id: SiteId,
        source_types: &[ProductType],
        derived_type: ProductType,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Product>>;

    /// Source products with no link to any product of `derived_type`
    fn parent_products_not_in_provenance(
        &self,
        site_id: SiteId,
        source_types: &[ProductType],
        derived_type: ProductType,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Product>>;

    /// Recorded parents of one derived product, restricted to `source_types`
    fn parent_products_in_provenance_by_id(
        &self,
        product_id: ProductId,
        source_types: &[ProductType],
    ) -> Result<Vec<Product>>;

    /// Jobs of a processor on a site that have not reached a terminal state
    fn active_job_ids(&self, processor_id: ProcessorId, site_id: SiteId) -> Result<Vec<JobId>>;

    /// Register a product produced by a job along with its provenance links
    fn insert_product(&self, product: NewProduct) -> Result<ProductId>;
}
