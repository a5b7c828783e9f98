//! In-memory catalog used by tests and local execution.

use super::CatalogGateway;
use crate::error::{OrchestratorError, Result};
use crate::models::{
    Job, JobId, NewProduct, ProcessorDescriptor, ProcessorId, Product, ProductId, ProductType,
    Season, Site, SiteId,
};
use crate::state_machine::JobState;
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Default)]
struct CatalogState {
    sites: BTreeMap<SiteId, Site>,
    processors: BTreeMap<ProcessorId, ProcessorDescriptor>,
    seasons: Vec<Season>,
    products: BTreeMap<ProductId, Product>,
    /// (parent, derived) provenance links
    provenance: BTreeSet<(ProductId, ProductId)>,
    jobs: BTreeMap<JobId, Job>,
    next_product_id: ProductId,
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_site(&self, site: Site) {
        self.state.write().sites.insert(site.id, site);
    }

    pub fn add_processor(&self, processor: ProcessorDescriptor) {
        self.state.write().processors.insert(processor.id, processor);
    }

    pub fn add_season(&self, season: Season) {
        self.state.write().seasons.push(season);
    }

    pub fn add_product(&self, product: Product) {
        let mut state = self.state.write();
        state.next_product_id = state.next_product_id.max(product.id);
        state.products.insert(product.id, product);
    }

    pub fn add_provenance(&self, parent_id: ProductId, derived_id: ProductId) {
        self.state.write().provenance.insert((parent_id, derived_id));
    }

    pub fn add_job(&self, job: Job) {
        self.state.write().jobs.insert(job.id, job);
    }

    pub fn job(&self, job_id: JobId) -> Option<Job> {
        self.state.read().jobs.get(&job_id).cloned()
    }

    pub fn update_job(
        &self,
        job_id: JobId,
        state: JobState,
        failure_message: Option<String>,
    ) -> Result<()> {
        let mut guard = self.state.write();
        let job = guard
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| {
                OrchestratorError::catalog("update_job", format!("unknown job {job_id}"))
            })?;
        job.state = state;
        if failure_message.is_some() {
            job.failure_message = failure_message;
        }
        Ok(())
    }

    pub fn product(&self, product_id: ProductId) -> Option<Product> {
        self.state.read().products.get(&product_id).cloned()
    }

    /// Parents recorded for a derived product
    pub fn provenance_of(&self, derived_id: ProductId) -> Vec<ProductId> {
        self.state
            .read()
            .provenance
            .iter()
            .filter(|(_, derived)| *derived == derived_id)
            .map(|(parent, _)| *parent)
            .collect()
    }

    fn source_candidates(
        state: &CatalogState,
        site_id: SiteId,
        source_types: &[ProductType],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<Product> {
        state
            .products
            .values()
            .filter(|p| p.site_id == site_id)
            .filter(|p| source_types.contains(&p.product_type))
            .filter(|p| p.created >= start && p.created <= end)
            .cloned()
            .collect()
    }

    fn has_derivation(
        state: &CatalogState,
        parent_id: ProductId,
        derived_type: ProductType,
    ) -> bool {
        state
            .provenance
            .iter()
            .filter(|(parent, _)| *parent == parent_id)
            .any(|(_, derived)| {
                state
                    .products
                    .get(derived)
                    .is_some_and(|p| p.product_type == derived_type)
            })
    }
}

impl CatalogGateway for InMemoryCatalog {
    fn products(
        &self,
        site_id: SiteId,
        product_type: ProductType,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Product>> {
        let state = self.state.read();
        Ok(Self::source_candidates(&state, site_id, &[product_type], start, end))
    }

    fn products_by_ids(&self, product_ids: &[ProductId]) -> Result<Vec<Product>> {
        let state = self.state.read();
        Ok(product_ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    fn products_by_names(&self, site_id: SiteId, names: &[String]) -> Result<Vec<Product>> {
        let state = self.state.read();
        Ok(names
            .iter()
            .filter_map(|name| {
                state
                    .products
                    .values()
                    .find(|p| p.site_id == site_id && &p.name == name)
                    .cloned()
            })
            .collect())
    }

    fn product_full_paths(
        &self,
        site_id: SiteId,
        names: &[String],
    ) -> Result<BTreeMap<String, String>> {
        Ok(self
            .products_by_names(site_id, names)?
            .into_iter()
            .map(|p| (p.name, p.full_path))
            .collect())
    }

    fn site_seasons(&self, site_id: SiteId) -> Result<Vec<Season>> {
        Ok(self
            .state
            .read()
            .seasons
            .iter()
            .filter(|s| s.site_id == site_id)
            .cloned()
            .collect())
    }

    fn site_name(&self, site_id: SiteId) -> Result<String> {
        self.state
            .read()
            .sites
            .get(&site_id)
            .map(|s| s.name.clone())
            .ok_or_else(|| {
                OrchestratorError::catalog("site_name", format!("unknown site {site_id}"))
            })
    }

    fn site_short_name(&self, site_id: SiteId) -> Result<String> {
        self.state
            .read()
            .sites
            .get(&site_id)
            .map(|s| s.short_name.clone())
            .ok_or_else(|| {
                OrchestratorError::catalog("site_short_name", format!("unknown site {site_id}"))
            })
    }

    fn processor_short_name(&self, processor_id: ProcessorId) -> Result<String> {
        self.state
            .read()
            .processors
            .get(&processor_id)
            .map(|p| p.short_name.clone())
            .ok_or_else(|| {
                OrchestratorError::catalog(
                    "processor_short_name",
                    format!("unknown processor {processor_id}"),
                )
            })
    }

    fn parent_products_in_provenance(
        &self,
        site_id: SiteId,
        source_types: &[ProductType],
        derived_type: ProductType,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Product>> {
        let state = self.state.read();
        Ok(Self::source_candidates(&state, site_id, source_types, start, end)
            .into_iter()
            .filter(|p| Self::has_derivation(&state, p.id, derived_type))
            .collect())
    }

    fn parent_products_not_in_provenance(
        &self,
        site_id: SiteId,
        source_types: &[ProductType],
        derived_type: ProductType,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Product>> {
        let state = self.state.read();
        Ok(Self::source_candidates(&state, site_id, source_types, start, end)
            .into_iter()
            .filter(|p| !Self::has_derivation(&state, p.id, derived_type))
            .collect())
    }

    fn parent_products_in_provenance_by_id(
        &self,
        product_id: ProductId,
        source_types: &[ProductType],
    ) -> Result<Vec<Product>> {
        let state = self.state.read();
        Ok(state
            .provenance
            .iter()
            .filter(|(_, derived)| *derived == product_id)
            .filter_map(|(parent, _)| state.products.get(parent))
            .filter(|p| source_types.contains(&p.product_type))
            .cloned()
            .collect())
    }

    fn active_job_ids(&self, processor_id: ProcessorId, site_id: SiteId) -> Result<Vec<JobId>> {
        Ok(self
            .state
            .read()
            .jobs
            .values()
            .filter(|j| j.processor_id == processor_id && j.site_id == site_id)
            .filter(|j| j.state.is_active())
            .map(|j| j.id)
            .collect())
    }

    fn insert_product(&self, product: NewProduct) -> Result<ProductId> {
        let mut state = self.state.write();
        state.next_product_id += 1;
        let id = state.next_product_id;

        for parent in &product.parent_product_ids {
            state.provenance.insert((*parent, id));
        }
        state.products.insert(
            id,
            Product {
                id,
                product_type: product.product_type,
                processor_id: product.processor_id,
                site_id: product.site_id,
                name: product.name,
                full_path: product.full_path,
                created: product.created,
                tiles: product.tiles,
            },
        );

        debug!(product_id = id, job_id = product.job_id, "Product registered");
        Ok(id)
    }
}
