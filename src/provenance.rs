//! # Provenance Resolution
//!
//! Selects source products that have, or have not yet, been consumed by a
//! derived product type. Handlers use the unprocessed set to avoid reprocessing
//! and the processed set to locate prior outputs.

use crate::catalog::CatalogGateway;
use crate::error::Result;
use crate::models::{Product, ProductId, ProductType, SiteId};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceQuery {
    pub site_id: SiteId,
    pub source_types: Vec<ProductType>,
    pub derived_type: ProductType,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ProvenanceQuery {
    pub fn new(
        site_id: SiteId,
        source_types: impl Into<Vec<ProductType>>,
        derived_type: ProductType,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self {
            site_id,
            source_types: source_types.into(),
            derived_type,
            start,
            end,
        }
    }
}

/// Candidate source products split by derivation status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvenancePartition {
    pub processed: Vec<Product>,
    pub unprocessed: Vec<Product>,
}

impl ProvenancePartition {
    pub fn len(&self) -> usize {
        self.processed.len() + self.unprocessed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source products with no recorded derivation yet
pub fn unprocessed_sources(
    catalog: &dyn CatalogGateway,
    query: &ProvenanceQuery,
) -> Result<Vec<Product>> {
    catalog.parent_products_not_in_provenance(
        query.site_id,
        &query.source_types,
        query.derived_type,
        query.start,
        query.end,
    )
}

/// Source products already linked to a derived product
pub fn processed_sources(
    catalog: &dyn CatalogGateway,
    query: &ProvenanceQuery,
) -> Result<Vec<Product>> {
    catalog.parent_products_in_provenance(
        query.site_id,
        &query.source_types,
        query.derived_type,
        query.start,
        query.end,
    )
}

pub fn partition(
    catalog: &dyn CatalogGateway,
    query: &ProvenanceQuery,
) -> Result<ProvenancePartition> {
    let processed = processed_sources(catalog, query)?;
    let unprocessed = unprocessed_sources(catalog, query)?;
    debug!(
        site_id = query.site_id,
        derived_type = %query.derived_type,
        processed = processed.len(),
        unprocessed = unprocessed.len(),
        "Provenance partition computed"
    );
    Ok(ProvenancePartition {
        processed,
        unprocessed,
    })
}

/// Drop the candidates already present in `processed`, keeping input order
pub fn filter_unprocessed(candidates: Vec<Product>, processed: &[Product]) -> Vec<Product> {
    let done: HashSet<ProductId> = processed.iter().map(|p| p.id).collect();
    candidates
        .into_iter()
        .filter(|p| !done.contains(&p.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 7, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn l2a(id: ProductId) -> Product {
        Product {
            id,
            product_type: ProductType::L2a,
            processor_id: 1,
            site_id: 1,
            name: format!("S2A_MSIL2A_{id}"),
            full_path: format!("/l2a/{id}"),
            created: at(id as u32),
            tiles: vec![],
        }
    }

    #[test]
    fn test_filter_unprocessed_keeps_order() {
        let candidates = vec![l2a(3), l2a(1), l2a(2)];
        let processed = vec![l2a(1)];
        let ids: Vec<_> = filter_unprocessed(candidates, &processed)
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_partition_through_gateway() {
        let catalog = InMemoryCatalog::new();
        for id in 1..=4 {
            catalog.add_product(l2a(id));
        }
        catalog.add_product(Product {
            product_type: ProductType::L3b,
            ..l2a(20)
        });
        catalog.add_provenance(2, 20);

        let query = ProvenanceQuery::new(1, [ProductType::L2a], ProductType::L3b, at(1), at(31));
        let split = partition(&catalog, &query).unwrap();
        assert_eq!(split.len(), 4);
        assert_eq!(split.processed.len(), 1);
        assert_eq!(split.processed[0].id, 2);
    }
}
