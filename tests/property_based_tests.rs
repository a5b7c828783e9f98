mod common;

use chrono::{Duration, Months};
use common::strategies::*;
use common::{at_noon, date, l2a_product, season, SITE_ID};
use proptest::prelude::*;
use sen2agri_orchestrator::catalog::InMemoryCatalog;
use sen2agri_orchestrator::config::ConfigurationParameterValueMap;
use sen2agri_orchestrator::events::JobSubmittedEvent;
use sen2agri_orchestrator::models::{NewProduct, Product, ProductType};
use sen2agri_orchestrator::orchestration::sidecar;
use sen2agri_orchestrator::orchestration::StepDecorator;
use sen2agri_orchestrator::processors::lai::{
    select_tiles, IndexCatalog, L3bJobContext, LaiDagBuilder,
};
use sen2agri_orchestrator::provenance::{self, ProvenanceQuery};
use sen2agri_orchestrator::season::{is_in_season, resolve_season, SeasonPolicy};
use serde_json::json;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tempfile::TempDir;

fn flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

fn job_context(switches: (bool, bool, bool, bool), params: serde_json::Value) -> L3bJobContext {
    let (ndwi, brightness, fapar, fcover) = switches;
    let config: ConfigurationParameterValueMap = [
        ("processor.l3b.filter.produce_ndwi", flag(ndwi)),
        ("processor.l3b.filter.produce_brightness", flag(brightness)),
        ("processor.l3b.filter.produce_fapar", flag(fapar)),
        ("processor.l3b.filter.produce_fcover", flag(fcover)),
        ("processor.l3b.lai.laibandscfgfile", "/cfg/bands.txt"),
        ("processor.l3b.lai.model", "/models/lai.txt"),
        ("processor.l3b.lai.err_model", "/models/lai_err.txt"),
    ]
    .into_iter()
    .collect();
    let event = JobSubmittedEvent::new(7, SITE_ID, 3, &params);
    L3bJobContext::from_event(&event, "l3b", "s1", config, &IndexCatalog::default())
        .expect("job context")
}

fn products_for(tiles: &BTreeSet<String>) -> Vec<Product> {
    tiles
        .iter()
        .enumerate()
        .map(|(i, tile)| {
            l2a_product(i as i64 + 1, tile, date(2023, 5, 1), Path::new("/missing/l2a"))
        })
        .collect()
}

fn task_count(ctx: &L3bJobContext, products: &[Product]) -> usize {
    let tiles = select_tiles(ctx, products);
    LaiDagBuilder::new(
        ctx,
        "/jobs/7-l3b",
        StepDecorator::new("l3b", ConfigurationParameterValueMap::new()),
    )
    .build(&tiles, Path::new("/archive/s1/l3b"))
    .map(|dag| dag.batch.tasks.len())
    .unwrap_or(0)
}

proptest! {
    /// Property: a season accepts dates from its start up to one month after its end
    #[test]
    fn season_window_has_one_month_tolerance((start, end) in summer_season_strategy()) {
        let limit = end.checked_add_months(Months::new(1)).unwrap();

        prop_assert_eq!(is_in_season(start, end, start), Some((start, end)));
        prop_assert_eq!(is_in_season(start, end, limit), Some((start, end)));
        prop_assert_eq!(is_in_season(start, end, limit + Duration::days(1)), None);
        prop_assert_eq!(is_in_season(start, end, start - Duration::days(1)), None);
    }

    /// Property: winter seasons start one year earlier than stored
    #[test]
    fn winter_seasons_start_in_previous_year((start, end) in winter_season_strategy()) {
        let normalized = start.checked_sub_months(Months::new(12)).unwrap();

        prop_assert_eq!(is_in_season(start, end, end), Some((normalized, end)));
        prop_assert_eq!(is_in_season(start, end, normalized), Some((normalized, end)));
        prop_assert_eq!(is_in_season(start, end, normalized - Duration::days(1)), None);
    }

    /// Property: an enabled override is returned verbatim under best match
    #[test]
    fn best_match_override_always_wins(
        (start, end) in summer_season_strategy(),
        scheduled in date_strategy(),
    ) {
        let seasons = vec![
            season(1, scheduled - Duration::days(10), scheduled + Duration::days(10)),
            season(2, start, end),
        ];
        let overrides: ConfigurationParameterValueMap =
            [("site_season_id", "2")].into_iter().collect();

        let window =
            resolve_season(SITE_ID, &seasons, scheduled, &overrides, SeasonPolicy::BestMatch)
                .unwrap();
        prop_assert_eq!((window.season_id, window.start, window.end), (2, start, end));

        let window =
            resolve_season(SITE_ID, &seasons, scheduled, &overrides, SeasonPolicy::StartEndDates)
                .unwrap();
        let expected = if is_in_season(start, end, scheduled).is_some() { 2 } else { 1 };
        prop_assert_eq!(window.season_id, expected);
    }

    /// Property: processed and unprocessed sources partition the candidates
    #[test]
    fn provenance_partition_is_exact(mask in processed_mask_strategy()) {
        let catalog = InMemoryCatalog::new();
        let root = Path::new("/l2a");
        let mut expected_processed = HashSet::new();

        for (i, processed) in mask.iter().enumerate() {
            let id = i as i64 + 1;
            let created = date(2023, 1, 1) + Duration::days(i as i64);
            catalog.add_product(l2a_product(id, "31TCJ", created, root));
            if *processed {
                expected_processed.insert(id);
            }
        }
        if !expected_processed.is_empty() {
            catalog.add_product(Product {
                id: 1000,
                product_type: ProductType::L3b,
                processor_id: 3,
                site_id: SITE_ID,
                name: "S2AGRI_L3B_PRD".to_string(),
                full_path: "/l3b/S2AGRI_L3B_PRD".to_string(),
                created: at_noon(date(2023, 6, 1)),
                tiles: vec![],
            });
            for id in &expected_processed {
                catalog.add_provenance(*id, 1000);
            }
        }

        let query = ProvenanceQuery::new(
            SITE_ID,
            [ProductType::L2a],
            ProductType::L3b,
            at_noon(date(2022, 12, 31)),
            at_noon(date(2023, 12, 31)),
        );
        let partition = provenance::partition(&catalog, &query).unwrap();

        let processed: HashSet<i64> = partition.processed.iter().map(|p| p.id).collect();
        let unprocessed: HashSet<i64> = partition.unprocessed.iter().map(|p| p.id).collect();
        prop_assert!(processed.is_disjoint(&unprocessed));
        prop_assert_eq!(partition.len(), mask.len());
        prop_assert_eq!(processed, expected_processed);
    }

    /// Property: every tile adds the same fixed chain; the formatter is shared
    #[test]
    fn dag_size_is_linear_in_tiles(
        tiles in tile_set_strategy(6),
        switches in index_switches_strategy(),
    ) {
        let (ndwi, brightness, fapar, fcover) = switches;
        let ctx = job_context(switches, json!({}));

        let spectral = 1 + usize::from(ndwi) + usize::from(brightness);
        let biophysical = 1 + usize::from(fapar) + usize::from(fcover);
        let training = usize::from(fapar || fcover);
        // angles + mask flags + one task per index
        let per_tile = 1 + 1 + spectral + biophysical + training;

        prop_assert_eq!(task_count(&ctx, &products_for(&tiles)), tiles.len() * per_tile + 1);
    }

    /// Property: enabling more indices never shrinks the graph
    #[test]
    fn dag_size_is_monotonic_in_indices(
        tiles in tile_set_strategy(4),
        switches in index_switches_strategy(),
    ) {
        let products = products_for(&tiles);
        let fewer = task_count(&job_context(switches, json!({})), &products);
        let (_, brightness, fapar, fcover) = switches;
        let more =
            task_count(&job_context((true, brightness, fapar, fcover), json!({})), &products);
        prop_assert!(more >= fewer);
        let all = task_count(&job_context((true, true, true, true), json!({})), &products);
        prop_assert!(all >= more);
    }

    /// Property: an allow-list keeps exactly the graph of the allowed tiles
    #[test]
    fn tile_filter_matches_allowed_subset(tiles in tile_set_strategy(6), keep in 1usize..=6) {
        let allowed: Vec<String> = tiles.iter().take(keep).cloned().collect();
        let all_products = products_for(&tiles);
        let allowed_products: Vec<Product> = all_products
            .iter()
            .filter(|p| allowed.contains(&p.tiles[0]))
            .cloned()
            .collect();

        let filtered_ctx =
            job_context((false, false, false, false), json!({ "tiles_filter": allowed }));
        let plain_ctx = job_context((false, false, false, false), json!({}));

        prop_assert_eq!(
            task_count(&filtered_ctx, &all_products),
            task_count(&plain_ctx, &allowed_products)
        );
    }

    /// Property: parent ids survive the sidecar, minus non-positive ones
    #[test]
    fn parent_ids_sidecar_keeps_positive_ids(ids in parent_ids_strategy()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("source_product_ids.txt");

        sidecar::write_parent_product_ids(&path, &ids).unwrap();
        let expected: Vec<i64> = ids.iter().copied().filter(|id| *id > 0).collect();
        prop_assert_eq!(sidecar::read_parent_product_ids(&path), expected);
    }
}

#[test]
fn registered_product_moves_sources_to_processed() {
    let catalog = InMemoryCatalog::new();
    let root = Path::new("/l2a");
    catalog.add_product(l2a_product(1, "31TCJ", date(2023, 4, 1), root));
    catalog.add_product(l2a_product(2, "31TCJ", date(2023, 4, 6), root));

    let query = ProvenanceQuery::new(
        SITE_ID,
        [ProductType::L2a],
        ProductType::L3b,
        at_noon(date(2023, 4, 1)) - Duration::hours(12),
        at_noon(date(2023, 4, 30)),
    );
    assert_eq!(provenance::unprocessed_sources(&catalog, &query).unwrap().len(), 2);

    use sen2agri_orchestrator::catalog::CatalogGateway;
    catalog
        .insert_product(NewProduct {
            product_type: ProductType::L3b,
            processor_id: 3,
            site_id: SITE_ID,
            job_id: 1,
            full_path: "/l3b/out".to_string(),
            name: "out".to_string(),
            created: at_noon(date(2023, 4, 7)),
            quicklook: String::new(),
            footprint: String::new(),
            tiles: vec!["31TCJ".to_string()],
            parent_product_ids: vec![1],
        })
        .unwrap();

    let unprocessed = provenance::unprocessed_sources(&catalog, &query).unwrap();
    assert_eq!(unprocessed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
}
