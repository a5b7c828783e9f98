//! Catalog and context fixtures shared by the integration tests.

use chrono::{NaiveDate, NaiveDateTime};
use sen2agri_orchestrator::catalog::InMemoryCatalog;
use sen2agri_orchestrator::context::InMemoryExecutionContext;
use sen2agri_orchestrator::models::{
    Job, JobId, ProcessorDescriptor, Product, ProductId, ProductType, Season, Site,
};
use sen2agri_orchestrator::processors::lai::IndexCatalog;
use sen2agri_orchestrator::processors::LaiRetrievalHandler;
use sen2agri_orchestrator::registry::HandlerRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const SITE_ID: i64 = 1;
pub const SITE_SHORT_NAME: &str = "s1";
pub const L3B_PROCESSOR_ID: i64 = 3;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

pub fn at_noon(day: NaiveDate) -> NaiveDateTime {
    day.and_hms_opt(12, 0, 0).expect("valid test time")
}

pub fn l2a_product(id: ProductId, tile: &str, created: NaiveDate, root: &Path) -> Product {
    let name = format!("S2A_MSIL2A_{}_T{tile}", created.format("%Y%m%d"));
    Product {
        id,
        product_type: ProductType::L2a,
        processor_id: 1,
        site_id: SITE_ID,
        full_path: root
            .join(&name)
            .join("MTD_MSIL2A.xml")
            .display()
            .to_string(),
        name,
        created: at_noon(created),
        tiles: vec![tile.to_string()],
    }
}

pub fn season(id: i64, start: NaiveDate, end: NaiveDate) -> Season {
    Season::new(id, SITE_ID, format!("season-{id}"), start, end, true)
}

pub fn l3b_descriptor() -> ProcessorDescriptor {
    ProcessorDescriptor::new(L3B_PROCESSOR_ID, "l3b", "L3B Vegetation Status")
}

/// Temporary workspace with a catalog, an execution context and the LAI
/// handler registered
pub struct LaiFixture {
    pub dir: TempDir,
    pub catalog: Arc<InMemoryCatalog>,
    pub context: Arc<InMemoryExecutionContext>,
    pub registry: Arc<HandlerRegistry>,
}

impl LaiFixture {
    /// Only NDVI and LAI enabled, LAI models configured
    pub fn new() -> Self {
        sen2agri_orchestrator::logging::init_structured_logging();
        let dir = TempDir::new().expect("temp dir");
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.add_site(Site {
            id: SITE_ID,
            name: "Site One".to_string(),
            short_name: SITE_SHORT_NAME.to_string(),
        });
        catalog.add_processor(l3b_descriptor());

        let archive = dir.path().join("archive/{site}/{processor}");
        let context = InMemoryExecutionContext::new(catalog.clone(), dir.path().join("jobs"))
            .with_global_parameters(
                [(
                    "archiver.archive_path".to_string(),
                    archive.display().to_string(),
                )]
                .into(),
            );
        for (key, value) in [
            ("processor.l3b.filter.produce_ndwi", "0"),
            ("processor.l3b.filter.produce_brightness", "0"),
            ("processor.l3b.filter.produce_fapar", "0"),
            ("processor.l3b.filter.produce_fcover", "0"),
            ("processor.l3b.lai.laibandscfgfile", "/cfg/bands.txt"),
            ("processor.l3b.lai.model", "/models/lai.txt"),
            ("processor.l3b.lai.err_model", "/models/lai_err.txt"),
        ] {
            context.set_processor_default(L3B_PROCESSOR_ID, key, value);
        }

        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(LaiRetrievalHandler::new(
            l3b_descriptor(),
            Arc::new(IndexCatalog::default()),
        )));

        Self {
            dir,
            catalog,
            context: Arc::new(context),
            registry: Arc::new(registry),
        }
    }

    pub fn l2a_root(&self) -> PathBuf {
        self.dir.path().join("l2a")
    }

    pub fn add_l2a(&self, id: ProductId, tile: &str, created: NaiveDate) -> Product {
        let product = l2a_product(id, tile, created, &self.l2a_root());
        self.catalog.add_product(product.clone());
        product
    }

    pub fn submit_job(&self, job_id: JobId, parameters: serde_json::Value) -> Job {
        let job = Job::new(job_id, SITE_ID, L3B_PROCESSOR_ID, parameters);
        self.context.register_job(job.clone());
        job
    }

    pub fn job_folder(&self, job_id: JobId) -> PathBuf {
        self.dir.path().join("jobs").join(format!("{job_id}-l3b"))
    }
}
