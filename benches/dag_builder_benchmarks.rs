use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sen2agri_orchestrator::config::ConfigurationParameterValueMap;
use sen2agri_orchestrator::events::JobSubmittedEvent;
use sen2agri_orchestrator::models::{Product, ProductType, Season};
use sen2agri_orchestrator::orchestration::StepDecorator;
use sen2agri_orchestrator::processors::lai::{
    select_tiles, IndexCatalog, L3bJobContext, LaiDagBuilder,
};
use sen2agri_orchestrator::season::{resolve_season, SeasonPolicy};
use std::path::Path;

fn job_context() -> anyhow::Result<L3bJobContext> {
    let config: ConfigurationParameterValueMap = [
        ("processor.l3b.lai.laibandscfgfile", "/cfg/bands.txt"),
        ("processor.l3b.filter.produce_in_domain_flags", "1"),
    ]
    .into_iter()
    .collect();
    let event = JobSubmittedEvent::new(1, 1, 3, &serde_json::json!({}));
    Ok(L3bJobContext::from_event(&event, "l3b", "s1", config, &IndexCatalog::default())?)
}

fn products(count: usize) -> anyhow::Result<Vec<Product>> {
    let created = NaiveDate::from_ymd_opt(2023, 4, 1)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid benchmark date"))?;
    Ok((0..count)
        .map(|i| Product {
            id: i as i64 + 1,
            product_type: ProductType::L2a,
            processor_id: 1,
            site_id: 1,
            name: format!("S2A_MSIL2A_20230401_T{i:05}"),
            full_path: format!("/bench/l2a/{i}/MTD_MSIL2A.xml"),
            created,
            tiles: vec![format!("{i:05}")],
        })
        .collect())
}

fn benchmark_lai_dag_build(c: &mut Criterion) {
    let ctx = job_context().expect("benchmark job context");
    let mut group = c.benchmark_group("lai_dag_build");

    for tiles in [1usize, 8, 32, 128] {
        let products = products(tiles).expect("benchmark products");
        group.bench_with_input(BenchmarkId::from_parameter(tiles), &products, |b, products| {
            b.iter(|| {
                let tiles = select_tiles(&ctx, products);
                LaiDagBuilder::new(
                    &ctx,
                    "/bench/jobs/1-l3b",
                    StepDecorator::new("l3b", ConfigurationParameterValueMap::new()),
                )
                .build(black_box(&tiles), Path::new("/bench/archive"))
            })
        });
    }
    group.finish();
}

fn benchmark_season_resolution(c: &mut Criterion) {
    let seasons: Vec<Season> = (2000..2030)
        .filter_map(|year| {
            let start = NaiveDate::from_ymd_opt(year, 10, 1)?;
            let end = NaiveDate::from_ymd_opt(year, 6, 30)?;
            Some(Season::new(year as i64, 1, format!("winter-{year}"), start, end, true))
        })
        .collect();
    let date = NaiveDate::from_ymd_opt(2029, 3, 15).expect("benchmark date");
    let overrides = ConfigurationParameterValueMap::new();

    c.bench_function("season_resolution_best_match", |b| {
        b.iter(|| resolve_season(1, black_box(&seasons), date, &overrides, SeasonPolicy::BestMatch))
    });
}

criterion_group!(benches, benchmark_lai_dag_build, benchmark_season_resolution);
criterion_main!(benches);
