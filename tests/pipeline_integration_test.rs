//! End-to-end runs over real CSV fixtures: catalog file, a stores
//! directory with one CSV per warehouse, and the full
//! orchestrator/worker/aggregator topology.

use std::sync::Arc;
use tempfile::TempDir;

use stocktally::catalog::{ProductCatalog, SelectionSet};
use stocktally::config::RunConfig;
use stocktally::orchestrator::{Orchestrator, TokioSpawner};
use stocktally::partition::{discover_partitions, CsvPartitionSource};
use stocktally::report::format_text;

struct Fixture {
    _dir: TempDir,
    catalog: ProductCatalog,
    config: RunConfig,
}

fn fixture(catalog_line: &str, stores: &[(&str, &str)]) -> Fixture {
    let dir = TempDir::new().unwrap();
    let catalog_path = dir.path().join("Parts.csv");
    std::fs::write(&catalog_path, format!("{catalog_line}\n")).unwrap();

    let stores_dir = dir.path().join("stores");
    std::fs::create_dir(&stores_dir).unwrap();
    for (name, contents) in stores {
        std::fs::write(stores_dir.join(format!("{name}.csv")), contents).unwrap();
    }

    let catalog = ProductCatalog::load(&catalog_path).unwrap();
    let mut config = RunConfig::new(catalog_path, stores_dir);
    config.collect_timeout_secs = 5;
    Fixture {
        _dir: dir,
        catalog,
        config,
    }
}

async fn run(fixture: &Fixture, selection: &str) -> stocktally::message::ComputationResult {
    let partitions = discover_partitions(&fixture.config.stores_dir).unwrap();
    let selection = SelectionSet::parse(selection, &fixture.catalog).unwrap();
    let orchestrator = Orchestrator::new(
        fixture.config.clone(),
        Arc::new(fixture.catalog.clone()),
        Arc::new(CsvPartitionSource),
        Arc::new(TokioSpawner),
    );
    orchestrator.run(partitions, selection).await.unwrap()
}

#[tokio::test]
async fn test_single_warehouse_single_product() {
    let fixture = fixture(
        "bolt,nut",
        &[("store_1", "bolt,1.0,10,input\nbolt,1.5,4,output\n")],
    );

    let result = run(&fixture, "1").await;
    assert_eq!(result.total_profit, 2.0);
    let bolt = &result.products[&1];
    assert_eq!(bolt.product, "bolt");
    assert_eq!(bolt.leftover_value, 6.0);
    assert_eq!(bolt.leftover_quantity, 6.0);
    assert!(result.is_complete());
}

#[tokio::test]
async fn test_two_warehouses_aggregate_leftovers() {
    let fixture = fixture(
        "bolt,nut",
        &[
            ("store_1", "bolt,1.0,10,input\nbolt,1.5,4,output\n"),
            ("store_2", "bolt,1.0,2,input\n"),
        ],
    );

    let result = run(&fixture, "1").await;
    assert_eq!(result.total_profit, 2.0);
    let bolt = &result.products[&1];
    assert_eq!(bolt.leftover_value, 8.0);
    assert_eq!(bolt.leftover_quantity, 8.0);
    assert_eq!(bolt.contributions_received, 2);
}

#[tokio::test]
async fn test_oversized_output_clips_not_negative() {
    let fixture = fixture(
        "bolt",
        &[("store_1", "bolt,1.0,6,input\nbolt,2.0,20,output\n")],
    );

    let result = run(&fixture, "1").await;
    assert_eq!(result.total_profit, 6.0);
    let bolt = &result.products[&1];
    assert_eq!(bolt.leftover_quantity, 0.0);
    assert_eq!(bolt.leftover_value, 0.0);
}

#[tokio::test]
async fn test_unselected_products_do_not_appear() {
    let fixture = fixture(
        "bolt,nut,washer",
        &[(
            "store_1",
            "bolt,1.0,10,input\nnut,0.5,50,input\nwasher,0.1,500,input\n",
        )],
    );

    let result = run(&fixture, "2").await;
    assert_eq!(result.total_profit, 0.0);
    assert_eq!(result.products.len(), 1);
    let nut = &result.products[&2];
    assert_eq!(nut.leftover_quantity, 50.0);
    assert_eq!(nut.leftover_value, 25.0);
}

#[tokio::test]
async fn test_malformed_rows_do_not_change_totals() {
    let fixture = fixture(
        "bolt",
        &[(
            "store_1",
            "bolt,1.0,10,input\nbolt,oops,4,output\nbolt,1.5,4,output\n",
        )],
    );

    let result = run(&fixture, "1").await;
    assert_eq!(result.total_profit, 2.0);
    assert_eq!(result.products[&1].leftover_quantity, 6.0);
}

#[tokio::test]
async fn test_report_renders_reference_shape() {
    let fixture = fixture(
        "bolt,nut",
        &[("store_1", "bolt,1.0,10,input\nbolt,1.5,4,output\n")],
    );

    let result = run(&fixture, "1").await;
    let text = format_text(&result);
    assert!(text.contains("The whole profit: 2.00"));
    assert!(text.contains("bolt"));
    assert!(text.contains("Total leftover quantity ---> 6"));
    assert!(text.contains("Total leftover price ---> 6.00"));
}
