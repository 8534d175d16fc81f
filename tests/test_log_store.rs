use std::path::{Path, PathBuf};

use log_region_mcp::bootstrap::{seed_if_empty, BootstrapLoader, SeedOutcome};
use log_region_mcp::config::StoreConfig;
use log_region_mcp::model::LogEntry;
use log_region_mcp::service::QueryService;
use log_region_mcp::store::LogStore;
use tempfile::tempdir;

fn test_config(db_path: PathBuf, demo: &Path) -> StoreConfig {
    StoreConfig {
        db_path,
        demo_logs_path: demo.to_path_buf(),
        regions: vec!["NA".into(), "EU".into(), "AP".into()],
        busy_timeout_ms: 5000,
    }
}

fn write_demo(dir: &Path, file: &str, records: &[(i64, &str)]) {
    let body: Vec<serde_json::Value> = records
        .iter()
        .map(|(t, l)| serde_json::json!({ "raw": { "time": t, "log": l } }))
        .collect();
    std::fs::write(dir.join(file), serde_json::to_vec(&body).unwrap()).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_startup_seeds_demo_corpus_once() {
    let dir = tempdir().unwrap();
    let demo = tempdir().unwrap();
    write_demo(demo.path(), "sample_logs_na.json", &[(1000, "boot ok"), (2000, "request served")]);
    write_demo(demo.path(), "sample_logs_eu.json", &[(1500, "eu boot")]);
    write_demo(demo.path(), "sample_logs_ap.json", &[(1700, "ap boot"), (1800, "ap warn")]);

    let cfg = test_config(dir.path().join("test.sqlite"), demo.path());
    let store = LogStore::open(&cfg).unwrap();
    let outcome = seed_if_empty(&store, &BootstrapLoader::from_config(&cfg)).await.unwrap();
    match outcome {
        SeedOutcome::Seeded(report) => assert_eq!(report.loaded_rows(), 5),
        other => panic!("unexpected outcome: {:?}", other),
    }

    // A second process start over the same file must not load again.
    let reopened = LogStore::open(&cfg).unwrap();
    let again = seed_if_empty(&reopened, &BootstrapLoader::from_config(&cfg)).await.unwrap();
    assert_eq!(again, SeedOutcome::AlreadyPopulated { rows: 5 });
    assert_eq!(reopened.count().await.unwrap(), 5);

    let stats = reopened.stats().await.unwrap();
    assert_eq!(stats.values().sum::<u64>(), 5);
    assert_eq!(stats.get("AP"), Some(&2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_and_writes() {
    let dir = tempdir().unwrap();
    let demo = tempdir().unwrap();
    let cfg = test_config(dir.path().join("test.sqlite"), demo.path());
    let store = LogStore::open(&cfg).unwrap();
    let service = QueryService::new(store.clone());

    let mut handles = vec![];
    for i in 0..20i64 {
        let store_ref = store.clone();
        handles.push(tokio::spawn(async move {
            store_ref
                .insert(LogEntry { region: "EU".into(), time: i, message: format!("m{}", i) })
                .await
                .unwrap();
        }));
        let svc = service.clone();
        handles.push(tokio::spawn(async move {
            svc.get_logs("EU", "0", "100").await.unwrap();
            svc.get_stats().await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(store.count().await.unwrap(), 20);
    let resp = service.get_logs("EU", "0", "19").await.unwrap();
    assert_eq!(resp.count, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_every_stored_entry_found_at_its_own_time() {
    let dir = tempdir().unwrap();
    let demo = tempdir().unwrap();
    let cfg = test_config(dir.path().join("test.sqlite"), demo.path());
    let store = LogStore::open(&cfg).unwrap();

    let entries = vec![
        LogEntry { region: "NA".into(), time: -5, message: "before epoch".into() },
        LogEntry { region: "EU".into(), time: 0, message: "".into() },
        LogEntry { region: "AP".into(), time: 1_704_067_200_000, message: "new year".into() },
        LogEntry { region: "ap".into(), time: 1_704_067_200_000, message: "lowercase".into() },
    ];
    for e in &entries {
        store.insert(e.clone()).await.unwrap();
    }
    for e in &entries {
        let hits = store.query(&e.region, e.time, e.time).await.unwrap();
        assert_eq!(hits, vec![e.clone()]);
    }
}
