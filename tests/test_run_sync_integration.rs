//! `run_sync` end to end against a mock server standing in for both APIs.

use std::io::Write;
use std::time::Duration;

use serde_json::json;
use tempfile::NamedTempFile;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use inventory_sync::collector::Action;
use inventory_sync::error_handling::{FailureType, OutcomeKind};
use inventory_sync::{run_sync, Command, Config};

fn write_mappings() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create mappings file");
    writeln!(file, "[defaults]\ndomain_names = [\"example.com\"]").unwrap();
    file
}

fn create_test_config(server: &MockServer, mappings: &NamedTempFile, dry_run: bool) -> Config {
    Config {
        mappings: mappings.path().to_path_buf(),
        netbox_addr: server.uri(),
        netbox_token: "nbtok".into(),
        ipfabric_addr: server.uri(),
        ipfabric_token: "ipftok".into(),
        timeout_seconds: 5,
        max_concurrency: 4,
        dry_run,
        ..Default::default()
    }
}

/// IP Fabric knows `ipf_sites`; Netbox only has NYC 1.
async fn mount_sites(server: &MockServer, ipf_sites: &[&str]) {
    let rows: Vec<_> = ipf_sites.iter().map(|name| json!({"siteName": name})).collect();
    Mock::given(method("POST"))
        .and(path("/api/v1/tables/inventory/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": rows,
            "_meta": {"count": ipf_sites.len()},
        })))
        .mount(server)
        .await;

    let netbox_sites = json!({
        "count": 1,
        "results": [{"id": 1, "name": "NYC 1", "slug": "nyc-1"}],
    });
    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(netbox_sites.clone()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .and(query_param("limit", "100"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(netbox_sites))
        .mount(server)
        .await;
}

async fn mount_site_inventories(server: &MockServer) {
    mount_sites(server, &["NYC 1", "ATL 1"]).await;
}

#[tokio::test]
async fn test_sites_creates_only_the_missing_site() {
    let server = MockServer::start().await;
    mount_site_inventories(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/sites/"))
        .and(body_json(json!({"name": "ATL 1", "slug": "atl-1"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": 2, "name": "ATL 1", "slug": "atl-1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mappings = write_mappings();
    let report = run_sync(create_test_config(&server, &mappings, false), Command::Sites)
        .await
        .expect("sites run should succeed");

    assert_eq!(report.steps.len(), 1);
    let step = &report.steps[0];
    assert_eq!((step.missing, step.changed, step.extra), (1, 0, 0));
    assert_eq!(step.outcomes.len(), 1);
    assert_eq!(step.outcomes[0].action, Action::Create);
    assert!(step.outcomes[0].is_success());
    assert!(!report.has_failures());
    assert_eq!(report.stats().get(OutcomeKind::Created), 1);
}

#[tokio::test]
async fn test_sites_dry_run_sends_no_corrections() {
    let server = MockServer::start().await;
    mount_site_inventories(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/sites/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mappings = write_mappings();
    let report = run_sync(create_test_config(&server, &mappings, true), Command::Sites)
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.steps[0].missing, 1);
    assert!(report.steps[0].outcomes.is_empty());
}

#[tokio::test]
async fn test_rejected_create_is_a_failure_not_an_abort() {
    let server = MockServer::start().await;
    mount_site_inventories(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/sites/"))
        .respond_with(ResponseTemplate::new(400).set_body_string("{\"slug\": [\"invalid\"]}"))
        .mount(&server)
        .await;

    let mappings = write_mappings();
    let report = run_sync(create_test_config(&server, &mappings, false), Command::Sites)
        .await
        .unwrap();

    assert!(report.has_failures());
    assert_eq!(report.stats().get(OutcomeKind::Failed), 1);
}

#[tokio::test]
async fn test_timed_out_create_does_not_cancel_siblings() {
    let server = MockServer::start().await;
    mount_sites(&server, &["NYC 1", "ATL 1", "SFO 1"]).await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/sites/"))
        .and(body_partial_json(json!({"slug": "atl-1"})))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": 2, "name": "ATL 1", "slug": "atl-1"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/sites/"))
        .and(body_partial_json(json!({"slug": "sfo-1"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": 3, "name": "SFO 1", "slug": "sfo-1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mappings = write_mappings();
    let mut config = create_test_config(&server, &mappings, false);
    config.timeout_seconds = 1;
    let report = run_sync(config, Command::Sites).await.unwrap();

    let step = &report.steps[0];
    assert_eq!(step.missing, 2);
    assert_eq!(step.outcomes.len(), 2);
    let stats = report.stats();
    assert_eq!(stats.get(OutcomeKind::Created), 1);
    assert_eq!(stats.get(OutcomeKind::Failed), 1);
    assert_eq!(stats.get_failure_count(FailureType::Timeout), 1);
}

#[tokio::test]
async fn test_scoped_command_without_scope_fails() {
    let server = MockServer::start().await;
    let mappings = write_mappings();
    let err = run_sync(create_test_config(&server, &mappings, false), Command::Interfaces)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Missing parameters"), "{err:#}");
}

#[tokio::test]
async fn test_incomplete_config_is_rejected() {
    let err = run_sync(Config::default(), Command::Sites).await.unwrap_err();
    assert!(format!("{err:#}").contains("Missing required setting"), "{err:#}");
}

#[tokio::test]
async fn test_unreadable_mappings_file_is_reported() {
    let server = MockServer::start().await;
    let mappings = write_mappings();
    let mut config = create_test_config(&server, &mappings, true);
    config.mappings = mappings.path().with_extension("missing");
    let err = run_sync(config, Command::Sites).await.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load mappings file"), "{err:#}");
}
