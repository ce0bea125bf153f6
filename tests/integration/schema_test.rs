//! Schema introspection through the public runner API.

use std::sync::Arc;

use presto_runner::driver::{MockConnector, MockResponse};
use presto_runner::{PrestoRunner, RunnerError, SchemaEntry};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

const METADATA: &[(&str, &str)] = &[
    ("table_schem", "varchar"),
    ("table_name", "varchar"),
    ("column_name", "varchar"),
];

fn runner_with(config: serde_json::Value, connector: MockConnector) -> PrestoRunner {
    PrestoRunner::with_connector(&config, Arc::new(connector)).unwrap()
}

#[tokio::test]
async fn test_get_schema_groups_in_first_seen_order() {
    let connector = MockConnector::new().respond(
        "system.jdbc.columns",
        MockResponse::rows(
            METADATA,
            vec![
                vec![json!("s1"), json!("t1"), json!("a")],
                vec![json!("s1"), json!("t1"), json!("b")],
                vec![json!("s2"), json!("t2"), json!("c")],
            ],
        ),
    );
    let runner = runner_with(json!({ "host": "h" }), connector);

    let schema = runner.get_schema(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        serde_json::to_value(&schema).unwrap(),
        json!([
            { "name": "s1.t1", "columns": ["a", "b"] },
            { "name": "s2.t2", "columns": ["c"] }
        ])
    );
}

#[tokio::test]
async fn test_get_schema_uses_catalog_and_filter() {
    let connector = MockConnector::new();
    let stats = connector.stats();
    let runner = runner_with(
        json!({ "host": "h", "catalog": "iceberg", "table_filter": "^web\\..*" }),
        connector,
    );

    let schema = runner.get_schema(&CancellationToken::new()).await.unwrap();
    assert_eq!(schema, Vec::<SchemaEntry>::new());

    let executed = stats.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].contains("FROM system.jdbc.columns"));
    assert!(executed[0].contains("table_cat = 'iceberg'"));
    assert!(executed[0].contains("'^web\\..*')"));
}

#[tokio::test]
async fn test_empty_filter_matches_everything() {
    let connector = MockConnector::new();
    let stats = connector.stats();
    let runner = runner_with(json!({ "host": "h" }), connector);

    runner.get_schema(&CancellationToken::new()).await.unwrap();

    assert!(stats.executed()[0].ends_with("table_name), '')"));
}

#[tokio::test]
async fn test_schema_failure_hides_engine_detail() {
    let connector = MockConnector::new().with_fallback(MockResponse::EngineError(json!({
        "message": "Access Denied: Cannot select from columns",
        "errorName": "PERMISSION_DENIED"
    })));
    let stats = connector.stats();
    let runner = runner_with(json!({ "host": "h" }), connector);

    let error = runner
        .get_schema(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, RunnerError::Schema));
    assert_eq!(error.to_string(), "Failed getting schema.");
    assert_eq!(stats.open_connections(), 0);
}
