//! Query execution through the public runner API.

use std::sync::Arc;
use std::time::Duration;

use presto_runner::driver::{MockConnector, MockResponse};
use presto_runner::query::CANCELLED_MESSAGE;
use presto_runner::{PrestoRunner, QueryResponse, RunnerError};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn runner_with(connector: MockConnector) -> PrestoRunner {
    PrestoRunner::with_connector(
        &json!({
            "host": "presto.example.com",
            "username": "analyst",
            "default_schema": "web",
            "catalog": "hive"
        }),
        Arc::new(connector),
    )
    .unwrap()
}

fn payload(response: &QueryResponse) -> Value {
    serde_json::from_str(response.data.as_deref().expect("expected a payload")).unwrap()
}

#[tokio::test]
async fn test_exactly_one_of_data_or_error() {
    let connector = MockConnector::new()
        .respond(
            "FROM visits",
            MockResponse::rows(&[("n", "bigint")], vec![vec![json!(3)]]),
        )
        .respond("FROM missing", MockResponse::EngineMessage("Table not found".into()))
        .respond("FROM slow", MockResponse::Pending);
    let runner = runner_with(connector);
    let cancel = CancellationToken::new();

    let ok = runner
        .run_query("SELECT count(*) AS n FROM visits", None, &cancel)
        .await
        .unwrap();
    assert!(ok.data.is_some() && ok.error.is_none());

    let failed = runner
        .run_query("SELECT * FROM missing", None, &cancel)
        .await
        .unwrap();
    assert!(failed.data.is_none() && failed.error.is_some());

    let cancelled_token = CancellationToken::new();
    cancelled_token.cancel();
    let cancelled = runner
        .run_query("SELECT * FROM slow", None, &cancelled_token)
        .await
        .unwrap();
    assert!(cancelled.data.is_none() && cancelled.error.is_some());
}

#[tokio::test]
async fn test_payload_shape_and_type_mapping() {
    let connector = MockConnector::new().with_fallback(MockResponse::rows(
        &[
            ("id", "integer"),
            ("score", "double"),
            ("active", "boolean"),
            ("name", "varchar(25)"),
            ("day", "date"),
            ("at", "timestamp"),
        ],
        vec![vec![
            json!(1),
            json!(0.5),
            json!(true),
            json!("a"),
            json!("2024-03-01"),
            json!("2024-03-01 10:00:00.000"),
        ]],
    ));
    let runner = runner_with(connector);

    let response = runner
        .run_query("SELECT * FROM t", Some("alice"), &CancellationToken::new())
        .await
        .unwrap();
    let payload = payload(&response);

    let types: Vec<Value> = payload["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["type"].clone())
        .collect();
    assert_eq!(
        types,
        vec![
            json!("integer"),
            json!("float"),
            json!("boolean"),
            json!("string"),
            json!("date"),
            json!(null),
        ]
    );
    assert_eq!(payload["rows"][0]["at"], json!("2024-03-01 10:00:00.000"));
    assert_eq!(payload["columns"][3]["friendly_name"], json!("name"));
}

#[tokio::test]
async fn test_nested_failure_message_preferred() {
    let connector = MockConnector::new().with_fallback(MockResponse::EngineError(json!({
        "message": "Query failed",
        "errorCode": 1,
        "errorName": "SYNTAX_ERROR",
        "errorType": "USER_ERROR",
        "failureInfo": { "message": "line 1:1: mismatched input 'SELEC'" }
    })));
    let runner = runner_with(connector);

    let response = runner
        .run_query("SELEC 1", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response, QueryResponse::error("line 1:1: mismatched input 'SELEC'"));
}

#[tokio::test]
async fn test_cancel_mid_flight() {
    let connector = MockConnector::new().with_fallback(MockResponse::Pending);
    let stats = connector.stats();
    let runner = runner_with(connector);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(25)).await;
        trigger.cancel();
    });

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        runner.run_query("SELECT * FROM everything", None, &cancel),
    )
    .await
    .expect("cancellation should end the query promptly")
    .unwrap();

    assert_eq!(response.error.as_deref(), Some(CANCELLED_MESSAGE));
    assert_eq!(stats.cancels(), 1);
    assert_eq!(stats.open_cursors(), 0);
    assert_eq!(stats.open_connections(), 0);
}

#[tokio::test]
async fn test_resources_released_on_every_path() {
    let connector = MockConnector::new()
        .respond("fail", MockResponse::EngineMessage("nope".into()))
        .respond("hang", MockResponse::Pending);
    let stats = connector.stats();
    let runner = runner_with(connector);
    let cancelled = CancellationToken::new();
    cancelled.cancel();

    runner
        .run_query("SELECT 1", None, &CancellationToken::new())
        .await
        .unwrap();
    runner
        .run_query("SELECT fail", None, &CancellationToken::new())
        .await
        .unwrap();
    runner.run_query("SELECT hang", None, &cancelled).await.unwrap();

    assert_eq!(stats.connections_opened(), 3);
    assert_eq!(stats.cursors_created(), 3);
    assert_eq!(stats.open_connections(), 0);
    assert_eq!(stats.open_cursors(), 0);
    assert_eq!(stats.cancels(), 1);
}

#[tokio::test]
async fn test_repeated_queries_are_identical() {
    let connector = MockConnector::new().with_fallback(MockResponse::rows(
        &[("a", "bigint"), ("a", "varchar")],
        vec![vec![json!(1), json!("x")], vec![json!(2), json!("y")]],
    ));
    let runner = runner_with(connector);
    let cancel = CancellationToken::new();

    let first = runner.run_query("SELECT 1", None, &cancel).await.unwrap();
    let second = runner.run_query("SELECT 1", None, &cancel).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(payload(&first)["rows"][1], json!({ "a": 2, "a1": "y" }));
}

#[tokio::test]
async fn test_connection_parameters_and_defaults() {
    let connector = MockConnector::new();
    let stats = connector.stats();
    let runner = PrestoRunner::with_connector(
        &json!({ "host": "presto.example.com", "password": "" }),
        Arc::new(connector),
    )
    .unwrap();

    runner
        .run_query("SELECT 1", None, &CancellationToken::new())
        .await
        .unwrap();

    let params = stats.last_params().unwrap();
    assert_eq!(params.port, 8080);
    assert_eq!(params.username, "redash");
    assert_eq!(params.password, None);
    assert_eq!(params.catalog, "hive");
    assert_eq!(params.schema, "default");
}

#[tokio::test]
async fn test_connection_failure_is_not_classified() {
    let runner = runner_with(MockConnector::new().refuse_connections("No route to host"));

    let error = runner
        .run_query("SELECT 1", None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(error.category(), "Connection Error");
    assert!(error.to_string().contains("No route to host"));

    let error = runner
        .get_schema(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, RunnerError::Connection(_)));
}

#[test]
fn test_missing_host_is_configuration_error() {
    for config in [json!({}), json!({ "host": "" }), json!({ "port": 8080 })] {
        let error =
            PrestoRunner::with_connector(&config, Arc::new(MockConnector::new())).unwrap_err();
        assert!(matches!(error, RunnerError::Config { .. }));
        assert_eq!(error.field(), Some("host"));
    }
}

#[test]
fn test_invalid_extras_is_configuration_error() {
    for extras in [json!("not json"), json!(["a"]), json!("[1]")] {
        let error = PrestoRunner::with_connector(
            &json!({ "host": "h", "extras": extras }),
            Arc::new(MockConnector::new()),
        )
        .unwrap_err();
        assert_eq!(error.field(), Some("extras"));
    }
}
