use anyhow::anyhow;
use audit_verifier::anchor::{reconcile_roots, ArweaveLedger, LedgerContent, PublishedRootLedger};
use audit_verifier::audit::Root;
use audit_verifier::VerifierConfig;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ledger_for(server: &MockServer) -> ArweaveLedger {
    let config = VerifierConfig {
        ledger_url: server.uri(),
        ..VerifierConfig::default()
    };
    ArweaveLedger::new(&config).unwrap()
}

fn graphql_body() -> serde_json::Value {
    json!({
        "data": {
            "transactions": {
                "edges": [
                    {"node": {"id": "tx-one", "tags": [
                        {"name": "tree_name", "value": "my-tree"},
                        {"name": "tree_size", "value": "1"}
                    ]}},
                    {"node": {"id": "tx-two", "tags": [
                        {"name": "tree_size", "value": "2"},
                        {"name": "tree_name", "value": "my-tree"}
                    ]}}
                ]
            }
        }
    })
}

async fn mount_graphql(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("tree_size"))
        .respond_with(ResponseTemplate::new(200).set_body_json(graphql_body()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_list_by_tags() {
    let server = MockServer::start().await;
    mount_graphql(&server).await;

    let entries = ledger_for(&server).list_by_tags("my-tree", &[1, 2]).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].address, "tx-one");
    assert_eq!(entries[0].tree_size(), Some(1));
    assert_eq!(entries[1].tag("tree_name"), Some("my-tree"));
}

#[tokio::test]
async fn test_list_by_tags_without_edges() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .mount(&server)
        .await;

    let entries = ledger_for(&server).list_by_tags("my-tree", &[1]).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_list_by_tags_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(ledger_for(&server).list_by_tags("my-tree", &[1]).await.is_err());
}

#[tokio::test]
async fn test_fetch_by_address() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tx-one/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"size":1,"root_hash":"aa"}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tx-two/"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let ledger = ledger_for(&server);
    assert_eq!(
        ledger.fetch_by_address("tx-one").await.unwrap(),
        LedgerContent::Available(r#"{"size":1,"root_hash":"aa"}"#.to_string())
    );
    assert!(ledger.fetch_by_address("tx-two").await.unwrap().is_pending());
    assert!(ledger.fetch_by_address("tx-missing").await.is_err());
}

#[tokio::test]
async fn test_reconcile_against_gateway() {
    let server = MockServer::start().await;
    mount_graphql(&server).await;
    Mock::given(method("GET"))
        .and(path("/tx-one/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "size": 1,
            "root_hash": "11".repeat(32)
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tx-two/"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let ledger = ledger_for(&server);
    let roots = reconcile_roots(
        &ledger,
        "my-tree",
        &[1, 2],
        |size| async move {
            if size == 2 {
                Ok(Root::new(2, &"22".repeat(32)))
            } else {
                Err(anyhow!("size {} should come from the ledger", size))
            }
        },
        None,
    )
    .await;

    assert_eq!(roots.len(), 2);
    assert_eq!(roots[&1].transaction_id.as_deref(), Some("tx-one"));
    assert_eq!(roots[&1].tree_name.as_deref(), Some("my-tree"));
    assert_eq!(roots[&2].root_hash, "22".repeat(32));
    assert!(!roots[&2].is_anchored());
}
