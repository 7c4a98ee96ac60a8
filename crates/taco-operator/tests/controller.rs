//! Controller and server wiring against a mock MealMe server

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use taco_fulfillment::{FulfillmentConfig, MealMeClient};
use taco_operator::config::{ControllerConfig, OperatorConfig};
use taco_operator::storage::{OrderStorage, SecretStorage};
use taco_operator::{Controller, InMemoryStorage, OrderReconciler, ResourceClient, Server};
use taco_types::{ObjectKey, ObjectMeta, Phase, Secret, TacoOrder, TacoOrderSpec};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_mealme() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/restaurants/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "restaurants": [{ "id": "r1", "name": "Taqueria Uno", "distance": 2.0 }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "orderId": "o1", "status": "PENDING" })),
        )
        .mount(&server)
        .await;
    server
}

async fn seed_secrets(storage: &InMemoryStorage) {
    storage
        .upsert_secret(Secret::from_string_data(
            ObjectMeta::new("default", "pay1"),
            [
                ("cardNumber", "4111111111111111"),
                ("cardExpiry", "12/30"),
                ("cardCvv", "123"),
            ],
        ))
        .await
        .unwrap();
    storage
        .upsert_secret(Secret::from_string_data(
            ObjectMeta::new("default", "addr1"),
            [
                ("street", "1 Main St"),
                ("city", "Austin"),
                ("state", "TX"),
                ("zip", "78701"),
            ],
        ))
        .await
        .unwrap();
}

fn order(name: &str) -> TacoOrder {
    TacoOrder::new(
        ObjectMeta::new("default", name),
        TacoOrderSpec {
            quantity: 1,
            variety: String::new(),
            payment_secret_name: "pay1".to_string(),
            address_secret_name: "addr1".to_string(),
        },
    )
}

async fn wait_for_phase(storage: &InMemoryStorage, key: &ObjectKey, phase: Phase) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Some(order) = storage.get_order(key).await.unwrap() {
                if order.phase() == phase {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("order {} never reached {}", key, phase));
}

fn fast_controller_config() -> ControllerConfig {
    ControllerConfig {
        resync_interval_secs: 1,
        max_concurrent_reconciles: 2,
        reconcile_timeout_secs: 5,
        base_backoff_ms: 10,
        max_backoff_secs: 1,
    }
}

#[tokio::test]
async fn controller_delivers_existing_and_new_orders() {
    let mealme = mock_mealme().await;
    let storage = Arc::new(InMemoryStorage::new());
    seed_secrets(&storage).await;
    let existing = storage.create_order(order("before-start")).await.unwrap();

    let client = MealMeClient::new(FulfillmentConfig::new(mealme.uri(), "test-token")).unwrap();
    let reconciler = Arc::new(OrderReconciler::new(
        ResourceClient::new(storage.clone()),
        Arc::new(client),
    ));
    let controller = Controller::new(fast_controller_config(), storage.clone(), reconciler);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    wait_for_phase(&storage, &existing.key(), Phase::Delivered).await;

    let created = storage.create_order(order("after-start")).await.unwrap();
    wait_for_phase(&storage, &created.key(), Phase::Delivered).await;

    shutdown_tx.send_replace(true);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn controller_retries_until_secret_appears() {
    let mealme = mock_mealme().await;
    let storage = Arc::new(InMemoryStorage::new());
    let pending = storage.create_order(order("waiting")).await.unwrap();

    let client = MealMeClient::new(FulfillmentConfig::new(mealme.uri(), "test-token")).unwrap();
    let reconciler = Arc::new(OrderReconciler::new(
        ResourceClient::new(storage.clone()),
        Arc::new(client),
    ));
    let controller = Controller::new(fast_controller_config(), storage.clone(), reconciler);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        storage.get_order(&pending.key()).await.unwrap().unwrap().phase(),
        Phase::Unset
    );

    // Secrets are not watched; the backoff requeue picks the order up again.
    seed_secrets(&storage).await;
    wait_for_phase(&storage, &pending.key(), Phase::Delivered).await;

    shutdown_tx.send_replace(true);
    handle.await.unwrap();
}

#[tokio::test]
async fn controller_waits_out_backoff_on_transient_failures() {
    let mealme = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/restaurants/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mealme)
        .await;

    let storage = Arc::new(InMemoryStorage::new());
    seed_secrets(&storage).await;
    let flaky = storage.create_order(order("flaky")).await.unwrap();

    let client = MealMeClient::new(FulfillmentConfig::new(mealme.uri(), "test-token")).unwrap();
    let reconciler = Arc::new(OrderReconciler::new(
        ResourceClient::new(storage.clone()),
        Arc::new(client),
    ));
    // Resyncs fire during the window and must not cut the backoff short.
    let config = ControllerConfig {
        resync_interval_secs: 1,
        max_concurrent_reconciles: 1,
        reconcile_timeout_secs: 5,
        base_backoff_ms: 5000,
        max_backoff_secs: 60,
    };
    let controller = Controller::new(config, storage.clone(), reconciler);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(2500)).await;

    shutdown_tx.send_replace(true);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    let searches = mealme
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/restaurants/search")
        .count();
    assert_eq!(searches, 1, "retried before the 5s backoff elapsed");
    assert_eq!(
        storage.get_order(&flaky.key()).await.unwrap().unwrap().phase(),
        Phase::Created
    );
}

#[tokio::test]
async fn server_applies_manifests_and_shuts_down() {
    let mealme = mock_mealme().await;
    let dir = std::env::temp_dir().join(format!("taco-server-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("order.yaml"),
        r#"
kind: Secret
metadata: { name: pay1 }
stringData: { cardNumber: "4111111111111111", cardExpiry: "12/30", cardCvv: "123" }
---
kind: Secret
metadata: { name: addr1 }
stringData: { street: "1 Main St", city: Austin, state: TX, zip: "78701" }
---
kind: TacoOrder
metadata: { name: lunch }
spec: { quantity: 2, variety: carnitas, paymentSecretName: pay1, addressSecretName: addr1 }
"#,
    )
    .unwrap();

    let mut config = OperatorConfig::default();
    config.controller = fast_controller_config();
    config.storage.manifests = Some(dir.clone());
    config.fulfillment = FulfillmentConfig::new(mealme.uri(), "test-token");

    let storage = Arc::new(InMemoryStorage::new());
    let client = Arc::new(MealMeClient::new(config.fulfillment.clone()).unwrap());
    let server = Server::with_parts(config, storage.clone(), client);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(listener, async move {
        let _ = stop_rx.await;
    }));

    wait_for_phase(&storage, &ObjectKey::new("default", "lunch"), Phase::Delivered).await;

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn server_requires_api_token() {
    let err = Server::new(OperatorConfig::default()).err().unwrap();
    assert!(err.to_string().contains("token"));
}
