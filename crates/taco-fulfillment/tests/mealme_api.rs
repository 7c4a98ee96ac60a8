//! MealMe client behavior against a mock HTTP server

use serde_json::json;
use taco_fulfillment::{
    FulfillmentApi, FulfillmentConfig, FulfillmentError, MealMeClient, PlaceOrderRequest,
};
use taco_types::PaymentCard;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";
const ADDRESS: &str = "1 Main St, Austin, TX 78701";

fn client_for(server: &MockServer) -> MealMeClient {
    MealMeClient::new(FulfillmentConfig::new(server.uri(), TOKEN)).unwrap()
}

fn order_request() -> PlaceOrderRequest {
    PlaceOrderRequest {
        restaurant_id: "r1".to_string(),
        item_name: "carnitas taco".to_string(),
        quantity: 2,
        delivery_address: ADDRESS.to_string(),
        payment: PaymentCard {
            card_number: "4111111111111111".to_string(),
            card_expiry: "12/30".to_string(),
            card_cvv: "123".to_string(),
        },
        idempotency_key: Some("default/lunch/0000".to_string()),
    }
}

#[tokio::test]
async fn search_sends_expected_request_and_picks_first_in_range() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restaurants/search"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "query": "carnitas tacos",
            "address": ADDRESS,
            "cuisine": "Mexican",
            "max_distance": 5.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "restaurants": [
                { "id": "far", "name": "Far Away", "distance": 8.2 },
                { "id": "r1", "name": "Taqueria Uno", "distance": 3.0 },
                { "id": "r2", "name": "Closer", "distance": 0.4 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let restaurant = client_for(&server)
        .search_restaurant(ADDRESS, "carnitas")
        .await
        .unwrap();

    assert_eq!(restaurant.id, "r1");
    assert_eq!(restaurant.name, "Taqueria Uno");
}

#[tokio::test]
async fn search_without_candidate_in_range_is_permanent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restaurants/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "restaurants": [{ "id": "r1", "name": "Too Far", "distance": 12.0 }]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search_restaurant(ADDRESS, "carnitas")
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::NoRestaurantInRange { .. }));
    assert!(err.to_string().contains("no restaurants found"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn search_requires_exactly_200() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restaurants/search"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "restaurants": [] })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search_restaurant(ADDRESS, "")
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::Status { status: 201, .. }));
}

#[tokio::test]
async fn search_server_error_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restaurants/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search_restaurant(ADDRESS, "")
        .await
        .unwrap_err();

    match &err {
        FulfillmentError::Status { status, body, .. } => {
            assert_eq!(*status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn search_malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restaurants/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search_restaurant(ADDRESS, "")
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::Decode { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn place_order_sends_body_and_idempotency_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("idempotency-key", "default/lunch/0000"))
        .and(body_json(json!({
            "restaurantId": "r1",
            "items": [{ "name": "carnitas taco", "quantity": 2 }],
            "deliveryAddress": ADDRESS,
            "payment": {
                "cardNumber": "4111111111111111",
                "cardExpiry": "12/30",
                "cardCvv": "123"
            }
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "orderId": "o1", "status": "ACCEPTED" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let placed = client_for(&server).place_order(&order_request()).await.unwrap();
    assert_eq!(placed.order_id, "o1");
    assert_eq!(placed.status, "ACCEPTED");
}

#[tokio::test]
async fn place_order_accepts_pending_with_200() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "orderId": "o2", "status": "PENDING" })),
        )
        .mount(&server)
        .await;

    let placed = client_for(&server).place_order(&order_request()).await.unwrap();
    assert_eq!(placed.order_id, "o2");
    assert_eq!(placed.status, "PENDING");
}

#[tokio::test]
async fn place_order_rejected_status_is_permanent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "orderId": "o3", "status": "DECLINED" })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .place_order(&order_request())
        .await
        .unwrap_err();

    match &err {
        FulfillmentError::OrderRejected { order_id, status } => {
            assert_eq!(order_id, "o3");
            assert_eq!(status, "DECLINED");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn place_order_client_error_is_permanent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(402).set_body_string("card declined"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .place_order(&order_request())
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::Status { status: 402, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn place_order_without_key_omits_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header_exists("idempotency-key"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "orderId": "o4", "status": "ACCEPTED" })),
        )
        .mount(&server)
        .await;

    let mut request = order_request();
    request.idempotency_key = None;

    let placed = client_for(&server).place_order(&request).await.unwrap();
    assert_eq!(placed.order_id, "o4");
}

#[tokio::test]
async fn unreachable_server_is_retryable_transport_error() {
    // Nothing listens on port 1.
    let client = MealMeClient::new(FulfillmentConfig::new("http://127.0.0.1:1", TOKEN)).unwrap();
    let err = client.search_restaurant(ADDRESS, "").await.unwrap_err();

    assert!(matches!(err, FulfillmentError::Transport { .. }));
    assert!(err.is_retryable());
}
