//! HTTP client for the MealMe API

use crate::config::FulfillmentConfig;
use crate::error::{FulfillmentError, FulfillmentResult, Operation};
use crate::types::{
    first_in_range, OrderBody, OrderResponse, PlaceOrderRequest, PlacedOrder, Restaurant,
    SearchBody, SearchResponse, ACCEPTED_STATUSES,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

const SEARCH_PATH: &str = "/restaurants/search";
const ORDERS_PATH: &str = "/orders";
const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Remote operations the reconciler needs from a fulfillment provider
#[async_trait]
pub trait FulfillmentApi: Send + Sync {
    /// Find a restaurant that delivers to `address`
    ///
    /// Returns the first result within the configured delivery radius.
    async fn search_restaurant(&self, address: &str, variety: &str)
        -> FulfillmentResult<Restaurant>;

    /// Place an order and require the provider to accept it
    async fn place_order(&self, request: &PlaceOrderRequest) -> FulfillmentResult<PlacedOrder>;
}

/// MealMe HTTP client
pub struct MealMeClient {
    client: Client,
    config: FulfillmentConfig,
}

impl MealMeClient {
    /// Create a new client from explicit configuration
    pub fn new(config: FulfillmentConfig) -> FulfillmentResult<Self> {
        if config.api_token.trim().is_empty() {
            return Err(FulfillmentError::Config(
                "MealMe API token is not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FulfillmentError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FulfillmentConfig {
        &self.config
    }

    fn search_query(&self, variety: &str) -> String {
        let variety = variety.trim();
        if variety.is_empty() {
            self.config.search_query.clone()
        } else {
            format!("{} {}", variety, self.config.search_query)
        }
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: Operation,
        path: &str,
        body: &B,
        accepted: &[StatusCode],
        idempotency_key: Option<&str>,
    ) -> FulfillmentResult<T> {
        let mut request = self
            .client
            .post(self.config.endpoint(path))
            .bearer_auth(&self.config.api_token)
            .json(body);

        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FulfillmentError::transport(operation, e))?;

        let status = response.status();
        if !accepted.contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(FulfillmentError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FulfillmentError::transport(operation, e))?;

        serde_json::from_slice(&bytes).map_err(|source| FulfillmentError::Decode { operation, source })
    }
}

#[async_trait]
impl FulfillmentApi for MealMeClient {
    async fn search_restaurant(
        &self,
        address: &str,
        variety: &str,
    ) -> FulfillmentResult<Restaurant> {
        let query = self.search_query(variety);
        let body = SearchBody {
            query: &query,
            address,
            cuisine: &self.config.cuisine,
            max_distance: self.config.max_delivery_distance,
        };

        let response: SearchResponse = self
            .post(
                Operation::SearchRestaurants,
                SEARCH_PATH,
                &body,
                &[StatusCode::OK],
                None,
            )
            .await?;

        tracing::debug!(
            candidates = response.restaurants.len(),
            query = %query,
            "MealMe search returned"
        );

        first_in_range(response.restaurants, self.config.max_delivery_distance).ok_or(
            FulfillmentError::NoRestaurantInRange {
                max_distance: self.config.max_delivery_distance,
            },
        )
    }

    async fn place_order(&self, request: &PlaceOrderRequest) -> FulfillmentResult<PlacedOrder> {
        let body = OrderBody::from_request(request);

        let response: OrderResponse = self
            .post(
                Operation::PlaceOrder,
                ORDERS_PATH,
                &body,
                &[StatusCode::OK, StatusCode::CREATED],
                request.idempotency_key.as_deref(),
            )
            .await?;

        if !ACCEPTED_STATUSES.contains(&response.status.as_str()) {
            return Err(FulfillmentError::OrderRejected {
                order_id: response.order_id,
                status: response.status,
            });
        }

        tracing::debug!(
            restaurant_id = %request.restaurant_id,
            order_id = %response.order_id,
            status = %response.status,
            "MealMe order accepted"
        );

        Ok(PlacedOrder {
            order_id: response.order_id,
            status: response.status,
        })
    }
}
