//! Configuration for the MealMe client

use serde::{Deserialize, Serialize};

/// Delivery radius policy, in miles
pub const MAX_DELIVERY_DISTANCE_MILES: f64 = 5.0;

const DEFAULT_BASE_URL: &str = "https://api.mealme.ai/v1";

/// Fulfillment API configuration
///
/// The bearer token is part of the value handed to the client constructor;
/// nothing reads it from the environment at request time.
#[derive(Clone, Serialize, Deserialize)]
pub struct FulfillmentConfig {
    /// API base URL, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token
    #[serde(default, skip_serializing)]
    pub api_token: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Restaurants farther than this are not accepted
    #[serde(default = "default_max_distance")]
    pub max_delivery_distance: f64,

    /// Search query used when the order names no variety
    #[serde(default = "default_search_query")]
    pub search_query: String,

    #[serde(default = "default_cuisine")]
    pub cuisine: String,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: String::new(),
            request_timeout_secs: default_request_timeout(),
            max_delivery_distance: default_max_distance(),
            search_query: default_search_query(),
            cuisine: default_cuisine(),
        }
    }
}

impl FulfillmentConfig {
    /// Config pointing at `base_url` with the given token and defaults otherwise
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            ..Default::default()
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl std::fmt::Debug for FulfillmentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FulfillmentConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &if self.api_token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_delivery_distance", &self.max_delivery_distance)
            .field("search_query", &self.search_query)
            .field("cuisine", &self.cuisine)
            .finish()
    }
}

// Default value helpers
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_distance() -> f64 {
    MAX_DELIVERY_DISTANCE_MILES
}

fn default_search_query() -> String {
    "tacos".to_string()
}

fn default_cuisine() -> String {
    "Mexican".to_string()
}
