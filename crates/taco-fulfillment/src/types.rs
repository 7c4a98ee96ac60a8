//! Request and response shapes for the MealMe API

use serde::{Deserialize, Serialize};
use taco_types::PaymentCard;

/// A restaurant returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Distance from the delivery address in miles
    pub distance: f64,
}

/// Everything needed to place one taco order
#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub restaurant_id: String,
    pub item_name: String,
    pub quantity: u32,
    pub delivery_address: String,
    pub payment: PaymentCard,

    /// Sent as the `Idempotency-Key` header when present
    pub idempotency_key: Option<String>,
}

/// An order the provider accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: String,
    pub status: String,
}

pub(crate) const ACCEPTED_STATUSES: [&str; 2] = ["ACCEPTED", "PENDING"];

#[derive(Debug, Serialize)]
pub(crate) struct SearchBody<'a> {
    pub query: &'a str,
    pub address: &'a str,
    pub cuisine: &'a str,
    pub max_distance: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub restaurants: Vec<Restaurant>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderBody<'a> {
    pub restaurant_id: &'a str,
    pub items: Vec<OrderItem<'a>>,
    pub delivery_address: &'a str,
    pub payment: PaymentBody<'a>,
}

#[derive(Serialize)]
pub(crate) struct OrderItem<'a> {
    pub name: &'a str,
    pub quantity: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentBody<'a> {
    pub card_number: &'a str,
    pub card_expiry: &'a str,
    pub card_cvv: &'a str,
}

impl<'a> OrderBody<'a> {
    pub fn from_request(request: &'a PlaceOrderRequest) -> Self {
        Self {
            restaurant_id: &request.restaurant_id,
            items: vec![OrderItem {
                name: &request.item_name,
                quantity: request.quantity,
            }],
            delivery_address: &request.delivery_address,
            payment: PaymentBody {
                card_number: &request.payment.card_number,
                card_expiry: &request.payment.card_expiry,
                card_cvv: &request.payment.card_cvv,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderResponse {
    #[serde(default)]
    pub order_id: String,
    pub status: String,
}

/// First restaurant within `max_distance`, in response order
///
/// Response order is the tie-break: a nearer restaurant later in the list
/// does not win over an earlier one that is in range.
pub(crate) fn first_in_range(restaurants: Vec<Restaurant>, max_distance: f64) -> Option<Restaurant> {
    restaurants.into_iter().find(|r| r.distance <= max_distance)
}
