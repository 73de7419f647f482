//! Stripe Checkout Session client.
//!
//! The payment gateway adapter: creates a hosted checkout session for an
//! order and hands back the session URL the client is redirected to. The
//! outcome comes back later through the `/order/verify` endpoint; this
//! client never learns it.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use bistro_core::OrderId;

use crate::config::StripeConfig;
use crate::models::LineItem;

/// Request timeout for session creation. The gateway must never hang a
/// caller indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when talking to the payment gateway.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// An amount could not be expressed in the currency's smallest unit.
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Failed to parse or build request data.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Subset of Stripe's checkout session response we care about.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    url: String,
}

/// Stripe Checkout API client.
#[derive(Clone)]
pub struct CheckoutClient {
    client: reqwest::Client,
    api_base: String,
    currency: String,
}

impl CheckoutClient {
    /// Create a new checkout client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, CheckoutError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_value = HeaderValue::from_str(&auth_value)
            .map_err(|e| CheckoutError::Parse(format!("Invalid API key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert("Authorization", auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            currency: config.currency.clone(),
        })
    }

    /// Create a hosted checkout session for an order.
    ///
    /// `success_url` and `cancel_url` are the redirect targets that embed the
    /// order id, so the later verification call can find the order again.
    /// Returns the session URL to redirect the client to.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, times out, or the API responds
    /// with a non-success status.
    pub async fn create_session(
        &self,
        order_id: OrderId,
        items: &[LineItem],
        delivery_fee: Decimal,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String, CheckoutError> {
        let params = session_params(
            &self.currency,
            order_id,
            items,
            delivery_fee,
            success_url,
            cancel_url,
        )?;

        let url = format!("{}/checkout/sessions", self.api_base);
        let response = self.client.post(&url).form(&params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::Parse(e.to_string()))?;

        Ok(session.url)
    }
}

/// Convert a decimal price to the currency's smallest unit.
fn to_minor_units(amount: Decimal) -> Result<i64, CheckoutError> {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .filter(|cents| *cents >= 0)
        .ok_or(CheckoutError::InvalidAmount(amount))
}

/// Build the form parameters for a checkout session request.
///
/// Each order line becomes a Stripe line item priced in minor units, plus one
/// line for the flat delivery charge.
fn session_params(
    currency: &str,
    order_id: OrderId,
    items: &[LineItem],
    delivery_fee: Decimal,
    success_url: &str,
    cancel_url: &str,
) -> Result<Vec<(String, String)>, CheckoutError> {
    let mut params = vec![
        ("mode".to_owned(), "payment".to_owned()),
        ("client_reference_id".to_owned(), order_id.to_string()),
        ("success_url".to_owned(), success_url.to_owned()),
        ("cancel_url".to_owned(), cancel_url.to_owned()),
    ];

    let delivery_line = LineItem {
        food_id: bistro_core::FoodId::generate(),
        name: "Delivery Charges".to_owned(),
        price: delivery_fee,
        quantity: 1,
    };

    for (i, item) in items.iter().chain(std::iter::once(&delivery_line)).enumerate() {
        params.push((
            format!("line_items[{i}][price_data][currency]"),
            currency.to_owned(),
        ));
        params.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.name.clone(),
        ));
        params.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            to_minor_units(item.price)?.to_string(),
        ));
        params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
    }

    Ok(params)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bistro_core::FoodId;

    use super::*;

    fn item(name: &str, price: &str, quantity: u32) -> LineItem {
        LineItem {
            food_id: FoodId::generate(),
            name: name.to_owned(),
            price: price.parse().unwrap(),
            quantity,
        }
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units("12.50".parse().unwrap()).unwrap(), 1250);
        assert_eq!(to_minor_units("0".parse().unwrap()).unwrap(), 0);
        // Sub-cent values round to the nearest cent
        assert_eq!(to_minor_units("9.999".parse().unwrap()).unwrap(), 1000);
    }

    #[test]
    fn test_to_minor_units_rejects_negative() {
        assert!(to_minor_units("-1".parse::<Decimal>().unwrap()).is_err());
    }

    #[test]
    fn test_session_params_shape() {
        let order_id = OrderId::generate();
        let items = vec![item("Pizza Margherita", "12.50", 2)];
        let params = session_params(
            "usd",
            order_id,
            &items,
            Decimal::from(2),
            "http://front/verify?success=true&orderId=abc",
            "http://front/verify?success=false&orderId=abc",
        )
        .unwrap();

        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("mode"), "payment");
        assert_eq!(get("client_reference_id"), order_id.to_string());
        assert_eq!(get("line_items[0][price_data][unit_amount]"), "1250");
        assert_eq!(get("line_items[0][quantity]"), "2");
        // The delivery charge is appended as the final line item
        assert_eq!(
            get("line_items[1][price_data][product_data][name]"),
            "Delivery Charges"
        );
        assert_eq!(get("line_items[1][price_data][unit_amount]"), "200");
        assert_eq!(get("line_items[1][quantity]"), "1");
    }
}
