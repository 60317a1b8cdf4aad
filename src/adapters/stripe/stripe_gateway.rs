//! Stripe implementation of the `PaymentGateway` port.
//!
//! - `GET /v1/subscriptions/{id}` for the authoritative subscription read
//! - `POST /v1/customers/{id}/balance_transactions` for credits, with the
//!   request's idempotency key forwarded as the `Idempotency-Key` header
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key).with_currency("cad");
//! let gateway = StripeGateway::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::webhook::SubscriptionObject;
use crate::ports::{
    BalanceCreditRequest, BalanceTransaction, GatewayError, GatewayErrorCode, GatewaySubscription,
    PaymentGateway,
};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// ISO currency of balance credits.
    currency: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com".to_string(),
            currency: "usd".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into().to_lowercase();
        self
    }
}

pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Converts a non-success response into a categorized error.
    async fn error_from_response(response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let code = GatewayErrorCode::from_http_status(status);

        match serde_json::from_str::<StripeErrorEnvelope>(&body) {
            Ok(envelope) => {
                let message = envelope
                    .error
                    .message
                    .unwrap_or_else(|| format!("HTTP {}", status));
                let err = GatewayError::new(code, format!("Stripe API error: {}", message));
                match envelope.error.code {
                    Some(provider_code) => err.with_provider_code(provider_code),
                    None => err,
                }
            }
            Err(_) => GatewayError::new(code, format!("Stripe API error: {}", body)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeBalanceTransaction {
    id: String,
    customer: String,
    amount: i64,
}

fn to_gateway_subscription(object: SubscriptionObject) -> Result<GatewaySubscription, GatewayError> {
    let price_id = object.price_id().map(str::to_string);
    let current_period_end = object.period_end();
    let customer_id = object.customer.ok_or_else(|| {
        GatewayError::provider(format!("Subscription {} has no customer", object.id))
    })?;

    Ok(GatewaySubscription {
        id: object.id,
        customer_id,
        status: object.status,
        price_id,
        current_period_end,
        metadata: object.metadata,
    })
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<GatewaySubscription>, GatewayError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let object: SubscriptionObject = response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        to_gateway_subscription(object).map(Some)
    }

    async fn create_balance_credit(
        &self,
        request: BalanceCreditRequest,
    ) -> Result<BalanceTransaction, GatewayError> {
        if request.amount <= 0 {
            return Err(GatewayError::new(
                GatewayErrorCode::InvalidRequest,
                "Credit amount must be positive",
            ));
        }

        let url = format!(
            "{}/v1/customers/{}/balance_transactions",
            self.config.api_base_url, request.customer_id
        );

        // Stripe records a negative balance transaction as a credit.
        let params = [
            ("amount", (-request.amount).to_string()),
            ("currency", self.config.currency.clone()),
            ("description", request.description.clone()),
        ];

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            tracing::warn!(
                customer_id = %request.customer_id,
                idempotency_key = %request.idempotency_key,
                error = %err,
                "Stripe balance transaction rejected"
            );
            return Err(err);
        }

        let transaction: StripeBalanceTransaction = response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        Ok(BalanceTransaction {
            id: transaction.id,
            customer_id: transaction.customer,
            amount: transaction.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Form, Path};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn config() -> StripeConfig {
        StripeConfig::new(SecretString::new("sk_test_123".to_string()))
    }

    /// Serves `router` on an ephemeral port and returns its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    // ══════════════════════════════════════════════════════════════
    // Configuration Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn config_defaults() {
        let config = config();
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert_eq!(config.currency, "usd");
    }

    #[test]
    fn config_builders_normalize() {
        let config = config()
            .with_base_url("http://localhost:12111/")
            .with_currency("CAD");
        assert_eq!(config.api_base_url, "http://localhost:12111");
        assert_eq!(config.currency, "cad");
    }

    // ══════════════════════════════════════════════════════════════
    // Mapping Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn subscription_object_maps_to_gateway_subscription() {
        let object: SubscriptionObject = serde_json::from_value(json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": "active",
            "items": { "data": [
                { "price": { "id": "price_annual" }, "current_period_end": 1735689600 }
            ] },
            "metadata": { "account_id": "abc" }
        }))
        .unwrap();

        let sub = to_gateway_subscription(object).unwrap();

        assert_eq!(sub.customer_id, "cus_1");
        assert_eq!(sub.price_id.as_deref(), Some("price_annual"));
        assert_eq!(sub.current_period_end, Some(1735689600));
        assert_eq!(sub.metadata.get("account_id").map(String::as_str), Some("abc"));
    }

    #[test]
    fn subscription_without_customer_is_provider_error() {
        let object: SubscriptionObject =
            serde_json::from_value(json!({ "id": "sub_1", "status": "active" })).unwrap();

        let err = to_gateway_subscription(object).unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::ProviderError);
    }

    // ══════════════════════════════════════════════════════════════
    // HTTP Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn get_subscription_parses_response() {
        let router = Router::new().route(
            "/v1/subscriptions/:id",
            get(|Path(id): Path<String>| async move {
                Json(json!({
                    "id": id,
                    "customer": "cus_1",
                    "status": "trialing",
                    "current_period_end": 1735689600,
                    "items": { "data": [ { "price": { "id": "price_monthly" } } ] }
                }))
            }),
        );
        let gateway = StripeGateway::new(config().with_base_url(serve(router).await));

        let sub = gateway.get_subscription("sub_42").await.unwrap().unwrap();

        assert_eq!(sub.id, "sub_42");
        assert_eq!(sub.status, "trialing");
    }

    #[tokio::test]
    async fn get_subscription_not_found_is_none() {
        let router = Router::new().route(
            "/v1/subscriptions/:id",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": { "code": "resource_missing", "message": "No such subscription" } })),
                )
            }),
        );
        let gateway = StripeGateway::new(config().with_base_url(serve(router).await));

        assert!(gateway.get_subscription("sub_missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn balance_credit_sends_negative_amount_and_idempotency_key() {
        let router = Router::new().route(
            "/v1/customers/:id/balance_transactions",
            post(
                |Path(id): Path<String>,
                 headers: HeaderMap,
                 Form(form): Form<HashMap<String, String>>| async move {
                    Json(json!({
                        "id": headers
                            .get("Idempotency-Key")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("missing"),
                        "customer": id,
                        "amount": form.get("amount").and_then(|a| a.parse::<i64>().ok()),
                        "currency": form.get("currency")
                    }))
                },
            ),
        );
        let gateway = StripeGateway::new(config().with_base_url(serve(router).await));

        let tx = gateway
            .create_balance_credit(BalanceCreditRequest {
                customer_id: "cus_1".to_string(),
                amount: 1500,
                description: "Referral reward".to_string(),
                idempotency_key: "referral:abc:referrer".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(tx.id, "referral:abc:referrer");
        assert_eq!(tx.customer_id, "cus_1");
        assert_eq!(tx.amount, -1500);
    }

    #[tokio::test]
    async fn rate_limited_credit_is_a_definite_rejection() {
        let router = Router::new().route(
            "/v1/customers/:id/balance_transactions",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": { "code": "rate_limit", "message": "Too many requests" } })),
                )
            }),
        );
        let gateway = StripeGateway::new(config().with_base_url(serve(router).await));

        let err = gateway
            .create_balance_credit(BalanceCreditRequest {
                customer_id: "cus_1".to_string(),
                amount: 100,
                description: "x".to_string(),
                idempotency_key: "k".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::RateLimitExceeded);
        assert!(!err.outcome_unknown());
        assert_eq!(err.provider_code.as_deref(), Some("rate_limit"));
    }

    #[tokio::test]
    async fn non_positive_credit_is_rejected_locally() {
        let gateway = StripeGateway::new(config().with_base_url("http://127.0.0.1:9"));

        let err = gateway
            .create_balance_credit(BalanceCreditRequest {
                customer_id: "cus_1".to_string(),
                amount: 0,
                description: "x".to_string(),
                idempotency_key: "k".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::InvalidRequest);
    }
}
