use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::value_objects::enums::provider_statuses::ProviderStatus;
use crate::infrastructure::payments::gateway::{GatewayError, PaymentGateway, RequestToPay};

/// Card charges through the aggregator's hosted flow, normalized to the
/// same request-to-pay/check-status shape as mobile money.
pub struct CardClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct CreateChargeBody<'a> {
    amount: i64,
    currency: &'a str,
    customer_phone: &'a str,
    idempotency_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    charge_id: String,
}

#[derive(Debug, Deserialize)]
struct ChargeStatusResponse {
    status: String,
}

impl CardClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    fn normalize(raw: &str) -> ProviderStatus {
        match raw {
            "succeeded" => ProviderStatus::Paid,
            "failed" | "declined" => ProviderStatus::Failed,
            "pending" | "processing" => ProviderStatus::Pending,
            other => {
                warn!(raw_status = %other, "card: unknown provider status");
                ProviderStatus::Pending
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for CardClient {
    fn provider_name(&self) -> &'static str {
        "card"
    }

    async fn request_to_pay(&self, request: RequestToPay) -> Result<String, GatewayError> {
        let body = CreateChargeBody {
            amount: request.amount_minor,
            currency: &request.currency,
            customer_phone: &request.payer_phone,
            idempotency_key: &request.idempotency_key,
        };

        let resp = self
            .http
            .post(format!("{}/charges", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .header("X-Idempotency-Key", &request.idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::Unreachable(err.to_string()))?;

        if resp.status().is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected(body));
        }
        if !resp.status().is_success() {
            return Err(GatewayError::Unreachable(format!(
                "provider returned status {}",
                resp.status()
            )));
        }

        let parsed: ChargeResponse = resp
            .json()
            .await
            .map_err(|err| GatewayError::Internal(err.into()))?;
        Ok(parsed.charge_id)
    }

    async fn check_status(
        &self,
        provider_reference: &str,
    ) -> Result<ProviderStatus, GatewayError> {
        let resp = self
            .http
            .get(format!("{}/charges/{}", self.base_url, provider_reference))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|err| GatewayError::Unreachable(err.to_string()))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Unreachable(format!(
                "provider returned status {}",
                resp.status()
            )));
        }

        let parsed: ChargeStatusResponse = resp
            .json()
            .await
            .map_err(|err| GatewayError::Internal(err.into()))?;
        Ok(Self::normalize(&parsed.status))
    }
}
