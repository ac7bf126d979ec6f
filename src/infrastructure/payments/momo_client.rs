use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::domain::value_objects::enums::provider_statuses::ProviderStatus;
use crate::infrastructure::payments::gateway::{GatewayError, PaymentGateway, RequestToPay};

/// Minimal mobile-money collections client built on reqwest.
pub struct MobileMoneyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct RequestToPayBody<'a> {
    amount: i64,
    currency: &'a str,
    payer_phone: &'a str,
    external_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RequestToPayResponse {
    reference: String,
}

#[derive(Debug, Deserialize)]
struct CollectionStatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorEnvelope {
    message: Option<String>,
    code: Option<String>,
}

impl MobileMoneyClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    async fn rejection_reason(resp: reqwest::Response) -> String {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ProviderErrorEnvelope>(&body) {
            Ok(envelope) => {
                let message = envelope.message.unwrap_or_else(|| body.clone());
                error!(
                    status = %status,
                    provider_error_code = ?envelope.code,
                    provider_error_message = %message,
                    "momo: request rejected by provider"
                );
                message
            }
            Err(_) => {
                error!(status = %status, response_body = %body, "momo: request rejected by provider");
                format!("provider returned status {status}")
            }
        }
    }

    fn normalize(raw: &str) -> ProviderStatus {
        match raw {
            "SUCCESSFUL" | "PAID" => ProviderStatus::Paid,
            "FAILED" | "REJECTED" | "EXPIRED" => ProviderStatus::Failed,
            "PENDING" | "ACCEPTED" | "CREATED" => ProviderStatus::Pending,
            other => {
                // Unknown vocabulary stays pending; the retry budget bounds it.
                warn!(raw_status = %other, "momo: unknown provider status");
                ProviderStatus::Pending
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for MobileMoneyClient {
    fn provider_name(&self) -> &'static str {
        "momo"
    }

    async fn request_to_pay(&self, request: RequestToPay) -> Result<String, GatewayError> {
        let body = RequestToPayBody {
            amount: request.amount_minor,
            currency: &request.currency,
            payer_phone: &request.payer_phone,
            external_id: &request.idempotency_key,
        };

        let resp = self
            .http
            .post(format!("{}/collections/request-to-pay", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .header("X-Idempotency-Key", &request.idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::Unreachable(err.to_string()))?;

        if resp.status().is_client_error() {
            return Err(GatewayError::Rejected(Self::rejection_reason(resp).await));
        }
        if !resp.status().is_success() {
            return Err(GatewayError::Unreachable(format!(
                "provider returned status {}",
                resp.status()
            )));
        }

        let parsed: RequestToPayResponse = resp
            .json()
            .await
            .map_err(|err| GatewayError::Internal(err.into()))?;
        Ok(parsed.reference)
    }

    async fn check_status(
        &self,
        provider_reference: &str,
    ) -> Result<ProviderStatus, GatewayError> {
        let resp = self
            .http
            .get(format!(
                "{}/collections/{}",
                self.base_url, provider_reference
            ))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|err| GatewayError::Unreachable(err.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::Rejected(format!(
                "unknown collection reference {provider_reference}"
            )));
        }
        if !resp.status().is_success() {
            return Err(GatewayError::Unreachable(format!(
                "provider returned status {}",
                resp.status()
            )));
        }

        let parsed: CollectionStatusResponse = resp
            .json()
            .await
            .map_err(|err| GatewayError::Internal(err.into()))?;
        Ok(Self::normalize(&parsed.status))
    }
}
