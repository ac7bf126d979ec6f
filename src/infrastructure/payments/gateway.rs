use async_trait::async_trait;
use thiserror::Error;

use crate::domain::value_objects::enums::provider_statuses::ProviderStatus;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider refused the request synchronously (bad payer number,
    /// unsupported amount). Never retried.
    #[error("provider rejected the request: {0}")]
    Rejected(String),

    /// Transient transport or provider-side failure. The poller absorbs
    /// these within its retry budget.
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestToPay {
    pub amount_minor: i64,
    pub currency: String,
    pub payer_phone: String,
    pub idempotency_key: String,
}

/// The one asynchronous confirmation pattern every method adapter speaks:
/// an immediate "request to pay" acknowledgement followed by status
/// queries until the provider settles out of band.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Returns the provider's reference for the created payment. Must be
    /// idempotent on the provider side under the same idempotency key.
    async fn request_to_pay(&self, request: RequestToPay) -> Result<String, GatewayError>;

    async fn check_status(&self, provider_reference: &str)
    -> Result<ProviderStatus, GatewayError>;
}
