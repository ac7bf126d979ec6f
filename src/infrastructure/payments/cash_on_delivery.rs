use async_trait::async_trait;

use crate::domain::value_objects::enums::provider_statuses::ProviderStatus;
use crate::infrastructure::payments::gateway::{GatewayError, PaymentGateway, RequestToPay};

/// Cash on delivery has no online provider. The online leg is acknowledged
/// locally and reports paid immediately; cash is collected at handover,
/// outside this pipeline.
pub struct CashOnDeliveryGateway;

#[async_trait]
impl PaymentGateway for CashOnDeliveryGateway {
    fn provider_name(&self) -> &'static str {
        "cash_on_delivery"
    }

    async fn request_to_pay(&self, request: RequestToPay) -> Result<String, GatewayError> {
        let key = &request.idempotency_key;
        let prefix = key.get(..12).unwrap_or(key);
        Ok(format!("cod-{prefix}"))
    }

    async fn check_status(
        &self,
        _provider_reference: &str,
    ) -> Result<ProviderStatus, GatewayError> {
        Ok(ProviderStatus::Paid)
    }
}
