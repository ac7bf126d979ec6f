pub mod card_client;
pub mod cash_on_delivery;
pub mod gateway;
pub mod momo_client;

use std::sync::Arc;

use crate::config::config_model::PaymentProvider;
use crate::domain::value_objects::enums::payment_methods::PaymentMethod;
use card_client::CardClient;
use cash_on_delivery::CashOnDeliveryGateway;
use gateway::PaymentGateway;
use momo_client::MobileMoneyClient;

/// One adapter per payment method variant; the dispatcher and poller only
/// ever see the `PaymentGateway` trait.
pub struct GatewayRegistry {
    card: Arc<dyn PaymentGateway>,
    mobile_money: Arc<dyn PaymentGateway>,
    cash_on_delivery: Arc<dyn PaymentGateway>,
}

impl GatewayRegistry {
    pub fn new(
        card: Arc<dyn PaymentGateway>,
        mobile_money: Arc<dyn PaymentGateway>,
        cash_on_delivery: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            card,
            mobile_money,
            cash_on_delivery,
        }
    }

    pub fn from_config(config: &PaymentProvider) -> Self {
        Self::new(
            Arc::new(CardClient::new(
                config.base_url.clone(),
                config.api_key.clone(),
            )),
            Arc::new(MobileMoneyClient::new(
                config.base_url.clone(),
                config.api_key.clone(),
            )),
            Arc::new(CashOnDeliveryGateway),
        )
    }

    pub fn for_method(&self, method: PaymentMethod) -> Arc<dyn PaymentGateway> {
        match method {
            PaymentMethod::Card => Arc::clone(&self.card),
            PaymentMethod::MobileMoney => Arc::clone(&self.mobile_money),
            PaymentMethod::CashOnDelivery => Arc::clone(&self.cash_on_delivery),
        }
    }
}
