use anyhow::{Ok, Result};

use super::config_model::{Database, DotEnvyConfig, PaymentProvider, Poller, Server};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let payment_provider = PaymentProvider {
        base_url: std::env::var("PAYMENT_PROVIDER_BASE_URL")
            .expect("PAYMENT_PROVIDER_BASE_URL is invalid"),
        api_key: std::env::var("PAYMENT_PROVIDER_API_KEY")
            .expect("PAYMENT_PROVIDER_API_KEY is invalid"),
    };

    let poller = Poller {
        interval_secs: std::env::var("PAYMENT_POLL_INTERVAL_SECS")
            .unwrap_or("3".to_string())
            .parse()?,
        max_attempts: std::env::var("PAYMENT_POLL_MAX_ATTEMPTS")
            .unwrap_or("20".to_string())
            .parse()?,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        payment_provider,
        poller,
    })
}
