#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub payment_provider: PaymentProvider,
    pub poller: Poller,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentProvider {
    pub base_url: String,
    pub api_key: String,
}

/// Retry budget for payment confirmation polling.
#[derive(Debug, Clone)]
pub struct Poller {
    pub interval_secs: u64,
    pub max_attempts: u32,
}
