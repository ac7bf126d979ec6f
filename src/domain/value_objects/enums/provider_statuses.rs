use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Provider-specific status vocabularies are normalized into this
/// tri-state before entering the confirmation state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProviderStatus {
    Pending,
    Paid,
    Failed,
}

impl ProviderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderStatus::Pending => "pending",
            ProviderStatus::Paid => "paid",
            ProviderStatus::Failed => "failed",
        }
    }
}

impl Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
