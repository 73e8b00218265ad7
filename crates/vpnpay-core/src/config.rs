use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Upper bound on the refund window: ten years.
pub const MAX_REFUND_TIMEOUT_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Tunable protocol policy applied by the ledger host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPolicy {
    /// Seconds a session must exist before its remainder can be refunded.
    #[serde(default = "default_refund_timeout_secs")]
    pub refund_timeout_secs: u64,
    /// Smallest collateral a session may lock.
    #[serde(default = "default_min_collateral")]
    pub min_collateral: u64,
}

fn default_refund_timeout_secs() -> u64 {
    24 * 60 * 60
}
fn default_min_collateral() -> u64 {
    100
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            refund_timeout_secs: default_refund_timeout_secs(),
            min_collateral: default_min_collateral(),
        }
    }
}

impl SessionPolicy {
    /// Reject policies the ledger cannot enforce.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.refund_timeout_secs == 0 {
            return Err(CoreError::InvalidPolicy(
                "refund_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.refund_timeout_secs > MAX_REFUND_TIMEOUT_SECS {
            return Err(CoreError::InvalidPolicy(format!(
                "refund_timeout_secs must be at most {}",
                MAX_REFUND_TIMEOUT_SECS
            )));
        }
        Ok(())
    }

    /// The refund window as a chrono duration.
    pub fn refund_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refund_timeout_secs.min(MAX_REFUND_TIMEOUT_SECS) as i64)
    }
}
