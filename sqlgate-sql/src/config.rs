use std::time::Duration;

use sqlgate_result::{Error, Result};

use crate::classify::PermissionPolicy;

/// Default pause between two evaluations of a polled condition.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Settings of a [`crate::SqlGateway`].
///
/// Both permission switches default to `false`, so a gateway built from
/// [`GatewayConfig::default`] only runs `SELECT`s. A zero `poll_timeout`
/// makes every polled assertion a single check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    pub dml_enabled: bool,
    pub ddl_enabled: bool,
    pub poll_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            dml_enabled: false,
            ddl_enabled: false,
            poll_timeout: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl GatewayConfig {
    pub fn with_dml_enabled(mut self, enabled: bool) -> Self {
        self.dml_enabled = enabled;
        self
    }

    pub fn with_ddl_enabled(mut self, enabled: bool) -> Self {
        self.ddl_enabled = enabled;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Reject settings that would make polling spin.
    pub fn validate(&self) -> Result<()> {
        if !self.poll_timeout.is_zero() && self.poll_interval.is_zero() {
            return Err(Error::invalid_argument(
                "poll_interval must be greater than zero when poll_timeout is set",
            ));
        }
        Ok(())
    }

    pub fn policy(&self) -> PermissionPolicy {
        PermissionPolicy::new(self.dml_enabled, self.ddl_enabled)
    }
}
