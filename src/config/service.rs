//! Service Config

use std::time::Duration;

use clap::Args;

/// Collaborator call settings.
#[derive(Debug, Clone, Args)]
pub struct ServiceConfig {
    /// Seconds to wait for the catalog or order service before giving up
    #[arg(long, env = "SERVICE_TIMEOUT_SECONDS", default_value_t = 15_u64)]
    pub service_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service_timeout_seconds)
    }
}
