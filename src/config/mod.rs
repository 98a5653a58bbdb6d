//! Storefront configuration module

use clap::Args;

use crate::config::{
    checkout::CheckoutConfig, logging::LoggingConfig, service::ServiceConfig,
    storage::StorageConfig,
};

pub mod checkout;
pub mod logging;
pub mod service;
pub mod storage;

pub use logging::LogFormat;

/// Storefront configuration, read from CLI arguments with environment
/// fallbacks.
#[derive(Debug, Clone, Args)]
pub struct StorefrontConfig {
    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Checkout pricing settings.
    #[command(flatten)]
    pub checkout: CheckoutConfig,

    /// Collaborator call settings.
    #[command(flatten)]
    pub service: ServiceConfig,

    /// Cart and catalog locations.
    #[command(flatten)]
    pub storage: StorageConfig,
}
