//! Storage Config

use std::path::PathBuf;

use clap::Args;

/// Where the cart and catalog live on disk.
#[derive(Debug, Clone, Args)]
pub struct StorageConfig {
    /// Directory holding the persisted cart
    #[arg(long, env = "CART_DIR", default_value = ".storefront")]
    pub cart_dir: PathBuf,

    /// Catalog fixture (YAML, or JSON when the extension is `.json`)
    #[arg(long, env = "CATALOG_PATH", default_value = "fixtures/catalog.yml")]
    pub catalog_path: PathBuf,
}
