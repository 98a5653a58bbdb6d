//! Storefront
//!
//! Variant-aware cart, stock resolution and checkout core for a retail
//! storefront. Products are either single SKUs or sets of variants
//! (footwear sizes, phone specs), each with its own stock. The cart keys
//! lines by product *and* exact variant, stock figures are advisory
//! snapshots, and checkout turns a cart into an immutable order draft whose
//! payment then follows a method-dependent state machine.
//!
//! The catalog and order services are collaborators behind async traits;
//! in-memory implementations are provided for tests and the CLI.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod observability;
pub mod orders;
pub mod payments;
pub mod prelude;
pub mod products;
pub mod stock;
pub mod uuids;
pub mod variants;
