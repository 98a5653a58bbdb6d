//! Cart
//!
//! Line items keyed by product and exact variant, persisted through an
//! injected [`CartStorage`] port after every mutation.

pub mod items;
pub mod storage;
pub mod store;

pub use items::CartLineItem;
pub use storage::{
    CART_STORAGE_KEY, CartStorage, FileStorage, MemoryStorage, MockCartStorage, StorageError,
};
pub use store::{CartError, CartSnapshot, CartStore};
