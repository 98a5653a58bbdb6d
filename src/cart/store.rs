//! Cart Store

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    cart::{
        items::CartLineItem,
        storage::{CART_STORAGE_KEY, CartStorage, StorageError},
    },
    products::Product,
    variants::{CartItemKey, VariantSelection},
};

/// Errors raised by the cart store.
#[derive(Debug, Error)]
pub enum CartError {
    /// Persisting or loading the cart failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The persisted blob could not be encoded or decoded.
    #[error("cart blob is malformed: {0}")]
    Codec(#[from] serde_json::Error),

    /// No line with the given identity.
    #[error("cart item {0} not found")]
    ItemNotFound(String),
}

/// Persisted shape of the cart: `{"items": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Lines in insertion order
    pub items: Vec<CartLineItem>,
}

impl CartSnapshot {
    /// Encode to the persisted JSON blob.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Codec`] if serialization fails.
    pub fn encode(&self) -> Result<String, CartError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a persisted JSON blob.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Codec`] if the blob is not a valid cart.
    pub fn decode(blob: &str) -> Result<Self, CartError> {
        Ok(serde_json::from_str(blob)?)
    }
}

/// A shopper's cart.
///
/// Single writer: all mutations come from one session's event loop, so there
/// is no internal locking. Every mutation is persisted before it is applied
/// in memory; if persisting fails, both the stored blob and this store are
/// left exactly as they were.
pub struct CartStore {
    storage: Arc<dyn CartStorage>,
    items: Vec<CartLineItem>,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Restore the cart persisted in `storage`, or start empty.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the blob cannot be read or decoded.
    pub fn open(storage: Arc<dyn CartStorage>) -> Result<Self, CartError> {
        let items = match storage.read(CART_STORAGE_KEY)? {
            Some(blob) => CartSnapshot::decode(&blob)?.items,
            None => Vec::new(),
        };

        debug!(lines = items.len(), "restored cart");

        Ok(Self { storage, items })
    }

    /// Add `product` (optionally a specific variant) to the cart.
    ///
    /// Price and stock are snapshotted from `product`. Re-adding a line with
    /// the same identity *replaces* its quantity rather than adding to it.
    /// That is the established storefront behaviour, though it may not have
    /// been intended upstream.
    ///
    /// The quantity is stored as given; range checks belong to the caller.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the cart cannot be persisted.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: u32,
        selection: VariantSelection,
    ) -> Result<CartItemKey, CartError> {
        let line = CartLineItem::new(product, quantity, selection);
        let key = line.cart_item_key.clone();

        let mut items = self.items.clone();

        match items.iter_mut().find(|item| item.identity() == key.as_str()) {
            Some(existing) => {
                debug!(key = %key, quantity, "replacing cart line");
                *existing = line;
            }
            None => {
                debug!(key = %key, quantity, "adding cart line");
                items.push(line);
            }
        }

        self.commit(items)?;

        Ok(key)
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// - [`CartError::ItemNotFound`]: no line has identity `key`.
    /// - [`CartError::Storage`]: the cart could not be persisted.
    pub fn update_quantity(&mut self, key: &str, quantity: u32) -> Result<(), CartError> {
        let mut items = self.items.clone();

        let line = items
            .iter_mut()
            .find(|item| item.identity() == key)
            .ok_or_else(|| CartError::ItemNotFound(key.to_string()))?;

        line.quantity = quantity;

        debug!(key, quantity, "updated cart line quantity");

        self.commit(items)
    }

    /// Replace the advisory stock snapshots of the given lines with live
    /// figures. Unknown keys are ignored; nothing is persisted when no
    /// snapshot changes.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the cart cannot be persisted.
    pub fn refresh_stock(&mut self, live: &[(CartItemKey, u32)]) -> Result<(), CartError> {
        let mut items = self.items.clone();
        let mut changed = false;

        for (key, available) in live {
            for item in items.iter_mut().filter(|item| item.identity() == key.as_str()) {
                if item.available_stock != *available {
                    item.available_stock = *available;
                    changed = true;
                }
            }
        }

        if !changed {
            return Ok(());
        }

        debug!(lines = live.len(), "refreshed cart stock snapshots");

        self.commit(items)
    }

    /// Remove the line addressed by `key`.
    ///
    /// Lines are addressed by their cart item key, or by product id when the
    /// line carries no key. Returns `false` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the cart cannot be persisted.
    pub fn remove_item(&mut self, key: &str) -> Result<bool, CartError> {
        let mut items = self.items.clone();
        let before = items.len();

        items.retain(|item| item.identity() != key);

        if items.len() == before {
            return Ok(false);
        }

        debug!(key, "removed cart line");

        self.commit(items)?;

        Ok(true)
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the cart cannot be persisted.
    pub fn clear(&mut self) -> Result<(), CartError> {
        debug!(lines = self.items.len(), "clearing cart");

        self.commit(Vec::new())
    }

    /// Lines in insertion order.
    pub fn list_items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Look up a line by identity.
    pub fn get_item(&self, key: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.identity() == key)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
        }
    }

    fn commit(&mut self, items: Vec<CartLineItem>) -> Result<(), CartError> {
        let snapshot = CartSnapshot { items };

        self.storage
            .write(CART_STORAGE_KEY, &snapshot.encode()?)?;

        self.items = snapshot.items;

        Ok(())
    }
}
