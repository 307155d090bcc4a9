//! Wishlist endpoints.
//!
//! Entries are keyed by `(product_id, size)`, carried in the URL path for
//! the per-entry operations. Both segments are percent-encoded.

use reqwest::Method;
use tracing::instrument;

use juniper_core::ProductId;

use crate::error::StoreError;
use crate::types::{
    AddWishlistItemRequest, MoveToCartRequest, MoveToCartResponse, SuccessResponse,
    TransferGuestRequest, Wishlist, WishlistEntry,
};

use super::ApiClient;

fn entry_path(product_id: &ProductId, size: &str) -> String {
    format!(
        "/wishlist/{}/{}",
        urlencoding::encode(product_id.as_str()),
        urlencoding::encode(size)
    )
}

impl ApiClient {
    /// Fetch the authenticated user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self))]
    pub async fn get_wishlist(&self) -> Result<Wishlist, StoreError> {
        self.send(self.request(Method::GET, "/wishlist")).await
    }

    /// Add an entry to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Business` if the entry already exists, or
    /// another `StoreError` on network, auth, or server failure.
    #[instrument(skip(self), fields(product_id = %product_id, size))]
    pub async fn add_wishlist_item(
        &self,
        product_id: &ProductId,
        size: &str,
    ) -> Result<Wishlist, StoreError> {
        let body = AddWishlistItemRequest {
            product_id: product_id.clone(),
            size: size.to_string(),
        };
        self.send(self.request(Method::POST, "/wishlist").json(&body))
            .await
    }

    /// Remove an entry from the wishlist. Removing an absent entry is a
    /// success.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self), fields(product_id = %product_id, size))]
    pub async fn remove_wishlist_item(
        &self,
        product_id: &ProductId,
        size: &str,
    ) -> Result<Wishlist, StoreError> {
        self.send(self.request(Method::DELETE, &entry_path(product_id, size)))
            .await
    }

    /// Atomically move a wishlist entry into the cart. Returns both
    /// updated entities.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self), fields(product_id = %product_id, size, quantity))]
    pub async fn move_wishlist_item_to_cart(
        &self,
        product_id: &ProductId,
        size: &str,
        quantity: u32,
    ) -> Result<MoveToCartResponse, StoreError> {
        let path = format!("{}/move-to-cart", entry_path(product_id, size));
        let body = MoveToCartRequest { quantity };
        self.send(self.request(Method::POST, &path).json(&body))
            .await
    }

    /// Empty the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self))]
    pub async fn clear_wishlist(&self) -> Result<SuccessResponse, StoreError> {
        self.send(self.request(Method::DELETE, "/wishlist/clear"))
            .await
    }

    /// Merge a guest wishlist snapshot into the authenticated user's
    /// wishlist and return the merged result.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self, guest_items), fields(count = guest_items.len()))]
    pub async fn transfer_guest_wishlist(
        &self,
        guest_items: Vec<WishlistEntry>,
    ) -> Result<Wishlist, StoreError> {
        let body = TransferGuestRequest { guest_items };
        self.send(
            self.request(Method::POST, "/wishlist/transfer-guest")
                .json(&body),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_path_encodes_segments() {
        let path = entry_path(&ProductId::new("gid://shop/Product/1"), "M / L");
        assert_eq!(path, "/wishlist/gid%3A%2F%2Fshop%2FProduct%2F1/M%20%2F%20L");
    }
}
