//! Cart endpoints.
//!
//! Every mutation returns the full updated [`Cart`].

use reqwest::Method;
use tracing::instrument;

use juniper_core::ProductId;

use crate::error::StoreError;
use crate::types::{
    Cart, CartLine, NewCartLine, RemoveCartItemRequest, SuccessResponse, TransferGuestRequest,
    UpdateCartItemRequest,
};

use super::ApiClient;

impl ApiClient {
    /// Fetch the authenticated user's cart.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Cart, StoreError> {
        self.send(self.request(Method::GET, "/cart")).await
    }

    /// Add a line to the cart. The server merges additively into any
    /// existing `(product_id, size)` line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self), fields(product_id = %line.product_id, size = %line.size))]
    pub async fn add_cart_item(&self, line: &NewCartLine) -> Result<Cart, StoreError> {
        self.send(self.request(Method::POST, "/cart/add-item").json(line))
            .await
    }

    /// Set the absolute quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self), fields(product_id = %product_id, size, quantity))]
    pub async fn update_cart_item(
        &self,
        product_id: &ProductId,
        size: &str,
        quantity: u32,
    ) -> Result<Cart, StoreError> {
        let body = UpdateCartItemRequest {
            product_id: product_id.clone(),
            size: size.to_string(),
            quantity,
        };
        self.send(self.request(Method::PUT, "/cart/update-item").json(&body))
            .await
    }

    /// Remove a cart line. Removing an absent line is a success.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self), fields(product_id = %product_id, size))]
    pub async fn remove_cart_item(
        &self,
        product_id: &ProductId,
        size: &str,
    ) -> Result<Cart, StoreError> {
        let body = RemoveCartItemRequest {
            product_id: product_id.clone(),
            size: size.to_string(),
        };
        self.send(self.request(Method::DELETE, "/cart/remove-item").json(&body))
            .await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<SuccessResponse, StoreError> {
        self.send(self.request(Method::DELETE, "/cart/clear-cart"))
            .await
    }

    /// Merge a guest cart snapshot into the authenticated user's cart and
    /// return the merged result.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on network, auth, or server failure.
    #[instrument(skip(self, guest_items), fields(count = guest_items.len()))]
    pub async fn transfer_guest_cart(
        &self,
        guest_items: Vec<CartLine>,
    ) -> Result<Cart, StoreError> {
        let body = TransferGuestRequest { guest_items };
        self.send(self.request(Method::POST, "/cart/transfer-guest").json(&body))
            .await
    }
}
