//! Wire schemas for the storefront REST API.
//!
//! These types define explicit shapes for everything crossing the client
//! boundary. Responses are parsed into them on receipt instead of being
//! trusted implicitly, and the same shapes serve as the locally persisted
//! guest snapshot format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use juniper_core::{Email, Price, ProductId, UserId};

use crate::error::StoreError;

/// Size used when the caller does not pick one (one-size products).
pub const DEFAULT_SIZE: &str = "default";

// =============================================================================
// Cart Types
// =============================================================================

/// One product+size line within a cart.
///
/// The `(product_id, size)` pair is unique per cart. The optional display
/// fields are denormalized so a guest cart can render before any server
/// round-trip; the server cart always fills them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product the line refers to.
    pub product_id: ProductId,
    /// Selected size.
    pub size: String,
    /// Line quantity, always >= 1.
    pub quantity: u32,
    /// Display name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Unit price, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    /// Image URL, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartLine {
    /// Whether this line matches the given `(product_id, size)` key.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, size: &str) -> bool {
        &self.product_id == product_id && self.size == size
    }
}

/// Input for adding a line to the cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartLine {
    /// Product to add.
    pub product_id: ProductId,
    /// Selected size.
    pub size: String,
    /// Quantity to add (merged additively into an existing line).
    pub quantity: u32,
    /// Display name for guest-mode rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Unit price for guest-mode rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    /// Image URL for guest-mode rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl NewCartLine {
    /// Validate the input shape before it touches state or the network.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the product id or size is
    /// missing, or the quantity is zero.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.product_id.is_empty() {
            return Err(StoreError::Validation("product id is required".to_string()));
        }
        if self.size.is_empty() {
            return Err(StoreError::Validation("size is required".to_string()));
        }
        if self.quantity == 0 {
            return Err(StoreError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Convert into a cart line (guest path insertion).
    #[must_use]
    pub fn into_line(self) -> CartLine {
        CartLine {
            product_id: self.product_id,
            size: self.size,
            quantity: self.quantity,
            name: self.name,
            price: self.price,
            image: self.image,
        }
    }
}

/// The full cart entity as returned by the server (and persisted for
/// guests). Totals are always derived from `items`, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Cart lines, unique by `(product_id, size)`.
    #[serde(default)]
    pub items: Vec<CartLine>,
}

// =============================================================================
// Wishlist Types
// =============================================================================

/// Denormalized product data carried by a wishlist entry so the wishlist
/// page can render without extra product lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price at the time the entry was created.
    pub price: Price,
    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// One product+size entry within a wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    /// Product the entry refers to.
    pub product_id: ProductId,
    /// Selected size (defaults to [`DEFAULT_SIZE`]).
    pub size: String,
    /// When the entry was added.
    pub added_at: DateTime<Utc>,
    /// Product snapshot for rendering.
    pub product: ProductSnapshot,
}

impl WishlistEntry {
    /// Whether this entry matches the given `(product_id, size)` key.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, size: &str) -> bool {
        &self.product_id == product_id && self.size == size
    }
}

/// The full wishlist entity as returned by the server (and persisted for
/// guests).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    /// Wishlist entries, unique by `(product_id, size)`.
    #[serde(default)]
    pub items: Vec<WishlistEntry>,
}

// =============================================================================
// User Types
// =============================================================================

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User ID.
    pub id: UserId,
    /// Email address.
    pub email: Email,
    /// First name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Fields for a profile update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New first name.
    pub first_name: Option<String>,
    /// New last name.
    pub last_name: Option<String>,
    /// New email address.
    pub email: Option<Email>,
    /// New avatar image.
    pub avatar: Option<AvatarUpload>,
}

/// Avatar image payload for the multipart profile update.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    /// Original file name.
    pub file_name: String,
    /// MIME type (e.g., "image/png").
    pub content_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

// =============================================================================
// Request / Response Envelopes
// =============================================================================

/// Body for `PUT /cart/update-item`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    /// Product key.
    pub product_id: ProductId,
    /// Size key.
    pub size: String,
    /// Absolute quantity (not additive).
    pub quantity: u32,
}

/// Body for `DELETE /cart/remove-item`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartItemRequest {
    /// Product key.
    pub product_id: ProductId,
    /// Size key.
    pub size: String,
}

/// Body for `POST /cart/transfer-guest` and `POST /wishlist/transfer-guest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferGuestRequest<T> {
    /// Guest snapshot being migrated into the user's account.
    pub guest_items: Vec<T>,
}

/// Body for `POST /wishlist`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWishlistItemRequest {
    /// Product key.
    pub product_id: ProductId,
    /// Size key.
    pub size: String,
}

/// Body for `POST /wishlist/:productId/:size/move-to-cart`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToCartRequest {
    /// Quantity for the created cart line.
    pub quantity: u32,
}

/// Response for `POST /wishlist/:productId/:size/move-to-cart`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToCartResponse {
    /// Updated wishlist (entry removed).
    pub wishlist: Wishlist,
    /// Updated cart (line added).
    pub cart: Cart,
}

/// Response for the clear endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct SuccessResponse {
    /// Whether the operation succeeded.
    pub success: bool,
}

/// Error body shape returned by the API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable failure message.
    pub message: String,
}
