//! Request/response DTOs.
//!
//! Domain types serialize themselves; the DTOs here cover the caller side
//! of writes, where the domain constructors do the validation.

use serde::{Deserialize, Serialize};

use tillsync_core::SaleId;
use tillsync_sales::PaymentMethod;

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub product_code: String,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    /// Total as shown to the cashier; re-checked server-side.
    pub total_amount: u64,
    pub customer_name: String,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct SaleCreatedResponse {
    pub id: SaleId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSaleRequest {
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub code: String,
    pub name: String,
    pub current_stock: i64,
    pub min_stock_level: i64,
    /// Prices in smallest currency unit (e.g., cents).
    pub cost_price: u64,
    pub unit_price: u64,
}

#[derive(Debug, Deserialize)]
pub struct SetPolicyRequest {
    pub allow_negative_stock: bool,
}

#[derive(Debug, Serialize)]
pub struct PolicyResponse {
    pub allow_negative_stock: bool,
    pub policy: tillsync_inventory::ShortagePolicy,
}
