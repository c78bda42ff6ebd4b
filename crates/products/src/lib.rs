//! `tillsync-products` — the product row entity.

pub mod product;

pub use product::Product;
