//! `tillsync-inventory` — stock movements, stock arithmetic and the
//! shortage policy.

pub mod movement;
pub mod policy;
pub mod stock;

pub use movement::{MovementReference, MovementType, StockMovement};
pub use policy::{PolicyHandle, ShortagePolicy};
pub use stock::{SalePlan, plan_sale};
