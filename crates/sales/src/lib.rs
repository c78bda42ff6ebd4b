//! `tillsync-sales` — sale records and sale input validation.

pub mod draft;
pub mod record;

pub use draft::SaleDraft;
pub use record::{PaymentMethod, SalesRecord};
