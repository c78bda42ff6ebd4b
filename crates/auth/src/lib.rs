//! `tillsync-auth` — authorization boundary objects.
//!
//! Authentication and session management live outside this system; callers
//! arrive with an already-resolved `(user, role)` pair. This crate only
//! models that pair and the visibility rule the live synchronizer applies
//! with it.

pub mod identity;
pub mod roles;

pub use identity::ConnectionIdentity;
pub use roles::Role;
