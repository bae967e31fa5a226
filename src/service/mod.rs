//! Catalog and account operations on top of a [`crate::store::Store`].

mod accounts;
mod crud;
mod validation;
pub use accounts::AccountService;
pub use crud::{CatalogEntity, EntityCrud};
pub use validation::RequestValidator;
