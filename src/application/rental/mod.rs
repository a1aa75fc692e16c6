mod errors;
pub mod inventory_ledger;
mod rental_service;

pub use errors::{RentalOperationError, Result};
pub use rental_service::{ServiceDependencies, create_rental, create_reservation};
