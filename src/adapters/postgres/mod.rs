pub mod rental_store;

pub use rental_store::PostgresRentalStore;
