//! PostgreSQL adapter tests.
//!
//! These run against a real database and are ignored by default;
//! set DATABASE_URL and run `cargo test -- --ignored` to include them.

use std::sync::Arc;

use movie_rental_ddd::adapters::postgres::PostgresRentalStore;
use movie_rental_ddd::application::rental::{
    RentalOperationError, ServiceDependencies, create_rental,
};
use movie_rental_ddd::domain::commands::CreateRental;
use movie_rental_ddd::domain::inventory::ItemStatus;
use movie_rental_ddd::domain::value_objects::*;
use movie_rental_ddd::ports::rental_store::RentalStore;
use serial_test::serial;
use sqlx::PgPool;

mod common;

/// Remove every row the rental flow may have written.
async fn cleanup_database(pool: &PgPool) {
    sqlx::query("TRUNCATE TABLE rental_lines, rentals, inventory_items, promo_codes")
        .execute(pool)
        .await
        .expect("Failed to truncate rental tables");
}

/// Insert an AVAILABLE inventory item.
async fn seed_item(pool: &PgPool, item_id: i64, movie_id: i64, location_id: i64) {
    sqlx::query(
        r#"
        INSERT INTO inventory_items (item_id, movie_id, format_id, location_id, status)
        VALUES ($1, $2, 1, $3, 'AVAILABLE')
        "#,
    )
    .bind(item_id)
    .bind(movie_id)
    .bind(location_id)
    .execute(pool)
    .await
    .expect("Failed to seed inventory item");
}

fn command(customer: i64, items: &[i64]) -> CreateRental {
    CreateRental {
        customer_id: CustomerId::from_i64(customer),
        employee_id: None,
        promo_code_id: None,
        item_ids: items.iter().map(|id| InventoryItemId::from_i64(*id)).collect(),
        requested_at: chrono::Utc::now(),
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_create_rental_persists_rental_and_flips_items() {
    let pool = common::create_test_pool().await;
    cleanup_database(&pool).await;
    seed_item(&pool, 101, 7, 3).await;
    seed_item(&pool, 102, 9, 3).await;

    let store = Arc::new(PostgresRentalStore::new(pool.clone()));
    let deps = ServiceDependencies {
        store: store.clone(),
    };

    let rental = create_rental(&deps, command(7, &[101, 102]))
        .await
        .expect("Failed to create rental");

    // The rental can be read back, lines in input order
    let fetched = store
        .fetch_rental(rental.rental_id)
        .await
        .expect("Failed to fetch rental")
        .expect("Rental not found");
    assert_eq!(fetched.lines.len(), 2);
    assert_eq!(fetched.lines[0].item_id, InventoryItemId::from_i64(101));
    assert_eq!(fetched.lines[1].item_id, InventoryItemId::from_i64(102));

    // Both items are RENTED now
    for id in [101, 102] {
        let item = store
            .fetch_item(InventoryItemId::from_i64(id))
            .await
            .expect("Failed to fetch item")
            .expect("Item not found");
        assert_eq!(item.status, ItemStatus::Rented);
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_unavailable_item_fails_without_side_effects() {
    let pool = common::create_test_pool().await;
    cleanup_database(&pool).await;
    seed_item(&pool, 101, 7, 3).await;
    seed_item(&pool, 102, 9, 3).await;

    let store = Arc::new(PostgresRentalStore::new(pool.clone()));
    let deps = ServiceDependencies {
        store: store.clone(),
    };

    // First rental takes item 102
    create_rental(&deps, command(7, &[102]))
        .await
        .expect("Failed to create first rental");

    // Second request wants 101 and the now-rented 102
    let result = create_rental(&deps, command(8, &[101, 102])).await;
    match result.unwrap_err() {
        RentalOperationError::ItemNotAvailable(ids) => {
            assert_eq!(ids, vec![InventoryItemId::from_i64(102)]);
        }
        other => panic!("Expected ItemNotAvailable, got {:?}", other),
    }

    // Item 101 was left untouched
    let item = store
        .fetch_item(InventoryItemId::from_i64(101))
        .await
        .expect("Failed to fetch item")
        .expect("Item not found");
    assert_eq!(item.status, ItemStatus::Available);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_concurrent_rentals_for_same_item_have_one_winner() {
    let pool = common::create_test_pool().await;
    cleanup_database(&pool).await;
    seed_item(&pool, 101, 7, 3).await;

    let store = Arc::new(PostgresRentalStore::new(pool.clone()));
    let deps = ServiceDependencies {
        store: store.clone(),
    };

    let (first, second) = futures::future::join(
        create_rental(&deps, command(7, &[101])),
        create_rental(&deps, command(8, &[101])),
    )
    .await;

    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);

    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(
        loser.unwrap_err(),
        RentalOperationError::ItemNotAvailable(_) | RentalOperationError::ConcurrentModification
    ));

    let item = store
        .fetch_item(InventoryItemId::from_i64(101))
        .await
        .expect("Failed to fetch item")
        .expect("Item not found");
    assert_eq!(item.status, ItemStatus::Rented);
}
