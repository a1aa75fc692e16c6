use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::domain::inventory::{InventoryItem, ItemStatus};
use crate::domain::rental::{PromoSnapshot, Rental, RentalLine, RentalStatus};
use crate::domain::value_objects::{
    CustomerId, EmployeeId, FormatId, InventoryItemId, LocationId, MovieId, PromoCodeId, RentalId,
    RentalLineId,
};
use crate::ports::rental_store::{
    RentalStore as RentalStoreTrait, RentalUnitOfWork, Result, StoreError,
};

/// Upper bound on how long a unit of work may wait for row locks.
/// A call stuck behind another reserver aborts instead of hanging.
const LOCK_TIMEOUT: &str = "5s";

/// Map a sqlx error into the port error type.
///
/// Serialization failures (40001), deadlocks (40P01), unique violations
/// (23505, two units of work drew the same rental id) and lock timeouts
/// (55P03) are all lost races: the caller may retry the same request.
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(code) = db_err.code() {
            if matches!(code.as_ref(), "40001" | "40P01" | "23505" | "55P03") {
                return StoreError::Conflict;
            }
        }
    }
    StoreError::Backend(Box::new(err))
}

fn invalid_data(message: String) -> StoreError {
    StoreError::Backend(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    )))
}

/// Convert an inventory row into the domain record.
fn map_row_to_item(row: &PgRow) -> Result<InventoryItem> {
    let status_str: &str = row.get("status");
    let status = ItemStatus::from_str(status_str).map_err(invalid_data)?;

    Ok(InventoryItem {
        item_id: InventoryItemId::from_i64(row.get("item_id")),
        movie_id: MovieId::from_i64(row.get("movie_id")),
        format_id: FormatId::from_i64(row.get("format_id")),
        location_id: LocationId::from_i64(row.get("location_id")),
        status,
    })
}

/// Convert a rentals row (without lines) into the domain aggregate.
fn map_row_to_rental(row: &PgRow) -> Result<Rental> {
    let status_str: &str = row.get("status");
    let status = RentalStatus::from_str(status_str).map_err(invalid_data)?;

    let promo = match row.get::<Option<i64>, _>("promo_code_id") {
        Some(promo_code_id) => Some(PromoSnapshot {
            promo_code_id: PromoCodeId::from_i64(promo_code_id),
            code: row.get::<Option<String>, _>("promo_code").unwrap_or_default(),
            percent_off: row.get("promo_percent_off"),
            amount_off_dkk: row.get("promo_amount_off_dkk"),
            starts_at: row.get("promo_starts_at"),
            ends_at: row.get("promo_ends_at"),
        }),
        None => None,
    };

    Ok(Rental {
        rental_id: RentalId::from_i64(row.get("rental_id")),
        customer_id: CustomerId::from_i64(row.get("customer_id")),
        employee_id: row
            .get::<Option<i64>, _>("employee_id")
            .map(EmployeeId::from_i64),
        location_id: LocationId::from_i64(row.get("location_id")),
        status,
        reserved_at: row.get("reserved_at"),
        rented_at: row.get("rented_at"),
        due_at: row.get("due_at"),
        returned_at: row.get("returned_at"),
        lines: Vec::new(),
        promo,
    })
}

fn map_row_to_line(row: &PgRow) -> RentalLine {
    RentalLine {
        line_id: RentalLineId::from_i64(row.get("line_id")),
        item_id: InventoryItemId::from_i64(row.get("item_id")),
        movie_id: MovieId::from_i64(row.get("movie_id")),
        format_id: FormatId::from_i64(row.get("format_id")),
    }
}

/// PostgreSQL implementation of RentalStore
///
/// The unit of work is a database transaction. Requested inventory rows are
/// locked with SELECT ... FOR UPDATE so the availability check and the status
/// transition are indivisible with respect to concurrent reservers.
pub struct PostgresRentalStore {
    pool: PgPool,
}

impl PostgresRentalStore {
    /// Create a new store from a PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RentalStoreTrait for PostgresRentalStore {
    async fn begin(&self) -> Result<Box<dyn RentalUnitOfWork>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Bound lock waits so a stuck unit of work aborts cleanly.
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}'", LOCK_TIMEOUT))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Box::new(PostgresUnitOfWork { tx }))
    }

    async fn fetch_rental(&self, rental_id: RentalId) -> Result<Option<Rental>> {
        let row = sqlx::query(
            r#"
            SELECT rental_id, customer_id, employee_id, location_id, status,
                   reserved_at, rented_at, due_at, returned_at,
                   promo_code_id, promo_code, promo_percent_off,
                   promo_amount_off_dkk, promo_starts_at, promo_ends_at
            FROM rentals
            WHERE rental_id = $1
            "#,
        )
        .bind(rental_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut rental = map_row_to_rental(&row)?;

        let line_rows = sqlx::query(
            r#"
            SELECT line_id, item_id, movie_id, format_id
            FROM rental_lines
            WHERE rental_id = $1
            ORDER BY line_id ASC
            "#,
        )
        .bind(rental_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rental.lines = line_rows.iter().map(map_row_to_line).collect();
        Ok(Some(rental))
    }

    async fn find_rentals_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Rental>> {
        let rows = sqlx::query(
            r#"
            SELECT rental_id, customer_id, employee_id, location_id, status,
                   reserved_at, rented_at, due_at, returned_at,
                   promo_code_id, promo_code, promo_percent_off,
                   promo_amount_off_dkk, promo_starts_at, promo_ends_at
            FROM rentals
            WHERE customer_id = $1
            ORDER BY rental_id ASC
            "#,
        )
        .bind(customer_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut rentals = Vec::with_capacity(rows.len());
        for row in &rows {
            rentals.push(map_row_to_rental(row)?);
        }

        if rentals.is_empty() {
            return Ok(rentals);
        }

        // One query for every line of every matched rental.
        let rental_ids: Vec<i64> = rentals.iter().map(|r| r.rental_id.value()).collect();
        let line_rows = sqlx::query(
            r#"
            SELECT rental_id, line_id, item_id, movie_id, format_id
            FROM rental_lines
            WHERE rental_id = ANY($1)
            ORDER BY rental_id ASC, line_id ASC
            "#,
        )
        .bind(&rental_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        for row in &line_rows {
            let rental_id: i64 = row.get("rental_id");
            if let Some(rental) = rentals
                .iter_mut()
                .find(|r| r.rental_id.value() == rental_id)
            {
                rental.lines.push(map_row_to_line(row));
            }
        }

        Ok(rentals)
    }

    async fn fetch_item(&self, item_id: InventoryItemId) -> Result<Option<InventoryItem>> {
        let row = sqlx::query(
            r#"
            SELECT item_id, movie_id, format_id, location_id, status
            FROM inventory_items
            WHERE item_id = $1
            "#,
        )
        .bind(item_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_item).transpose()
    }
}

/// PostgreSQL unit of work backed by a single transaction
struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RentalUnitOfWork for PostgresUnitOfWork {
    /// Load and lock the requested inventory rows.
    ///
    /// Rows are locked in ascending item-id order; overlapping batches then
    /// acquire their locks in the same order.
    async fn load_items(&mut self, item_ids: &[InventoryItemId]) -> Result<Vec<InventoryItem>> {
        let ids: Vec<i64> = item_ids.iter().map(|id| id.value()).collect();

        let rows = sqlx::query(
            r#"
            SELECT item_id, movie_id, format_id, location_id, status
            FROM inventory_items
            WHERE item_id = ANY($1)
            ORDER BY item_id ASC
            FOR UPDATE
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_item).collect()
    }

    async fn update_item_statuses(
        &mut self,
        item_ids: &[InventoryItemId],
        status: ItemStatus,
    ) -> Result<()> {
        let ids: Vec<i64> = item_ids.iter().map(|id| id.value()).collect();

        sqlx::query("UPDATE inventory_items SET status = $2 WHERE item_id = ANY($1)")
            .bind(&ids)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    /// Allocate the next rental id inside this transaction.
    ///
    /// COALESCE handles the empty table. Two units of work may still draw the
    /// same id; the primary key turns the loser's commit into a Conflict.
    async fn next_rental_id(&mut self) -> Result<RentalId> {
        let max_id: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(rental_id), 0)
            FROM rentals
            "#,
        )
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(RentalId::from_i64(max_id + 1))
    }

    async fn load_promo(&mut self, promo_code_id: PromoCodeId) -> Result<Option<PromoSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT promo_code_id, code, percent_off, amount_off_dkk, starts_at, ends_at
            FROM promo_codes
            WHERE promo_code_id = $1
            "#,
        )
        .bind(promo_code_id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| PromoSnapshot {
            promo_code_id: PromoCodeId::from_i64(row.get("promo_code_id")),
            code: row.get("code"),
            percent_off: row.get("percent_off"),
            amount_off_dkk: row.get("amount_off_dkk"),
            starts_at: row.get("starts_at"),
            ends_at: row.get("ends_at"),
        }))
    }

    /// Insert the rental row and its lines.
    ///
    /// Lines go in as one batch INSERT using UNNEST.
    async fn insert_rental(&mut self, rental: &Rental) -> Result<()> {
        let promo = rental.promo.as_ref();

        sqlx::query(
            r#"
            INSERT INTO rentals (
                rental_id, customer_id, employee_id, location_id, status,
                reserved_at, rented_at, due_at, returned_at,
                promo_code_id, promo_code, promo_percent_off,
                promo_amount_off_dkk, promo_starts_at, promo_ends_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(rental.rental_id.value())
        .bind(rental.customer_id.value())
        .bind(rental.employee_id.map(|id| id.value()))
        .bind(rental.location_id.value())
        .bind(rental.status.as_str())
        .bind(rental.reserved_at)
        .bind(rental.rented_at)
        .bind(rental.due_at)
        .bind(rental.returned_at)
        .bind(promo.map(|p| p.promo_code_id.value()))
        .bind(promo.map(|p| p.code.clone()))
        .bind(promo.and_then(|p| p.percent_off))
        .bind(promo.and_then(|p| p.amount_off_dkk))
        .bind(promo.and_then(|p| p.starts_at))
        .bind(promo.and_then(|p| p.ends_at))
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        let line_ids: Vec<i64> = rental.lines.iter().map(|l| l.line_id.value()).collect();
        let item_ids: Vec<i64> = rental.lines.iter().map(|l| l.item_id.value()).collect();
        let movie_ids: Vec<i64> = rental.lines.iter().map(|l| l.movie_id.value()).collect();
        let format_ids: Vec<i64> = rental.lines.iter().map(|l| l.format_id.value()).collect();

        sqlx::query(
            r#"
            INSERT INTO rental_lines (rental_id, line_id, item_id, movie_id, format_id)
            SELECT $1, * FROM UNNEST($2::bigint[], $3::bigint[], $4::bigint[], $5::bigint[])
            "#,
        )
        .bind(rental.rental_id.value())
        .bind(&line_ids)
        .bind(&item_ids)
        .bind(&movie_ids)
        .bind(&format_ids)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}
