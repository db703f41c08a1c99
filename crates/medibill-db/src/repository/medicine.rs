//! # Medicine Repository
//!
//! Catalogue lookup and stock receipt.
//!
//! The catalogue itself is maintained elsewhere; this core only needs enough
//! surface to associate bill lines with tracked medicines, to receive new
//! stock batches, and to seed test data.
//!
//! ## Stock Receipt
//! Receiving a batch is the third sanctioned mutation of the shared stock
//! counters (after deduction and restoration): the batch insert and the
//! `current_stock` increment happen in one transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use medibill_core::{Medicine, StockBatch};

/// Caller-supplied fields for a new catalogue entry.
#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub name: String,
    pub category: String,
    pub default_price_cents: i64,
    pub reorder_level: i64,
}

/// Caller-supplied fields for a received stock batch.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub batch_number: String,
    pub manufacture_date: Option<chrono::NaiveDate>,
    pub expiry_date: chrono::NaiveDate,
    pub quantity_received: i64,
    pub cost_price_cents: i64,
}

/// Repository for medicine catalogue operations.
#[derive(Debug, Clone)]
pub struct MedicineRepository {
    pool: SqlitePool,
}

impl MedicineRepository {
    /// Creates a new MedicineRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MedicineRepository { pool }
    }

    /// Gets a medicine by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT id, name, category, default_price_cents, reorder_level,
                   current_stock, is_active, created_at, updated_at
            FROM medicines
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(medicine)
    }

    /// Gets a medicine by its unique name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT id, name, category, default_price_cents, reorder_level,
                   current_stock, is_active, created_at, updated_at
            FROM medicines
            WHERE name = ?1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(medicine)
    }

    /// Inserts a new medicine with zero stock.
    ///
    /// Fails with `UniqueViolation` if the name is already taken.
    pub async fn insert(&self, new: NewMedicine) -> DbResult<Medicine> {
        let now = Utc::now();
        let medicine = Medicine {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            category: new.category,
            default_price_cents: new.default_price_cents,
            reorder_level: new.reorder_level,
            current_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %medicine.id, name = %medicine.name, "Inserting medicine");

        sqlx::query(
            r#"
            INSERT INTO medicines (
                id, name, category, default_price_cents, reorder_level,
                current_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.category)
        .bind(medicine.default_price_cents)
        .bind(medicine.reorder_level)
        .bind(medicine.current_stock)
        .bind(medicine.is_active)
        .bind(medicine.created_at)
        .bind(medicine.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(medicine)
    }

    /// Receives a stock batch: inserts the batch and increments the
    /// medicine's cached `current_stock` in one transaction.
    pub async fn receive_stock(&self, medicine_id: &str, new: NewBatch) -> DbResult<StockBatch> {
        let now = Utc::now();
        let batch = StockBatch {
            id: Uuid::new_v4().to_string(),
            medicine_id: medicine_id.to_string(),
            batch_number: new.batch_number,
            manufacture_date: new.manufacture_date,
            expiry_date: new.expiry_date,
            quantity_received: new.quantity_received,
            quantity_remaining: new.quantity_received,
            cost_price_cents: new.cost_price_cents,
            received_at: now,
        };

        debug!(
            medicine_id = %medicine_id,
            batch_number = %batch.batch_number,
            quantity = batch.quantity_received,
            "Receiving stock batch"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stock_batches (
                id, medicine_id, batch_number, manufacture_date, expiry_date,
                quantity_received, quantity_remaining, cost_price_cents, received_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.medicine_id)
        .bind(&batch.batch_number)
        .bind(batch.manufacture_date)
        .bind(batch.expiry_date)
        .bind(batch.quantity_received)
        .bind(batch.quantity_remaining)
        .bind(batch.cost_price_cents)
        .bind(batch.received_at)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE medicines
            SET current_stock = current_stock + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(medicine_id)
        .bind(batch.quantity_received)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", medicine_id));
        }

        tx.commit().await?;

        Ok(batch)
    }

    /// Gets a batch by ID.
    pub async fn get_batch(&self, batch_id: &str) -> DbResult<Option<StockBatch>> {
        let batch = sqlx::query_as::<_, StockBatch>(
            r#"
            SELECT id, medicine_id, batch_number, manufacture_date, expiry_date,
                   quantity_received, quantity_remaining, cost_price_cents, received_at
            FROM stock_batches
            WHERE id = ?1
            "#,
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    /// Lists all batches of a medicine, soonest expiry first.
    pub async fn list_batches(&self, medicine_id: &str) -> DbResult<Vec<StockBatch>> {
        let batches = sqlx::query_as::<_, StockBatch>(
            r#"
            SELECT id, medicine_id, batch_number, manufacture_date, expiry_date,
                   quantity_received, quantity_remaining, cost_price_cents, received_at
            FROM stock_batches
            WHERE medicine_id = ?1
            ORDER BY expiry_date ASC, received_at ASC
            "#,
        )
        .bind(medicine_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Sum of `quantity_remaining` across a medicine's batches.
    ///
    /// Exists for invariant checks: at every committed state this must equal
    /// the medicine's cached `current_stock`.
    pub async fn batch_stock_sum(&self, medicine_id: &str) -> DbResult<i64> {
        let sum: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(quantity_remaining)
            FROM stock_batches
            WHERE medicine_id = ?1
            "#,
        )
        .bind(medicine_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.unwrap_or(0))
    }
}
