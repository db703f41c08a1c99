//! # Bill Repository
//!
//! Database operations for bills and bill line items.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Bill Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (one transaction)                                           │
//! │     └── insert_bill() + insert_line_item()×N + stock::deduct()×N       │
//! │                                                                         │
//! │  2. (OPTIONAL) EDIT (one transaction)                                  │
//! │     └── stock::restore() → delete_line_items() → recreate items        │
//! │         → stock::deduct() → update_bill() → audit snapshot             │
//! │                                                                         │
//! │  3. (OPTIONAL) SOFT DELETE (one transaction)                           │
//! │     └── stock::restore() → mark_deleted() → audit snapshot             │
//! │         (line items are RETAINED for history)                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes are transaction-scoped free functions composed by the billing
//! service; the pool-based [`BillRepository`] serves plain reads.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use medibill_core::billing::bill_number_day_prefix;
use medibill_core::{Bill, BillLineItem, PaymentMode};

const BILL_COLUMNS: &str = r#"
    id, bill_number, created_by, customer_name, payment_mode,
    has_prescription, prescription_charge_cents, medicines_subtotal_cents,
    grand_total_cents, is_deleted, created_at, updated_at
"#;

const LINE_ITEM_COLUMNS: &str = r#"
    id, bill_id, medicine_id, medicine_name, quantity,
    cost_per_piece_cents, subtotal_cents, sort_order, created_at
"#;

// =============================================================================
// Pool-Based Reads
// =============================================================================

/// Repository for bill reads.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Gets a bill by ID, soft-deleted or not - callers decide how to treat
    /// the `is_deleted` flag.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Gets all line items for a bill in display order.
    pub async fn get_line_items(&self, bill_id: &str) -> DbResult<Vec<BillLineItem>> {
        let items = sqlx::query_as::<_, BillLineItem>(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM bill_line_items WHERE bill_id = ?1 ORDER BY sort_order"
        ))
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Counts the non-deleted bills carrying the given day's number prefix.
///
/// Feeds the sequence allocator; must run inside the same transaction as the
/// bill insert, since count-then-insert is not atomic on its own.
pub async fn count_for_day(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM bills
        WHERE bill_number LIKE ?1 AND is_deleted = 0
        "#,
    )
    .bind(bill_number_day_prefix(date))
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

/// Fetches a bill on the current transaction (sees uncommitted writes).
pub async fn fetch_bill(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Bill>> {
    let bill = sqlx::query_as::<_, Bill>(&format!(
        "SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(bill)
}

/// Fetches a bill's line items on the current transaction.
pub async fn fetch_line_items(
    conn: &mut SqliteConnection,
    bill_id: &str,
) -> DbResult<Vec<BillLineItem>> {
    let items = sqlx::query_as::<_, BillLineItem>(&format!(
        "SELECT {LINE_ITEM_COLUMNS} FROM bill_line_items WHERE bill_id = ?1 ORDER BY sort_order"
    ))
    .bind(bill_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Inserts a bill row. A `UniqueViolation` on `bill_number` here is the
/// sequence allocator's retry signal.
pub async fn insert_bill(conn: &mut SqliteConnection, bill: &Bill) -> DbResult<()> {
    debug!(id = %bill.id, bill_number = %bill.bill_number, "Inserting bill");

    sqlx::query(
        r#"
        INSERT INTO bills (
            id, bill_number, created_by, customer_name, payment_mode,
            has_prescription, prescription_charge_cents, medicines_subtotal_cents,
            grand_total_cents, is_deleted, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&bill.id)
    .bind(&bill.bill_number)
    .bind(&bill.created_by)
    .bind(&bill.customer_name)
    .bind(bill.payment_mode)
    .bind(bill.has_prescription)
    .bind(bill.prescription_charge_cents)
    .bind(bill.medicines_subtotal_cents)
    .bind(bill.grand_total_cents)
    .bind(bill.is_deleted)
    .bind(bill.created_at)
    .bind(bill.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts one bill line item.
pub async fn insert_line_item(conn: &mut SqliteConnection, item: &BillLineItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bill_line_items (
            id, bill_id, medicine_id, medicine_name, quantity,
            cost_per_piece_cents, subtotal_cents, sort_order, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.bill_id)
    .bind(&item.medicine_id)
    .bind(&item.medicine_name)
    .bind(item.quantity)
    .bind(item.cost_per_piece_cents)
    .bind(item.subtotal_cents)
    .bind(item.sort_order)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Deletes all line items of a bill (edit replaces them wholesale).
///
/// Callers must have restored the items' stock deductions first - the
/// restoration consumes the `stock_deductions` children, so no dangling
/// facts survive this delete.
pub async fn delete_line_items(conn: &mut SqliteConnection, bill_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM bill_line_items WHERE bill_id = ?1")
        .bind(bill_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Scalar fields of a bill that an edit can rewrite.
#[derive(Debug, Clone)]
pub struct BillUpdate {
    pub customer_name: Option<String>,
    pub payment_mode: PaymentMode,
    pub has_prescription: bool,
    pub prescription_charge_cents: i64,
    pub medicines_subtotal_cents: i64,
    pub grand_total_cents: i64,
    pub updated_at: DateTime<Utc>,
}

/// Rewrites a bill's scalar fields and totals.
pub async fn update_bill(
    conn: &mut SqliteConnection,
    bill_id: &str,
    update: &BillUpdate,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE bills SET
            customer_name = ?2,
            payment_mode = ?3,
            has_prescription = ?4,
            prescription_charge_cents = ?5,
            medicines_subtotal_cents = ?6,
            grand_total_cents = ?7,
            updated_at = ?8
        WHERE id = ?1
        "#,
    )
    .bind(bill_id)
    .bind(&update.customer_name)
    .bind(update.payment_mode)
    .bind(update.has_prescription)
    .bind(update.prescription_charge_cents)
    .bind(update.medicines_subtotal_cents)
    .bind(update.grand_total_cents)
    .bind(update.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Soft-deletes a bill. Children are retained for history.
pub async fn mark_deleted(conn: &mut SqliteConnection, bill_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE bills SET is_deleted = 1, updated_at = ?2 WHERE id = ?1")
        .bind(bill_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(())
}
