//! # Stock Ledger
//!
//! FEFO deduction engine and restoration engine.
//!
//! ## FEFO Deduction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              deduct(medicine, qty=5)                                    │
//! │                                                                         │
//! │  Batches of the medicine, non-empty and not expired,                   │
//! │  ordered by SOONEST EXPIRY first (First-Expire-First-Out):             │
//! │                                                                         │
//! │  ┌──────────────────────┐      take min(3, 5) = 3                      │
//! │  │ B1 exp +5d,  rem  3  │ ───► StockDeduction(B1, 3), rem 3 → 0        │
//! │  ├──────────────────────┤      take min(10, 2) = 2                     │
//! │  │ B2 exp +10d, rem 10  │ ───► StockDeduction(B2, 2), rem 10 → 8       │
//! │  └──────────────────────┘                                              │
//! │                                                                         │
//! │  medicines.current_stock -= 5 (total actually taken)                   │
//! │                                                                         │
//! │  Short stock? Take whatever exists and report insufficient=true.       │
//! │  NEVER an error - a sale is never blocked for stock shortfall.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Restoration
//! The exact inverse, replayed from the recorded deduction facts: each fact
//! credits its own batch, then one `current_stock` increment per distinct
//! medicine. The facts are deleted as they are consumed, so restoring the
//! same line items twice credits nothing the second time (exactly-once).
//!
//! Restoration credits a batch even if it has since expired: `current_stock`
//! tracks *physical* stock. `deduct` filters expired batches, so such stock
//! is physically present but never sold again.
//!
//! ## Transaction Discipline
//! Every function here takes `&mut SqliteConnection` and runs on a
//! transaction the caller (the billing service) opened. Nothing commits here.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, SqliteConnection};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Result of one FEFO deduction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeductionOutcome {
    /// Quantity the line item asked for.
    pub requested: i64,
    /// Quantity actually taken across batches (possibly zero).
    pub deducted: i64,
    /// Advisory flag: the request exceeded available non-expired stock.
    pub insufficient: bool,
}

/// Slice of a batch row needed by the FEFO walk.
#[derive(Debug, sqlx::FromRow)]
struct BatchSlice {
    id: String,
    quantity_remaining: i64,
}

/// A deduction fact joined to its batch's medicine, for restoration.
#[derive(Debug, sqlx::FromRow)]
struct DeductionFact {
    batch_id: String,
    medicine_id: String,
    quantity: i64,
}

/// Deducts `quantity` units of a medicine across its batches, soonest expiry
/// first, recording one `stock_deductions` fact per batch touched.
///
/// Returns how much was actually taken; requesting more than is available is
/// an advisory `insufficient`, never an error. Fails `NotFound` only when the
/// medicine row itself does not exist.
///
/// Must run on the caller's open transaction.
pub async fn deduct(
    conn: &mut SqliteConnection,
    medicine_id: &str,
    quantity: i64,
    line_item_id: &str,
) -> DbResult<DeductionOutcome> {
    let now = Utc::now();
    let today = now.date_naive();

    // Verify the medicine exists before touching counters
    let exists: Option<String> = sqlx::query_scalar("SELECT id FROM medicines WHERE id = ?1")
        .bind(medicine_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Err(DbError::not_found("Medicine", medicine_id));
    }

    // FEFO order: soonest expiry first, receipt order breaks ties
    let batches = sqlx::query_as::<_, BatchSlice>(
        r#"
        SELECT id, quantity_remaining
        FROM stock_batches
        WHERE medicine_id = ?1
          AND quantity_remaining > 0
          AND expiry_date >= ?2
        ORDER BY expiry_date ASC, received_at ASC
        "#,
    )
    .bind(medicine_id)
    .bind(today)
    .fetch_all(&mut *conn)
    .await?;

    let mut still_needed = quantity;
    let mut deducted = 0i64;

    for batch in &batches {
        if still_needed == 0 {
            break;
        }

        let take = batch.quantity_remaining.min(still_needed);

        sqlx::query(
            r#"
            INSERT INTO stock_deductions (id, line_item_id, batch_id, quantity, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(line_item_id)
        .bind(&batch.id)
        .bind(take)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            UPDATE stock_batches
            SET quantity_remaining = quantity_remaining - ?2
            WHERE id = ?1
            "#,
        )
        .bind(&batch.id)
        .bind(take)
        .execute(&mut *conn)
        .await?;

        still_needed -= take;
        deducted += take;
    }

    // Decrement the cached counter by what was actually taken, not requested
    if deducted > 0 {
        sqlx::query(
            r#"
            UPDATE medicines
            SET current_stock = current_stock - ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(medicine_id)
        .bind(deducted)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    debug!(
        medicine_id = %medicine_id,
        line_item_id = %line_item_id,
        requested = quantity,
        deducted,
        "FEFO deduction applied"
    );

    Ok(DeductionOutcome {
        requested: quantity,
        deducted,
        insufficient: still_needed > 0,
    })
}

/// Reverses every deduction fact recorded for the given line items.
///
/// Each fact credits its own batch's `quantity_remaining`; restored
/// quantities are accumulated per medicine and applied as one
/// `current_stock` increment per distinct medicine. The consumed facts are
/// deleted, making a second restore of the same line items a no-op.
///
/// Returns the total quantity restored. Must run on the caller's open
/// transaction.
pub async fn restore(conn: &mut SqliteConnection, line_item_ids: &[String]) -> DbResult<i64> {
    if line_item_ids.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();

    let mut select = QueryBuilder::new(
        r#"
        SELECT d.batch_id, b.medicine_id, d.quantity
        FROM stock_deductions d
        JOIN stock_batches b ON b.id = d.batch_id
        WHERE d.line_item_id IN (
        "#,
    );
    let mut separated = select.separated(", ");
    for id in line_item_ids {
        separated.push_bind(id);
    }
    select.push(")");

    let facts: Vec<DeductionFact> = select
        .build_query_as()
        .fetch_all(&mut *conn)
        .await?;

    let mut per_medicine: HashMap<String, i64> = HashMap::new();
    let mut restored_total = 0i64;

    for fact in &facts {
        sqlx::query(
            r#"
            UPDATE stock_batches
            SET quantity_remaining = quantity_remaining + ?2
            WHERE id = ?1
            "#,
        )
        .bind(&fact.batch_id)
        .bind(fact.quantity)
        .execute(&mut *conn)
        .await?;

        *per_medicine.entry(fact.medicine_id.clone()).or_insert(0) += fact.quantity;
        restored_total += fact.quantity;
    }

    // One counter write per distinct medicine, not per fact
    for (medicine_id, restored) in &per_medicine {
        sqlx::query(
            r#"
            UPDATE medicines
            SET current_stock = current_stock + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(medicine_id)
        .bind(restored)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    // Consume the facts: restoration is exactly-once per line item lifetime
    let mut delete = QueryBuilder::new("DELETE FROM stock_deductions WHERE line_item_id IN (");
    let mut separated = delete.separated(", ");
    for id in line_item_ids {
        separated.push_bind(id);
    }
    delete.push(")");
    delete.build().execute(&mut *conn).await?;

    debug!(
        line_items = line_item_ids.len(),
        facts = facts.len(),
        restored_total,
        "Stock restored"
    );

    Ok(restored_total)
}

/// Lists the deduction facts currently recorded for one line item.
pub async fn deductions_for_line_item(
    pool: &sqlx::SqlitePool,
    line_item_id: &str,
) -> DbResult<Vec<medibill_core::StockDeduction>> {
    let deductions = sqlx::query_as::<_, medibill_core::StockDeduction>(
        r#"
        SELECT id, line_item_id, batch_id, quantity, created_at
        FROM stock_deductions
        WHERE line_item_id = ?1
        "#,
    )
    .bind(line_item_id)
    .fetch_all(pool)
    .await?;

    Ok(deductions)
}
