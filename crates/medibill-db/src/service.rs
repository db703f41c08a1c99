//! # Billing Service
//!
//! The bill transaction coordinator: create/edit/delete of a bill as one
//! atomic unit combining ledger writes, stock writes and the audit snapshot.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     One Logical Operation                               │
//! │                                                                         │
//! │  validate (no side effects) ──► compute totals (medibill-core)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN TRANSACTION                                                     │
//! │  ├── create: allocate bill number ── insert bill + items ── deduct     │
//! │  ├── edit:   snapshot ── restore old ── replace items ── deduct new    │
//! │  │           ── update totals ── audit(EDIT)                           │
//! │  └── delete: snapshot ── restore ── mark deleted ── audit(DELETE)      │
//! │  COMMIT  (any failure rolls the whole unit back)                       │
//! │                                                                         │
//! │  Only bill-number conflicts are retried (bounded); every other         │
//! │  failure is fatal and the caller resubmits from scratch.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sequence Allocation
//! `seq` starts at (count of today's non-deleted bills) + 1. Count-then-insert
//! is not atomic under concurrency, so the insert happens inside the same
//! transaction and a UNIQUE violation retries the whole creation with
//! `seq = base + 1 + attempts`, capped at
//! [`BILL_NUMBER_MAX_ATTEMPTS`](medibill_core::BILL_NUMBER_MAX_ATTEMPTS).
//! Soft-deleted bills keep their numbers but leave the count, so gaps and
//! conflicts are both expected; repeats are not.
//!
//! ## Insufficient Stock
//! Never blocks a sale: short lines deduct whatever exists and the medicine
//! names ride along as warnings on the successful response.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::{audit, bill, stock};
use medibill_core::billing::{self, compute_totals, format_bill_number};
use medibill_core::{
    validation, Actor, AuditAction, AuditLog, Bill, BillLineItem, BillSnapshot, NewLineItem,
    PaymentMode, Role, ValidationError, BILL_NUMBER_MAX_ATTEMPTS,
    DEFAULT_PRESCRIPTION_CHARGE_CENTS,
};

// =============================================================================
// Errors
// =============================================================================

/// Failures surfaced by the billing service.
///
/// Validation, permission and not-found failures carry NO side effects: they
/// are raised either before any transaction opens or before any write inside
/// one (which then rolls back on drop).
#[derive(Debug, Error)]
pub enum BillingError {
    /// Request rejected before any transaction opened.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Caller's role does not permit the operation.
    #[error("{role:?} role cannot {action}")]
    PermissionDenied { role: Role, action: &'static str },

    /// Bill absent - or soft-deleted, for operations that require a live bill.
    #[error("bill not found: {0}")]
    BillNotFound(String),

    /// Delete of an already soft-deleted bill.
    #[error("bill {0} is already deleted")]
    AlreadyDeleted(String),

    /// Sequence allocation lost every retry to concurrent creators.
    #[error("could not allocate a unique bill number after {attempts} attempts")]
    BillNumberExhausted { attempts: u32 },

    /// Audit snapshot could not be serialized.
    #[error("failed to serialize audit snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Underlying storage failure; the operation aborted atomically.
    #[error(transparent)]
    Db(#[from] DbError),
}

pub type BillingResult<T> = Result<T, BillingError>;

// =============================================================================
// Requests / Responses
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub has_prescription: bool,
    pub line_items: Vec<NewLineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillResponse {
    pub bill_id: String,
    pub bill_number: String,
    pub grand_total_cents: i64,
    /// Medicine names whose lines could not be fully covered by non-expired
    /// stock. Advisory only - the bill committed.
    pub stock_warnings: Vec<String>,
}

/// Partial edit: `None` fields retain their prior values. Supplying
/// `line_items` replaces the whole set (delete-all-then-recreate).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EditBillRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    pub has_prescription: Option<bool>,
    #[serde(default)]
    pub line_items: Option<Vec<NewLineItem>>,
    /// Free-text reason recorded on the audit entry.
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBillResponse {
    pub bill_number: String,
    pub stock_warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBillResponse {
    pub bill_number: String,
}

// =============================================================================
// Service
// =============================================================================

/// The bill transaction coordinator.
///
/// Cloning is cheap (shares the pool); one instance serves every terminal.
#[derive(Debug, Clone)]
pub struct BillingService {
    db: Database,
    prescription_charge_cents: i64,
}

impl BillingService {
    /// Creates a billing service with the default prescription charge.
    pub fn new(db: Database) -> Self {
        BillingService {
            db,
            prescription_charge_cents: DEFAULT_PRESCRIPTION_CHARGE_CENTS,
        }
    }

    /// Overrides the flat prescription charge (in cents).
    pub fn with_prescription_charge(mut self, cents: i64) -> Self {
        self.prescription_charge_cents = cents;
        self
    }

    // -------------------------------------------------------------------------
    // CREATE
    // -------------------------------------------------------------------------

    /// Creates a bill: totals, bill number allocation, line items and FEFO
    /// stock deductions, all in one transaction.
    ///
    /// Any authenticated role may create. Insufficient stock is reported as
    /// warnings on the successful response, never as an error.
    pub async fn create_bill(
        &self,
        actor: &Actor,
        request: CreateBillRequest,
    ) -> BillingResult<CreateBillResponse> {
        validation::validate_line_items(&request.line_items)?;
        validation::validate_customer_name(request.customer_name.as_deref())?;

        let totals = compute_totals(
            &request.line_items,
            request.has_prescription,
            self.prescription_charge_cents,
        );

        let mut base_count: Option<i64> = None;

        for attempt in 0..BILL_NUMBER_MAX_ATTEMPTS {
            let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

            let now = Utc::now();
            let today = now.date_naive();

            // The day's count is computed once; retries only bump the offset
            let base = match base_count {
                Some(c) => c,
                None => {
                    let c = bill::count_for_day(&mut *tx, today).await?;
                    base_count = Some(c);
                    c
                }
            };

            let seq = (base + 1 + attempt as i64) as u32;
            let bill_number = format_bill_number(today, seq);

            let new_bill = Bill {
                id: Uuid::new_v4().to_string(),
                bill_number: bill_number.clone(),
                created_by: actor.user_id.clone(),
                customer_name: request.customer_name.clone(),
                payment_mode: request.payment_mode,
                has_prescription: request.has_prescription,
                prescription_charge_cents: totals.prescription_charge_cents,
                medicines_subtotal_cents: totals.medicines_subtotal_cents,
                grand_total_cents: totals.grand_total_cents,
                is_deleted: false,
                created_at: now,
                updated_at: now,
            };

            match bill::insert_bill(&mut *tx, &new_bill).await {
                Ok(()) => {}
                Err(e) if e.is_unique_violation() => {
                    warn!(
                        bill_number = %bill_number,
                        attempt = attempt + 1,
                        "Bill number conflict, retrying creation"
                    );
                    tx.rollback().await.map_err(DbError::from)?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let warnings =
                insert_items_and_deduct(&mut tx, &new_bill.id, &request.line_items, now).await?;

            tx.commit().await.map_err(DbError::from)?;

            info!(
                bill_id = %new_bill.id,
                bill_number = %bill_number,
                grand_total = totals.grand_total_cents,
                items = request.line_items.len(),
                warnings = warnings.len(),
                "Bill created"
            );

            return Ok(CreateBillResponse {
                bill_id: new_bill.id,
                bill_number,
                grand_total_cents: totals.grand_total_cents,
                stock_warnings: warnings,
            });
        }

        Err(BillingError::BillNumberExhausted {
            attempts: BILL_NUMBER_MAX_ATTEMPTS,
        })
    }

    // -------------------------------------------------------------------------
    // EDIT
    // -------------------------------------------------------------------------

    /// Edits a bill. Omitted fields retain prior values; supplying line items
    /// replaces them wholesale, reversing old stock effects before applying
    /// new ones. The pre-edit state is snapshotted to the audit trail inside
    /// the same transaction.
    pub async fn edit_bill(
        &self,
        actor: &Actor,
        bill_id: &str,
        request: EditBillRequest,
    ) -> BillingResult<EditBillResponse> {
        if !actor.role.is_elevated() {
            return Err(BillingError::PermissionDenied {
                role: actor.role,
                action: "edit bills",
            });
        }

        if let Some(items) = &request.line_items {
            validation::validate_line_items(items)?;
        }
        validation::validate_customer_name(request.customer_name.as_deref())?;
        validation::validate_notes(request.notes.as_deref())?;

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let current = bill::fetch_bill(&mut *tx, bill_id)
            .await?
            .filter(|b| !b.is_deleted)
            .ok_or_else(|| BillingError::BillNotFound(bill_id.to_string()))?;

        let old_items = bill::fetch_line_items(&mut *tx, bill_id).await?;

        // Snapshot BEFORE any mutation
        let previous_state = serde_json::to_string(&BillSnapshot {
            bill: current.clone(),
            line_items: old_items.clone(),
        })?;

        let now = Utc::now();
        let has_prescription = request.has_prescription.unwrap_or(current.has_prescription);
        let customer_name = request.customer_name.or(current.customer_name);
        let payment_mode = request.payment_mode.unwrap_or(current.payment_mode);

        let mut warnings = Vec::new();

        // Totals are always recomputed, whether or not items are replaced
        let (medicines_subtotal, prescription_charge) = match &request.line_items {
            Some(new_items) => {
                // Reverse old stock effects BEFORE deleting the old items:
                // restoration replays the recorded deduction facts
                let tracked: Vec<String> = old_items
                    .iter()
                    .filter(|i| i.is_tracked())
                    .map(|i| i.id.clone())
                    .collect();
                stock::restore(&mut *tx, &tracked).await?;

                bill::delete_line_items(&mut *tx, bill_id).await?;

                warnings = insert_items_and_deduct(&mut tx, bill_id, new_items, now).await?;

                let totals =
                    compute_totals(new_items, has_prescription, self.prescription_charge_cents);
                (totals.medicines_subtotal_cents, totals.prescription_charge_cents)
            }
            None => {
                // Scalar-only edit: stock untouched, subtotal unchanged
                let subtotal: i64 = old_items.iter().map(|i| i.subtotal_cents).sum();
                let charge = if has_prescription {
                    self.prescription_charge_cents
                } else {
                    0
                };
                (subtotal, charge)
            }
        };

        bill::update_bill(
            &mut *tx,
            bill_id,
            &bill::BillUpdate {
                customer_name,
                payment_mode,
                has_prescription,
                prescription_charge_cents: prescription_charge,
                medicines_subtotal_cents: medicines_subtotal,
                grand_total_cents: medicines_subtotal + prescription_charge,
                updated_at: now,
            },
        )
        .await?;

        audit::insert_audit(
            &mut *tx,
            &AuditLog {
                id: Uuid::new_v4().to_string(),
                performed_by: actor.user_id.clone(),
                action: AuditAction::Edit,
                bill_id: bill_id.to_string(),
                previous_state,
                notes: request.notes,
                created_at: now,
            },
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            bill_id = %bill_id,
            bill_number = %current.bill_number,
            items_replaced = request.line_items.is_some(),
            "Bill edited"
        );

        Ok(EditBillResponse {
            bill_number: current.bill_number,
            stock_warnings: warnings,
        })
    }

    // -------------------------------------------------------------------------
    // DELETE (soft)
    // -------------------------------------------------------------------------

    /// Soft-deletes a bill: restores every recorded stock deduction, flags
    /// `is_deleted` and records the audit snapshot. Line items are retained
    /// for history.
    pub async fn delete_bill(
        &self,
        actor: &Actor,
        bill_id: &str,
        notes: Option<String>,
    ) -> BillingResult<DeleteBillResponse> {
        if !actor.role.is_elevated() {
            return Err(BillingError::PermissionDenied {
                role: actor.role,
                action: "delete bills",
            });
        }
        validation::validate_notes(notes.as_deref())?;

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let current = bill::fetch_bill(&mut *tx, bill_id)
            .await?
            .ok_or_else(|| BillingError::BillNotFound(bill_id.to_string()))?;

        if current.is_deleted {
            return Err(BillingError::AlreadyDeleted(bill_id.to_string()));
        }

        let old_items = bill::fetch_line_items(&mut *tx, bill_id).await?;

        let previous_state = serde_json::to_string(&BillSnapshot {
            bill: current.clone(),
            line_items: old_items.clone(),
        })?;

        let tracked: Vec<String> = old_items
            .iter()
            .filter(|i| i.is_tracked())
            .map(|i| i.id.clone())
            .collect();
        let restored = stock::restore(&mut *tx, &tracked).await?;

        bill::mark_deleted(&mut *tx, bill_id).await?;

        audit::insert_audit(
            &mut *tx,
            &AuditLog {
                id: Uuid::new_v4().to_string(),
                performed_by: actor.user_id.clone(),
                action: AuditAction::Delete,
                bill_id: bill_id.to_string(),
                previous_state,
                notes,
                created_at: Utc::now(),
            },
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            bill_id = %bill_id,
            bill_number = %current.bill_number,
            restored,
            "Bill soft-deleted"
        );

        Ok(DeleteBillResponse {
            bill_number: current.bill_number,
        })
    }
}

// =============================================================================
// Shared Steps
// =============================================================================

/// Inserts line items and applies FEFO deductions for the tracked ones,
/// collecting the medicine names that could not be fully covered.
async fn insert_items_and_deduct(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    bill_id: &str,
    items: &[NewLineItem],
    now: chrono::DateTime<Utc>,
) -> BillingResult<Vec<String>> {
    let mut warnings = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let line = BillLineItem {
            id: Uuid::new_v4().to_string(),
            bill_id: bill_id.to_string(),
            medicine_id: item.medicine_id.clone(),
            medicine_name: item.medicine_name.clone(),
            quantity: item.quantity,
            cost_per_piece_cents: item.cost_per_piece_cents,
            subtotal_cents: billing::line_subtotal_cents(item.quantity, item.cost_per_piece_cents),
            sort_order: index as i64,
            created_at: now,
        };

        bill::insert_line_item(&mut **tx, &line).await?;

        if let Some(medicine_id) = &item.medicine_id {
            let outcome = stock::deduct(&mut **tx, medicine_id, item.quantity, &line.id).await?;
            if outcome.insufficient {
                warn!(
                    medicine_id = %medicine_id,
                    requested = outcome.requested,
                    deducted = outcome.deducted,
                    "Insufficient stock, sale proceeds"
                );
                warnings.push(item.medicine_name.clone());
            }
        }
    }

    Ok(warnings)
}
