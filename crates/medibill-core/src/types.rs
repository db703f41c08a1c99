//! # Domain Types
//!
//! Core domain types used throughout MediBill.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Medicine     │   │   StockBatch    │   │ StockDeduction  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  line_item_id   │       │
//! │  │  name (unique)  │   │  expiry_date    │   │  batch_id       │       │
//! │  │  current_stock  │◄──│  qty_remaining  │◄──│  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Bill       │   │  BillLineItem   │   │    AuditLog     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bill_number    │◄──│  bill_id (FK)   │   │  EDIT | DELETE  │       │
//! │  │  grand_total    │   │  medicine_id?   │   │  previous_state │       │
//! │  │  is_deleted     │   │  quantity       │   │  (JSON snapshot)│       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where applicable: (`name`, `bill_number`) - human-readable
//!
//! ## Invariants
//! - `Medicine.current_stock` equals the sum of `quantity_remaining` across
//!   that medicine's batches at every committed state.
//! - `0 <= StockBatch.quantity_remaining <= quantity_received`.
//! - `Bill.grand_total = medicines_subtotal + prescription_charge`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Caller Identity
// =============================================================================

/// Role of a resolved caller. Authentication itself is an external concern;
/// mutating calls receive an already-validated [`Actor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can create bills.
    Cashier,
    /// Can additionally edit and delete bills.
    Admin,
}

impl Role {
    /// Whether this role may edit or delete existing bills.
    #[inline]
    pub const fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Pre-validated caller identity attached to every mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Actor {
            user_id: user_id.into(),
            role,
        }
    }
}

// =============================================================================
// Medicine
// =============================================================================

/// A medicine in the catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Medicine {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name - the business identifier, unique across the catalogue.
    pub name: String,

    /// Free-text category ("Antibiotic", "Analgesic", ...).
    pub category: String,

    /// Default selling price in cents.
    pub default_price_cents: i64,

    /// Stock level below which the medicine should be reordered.
    pub reorder_level: i64,

    /// Cached sum of `quantity_remaining` across this medicine's batches.
    /// Mutated only by the stock ledger, restoration engine and stock receipt.
    pub current_stock: i64,

    /// Whether the medicine is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    /// Returns the default price as a Money type.
    #[inline]
    pub fn default_price(&self) -> Money {
        Money::from_cents(self.default_price_cents)
    }

    /// Whether the cached stock has fallen to or below the reorder level.
    #[inline]
    pub fn needs_reorder(&self) -> bool {
        self.current_stock <= self.reorder_level
    }
}

// =============================================================================
// Stock Batch
// =============================================================================

/// A received lot of a medicine with its own expiry and remaining counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockBatch {
    pub id: String,
    pub medicine_id: String,
    /// Manufacturer's batch/lot number (printed on the packaging).
    pub batch_number: String,
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    /// Immutable once received.
    pub quantity_received: i64,
    /// Decremented by deduction, incremented by restoration.
    pub quantity_remaining: i64,
    pub cost_price_cents: i64,
    pub received_at: DateTime<Utc>,
}

impl StockBatch {
    /// Whether the batch has expired as of the given date.
    #[inline]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

// =============================================================================
// Stock Deduction
// =============================================================================

/// An immutable fact linking one bill line item to one batch and the
/// quantity taken from it. Consumed (deleted) exactly once on restoration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockDeduction {
    pub id: String,
    pub line_item_id: String,
    pub batch_id: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Mode
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Mobile wallet / QR payment.
    Mobile,
}

// =============================================================================
// Bill
// =============================================================================

/// A financial record of one sale.
///
/// ## Lifecycle
/// Created together with its line items and stock deductions in one
/// transaction. Edit replaces line items (delete-all-then-recreate) after
/// reversing their stock effects. Delete is soft: `is_deleted` is flagged and
/// children are retained for history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Bill {
    pub id: String,
    /// `YYYYMMDD-NNNN`, unique, sequential per day (gaps allowed).
    pub bill_number: String,
    pub created_by: String,
    pub customer_name: Option<String>,
    pub payment_mode: PaymentMode,
    pub has_prescription: bool,
    /// Fixed fee iff `has_prescription`, else 0.
    pub prescription_charge_cents: i64,
    pub medicines_subtotal_cents: i64,
    /// `medicines_subtotal + prescription_charge`.
    pub grand_total_cents: i64,
    /// Soft-delete flag; queries must filter it explicitly.
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Returns the grand total as Money.
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }
}

// =============================================================================
// Bill Line Item
// =============================================================================

/// A line on a bill. `medicine_name` is free text; a line only touches
/// inventory when `medicine_id` links it to a tracked medicine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillLineItem {
    pub id: String,
    pub bill_id: String,
    pub medicine_id: Option<String>,
    pub medicine_name: String,
    pub quantity: i64,
    pub cost_per_piece_cents: i64,
    /// `quantity × cost_per_piece_cents`.
    pub subtotal_cents: i64,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

impl BillLineItem {
    /// Whether this line is tracked in inventory.
    #[inline]
    pub fn is_tracked(&self) -> bool {
        self.medicine_id.is_some()
    }
}

// =============================================================================
// Draft Line Item (input)
// =============================================================================

/// Caller-supplied line item for create/edit, before IDs are assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLineItem {
    pub medicine_name: String,
    pub quantity: i64,
    pub cost_per_piece_cents: i64,
    /// None ⇒ untracked free-text line, no inventory effect.
    #[serde(default)]
    pub medicine_id: Option<String>,
}

// =============================================================================
// Audit Trail
// =============================================================================

/// What a recorded audit entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Edit,
    Delete,
}

/// Append-only forensic record of an edit or delete. Never mutated after
/// insert and never consulted by transactional logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditLog {
    pub id: String,
    pub performed_by: String,
    pub action: AuditAction,
    pub bill_id: String,
    /// JSON-serialized [`BillSnapshot`] of the pre-mutation state.
    pub previous_state: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Full pre-mutation snapshot of a bill, sufficient to reconstruct what was
/// overwritten. Stored as JSON in `AuditLog.previous_state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillSnapshot {
    pub bill: Bill,
    pub line_items: Vec<BillLineItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
