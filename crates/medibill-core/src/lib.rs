//! # medibill-core: Pure Business Logic for MediBill
//!
//! This crate is the **heart** of MediBill. It contains all billing business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MediBill Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Consumers (UI / API / reporting)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          medibill-db (BillingService + repositories)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ medibill-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  billing  │  │ validation│  │   │
//! │  │   │ Medicine  │  │   Money   │  │  totals   │  │   rules   │  │   │
//! │  │   │   Bill    │  │  (cents)  │  │ bill no.  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Medicine, StockBatch, Bill, AuditLog, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`billing`] - Bill totals computation and bill number formatting
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use billing::{compute_totals, format_bill_number, BillTotals};
pub use error::{ValidationError, ValidationResult};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Flat charge added to the grand total when a bill carries a prescription.
///
/// ## Business Reason
/// The pharmacist reviews the prescription before dispensing; the review is
/// billed as a fixed fee, not a percentage. `BillingService` accepts an
/// override for stores with a different fee.
pub const DEFAULT_PRESCRIPTION_CHARGE_CENTS: i64 = 15_000;

/// Maximum line items allowed on a single bill.
///
/// ## Business Reason
/// Prevents runaway bills and keeps a single transaction's write set bounded.
pub const MAX_LINE_ITEMS: usize = 50;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-billing (e.g. typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Upper bound on bill-number allocation attempts under contention.
///
/// Each attempt is a fresh transaction; exceeding the cap is a fatal
/// creation failure (`BillNumberExhausted`).
pub const BILL_NUMBER_MAX_ATTEMPTS: u32 = 5;
