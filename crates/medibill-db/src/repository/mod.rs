//! # Repository Module
//!
//! Database repository implementations for MediBill.
//!
//! ## Two Kinds of Function
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Pool-based repositories (MedicineRepository, BillRepository, ...)     │
//! │  ├── Own a SqlitePool clone                                            │
//! │  ├── Single-statement reads, or writes that are atomic on their own    │
//! │  └── e.g. db.bills().get_by_id(id)                                     │
//! │                                                                         │
//! │  Transaction-scoped helpers (free async fns taking &mut Connection)    │
//! │  ├── Run on a transaction the BillingService opened                    │
//! │  ├── stock::deduct / stock::restore / bill::insert_bill / ...          │
//! │  └── Compose into one atomic unit - commit or nothing                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `medicines.current_stock` and `stock_batches.quantity_remaining` are only
//! ever written by [`stock::deduct`], [`stock::restore`] and
//! [`medicine::MedicineRepository::receive_stock`]. Everything else treats
//! them as read-only so the sum-of-batches invariant holds.
//!
//! ## Available Repositories
//!
//! - [`medicine::MedicineRepository`] - Catalogue lookup and stock receipt
//! - [`bill::BillRepository`] - Bill and line item reads
//! - [`audit::AuditRepository`] - Forensic audit trail reads
//! - [`stock`] - FEFO deduction ledger and restoration engine

pub mod audit;
pub mod bill;
pub mod medicine;
pub mod stock;
