//! # medibill-db: Database Layer for MediBill
//!
//! SQLite storage and the atomic bill transaction engine.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MediBill Data Flow                               │
//! │                                                                         │
//! │  Consumer (UI command / API handler) with a resolved Actor             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     medibill-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │ BillingService│──►│  Repositories  │   │  Migrations  │   │   │
//! │  │   │ (service.rs)  │   │ bill/stock/... │   │  (embedded)  │   │   │
//! │  │   │               │   │                │   │              │   │   │
//! │  │   │ create_bill   │   │ FEFO deduct    │   │ 001_init.sql │   │   │
//! │  │   │ edit_bill     │   │ restore        │   │              │   │   │
//! │  │   │ delete_bill   │   │ audit insert   │   │              │   │   │
//! │  │   └───────┬───────┘   └────────┬───────┘   └──────────────┘   │   │
//! │  │           │    one transaction │                               │   │
//! │  │           ▼                    ▼                               │   │
//! │  │   ┌─────────────────────────────────────┐                     │   │
//! │  │   │      SqlitePool (pool.rs, WAL)      │                     │   │
//! │  │   └─────────────────────────────────────┘                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories and transaction-scoped stock/bill helpers
//! - [`service`] - The bill transaction coordinator (the exposed contract)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medibill_core::{Actor, Role};
//! use medibill_db::{BillingService, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("medibill.db")).await?;
//! let billing = BillingService::new(db);
//!
//! let cashier = Actor::new("user-7", Role::Cashier);
//! let created = billing.create_bill(&cashier, request).await?;
//! println!("{} -> {:?}", created.bill_number, created.stock_warnings);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use service::{
    BillingError, BillingResult, BillingService, CreateBillRequest, CreateBillResponse,
    DeleteBillResponse, EditBillRequest, EditBillResponse,
};

// Repository re-exports for convenience
pub use repository::audit::AuditRepository;
pub use repository::bill::BillRepository;
pub use repository::medicine::MedicineRepository;
pub use repository::stock::DeductionOutcome;
