//! End-to-end tests for the bill transaction engine.
//!
//! Every test runs against an isolated in-memory database and checks the
//! system's core promises: the sum-of-batches invariant holds at every
//! committed state, stock effects reverse exactly on edit/delete, FEFO picks
//! the soonest-expiring batch first, shortfalls warn instead of failing, and
//! daily bill numbers never repeat.

use chrono::{Duration, Utc};

use medibill_core::{
    Actor, AuditAction, BillSnapshot, NewLineItem, PaymentMode, Role, ValidationError,
    MAX_LINE_ITEMS,
};
use medibill_db::repository::medicine::{NewBatch, NewMedicine};
use medibill_db::repository::stock;
use medibill_db::{
    BillingError, BillingService, CreateBillRequest, Database, DbConfig, EditBillRequest,
};

// =============================================================================
// Helpers
// =============================================================================

async fn setup() -> (Database, BillingService) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    // Fixed small prescription charge keeps expected totals readable
    let billing = BillingService::new(db.clone()).with_prescription_charge(1500);
    (db, billing)
}

fn cashier() -> Actor {
    Actor::new("cashier-1", Role::Cashier)
}

fn admin() -> Actor {
    Actor::new("admin-1", Role::Admin)
}

/// Seeds one medicine with batches given as (days_until_expiry, quantity).
/// Returns (medicine_id, batch_ids in argument order).
async fn seed_medicine(db: &Database, name: &str, batches: &[(i64, i64)]) -> (String, Vec<String>) {
    let medicines = db.medicines();
    let medicine = medicines
        .insert(NewMedicine {
            name: name.to_string(),
            category: "Test".to_string(),
            default_price_cents: 1000,
            reorder_level: 5,
        })
        .await
        .unwrap();

    let today = Utc::now().date_naive();
    let mut batch_ids = Vec::new();
    for (index, (offset_days, quantity)) in batches.iter().enumerate() {
        let batch = medicines
            .receive_stock(
                &medicine.id,
                NewBatch {
                    batch_number: format!("LOT-{index}"),
                    manufacture_date: None,
                    expiry_date: today + Duration::days(*offset_days),
                    quantity_received: *quantity,
                    cost_price_cents: 700,
                },
            )
            .await
            .unwrap();
        batch_ids.push(batch.id);
    }

    (medicine.id, batch_ids)
}

fn tracked_line(medicine_id: &str, name: &str, quantity: i64, cost: i64) -> NewLineItem {
    NewLineItem {
        medicine_name: name.to_string(),
        quantity,
        cost_per_piece_cents: cost,
        medicine_id: Some(medicine_id.to_string()),
    }
}

fn untracked_line(name: &str, quantity: i64, cost: i64) -> NewLineItem {
    NewLineItem {
        medicine_name: name.to_string(),
        quantity,
        cost_per_piece_cents: cost,
        medicine_id: None,
    }
}

fn create_request(items: Vec<NewLineItem>) -> CreateBillRequest {
    CreateBillRequest {
        customer_name: Some("Walk-in".to_string()),
        payment_mode: PaymentMode::Cash,
        has_prescription: false,
        line_items: items,
    }
}

/// The core invariant: the cached counter equals the sum over batches.
async fn assert_stock_invariant(db: &Database, medicine_id: &str) {
    let medicine = db.medicines().get_by_id(medicine_id).await.unwrap().unwrap();
    let batch_sum = db.medicines().batch_stock_sum(medicine_id).await.unwrap();
    assert_eq!(
        medicine.current_stock, batch_sum,
        "current_stock diverged from sum of batch remainders"
    );
}

async fn remaining(db: &Database, batch_id: &str) -> i64 {
    db.medicines()
        .get_batch(batch_id)
        .await
        .unwrap()
        .unwrap()
        .quantity_remaining
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn create_deducts_stock_and_computes_totals() {
    let (db, billing) = setup().await;
    let (medicine_id, batch_ids) = seed_medicine(&db, "Paracetamol 500mg", &[(60, 20)]).await;

    let response = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Paracetamol 500mg", 5, 1000)]),
        )
        .await
        .unwrap();

    assert_eq!(response.grand_total_cents, 5000);
    assert!(response.stock_warnings.is_empty());
    assert_eq!(remaining(&db, &batch_ids[0]).await, 15);

    let medicine = db.medicines().get_by_id(&medicine_id).await.unwrap().unwrap();
    assert_eq!(medicine.current_stock, 15);
    assert_stock_invariant(&db, &medicine_id).await;

    let bill = db.bills().get_by_id(&response.bill_id).await.unwrap().unwrap();
    assert_eq!(bill.bill_number, response.bill_number);
    assert_eq!(bill.medicines_subtotal_cents, 5000);
    assert!(!bill.has_prescription);
    assert_eq!(bill.prescription_charge_cents, 0);

    let items = db.bills().get_line_items(&response.bill_id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].subtotal_cents, 5000);
}

#[tokio::test]
async fn create_with_prescription_adds_fixed_charge() {
    let (db, billing) = setup().await;
    let (medicine_id, _) = seed_medicine(&db, "Amoxicillin 250mg", &[(60, 50)]).await;

    let mut request = create_request(vec![tracked_line(&medicine_id, "Amoxicillin 250mg", 2, 1200)]);
    request.has_prescription = true;

    let response = billing.create_bill(&cashier(), request).await.unwrap();

    // 2 × 1200 + 1500 prescription charge
    assert_eq!(response.grand_total_cents, 3900);

    let bill = db.bills().get_by_id(&response.bill_id).await.unwrap().unwrap();
    assert!(bill.has_prescription);
    assert_eq!(bill.prescription_charge_cents, 1500);
}

#[tokio::test]
async fn fefo_takes_soonest_expiring_batch_first() {
    let (db, billing) = setup().await;
    // B1 expires in 5 days with 3 left; B2 in 10 days with 10 left
    let (medicine_id, batch_ids) =
        seed_medicine(&db, "Ibuprofen 400mg", &[(5, 3), (10, 10)]).await;

    let response = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Ibuprofen 400mg", 5, 400)]),
        )
        .await
        .unwrap();

    // B1 drained first, remainder from B2
    assert_eq!(remaining(&db, &batch_ids[0]).await, 0);
    assert_eq!(remaining(&db, &batch_ids[1]).await, 8);

    let items = db.bills().get_line_items(&response.bill_id).await.unwrap();
    let facts = stock::deductions_for_line_item(db.pool(), &items[0].id)
        .await
        .unwrap();
    assert_eq!(facts.len(), 2);
    let take = |batch: &str| {
        facts
            .iter()
            .find(|f| f.batch_id == batch)
            .map(|f| f.quantity)
            .unwrap()
    };
    assert_eq!(take(&batch_ids[0]), 3);
    assert_eq!(take(&batch_ids[1]), 2);

    assert_stock_invariant(&db, &medicine_id).await;
}

#[tokio::test]
async fn insufficient_stock_warns_and_sale_proceeds() {
    let (db, billing) = setup().await;
    // 4 sellable units; the expired batch's 50 must never be selected
    let (medicine_id, batch_ids) =
        seed_medicine(&db, "Cetirizine 10mg", &[(30, 4), (-1, 50)]).await;

    let response = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Cetirizine 10mg", 10, 300)]),
        )
        .await
        .unwrap();

    // Billed for the requested quantity; stock ledger took what existed
    assert_eq!(response.grand_total_cents, 3000);
    assert_eq!(response.stock_warnings, vec!["Cetirizine 10mg".to_string()]);
    assert_eq!(remaining(&db, &batch_ids[0]).await, 0);
    assert_eq!(remaining(&db, &batch_ids[1]).await, 50);

    let medicine = db.medicines().get_by_id(&medicine_id).await.unwrap().unwrap();
    assert_eq!(medicine.current_stock, 50);
    assert_stock_invariant(&db, &medicine_id).await;
}

#[tokio::test]
async fn expired_only_stock_deducts_nothing() {
    let (db, billing) = setup().await;
    let (medicine_id, batch_ids) = seed_medicine(&db, "Omeprazole 20mg", &[(-10, 30)]).await;

    let response = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Omeprazole 20mg", 2, 900)]),
        )
        .await
        .unwrap();

    assert_eq!(response.stock_warnings.len(), 1);
    assert_eq!(remaining(&db, &batch_ids[0]).await, 30);
    assert_stock_invariant(&db, &medicine_id).await;
}

#[tokio::test]
async fn untracked_line_item_touches_no_stock() {
    let (db, billing) = setup().await;
    let (medicine_id, batch_ids) = seed_medicine(&db, "Metformin 500mg", &[(90, 25)]).await;

    let response = billing
        .create_bill(
            &cashier(),
            create_request(vec![untracked_line("Bandage roll", 3, 150)]),
        )
        .await
        .unwrap();

    assert!(response.stock_warnings.is_empty());
    assert_eq!(response.grand_total_cents, 450);
    assert_eq!(remaining(&db, &batch_ids[0]).await, 25);
    assert_stock_invariant(&db, &medicine_id).await;
}

#[tokio::test]
async fn create_rejects_invalid_requests_without_side_effects() {
    let (db, billing) = setup().await;

    let err = billing
        .create_bill(&cashier(), create_request(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));

    let err = billing
        .create_bill(
            &cashier(),
            create_request(vec![untracked_line("Syrup", 0, 100)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));

    let err = billing
        .create_bill(
            &cashier(),
            create_request(vec![untracked_line("Syrup", 1, -5)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));

    // Nothing was written
    let bills: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(bills, 0);
}

#[tokio::test]
async fn create_rejects_bills_over_the_line_item_cap() {
    let (db, billing) = setup().await;

    let items: Vec<NewLineItem> = (0..=MAX_LINE_ITEMS)
        .map(|i| untracked_line(&format!("Item {i}"), 1, 100))
        .collect();
    assert_eq!(items.len(), MAX_LINE_ITEMS + 1);

    let err = billing
        .create_bill(&cashier(), create_request(items))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BillingError::Validation(ValidationError::TooManyLineItems { .. })
    ));

    let bills: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(bills, 0);
}

#[tokio::test]
async fn overlong_notes_are_rejected_before_any_write() {
    let (db, billing) = setup().await;
    let (medicine_id, batch_ids) = seed_medicine(&db, "Cetirizine 10mg", &[(60, 10)]).await;

    let created = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Cetirizine 10mg", 2, 300)]),
        )
        .await
        .unwrap();

    let long_notes = "x".repeat(501);

    let err = billing
        .edit_bill(
            &admin(),
            &created.bill_id,
            EditBillRequest {
                payment_mode: Some(PaymentMode::Card),
                notes: Some(long_notes.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BillingError::Validation(ValidationError::TooLong { .. })
    ));

    let err = billing
        .delete_bill(&admin(), &created.bill_id, Some(long_notes))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BillingError::Validation(ValidationError::TooLong { .. })
    ));

    // Both rejections left the bill and its stock untouched
    let bill = db.bills().get_by_id(&created.bill_id).await.unwrap().unwrap();
    assert!(!bill.is_deleted);
    assert_eq!(bill.payment_mode, PaymentMode::Cash);
    assert_eq!(remaining(&db, &batch_ids[0]).await, 8);
    let entries = db.audit().list_for_bill(&created.bill_id).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn create_fails_for_unknown_medicine() {
    let (db, billing) = setup().await;

    let err = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line("no-such-id", "Ghost", 1, 100)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Db(_)));

    // The aborted transaction left nothing behind
    let bills: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(bills, 0);
}

// =============================================================================
// Delete (soft)
// =============================================================================

#[tokio::test]
async fn delete_restores_stock_exactly() {
    let (db, billing) = setup().await;
    let (medicine_id, batch_ids) = seed_medicine(&db, "Amlodipine 5mg", &[(60, 20)]).await;

    let created = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Amlodipine 5mg", 5, 750)]),
        )
        .await
        .unwrap();
    assert_eq!(remaining(&db, &batch_ids[0]).await, 15);

    let deleted = billing
        .delete_bill(&admin(), &created.bill_id, Some("voided sale".to_string()))
        .await
        .unwrap();
    assert_eq!(deleted.bill_number, created.bill_number);

    // Exact round trip back to pre-creation state
    assert_eq!(remaining(&db, &batch_ids[0]).await, 20);
    let medicine = db.medicines().get_by_id(&medicine_id).await.unwrap().unwrap();
    assert_eq!(medicine.current_stock, 20);
    assert_stock_invariant(&db, &medicine_id).await;

    // Soft delete: bill and children retained for history
    let bill = db.bills().get_by_id(&created.bill_id).await.unwrap().unwrap();
    assert!(bill.is_deleted);
    let items = db.bills().get_line_items(&created.bill_id).await.unwrap();
    assert_eq!(items.len(), 1);

    // Deduction facts were consumed: a hypothetical second restore is a no-op
    let facts = stock::deductions_for_line_item(db.pool(), &items[0].id)
        .await
        .unwrap();
    assert!(facts.is_empty());
}

#[tokio::test]
async fn delete_twice_is_rejected() {
    let (db, billing) = setup().await;
    let (medicine_id, batch_ids) = seed_medicine(&db, "Azithromycin 500mg", &[(60, 10)]).await;

    let created = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Azithromycin 500mg", 2, 2500)]),
        )
        .await
        .unwrap();

    billing
        .delete_bill(&admin(), &created.bill_id, None)
        .await
        .unwrap();

    let err = billing
        .delete_bill(&admin(), &created.bill_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::AlreadyDeleted(_)));

    // Rejected second delete must not double-credit stock
    assert_eq!(remaining(&db, &batch_ids[0]).await, 10);
    assert_stock_invariant(&db, &medicine_id).await;
}

#[tokio::test]
async fn delete_missing_bill_is_not_found() {
    let (_db, billing) = setup().await;

    let err = billing
        .delete_bill(&admin(), "no-such-bill", None)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::BillNotFound(_)));
}

// =============================================================================
// Edit
// =============================================================================

#[tokio::test]
async fn scalar_edit_leaves_stock_untouched() {
    let (db, billing) = setup().await;
    let (medicine_id, batch_ids) = seed_medicine(&db, "Paracetamol 500mg", &[(60, 20)]).await;

    let created = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Paracetamol 500mg", 5, 250)]),
        )
        .await
        .unwrap();

    let edited = billing
        .edit_bill(
            &admin(),
            &created.bill_id,
            EditBillRequest {
                payment_mode: Some(PaymentMode::Card),
                notes: Some("customer switched to card".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.bill_number, created.bill_number);
    assert!(edited.stock_warnings.is_empty());

    // Stock and totals unchanged, only the scalar field moved
    assert_eq!(remaining(&db, &batch_ids[0]).await, 15);
    assert_stock_invariant(&db, &medicine_id).await;

    let bill = db.bills().get_by_id(&created.bill_id).await.unwrap().unwrap();
    assert_eq!(bill.payment_mode, PaymentMode::Card);
    assert_eq!(bill.grand_total_cents, 1250);
}

#[tokio::test]
async fn edit_replaces_line_items_and_reverses_old_deductions() {
    let (db, billing) = setup().await;
    let (medicine_id, batch_ids) = seed_medicine(&db, "Ibuprofen 400mg", &[(60, 20)]).await;

    let created = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Ibuprofen 400mg", 5, 400)]),
        )
        .await
        .unwrap();
    let old_items = db.bills().get_line_items(&created.bill_id).await.unwrap();
    assert_eq!(remaining(&db, &batch_ids[0]).await, 15);

    billing
        .edit_bill(
            &admin(),
            &created.bill_id,
            EditBillRequest {
                line_items: Some(vec![tracked_line(&medicine_id, "Ibuprofen 400mg", 2, 400)]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Old deduction of 5 reversed, new deduction of 2 applied
    assert_eq!(remaining(&db, &batch_ids[0]).await, 18);
    assert_stock_invariant(&db, &medicine_id).await;

    let bill = db.bills().get_by_id(&created.bill_id).await.unwrap().unwrap();
    assert_eq!(bill.medicines_subtotal_cents, 800);
    assert_eq!(bill.grand_total_cents, 800);

    // Replacement is delete-all-then-recreate
    let new_items = db.bills().get_line_items(&created.bill_id).await.unwrap();
    assert_eq!(new_items.len(), 1);
    assert_ne!(new_items[0].id, old_items[0].id);

    // Old facts consumed during restoration
    let old_facts = stock::deductions_for_line_item(db.pool(), &old_items[0].id)
        .await
        .unwrap();
    assert!(old_facts.is_empty());
    let new_facts = stock::deductions_for_line_item(db.pool(), &new_items[0].id)
        .await
        .unwrap();
    assert_eq!(new_facts.len(), 1);
    assert_eq!(new_facts[0].quantity, 2);
}

#[tokio::test]
async fn edit_handles_medicine_in_both_old_and_new_sets() {
    let (db, billing) = setup().await;
    let (medicine_id, batch_ids) = seed_medicine(&db, "Metformin 500mg", &[(60, 10)]).await;

    // Take 8 of 10, then edit up to 9: restore-before-deduct must free the
    // 8 first or the new deduction would come up short
    let created = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Metformin 500mg", 8, 600)]),
        )
        .await
        .unwrap();
    assert_eq!(remaining(&db, &batch_ids[0]).await, 2);

    let edited = billing
        .edit_bill(
            &admin(),
            &created.bill_id,
            EditBillRequest {
                line_items: Some(vec![tracked_line(&medicine_id, "Metformin 500mg", 9, 600)]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(edited.stock_warnings.is_empty());
    assert_eq!(remaining(&db, &batch_ids[0]).await, 1);
    assert_stock_invariant(&db, &medicine_id).await;
}

#[tokio::test]
async fn edit_toggling_prescription_recomputes_totals() {
    let (db, billing) = setup().await;
    let (medicine_id, _) = seed_medicine(&db, "Cetirizine 10mg", &[(60, 30)]).await;

    let created = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Cetirizine 10mg", 3, 300)]),
        )
        .await
        .unwrap();
    assert_eq!(created.grand_total_cents, 900);

    billing
        .edit_bill(
            &admin(),
            &created.bill_id,
            EditBillRequest {
                has_prescription: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let bill = db.bills().get_by_id(&created.bill_id).await.unwrap().unwrap();
    assert!(bill.has_prescription);
    assert_eq!(bill.prescription_charge_cents, 1500);
    assert_eq!(bill.grand_total_cents, 2400);
}

#[tokio::test]
async fn edit_of_missing_or_deleted_bill_is_not_found() {
    let (db, billing) = setup().await;
    let (medicine_id, _) = seed_medicine(&db, "Omeprazole 20mg", &[(60, 10)]).await;

    let err = billing
        .edit_bill(&admin(), "no-such-bill", EditBillRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::BillNotFound(_)));

    let created = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Omeprazole 20mg", 1, 900)]),
        )
        .await
        .unwrap();
    billing
        .delete_bill(&admin(), &created.bill_id, None)
        .await
        .unwrap();

    let err = billing
        .edit_bill(&admin(), &created.bill_id, EditBillRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::BillNotFound(_)));
}

#[tokio::test]
async fn edit_and_delete_require_elevated_role() {
    let (db, billing) = setup().await;
    let (medicine_id, batch_ids) = seed_medicine(&db, "Amlodipine 5mg", &[(60, 10)]).await;

    let created = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Amlodipine 5mg", 2, 750)]),
        )
        .await
        .unwrap();

    let err = billing
        .edit_bill(&cashier(), &created.bill_id, EditBillRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::PermissionDenied { .. }));

    let err = billing
        .delete_bill(&cashier(), &created.bill_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::PermissionDenied { .. }));

    // Denied calls had no effect
    assert_eq!(remaining(&db, &batch_ids[0]).await, 8);
    let bill = db.bills().get_by_id(&created.bill_id).await.unwrap().unwrap();
    assert!(!bill.is_deleted);
}

// =============================================================================
// Audit Trail
// =============================================================================

#[tokio::test]
async fn audit_snapshot_reconstructs_pre_mutation_state() {
    let (db, billing) = setup().await;
    let (medicine_id, _) = seed_medicine(&db, "Paracetamol 500mg", &[(60, 20)]).await;

    let created = billing
        .create_bill(
            &cashier(),
            create_request(vec![tracked_line(&medicine_id, "Paracetamol 500mg", 5, 250)]),
        )
        .await
        .unwrap();

    billing
        .edit_bill(
            &admin(),
            &created.bill_id,
            EditBillRequest {
                line_items: Some(vec![untracked_line("Cough syrup", 1, 500)]),
                notes: Some("wrong item keyed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    billing
        .delete_bill(&admin(), &created.bill_id, None)
        .await
        .unwrap();

    let entries = db.audit().list_for_bill(&created.bill_id).await.unwrap();
    assert_eq!(entries.len(), 2);

    // The EDIT snapshot holds the original line items and totals
    let edit_entry = &entries[0];
    assert_eq!(edit_entry.performed_by, "admin-1");
    assert_eq!(edit_entry.notes.as_deref(), Some("wrong item keyed"));
    let snapshot: BillSnapshot = serde_json::from_str(&edit_entry.previous_state).unwrap();
    assert_eq!(snapshot.bill.grand_total_cents, 1250);
    assert_eq!(snapshot.line_items.len(), 1);
    assert_eq!(snapshot.line_items[0].medicine_name, "Paracetamol 500mg");
    assert_eq!(snapshot.line_items[0].quantity, 5);

    // The DELETE snapshot holds the post-edit state
    let delete_entry = &entries[1];
    let snapshot: BillSnapshot = serde_json::from_str(&delete_entry.previous_state).unwrap();
    assert_eq!(snapshot.line_items[0].medicine_name, "Cough syrup");
    assert!(!snapshot.bill.is_deleted);

    // Per-action listings pick out the same entries
    let edits = db.audit().list_by_action(AuditAction::Edit).await.unwrap();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].bill_id, created.bill_id);
    let deletes = db.audit().list_by_action(AuditAction::Delete).await.unwrap();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].id, delete_entry.id);
}

// =============================================================================
// Sequence Allocation
// =============================================================================

#[tokio::test]
async fn bill_numbers_are_sequential_within_a_day() {
    let (_db, billing) = setup().await;
    let today = Utc::now().date_naive().format("%Y%m%d").to_string();

    for expected_seq in 1..=3 {
        let response = billing
            .create_bill(
                &cashier(),
                create_request(vec![untracked_line("Gauze", 1, 100)]),
            )
            .await
            .unwrap();
        assert_eq!(
            response.bill_number,
            format!("{today}-{expected_seq:04}")
        );
    }
}

#[tokio::test]
async fn soft_delete_forces_retry_but_never_reuses_a_number() {
    let (_db, billing) = setup().await;

    let first = billing
        .create_bill(
            &cashier(),
            create_request(vec![untracked_line("Gauze", 1, 100)]),
        )
        .await
        .unwrap();
    assert!(first.bill_number.ends_with("-0001"));

    // The deleted bill leaves the day's count but keeps its number, so the
    // next creation first proposes -0001 again and must retry past the
    // UNIQUE conflict
    billing
        .delete_bill(&admin(), &first.bill_id, None)
        .await
        .unwrap();

    let second = billing
        .create_bill(
            &cashier(),
            create_request(vec![untracked_line("Gauze", 1, 100)]),
        )
        .await
        .unwrap();
    assert!(second.bill_number.ends_with("-0002"));
    assert_ne!(first.bill_number, second.bill_number);
}

#[tokio::test]
async fn concurrent_creates_get_distinct_numbers() {
    let (_db, billing) = setup().await;

    let mut handles = Vec::new();
    for worker in 0..8 {
        let billing = billing.clone();
        handles.push(tokio::spawn(async move {
            let actor = Actor::new(format!("cashier-{worker}"), Role::Cashier);
            billing
                .create_bill(
                    &actor,
                    create_request(vec![untracked_line("Gauze", 1, 100)]),
                )
                .await
                .unwrap()
                .bill_number
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap());
    }

    let mut deduped = numbers.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), numbers.len(), "duplicate bill numbers issued");
}
