//! # Seed Data Generator
//!
//! Populates the database with test medicines and stock batches for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p medibill-db --bin seed
//!
//! # Specify database path
//! cargo run -p medibill-db --bin seed -- --db ./data/medibill.db
//! ```
//!
//! ## Generated Data
//! Each medicine gets three batches with staggered expiries (one already
//! expired) so FEFO selection and the expiry filter are visible immediately
//! in a dev build.

use std::env;

use chrono::{Duration, Utc};

use medibill_db::repository::medicine::{NewBatch, NewMedicine};
use medibill_db::{Database, DbConfig};

/// (name, category, default price in cents, reorder level)
const MEDICINES: &[(&str, &str, i64, i64)] = &[
    ("Paracetamol 500mg", "Analgesic", 250, 50),
    ("Amoxicillin 250mg", "Antibiotic", 1200, 30),
    ("Ibuprofen 400mg", "Analgesic", 400, 40),
    ("Cetirizine 10mg", "Antihistamine", 300, 25),
    ("Omeprazole 20mg", "Antacid", 900, 20),
    ("Metformin 500mg", "Antidiabetic", 600, 60),
    ("Amlodipine 5mg", "Antihypertensive", 750, 30),
    ("Azithromycin 500mg", "Antibiotic", 2500, 15),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut db_path = "./medibill.db".to_string();
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|a| a == "--db") {
        if let Some(path) = args.get(pos + 1) {
            db_path = path.clone();
        }
    }

    println!("Seeding database at {db_path}");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let medicines = db.medicines();
    let today = Utc::now().date_naive();

    for (index, (name, category, price, reorder)) in MEDICINES.iter().enumerate() {
        if medicines.get_by_name(name).await?.is_some() {
            println!("  skipping {name} (already seeded)");
            continue;
        }

        let medicine = medicines
            .insert(NewMedicine {
                name: name.to_string(),
                category: category.to_string(),
                default_price_cents: *price,
                reorder_level: *reorder,
            })
            .await?;

        // Three batches: expired, expiring soon, long-dated
        let batches = [
            (-30i64, 40i64),
            (20, 60),
            (365, 200),
        ];
        for (offset_days, quantity) in batches {
            medicines
                .receive_stock(
                    &medicine.id,
                    NewBatch {
                        batch_number: format!("LOT-{:03}-{}", index + 1, offset_days.abs()),
                        manufacture_date: Some(today - Duration::days(180)),
                        expiry_date: today + Duration::days(offset_days),
                        quantity_received: quantity,
                        cost_price_cents: price * 70 / 100,
                    },
                )
                .await?;
        }

        println!("  seeded {name} with 3 batches");
    }

    db.close().await;
    println!("Done.");

    Ok(())
}
