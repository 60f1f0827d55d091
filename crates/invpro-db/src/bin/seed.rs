//! # Seed Data Generator
//!
//! Populates a development database with demo warehouses, items, suppliers
//! and customers.
//!
//! ## Usage
//! ```bash
//! # Default database path
//! cargo run -p invpro-db --bin seed
//!
//! # Specify database path and admin password
//! cargo run -p invpro-db --bin seed -- --db ./data/inventory.db --password secret
//! ```
//!
//! ## Generated Data
//! - 3 warehouses
//! - one item per (product, warehouse) pair with a per-warehouse SKU suffix
//! - a handful of suppliers and customers
//!
//! Prices and stock levels are derived from the item index so runs are
//! reproducible.

use std::env;

use invpro_core::catalog::{NewItem, NewPartner, NewWarehouse};
use invpro_core::PartnerKind;
use invpro_db::{Database, DbConfig};

const ACTOR: &str = "seed";

const WAREHOUSES: &[(&str, &str)] = &[
    ("Main Store", "Cairo"),
    ("North Depot", "Alexandria"),
    ("Showroom", "Giza"),
];

/// (SKU prefix, name, buy price in cents)
const PRODUCTS: &[(&str, &str, i64)] = &[
    ("CBL", "HDMI Cable 2m", 450),
    ("CBL", "USB-C Cable 1m", 300),
    ("KBD", "Wired Keyboard", 1_800),
    ("KBD", "Wireless Keyboard", 3_200),
    ("MSE", "Optical Mouse", 900),
    ("MSE", "Wireless Mouse", 1_500),
    ("MON", "24in Monitor", 22_000),
    ("MON", "27in Monitor", 31_000),
    ("SSD", "SSD 512GB", 8_500),
    ("SSD", "SSD 1TB", 14_000),
    ("RAM", "DDR4 16GB", 7_000),
    ("PSU", "Power Supply 650W", 9_500),
];

const SUPPLIERS: &[(&str, &str)] = &[
    ("Acme Components", "+20 2 555 0101"),
    ("Delta Distribution", "+20 3 555 0199"),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Walk-in Customer", ""),
    ("Nile Office Supplies", "+20 2 555 0142"),
    ("Pyramid Schools", "+20 2 555 0177"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./inventory_dev.db");
    let mut password = String::from("admin");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--password" | "-p" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Inventory Pro Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>          Database file path (default: ./inventory_dev.db)");
                println!("  -p, --password <PASS>    Admin password on first run (default: admin)");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Inventory Pro Seed Data Generator");
    println!("====================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.bootstrap(&password).await? {
        println!("✓ Created admin account");
    }

    let existing = db.items().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut warehouse_ids = Vec::with_capacity(WAREHOUSES.len());
    for (name, location) in WAREHOUSES {
        let warehouse = db
            .warehouses()
            .create(
                &NewWarehouse {
                    location: Some(location.to_string()),
                    ..NewWarehouse::new(*name)
                },
                ACTOR,
            )
            .await?;
        warehouse_ids.push(warehouse.id);
    }
    println!("✓ Created {} warehouses", warehouse_ids.len());

    let mut generated = 0;
    for (index, (prefix, name, buy)) in PRODUCTS.iter().enumerate() {
        for (slot, warehouse_id) in warehouse_ids.iter().enumerate() {
            let seed = index * WAREHOUSES.len() + slot;
            let item = generate_item(prefix, name, *buy, *warehouse_id, index, seed);

            if let Err(e) = db.items().create(&item, ACTOR).await {
                eprintln!("Failed to insert {}: {}", item.sku, e);
                continue;
            }
            generated += 1;
        }
    }
    println!("✓ Created {} items", generated);

    for (name, phone) in SUPPLIERS {
        db.partners()
            .create(PartnerKind::Supplier, &partner(name, phone), ACTOR)
            .await?;
    }
    for (name, phone) in CUSTOMERS {
        db.partners()
            .create(PartnerKind::Customer, &partner(name, phone), ACTOR)
            .await?;
    }
    println!("✓ Created {} suppliers, {} customers", SUPPLIERS.len(), CUSTOMERS.len());

    let low = db.items().low_stock_count().await?;
    println!();
    println!("  Low-stock items: {}", low);
    println!("✓ Seed complete in {:?}", start.elapsed());

    Ok(())
}

/// Builds one demo item. The same product shares its SKU across warehouses.
fn generate_item(
    prefix: &str,
    name: &str,
    buy_price_cents: i64,
    warehouse_id: i64,
    index: usize,
    seed: usize,
) -> NewItem {
    // 25-45% markup
    let markup = 25 + (seed * 7 % 21) as i64;
    let sell_price_cents = buy_price_cents + buy_price_cents * markup / 100;

    NewItem {
        quantity: (seed * 13 % 60) as i64,
        min_quantity: 5 + (seed % 4) as i64 * 5,
        buy_price_cents,
        sell_price_cents,
        warehouse_id: Some(warehouse_id),
        ..NewItem::new(name, format!("{}-{:03}", prefix, index + 1))
    }
}

fn partner(name: &str, phone: &str) -> NewPartner {
    NewPartner {
        phone: (!phone.is_empty()).then(|| phone.to_string()),
        ..NewPartner::new(name)
    }
}
