//! # Seed Data Generator
//!
//! Populates a database with development data: one account with branches,
//! warehouses, products and opening stock booked through the engine so
//! the ledger, movements and snapshots all line up.
//!
//! ## Usage
//! ```bash
//! # Generate 100 products (default)
//! cargo run -p stockbook-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p stockbook-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p stockbook-db --bin seed -- --db ./data/stockbook.db
//! ```

use std::env;

use chrono::Utc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use stockbook_core::{
    Branch, Product, ProductVariant, Quantity, StockReference, StockTrigger, Warehouse,
    WarehouseKind,
};
use stockbook_db::{
    Database, DbConfig, DeductionRequest, ReceiptRequest, StockContext, WarehouseSelector,
};

/// Product families for realistic test data.
const FAMILIES: &[(&str, &[&str])] = &[
    (
        "FAB",
        &[
            "Navy Wool", "Grey Flannel", "Black Twill", "White Poplin", "Herringbone",
            "Pinstripe", "Linen Sand", "Linen Sage", "Denim 12oz", "Corduroy Rust",
        ],
    ),
    (
        "NTN",
        &[
            "Horn Buttons", "Shell Buttons", "Brass Zips", "Nylon Zips", "Lining Satin",
            "Canvas Interfacing", "Shoulder Pads", "Thread Black", "Thread Ecru", "Elastic 20mm",
        ],
    ),
    (
        "GRM",
        &[
            "Blazer Classic", "Trouser Slim", "Waistcoat", "Overcoat", "Shirt Oxford",
            "Shirt Stretch", "Skirt Pencil", "Dress Shift", "Chino Stone", "Jacket Quilted",
        ],
    ),
];

/// Variant names applied to garment products.
const SIZES: &[&str] = &["S", "M", "L", "XL"];

const ACCOUNT_ID: &str = "seed-account";
const ACTOR_ID: &str = "seed-user";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 100;
    let mut db_path = String::from("./stockbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(100);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 100)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockbook Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count(ACCOUNT_ID).await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let ctx = StockContext::new(ACCOUNT_ID, ACTOR_ID);

    // Branches and warehouses: a main warehouse plus one per branch.
    let branches = ["High Street", "Mall"];
    let mut branch_ids = Vec::new();

    let main_warehouse = Warehouse {
        id: Uuid::new_v4().to_string(),
        account_id: ACCOUNT_ID.to_string(),
        name: "Central".to_string(),
        kind: WarehouseKind::Main,
        is_active: true,
        created_at: Utc::now(),
    };
    db.warehouses().insert(&main_warehouse).await?;

    for name in branches {
        let branch = Branch {
            id: Uuid::new_v4().to_string(),
            account_id: ACCOUNT_ID.to_string(),
            name: name.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        db.warehouses().insert_branch(&branch).await?;

        let warehouse = Warehouse {
            id: Uuid::new_v4().to_string(),
            account_id: ACCOUNT_ID.to_string(),
            name: format!("{} backroom", name),
            kind: WarehouseKind::Branch,
            is_active: true,
            created_at: Utc::now(),
        };
        db.warehouses().insert(&warehouse).await?;
        db.warehouses()
            .grant_access(&branch.id, &warehouse.id, true)
            .await?;

        branch_ids.push(branch.id);
    }
    println!("✓ Created {} branches + {} warehouses", branches.len(), branches.len() + 1);

    // Products with opening stock booked through the engine.
    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (family_idx, (family_code, names)) in FAMILIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let seed = family_idx * 100 + name_idx;
            let product = generate_product(family_code, name, seed);
            db.products().insert(&product).await?;

            // Garments come in sizes; fabrics and notions don't.
            if *family_code == "GRM" {
                for size in SIZES {
                    let variant = ProductVariant {
                        id: Uuid::new_v4().to_string(),
                        account_id: ACCOUNT_ID.to_string(),
                        product_id: product.id.clone(),
                        name: size.to_string(),
                        is_active: true,
                        created_at: Utc::now(),
                    };
                    db.products().insert_variant(&variant).await?;
                }
            }

            let opening = Quantity::from_units(((seed * 13) % 60 + 5) as i64);
            db.engine()
                .receive(
                    &ctx,
                    ReceiptRequest {
                        product_id: product.id.clone(),
                        variant_id: None,
                        warehouse: WarehouseSelector::Warehouse {
                            warehouse_id: main_warehouse.id.clone(),
                        },
                        quantity: opening,
                        unit_cost: product.unit_cost(),
                        reference: StockReference::GoodsReceipt {
                            receipt_id: format!("GR-SEED-{:04}", seed),
                        },
                        notes: None,
                    },
                )
                .await?;

            generated += 1;
            if generated % 25 == 0 {
                println!("  Generated {} products...", generated);
            }
        }
    }

    // A handful of sales so the ledger shows outbound flow too.
    let branch_id = &branch_ids[0];
    let mut sold = 0;
    for (idx, (family_code, _)) in FAMILIES.iter().enumerate() {
        let product = db
            .products()
            .get_by_sku(ACCOUNT_ID, &format!("{}-{:03}", family_code, idx * 100))
            .await?;
        if let Some(product) = product {
            let outcome = db
                .engine()
                .deduct(
                    &ctx,
                    DeductionRequest {
                        product_id: product.id,
                        variant_id: None,
                        warehouse: WarehouseSelector::Branch {
                            branch_id: branch_id.clone(),
                        },
                        quantity: Quantity::from_units(2),
                        unit_cost: None,
                        reference: StockReference::Sale {
                            sale_id: format!("SALE-SEED-{}", idx),
                        },
                        trigger: StockTrigger::Creation,
                        notes: None,
                    },
                )
                .await?;
            if outcome.is_some() {
                sold += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!("✓ Booked {} seed sales", sold);
    println!(
        "  Ledger entries: {}",
        db.ledger().count(ACCOUNT_ID).await?
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Log to stderr; RUST_LOG overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockbook=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Generates a single product with deterministic pseudo-random data.
fn generate_product(family: &str, name: &str, seed: usize) -> Product {
    let now = Utc::now();

    // Unit cost: 4.00 - 36.00 depending on seed
    let unit_cost_cents = 400 + ((seed * 17) % 3200) as i64;

    Product {
        id: Uuid::new_v4().to_string(),
        account_id: ACCOUNT_ID.to_string(),
        sku: format!("{}-{:03}", family, seed),
        name: name.to_string(),
        unit_cost_cents: Some(unit_cost_cents),
        track_inventory: true,
        // Every seventh product may oversell, to exercise alerts.
        allow_negative_stock: seed % 7 == 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
