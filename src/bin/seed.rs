use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use storefront_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_admin(&pool, "admin@example.com", "admin123").await?;
    let customer_id = ensure_customer(&pool, "customer@example.com", "customer123").await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {customer_id}");
    Ok(())
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();
    Ok(hash)
}

async fn ensure_admin(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO admins (id, name, email, password_hash)
        VALUES ($1, 'Store Admin', $2, $3)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?;

    let admin_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM admins WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured admin {email}");
    Ok(admin_id)
}

async fn ensure_customer(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO customers (id, name, email, password_hash)
        VALUES ($1, 'Demo Customer', $2, $3)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?;

    let customer_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM customers WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    // A customer always has exactly one cart.
    sqlx::query(
        "INSERT INTO carts (id, customer_id) VALUES ($1, $2) ON CONFLICT (customer_id) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(customer_id)
    .execute(pool)
    .await?;

    println!("Ensured customer {email}");
    Ok(customer_id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let categories = [
        "Queue Management",
        "RFID Tracking",
        "Digital Signage",
        "Access Control",
    ];

    let mut category_ids = Vec::with_capacity(categories.len());
    for name in categories {
        sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(name)
            .execute(pool)
            .await?;
        let id: (Uuid,) = sqlx::query_as("SELECT id FROM categories WHERE name = $1")
            .bind(name)
            .fetch_one(pool)
            .await?;
        category_ids.push(id.0);
    }

    let products = [
        ("Smart Queue System", "Virtual queue management for busy branches", 150.0, 25, 0),
        ("Queue Analytics Dashboard", "Wait time and throughput reporting", 250.0, 40, 0),
        ("Queue Mobile App", "Remote ticketing from the customer's phone", 120.0, 100, 0),
        ("RFID Asset Tracker", "Room level asset location tracking", 200.0, 60, 1),
        ("RFID Inventory Manager", "Bulk stock counting with handheld readers", 180.0, 35, 1),
        ("Digital Signage Pro", "4K display player with remote scheduling", 300.0, 20, 2),
        ("Interactive Signage Touch", "Touch screen wayfinding and promotions", 350.0, 15, 2),
        ("Biometric Access Control", "Fingerprint and badge door controller", 400.0, 10, 3),
    ];

    for (name, desc, price, stock, category_idx) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock, category_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .bind(category_ids[category_idx as usize])
        .execute(pool)
        .await?;
    }

    println!("Seeded catalog");
    Ok(())
}
