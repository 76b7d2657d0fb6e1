use pos_admin_api::{
    config::AppConfig,
    db::{DbPool, create_pool, run_migrations},
    models::Role,
    services::identity_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", "Admin Toko", Role::Admin).await?;
    let kasir_id = ensure_user(&pool, "kasir@example.com", "kasir123", "Kasir Satu", Role::Kasir).await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Kasir ID: {kasir_id}");
    Ok(())
}

/// Create the identity account and its profile row; existing ones keep their
/// password and get the role reset.
async fn ensure_user(
    pool: &DbPool,
    email: &str,
    password: &str,
    full_name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    sqlx::query(
        r#"
        INSERT INTO auth_accounts (id, email, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .execute(pool)
    .await?;

    let (account_id,): (Uuid,) = sqlx::query_as("SELECT id FROM auth_accounts WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, auth_user_id, email, full_name, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (auth_user_id) DO UPDATE SET role = EXCLUDED.role, updated_at = now()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(account_id)
    .bind(email)
    .bind(full_name)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_category(pool: &DbPool, name: &str) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let (id,): (Uuid,) =
        sqlx::query_as("INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id")
            .bind(Uuid::new_v4())
            .bind(name)
            .fetch_one(pool)
            .await?;
    Ok(id)
}

async fn seed_catalog(pool: &DbPool) -> anyhow::Result<()> {
    let drinks = ensure_category(pool, "Minuman").await?;
    let snacks = ensure_category(pool, "Makanan Ringan").await?;

    let products = vec![
        ("Kopi Susu", 18_000_i64, 9_000_i64, 40, Some(drinks)),
        ("Teh Manis", 8_000, 3_000, 60, Some(drinks)),
        ("Keripik Singkong", 12_000, 7_000, 25, Some(snacks)),
        ("Roti Bakar", 15_000, 8_000, 8, Some(snacks)),
        ("Air Mineral", 5_000, 2_500, 100, None),
    ];

    for (name, price, purchase_price, stock, category_id) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, purchase_price, stock, category_id)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(price)
        .bind(purchase_price)
        .bind(stock)
        .bind(category_id)
        .execute(pool)
        .await?;
    }

    println!("Seeded catalog");
    Ok(())
}
