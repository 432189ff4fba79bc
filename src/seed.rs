use envconfig::Envconfig;
use sqlx::SqlitePool;

use pharmabid::config::Config;
use pharmabid::db;
use pharmabid::error::ApiError;
use pharmabid::services::accounts::{self, CustomerSignup, PharmacySignup};
use pharmabid::services::lifecycle::{self, NewRequest, PharmacyChoice, RequestedMedicineInput};

/// Every seeded account uses this password.
const SEED_PASSWORD: &str = "Seed@123";

fn seed_pharmacies() -> Vec<PharmacySignup> {
    [
        ("care@pharmabid.test", "03001234567", "Care Pharmacy", "12 Mall Road, Lahore", "LHR-1001"),
        ("shifa@pharmabid.test", "03011234567", "Shifa Medicos", "45 Jail Road, Lahore", "LHR-1002"),
        ("karachi@pharmabid.test", "03021234567", "Clifton Chemists", "7 Clifton Block 5, Karachi", "KHI-2001"),
    ]
    .into_iter()
    .map(|(email, phone, name, address, licence)| PharmacySignup {
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
        password: Some(SEED_PASSWORD.to_string()),
        pharmacy_name: Some(name.to_string()),
        address: Some(address.to_string()),
        licence: Some(licence.to_string()),
    })
    .collect()
}

fn seed_customer() -> CustomerSignup {
    CustomerSignup {
        email: Some("ayesha@pharmabid.test".to_string()),
        phone: Some("03331234567".to_string()),
        password: Some(SEED_PASSWORD.to_string()),
    }
}

fn medicine(name: &str, kind: &str, strength: &str, quantity: f64) -> RequestedMedicineInput {
    RequestedMedicineInput {
        name: Some(name.to_string()),
        kind: Some(kind.to_string()),
        strength: Some(strength.to_string()),
        quantity: Some(quantity),
    }
}

/// Skips accounts that already exist so the seed can be rerun.
fn tolerate_existing(result: Result<(), ApiError>) -> Result<(), ApiError> {
    match result {
        Err(ApiError::Validation(msg)) if msg == "Email already exists" => Ok(()),
        other => other,
    }
}

pub async fn seed_database(pool: &SqlitePool) -> Result<(), ApiError> {
    for pharmacy in seed_pharmacies() {
        tolerate_existing(accounts::signup_pharmacy(pool, &pharmacy).await)?;
    }
    tolerate_existing(accounts::signup_customer(pool, &seed_customer()).await)?;

    let customer_id: String =
        sqlx::query_scalar("SELECT id FROM customers WHERE email = $1")
            .bind("ayesha@pharmabid.test")
            .fetch_one(pool)
            .await?;

    let seeded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM requests WHERE customer_id = $1")
        .bind(&customer_id)
        .fetch_one(pool)
        .await?;
    if seeded > 0 {
        log::info!("Seed request already present, skipping");
        return Ok(());
    }

    let lahore = accounts::list_pharmacies(pool, Some("lahore")).await?;
    let request = NewRequest {
        medicines: vec![
            medicine("Panadol", "Tablet", "500mg", 20.0),
            medicine("Augmentin", "Tablet", "625mg", 14.0),
        ],
        customer_name: Some("Ayesha".to_string()),
        address: Some("House 9, Gulberg III".to_string()),
        phone: Some("03331234567".to_string()),
        city: Some("Lahore".to_string()),
        selected_pharmacies: lahore
            .iter()
            .map(|p| PharmacyChoice::Snapshot {
                pharmacy_id: p.id.clone(),
                pharmacy_name: Some(p.pharmacy_name.clone()),
            })
            .collect(),
        pharmacy_names: Vec::new(),
    };

    let created = lifecycle::create_request(pool, Some(&customer_id), &request).await?;
    log::info!(
        "Seeded request {} shopped to {} pharmacies",
        created.id,
        created.selected_pharmacies.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::init_from_env()?;
    let pool = db::init_db(&config.database_url, config.db_max_connections).await?;
    seed_database(&pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::time::Duration;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    use super::*;

    async fn memory_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(Option::<Duration>::None)
            .max_lifetime(Option::<Duration>::None)
            .connect_with(options)
            .await
            .unwrap();
        db::ensure_schema(&pool).await.unwrap();
        pool
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reseeding_adds_nothing() {
        let pool = memory_pool().await;

        seed_database(&pool).await.unwrap();
        seed_database(&pool).await.unwrap();

        assert_eq!(count(&pool, "pharmacies").await, 3);
        assert_eq!(count(&pool, "customers").await, 1);
        assert_eq!(count(&pool, "requests").await, 1);
        assert_eq!(count(&pool, "request_pharmacies").await, 2);
    }
}
