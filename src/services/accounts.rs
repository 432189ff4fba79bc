//! Customer and pharmacy accounts, and the pharmacy directory.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{Role, TokenService};
use crate::db::models::{Customer, Pharmacy};
use crate::error::{ApiError, ApiResult};
use crate::utils::{
    contains_pattern, is_strong_password, is_valid_email, is_valid_phone, non_blank,
};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSignup {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PharmacySignup {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub pharmacy_name: Option<String>,
    pub address: Option<String>,
    pub licence: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CustomerView {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub phone: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyView {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub phone: String,
    pub pharmacy_name: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct LoginResponse<U> {
    pub token: String,
    pub user: U,
}

const INVALID_CREDENTIALS: &str = "Invalid credentials";

struct ContactDetails {
    email: String,
    phone: String,
    password: String,
}

/// Shared email/phone/password checks for both signups.
fn contact_details(
    email: Option<&str>,
    phone: Option<&str>,
    password: Option<&str>,
) -> ApiResult<ContactDetails> {
    let email = email.map(|e| e.trim().to_lowercase()).unwrap_or_default();
    if !is_valid_email(&email) {
        return Err(ApiError::validation("Invalid email format"));
    }
    let phone = phone.map(str::trim).unwrap_or_default();
    if !is_valid_phone(phone) {
        return Err(ApiError::validation("Invalid phone format"));
    }
    let password = password.unwrap_or_default();
    if !is_strong_password(password) {
        return Err(ApiError::validation("Password too weak"));
    }

    Ok(ContactDetails {
        email,
        phone: phone.to_string(),
        password: password.to_string(),
    })
}

const EMAIL_TAKEN: &str = "Email already exists";

/// A concurrent signup can pass the pre-check and still lose on the unique
/// email index.
fn email_taken(err: sqlx::Error) -> ApiError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            ApiError::validation(EMAIL_TAKEN)
        }
        other => ApiError::from(other),
    }
}

fn normalized_email(email: Option<&str>) -> String {
    email.map(|e| e.trim().to_lowercase()).unwrap_or_default()
}

pub async fn signup_customer(pool: &SqlitePool, input: &CustomerSignup) -> ApiResult<()> {
    let details = contact_details(
        input.email.as_deref(),
        input.phone.as_deref(),
        input.password.as_deref(),
    )?;

    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM customers WHERE email = $1")
        .bind(&details.email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::validation(EMAIL_TAKEN));
    }

    let password_hash = hash_password(details.password).await?;
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO customers (id, email, phone, password_hash, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&id)
    .bind(&details.email)
    .bind(&details.phone)
    .bind(&password_hash)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(email_taken)?;

    log::info!("Customer {} signed up", id);
    Ok(())
}

pub async fn signup_pharmacy(pool: &SqlitePool, input: &PharmacySignup) -> ApiResult<()> {
    let details = contact_details(
        input.email.as_deref(),
        input.phone.as_deref(),
        input.password.as_deref(),
    )?;

    let (Some(pharmacy_name), Some(address), Some(licence)) = (
        non_blank(input.pharmacy_name.as_deref()),
        non_blank(input.address.as_deref()),
        non_blank(input.licence.as_deref()),
    ) else {
        return Err(ApiError::validation("All fields are required"));
    };

    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM pharmacies WHERE email = $1")
        .bind(&details.email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::validation(EMAIL_TAKEN));
    }

    let password_hash = hash_password(details.password).await?;
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO pharmacies (id, email, phone, password_hash, pharmacy_name, address, licence, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(&id)
    .bind(&details.email)
    .bind(&details.phone)
    .bind(&password_hash)
    .bind(pharmacy_name)
    .bind(address)
    .bind(licence)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(email_taken)?;

    log::info!("Pharmacy {} ({}) signed up", id, pharmacy_name);
    Ok(())
}

pub async fn login_customer(
    pool: &SqlitePool,
    tokens: &TokenService,
    input: &Credentials,
) -> ApiResult<LoginResponse<CustomerView>> {
    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, email, phone, password_hash, created_at FROM customers WHERE email = $1",
    )
    .bind(normalized_email(input.email.as_deref()))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::validation(INVALID_CREDENTIALS))?;

    let password = input.password.clone().unwrap_or_default();
    if !verify_password(password, customer.password_hash.clone()).await? {
        return Err(ApiError::validation(INVALID_CREDENTIALS));
    }

    let token = tokens.issue(&customer.id, Role::Customer)?;
    Ok(LoginResponse {
        token,
        user: CustomerView {
            id: customer.id,
            email: customer.email,
            phone: customer.phone,
        },
    })
}

pub async fn login_pharmacy(
    pool: &SqlitePool,
    tokens: &TokenService,
    input: &Credentials,
) -> ApiResult<LoginResponse<PharmacyView>> {
    let pharmacy = sqlx::query_as::<_, Pharmacy>(
        "SELECT id, email, phone, password_hash, pharmacy_name, address, licence, created_at \
         FROM pharmacies WHERE email = $1",
    )
    .bind(normalized_email(input.email.as_deref()))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::validation(INVALID_CREDENTIALS))?;

    let password = input.password.clone().unwrap_or_default();
    if !verify_password(password, pharmacy.password_hash.clone()).await? {
        return Err(ApiError::validation(INVALID_CREDENTIALS));
    }

    let token = tokens.issue(&pharmacy.id, Role::Pharmacy)?;
    Ok(LoginResponse {
        token,
        user: PharmacyView {
            id: pharmacy.id,
            email: pharmacy.email,
            phone: pharmacy.phone,
            pharmacy_name: pharmacy.pharmacy_name,
        },
    })
}

/// Pharmacies whose free-text address mentions `city`, ignoring case.
///
/// This is a substring match on the address, so a city name that appears in
/// a street name matches too.
pub async fn list_pharmacies(pool: &SqlitePool, city: Option<&str>) -> ApiResult<Vec<Pharmacy>> {
    const COLUMNS: &str =
        "SELECT id, email, phone, password_hash, pharmacy_name, address, licence, created_at FROM pharmacies";

    let pharmacies = match non_blank(city) {
        Some(city) => {
            sqlx::query_as::<_, Pharmacy>(&format!(
                "{COLUMNS} WHERE LOWER(address) LIKE LOWER($1) ESCAPE '\\' ORDER BY pharmacy_name"
            ))
            .bind(contains_pattern(city))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Pharmacy>(&format!("{COLUMNS} ORDER BY pharmacy_name"))
                .fetch_all(pool)
                .await?
        }
    };

    Ok(pharmacies)
}
