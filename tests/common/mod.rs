#![allow(dead_code)]

use std::path::PathBuf;
use std::str::FromStr;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

use pharmabid::auth::{Role, TokenService};
use pharmabid::{db, router, AppState};

pub const SECRET: &str = "test-secret";

pub struct TestApp {
    pub router: Router,
    pub tokens: TokenService,
    pub pool: SqlitePool,
    db_file: Option<PathBuf>,
}

fn app_over(pool: SqlitePool, db_file: Option<PathBuf>) -> TestApp {
    let state = AppState::new(pool.clone(), TokenService::new(SECRET, Duration::hours(24)));
    TestApp {
        router: router(state),
        tokens: TokenService::new(SECRET, Duration::hours(24)),
        pool,
        db_file,
    }
}

/// A router over a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    // One connection keeps the in-memory database alive and shared.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(Option::<std::time::Duration>::None)
        .max_lifetime(Option::<std::time::Duration>::None)
        .connect_with(options)
        .await
        .unwrap();
    db::ensure_schema(&pool).await.unwrap();

    app_over(pool, None)
}

/// A router over a temporary database file opened the way the server opens
/// it, with several connections so requests can really run side by side.
pub async fn spawn_file_app() -> TestApp {
    let path = std::env::temp_dir().join(format!("pharmabid-test-{}.db", Uuid::new_v4()));
    let pool = db::init_db(&format!("sqlite://{}", path.display()), 8)
        .await
        .unwrap();

    app_over(pool, Some(path))
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(path) = &self.db_file {
            for suffix in ["", "-wal", "-shm"] {
                let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
            }
        }
    }
}

impl TestApp {
    pub fn customer_token(&self, id: &str) -> String {
        self.tokens.issue(id, Role::Customer).unwrap()
    }

    pub fn pharmacy_token(&self, id: &str) -> String {
        self.tokens.issue(id, Role::Pharmacy).unwrap()
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, None).await
    }

    /// Creates a request for Panadol ×10 and Augmentin ×2 shopped to
    /// `pharmacies`, returning its id.
    pub async fn create_request(&self, token: Option<&str>, pharmacies: &[&str]) -> String {
        let selected: Vec<Value> = pharmacies
            .iter()
            .map(|id| json!({ "pharmacyId": id, "pharmacyName": format!("Pharmacy {id}") }))
            .collect();
        let (status, body) = self
            .post(
                "/api/customer/request",
                token,
                json!({
                    "medicines": [
                        { "name": "Panadol", "type": "Tablet", "strength": "500mg", "quantity": 10 },
                        { "name": "Augmentin", "type": "Tablet", "strength": "625mg", "quantity": 2 }
                    ],
                    "customerName": "Ayesha",
                    "address": "House 9, Gulberg III",
                    "phone": "03331234567",
                    "city": "Lahore",
                    "selectedPharmacies": selected
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["request"]["_id"].as_str().unwrap().to_string()
    }

    /// Quotes Panadol at `panadol` per unit and Augmentin at 125, returning
    /// the status and body.
    pub async fn bid(
        &self,
        pharmacy_token: &str,
        request_id: &str,
        panadol: f64,
        delivery: f64,
    ) -> (StatusCode, Value) {
        self.post(
            &format!("/api/pharmacy/accept-request/{request_id}"),
            Some(pharmacy_token),
            json!({
                "medicines": [
                    { "name": "Panadol", "type": "Tablet", "strength": "500mg", "quantity": 10, "pricePerUnit": panadol },
                    { "name": "Augmentin", "type": "Tablet", "strength": "625mg", "quantity": 2, "pricePerUnit": 125 }
                ],
                "deliveryCharges": delivery,
                "deliveryTime": "2 hours"
            }),
        )
        .await
    }
}
