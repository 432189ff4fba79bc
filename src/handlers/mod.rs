use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::auth::identify;
use crate::db;
use crate::error::{ApiResult, Json};
use crate::state::AppState;

pub mod customer;
pub mod pharmacy;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/customer", customer::routes())
        .nest("/api/pharmacy", pharmacy::routes())
        .layer(middleware::from_fn_with_state(state.clone(), identify))
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    db::ping(&state.db).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    log::info!(
        "{} {} {} {}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}
