use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{session::ensure_slot_free, Identity, Role};
use crate::db::models::{Bill, Pharmacy, RequestWithBills};
use crate::error::{ApiResult, Json};
use crate::services::accounts::{self, Credentials, LoginResponse, PharmacySignup, PharmacyView};
use crate::services::lifecycle::{self, BidInput};
use crate::services::views;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/pharmacies", get(directory))
        .route("/requests", get(inbox))
        .route("/accept-request/{request_id}", post(accept_request))
        .route("/reject-request/{request_id}", post(reject_request))
        .route("/bills/{bill_id}", get(bill_detail))
}

#[derive(Deserialize, Debug, Default)]
struct DirectoryQuery {
    city: Option<String>,
}

async fn signup(
    State(state): State<AppState>,
    Json(input): Json<PharmacySignup>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    accounts::signup_pharmacy(&state.db, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Signup successful" })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(input): Json<Credentials>,
) -> ApiResult<Json<LoginResponse<PharmacyView>>> {
    ensure_slot_free(&identity, Role::Pharmacy)?;
    let response = accounts::login_pharmacy(&state.db, &state.tokens, &input).await?;
    Ok(Json(response))
}

async fn directory(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> ApiResult<Json<Vec<Pharmacy>>> {
    let pharmacies = accounts::list_pharmacies(&state.db, query.city.as_deref()).await?;
    Ok(Json(pharmacies))
}

async fn inbox(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<RequestWithBills>>> {
    let pharmacy_id = identity.pharmacy_id()?;
    Ok(Json(views::pharmacy_inbox(&state.db, pharmacy_id).await?))
}

/// Submits this pharmacy's quote on a request.
async fn accept_request(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(request_id): Path<String>,
    Json(input): Json<BidInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let pharmacy_id = identity.pharmacy_id()?;
    let (bill, request) =
        lifecycle::submit_bid(&state.db, pharmacy_id, &request_id, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Bill generated",
            "bill": bill,
            "request": request,
        })),
    ))
}

async fn reject_request(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let pharmacy_id = identity.pharmacy_id()?;
    lifecycle::decline_request(&state.db, pharmacy_id, &request_id).await?;
    Ok(Json(json!({ "message": "Request declined" })))
}

async fn bill_detail(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(bill_id): Path<String>,
) -> ApiResult<Json<Bill>> {
    let pharmacy_id = identity.pharmacy_id()?;
    Ok(Json(views::pharmacy_bill(&state.db, pharmacy_id, &bill_id).await?))
}
