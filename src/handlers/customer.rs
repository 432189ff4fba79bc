use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Router,
};
use serde_json::{json, Value};

use crate::auth::{session::ensure_slot_free, Identity, Role};
use crate::db::models::{Bill, RequestWithBills};
use crate::error::{ApiResult, Json};
use crate::services::accounts::{self, CustomerSignup, CustomerView, Credentials, LoginResponse};
use crate::services::lifecycle::{self, NewRequest};
use crate::services::views;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/request", post(create_request))
        .route("/requests", get(list_requests))
        .route("/bills", get(list_bills))
        .route("/accept-bill/{bill_id}", post(accept_bill))
}

async fn signup(
    State(state): State<AppState>,
    Json(input): Json<CustomerSignup>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    accounts::signup_customer(&state.db, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Signup successful" })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(input): Json<Credentials>,
) -> ApiResult<Json<LoginResponse<CustomerView>>> {
    ensure_slot_free(&identity, Role::Customer)?;
    let response = accounts::login_customer(&state.db, &state.tokens, &input).await?;
    Ok(Json(response))
}

/// Guests may submit requests; a customer token attributes the request.
async fn create_request(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(input): Json<NewRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let customer_id = identity.optional_customer()?;
    let request = lifecycle::create_request(&state.db, customer_id, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Request created", "request": request })),
    ))
}

async fn list_requests(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<RequestWithBills>>> {
    let customer_id = identity.customer_id()?;
    Ok(Json(views::customer_requests(&state.db, customer_id).await?))
}

async fn list_bills(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<Bill>>> {
    let customer_id = identity.customer_id()?;
    Ok(Json(views::customer_bills(&state.db, customer_id).await?))
}

async fn accept_bill(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(bill_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let customer_id = identity.customer_id()?;
    let (bill, request) = lifecycle::accept_bill(&state.db, customer_id, &bill_id).await?;
    Ok(Json(json!({
        "message": "Bill accepted",
        "bill": bill,
        "request": request,
    })))
}
