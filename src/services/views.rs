//! Read-side views for the customer and pharmacy dashboards.

use sqlx::SqlitePool;

use crate::db::models::{Bill, RequestWithBills};
use crate::db::queries;
use crate::error::{ApiError, ApiResult};

/// The customer's own requests, newest first, with every quote received.
pub async fn customer_requests(
    pool: &SqlitePool,
    customer_id: &str,
) -> ApiResult<Vec<RequestWithBills>> {
    let mut conn = pool.acquire().await?;
    let requests = queries::fetch_requests_for_customer(&mut conn, customer_id).await?;
    Ok(queries::with_bills(&mut conn, requests).await?)
}

pub async fn customer_bills(pool: &SqlitePool, customer_id: &str) -> ApiResult<Vec<Bill>> {
    let mut conn = pool.acquire().await?;
    Ok(queries::fetch_bills_for_customer(&mut conn, customer_id).await?)
}

/// Requests the pharmacy was asked to quote on, each with all quotes so far.
pub async fn pharmacy_inbox(
    pool: &SqlitePool,
    pharmacy_id: &str,
) -> ApiResult<Vec<RequestWithBills>> {
    let mut conn = pool.acquire().await?;
    let requests = queries::fetch_requests_for_pharmacy(&mut conn, pharmacy_id).await?;
    Ok(queries::with_bills(&mut conn, requests).await?)
}

pub async fn pharmacy_bill(pool: &SqlitePool, pharmacy_id: &str, bill_id: &str) -> ApiResult<Bill> {
    let mut conn = pool.acquire().await?;
    let bill = queries::fetch_bill(&mut conn, bill_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bill not found"))?;

    if bill.pharmacy != pharmacy_id {
        return Err(ApiError::forbidden("Forbidden"));
    }
    Ok(bill)
}
