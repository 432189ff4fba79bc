//! Row loaders that reassemble requests and bills from their child tables.
//!
//! All loaders take a plain connection so they can run inside a transaction
//! or on a connection checked out of the pool.

use sqlx::SqliteConnection;

use super::models::{
    Bill, BillMedicine, BillRow, Decline, MedicineRequest, RequestRow, RequestWithBills,
    RequestedMedicine, SelectedPharmacy,
};

const REQUEST_COLUMNS: &str = "id, customer_id, customer_name, address, phone, city, status, \
                               accepted_by, bill_id, created_at";

const BILL_COLUMNS: &str = "id, request_id, pharmacy_id, customer_id, subtotal, delivery_charges, \
                            total_amount, delivery_time, status, created_at";

pub async fn fetch_request(
    conn: &mut SqliteConnection,
    request_id: &str,
) -> Result<Option<MedicineRequest>, sqlx::Error> {
    let row = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = $1"
    ))
    .bind(request_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(Some(hydrate_request(conn, row).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_requests_for_customer(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> Result<Vec<MedicineRequest>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests WHERE customer_id = $1 \
         ORDER BY rowid DESC"
    ))
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;

    hydrate_requests(conn, rows).await
}

pub async fn fetch_requests_for_pharmacy(
    conn: &mut SqliteConnection,
    pharmacy_id: &str,
) -> Result<Vec<MedicineRequest>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests WHERE id IN \
         (SELECT request_id FROM request_pharmacies WHERE pharmacy_id = $1) \
         ORDER BY rowid DESC"
    ))
    .bind(pharmacy_id)
    .fetch_all(&mut *conn)
    .await?;

    hydrate_requests(conn, rows).await
}

async fn hydrate_requests(
    conn: &mut SqliteConnection,
    rows: Vec<RequestRow>,
) -> Result<Vec<MedicineRequest>, sqlx::Error> {
    let mut requests = Vec::with_capacity(rows.len());
    for row in rows {
        requests.push(hydrate_request(conn, row).await?);
    }
    Ok(requests)
}

async fn hydrate_request(
    conn: &mut SqliteConnection,
    row: RequestRow,
) -> Result<MedicineRequest, sqlx::Error> {
    let medicines = sqlx::query_as::<_, RequestedMedicine>(
        "SELECT name, kind, strength, quantity FROM request_medicines \
         WHERE request_id = $1 ORDER BY position",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    let selected = sqlx::query_as::<_, SelectedPharmacy>(
        "SELECT pharmacy_id, pharmacy_name FROM request_pharmacies \
         WHERE request_id = $1 ORDER BY position",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    let declines = sqlx::query_as::<_, Decline>(
        "SELECT pharmacy_id, pharmacy_name, declined_at FROM request_declines \
         WHERE request_id = $1 ORDER BY rowid",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(MedicineRequest::from_parts(row, medicines, selected, declines))
}

pub async fn fetch_bill(
    conn: &mut SqliteConnection,
    bill_id: &str,
) -> Result<Option<Bill>, sqlx::Error> {
    let row = sqlx::query_as::<_, BillRow>(&format!(
        "SELECT {BILL_COLUMNS} FROM bills WHERE id = $1"
    ))
    .bind(bill_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(Some(hydrate_bill(conn, row).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_bills_for_request(
    conn: &mut SqliteConnection,
    request_id: &str,
) -> Result<Vec<Bill>, sqlx::Error> {
    let rows = sqlx::query_as::<_, BillRow>(&format!(
        "SELECT {BILL_COLUMNS} FROM bills WHERE request_id = $1 ORDER BY rowid"
    ))
    .bind(request_id)
    .fetch_all(&mut *conn)
    .await?;

    hydrate_bills(conn, rows).await
}

/// Bills tagged with the customer, plus bills on the customer's requests that
/// predate the tag.
pub async fn fetch_bills_for_customer(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> Result<Vec<Bill>, sqlx::Error> {
    let rows = sqlx::query_as::<_, BillRow>(
        "SELECT b.id, b.request_id, b.pharmacy_id, b.customer_id, b.subtotal, \
                b.delivery_charges, b.total_amount, b.delivery_time, b.status, b.created_at \
         FROM bills b LEFT JOIN requests r ON r.id = b.request_id \
         WHERE b.customer_id = $1 OR r.customer_id = $1 \
         ORDER BY b.rowid DESC",
    )
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;

    hydrate_bills(conn, rows).await
}

pub async fn bill_exists_for(
    conn: &mut SqliteConnection,
    request_id: &str,
    pharmacy_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bills WHERE request_id = $1 AND pharmacy_id = $2)")
        .bind(request_id)
        .bind(pharmacy_id)
        .fetch_one(&mut *conn)
        .await
}

async fn hydrate_bills(
    conn: &mut SqliteConnection,
    rows: Vec<BillRow>,
) -> Result<Vec<Bill>, sqlx::Error> {
    let mut bills = Vec::with_capacity(rows.len());
    for row in rows {
        bills.push(hydrate_bill(conn, row).await?);
    }
    Ok(bills)
}

async fn hydrate_bill(conn: &mut SqliteConnection, row: BillRow) -> Result<Bill, sqlx::Error> {
    let medicines = sqlx::query_as::<_, BillMedicine>(
        "SELECT name, kind, strength, quantity, price_per_unit, total_price FROM bill_medicines \
         WHERE bill_id = $1 ORDER BY position",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Bill::from_parts(row, medicines))
}

/// Attaches every bill on each request.
pub async fn with_bills(
    conn: &mut SqliteConnection,
    requests: Vec<MedicineRequest>,
) -> Result<Vec<RequestWithBills>, sqlx::Error> {
    let mut decorated = Vec::with_capacity(requests.len());
    for request in requests {
        let bills = fetch_bills_for_request(conn, &request.id).await?;
        decorated.push(RequestWithBills { request, bills });
    }
    Ok(decorated)
}
