//! The request → bid → accept lifecycle.
//!
//! A customer shops a [`MedicineRequest`] to a set of pharmacies. Each
//! solicited pharmacy may quote once while the request is pending, or
//! decline. The customer then accepts exactly one quote: that bill and the
//! request become `accepted` and every other open quote is rejected.
//!
//! Each operation runs in a single write transaction, so concurrent writers
//! are serialized. Acceptance also uses conditional updates so two accepts
//! on the same request cannot both win.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::billing::{price_quote, QuoteLine};
use crate::db::models::{
    Bill, BillStatus, MedicineRequest, RequestStatus, RequestWithBills, RequestedMedicine,
    SelectedPharmacy,
};
use crate::db::{self, queries};
use crate::error::{ApiError, ApiResult};
use crate::utils::{lenient_number, non_blank, whole_quantity};

const NOT_AVAILABLE: &str = "Bill is not available for acceptance";
const ALREADY_QUOTED: &str = "Bill already generated for this request";

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestedMedicineInput {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub strength: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub quantity: Option<f64>,
}

/// A solicited pharmacy, either as a bare id (older clients, names sent in
/// the parallel `pharmacyNames` list) or as an id/name pair.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PharmacyChoice {
    Id(String),
    Snapshot {
        #[serde(rename = "pharmacyId")]
        pharmacy_id: String,
        #[serde(rename = "pharmacyName", default)]
        pharmacy_name: Option<String>,
    },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
    #[serde(default)]
    pub medicines: Vec<RequestedMedicineInput>,
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    #[serde(default)]
    pub selected_pharmacies: Vec<PharmacyChoice>,
    #[serde(default)]
    pub pharmacy_names: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BidInput {
    #[serde(default)]
    pub medicines: Vec<QuoteLine>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub delivery_charges: Option<f64>,
    pub delivery_time: Option<String>,
}

fn required<'a>(value: Option<&'a str>, field: &str) -> ApiResult<&'a str> {
    non_blank(value).ok_or_else(|| ApiError::validation(format!("{field} is required")))
}

fn requested_medicines(input: &[RequestedMedicineInput]) -> ApiResult<Vec<RequestedMedicine>> {
    if input.is_empty() {
        return Err(ApiError::validation("At least one medicine is required"));
    }

    input
        .iter()
        .map(|m| {
            let name = required(m.name.as_deref(), "Medicine name")?;
            let quantity = whole_quantity(m.quantity).ok_or_else(|| {
                ApiError::validation(format!("Invalid quantity for medicine: {name}"))
            })?;
            Ok(RequestedMedicine {
                name: name.to_string(),
                kind: m.kind.as_deref().unwrap_or_default().trim().to_string(),
                strength: m.strength.as_deref().unwrap_or_default().trim().to_string(),
                quantity,
            })
        })
        .collect()
}

/// Resolves both input shapes into id/name pairs, keeping the first
/// occurrence of a repeated id.
fn selected_pharmacies(
    choices: &[PharmacyChoice],
    legacy_names: &[String],
) -> ApiResult<Vec<SelectedPharmacy>> {
    let mut selected: Vec<SelectedPharmacy> = Vec::with_capacity(choices.len());

    for (position, choice) in choices.iter().enumerate() {
        let (id, name) = match choice {
            PharmacyChoice::Id(id) => (id.as_str(), legacy_names.get(position).map(String::as_str)),
            PharmacyChoice::Snapshot {
                pharmacy_id,
                pharmacy_name,
            } => (pharmacy_id.as_str(), pharmacy_name.as_deref()),
        };

        let Some(id) = non_blank(Some(id)) else {
            return Err(ApiError::validation("Invalid pharmacy selection"));
        };
        if selected.iter().any(|p| p.pharmacy_id == id) {
            continue;
        }

        selected.push(SelectedPharmacy {
            pharmacy_id: id.to_string(),
            pharmacy_name: name.unwrap_or_default().trim().to_string(),
        });
    }

    if selected.is_empty() {
        return Err(ApiError::validation("Select at least one pharmacy"));
    }

    Ok(selected)
}

/// Creates a pending request. `customer_id` is `None` for guest checkout.
///
/// Selected pharmacy ids are stored as given; they are not checked against
/// the pharmacy directory.
pub async fn create_request(
    pool: &SqlitePool,
    customer_id: Option<&str>,
    input: &NewRequest,
) -> ApiResult<MedicineRequest> {
    let medicines = requested_medicines(&input.medicines)?;
    let address = required(input.address.as_deref(), "Address")?;
    let phone = required(input.phone.as_deref(), "Phone")?;
    let city = required(input.city.as_deref(), "City")?;
    let selected = selected_pharmacies(&input.selected_pharmacies, &input.pharmacy_names)?;
    let customer_name = non_blank(input.customer_name.as_deref()).unwrap_or_default();

    let request_id = Uuid::new_v4().to_string();
    let mut tx = db::begin_write(pool).await?;

    sqlx::query(
        "INSERT INTO requests (id, customer_id, customer_name, address, phone, city, status, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(&request_id)
    .bind(customer_id)
    .bind(customer_name)
    .bind(address)
    .bind(phone)
    .bind(city)
    .bind(RequestStatus::Pending)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    for (position, medicine) in medicines.iter().enumerate() {
        sqlx::query(
            "INSERT INTO request_medicines (request_id, position, name, kind, strength, quantity) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&request_id)
        .bind(position as i64)
        .bind(&medicine.name)
        .bind(&medicine.kind)
        .bind(&medicine.strength)
        .bind(medicine.quantity)
        .execute(&mut *tx)
        .await?;
    }

    for (position, pharmacy) in selected.iter().enumerate() {
        sqlx::query(
            "INSERT INTO request_pharmacies (request_id, position, pharmacy_id, pharmacy_name) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&request_id)
        .bind(position as i64)
        .bind(&pharmacy.pharmacy_id)
        .bind(&pharmacy.pharmacy_name)
        .execute(&mut *tx)
        .await?;
    }

    let request = load_request(&mut tx, &request_id).await?;
    tx.commit().await?;

    log::info!(
        "Request {} created for {} with {} pharmacies",
        request.id,
        customer_id.unwrap_or("guest"),
        request.selected_pharmacies.len()
    );
    Ok(request)
}

async fn load_request(conn: &mut SqliteConnection, request_id: &str) -> ApiResult<MedicineRequest> {
    queries::fetch_request(conn, request_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Request not found"))
}

async fn load_bill(conn: &mut SqliteConnection, bill_id: &str) -> ApiResult<Bill> {
    queries::fetch_bill(conn, bill_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bill not found"))
}

/// A pharmacy quotes on a pending request it was solicited for.
///
/// The request stays `pending` so other pharmacies can still quote.
pub async fn submit_bid(
    pool: &SqlitePool,
    pharmacy_id: &str,
    request_id: &str,
    input: &BidInput,
) -> ApiResult<(Bill, RequestWithBills)> {
    let mut tx = db::begin_write(pool).await?;

    let request = load_request(&mut tx, request_id).await?;
    if request.status != RequestStatus::Pending {
        return Err(ApiError::validation("Request is not pending"));
    }
    if !request.is_solicited(pharmacy_id) {
        return Err(ApiError::forbidden(
            "Your pharmacy was not selected for this request",
        ));
    }
    if queries::bill_exists_for(&mut tx, request_id, pharmacy_id).await? {
        return Err(ApiError::validation(ALREADY_QUOTED));
    }

    let quote = price_quote(&input.medicines, input.delivery_charges)?;
    let delivery_time = required(input.delivery_time.as_deref(), "Delivery time")?;

    let bill_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO bills (id, request_id, pharmacy_id, customer_id, subtotal, delivery_charges, \
                            total_amount, delivery_time, status, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(&bill_id)
    .bind(request_id)
    .bind(pharmacy_id)
    .bind(request.customer.as_deref())
    .bind(quote.subtotal)
    .bind(quote.delivery_charges)
    .bind(quote.total_amount)
    .bind(delivery_time)
    .bind(BillStatus::Generated)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref err) if err.is_unique_violation() => {
            ApiError::validation(ALREADY_QUOTED)
        }
        other => ApiError::from(other),
    })?;

    for (position, line) in quote.medicines.iter().enumerate() {
        sqlx::query(
            "INSERT INTO bill_medicines (bill_id, position, name, kind, strength, quantity, \
                                         price_per_unit, total_price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&bill_id)
        .bind(position as i64)
        .bind(&line.name)
        .bind(&line.kind)
        .bind(&line.strength)
        .bind(line.quantity)
        .bind(line.price_per_unit)
        .bind(line.total_price)
        .execute(&mut *tx)
        .await?;
    }

    let bill = load_bill(&mut tx, &bill_id).await?;
    let bills = queries::fetch_bills_for_request(&mut tx, request_id).await?;
    tx.commit().await?;

    log::info!(
        "Pharmacy {} quoted {:.2} on request {}",
        pharmacy_id,
        bill.total_amount,
        request_id
    );
    Ok((bill, RequestWithBills { request, bills }))
}

/// A pharmacy declines to quote. The request keeps its status; the decline
/// is only listed on the request for the customer to see.
pub async fn decline_request(
    pool: &SqlitePool,
    pharmacy_id: &str,
    request_id: &str,
) -> ApiResult<()> {
    let mut tx = db::begin_write(pool).await?;

    let request = load_request(&mut tx, request_id).await?;
    let Some(selected) = request
        .selected_pharmacies
        .iter()
        .find(|p| p.pharmacy_id == pharmacy_id)
    else {
        return Err(ApiError::forbidden(
            "Your pharmacy was not selected for this request",
        ));
    };

    sqlx::query(
        "INSERT OR IGNORE INTO request_declines (request_id, pharmacy_id, pharmacy_name, declined_at) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(request_id)
    .bind(pharmacy_id)
    .bind(&selected.pharmacy_name)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    log::info!("Pharmacy {} declined request {}", pharmacy_id, request_id);
    Ok(())
}

/// The customer picks the winning bill for one of their requests.
pub async fn accept_bill(
    pool: &SqlitePool,
    customer_id: &str,
    bill_id: &str,
) -> ApiResult<(Bill, MedicineRequest)> {
    let mut tx = db::begin_write(pool).await?;

    let bill = load_bill(&mut tx, bill_id).await?;
    let request = load_request(&mut tx, &bill.request).await?;

    if request.customer.as_deref() != Some(customer_id) {
        return Err(ApiError::forbidden(
            "You are not allowed to accept this bill",
        ));
    }
    if !bill.status.is_open() {
        return Err(ApiError::validation(NOT_AVAILABLE));
    }

    let accepted = sqlx::query("UPDATE bills SET status = $1 WHERE id = $2 AND status IN ($3, $4)")
        .bind(BillStatus::Accepted)
        .bind(bill_id)
        .bind(BillStatus::Generated)
        .bind(BillStatus::Pending)
        .execute(&mut *tx)
        .await?;
    if accepted.rows_affected() == 0 {
        return Err(ApiError::validation(NOT_AVAILABLE));
    }

    // Losing this race means another bill already won; dropping `tx` rolls
    // back the bill update above.
    let claimed = sqlx::query(
        "UPDATE requests SET status = $1, accepted_by = $2, bill_id = $3 \
         WHERE id = $4 AND status = $5",
    )
    .bind(RequestStatus::Accepted)
    .bind(&bill.pharmacy)
    .bind(bill_id)
    .bind(&request.id)
    .bind(RequestStatus::Pending)
    .execute(&mut *tx)
    .await?;
    if claimed.rows_affected() == 0 {
        return Err(ApiError::validation(NOT_AVAILABLE));
    }

    let rejected = sqlx::query(
        "UPDATE bills SET status = $1 WHERE request_id = $2 AND id <> $3 AND status IN ($4, $5)",
    )
    .bind(BillStatus::Rejected)
    .bind(&request.id)
    .bind(bill_id)
    .bind(BillStatus::Generated)
    .bind(BillStatus::Pending)
    .execute(&mut *tx)
    .await?;

    let bill = load_bill(&mut tx, bill_id).await?;
    let request = load_request(&mut tx, &request.id).await?;
    tx.commit().await?;

    log::info!(
        "Customer {} accepted bill {} from pharmacy {} on request {} ({} competing bills rejected)",
        customer_id,
        bill.id,
        bill.pharmacy,
        request.id,
        rejected.rows_affected()
    );
    Ok((bill, request))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_ids_pick_up_parallel_names() {
        let choices = vec![
            PharmacyChoice::Id("p1".into()),
            PharmacyChoice::Id("p2".into()),
        ];
        let names = vec!["Care Pharmacy".to_string()];
        let selected = selected_pharmacies(&choices, &names).unwrap();
        assert_eq!(selected[0].pharmacy_name, "Care Pharmacy");
        assert_eq!(selected[1].pharmacy_name, "");
    }

    #[test]
    fn duplicate_pharmacies_collapse() {
        let choices = vec![
            PharmacyChoice::Snapshot {
                pharmacy_id: "p1".into(),
                pharmacy_name: Some("First".into()),
            },
            PharmacyChoice::Id("p1".into()),
        ];
        let selected = selected_pharmacies(&choices, &[]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].pharmacy_name, "First");
    }

    #[test]
    fn both_shapes_deserialize() {
        let input: NewRequest = serde_json::from_value(serde_json::json!({
            "selectedPharmacies": ["p1", { "pharmacyId": "p2", "pharmacyName": "Two" }]
        }))
        .unwrap();
        assert_eq!(input.selected_pharmacies[0], PharmacyChoice::Id("p1".into()));
        assert_eq!(
            input.selected_pharmacies[1],
            PharmacyChoice::Snapshot {
                pharmacy_id: "p2".into(),
                pharmacy_name: Some("Two".into())
            }
        );
    }

    #[test]
    fn requires_a_pharmacy() {
        let err = selected_pharmacies(&[], &[]).unwrap_err();
        assert_eq!(err.to_string(), "Select at least one pharmacy");
    }

    #[test]
    fn quantities_must_be_whole_and_positive() {
        let medicine = |q: f64| RequestedMedicineInput {
            name: Some("Panadol".into()),
            quantity: Some(q),
            ..Default::default()
        };
        assert!(requested_medicines(&[medicine(2.0)]).is_ok());
        assert!(requested_medicines(&[medicine(0.0)]).is_err());
        assert!(requested_medicines(&[medicine(1.5)]).is_err());
        assert!(requested_medicines(&[]).is_err());

        let err = requested_medicines(&[medicine(1e30)]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid quantity for medicine: Panadol");
    }
}
