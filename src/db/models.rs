use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Pending,
    Generated,
    Accepted,
    Rejected,
    Completed,
}

impl BillStatus {
    /// Only quotes nobody has decided on yet can win.
    pub fn is_open(self) -> bool {
        matches!(self, BillStatus::Generated | BillStatus::Pending)
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Customer {
    pub id: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Pharmacy {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub pharmacy_name: String,
    pub address: String,
    pub licence: String,
    pub created_at: DateTime<Utc>,
}

/// A medicine as the customer asked for it, before any pricing.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestedMedicine {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub strength: String,
    pub quantity: i64,
}

/// A solicited pharmacy with its name as it was when the request was sent.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectedPharmacy {
    pub pharmacy_id: String,
    pub pharmacy_name: String,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Decline {
    pub pharmacy_id: String,
    pub pharmacy_name: String,
    pub declined_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RequestRow {
    pub id: String,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub address: String,
    pub phone: String,
    pub city: String,
    pub status: RequestStatus,
    pub accepted_by: Option<String>,
    pub bill_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub medicines: Vec<RequestedMedicine>,
    pub customer_name: String,
    pub address: String,
    pub phone: String,
    pub city: String,
    pub customer: Option<String>,
    pub selected_pharmacies: Vec<SelectedPharmacy>,
    pub status: RequestStatus,
    pub accepted_by: Option<String>,
    pub bill: Option<String>,
    pub declined_by: Vec<Decline>,
    pub created_at: DateTime<Utc>,
}

impl MedicineRequest {
    pub fn from_parts(
        row: RequestRow,
        medicines: Vec<RequestedMedicine>,
        selected_pharmacies: Vec<SelectedPharmacy>,
        declined_by: Vec<Decline>,
    ) -> Self {
        Self {
            id: row.id,
            medicines,
            customer_name: row.customer_name,
            address: row.address,
            phone: row.phone,
            city: row.city,
            customer: row.customer_id,
            selected_pharmacies,
            status: row.status,
            accepted_by: row.accepted_by,
            bill: row.bill_id,
            declined_by,
            created_at: row.created_at,
        }
    }

    pub fn is_solicited(&self, pharmacy_id: &str) -> bool {
        self.selected_pharmacies
            .iter()
            .any(|p| p.pharmacy_id == pharmacy_id)
    }
}

/// A priced line on a pharmacy's quote.
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillMedicine {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub strength: String,
    pub quantity: i64,
    pub price_per_unit: f64,
    pub total_price: f64,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct BillRow {
    pub id: String,
    pub request_id: String,
    pub pharmacy_id: String,
    pub customer_id: Option<String>,
    pub subtotal: f64,
    pub delivery_charges: f64,
    pub total_amount: f64,
    pub delivery_time: String,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    #[serde(rename = "_id")]
    pub id: String,
    pub request: String,
    pub pharmacy: String,
    pub customer: Option<String>,
    pub medicines: Vec<BillMedicine>,
    pub subtotal: f64,
    pub delivery_charges: f64,
    pub total_amount: f64,
    pub delivery_time: String,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    pub fn from_parts(row: BillRow, medicines: Vec<BillMedicine>) -> Self {
        Self {
            id: row.id,
            request: row.request_id,
            pharmacy: row.pharmacy_id,
            customer: row.customer_id,
            medicines,
            subtotal: row.subtotal,
            delivery_charges: row.delivery_charges,
            total_amount: row.total_amount,
            delivery_time: row.delivery_time,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// A request as dashboards show it: with every quote submitted against it.
#[derive(Serialize, Debug, Clone)]
pub struct RequestWithBills {
    #[serde(flatten)]
    pub request: MedicineRequest,
    pub bills: Vec<Bill>,
}
