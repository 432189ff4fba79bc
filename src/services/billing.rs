//! Pricing of a pharmacy's quote.
//!
//! Every line is priced as `pricePerUnit × quantity`, the subtotal is the sum
//! of line totals and the total adds the delivery charge. Computed amounts
//! are rounded to cents; the quoted unit price is kept as given.

use serde::Deserialize;

use crate::db::models::BillMedicine;
use crate::error::{ApiError, ApiResult};
use crate::utils::{lenient_number, non_blank, round_money, whole_quantity};

/// One quoted line as the pharmacy dashboard submits it.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub strength: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price_per_unit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub medicines: Vec<BillMedicine>,
    pub subtotal: f64,
    pub delivery_charges: f64,
    pub total_amount: f64,
}

/// Prices the quoted lines and adds delivery.
///
/// A missing or unreadable delivery charge counts as zero; a negative one is
/// rejected.
pub fn price_quote(lines: &[QuoteLine], delivery_charges: Option<f64>) -> ApiResult<Quote> {
    if lines.is_empty() {
        return Err(ApiError::validation("At least one medicine is required"));
    }

    let medicines = lines.iter().map(price_line).collect::<ApiResult<Vec<_>>>()?;

    let delivery_charges = round_money(delivery_charges.unwrap_or(0.0));
    if delivery_charges < 0.0 {
        return Err(ApiError::validation("Delivery charges cannot be negative"));
    }

    let subtotal = round_money(medicines.iter().map(|m| m.total_price).sum());
    let total_amount = round_money(subtotal + delivery_charges);

    Ok(Quote {
        medicines,
        subtotal,
        delivery_charges,
        total_amount,
    })
}

fn price_line(line: &QuoteLine) -> ApiResult<BillMedicine> {
    let name = non_blank(line.name.as_deref())
        .ok_or_else(|| ApiError::validation("Medicine name is required"))?;

    let quantity = whole_quantity(line.quantity).ok_or_else(|| {
        ApiError::validation(format!("Invalid quantity for medicine: {name}"))
    })?;

    // The unit price is stored as quoted; only computed amounts are rounded.
    let price_per_unit = match line.price_per_unit {
        Some(p) if p > 0.0 => p,
        _ => {
            return Err(ApiError::validation(format!(
                "Invalid price for medicine: {name}"
            )))
        }
    };

    Ok(BillMedicine {
        name: name.to_string(),
        kind: line.kind.as_deref().unwrap_or_default().trim().to_string(),
        strength: line.strength.as_deref().unwrap_or_default().trim().to_string(),
        quantity,
        price_per_unit,
        total_price: round_money(price_per_unit * quantity as f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, quantity: f64, price: f64) -> QuoteLine {
        QuoteLine {
            name: Some(name.to_string()),
            quantity: Some(quantity),
            price_per_unit: Some(price),
            ..Default::default()
        }
    }

    #[test]
    fn totals_add_up() {
        let quote = price_quote(
            &[line("Panadol", 10.0, 25.0), line("Augmentin", 2.0, 125.0)],
            Some(50.0),
        )
        .unwrap();

        assert_eq!(quote.medicines[0].total_price, 250.0);
        assert_eq!(quote.medicines[1].total_price, 250.0);
        assert_eq!(quote.subtotal, 500.0);
        assert_eq!(quote.delivery_charges, 50.0);
        assert_eq!(quote.total_amount, 550.0);
    }

    #[test]
    fn line_total_rounds_the_exact_product() {
        let quote = price_quote(&[line("Brufen", 3.0, 33.333)], None).unwrap();
        assert_eq!(quote.medicines[0].price_per_unit, 33.333);
        assert_eq!(quote.medicines[0].total_price, 100.0);
        assert_eq!(quote.total_amount, 100.0);

        let quote = price_quote(&[line("Panadol", 100.0, 0.125)], None).unwrap();
        assert_eq!(quote.medicines[0].price_per_unit, 0.125);
        assert_eq!(quote.medicines[0].total_price, 12.5);
        assert_eq!(quote.subtotal, 12.5);
    }

    #[test]
    fn sub_cent_prices_are_kept_as_quoted() {
        let quote = price_quote(&[line("Flagyl", 1.0, 0.004)], None).unwrap();
        assert_eq!(quote.medicines[0].price_per_unit, 0.004);
        assert!(quote.medicines[0].price_per_unit > 0.0);
        assert_eq!(quote.medicines[0].total_price, 0.0);
    }

    #[test]
    fn rejects_quantities_beyond_range() {
        let err = price_quote(&[line("Panadol", 1e30, 1.0)], None).unwrap_err();
        assert_eq!(err.to_string(), "Invalid quantity for medicine: Panadol");
    }

    #[test]
    fn missing_delivery_charge_is_free() {
        let quote = price_quote(&[line("Panadol", 1.0, 10.0)], None).unwrap();
        assert_eq!(quote.delivery_charges, 0.0);
        assert_eq!(quote.total_amount, 10.0);
    }

    #[test]
    fn rejects_negative_delivery() {
        let err = price_quote(&[line("Panadol", 1.0, 10.0)], Some(-5.0)).unwrap_err();
        assert_eq!(err.to_string(), "Delivery charges cannot be negative");
    }

    #[test]
    fn rejects_empty_quote() {
        assert!(price_quote(&[], Some(0.0)).is_err());
    }

    #[test]
    fn names_the_offending_medicine() {
        let err = price_quote(&[line("Panadol", 1.0, 10.0), line("Flagyl", 1.0, 0.0)], None)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid price for medicine: Flagyl");

        let err = price_quote(&[line("Flagyl", 0.0, 10.0)], None).unwrap_err();
        assert_eq!(err.to_string(), "Invalid quantity for medicine: Flagyl");

        let err = price_quote(&[line("Flagyl", 1.5, 10.0)], None).unwrap_err();
        assert_eq!(err.to_string(), "Invalid quantity for medicine: Flagyl");
    }

    #[test]
    fn requires_a_name() {
        let err = price_quote(&[line("  ", 1.0, 10.0)], None).unwrap_err();
        assert_eq!(err.to_string(), "Medicine name is required");
    }
}
