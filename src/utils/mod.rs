use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Rounds a money amount to two decimal places.
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Reads a number the way browser forms send them: JSON numbers or numeric
/// strings. Anything else, including an empty string, is `None`.
pub fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Serde adapter for [`number_from_value`]; never fails on odd input.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// A count of one or more whole units that fits in an `i64`.
pub fn whole_quantity(value: Option<f64>) -> Option<i64> {
    value
        .filter(|q| *q >= 1.0 && q.fract() == 0.0 && *q < i64::MAX as f64)
        .map(|q| q as i64)
}

/// `%term%` for a `LIKE ... ESCAPE '\'` match on the literal `term`.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Trimmed string or `None` when blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^03[0-9]{9}$").expect("phone pattern is valid"))
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && email_pattern().is_match(email)
}

/// Mobile numbers in the local `03XXXXXXXXX` format.
pub fn is_valid_phone(phone: &str) -> bool {
    phone_pattern().is_match(phone)
}

/// At least six characters with a lowercase letter, an uppercase letter,
/// a digit and a symbol.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 6
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round_money(0.1 + 0.2), 0.3);
        assert_eq!(round_money(12.346), 12.35);
        assert_eq!(round_money(100.0), 100.0);
    }

    #[test]
    fn reads_numbers_from_form_values() {
        assert_eq!(number_from_value(&json!(12.5)), Some(12.5));
        assert_eq!(number_from_value(&json!(" 40 ")), Some(40.0));
        assert_eq!(number_from_value(&json!("")), None);
        assert_eq!(number_from_value(&json!("abc")), None);
        assert_eq!(number_from_value(&json!(null)), None);
        assert_eq!(number_from_value(&json!("NaN")), None);
    }

    #[test]
    fn quantities_are_whole_and_bounded() {
        assert_eq!(whole_quantity(Some(3.0)), Some(3));
        assert_eq!(whole_quantity(Some(0.0)), None);
        assert_eq!(whole_quantity(Some(2.5)), None);
        assert_eq!(whole_quantity(Some(1e30)), None);
        assert_eq!(whole_quantity(Some(i64::MAX as f64)), None);
        assert_eq!(whole_quantity(None), None);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(contains_pattern("lahore"), "%lahore%");
        assert_eq!(contains_pattern("%"), r"%\%%");
        assert_eq!(contains_pattern("a_b\\c"), r"%a\_b\\c%");
    }

    #[test]
    fn validates_email() {
        assert!(is_valid_email("ali@example.com"));
        assert!(!is_valid_email("ali@"));
        assert!(!is_valid_email("ali.example.com"));
        assert!(!is_valid_email("ali@example"));
    }

    #[test]
    fn validates_phone() {
        assert!(is_valid_phone("03001234567"));
        assert!(!is_valid_phone("0300123456"));
        assert!(!is_valid_phone("04001234567"));
        assert!(!is_valid_phone("+923001234567"));
    }

    #[test]
    fn password_strength() {
        assert!(is_strong_password("Abc12!"));
        assert!(!is_strong_password("abc12!"));
        assert!(!is_strong_password("ABC12!"));
        assert!(!is_strong_password("Abcde!"));
        assert!(!is_strong_password("Abc123"));
        assert!(!is_strong_password("Ab1!"));
    }
}
