//! Strict parsing of submitted clamp form fields
//!
//! Dates must be `YYYY-MM-DD` and times `HH:MM`. Optional time fields
//! submitted empty map to no value rather than an error. Parsing never
//! produces a partially valid form: the first failure aborts the whole
//! submission.

use crate::model::PaymentStatus;
use crate::{CoreError, CoreResult};
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// A fully validated clamp record submission.
///
/// Free-text optional fields keep the submitted value (possibly empty),
/// matching how the store represents them; only times and the amount
/// are genuinely optional.
#[derive(Debug, Clone, PartialEq)]
pub struct ClampForm {
    pub location: String,
    pub registration: String,
    pub clamp_date: NaiveDate,
    pub time_in: NaiveTime,
    pub time_called: Option<NaiveTime>,
    pub time_released: Option<NaiveTime>,
    pub car_type: String,
    pub color: String,
    pub clamp_ref: String,
    pub offense: String,
    pub payment_status: PaymentStatus,
    pub amount_paid: Option<f64>,
}

impl ClampForm {
    pub fn from_fields(fields: &HashMap<String, String>) -> CoreResult<Self> {
        Ok(Self {
            location: required(fields, "location")?,
            registration: optional(fields, "registration"),
            clamp_date: parse_date(&required(fields, "clamp_date")?)?,
            time_in: parse_time(&required(fields, "time_in")?)?,
            time_called: parse_optional_time(fields.get("time_called"))?,
            time_released: parse_optional_time(fields.get("time_released"))?,
            car_type: optional(fields, "car_type"),
            color: optional(fields, "color"),
            clamp_ref: optional(fields, "clamp_ref"),
            offense: required(fields, "offense")?,
            payment_status: PaymentStatus::parse(&required(fields, "payment_status")?)?,
            amount_paid: parse_amount(fields.get("amount_paid")),
        })
    }
}

fn required(fields: &HashMap<String, String>, name: &'static str) -> CoreResult<String> {
    match fields.get(name) {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(CoreError::MissingField(name)),
    }
}

fn optional(fields: &HashMap<String, String>, name: &str) -> String {
    fields.get(name).cloned().unwrap_or_default()
}

pub fn parse_date(value: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| CoreError::InvalidDate(value.to_string()))
}

pub fn parse_time(value: &str) -> CoreResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|_| CoreError::InvalidTime(value.to_string()))
}

/// Absent or empty optional time fields are "no value"; anything else
/// must parse strictly.
pub fn parse_optional_time(value: Option<&String>) -> CoreResult<Option<NaiveTime>> {
    match value {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) => parse_time(v).map(Some),
    }
}

/// Tolerant amount parsing: blank, unparseable, or negative input is
/// ignored and leaves the stored amount untouched.
pub fn parse_amount(value: Option<&String>) -> Option<f64> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_fields() -> HashMap<String, String> {
        let mut f = HashMap::new();
        f.insert("location".into(), "Main St".into());
        f.insert("clamp_date".into(), "2025-11-27".into());
        f.insert("time_in".into(), "12:00".into());
        f.insert("offense".into(), "Blocking driveway".into());
        f.insert("payment_status".into(), "Processing".into());
        f
    }

    #[test]
    fn minimal_valid_form_parses() {
        let form = ClampForm::from_fields(&base_fields()).unwrap();
        assert_eq!(form.location, "Main St");
        assert_eq!(form.clamp_date.to_string(), "2025-11-27");
        assert_eq!(form.time_in.format(TIME_FORMAT).to_string(), "12:00");
        assert_eq!(form.time_called, None);
        assert_eq!(form.amount_paid, None);
        assert_eq!(form.payment_status, PaymentStatus::Processing);
    }

    #[test]
    fn missing_required_field_fails() {
        let mut fields = base_fields();
        fields.remove("offense");
        assert!(matches!(
            ClampForm::from_fields(&fields),
            Err(CoreError::MissingField("offense"))
        ));
    }

    #[test]
    fn malformed_date_fails() {
        let mut fields = base_fields();
        fields.insert("clamp_date".into(), "27/11/2025".into());
        assert!(matches!(
            ClampForm::from_fields(&fields),
            Err(CoreError::InvalidDate(_))
        ));
    }

    #[test]
    fn malformed_time_fails() {
        let mut fields = base_fields();
        fields.insert("time_in".into(), "noonish".into());
        assert!(ClampForm::from_fields(&fields).is_err());
    }

    #[test]
    fn empty_optional_time_is_none() {
        let mut fields = base_fields();
        fields.insert("time_called".into(), "".into());
        fields.insert("time_released".into(), "14:30".into());
        let form = ClampForm::from_fields(&fields).unwrap();
        assert_eq!(form.time_called, None);
        assert!(form.time_released.is_some());
    }

    #[test]
    fn amount_parsing_is_tolerant() {
        assert_eq!(parse_amount(None), None);
        assert_eq!(parse_amount(Some(&String::new())), None);
        assert_eq!(parse_amount(Some(&"abc".to_string())), None);
        assert_eq!(parse_amount(Some(&"-5".to_string())), None);
        assert_eq!(parse_amount(Some(&"120.50".to_string())), Some(120.50));
    }
}
