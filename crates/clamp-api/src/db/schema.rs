//! Database row types and their JSON projections

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Value};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ClampRow {
    pub id: i64,
    pub location: String,
    pub registration: Option<String>,
    pub clamp_date: NaiveDate,
    pub time_in: NaiveTime,
    pub time_called: Option<NaiveTime>,
    pub time_released: Option<NaiveTime>,
    pub car_type: Option<String>,
    pub color: Option<String>,
    pub clamp_ref: Option<String>,
    pub image_filename: Option<String>,
    pub offense: String,
    pub payment_status: String,
    pub amount_paid: Option<f64>,
    pub created_at: Option<NaiveDateTime>,
}

fn time_hm(time: Option<NaiveTime>) -> Value {
    match time {
        Some(t) => Value::String(t.format("%H:%M").to_string()),
        None => Value::Null,
    }
}

impl ClampRow {
    /// Resolved display URL for the attachment, if any.
    pub fn image_url(&self) -> Option<String> {
        self.image_filename
            .as_deref()
            .filter(|f| !f.is_empty())
            .map(|f| format!("/static/{f}"))
    }

    /// The structured representation served to AJAX callers; computed
    /// from the already-loaded row without another store read.
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "location": self.location,
            "registration": self.registration.clone().unwrap_or_default(),
            "clamp_date": self.clamp_date.format("%Y-%m-%d").to_string(),
            "time_in": time_hm(Some(self.time_in)),
            "time_called": time_hm(self.time_called),
            "time_released": time_hm(self.time_released),
            "car_type": self.car_type.clone().unwrap_or_default(),
            "color": self.color.clone().unwrap_or_default(),
            "clamp_ref": self.clamp_ref.clone().unwrap_or_default(),
            "offense": self.offense,
            "amount_paid": self.amount_paid.unwrap_or(0.0),
            "payment_status": self.payment_status,
            "image_filename": self.image_filename.as_deref().filter(|f| !f.is_empty()),
            "image_url": self.image_url(),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AppealRow {
    pub id: i64,
    pub clamp_id: i64,
    pub appeal_date: NaiveDate,
    pub appeal_reason: String,
    pub appeal_status: String,
    pub notes: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl AppealRow {
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "clamp_id": self.clamp_id,
            "appeal_date": self.appeal_date.format("%Y-%m-%d").to_string(),
            "appeal_reason": self.appeal_reason,
            "appeal_status": self.appeal_status,
            "notes": self.notes.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub force_password_change: bool,
    pub created_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_row() -> ClampRow {
        ClampRow {
            id: 7,
            location: "Main St".into(),
            registration: None,
            clamp_date: NaiveDate::from_ymd_opt(2025, 11, 27).unwrap(),
            time_in: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            time_called: None,
            time_released: NaiveTime::from_hms_opt(14, 30, 0),
            car_type: None,
            color: None,
            clamp_ref: None,
            image_filename: None,
            offense: "Blocking driveway".into(),
            payment_status: "Processing".into(),
            amount_paid: None,
            created_at: None,
        }
    }

    #[test]
    fn json_projection_formats_dates_and_times() {
        let value = sample_row().to_json();
        assert_eq!(value["clamp_date"], "2025-11-27");
        assert_eq!(value["time_in"], "12:00");
        assert_eq!(value["time_called"], Value::Null);
        assert_eq!(value["time_released"], "14:30");
        assert_eq!(value["amount_paid"], 0.0);
        assert_eq!(value["image_filename"], Value::Null);
        assert_eq!(value["image_url"], Value::Null);
    }

    #[test]
    fn image_url_is_relative_to_static_root() {
        let mut row = sample_row();
        row.image_filename = Some("images/uploads/20251127_photo.jpg".into());
        assert_eq!(
            row.image_url().as_deref(),
            Some("/static/images/uploads/20251127_photo.jpg")
        );
    }
}
