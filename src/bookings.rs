//! Booking and favorite domain records for the protected surface.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::storage::StoredRecord;

/// Client payload for a new booking; the server stamps the caller on it.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingPayload {
    pub listing_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub note: Option<String>,
}

impl BookingPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.end_date <= self.start_date {
            return Err(ApiError::validation("invalid_dates", "booking end date must be after the start date"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub listing_id: String,
    pub user_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub note: Option<String>,
}

impl Booking {
    pub fn from_payload(payload: BookingPayload, user_id: impl Into<String>) -> Self {
        Self {
            listing_id: payload.listing_id,
            user_id: user_id.into(),
            start_date: payload.start_date,
            end_date: payload.end_date,
            note: payload.note,
        }
    }

    pub fn to_body(&self) -> serde_json::Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: String,
    pub listing_id: String,
}

impl Favorite {
    pub fn to_body(&self) -> serde_json::Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// Field accessor used when scanning generic records for ownership.
pub fn record_user_id(rec: &StoredRecord) -> Option<&str> {
    rec.body.get("user_id").and_then(|v| v.as_str())
}

pub fn record_listing_id(rec: &StoredRecord) -> Option<&str> {
    rec.body.get("listing_id").and_then(|v| v.as_str())
}
