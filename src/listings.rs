//! Listing domain model: payload validation, approval states and the public
//! search filter. Listings are persisted as generic records; this module owns
//! what a listing body means.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::storage::StoredRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rent,
    Shortlet,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub listing_type: ListingType,
    /// Whole currency units; zero is not a price.
    pub price: u64,
    pub city: String,
    #[serde(default)]
    pub bedrooms: Option<u8>,
    /// Public URLs from the asset store.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: ListingStatus,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl Listing {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::validation("missing_title", "listing title is required"));
        }
        if self.title.len() > 200 {
            return Err(ApiError::validation("title_too_long", "listing title exceeds 200 characters"));
        }
        if self.price == 0 {
            return Err(ApiError::validation("invalid_price", "listing price must be positive"));
        }
        if self.city.trim().is_empty() {
            return Err(ApiError::validation("missing_city", "listing city is required"));
        }
        Ok(())
    }

    pub fn to_body(&self) -> serde_json::Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// Decode a stored record back into a listing. Records that no longer parse
/// (hand-edited files, older shapes) are skipped by callers rather than
/// failing the whole listing.
pub fn decode(rec: &StoredRecord) -> Option<Listing> {
    serde_json::from_value(Value::Object(rec.body.clone())).ok()
}

/// Public search parameters, straight from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    pub listing_type: Option<ListingType>,
    pub city: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    /// Keyword looked up case-insensitively in title and description.
    pub q: Option<String>,
}

pub fn matches(listing: &Listing, query: &ListingQuery) -> bool {
    if let Some(t) = query.listing_type {
        if listing.listing_type != t { return false; }
    }
    if let Some(city) = &query.city {
        if !listing.city.eq_ignore_ascii_case(city.trim()) { return false; }
    }
    if let Some(min) = query.min_price {
        if listing.price < min { return false; }
    }
    if let Some(max) = query.max_price {
        if listing.price > max { return false; }
    }
    if let Some(q) = &query.q {
        let needle = q.trim().to_lowercase();
        if !needle.is_empty() {
            let haystack = format!("{} {}", listing.title, listing.description).to_lowercase();
            if !haystack.contains(&needle) { return false; }
        }
    }
    true
}
