//! Canonical property record types shared across the import pipeline.
//!
//! Wire format is camelCase JSON, the same shape the review UI posts back
//! to `/api/import` after the operator has looked over the validation report.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generate ISO8601 timestamp for current time.
pub fn now_iso8601() -> String {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();
    let days_since_epoch = secs / 86400;
    let time_of_day = secs % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let mut year = 1970i32;
    let mut remaining_days = days_since_epoch as i32;

    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }

    let days_in_months: [i32; 12] = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 1;
    for days in days_in_months {
        if remaining_days < days {
            break;
        }
        remaining_days -= days;
        month += 1;
    }
    let day = remaining_days + 1;

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year, month, day, hours, minutes, seconds
    )
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

// ============================================================================
// Tag enums
// ============================================================================

/// Property classification. Free text from the sheet is mapped through
/// [`PropertyType::from_input`]; unrecognized text falls back to `Condo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Villa,
    Condo,
    Townhouse,
    Land,
    House,
    Apartment,
}

impl Default for PropertyType {
    fn default() -> Self {
        Self::Condo
    }
}

impl PropertyType {
    /// Total mapping from sheet free text. Never fails; unknown input
    /// yields the default so the row stays reviewable.
    pub fn from_input(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "villa" | "pool villa" => Self::Villa,
            "condo" | "condominium" => Self::Condo,
            "townhouse" | "town house" => Self::Townhouse,
            "land" | "land plot" => Self::Land,
            "house" | "home" => Self::House,
            "apartment" | "flat" => Self::Apartment,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Villa => "villa",
            Self::Condo => "condo",
            Self::Townhouse => "townhouse",
            Self::Land => "land",
            Self::House => "house",
            Self::Apartment => "apartment",
        }
    }
}

/// Sale vs. rental listing. Unknown input defaults to `Sale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rent,
}

impl Default for ListingType {
    fn default() -> Self {
        Self::Sale
    }
}

impl ListingType {
    pub fn from_input(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "rent" | "rental" | "for rent" => Self::Rent,
            "sale" | "sell" | "for sale" => Self::Sale,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Rent => "rent",
        }
    }
}

/// Lifecycle status. Imported records always start out `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Active,
    Inactive,
    Sold,
    Rented,
}

impl Default for PropertyStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Whether the contact on the row is the owner themselves or an agent.
/// Inferred from the owner-name cell containing the token "Owner".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Owner,
    Agent,
}

impl Default for OwnerType {
    fn default() -> Self {
        Self::Agent
    }
}

// ============================================================================
// Pipeline records
// ============================================================================

/// Canonical intermediate record, a pure function of one spreadsheet row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedProperty {
    pub title: String,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    pub status: PropertyStatus,

    pub price: f64,
    /// `None` means the bedrooms cell was missing or unparseable.
    /// `Some(0)` is a studio, a valid explicit value.
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub area: f64,

    pub location: String,

    pub owner_name: String,
    pub owner_phone: String,
    pub owner_email: String,
    pub owner_line: String,
    pub owner_type: OwnerType,

    pub commission: f64,
    pub short_term_let: bool,
    pub quota: String,
    pub land_size: String,

    pub views: Vec<String>,
    pub private_features: Vec<String>,
    pub rooms_spaces: Vec<String>,
    pub communal_facilities: Vec<String>,
    pub technical_equipment: Vec<String>,
    pub security: Vec<String>,
    pub location_features: Vec<String>,
    pub kitchen_features: Vec<String>,
    pub layout_features: Vec<String>,

    pub furnishing_status: String,
    pub maintenance_charges: String,
    pub common_area_fee: String,
    pub transfer_costs: String,

    pub available_from: String,
    pub special_remarks: String,

    /// Raw image URLs in sheet order. Index 0 is the primary image.
    pub images: Vec<String>,

    pub description: String,

    pub import_source: String,
    pub import_date: String,
}

/// Full persistence payload handed to the record store: every normalized
/// field (with `images` replaced by resolved local paths) plus the legacy
/// `features` aggregate kept for backward-compatible consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    #[serde(flatten)]
    pub property: ParsedProperty,
    /// Concatenation of views + private features + rooms/spaces.
    pub features: Vec<String>,
}

impl PropertyRecord {
    pub fn from_parsed(mut property: ParsedProperty, images: Vec<String>) -> Self {
        let mut features =
            Vec::with_capacity(property.views.len() + property.private_features.len() + property.rooms_spaces.len());
        features.extend(property.views.iter().cloned());
        features.extend(property.private_features.iter().cloned());
        features.extend(property.rooms_spaces.iter().cloned());
        property.images = images;
        Self { property, features }
    }
}

// ============================================================================
// Batch outcomes
// ============================================================================

/// Validation failures for one row, addressed by its 0-based position in
/// the original sheet (the UI renders it as "Row N").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowErrors {
    pub index: usize,
    pub property: ParsedProperty,
    pub errors: Vec<String>,
}

/// Exhaustive partition of normalized rows into importable and errored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: Vec<ParsedProperty>,
    pub errors: Vec<RowErrors>,
}

/// One record that could not be persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedImport {
    pub property: String,
    pub error: String,
}

/// Run-level accounting for a bulk import. Built one record at a time;
/// never aborted early by an individual failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportResult {
    pub total: usize,
    /// Persisted record identifiers, in processing order.
    pub success: Vec<String>,
    pub failed: Vec<FailedImport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_lookup() {
        assert_eq!(PropertyType::from_input("Pool Villa"), PropertyType::Villa);
        assert_eq!(PropertyType::from_input("  condominium "), PropertyType::Condo);
        assert_eq!(PropertyType::from_input("Town House"), PropertyType::Townhouse);
        // Unknown input falls back to the default rather than failing the row
        assert_eq!(PropertyType::from_input("castle"), PropertyType::Condo);
        assert_eq!(PropertyType::from_input(""), PropertyType::Condo);
    }

    #[test]
    fn test_listing_type_lookup() {
        assert_eq!(ListingType::from_input("For Rent"), ListingType::Rent);
        assert_eq!(ListingType::from_input("Sale"), ListingType::Sale);
        assert_eq!(ListingType::from_input("???"), ListingType::Sale);
    }

    #[test]
    fn test_record_aggregates_legacy_features() {
        let parsed = ParsedProperty {
            views: vec!["Sea View".into()],
            private_features: vec!["Pool".into()],
            rooms_spaces: vec!["Office".into(), "Storage".into()],
            images: vec!["https://example.com/a.jpg".into()],
            ..Default::default()
        };

        let record = PropertyRecord::from_parsed(parsed, vec!["/uploads/properties/x.jpg".into()]);
        assert_eq!(record.features, vec!["Sea View", "Pool", "Office", "Storage"]);
        assert_eq!(record.property.images, vec!["/uploads/properties/x.jpg"]);
    }

    #[test]
    fn test_now_iso8601_shape() {
        let ts = now_iso8601();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], "T");
    }
}
