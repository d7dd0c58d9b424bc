//! Row normalization: one [`RawRow`] → one [`ParsedProperty`].
//!
//! Pure functions, no async. Bad data never fails a row here; every field
//! degrades to a default so the validator stays the single place where
//! accept/reject decisions are made.

use crate::property::{
    now_iso8601, ListingType, OwnerType, ParsedProperty, PropertyType,
};
use crate::sheet_parser::RawRow;

/// Commission applied when the cell is absent or unparseable.
const DEFAULT_COMMISSION: f64 = 3.0;

/// Normalize a full batch, preserving row order. Output length always equals
/// input length.
pub fn normalize_rows(rows: &[RawRow], source: &str) -> Vec<ParsedProperty> {
    rows.iter().map(|row| normalize_row(row, source)).collect()
}

/// Map one sheet row to the canonical record. Header strings are matched
/// literally against the upstream sheet, quirks included.
pub fn normalize_row(row: &RawRow, source: &str) -> ParsedProperty {
    let location = text(row, "Location");
    let title = match row.get("Title") {
        Some(t) => t.to_string(),
        // No title column in the sheet: derive one from the location so
        // every record has a human-meaningful name.
        None if !location.is_empty() => format!("Property in {}", location),
        None => String::new(),
    };

    let owner_name = text(row, "Owner Name");
    let owner_type = if owner_name
        .split(|c: char| !c.is_alphanumeric())
        .any(|t| t.eq_ignore_ascii_case("owner"))
    {
        OwnerType::Owner
    } else {
        OwnerType::Agent
    };

    let mut property = ParsedProperty {
        title,
        property_type: PropertyType::from_input(&text(row, "Property Type")),
        listing_type: ListingType::from_input(&text(row, "Listing Type")),
        status: Default::default(),

        price: parse_decimal(row.get("Price")),
        bedrooms: parse_bedrooms(row.get("Bedrooms")),
        bathrooms: parse_count(row.get("Bathrooms")),
        area: parse_decimal(row.get("Area (sqm)")),

        location,

        owner_name,
        owner_phone: text(row, "Owner Phone"),
        owner_email: text(row, "Owner Email"),
        owner_line: text(row, "Owner Line ID"),
        owner_type,

        commission: parse_commission(row.get("Commission (%)")),
        short_term_let: row
            .get("Short Term Let")
            .is_some_and(|v| v.eq_ignore_ascii_case("yes")),
        // The upstream sheet misspells this header; read it verbatim.
        quota: text(row, "Qouta"),
        land_size: text(row, "Land Size"),

        views: split_list(row.get("Views")),
        private_features: split_list(row.get("Private Features")),
        rooms_spaces: split_list(row.get("Rooms / Spaces")),
        communal_facilities: split_list(row.get("Communal Facilities")),
        technical_equipment: split_list(row.get("Technical Equipment")),
        security: split_list(row.get("Security")),
        location_features: split_list(row.get("Location Features")),
        kitchen_features: split_list(row.get("Kitchen Features")),
        layout_features: split_list(row.get("Layout Features")),

        furnishing_status: text(row, "Furnishing Status"),
        maintenance_charges: text(row, "Maintenance Charges"),
        common_area_fee: text(row, "Common Area Fee"),
        transfer_costs: text(row, "Transfer Costs"),

        available_from: text(row, "Available From"),
        special_remarks: text(row, "Special Remarks"),

        images: split_list(row.get("Images")),

        description: String::new(),

        import_source: source.to_string(),
        import_date: now_iso8601(),
    };

    property.description = build_description(&property);
    property
}

fn text(row: &RawRow, header: &str) -> String {
    row.get(header).unwrap_or_default().to_string()
}

/// Split a comma-separated cell into trimmed, non-empty tokens.
/// An absent cell yields an empty list.
fn split_list(cell: Option<&str>) -> Vec<String> {
    cell.map(|v| {
        v.split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Parse a numeric cell that may carry thousands separators or a currency
/// sign. Unparseable input degrades to 0.
fn parse_decimal(cell: Option<&str>) -> f64 {
    cell.and_then(|v| v.replace([',', '$', '฿'], "").trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Whole-number cell (bathrooms). `None` means missing or unparseable;
/// validation distinguishes that from an explicit zero.
fn parse_count(cell: Option<&str>) -> Option<u32> {
    // parseInt semantics: "2.5" counts as 2
    cell.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f as u32)
}

/// Bedrooms, with the "Studio" special case: the literal token is a real
/// value meaning zero bedrooms, not a parse failure.
fn parse_bedrooms(cell: Option<&str>) -> Option<u32> {
    match cell {
        Some(v) if v.eq_ignore_ascii_case("studio") => Some(0),
        other => parse_count(other),
    }
}

fn parse_commission(cell: Option<&str>) -> f64 {
    cell.and_then(|v| v.trim_end_matches('%').replace(',', "").trim().parse::<f64>().ok())
        .unwrap_or(DEFAULT_COMMISSION)
}

/// Build the generated listing description. Optional clauses are appended
/// only when their source field is non-empty, so an absent field never
/// leaves dangling punctuation behind.
fn build_description(p: &ParsedProperty) -> String {
    let noun = p.property_type.as_str();
    let mut out = match p.bedrooms {
        Some(0) => format!("Studio {}", noun),
        Some(n) => format!("{}-bedroom {}", n, noun),
        None => capitalize(noun),
    };

    out.push_str(" for ");
    out.push_str(p.listing_type.as_str());
    if !p.location.is_empty() {
        out.push_str(" in ");
        out.push_str(&p.location);
    }
    out.push('.');

    if p.area > 0.0 {
        out.push_str(&format!(" Area: {} sqm.", format_number(p.area)));
    }
    if !p.furnishing_status.is_empty() {
        out.push(' ');
        out.push_str(&p.furnishing_status);
        out.push('.');
    }
    if !p.views.is_empty() {
        out.push_str(" Views: ");
        out.push_str(&p.views.join(", "));
        out.push('.');
    }
    if !p.special_remarks.is_empty() {
        out.push(' ');
        out.push_str(&p.special_remarks);
        if !p.special_remarks.ends_with('.') {
            out.push('.');
        }
    }

    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn format_number(n: f64) -> String {
    if n == (n as i64) as f64 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
