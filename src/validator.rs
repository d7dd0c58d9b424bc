//! Batch validation: partitions normalized records into importable and
//! errored sets. Pure, order-insensitive per record, never fails: every
//! input record lands in exactly one of the two output sets.

use crate::property::{ParsedProperty, RowErrors, ValidationOutcome};

/// Price plausibility window. Out-of-range prices are reported as warnings
/// but still exclude the record from the importable set.
const PRICE_PLAUSIBLE_MIN: f64 = 100_000.0;
const PRICE_PLAUSIBLE_MAX: f64 = 100_000_000.0;

/// Partition a batch of normalized records. The partition is exhaustive and
/// disjoint: `valid.len() + errors.len() == input.len()`.
pub fn validate_properties(properties: Vec<ParsedProperty>) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for (index, property) in properties.into_iter().enumerate() {
        let errors = check_property(&property);
        if errors.is_empty() {
            outcome.valid.push(property);
        } else {
            outcome.errors.push(RowErrors {
                index,
                property,
                errors,
            });
        }
    }

    outcome
}

/// Collect every failed check for one record. Hard requirements first, then
/// plausibility warnings; the caller treats any non-empty list as a reject.
fn check_property(p: &ParsedProperty) -> Vec<String> {
    let mut errors = Vec::new();

    if p.title.trim().is_empty() {
        errors.push("Title is required".to_string());
    }
    if p.price <= 0.0 {
        errors.push("Price must be greater than 0".to_string());
    }
    if p.location.trim().is_empty() {
        errors.push("Location is required".to_string());
    }
    // Zero is a valid explicit value (studio); only a missing cell fails
    if p.bedrooms.is_none() {
        errors.push("Bedrooms is required".to_string());
    }
    if p.bathrooms.is_none() {
        errors.push("Bathrooms is required".to_string());
    }
    if p.area <= 0.0 {
        errors.push("Area must be greater than 0".to_string());
    }

    if p.price > 0.0 && p.price < PRICE_PLAUSIBLE_MIN {
        errors.push("Warning: price seems too low".to_string());
    }
    if p.price > PRICE_PLAUSIBLE_MAX {
        errors.push("Warning: price seems too high".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn good_property() -> ParsedProperty {
        ParsedProperty {
            title: "Seaview Condo".into(),
            price: 4_500_000.0,
            location: "Rawai".into(),
            bedrooms: Some(2),
            bathrooms: Some(2),
            area: 85.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_record_passes() {
        let outcome = validate_properties(vec![good_property()]);
        assert_eq!(outcome.valid.len(), 1);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn test_partition_is_exhaustive_and_disjoint() {
        let mut bad = good_property();
        bad.location = String::new();
        let input = vec![good_property(), bad, good_property()];
        let total = input.len();

        let outcome = validate_properties(input);
        assert_eq!(outcome.valid.len() + outcome.errors.len(), total);
        assert_eq!(outcome.errors[0].index, 1);
    }

    #[test]
    fn test_missing_required_fields_all_reported() {
        let p = ParsedProperty::default();
        let outcome = validate_properties(vec![p]);
        assert_eq!(outcome.valid.len(), 0);

        let errors = &outcome.errors[0].errors;
        assert!(errors.iter().any(|e| e.contains("Title")));
        assert!(errors.iter().any(|e| e.contains("Price")));
        assert!(errors.iter().any(|e| e.contains("Location")));
        assert!(errors.iter().any(|e| e.contains("Bedrooms")));
        assert!(errors.iter().any(|e| e.contains("Bathrooms")));
        assert!(errors.iter().any(|e| e.contains("Area")));
    }

    #[test]
    fn test_studio_zero_bedrooms_is_valid() {
        let mut p = good_property();
        p.bedrooms = Some(0);
        let outcome = validate_properties(vec![p]);
        assert_eq!(outcome.valid.len(), 1);
    }

    #[test]
    fn test_missing_bedrooms_rejected() {
        let mut p = good_property();
        p.bedrooms = None;
        let outcome = validate_properties(vec![p]);
        assert_eq!(outcome.valid.len(), 0);
        assert!(outcome.errors[0].errors.iter().any(|e| e.contains("Bedrooms")));
    }

    #[test]
    fn test_price_warning_still_rejects() {
        // A record whose only issue is an implausible price is still
        // excluded from the importable set
        let mut cheap = good_property();
        cheap.price = 50_000.0;
        let outcome = validate_properties(vec![cheap]);
        assert_eq!(outcome.valid.len(), 0);
        assert_eq!(outcome.errors[0].errors, vec!["Warning: price seems too low"]);

        let mut pricey = good_property();
        pricey.price = 250_000_000.0;
        let outcome = validate_properties(vec![pricey]);
        assert_eq!(outcome.valid.len(), 0);
        assert_eq!(outcome.errors[0].errors, vec!["Warning: price seems too high"]);
    }

    #[test]
    fn test_indices_are_original_positions() {
        let mut bad_a = good_property();
        bad_a.title = String::new();
        let mut bad_b = good_property();
        bad_b.area = 0.0;

        let outcome = validate_properties(vec![good_property(), bad_a, good_property(), bad_b]);
        let indices: Vec<usize> = outcome.errors.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 3]);
    }
}
