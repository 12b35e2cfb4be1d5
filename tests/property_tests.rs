/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
use chrono::{Datelike, NaiveDate};
use company_enrich::enrichment::{join_ages, join_names, normalize_identifier};
use company_enrich::models::Officer;
use company_enrich::officers::calculate_age;
use company_enrich::rate_limiter::compute_delay_secs;
use proptest::prelude::*;

// Property: identifier normalization pads but never truncates
proptest! {
    #[test]
    fn normalized_identifier_is_at_least_eight_chars(raw in "[0-9A-Z]{0,12}") {
        let normalized = normalize_identifier(&raw);
        prop_assert_eq!(normalized.len(), raw.len().max(8));
        prop_assert!(normalized.ends_with(&raw));
    }

    #[test]
    fn surrounding_whitespace_is_ignored(raw in "[0-9]{1,8}", pad in " {0,3}") {
        let padded = format!("{}{}{}", pad, raw, pad);
        prop_assert_eq!(normalize_identifier(&padded), normalize_identifier(&raw));
    }

    #[test]
    fn normalization_is_idempotent(raw in "[0-9]{0,10}") {
        let once = normalize_identifier(&raw);
        prop_assert_eq!(normalize_identifier(&once), once.clone());
    }
}

// Property: pacing delay follows the quota formula
proptest! {
    #[test]
    fn delay_matches_formula(quota in 1u32..10_000, window in 1u64..3_600, safety in 1.0f64..5.0) {
        let delay = compute_delay_secs(quota, window, safety);
        let expected = (window as f64 / quota as f64) * safety;
        prop_assert!((delay - expected).abs() < 1e-12);
        // Safety factor never shortens the spacing
        prop_assert!(delay >= window as f64 / quota as f64);
    }
}

// Property: age derivation
proptest! {
    #[test]
    fn age_parsing_never_panics(dob in "\\PC*") {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let _ = calculate_age(&dob, today);
    }

    #[test]
    fn age_is_year_difference_minus_unreached_month(
        birth_year in 1900i32..2024,
        birth_month in 1u32..=12,
        today_year in 2024i32..2100,
        today_month in 1u32..=12,
        today_day in 1u32..=28
    ) {
        let today = NaiveDate::from_ymd_opt(today_year, today_month, today_day).unwrap();
        let dob = format!("{}-{:02}", birth_year, birth_month);

        let age = calculate_age(&dob, today).unwrap();
        let base = today.year() - birth_year;
        if today_month < birth_month {
            prop_assert_eq!(age, base - 1);
        } else {
            prop_assert_eq!(age, base);
        }
    }
}

// Property: display strings stay positionally aligned
proptest! {
    #[test]
    fn ages_and_names_have_same_entry_count(
        ages in proptest::collection::vec(proptest::option::of(0i32..120), 1..10)
    ) {
        let officers: Vec<Officer> = ages
            .iter()
            .enumerate()
            .map(|(i, age)| Officer {
                name: Some(format!("OFFICER {}", i)),
                birth_month: None,
                age: *age,
            })
            .collect();

        let names = join_names(&officers).unwrap();
        let joined_ages = join_ages(&officers).unwrap();
        prop_assert_eq!(names.split("; ").count(), officers.len());
        prop_assert_eq!(joined_ages.split("; ").count(), officers.len());
    }
}
