/// Officer normalization
///
/// Turns the raw officer list into flat `Officer` records:
/// 1. Drop officers with a non-empty `resigned_on`
/// 2. Copy the name verbatim
/// 3. Build a `YYYY-MM` birth string when both year and month are present
/// 4. Derive the age at month precision
use crate::models::{DateOfBirth, Officer, OfficerItem};
use chrono::{Datelike, NaiveDate};

/// Normalizes officers in registry order, skipping resigned ones.
pub fn normalize_officers(items: &[OfficerItem], today: NaiveDate) -> Vec<Officer> {
    items
        .iter()
        .filter(|item| !is_resigned(item))
        .map(|item| {
            let birth_month = item.date_of_birth.as_ref().and_then(format_birth_month);
            let age = birth_month
                .as_deref()
                .and_then(|dob| calculate_age(dob, today));

            Officer {
                name: item.name.clone(),
                birth_month,
                age,
            }
        })
        .collect()
}

fn is_resigned(item: &OfficerItem) -> bool {
    item.resigned_on
        .as_deref()
        .map(|d| !d.trim().is_empty())
        .unwrap_or(false)
}

/// Formats a partial date of birth as `YYYY-MM`.
///
/// Returns `None` unless both parts are present and non-zero.
pub fn format_birth_month(dob: &DateOfBirth) -> Option<String> {
    match (dob.year, dob.month) {
        (Some(year), Some(month)) if year != 0 && month != 0 => {
            Some(format!("{}-{:02}", year, month))
        }
        _ => None,
    }
}

/// Calculates age from a `YYYY-MM` string relative to `today`.
///
/// The day of month is never considered: the age drops by one only when
/// today's month is before the birth month. Any parse failure yields `None`.
pub fn calculate_age(dob: &str, today: NaiveDate) -> Option<i32> {
    let born = NaiveDate::parse_from_str(&format!("{}-01", dob.trim()), "%Y-%m-%d").ok()?;

    let mut age = today.year() - born.year();
    if today.month() < born.month() {
        age -= 1;
    }
    Some(age)
}
