use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============ Registry Wire Models ============

/// Company profile as returned by `GET /company/{number}`.
///
/// Only the fields the enrichment uses are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Registry-defined status string (e.g. "active", "dissolved", "liquidation").
    #[serde(default)]
    pub company_status: Option<String>,
    /// Cessation date in `YYYY-MM-DD` form, present for ceased companies.
    #[serde(default)]
    pub date_of_cessation: Option<String>,
}

/// Officer list as returned by `GET /company/{number}/officers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfficerList {
    #[serde(default)]
    pub items: Vec<OfficerItem>,
}

/// A single raw officer entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfficerItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resigned_on: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<DateOfBirth>,
}

/// Partial date of birth. The registry only publishes year and month.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DateOfBirth {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
}

// ============ Domain Models ============

/// An officer that has not resigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Officer {
    pub name: Option<String>,
    /// Birth year and month as `YYYY-MM`.
    pub birth_month: Option<String>,
    /// Age in whole years relative to the reference date.
    pub age: Option<i32>,
}

/// Everything the registry client learned about one company.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyFetch {
    pub status: Option<String>,
    pub status_change_date: Option<NaiveDate>,
    pub officers: Vec<Officer>,
    /// Description of the failure that cut the fetch short, if any.
    pub error: Option<String>,
}

impl CompanyFetch {
    /// Result carrying nothing but the failure description.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// How much of the enrichment succeeded for an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentOutcome {
    /// Profile and officers both fetched.
    Complete,
    /// Status known, officers could not be fetched.
    Partial,
    /// No status.
    Failed,
}

/// One output record per input identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentResult {
    /// Normalized 8-character identifier.
    pub company_number: String,
    pub status: Option<String>,
    pub status_change_date: Option<NaiveDate>,
    pub officers: Vec<Officer>,
    /// Officer names joined with `"; "`.
    pub active_directors: Option<String>,
    /// Officer ages joined with `"; "`, positionally aligned with `active_directors`.
    pub directors_ages: Option<String>,
    pub error: Option<String>,
    pub outcome: EnrichmentOutcome,
}
