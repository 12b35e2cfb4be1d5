use crate::config::Config;
use crate::errors::AppError;
use crate::models::{CompanyFetch, CompanyProfile, OfficerList};
use crate::officers::normalize_officers;
use crate::rate_limiter::RateLimiter;
use chrono::{NaiveDate, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

const PROFILE_RESOURCE: &str = "company profile";
const OFFICERS_RESOURCE: &str = "officers";
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Outcome of a single GET that did not fail transiently.
enum CallOutcome<T> {
    Success(T),
    /// Non-retryable HTTP failure.
    Rejected(AppError),
}

/// Retry loop states for one company.
enum RetryState {
    Attempting(u32),
    Backoff { attempt: u32, cause: AppError },
    Succeeded(CompanyFetch),
    /// Failed with an error another attempt cannot fix.
    Rejected(AppError),
    Exhausted(AppError),
}

/// Client for the company registry API.
///
/// Issues the profile and officers calls for a company, paced by a shared
/// `RateLimiter`, and retries 429s and transient failures.
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    limiter: Arc<RateLimiter>,
    max_retries: u32,
    reference_date: Option<NaiveDate>,
}

impl RegistryClient {
    /// Creates a new `RegistryClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the registry API.
    /// * `api_key` - Credential sent as the basic-auth username.
    /// * `limiter` - Pacing shared with the pipeline.
    /// * `max_retries` - Attempts per company before giving up.
    /// * `timeout` - Per-call timeout.
    pub fn new(
        base_url: String,
        api_key: String,
        limiter: Arc<RateLimiter>,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create registry client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            limiter,
            max_retries: max_retries.max(1),
            reference_date: None,
        })
    }

    pub fn from_config(config: &Config, limiter: Arc<RateLimiter>) -> Result<Self, AppError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            limiter,
            config.max_retries,
            config.request_timeout(),
        )
    }

    /// Fixes the date ages are computed against instead of today.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Fetches status and active officers for a normalized company number.
    ///
    /// Per-company failures are reported inside the returned `CompanyFetch`;
    /// the only error returned is `AppError::Cancelled`.
    pub async fn fetch_company(&self, company_number: &str) -> Result<CompanyFetch, AppError> {
        let mut state = RetryState::Attempting(1);

        loop {
            state = match state {
                RetryState::Attempting(attempt) => match self.attempt(company_number).await {
                    Ok(fetch) => RetryState::Succeeded(fetch),
                    Err(e) => self.after_failure(company_number, attempt, e)?,
                },
                RetryState::Backoff { attempt, cause } => {
                    self.limiter.backoff().await?;
                    if attempt < self.max_retries {
                        RetryState::Attempting(attempt + 1)
                    } else {
                        RetryState::Exhausted(cause)
                    }
                }
                RetryState::Succeeded(fetch) => return Ok(fetch),
                RetryState::Rejected(cause) => {
                    tracing::error!("Not retrying company {}: {}", company_number, cause);
                    return Ok(CompanyFetch::failed(cause.to_string()));
                }
                RetryState::Exhausted(cause) => {
                    tracing::error!(
                        "Giving up on company {} after {} attempts: {}",
                        company_number,
                        self.max_retries,
                        cause
                    );
                    return Ok(CompanyFetch::failed(format!(
                        "retries exhausted: {}",
                        cause
                    )));
                }
            };
        }
    }

    /// Next state after a failed attempt. Cancellation is returned as `Err`.
    fn after_failure(
        &self,
        company_number: &str,
        attempt: u32,
        e: AppError,
    ) -> Result<RetryState, AppError> {
        if e.is_cancelled() {
            return Err(e);
        }
        if !e.is_retryable() {
            return Ok(RetryState::Rejected(e));
        }

        // A 429 always backs off, even on the final attempt
        if let AppError::RateLimited { .. } = e {
            tracing::warn!(
                "{} for {} (attempt {}/{})",
                e,
                company_number,
                attempt,
                self.max_retries
            );
            return Ok(RetryState::Backoff { attempt, cause: e });
        }

        tracing::warn!("Error processing company {}: {}", company_number, e);
        if attempt < self.max_retries {
            Ok(RetryState::Backoff { attempt, cause: e })
        } else {
            Ok(RetryState::Exhausted(e))
        }
    }

    /// One profile + officers sequence. Transient failures are returned as `Err`.
    async fn attempt(&self, company_number: &str) -> Result<CompanyFetch, AppError> {
        let profile: CompanyProfile = match self
            .get_json(&format!("/company/{}", company_number), PROFILE_RESOURCE)
            .await?
        {
            CallOutcome::Success(profile) => profile,
            CallOutcome::Rejected(e) => {
                tracing::warn!("Failed to get company profile for {}: {}", company_number, e);
                return Ok(CompanyFetch::failed(e.to_string()));
            }
        };

        let status = profile.company_status.clone();
        let status_change_date = status_change_date(&profile);

        self.limiter.wait().await?;

        let officers: OfficerList = match self
            .get_json(
                &format!("/company/{}/officers", company_number),
                OFFICERS_RESOURCE,
            )
            .await?
        {
            CallOutcome::Success(officers) => officers,
            CallOutcome::Rejected(e) => {
                tracing::warn!("Failed to get officers for {}: {}", company_number, e);
                return Ok(CompanyFetch {
                    status,
                    status_change_date,
                    officers: Vec::new(),
                    error: Some(e.to_string()),
                });
            }
        };

        Ok(CompanyFetch {
            status,
            status_change_date,
            officers: normalize_officers(&officers.items, self.today()),
            error: None,
        })
    }

    /// Makes an authenticated GET and decodes the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
    ) -> Result<CallOutcome<T>, AppError> {
        self.limiter.cancellation().check()?;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(""))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimited {
                resource: resource.to_string(),
            });
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Ok(CallOutcome::Rejected(AppError::HttpStatus {
                resource: resource.to_string(),
                status: status.as_u16(),
                body: error_text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            }));
        }

        let body = response.text().await?;
        let data = serde_json::from_str(&body).map_err(|e| AppError::MalformedResponse {
            resource: resource.to_string(),
            detail: e.to_string(),
        })?;

        Ok(CallOutcome::Success(data))
    }
}

/// Cessation date, kept only for non-active companies with a parseable date.
pub fn status_change_date(profile: &CompanyProfile) -> Option<NaiveDate> {
    if profile.company_status.as_deref() == Some("active") {
        return None;
    }

    let raw = profile.date_of_cessation.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }

    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::debug!("Ignoring unparseable cessation date '{}': {}", raw, e);
            None
        }
    }
}
