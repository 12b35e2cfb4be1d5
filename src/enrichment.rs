/// Enrichment pipeline
///
/// Drives the per-identifier workflow, strictly one identifier at a time:
/// 1. Normalize the identifier to its 8-character form
/// 2. Pace with the shared rate limiter
/// 3. Fetch profile and officers via the registry client
/// 4. Assemble the flat result record
/// 5. Hand the record to the sink
use crate::errors::{AppError, ResultExt};
use crate::models::{CompanyFetch, EnrichmentOutcome, EnrichmentResult, Officer};
use crate::registry_client::RegistryClient;

/// Width of a registry company number.
pub const IDENTIFIER_WIDTH: usize = 8;
/// Rendered in place of an unknown officer age.
pub const AGE_SENTINEL: &str = "N/A";
const DISPLAY_SEPARATOR: &str = "; ";

/// Consumer of result records, in input order.
pub trait ResultSink {
    /// Accepts the result for the identifier at `position` in the input list.
    fn accept(&mut self, position: usize, result: EnrichmentResult) -> Result<(), AppError>;
}

impl ResultSink for Vec<EnrichmentResult> {
    fn accept(&mut self, _position: usize, result: EnrichmentResult) -> Result<(), AppError> {
        self.push(result);
        Ok(())
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub complete: usize,
    pub partial: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: EnrichmentOutcome) {
        self.processed += 1;
        match outcome {
            EnrichmentOutcome::Complete => self.complete += 1,
            EnrichmentOutcome::Partial => self.partial += 1,
            EnrichmentOutcome::Failed => self.failed += 1,
        }
    }
}

pub struct EnrichmentPipeline {
    client: RegistryClient,
}

impl EnrichmentPipeline {
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RegistryClient {
        &self.client
    }

    /// Enriches `identifiers` in order, emitting one result per identifier.
    ///
    /// Per-identifier failures are contained in the results. Only
    /// cancellation and sink failures abort the run; results already
    /// emitted stay with the sink.
    pub async fn run<S: ResultSink + ?Sized>(
        &self,
        identifiers: &[String],
        limit: Option<usize>,
        sink: &mut S,
    ) -> Result<RunSummary, AppError> {
        let total = limit.map_or(identifiers.len(), |l| l.min(identifiers.len()));
        let mut summary = RunSummary::default();

        tracing::info!("Processing {} companies...", total);

        for (position, raw) in identifiers.iter().take(total).enumerate() {
            let company_number = normalize_identifier(raw);
            tracing::info!(
                "Processing company {} ({}/{})...",
                company_number,
                position + 1,
                total
            );

            let result = self.enrich_one(&company_number).await?;
            summary.record(result.outcome);

            sink.accept(position, result)
                .with_context(|| format!("Failed to emit result for {}", company_number))?;
        }

        tracing::info!(
            "Finished: {} processed, {} complete, {} partial, {} failed",
            summary.processed,
            summary.complete,
            summary.partial,
            summary.failed
        );

        Ok(summary)
    }

    /// Fetches and assembles the result for one normalized company number.
    pub async fn enrich_one(&self, company_number: &str) -> Result<EnrichmentResult, AppError> {
        self.client.limiter().wait().await?;

        let fetch = self.client.fetch_company(company_number).await?;
        if let Some(ref error) = fetch.error {
            tracing::warn!("Company {} enriched with errors: {}", company_number, error);
        }

        Ok(assemble_result(company_number, fetch))
    }
}

/// Trims and left-pads an identifier with zeros to 8 characters. Longer
/// identifiers are never truncated.
pub fn normalize_identifier(raw: &str) -> String {
    format!("{:0>width$}", raw.trim(), width = IDENTIFIER_WIDTH)
}

/// Builds the output record from a client fetch.
pub fn assemble_result(company_number: &str, fetch: CompanyFetch) -> EnrichmentResult {
    let outcome = match (&fetch.status, &fetch.error) {
        (None, _) => EnrichmentOutcome::Failed,
        (Some(_), Some(_)) => EnrichmentOutcome::Partial,
        (Some(_), None) => EnrichmentOutcome::Complete,
    };

    EnrichmentResult {
        company_number: company_number.to_string(),
        active_directors: join_names(&fetch.officers),
        directors_ages: join_ages(&fetch.officers),
        status: fetch.status,
        status_change_date: fetch.status_change_date,
        officers: fetch.officers,
        error: fetch.error,
        outcome,
    }
}

/// Officer names joined for display; `None` when there are no officers.
pub fn join_names(officers: &[Officer]) -> Option<String> {
    if officers.is_empty() {
        return None;
    }
    Some(
        officers
            .iter()
            .map(|o| o.name.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(DISPLAY_SEPARATOR),
    )
}

/// Officer ages joined for display, one entry per officer so positions line
/// up with `join_names`. Unknown ages render as `AGE_SENTINEL`.
pub fn join_ages(officers: &[Officer]) -> Option<String> {
    if officers.is_empty() {
        return None;
    }
    Some(
        officers
            .iter()
            .map(|o| match o.age {
                Some(age) => age.to_string(),
                None => AGE_SENTINEL.to_string(),
            })
            .collect::<Vec<_>>()
            .join(DISPLAY_SEPARATOR),
    )
}
