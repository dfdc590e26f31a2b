use crate::{
    errors::ServiceError,
    services::boundaries::Period,
    services::statistics::CategoryBreakdown,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, instrument};

/// Opaque external summarizer: it consumes precomputed aggregates and
/// returns free-text guidance. Nothing in the core depends on its output.
#[derive(Clone)]
pub struct InsightsService {
    http: reqwest::Client,
    endpoint: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    period: Period,
    #[serde(flatten)]
    breakdown: &'a CategoryBreakdown,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    summary: String,
}

impl InsightsService {
    pub fn new(endpoint: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { http, endpoint }
    }

    /// Asks the external service for a textual reading of the breakdown.
    #[instrument(skip(self, breakdown))]
    pub async fn summarize(
        &self,
        period: Period,
        breakdown: &CategoryBreakdown,
    ) -> Result<String, ServiceError> {
        let endpoint = self.endpoint.as_deref().ok_or_else(|| {
            ServiceError::ServiceUnavailable("analysis endpoint is not configured".to_string())
        })?;

        let response = self
            .http
            .post(endpoint)
            .json(&AnalysisRequest { period, breakdown })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "analysis request failed");
                ServiceError::ExternalServiceError(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "analysis service returned {}",
                response.status()
            )));
        }

        let payload: AnalysisResponse = response.json().await.map_err(|e| {
            error!(error = %e, "analysis response could not be decoded");
            ServiceError::ExternalServiceError(e.to_string())
        })?;

        Ok(payload.summary)
    }
}
