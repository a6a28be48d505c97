use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::app::ports::HttpClientPort;
use crate::error::{IngestError, Result};
use crate::pipeline::processing::format::AnswerFormatter;
use crate::registry::field_mapping::FieldMapping;

/// The parts of an adapter that don't depend on the provider's wire format
pub struct ProviderSettings {
    pub label: String,
    pub token: String,
    pub form_id: String,
    pub base_url: String,
    pub mapping: FieldMapping,
    pub formatter: AnswerFormatter,
}

/// Authenticated GET of one JSON page; any non-2xx status or undecodable body
/// is a fetch failure for `provider`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    http: &Arc<dyn HttpClientPort>,
    provider: &str,
    url: &str,
    token: &str,
) -> Result<T> {
    let fetch_error = |message: String| IngestError::Fetch {
        provider: provider.to_string(),
        message,
    };

    debug!(provider, url, "Requesting page");
    let response = http.get(url, token).await.map_err(fetch_error)?;

    if !response.is_success() {
        let reason = match response.status {
            401 | 403 => "authentication rejected",
            404 => "form not found",
            429 => "rate limited",
            500..=599 => "provider server error",
            _ => "unexpected status",
        };
        return Err(fetch_error(format!("{} (HTTP {}) for {}", reason, response.status, url)));
    }

    serde_json::from_slice(&response.bytes)
        .map_err(|e| fetch_error(format!("malformed response from {}: {}", url, e)))
}
