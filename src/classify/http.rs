//! reqwest implementation of the classification client.

use super::{parse_body, ClassificationClient, ClassifierSettings, ClassifyError};
use crate::capture::CapturedFrame;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;

/// Uploads frames to the remote classification endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpClassificationClient {
    client: Client,
    url: String,
    settings: ClassifierSettings,
}

impl HttpClassificationClient {
    /// Creates a client for `{base_url}{settings.endpoint_path}`.
    pub fn new(base_url: &str, settings: ClassifierSettings) -> Result<Self, ClassifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ClassifyError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url, settings))
    }

    /// Creates a client sharing an existing connection pool.
    pub fn with_client(client: Client, base_url: &str, settings: ClassifierSettings) -> Self {
        let url = join_url(base_url, &settings.endpoint_path);
        Self {
            client,
            url,
            settings,
        }
    }

    /// Full endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ClassificationClient for HttpClassificationClient {
    async fn submit(&self, frame: &CapturedFrame) -> Result<String, ClassifyError> {
        let part = Part::bytes(frame.data().to_vec())
            .file_name(frame.file_name())
            .mime_str(frame.encoding().mime_type())
            .map_err(|e| ClassifyError::Network(e.to_string()))?;
        let form = Form::new().part(self.settings.field_name.clone(), part);

        tracing::debug!(
            url = %self.url,
            bytes = frame.data().len(),
            "Uploading frame for classification"
        );

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClassifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ClassifyError::Network(e.to_string()))?;
        let code = parse_body(&body, self.settings.response_format, &self.settings.json_field)?;

        tracing::debug!(code = %code, "Classification response received");
        Ok(code)
    }
}

/// Joins a base URL and a path with exactly one slash between them.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
