//! Remote classification of captured frames.
//!
//! A [`ClassificationClient`] uploads one encoded frame and returns the raw
//! result code from the response body. It never retries on its own.

mod http;
mod mock;
mod response;

pub use http::HttpClassificationClient;
pub use mock::MockClassificationClient;
pub(crate) use http::join_url;
pub use response::{parse_body, ResponseFormat};

use crate::capture::CapturedFrame;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while classifying a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("network error: {0}")]
    Network(String),
    #[error("classification endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid classification response: {0}")]
    InvalidResponse(String),
}

impl ClassifyError {
    /// True for transport failures and non-success statuses.
    pub fn is_network(&self) -> bool {
        matches!(self, ClassifyError::Network(_) | ClassifyError::Status { .. })
    }
}

/// Uploads a frame and returns the raw result code.
#[async_trait]
pub trait ClassificationClient: Send + Sync {
    /// Issues a single request for `frame`.
    async fn submit(&self, frame: &CapturedFrame) -> Result<String, ClassifyError>;
}

/// Settings for the HTTP classification client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Endpoint path appended to the base URL.
    pub endpoint_path: String,
    /// Multipart field carrying the image.
    pub field_name: String,
    /// Body contract of the response.
    pub response_format: ResponseFormat,
    /// Field holding the code when `response_format` is `json`.
    pub json_field: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            endpoint_path: "/blood/upload-image-prediction".to_string(),
            field_name: "image".to_string(),
            response_format: ResponseFormat::Plain,
            json_field: "prediction".to_string(),
            timeout_secs: 30,
        }
    }
}
