use base64::{engine::general_purpose, Engine};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::Error;
use crate::labels::Label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    LabelDetection,
}

/// One image and the features requested for it.
#[derive(Debug, Clone)]
pub struct AnnotateImageRequest {
    pub content: Vec<u8>,
    pub features: Vec<Feature>,
}

impl AnnotateImageRequest {
    pub fn label_detection(content: Vec<u8>) -> Self {
        Self {
            content,
            features: vec![Feature::LabelDetection],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Result for one image, in the same position as its request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    pub label_annotations: Option<Vec<Label>>,
    pub error: Option<Status>,
}

/// Remote label-annotation service.
pub trait LabelAnnotator {
    fn batch_annotate_images(
        &self,
        requests: &[AnnotateImageRequest],
    ) -> Result<Vec<AnnotateImageResponse>, Error>;
}

#[derive(Debug, Clone)]
pub enum Credentials {
    ApiKey(String),
    AccessToken(String),
}

impl Credentials {
    /// `GOOGLE_API_KEY` wins over `GOOGLE_OAUTH_ACCESS_TOKEN`.
    pub fn from_env() -> Option<Self> {
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            return Some(Credentials::ApiKey(key));
        }
        std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN")
            .ok()
            .map(Credentials::AccessToken)
    }
}

/// Blocking client for the Cloud Vision `images:annotate` REST endpoint.
pub struct VisionClient {
    client: HttpClient,
    endpoint: String,
    project: String,
    credentials: Credentials,
}

impl VisionClient {
    pub fn new(
        endpoint: &str,
        project: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            project: project.to_string(),
            credentials,
        })
    }
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    requests: Vec<WireRequest<'a>>,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    image: WireImage,
    features: Vec<WireFeature<'a>>,
}

#[derive(Serialize)]
struct WireImage {
    content: String,
}

#[derive(Serialize)]
struct WireFeature<'a> {
    #[serde(rename = "type")]
    kind: &'a Feature,
}

#[derive(Deserialize)]
struct BatchResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Status,
}

impl LabelAnnotator for VisionClient {
    fn batch_annotate_images(
        &self,
        requests: &[AnnotateImageRequest],
    ) -> Result<Vec<AnnotateImageResponse>, Error> {
        let body = BatchRequest {
            requests: requests
                .iter()
                .map(|r| WireRequest {
                    image: WireImage {
                        content: general_purpose::STANDARD.encode(&r.content),
                    },
                    features: r.features.iter().map(|kind| WireFeature { kind }).collect(),
                })
                .collect(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut request = self.client.post(&self.endpoint);
        match &self.credentials {
            Credentials::ApiKey(key) => {
                request = request.query(&[("key", key)]);
            }
            Credentials::AccessToken(token) => {
                headers.insert(
                    "x-goog-user-project",
                    HeaderValue::from_str(&self.project)
                        .map_err(|e| Error::Other(format!("Invalid project id: {}", e)))?,
                );
                request = request.bearer_auth(token);
            }
        }

        debug!("Sending {} image(s) to {}", requests.len(), self.endpoint);
        let response = request.headers(headers).json(&body).send()?;
        if !response.status().is_success() {
            let status = response.status();
            let body: ErrorResponse = response.json().unwrap_or_else(|_| ErrorResponse {
                error: Status {
                    code: status.as_u16() as i32,
                    message: "unknown error".to_string(),
                },
            });
            return Err(Error::Annotation(format!(
                "images:annotate failed ({}): {}",
                status, body.error.message
            )));
        }

        let body: BatchResponse = response.json()?;
        Ok(body.responses)
    }
}
