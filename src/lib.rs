pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod image_processor;
pub mod models;
pub mod output;

use std::{path::Path, time::Duration};

use log::debug;
use reqwest::header::{AUTHORIZATION, HeaderValue, USER_AGENT};

pub use crate::{
    auth::TokenSource,
    config::{Config, CredentialSource},
    error::{Error, Result},
    models::TextAnnotation,
};
use crate::{constants::*, image_processor::ProcessedImage, models::*};

/// HTTP client shared by the token endpoints and the Vision API.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(DEFAULT_USER_AGENT)
        .build()?)
}

// --- Client Implementation ---

pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: TokenSource,
}

impl VisionClient {
    pub fn new(tokens: TokenSource) -> Result<Self> {
        Ok(Self::with_http(
            http_client()?,
            VISION_ANNOTATE_ENDPOINT,
            tokens,
        ))
    }

    pub fn with_http(http: reqwest::Client, endpoint: impl Into<String>, tokens: TokenSource) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            tokens,
        }
    }

    pub async fn detect_texts_in_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<TextAnnotation>> {
        let image = image_processor::process_image_from_path(path)?;
        self.detect_texts(&image).await
    }

    /// Runs `TEXT_DETECTION` on one image with no hints and no result limit.
    pub async fn detect_texts(&mut self, image: &ProcessedImage) -> Result<Vec<TextAnnotation>> {
        let request = BatchAnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: image.to_base64(),
                },
                features: vec![Feature {
                    kind: TEXT_DETECTION_FEATURE,
                }],
            }],
        };

        let token = self.tokens.token(&self.http).await?;
        let authorization = HeaderValue::from_str(&token.authorization())
            .map_err(|e| Error::Auth(format!("access token is not a valid header value: {}", e)))?;

        debug!("POST {}", self.endpoint);
        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, authorization)
            .header(USER_AGENT, DEFAULT_USER_AGENT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.trim().to_string());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let batch: BatchAnnotateResponse =
            serde_json::from_str(&body).map_err(|e| Error::parse("annotate response", e))?;
        parse_response(batch)
    }
}

fn parse_response(batch: BatchAnnotateResponse) -> Result<Vec<TextAnnotation>> {
    let response = batch
        .responses
        .into_iter()
        .next()
        .ok_or(Error::EmptyResponse)?;

    if let Some(err) = response.error {
        return Err(Error::Detection {
            code: err.code,
            message: err.message,
        });
    }
    Ok(response.text_annotations)
}
