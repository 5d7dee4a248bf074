//! HTTP client for a running documenter server, used by the `docr` CLI.
//!
//! Configuration is via environment variables:
//! - `DOCUMENTER_URL` - Base URL (default: `http://127.0.0.1:8000`)
//! - `DOCUMENTER_API_KEY` - Bearer token (optional for local servers)

use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

use crate::api::{CreatePackageRequest, GenerateRequest, SubmitReviewRequest};
use crate::models::*;
use crate::workflow::{GeneratedDocument, Health};

pub const DEFAULT_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized: set DOCUMENTER_API_KEY")]
    Unauthorized,

    /// The server answered with an error body.
    #[error("{status} {kind}: {message}")]
    Api {
        status: StatusCode,
        kind: String,
        message: String,
    },
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    kind: String,
    message: String,
}

#[derive(Debug, Clone)]
pub struct DocumenterClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl DocumenterClient {
    pub fn from_env() -> Self {
        let base_url = std::env::var("DOCUMENTER_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        let api_key = std::env::var("DOCUMENTER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::new(base_url, api_key)
    }

    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }

        let text = response.text().await.unwrap_or_default();
        let (kind, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => (envelope.error.kind, envelope.error.message),
            Err(_) => ("http_error".to_string(), text),
        };
        Err(ClientError::Api {
            status,
            kind,
            message,
        })
    }

    pub async fn health(&self) -> Result<Health, ClientError> {
        let response = self.request(Method::GET, "/health").send().await?;
        self.handle_response(response).await
    }

    pub async fn generate(
        &self,
        input: &GenerateRequest,
    ) -> Result<GeneratedDocument, ClientError> {
        let response = self
            .request(Method::POST, "/generate")
            .json(input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn review_queue(&self) -> Result<Vec<Document>, ClientError> {
        let response = self.request(Method::GET, "/review-queue").send().await?;
        self.handle_response(response).await
    }

    pub async fn submit_review(
        &self,
        input: &SubmitReviewRequest,
    ) -> Result<Document, ClientError> {
        let response = self
            .request(Method::POST, "/submit-review")
            .json(input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn create_package(
        &self,
        input: &CreatePackageRequest,
    ) -> Result<LicensingPackage, ClientError> {
        let response = self
            .request(Method::POST, "/create-licensing-package")
            .json(input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn costs(&self, days: u32) -> Result<CostSummary, ClientError> {
        let response = self
            .request(Method::GET, "/costs")
            .query(&[("days", days)])
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn review_insights(&self, days: u32) -> Result<ReviewInsights, ClientError> {
        let response = self
            .request(Method::GET, "/review-insights")
            .query(&[("days", days)])
            .send()
            .await?;
        self.handle_response(response).await
    }
}
