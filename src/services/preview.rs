//! Preview, tabular and thumbnail backend services

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::endpoints::{with_query, Endpoints};
use crate::error::{Error, Result};

/// Header carrying structured metadata on binary responses
pub const INFO_HEADER: &str = "x-quilt-info";

/// Payload size tier of the tabular preview service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SizeTier {
    Small,
    Medium,
    Large,
}

impl SizeTier {
    pub fn as_str(self) -> &'static str {
        match self {
            SizeTier::Small => "small",
            SizeTier::Medium => "medium",
            SizeTier::Large => "large",
        }
    }
}

/// Request to the JSON preview endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    /// Signed source URL
    pub url: String,
    /// Input type (`txt`, `ipynb`, `vcf`, `fcs`, ...)
    pub input: String,
    pub compression: Option<String>,
    pub max_bytes: Option<u64>,
    /// Further input-specific parameters
    pub extra: Vec<(String, String)>,
}

impl PreviewRequest {
    pub fn new(url: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            input: input.into(),
            compression: None,
            max_bytes: None,
            extra: Vec::new(),
        }
    }

    pub fn query(&self) -> Vec<(&str, String)> {
        let mut query = vec![("url", self.url.clone()), ("input", self.input.clone())];
        if let Some(ref compression) = self.compression {
            query.push(("compression", compression.clone()));
        }
        if let Some(max_bytes) = self.max_bytes {
            query.push(("max_bytes", max_bytes.to_string()));
        }
        for (name, value) in &self.extra {
            query.push((name.as_str(), value.clone()));
        }
        query
    }
}

/// Request to the tabular preview endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularRequest {
    pub url: String,
    /// `csv`, `excel`, `parquet`, `jsonl`, `h5ad`
    pub input: String,
    pub size: SizeTier,
    pub compression: Option<String>,
    /// Column separator for delimited text
    pub separator: Option<String>,
}

impl TabularRequest {
    pub fn query(&self) -> Vec<(&str, String)> {
        let mut query = vec![
            ("url", self.url.clone()),
            ("input", self.input.clone()),
            ("size", self.size.as_str().to_string()),
        ];
        if let Some(ref compression) = self.compression {
            query.push(("compression", compression.clone()));
        }
        if let Some(ref sep) = self.separator {
            query.push(("sep", sep.clone()));
        }
        query
    }
}

/// Request to the thumbnail endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRequest {
    pub url: String,
    /// `pdf` or `pptx`
    pub input: String,
    /// Bounding box like `w1024h768`
    pub size: String,
    pub page: u32,
    pub count_pages: bool,
}

impl ThumbnailRequest {
    pub fn query(&self) -> Vec<(&str, String)> {
        vec![
            ("url", self.url.clone()),
            ("input", self.input.clone()),
            ("output", "raw".to_string()),
            ("size", self.size.clone()),
            ("page", self.page.to_string()),
            ("countPages", self.count_pages.to_string()),
        ]
    }
}

/// Raw reply of a binary endpoint
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinaryReply {
    pub status: u16,
    pub body: Bytes,
    /// Parsed `x-quilt-info` header
    pub info: Option<Value>,
}

impl BinaryReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Backend preview services
#[async_trait]
pub trait PreviewService: Send + Sync {
    /// JSON preview; domain errors come back inside the body as `error`
    async fn preview(&self, request: &PreviewRequest) -> Result<Value>;

    async fn tabular(&self, request: &TabularRequest) -> Result<BinaryReply>;

    async fn thumbnail(&self, request: &ThumbnailRequest) -> Result<BinaryReply>;
}

/// [`PreviewService`] over HTTP
pub struct HttpPreviewService {
    client: Client,
    endpoints: Endpoints,
}

impl HttpPreviewService {
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client, endpoints })
    }

    async fn fetch_binary(&self, url: String) -> Result<BinaryReply> {
        debug!(%url, "binary preview request");
        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        let info = response
            .headers()
            .get(INFO_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| serde_json::from_str(v).ok());
        let body = response.bytes().await?;
        Ok(BinaryReply { status, body, info })
    }
}

#[async_trait]
impl PreviewService for HttpPreviewService {
    async fn preview(&self, request: &PreviewRequest) -> Result<Value> {
        let url = with_query(&self.endpoints.api_gateway, "preview", request.query());
        debug!(%url, "preview request");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|_| {
            Error::service(format!(
                "preview endpoint returned {} with a non-JSON body",
                status
            ))
        })
    }

    async fn tabular(&self, request: &TabularRequest) -> Result<BinaryReply> {
        let url = with_query(
            &self.endpoints.binary_api_gateway,
            "tabular-preview",
            request.query(),
        );
        self.fetch_binary(url).await
    }

    async fn thumbnail(&self, request: &ThumbnailRequest) -> Result<BinaryReply> {
        let url = with_query(&self.endpoints.api_gateway, "thumbnail", request.query());
        self.fetch_binary(url).await
    }
}
