//! Object store over plain HTTP (path-style, anonymous)
//!
//! Talks to a public bucket endpoint or a credentials-injecting proxy in
//! front of the store. Request signing itself is the proxy's job.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;
use url::Url;

use super::{
    ByteRange, GetObject, HeadObject, ObjectStore, SignOptions, Signer, StoreError,
};
use crate::core::S3Handle;
use crate::error::{Error, Result};

const DELETE_MARKER_HEADER: &str = "x-amz-delete-marker";
const STORAGE_CLASS_HEADER: &str = "x-amz-storage-class";

static CODE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static MESSAGE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static KEY_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn code_re() -> Option<&'static Regex> {
    CODE_RE
        .get_or_init(|| Regex::new(r"<Code>([^<]*)</Code>").ok())
        .as_ref()
}

fn message_re() -> Option<&'static Regex> {
    MESSAGE_RE
        .get_or_init(|| Regex::new(r"<Message>([^<]*)</Message>").ok())
        .as_ref()
}

fn key_re() -> Option<&'static Regex> {
    KEY_RE
        .get_or_init(|| Regex::new(r"<Key>([^<]*)</Key>").ok())
        .as_ref()
}

/// Build the path-style URL of an object
fn object_url(endpoint: &Url, handle: &S3Handle) -> Url {
    let mut url = endpoint.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty();
        segments.push(&handle.bucket);
        segments.extend(handle.key.split('/'));
    }
    if let Some(ref version) = handle.version {
        url.query_pairs_mut().append_pair("versionId", version);
    }
    url
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn network_error(e: reqwest::Error) -> StoreError {
    StoreError::new(0, "NetworkingError", e.to_string())
}

/// Turn a non-success response into a coded store error
async fn error_from_response(response: Response) -> StoreError {
    let status = response.status();
    let delete_marker = response
        .headers()
        .get(DELETE_MARKER_HEADER)
        .and_then(|v| v.to_str().ok())
        == Some("true");
    let body = response.text().await.unwrap_or_default();

    let code = code_re()
        .and_then(|re| re.captures(&body))
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| StoreError::code_for_status(status.as_u16()).to_string());
    let message = message_re()
        .and_then(|re| re.captures(&body))
        .map(|c| unescape_xml(&c[1]))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());

    let mut err = StoreError::new(status.as_u16(), code, message);
    err.delete_marker = delete_marker;
    err
}

/// Anonymous path-style object store client
pub struct HttpStore {
    client: Client,
    endpoint: Url,
}

impl HttpStore {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| Error::config(format!("store endpoint: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn head_object(&self, handle: &S3Handle) -> std::result::Result<HeadObject, StoreError> {
        let url = object_url(&self.endpoint, handle);
        debug!(%url, "HEAD object");
        let response = self.client.head(url).send().await.map_err(network_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let headers = response.headers();
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Ok(HeadObject {
            content_length: header(CONTENT_LENGTH.as_str())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            storage_class: header(STORAGE_CLASS_HEADER),
            delete_marker: header(DELETE_MARKER_HEADER).as_deref() == Some("true"),
        })
    }

    async fn get_object(
        &self,
        handle: &S3Handle,
        range: Option<ByteRange>,
    ) -> std::result::Result<GetObject, StoreError> {
        let url = object_url(&self.endpoint, handle);
        debug!(%url, ?range, "GET object");
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(RANGE, range.header_value());
        }
        let response = request.send().await.map_err(network_error)?;
        if !(response.status().is_success() || response.status() == StatusCode::PARTIAL_CONTENT) {
            return Err(error_from_response(response).await);
        }

        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(network_error)?;
        Ok(GetObject {
            body,
            content_range,
        })
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> std::result::Result<Vec<S3Handle>, StoreError> {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.push(bucket);
        }
        url.query_pairs_mut()
            .append_pair("list-type", "2")
            .append_pair("prefix", prefix)
            .append_pair("delimiter", "/");
        debug!(%url, "list objects");

        let response = self.client.get(url).send().await.map_err(network_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body = response.text().await.map_err(network_error)?;
        let Some(re) = key_re() else {
            return Ok(Vec::new());
        };
        Ok(re
            .captures_iter(&body)
            .map(|c| S3Handle::new(bucket, unescape_xml(&c[1])))
            .filter(|h| h.key != prefix)
            .collect())
    }
}

/// URL builder matching [`HttpStore`]'s addressing
pub struct UrlSigner {
    endpoint: Url,
}

impl UrlSigner {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| Error::config(format!("signer endpoint: {}", e)))?;
        Ok(Self { endpoint })
    }
}

impl Signer for UrlSigner {
    fn sign(&self, handle: &S3Handle, options: &SignOptions) -> String {
        let mut url = object_url(&self.endpoint, handle);
        if let Some(ref content_type) = options.response_content_type {
            url.query_pairs_mut()
                .append_pair("response-content-type", content_type);
        }
        url.to_string()
    }
}
