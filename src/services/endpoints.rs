//! URL builders for the backend services

use serde::Deserialize;
use url::Url;

/// Base URLs of the backend services
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// JSON preview, thumbnail and transcode services
    pub api_gateway: String,
    /// Binary (tabular) preview service
    pub binary_api_gateway: String,
    /// Proxy serving browsing sessions
    pub s3_proxy: String,
    /// Registry (GraphQL, Voila)
    pub registry: String,
    /// Object store base URL
    pub s3: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_gateway: "http://localhost:3000/api".to_string(),
            binary_api_gateway: "http://localhost:3000/api".to_string(),
            s3_proxy: "http://localhost:3000/s3-proxy".to_string(),
            registry: "http://localhost:3000".to_string(),
            s3: "https://s3.amazonaws.com".to_string(),
        }
    }
}

/// Append `path` and query pairs to a base URL
pub fn with_query<'a>(
    base: &str,
    path: &str,
    query: impl IntoIterator<Item = (&'a str, String)>,
) -> String {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    match Url::parse(&joined) {
        Ok(mut url) => {
            {
                let mut pairs = url.query_pairs_mut();
                for (name, value) in query {
                    pairs.append_pair(name, &value);
                }
            }
            url.to_string()
        }
        // Not a parseable base: fall back to manual joining
        Err(_) => {
            let params: Vec<String> = query
                .into_iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            if params.is_empty() {
                joined
            } else {
                format!("{}?{}", joined, params.join("&"))
            }
        }
    }
}

impl Endpoints {
    /// Transcoding URL for audio/video playback
    pub fn transcode_url(&self, signed: &str, format: &str) -> String {
        with_query(
            &self.api_gateway,
            "transcode",
            [("url", signed.to_string()), ("format", format.to_string())],
        )
    }

    /// Browsing-session URL of a package entry
    pub fn browse_url(&self, session_id: &str, logical_key: &str) -> String {
        format!(
            "{}/browse/{}/{}",
            self.s3_proxy.trim_end_matches('/'),
            session_id,
            logical_key.trim_start_matches('/')
        )
    }

    /// Text preview URL handed to sandboxed pages
    pub fn text_preview_url(&self, signed: &str, max_bytes: u64) -> String {
        with_query(
            &self.api_gateway,
            "preview",
            [
                ("url", signed.to_string()),
                ("input", "txt".to_string()),
                ("max_bytes", max_bytes.to_string()),
            ],
        )
    }

    /// Tabular preview URL handed to sandboxed pages
    pub fn csv_preview_url(&self, signed: &str) -> String {
        with_query(
            &self.binary_api_gateway,
            "tabular-preview",
            [
                ("url", signed.to_string()),
                ("input", "csv".to_string()),
                ("size", "large".to_string()),
            ],
        )
    }

    /// Voila rendering URL of a notebook
    pub fn voila_url(&self, signed: &str) -> String {
        with_query(
            &self.registry,
            "voila/voila/render/",
            [("url", signed.to_string())],
        )
    }

    /// GraphQL endpoint of the registry
    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.registry.trim_end_matches('/'))
    }
}
