//! Browsing-session mutations (create / refresh / dispose)

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::endpoints::Endpoints;
use crate::error::{Error, Result};

const CREATE_MUTATION: &str = "mutation ($scope: String!, $ttl: Int) { \
    browsingSessionCreate(scope: $scope, ttl: $ttl) { \
    __typename ... on BrowsingSession { id expires } \
    ... on InvalidInput { errors { path message } } \
    ... on OperationError { name message } } }";

const REFRESH_MUTATION: &str = "mutation ($id: ID!, $ttl: Int) { \
    browsingSessionRefresh(id: $id, ttl: $ttl) { \
    __typename ... on BrowsingSession { id expires } \
    ... on InvalidInput { errors { path message } } \
    ... on OperationError { name message } } }";

const DISPOSE_MUTATION: &str = "mutation ($id: ID!) { \
    browsingSessionDispose(id: $id) { \
    __typename ... on InvalidInput { errors { path message } } \
    ... on OperationError { name message } } }";

/// Server-tracked session enabling sandboxed browsing of a package
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrowsingSession {
    pub id: String,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputError {
    #[serde(default)]
    pub path: Option<String>,
    pub message: String,
}

/// Union returned by every session mutation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum SessionReply {
    BrowsingSession { id: String, expires: DateTime<Utc> },
    Ok,
    InvalidInput { errors: Vec<InputError> },
    OperationError { name: String, message: String },
}

impl SessionReply {
    fn into_failure(self) -> Error {
        match self {
            SessionReply::OperationError { name, message } => Error::session(name, message),
            SessionReply::InvalidInput { errors } => Error::service(
                errors
                    .iter()
                    .map(|e| {
                        format!(
                            "{{ message: {}, path: {} }}",
                            e.message,
                            e.path.as_deref().unwrap_or("")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            other => Error::parse(format!("unexpected session reply: {:?}", other)),
        }
    }

    /// The session, or the failure the reply describes
    pub fn into_session(self) -> Result<BrowsingSession> {
        match self {
            SessionReply::BrowsingSession { id, expires } => Ok(BrowsingSession { id, expires }),
            other => Err(other.into_failure()),
        }
    }

    /// Success of a reply that carries no payload
    pub fn into_unit(self) -> Result<()> {
        match self {
            SessionReply::Ok | SessionReply::BrowsingSession { .. } => Ok(()),
            other => Err(other.into_failure()),
        }
    }
}

/// Browsing-session mutations
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn create(&self, scope: &str, ttl: u64) -> Result<BrowsingSession>;

    async fn refresh(&self, id: &str, ttl: u64) -> Result<BrowsingSession>;

    async fn dispose(&self, id: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    data: Option<HashMap<String, SessionReply>>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

/// [`SessionApi`] over the registry's GraphQL endpoint
pub struct GraphqlSessionApi {
    client: Client,
    url: String,
}

impl GraphqlSessionApi {
    pub fn new(endpoints: &Endpoints) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: endpoints.graphql_url(),
        })
    }

    async fn mutate(
        &self,
        field: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<SessionReply> {
        debug!(field, "session mutation");
        let envelope: GraphqlEnvelope = self
            .client
            .post(&self.url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(first) = envelope.errors.first() {
            return Err(Error::service(first.message.clone()));
        }
        envelope
            .data
            .and_then(|mut data| data.remove(field))
            .ok_or_else(|| Error::parse(format!("missing {} in response", field)))
    }
}

#[async_trait]
impl SessionApi for GraphqlSessionApi {
    async fn create(&self, scope: &str, ttl: u64) -> Result<BrowsingSession> {
        self.mutate(
            "browsingSessionCreate",
            CREATE_MUTATION,
            json!({ "scope": scope, "ttl": ttl }),
        )
        .await?
        .into_session()
    }

    async fn refresh(&self, id: &str, ttl: u64) -> Result<BrowsingSession> {
        self.mutate(
            "browsingSessionRefresh",
            REFRESH_MUTATION,
            json!({ "id": id, "ttl": ttl }),
        )
        .await?
        .into_session()
    }

    async fn dispose(&self, id: &str) -> Result<()> {
        self.mutate("browsingSessionDispose", DISPOSE_MUTATION, json!({ "id": id }))
            .await?
            .into_unit()
    }
}
