//! Shared capabilities and per-load context handed to loaders

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::core::{Action, Context, FileType, PreviewResult, S3Handle};
use crate::gate::SizeThresholds;
use crate::services::{Endpoints, PreviewService, SizeTier};
use crate::session::SessionManager;
use crate::store::{ObjectStore, Signer};

/// Byte budgets for loaders that read a bounded prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// `max_bytes` requested for plain-text previews
    pub text_max_bytes: u64,
    /// Prefix scanned when sniffing JSON for chart or genome specs
    pub sniff_bytes: u64,
    /// `max_bytes` requested for SDK-enabled IFrame documents
    pub iframe_max_bytes: u64,
    /// Largest body a compressed molecule file may inflate to
    pub inflate_max_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            text_max_bytes: 10 * 1024,
            sniff_bytes: 128 * 1024,
            iframe_max_bytes: 10 * 1024,
            inflate_max_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Which buckets may render HTML and browse packages
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BucketPolicy {
    /// Buckets configured as browsable
    pub browsable: Vec<String>,
    /// Buckets belonging to this deployment
    pub in_stack: Vec<String>,
    pub status_reports: Option<String>,
    /// Running against a local registry, where every bucket is trusted
    pub local_mode: bool,
    /// Whether the Voila mode is offered for notebooks
    pub voila: bool,
}

impl BucketPolicy {
    pub fn is_browsable(&self, bucket: &str) -> bool {
        self.browsable.iter().any(|b| b == bucket)
    }

    /// HTML from untrusted buckets is shown as text
    pub fn html_as_text(&self, bucket: &str) -> bool {
        !self.local_mode
            && !self.in_stack.iter().any(|b| b == bucket)
            && self.status_reports.as_deref() != Some(bucket)
    }
}

/// Editor drafts keyed by object
#[derive(Clone, Default)]
pub struct Drafts(Arc<Mutex<HashMap<S3Handle, String>>>);

impl Drafts {
    pub fn set(&self, handle: S3Handle, value: String) {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle, value);
    }

    pub fn get(&self, handle: &S3Handle) -> Option<String> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(handle)
            .cloned()
    }
}

/// Process-wide, read-only capabilities shared by every loader
pub struct Env {
    pub store: Arc<dyn ObjectStore>,
    pub signer: Arc<dyn Signer>,
    pub service: Arc<dyn PreviewService>,
    /// Absent when no registry is configured; browsable HTML then falls
    /// back to signed URLs
    pub sessions: Option<SessionManager>,
    pub endpoints: Endpoints,
    pub thresholds: SizeThresholds,
    pub limits: Limits,
    pub buckets: BucketPolicy,
    pub drafts: Drafts,
}

impl Env {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        signer: Arc<dyn Signer>,
        service: Arc<dyn PreviewService>,
    ) -> Self {
        Self {
            store,
            signer,
            service,
            sessions: None,
            endpoints: Endpoints::default(),
            thresholds: SizeThresholds::default(),
            limits: Limits::default(),
            buckets: BucketPolicy::default(),
            drafts: Drafts::default(),
        }
    }
}

/// Caller hints for detection and loading
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Explicitly requested mode
    pub mode: Option<FileType>,
    pub context: Context,
    /// The user opted in past the size gate
    pub force: bool,
    /// Explicit tabular tier (set by "load more")
    pub size: Option<SizeTier>,
}

impl LoadOptions {
    pub fn with_mode(mode: FileType) -> Self {
        Self {
            mode: Some(mode),
            ..Default::default()
        }
    }

    pub fn wants(&self, mode: FileType) -> bool {
        self.mode == Some(mode)
    }
}

/// Sink for results produced after a load returned
pub type Publisher = Arc<dyn Fn(PreviewResult) + Send + Sync>;

/// Everything one load needs: capabilities, options and callbacks wired
/// by whoever drives the load
pub struct LoadContext {
    pub env: Arc<Env>,
    pub options: LoadOptions,
    retry: Action,
    unlock: Action,
    load_more: Action,
    publisher: Option<Publisher>,
    resources: Mutex<Vec<Box<dyn Any + Send>>>,
}

impl LoadContext {
    pub fn new(env: Arc<Env>, options: LoadOptions) -> Self {
        Self {
            env,
            options,
            retry: Action::noop(),
            unlock: Action::noop(),
            load_more: Action::noop(),
            publisher: None,
            resources: Mutex::new(Vec::new()),
        }
    }

    pub fn with_actions(mut self, retry: Action, unlock: Action, load_more: Action) -> Self {
        self.retry = retry;
        self.unlock = unlock;
        self.load_more = load_more;
        self
    }

    /// Route results produced after the load returned (session updates)
    pub fn with_publisher(mut self, publisher: impl Fn(PreviewResult) + Send + Sync + 'static) -> Self {
        self.publisher = Some(Arc::new(publisher));
        self
    }

    /// Re-run the whole load
    pub fn retry(&self) -> Action {
        self.retry.clone()
    }

    /// Re-run the load past the size gate
    pub fn unlock(&self) -> Action {
        self.unlock.clone()
    }

    /// Re-run a tabular load at the largest tier
    pub fn load_more(&self) -> Action {
        self.load_more.clone()
    }

    /// Publish a later result for this load; dropped without a publisher
    pub fn publish(&self, result: PreviewResult) {
        if let Some(ref publisher) = self.publisher {
            publisher(result);
        }
    }

    /// Shared publisher, for tasks that outlive the load call
    pub fn publisher(&self) -> Option<Publisher> {
        self.publisher.clone()
    }

    /// Keep `resource` alive for as long as this load is current
    pub fn retain(&self, resource: impl Any + Send) {
        self.resources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(resource));
    }
}

impl fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadContext")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
