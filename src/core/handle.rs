//! Object and package handles

use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical location of an object in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct S3Handle {
    pub bucket: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl S3Handle {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Parse `s3://bucket/key[?versionId=..]`
    pub fn parse_uri(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("s3://")?;
        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };
        let (bucket, key) = location.split_once('/')?;
        if bucket.is_empty() || key.is_empty() {
            return None;
        }

        let version = query.and_then(|q| {
            q.split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(name, _)| *name == "versionId")
                .map(|(_, value)| value.to_string())
        });

        Some(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version,
        })
    }

    /// Directory part of the key, with a trailing slash (empty at bucket root)
    pub fn dir(&self) -> &str {
        match self.key.rfind('/') {
            Some(i) => &self.key[..=i],
            None => "",
        }
    }

    /// Handle of an object addressed relative to this one.
    ///
    /// Supports `./` and `../` segments; returns `None` when the path
    /// climbs above the bucket root.
    pub fn sibling(&self, relative: &str) -> Option<Self> {
        let mut parts: Vec<&str> = self.dir().split('/').filter(|s| !s.is_empty()).collect();
        for segment in relative.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop()?;
                }
                s => parts.push(s),
            }
        }
        if parts.is_empty() {
            return None;
        }
        Some(Self::new(self.bucket.clone(), parts.join("/")))
    }
}

impl fmt::Display for S3Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)?;
        if let Some(ref version) = self.version {
            write!(f, "?versionId={}", version)?;
        }
        Ok(())
    }
}

/// Revision of a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageHandle {
    pub bucket: String,
    pub name: String,
    pub hash: String,
}

impl PackageHandle {
    pub fn new(
        bucket: impl Into<String>,
        name: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            hash: hash.into(),
        }
    }

    /// Parse `bucket/user/package@hash`
    pub fn parse(spec: &str) -> Option<Self> {
        let (location, hash) = spec.split_once('@')?;
        let (bucket, name) = location.split_once('/')?;
        if bucket.is_empty() || name.is_empty() || hash.is_empty() || !name.contains('/') {
            return None;
        }
        Some(Self::new(bucket, name, hash))
    }

    /// Package URI used as the browsing-session scope
    pub fn scope(&self) -> String {
        format!(
            "quilt+s3://{}#package={}@{}",
            self.bucket, self.name, self.hash
        )
    }
}

/// Object addressed by a preview request, possibly through a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHandle {
    pub location: S3Handle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageHandle>,
}

impl ObjectHandle {
    pub fn new(location: S3Handle) -> Self {
        Self {
            location,
            logical_key: None,
            package: None,
        }
    }

    pub fn in_package(mut self, package: PackageHandle, logical_key: impl Into<String>) -> Self {
        self.package = Some(package);
        self.logical_key = Some(logical_key.into());
        self
    }

    pub fn bucket(&self) -> &str {
        &self.location.bucket
    }

    pub fn key(&self) -> &str {
        &self.location.key
    }

    pub fn version(&self) -> Option<&str> {
        self.location.version.as_deref()
    }

    /// Key used for format detection: the logical key when addressed
    /// through a package, the physical key otherwise
    pub fn detection_key(&self) -> &str {
        self.logical_key.as_deref().unwrap_or(&self.location.key)
    }
}

impl From<S3Handle> for ObjectHandle {
    fn from(location: S3Handle) -> Self {
        Self::new(location)
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.location, f)
    }
}
