//! Callbacks carried inside preview values (retry, unlock, load more, edits)

use std::fmt;
use std::sync::Arc;

/// Zero-argument callback attached to a preview value
#[derive(Clone)]
pub struct Action(Arc<dyn Fn() + Send + Sync>);

impl Action {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Callback that does nothing
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn invoke(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action")
    }
}

/// Two actions are equal when they are the same callback
impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Callback receiving a new editor value
#[derive(Clone)]
pub struct ChangeHandler(Arc<dyn Fn(String) + Send + Sync>);

impl ChangeHandler {
    pub fn new(f: impl Fn(String) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn invoke(&self, value: String) {
        (self.0)(value)
    }
}

impl fmt::Debug for ChangeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChangeHandler")
    }
}

impl PartialEq for ChangeHandler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
