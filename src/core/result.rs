//! Two-phase result of an asynchronous, possibly failing computation
//!
//! `AsyncResult` is the uniform shape every loader produces and every
//! consumer renders from. It is a plain value type with no side effects.

/// Result of a computation that may not have started or finished yet
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncResult<T, E> {
    /// Nothing attempted yet
    Init,
    /// Work in flight
    Pending,
    /// Work failed or was classified as a domain error
    Err(E),
    /// Work succeeded
    Ok(T),
}

/// Active tag of an [`AsyncResult`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Init,
    Pending,
    Err,
    Ok,
}

impl<T, E> Default for AsyncResult<T, E> {
    fn default() -> Self {
        Self::Init
    }
}

impl<T, E> AsyncResult<T, E> {
    pub fn tag(&self) -> Tag {
        match self {
            Self::Init => Tag::Init,
            Self::Pending => Tag::Pending,
            Self::Err(_) => Tag::Err,
            Self::Ok(_) => Tag::Ok,
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self, Self::Init)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// True once the value is `Ok` or `Err`
    pub fn is_settled(&self) -> bool {
        self.is_ok() || self.is_err()
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            _ => None,
        }
    }

    pub fn err(self) -> Option<E> {
        match self {
            Self::Err(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> AsyncResult<&T, &E> {
        match self {
            Self::Init => AsyncResult::Init,
            Self::Pending => AsyncResult::Pending,
            Self::Err(e) => AsyncResult::Err(e),
            Self::Ok(value) => AsyncResult::Ok(value),
        }
    }

    /// Transform the `Ok` payload, leaving every other tag untouched
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AsyncResult<U, E> {
        match self {
            Self::Init => AsyncResult::Init,
            Self::Pending => AsyncResult::Pending,
            Self::Err(e) => AsyncResult::Err(e),
            Self::Ok(value) => AsyncResult::Ok(f(value)),
        }
    }

    /// Transform the `Err` payload, leaving every other tag untouched
    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> AsyncResult<T, F> {
        match self {
            Self::Init => AsyncResult::Init,
            Self::Pending => AsyncResult::Pending,
            Self::Err(e) => AsyncResult::Err(f(e)),
            Self::Ok(value) => AsyncResult::Ok(value),
        }
    }

    /// Run a fallible transform on the `Ok` payload.
    ///
    /// A failing transform turns the value into `Err`; the other tags pass
    /// through unchanged.
    pub fn try_map<U, F>(self, f: impl FnOnce(T) -> Result<U, F>) -> AsyncResult<U, E>
    where
        F: Into<E>,
    {
        match self {
            Self::Init => AsyncResult::Init,
            Self::Pending => AsyncResult::Pending,
            Self::Err(e) => AsyncResult::Err(e),
            Self::Ok(value) => match f(value) {
                Ok(mapped) => AsyncResult::Ok(mapped),
                Err(e) => AsyncResult::Err(e.into()),
            },
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// `Init -> Pending -> (Err | Ok)` and `(Err | Ok) -> Pending` on retry.
    pub fn can_transition_to<U, F>(&self, next: &AsyncResult<U, F>) -> bool {
        matches!(
            (self.tag(), next.tag()),
            (Tag::Init, Tag::Pending)
                | (Tag::Pending, Tag::Err)
                | (Tag::Pending, Tag::Ok)
                | (Tag::Err, Tag::Pending)
                | (Tag::Ok, Tag::Pending)
        )
    }
}

impl<T, E> From<Result<T, E>> for AsyncResult<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Err(e),
        }
    }
}
