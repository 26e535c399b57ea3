//! Values that are not known until the provisioning engine completes its work.
//!
//! A [`Deferred`] is a cheaply clonable handle to a shared future. The build
//! orchestrator and the resolvers only ever move and clone deferred values; they
//! never poll them. Whoever owns the provisioning engine decides when to await them,
//! typically after every declaration has been issued.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::Scalar;

/// Failure of a deferred value, reported by the provisioning engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("deferred value '{label}' failed: {reason}")]
pub struct DeferredError {
    /// Label of the deferred value
    pub label: String,
    /// Why it failed
    pub reason: String,
}

type DeferredFuture = BoxFuture<'static, Result<Scalar, DeferredError>>;

/// A value owned by the provisioning engine that may not be known yet.
///
/// Two `Deferred` values are equal when they are clones of the same handle.
#[derive(Clone)]
pub struct Deferred {
    id: Uuid,
    label: Arc<str>,
    inner: Shared<DeferredFuture>,
}

impl Deferred {
    /// Wrap a future that produces the value.
    pub fn new<F>(label: impl Into<Arc<str>>, future: F) -> Self
    where
        F: Future<Output = Result<Scalar, DeferredError>> + Send + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            inner: future.boxed().shared(),
        }
    }

    /// A deferred value that is already known.
    pub fn ready(label: impl Into<Arc<str>>, value: Scalar) -> Self {
        let deferred = Self::new(label, futures::future::ready(Ok(value)));
        // Polls a ready future once so `peek` sees the value.
        let _ = deferred.inner.clone().now_or_never();
        deferred
    }

    /// Derive a new deferred value from this one.
    ///
    /// The result completes when `self` completes, and fails when `self` fails.
    #[must_use]
    pub fn map<F>(&self, label: impl Into<Arc<str>>, f: F) -> Self
    where
        F: FnOnce(Scalar) -> Scalar + Send + 'static,
    {
        let source = self.inner.clone();
        Self::new(label, async move { source.await.map(f) })
    }

    /// Identity of this handle.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Human-readable label, e.g. `vpc-01.id`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The outcome, if the value has already completed.
    ///
    /// Never polls the future.
    #[must_use]
    pub fn peek(&self) -> Option<&Result<Scalar, DeferredError>> {
        self.inner.peek()
    }

    /// Whether the value has completed.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.peek().is_some()
    }

    /// Wait for the value.
    ///
    /// Only the provisioning engine's owner calls this; the build core never does.
    ///
    /// # Errors
    ///
    /// The [`DeferredError`] the engine completed the value with.
    pub async fn resolve(&self) -> Result<Scalar, DeferredError> {
        self.inner.clone().await
    }
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(Ok(value)) => write!(f, "Deferred({} = {value:?})", self.label),
            Some(Err(err)) => write!(f, "Deferred({} failed: {})", self.label, err.reason),
            None => write!(f, "Deferred({} pending)", self.label),
        }
    }
}
