// ── Mirror context ──
//
// Explicit replacement for a process-wide client context. The caller owns
// its lifecycle and passes it to every operation.

use std::fmt;
use std::sync::Arc;

use crate::error::SourceError;
use crate::model::{Category, Handle, ParentRef, PropertySet, PropertyValue, UniqueId};
use crate::source::HandleSource;

/// Client identity plus the handle source it talks to.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct MidiContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    client_name: String,
    source: Arc<dyn HandleSource>,
}

impl MidiContext {
    pub fn new(client_name: impl Into<String>, source: Arc<dyn HandleSource>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                client_name: client_name.into(),
                source,
            }),
        }
    }

    pub fn client_name(&self) -> &str {
        &self.inner.client_name
    }

    pub fn source(&self) -> &dyn HandleSource {
        self.inner.source.as_ref()
    }

    // ── Source passthroughs ──────────────────────────────────────────

    pub fn enumerate(&self, category: Category) -> Vec<Handle> {
        self.inner.source.enumerate(category)
    }

    pub fn resolve_unique_id(&self, handle: Handle) -> Result<UniqueId, SourceError> {
        self.inner.source.unique_id(handle)
    }

    pub fn property(&self, handle: Handle, name: &str) -> Result<PropertyValue, SourceError> {
        self.inner.source.property(handle, name)
    }

    pub fn properties(&self, handle: Handle) -> Result<PropertySet, SourceError> {
        self.inner.source.properties(handle)
    }

    pub fn parent(&self, handle: Handle) -> Result<Option<ParentRef>, SourceError> {
        self.inner.source.parent(handle)
    }
}

impl fmt::Debug for MidiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiContext")
            .field("client_name", &self.inner.client_name)
            .finish_non_exhaustive()
    }
}
