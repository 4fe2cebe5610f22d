// ── Wrapper factory ──
//
// Builds wrappers from live handles. Construction reads everything the
// wrapper caches up front; if any of it is missing the object is treated
// as already gone.

use tracing::trace;

use crate::context::MidiContext;
use crate::error::{CoreError, SourceError};
use crate::model::{Category, Handle, MidiObject, ObjectCore};
use crate::wrapper::Wrapper;

/// Constructs wrappers for one category.
pub trait WrapperFactory {
    type Output: Wrapper;

    /// Category this factory builds wrappers for.
    fn category(&self) -> Category;

    /// Build a wrapper for `handle`, which must currently resolve.
    fn create(&self, ctx: &MidiContext, handle: Handle) -> Result<Self::Output, CoreError>;
}

/// Default factory selecting the [`MidiObject`] variant by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryFactory {
    category: Category,
}

impl CategoryFactory {
    pub fn new(category: Category) -> Self {
        Self { category }
    }
}

impl WrapperFactory for CategoryFactory {
    type Output = MidiObject;

    fn category(&self) -> Category {
        self.category
    }

    fn create(&self, ctx: &MidiContext, handle: Handle) -> Result<MidiObject, CoreError> {
        if handle.is_null() {
            return Err(CoreError::ObjectVanished { handle });
        }

        let unique_id = ctx.resolve_unique_id(handle).map_err(|e| vanished(handle, e))?;
        let properties = ctx.properties(handle).map_err(|e| vanished(handle, e))?;
        let parent = ctx.parent(handle).map_err(|e| vanished(handle, e))?;
        trace!(%handle, %unique_id, category = %self.category, "wrapping object");

        let core = ObjectCore::new(handle, unique_id, parent, properties);
        Ok(MidiObject::build(self.category, core))
    }
}

/// Lookup failures on a handle mean the object is gone; anything else is
/// passed through unchanged.
fn vanished(handle: Handle, err: SourceError) -> CoreError {
    match err {
        SourceError::ObjectNotFound { .. } => CoreError::ObjectVanished { handle },
        other => CoreError::Source(other),
    }
}
