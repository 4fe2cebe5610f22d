// ── Handle source contract ──
//
// The platform enumeration/notification subsystem is an external
// collaborator. Everything the mirror needs from it goes through this
// trait; `sim::SimulatedSource` is the in-memory implementation.

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::model::{Category, Handle, ParentRef, PropertySet, PropertyValue, UniqueId};

/// Read access to the live object graph of the external source.
///
/// Every method is a fast, non-blocking query. Any handle-based query may
/// fail because the object vanished after it was enumerated.
pub trait HandleSource: Send + Sync {
    /// Number of live objects of `category`.
    fn object_count(&self, category: Category) -> usize;

    /// Handle at `index` in the source's order, or [`Handle::NULL`] if the
    /// slot is empty (the object vanished between count and subscript).
    fn object_at(&self, category: Category, index: usize) -> Handle;

    /// Current ordered handle list for `category`. Null slots are skipped.
    fn enumerate(&self, category: Category) -> Vec<Handle> {
        (0..self.object_count(category))
            .map(|index| self.object_at(category, index))
            .filter(|handle| !handle.is_null())
            .collect()
    }

    /// Resolve the unique id currently behind `handle`.
    fn unique_id(&self, handle: Handle) -> Result<UniqueId, SourceError>;

    /// Read a single property.
    fn property(&self, handle: Handle, name: &str) -> Result<PropertyValue, SourceError>;

    /// Read every property the object carries.
    fn properties(&self, handle: Handle) -> Result<PropertySet, SourceError>;

    /// Owning object, if the category has one.
    fn parent(&self, _handle: Handle) -> Result<Option<ParentRef>, SourceError> {
        Ok(None)
    }
}

// ── Notifications ───────────────────────────────────────────────────

/// A single event delivered by the source's notification path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceNotification {
    /// A new object appeared under `parent`.
    Added {
        handle: Handle,
        category: Category,
        parent: Option<ParentRef>,
    },
    /// An object disappeared. Its handle no longer resolves.
    Removed {
        handle: Handle,
        category: Category,
        parent: Option<ParentRef>,
    },
    /// A property on a live object changed.
    PropertyChanged { handle: Handle, property: String },
    /// Something changed in bulk; every list must be re-enumerated.
    SetupChanged,
}

impl SourceNotification {
    /// Handle the notification is about, if it is a point notification.
    pub fn handle(&self) -> Option<Handle> {
        match self {
            Self::Added { handle, .. }
            | Self::Removed { handle, .. }
            | Self::PropertyChanged { handle, .. } => Some(*handle),
            Self::SetupChanged => None,
        }
    }
}
