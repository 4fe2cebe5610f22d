// ── In-memory handle source ──
//
// Stand-in for the platform MIDI subsystem. Objects live in per-category
// ordered lists; mutators return the notification a real subsystem would
// deliver so callers decide whether (and when) to forward it.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::SourceError;
use crate::model::{Category, Handle, ParentRef, PropertySet, PropertyValue, UniqueId, names};
use crate::source::{HandleSource, SourceNotification};

#[derive(Debug, Clone)]
struct SimObject {
    category: Category,
    unique_id: UniqueId,
    properties: PropertySet,
    parent: Option<ParentRef>,
}

#[derive(Debug, Default)]
struct SimState {
    objects: HashMap<Handle, SimObject>,
    order: HashMap<Category, Vec<Handle>>,
    next_handle: u32,
    /// Handles that enumerate but fail every lookup.
    flaky: HashSet<Handle>,
}

impl SimState {
    fn allocate(&mut self) -> Handle {
        loop {
            self.next_handle = self.next_handle.wrapping_add(1);
            let candidate = Handle::new(self.next_handle);
            if !candidate.is_null() && !self.objects.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn lookup(&self, handle: Handle) -> Result<&SimObject, SourceError> {
        if self.flaky.contains(&handle) {
            return Err(SourceError::ObjectNotFound { handle });
        }
        self.objects
            .get(&handle)
            .ok_or(SourceError::ObjectNotFound { handle })
    }
}

/// Thread-safe in-memory [`HandleSource`].
#[derive(Debug, Default)]
pub struct SimulatedSource {
    state: Mutex<SimState>,
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Mutators ─────────────────────────────────────────────────────

    /// Append a new object under a freshly allocated handle.
    pub fn insert(
        &self,
        category: Category,
        unique_id: UniqueId,
        properties: PropertySet,
        parent: Option<ParentRef>,
    ) -> Handle {
        let mut state = self.state();
        let handle = state.allocate();
        state.objects.insert(
            handle,
            SimObject {
                category,
                unique_id,
                properties,
                parent,
            },
        );
        state.order.entry(category).or_default().push(handle);
        handle
    }

    /// Append a new object and return the matching `Added` notification.
    pub fn add(
        &self,
        category: Category,
        unique_id: UniqueId,
        properties: PropertySet,
        parent: Option<ParentRef>,
    ) -> (Handle, SourceNotification) {
        let handle = self.insert(category, unique_id, properties, parent);
        (
            handle,
            SourceNotification::Added {
                handle,
                category,
                parent,
            },
        )
    }

    /// Put a different object behind an existing (or previously used)
    /// handle, the way a source recycles handle values.
    ///
    /// A live object behind `handle` is replaced in place, keeping its
    /// position; otherwise the object is appended.
    pub fn reuse_handle(
        &self,
        handle: Handle,
        category: Category,
        unique_id: UniqueId,
        properties: PropertySet,
        parent: Option<ParentRef>,
    ) {
        let mut state = self.state();
        let previous = state.objects.insert(
            handle,
            SimObject {
                category,
                unique_id,
                properties,
                parent,
            },
        );
        match previous {
            Some(old) if old.category == category => {}
            Some(old) => {
                if let Some(list) = state.order.get_mut(&old.category) {
                    list.retain(|h| *h != handle);
                }
                state.order.entry(category).or_default().push(handle);
            }
            None => state.order.entry(category).or_default().push(handle),
        }
        state.flaky.remove(&handle);
    }

    /// Remove an object. Returns the `Removed` notification if it existed.
    pub fn remove(&self, handle: Handle) -> Option<SourceNotification> {
        let mut state = self.state();
        let object = state.objects.remove(&handle)?;
        if let Some(list) = state.order.get_mut(&object.category) {
            list.retain(|h| *h != handle);
        }
        state.flaky.remove(&handle);
        Some(SourceNotification::Removed {
            handle,
            category: object.category,
            parent: object.parent,
        })
    }

    /// Set a property. Returns the `PropertyChanged` notification if the
    /// object exists.
    pub fn set_property(
        &self,
        handle: Handle,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Option<SourceNotification> {
        let mut state = self.state();
        let object = state.objects.get_mut(&handle)?;
        if name == names::UNIQUE_ID {
            if let PropertyValue::Integer(raw) = value.into() {
                object.unique_id = UniqueId::new(raw);
            }
        } else {
            object.properties.insert(name, value);
        }
        Some(SourceNotification::PropertyChanged {
            handle,
            property: name.to_owned(),
        })
    }

    /// Drop a property. Returns the `PropertyChanged` notification if the
    /// object exists.
    pub fn clear_property(&self, handle: Handle, name: &str) -> Option<SourceNotification> {
        let mut state = self.state();
        let object = state.objects.get_mut(&handle)?;
        object.properties.remove(name);
        Some(SourceNotification::PropertyChanged {
            handle,
            property: name.to_owned(),
        })
    }

    /// Move an object to `position` within its category's order.
    pub fn move_to(&self, handle: Handle, position: usize) -> bool {
        let mut state = self.state();
        let Some(category) = state.objects.get(&handle).map(|o| o.category) else {
            return false;
        };
        let list = state.order.entry(category).or_default();
        list.retain(|h| *h != handle);
        let position = position.min(list.len());
        list.insert(position, handle);
        true
    }

    /// Make `handle` enumerate normally but fail every lookup, as if the
    /// object vanished right after enumeration.
    pub fn set_flaky(&self, handle: Handle, flaky: bool) {
        let mut state = self.state();
        if flaky {
            state.flaky.insert(handle);
        } else {
            state.flaky.remove(&handle);
        }
    }

    /// Notification a real source sends when the object graph changed in bulk.
    pub fn setup_changed(&self) -> SourceNotification {
        SourceNotification::SetupChanged
    }

    pub fn len(&self) -> usize {
        self.state().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().objects.is_empty()
    }
}

impl HandleSource for SimulatedSource {
    fn object_count(&self, category: Category) -> usize {
        self.state().order.get(&category).map_or(0, Vec::len)
    }

    fn object_at(&self, category: Category, index: usize) -> Handle {
        self.state()
            .order
            .get(&category)
            .and_then(|list| list.get(index).copied())
            .unwrap_or(Handle::NULL)
    }

    fn enumerate(&self, category: Category) -> Vec<Handle> {
        self.state().order.get(&category).cloned().unwrap_or_default()
    }

    fn unique_id(&self, handle: Handle) -> Result<UniqueId, SourceError> {
        self.state().lookup(handle).map(|o| o.unique_id)
    }

    fn property(&self, handle: Handle, name: &str) -> Result<PropertyValue, SourceError> {
        let state = self.state();
        let object = state.lookup(handle)?;
        if name == names::UNIQUE_ID {
            return Ok(PropertyValue::Integer(object.unique_id.raw()));
        }
        object
            .properties
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::PropertyNotFound {
                handle,
                property: name.to_owned(),
            })
    }

    fn properties(&self, handle: Handle) -> Result<PropertySet, SourceError> {
        self.state().lookup(handle).map(|o| o.properties.clone())
    }

    fn parent(&self, handle: Handle) -> Result<Option<ParentRef>, SourceError> {
        self.state().lookup(handle).map(|o| o.parent)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn props(name: &str) -> PropertySet {
        [(names::NAME, name)].into_iter().collect()
    }

    #[test]
    fn enumerates_per_category_in_insertion_order() {
        let source = SimulatedSource::new();
        let a = source.insert(Category::Source, UniqueId::new(1), props("a"), None);
        let _d = source.insert(Category::Destination, UniqueId::new(2), props("d"), None);
        let b = source.insert(Category::Source, UniqueId::new(3), props("b"), None);

        assert_eq!(source.enumerate(Category::Source), vec![a, b]);
        assert_eq!(source.object_count(Category::Destination), 1);
        assert_eq!(source.object_at(Category::Source, 5), Handle::NULL);
    }

    #[test]
    fn remove_returns_notification_once() {
        let source = SimulatedSource::new();
        let h = source.insert(Category::Device, UniqueId::new(1), props("x"), None);
        assert!(matches!(
            source.remove(h),
            Some(SourceNotification::Removed { category: Category::Device, .. })
        ));
        assert_eq!(source.remove(h), None);
        assert!(source.unique_id(h).is_err());
    }

    #[test]
    fn reuse_handle_keeps_position_and_changes_identity() {
        let source = SimulatedSource::new();
        let a = source.insert(Category::Device, UniqueId::new(1), props("a"), None);
        let b = source.insert(Category::Device, UniqueId::new(2), props("b"), None);
        source.reuse_handle(a, Category::Device, UniqueId::new(9), props("a2"), None);

        assert_eq!(source.enumerate(Category::Device), vec![a, b]);
        assert_eq!(source.unique_id(a).unwrap(), UniqueId::new(9));
    }

    #[test]
    fn flaky_handles_enumerate_but_fail_lookup() {
        let source = SimulatedSource::new();
        let h = source.insert(Category::Entity, UniqueId::new(4), props("e"), None);
        source.set_flaky(h, true);
        assert_eq!(source.enumerate(Category::Entity), vec![h]);
        assert_eq!(
            source.unique_id(h),
            Err(SourceError::ObjectNotFound { handle: h })
        );
        source.set_flaky(h, false);
        assert_eq!(source.unique_id(h).unwrap(), UniqueId::new(4));
    }

    #[test]
    fn unique_id_property_rewrites_identity() {
        let source = SimulatedSource::new();
        let h = source.insert(Category::Source, UniqueId::new(1), props("s"), None);
        source.set_property(h, names::UNIQUE_ID, 77);
        assert_eq!(source.unique_id(h).unwrap(), UniqueId::new(77));
        assert_eq!(
            source.property(h, names::UNIQUE_ID).unwrap(),
            PropertyValue::Integer(77)
        );
    }

    #[test]
    fn move_to_reorders_within_category() {
        let source = SimulatedSource::new();
        let a = source.insert(Category::Source, UniqueId::new(1), props("a"), None);
        let b = source.insert(Category::Source, UniqueId::new(2), props("b"), None);
        assert!(source.move_to(b, 0));
        assert_eq!(source.enumerate(Category::Source), vec![b, a]);
    }
}
