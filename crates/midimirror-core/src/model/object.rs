// ── Wrapper variants ──
//
// The closed set of wrapper kinds the mirror builds. Every variant shares
// an `ObjectCore` (identity plus a swappable property snapshot); endpoints
// additionally cache a derived display name.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use serde::Serialize;
use tracing::debug;

use super::category::Category;
use super::id::{Handle, ParentRef, UniqueId};
use super::property::{PropertySet, names};
use crate::context::MidiContext;
use crate::error::SourceError;
use crate::wrapper::Wrapper;

// ── ObjectCore ──────────────────────────────────────────────────────

/// Identity and cached properties shared by every wrapper kind.
#[derive(Debug)]
pub struct ObjectCore {
    handle: Handle,
    unique_id: UniqueId,
    parent: Option<ParentRef>,
    properties: ArcSwap<PropertySet>,
}

impl ObjectCore {
    pub fn new(
        handle: Handle,
        unique_id: UniqueId,
        parent: Option<ParentRef>,
        properties: PropertySet,
    ) -> Self {
        Self {
            handle,
            unique_id,
            parent,
            properties: ArcSwap::from_pointee(properties),
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn unique_id(&self) -> UniqueId {
        self.unique_id
    }

    pub fn parent(&self) -> Option<ParentRef> {
        self.parent
    }

    /// Current property snapshot (cheap `Arc` clone).
    pub fn properties(&self) -> Arc<PropertySet> {
        self.properties.load_full()
    }

    pub fn name(&self) -> Option<String> {
        self.properties.load().string(names::NAME).map(str::to_owned)
    }

    pub fn is_offline(&self) -> bool {
        self.properties.load().flag(names::OFFLINE)
    }

    /// Re-read one property from the source into the snapshot.
    ///
    /// A property the object no longer carries is dropped. Any other
    /// failure keeps the previous value. Returns whether the snapshot changed.
    fn refresh(&self, ctx: &MidiContext, property: &str) -> bool {
        match ctx.property(self.handle, property) {
            Ok(value) => {
                if self.properties.load().get(property) == Some(&value) {
                    return false;
                }
                self.properties.rcu(|current| {
                    let mut next = PropertySet::clone(current);
                    next.insert(property, value.clone());
                    next
                });
                true
            }
            Err(SourceError::PropertyNotFound { .. }) => {
                if self.properties.load().get(property).is_none() {
                    return false;
                }
                self.properties.rcu(|current| {
                    let mut next = PropertySet::clone(current);
                    next.remove(property);
                    next
                });
                true
            }
            Err(e) => {
                debug!(handle = %self.handle, property, error = %e, "property refresh failed, keeping cached value");
                false
            }
        }
    }
}

// ── DeviceObject ────────────────────────────────────────────────────

/// A device or external device.
#[derive(Debug)]
pub struct DeviceObject {
    core: ObjectCore,
}

impl DeviceObject {
    pub fn new(core: ObjectCore) -> Self {
        Self { core }
    }

    pub fn core(&self) -> &ObjectCore {
        &self.core
    }

    pub fn manufacturer(&self) -> Option<String> {
        self.core
            .properties()
            .string(names::MANUFACTURER)
            .map(str::to_owned)
    }

    pub fn model(&self) -> Option<String> {
        self.core.properties().string(names::MODEL).map(str::to_owned)
    }
}

// ── EntityObject ────────────────────────────────────────────────────

/// A group of endpoints within a device.
#[derive(Debug)]
pub struct EntityObject {
    core: ObjectCore,
}

impl EntityObject {
    pub fn new(core: ObjectCore) -> Self {
        Self { core }
    }

    pub fn core(&self) -> &ObjectCore {
        &self.core
    }
}

// ── EndpointObject ──────────────────────────────────────────────────

/// A source or destination endpoint.
#[derive(Debug)]
pub struct EndpointObject {
    core: ObjectCore,
    display_name: ArcSwapOption<String>,
}

impl EndpointObject {
    pub fn new(core: ObjectCore) -> Self {
        let display_name = ArcSwapOption::from(derive_display_name(&core.properties()).map(Arc::new));
        Self { core, display_name }
    }

    pub fn core(&self) -> &ObjectCore {
        &self.core
    }

    /// `displayName` if the source provides one, otherwise `name`.
    pub fn display_name(&self) -> Option<String> {
        self.display_name.load_full().map(|name| (*name).clone())
    }

    pub fn is_private(&self) -> bool {
        self.core.properties().flag(names::PRIVATE)
    }

    fn recompute_display_name(&self) {
        let derived = derive_display_name(&self.core.properties());
        self.display_name.store(derived.map(Arc::new));
    }
}

fn derive_display_name(properties: &PropertySet) -> Option<String> {
    properties
        .string(names::DISPLAY_NAME)
        .or_else(|| properties.string(names::NAME))
        .map(str::to_owned)
}

// ── MidiObject ──────────────────────────────────────────────────────

/// The wrapper the mirror caches, one variant per [`Category`].
#[derive(Debug)]
pub enum MidiObject {
    Device(DeviceObject),
    ExternalDevice(DeviceObject),
    Entity(EntityObject),
    Source(EndpointObject),
    Destination(EndpointObject),
}

impl MidiObject {
    /// Build the variant matching `category` around `core`.
    pub fn build(category: Category, core: ObjectCore) -> Self {
        match category {
            Category::Device => Self::Device(DeviceObject::new(core)),
            Category::ExternalDevice => Self::ExternalDevice(DeviceObject::new(core)),
            Category::Entity => Self::Entity(EntityObject::new(core)),
            Category::Source => Self::Source(EndpointObject::new(core)),
            Category::Destination => Self::Destination(EndpointObject::new(core)),
        }
    }

    pub fn core(&self) -> &ObjectCore {
        match self {
            Self::Device(d) | Self::ExternalDevice(d) => d.core(),
            Self::Entity(e) => e.core(),
            Self::Source(ep) | Self::Destination(ep) => ep.core(),
        }
    }

    pub fn as_device(&self) -> Option<&DeviceObject> {
        match self {
            Self::Device(d) | Self::ExternalDevice(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_endpoint(&self) -> Option<&EndpointObject> {
        match self {
            Self::Source(ep) | Self::Destination(ep) => Some(ep),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<String> {
        self.core().name()
    }

    /// Name as shown to users: the endpoint display name where there is one.
    pub fn label(&self) -> Option<String> {
        self.as_endpoint()
            .and_then(EndpointObject::display_name)
            .or_else(|| self.name())
    }

    /// Serializable point-in-time view of this wrapper.
    pub fn summary(&self) -> ObjectSummary {
        let core = self.core();
        ObjectSummary {
            category: self.category(),
            handle: core.handle(),
            unique_id: core.unique_id(),
            name: self.label(),
            parent: core.parent(),
            offline: core.is_offline(),
            properties: PropertySet::clone(&core.properties()),
        }
    }
}

impl Wrapper for MidiObject {
    fn handle(&self) -> Handle {
        self.core().handle()
    }

    fn unique_id(&self) -> UniqueId {
        self.core().unique_id()
    }

    fn category(&self) -> Category {
        match self {
            Self::Device(_) => Category::Device,
            Self::ExternalDevice(_) => Category::ExternalDevice,
            Self::Entity(_) => Category::Entity,
            Self::Source(_) => Category::Source,
            Self::Destination(_) => Category::Destination,
        }
    }

    fn property_changed(&self, ctx: &MidiContext, property: &str) {
        let changed = self.core().refresh(ctx, property);
        if let Some(endpoint) = self.as_endpoint() {
            if changed && (property == names::NAME || property == names::DISPLAY_NAME) {
                endpoint.recompute_display_name();
            }
        }
    }
}

/// Flattened wrapper state for rendering and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub category: Category,
    pub handle: Handle,
    pub unique_id: UniqueId,
    pub name: Option<String>,
    pub parent: Option<ParentRef>,
    pub offline: bool,
    pub properties: PropertySet,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sim::SimulatedSource;

    fn endpoint_fixture() -> (Arc<SimulatedSource>, MidiContext, MidiObject) {
        let source = Arc::new(SimulatedSource::new());
        let handle = source.insert(
            Category::Source,
            UniqueId::new(11),
            [("name", "Out 1")].into_iter().collect(),
            None,
        );
        let ctx = MidiContext::new("test", source.clone());
        let core = ObjectCore::new(
            handle,
            UniqueId::new(11),
            None,
            ctx.properties(handle).unwrap(),
        );
        (source, ctx, MidiObject::build(Category::Source, core))
    }

    #[test]
    fn build_picks_variant_by_category() {
        let core = ObjectCore::new(Handle::new(1), UniqueId::new(1), None, PropertySet::new());
        let obj = MidiObject::build(Category::ExternalDevice, core);
        assert_eq!(obj.category(), Category::ExternalDevice);
        assert!(obj.as_device().is_some());
        assert!(obj.as_endpoint().is_none());
    }

    #[test]
    fn display_name_falls_back_to_name() {
        let (_source, _ctx, obj) = endpoint_fixture();
        assert_eq!(obj.label().as_deref(), Some("Out 1"));
    }

    #[test]
    fn property_change_refreshes_derived_display_name() {
        let (source, ctx, obj) = endpoint_fixture();
        source.set_property(obj.handle(), names::DISPLAY_NAME, "Synth Out 1");
        obj.property_changed(&ctx, names::DISPLAY_NAME);
        assert_eq!(obj.label().as_deref(), Some("Synth Out 1"));
        assert_eq!(obj.name().as_deref(), Some("Out 1"));
    }

    #[test]
    fn removed_property_is_dropped_from_snapshot() {
        let (source, ctx, obj) = endpoint_fixture();
        source.clear_property(obj.handle(), names::NAME);
        obj.property_changed(&ctx, names::NAME);
        assert_eq!(obj.name(), None);
        assert_eq!(obj.label(), None);
    }

    #[test]
    fn refresh_on_vanished_object_keeps_cached_value() {
        let (source, ctx, obj) = endpoint_fixture();
        source.remove(obj.handle());
        obj.property_changed(&ctx, names::NAME);
        assert_eq!(obj.name().as_deref(), Some("Out 1"));
    }

    #[test]
    fn summary_flattens_state() {
        let (_source, _ctx, obj) = endpoint_fixture();
        let summary = obj.summary();
        assert_eq!(summary.category, Category::Source);
        assert_eq!(summary.unique_id, UniqueId::new(11));
        assert_eq!(summary.name.as_deref(), Some("Out 1"));
        assert!(!summary.offline);
    }
}
