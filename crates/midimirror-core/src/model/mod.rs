// ── Domain model ──
//
// Identity types, categories, properties, and the closed set of wrapper
// variants the mirror keeps in its caches.

pub mod category;
pub mod id;
pub mod object;
pub mod property;

// ── Re-exports ──────────────────────────────────────────────────────

pub use category::Category;
pub use id::{Handle, ParentRef, UniqueId};
pub use object::{DeviceObject, EndpointObject, EntityObject, MidiObject, ObjectCore, ObjectSummary};
pub use property::{PropertySet, PropertyValue, names};
