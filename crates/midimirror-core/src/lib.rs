//! Reconciliation engine that mirrors an external MIDI object graph into
//! ordered, identity-stable wrapper caches.
//!
//! The external subsystem names objects by short-lived [`Handle`]s and a
//! durable [`UniqueId`]. This crate keeps one list per [`Category`] in step
//! with it:
//!
//! - **[`ObjectList`]**: One category's cache plus the dispatcher for point
//!   notifications ([`object_was_added`](ObjectList::object_was_added),
//!   [`object_was_removed`](ObjectList::object_was_removed),
//!   [`object_property_changed`](ObjectList::object_property_changed)) and
//!   full passes ([`update_list`](ObjectList::update_list)). Adds are
//!   two-phase through [`PendingAdd`].
//!
//! - **[`reconcile`]**: The full pass: diffs a fresh enumeration against the
//!   cache, carries surviving wrappers over as the same `Arc`, rebuilds
//!   handles that were reused, and drops everything else.
//!
//! - **[`Mirror`]**: Owns the lists for one [`MidiContext`] and routes
//!   [`SourceNotification`]s to them. [`NotificationPump`] runs a mirror on
//!   its own tokio task.
//!
//! - **[`ObjectObserver`]**: Synchronous callbacks for net changes.
//!   [`BroadcastObserver`] republishes them on a `broadcast` channel and
//!   [`ObjectStream`] exposes `watch`-backed snapshots of each cache.
//!
//! - **[`HandleSource`]**: The seam to the external subsystem.
//!   [`SimulatedSource`] is an in-memory implementation.

pub mod context;
pub mod error;
pub mod factory;
pub mod list;
pub mod mirror;
pub mod model;
pub mod observer;
pub mod pump;
pub mod sim;
pub mod source;
pub mod store;
pub mod stream;
pub mod wrapper;

// ── Primary re-exports ──────────────────────────────────────────────
pub use context::MidiContext;
pub use error::{CoreError, SourceError};
pub use factory::{CategoryFactory, WrapperFactory};
pub use list::{ObjectList, PendingAdd};
pub use mirror::Mirror;
pub use observer::{BroadcastObserver, EventLog, MirrorEvent, ObjectObserver};
pub use pump::{NotificationPump, NotificationSender};
pub use sim::SimulatedSource;
pub use source::{HandleSource, SourceNotification};
pub use store::{ObjectCache, ReconcileOutcome, SkipReason, SkippedHandle, reconcile};
pub use stream::{ObjectStream, ObjectWatchStream};
pub use wrapper::Wrapper;

pub use model::{
    Category, DeviceObject, EndpointObject, EntityObject, Handle, MidiObject, ObjectCore,
    ObjectSummary, ParentRef, PropertySet, PropertyValue, UniqueId, names,
};
