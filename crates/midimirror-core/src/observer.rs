// ── Outward observers ──
//
// Callbacks run synchronously on the notification path, after the cache
// mutation they describe has completed.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::model::Category;

/// Receives net changes for mirrored lists.
///
/// All methods default to no-ops so observers implement only what they
/// care about.
pub trait ObjectObserver<W>: Send + Sync {
    fn objects_added(&self, _category: Category, _objects: &[Arc<W>]) {}

    fn objects_removed(&self, _category: Category, _objects: &[Arc<W>]) {}

    fn property_changed(&self, _category: Category, _object: &Arc<W>, _property: &str) {}
}

// ── MirrorEvent ─────────────────────────────────────────────────────

/// Owned form of an observer callback.
pub enum MirrorEvent<W> {
    ObjectsAdded {
        category: Category,
        objects: Vec<Arc<W>>,
    },
    ObjectsRemoved {
        category: Category,
        objects: Vec<Arc<W>>,
    },
    PropertyChanged {
        category: Category,
        object: Arc<W>,
        property: String,
    },
}

impl<W> MirrorEvent<W> {
    pub fn category(&self) -> Category {
        match self {
            Self::ObjectsAdded { category, .. }
            | Self::ObjectsRemoved { category, .. }
            | Self::PropertyChanged { category, .. } => *category,
        }
    }

    /// Short label for logs and rendering.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ObjectsAdded { .. } => "added",
            Self::ObjectsRemoved { .. } => "removed",
            Self::PropertyChanged { .. } => "changed",
        }
    }

    /// Wrappers the event is about.
    pub fn objects(&self) -> &[Arc<W>] {
        match self {
            Self::ObjectsAdded { objects, .. } | Self::ObjectsRemoved { objects, .. } => objects,
            Self::PropertyChanged { object, .. } => std::slice::from_ref(object),
        }
    }
}

impl<W> Clone for MirrorEvent<W> {
    fn clone(&self) -> Self {
        match self {
            Self::ObjectsAdded { category, objects } => Self::ObjectsAdded {
                category: *category,
                objects: objects.clone(),
            },
            Self::ObjectsRemoved { category, objects } => Self::ObjectsRemoved {
                category: *category,
                objects: objects.clone(),
            },
            Self::PropertyChanged {
                category,
                object,
                property,
            } => Self::PropertyChanged {
                category: *category,
                object: Arc::clone(object),
                property: property.clone(),
            },
        }
    }
}

impl<W> fmt::Debug for MirrorEvent<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("MirrorEvent");
        s.field("kind", &self.kind())
            .field("category", &self.category())
            .field("count", &self.objects().len());
        if let Self::PropertyChanged { property, .. } = self {
            s.field("property", property);
        }
        s.finish()
    }
}

// ── BroadcastObserver ───────────────────────────────────────────────

/// Republishes callbacks on a `broadcast` channel for async consumers.
///
/// Sends with no live receiver are dropped silently.
pub struct BroadcastObserver<W> {
    tx: broadcast::Sender<MirrorEvent<W>>,
}

impl<W: Send + Sync + 'static> BroadcastObserver<W> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MirrorEvent<W>> {
        self.tx.subscribe()
    }
}

impl<W: Send + Sync + 'static> ObjectObserver<W> for BroadcastObserver<W> {
    fn objects_added(&self, category: Category, objects: &[Arc<W>]) {
        let _ = self.tx.send(MirrorEvent::ObjectsAdded {
            category,
            objects: objects.to_vec(),
        });
    }

    fn objects_removed(&self, category: Category, objects: &[Arc<W>]) {
        let _ = self.tx.send(MirrorEvent::ObjectsRemoved {
            category,
            objects: objects.to_vec(),
        });
    }

    fn property_changed(&self, category: Category, object: &Arc<W>, property: &str) {
        let _ = self.tx.send(MirrorEvent::PropertyChanged {
            category,
            object: Arc::clone(object),
            property: property.to_owned(),
        });
    }
}

// ── EventLog ────────────────────────────────────────────────────────

/// Observer that records every callback in order.
pub struct EventLog<W> {
    events: Mutex<Vec<MirrorEvent<W>>>,
}

impl<W> EventLog<W> {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, event: MirrorEvent<W>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Take everything recorded so far.
    pub fn drain(&self) -> Vec<MirrorEvent<W>> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<W> Default for EventLog<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Send + Sync> ObjectObserver<W> for EventLog<W> {
    fn objects_added(&self, category: Category, objects: &[Arc<W>]) {
        self.push(MirrorEvent::ObjectsAdded {
            category,
            objects: objects.to_vec(),
        });
    }

    fn objects_removed(&self, category: Category, objects: &[Arc<W>]) {
        self.push(MirrorEvent::ObjectsRemoved {
            category,
            objects: objects.to_vec(),
        });
    }

    fn property_changed(&self, category: Category, object: &Arc<W>, property: &str) {
        self.push(MirrorEvent::PropertyChanged {
            category,
            object: Arc::clone(object),
            property: property.to_owned(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn event_log_records_in_order() {
        let log: EventLog<u32> = EventLog::new();
        log.objects_removed(Category::Source, &[Arc::new(1)]);
        log.objects_added(Category::Source, &[Arc::new(2), Arc::new(3)]);
        log.property_changed(Category::Source, &Arc::new(2), "name");

        let events = log.drain();
        let kinds: Vec<_> = events.iter().map(MirrorEvent::kind).collect();
        assert_eq!(kinds, vec!["removed", "added", "changed"]);
        assert_eq!(events[1].objects().len(), 2);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn broadcast_observer_republishes() {
        let observer: BroadcastObserver<u32> = BroadcastObserver::new(8);
        let mut rx = observer.subscribe();
        observer.objects_added(Category::Device, &[Arc::new(7)]);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.category(), Category::Device);
        assert_eq!(*event.objects()[0], 7);
    }

    #[test]
    fn broadcast_without_receivers_is_silent() {
        let observer: BroadcastObserver<u32> = BroadcastObserver::new(1);
        observer.objects_removed(Category::Entity, &[Arc::new(1)]);
    }
}
