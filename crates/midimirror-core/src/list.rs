// ── Per-category object list ──
//
// Owns one category's cache, the factory that fills it, and the observers
// that hear about its net changes. Full passes and point notifications
// both go through here so observers see one consistent ordering of events.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use crate::context::MidiContext;
use crate::error::CoreError;
use crate::factory::WrapperFactory;
use crate::model::{Category, Handle, ParentRef, names};
use crate::observer::ObjectObserver;
use crate::store::{ObjectCache, ReconcileOutcome, reconcile};
use crate::stream::ObjectStream;
use crate::wrapper::Wrapper;

type Observer<W> = Arc<dyn ObjectObserver<W>>;

/// Mirrored list of one category's objects.
pub struct ObjectList<F: WrapperFactory> {
    factory: F,
    cache: ObjectCache<F::Output>,
    observers: Vec<Observer<F::Output>>,
    last_reconciled: Option<DateTime<Utc>>,
}

impl<F: WrapperFactory> ObjectList<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            cache: ObjectCache::new(),
            observers: Vec::new(),
            last_reconciled: None,
        }
    }

    pub fn category(&self) -> Category {
        self.factory.category()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Read access to the cached wrappers.
    pub fn cache(&self) -> &ObjectCache<F::Output> {
        &self.cache
    }

    pub fn get(&self, handle: Handle) -> Option<&Arc<F::Output>> {
        self.cache.get_by_handle(handle)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<F::Output>>> {
        self.cache.snapshot()
    }

    pub fn subscribe(&self) -> ObjectStream<F::Output> {
        ObjectStream::new(self.cache.subscribe())
    }

    /// When the last full pass completed.
    pub fn last_reconciled(&self) -> Option<DateTime<Utc>> {
        self.last_reconciled
    }

    pub fn add_observer(&mut self, observer: Observer<F::Output>) {
        self.observers.push(observer);
    }

    // ── Full pass ────────────────────────────────────────────────────

    /// Rebuild the cache from a fresh enumeration.
    ///
    /// Observers hear one batch afterwards: removals first, then additions,
    /// each only when non-empty.
    pub fn update_list(
        &mut self,
        ctx: &MidiContext,
    ) -> Result<ReconcileOutcome<F::Output>, CoreError> {
        let fresh = ctx.enumerate(self.category());
        let outcome = reconcile(ctx, &self.factory, &mut self.cache, &fresh)?;
        self.last_reconciled = Some(Utc::now());

        self.emit_removed(&outcome.removed);
        self.emit_added(&outcome.added);
        Ok(outcome)
    }

    // ── Point notifications ──────────────────────────────────────────

    /// First half of an add: build the wrapper without touching the cache.
    ///
    /// `Ok(None)` when there is nothing to add: the handle no longer
    /// resolves, the source fails while the wrapper is built, or it is
    /// already cached under the same unique id. Errors are limited to a
    /// factory building the wrong category.
    pub fn prepare_add<'a>(
        &'a mut self,
        ctx: &'a MidiContext,
        handle: Handle,
        parent: Option<ParentRef>,
    ) -> Result<Option<PendingAdd<'a, F>>, CoreError> {
        let category = self.category();

        if let Some(existing) = self.cache.get_by_handle(handle) {
            match ctx.resolve_unique_id(handle) {
                Ok(unique_id) if unique_id == existing.unique_id() => {
                    trace!(%category, %handle, "duplicate add notification ignored");
                    return Ok(None);
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(%category, %handle, error = %e, "added object already gone");
                    return Ok(None);
                }
            }
        }

        let wrapper = match self.factory.create(ctx, handle) {
            Ok(wrapper) => Arc::new(wrapper),
            Err(e) if e.is_transient() => {
                debug!(%category, %handle, error = %e, "added object already gone");
                return Ok(None);
            }
            Err(e) => {
                warn!(%category, %handle, error = %e, "could not wrap added object, skipping");
                return Ok(None);
            }
        };

        if wrapper.category() != category {
            return Err(CoreError::CategoryMismatch {
                expected: category,
                actual: wrapper.category(),
            });
        }

        trace!(
            %category,
            %handle,
            unique_id = %wrapper.unique_id(),
            parent = ?parent.map(|p| p.to_string()),
            "add prepared"
        );
        Ok(Some(PendingAdd {
            list: self,
            ctx,
            wrapper,
        }))
    }

    /// Handle an "added" notification in one step.
    pub fn object_was_added(
        &mut self,
        ctx: &MidiContext,
        handle: Handle,
        parent: Option<ParentRef>,
    ) -> Result<Option<Arc<F::Output>>, CoreError> {
        match self.prepare_add(ctx, handle, parent)? {
            Some(pending) => pending.commit().map(Some),
            None => Ok(None),
        }
    }

    /// Handle a "removed" notification. Unknown handles are ignored, so
    /// repeated removals are harmless.
    pub fn object_was_removed(
        &mut self,
        ctx: &MidiContext,
        handle: Handle,
        parent: Option<ParentRef>,
    ) -> Option<Arc<F::Output>> {
        let category = self.category();
        let Some(unique_id) = self.cache.get_by_handle(handle).map(|w| w.unique_id()) else {
            trace!(%category, %handle, client = ctx.client_name(), "remove for uncached handle ignored");
            return None;
        };

        let removed = self.cache.remove(unique_id)?;
        trace!(
            %category,
            %handle,
            %unique_id,
            parent = ?parent.map(|p| p.to_string()),
            "object removed"
        );
        self.emit_removed(std::slice::from_ref(&removed));
        Some(removed)
    }

    /// Handle a "property changed" notification.
    ///
    /// A change to the unique id replaces the wrapper, since identity is
    /// fixed at construction. Anything else refreshes the cached wrapper in
    /// place and is passed on to observers.
    pub fn object_property_changed(
        &mut self,
        ctx: &MidiContext,
        handle: Handle,
        property: &str,
    ) -> Result<Option<Arc<F::Output>>, CoreError> {
        let category = self.category();
        let Some(wrapper) = self.cache.get_by_handle(handle).map(Arc::clone) else {
            trace!(%category, %handle, property, "property change for uncached handle ignored");
            return Ok(None);
        };

        if property == names::UNIQUE_ID {
            match ctx.resolve_unique_id(handle) {
                Ok(unique_id) if unique_id != wrapper.unique_id() => {
                    debug!(%category, %handle, old = %wrapper.unique_id(), new = %unique_id, "object changed identity");
                    return self.object_was_added(ctx, handle, None);
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(%category, %handle, error = %e, "object gone before identity check");
                    return Ok(None);
                }
            }
        }

        wrapper.property_changed(ctx, property);
        for observer in &self.observers {
            observer.property_changed(category, &wrapper, property);
        }
        Ok(Some(wrapper))
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Where `handle` belongs according to the source's current order.
    fn insertion_point(&self, ctx: &MidiContext, handle: Handle) -> usize {
        let fresh = ctx.enumerate(self.category());
        let Some(index) = fresh.iter().position(|h| *h == handle) else {
            return self.cache.len();
        };
        let preceding: HashSet<Handle> = fresh[..index].iter().copied().collect();
        self.cache
            .iter()
            .filter(|w| preceding.contains(&w.handle()))
            .count()
    }

    fn emit_added(&self, added: &[Arc<F::Output>]) {
        if added.is_empty() {
            return;
        }
        for observer in &self.observers {
            observer.objects_added(self.category(), added);
        }
    }

    fn emit_removed(&self, removed: &[Arc<F::Output>]) {
        if removed.is_empty() {
            return;
        }
        for observer in &self.observers {
            observer.objects_removed(self.category(), removed);
        }
    }
}

// ── PendingAdd ──────────────────────────────────────────────────────

/// A constructed wrapper waiting to be inserted.
///
/// Holds the list mutably, so nothing else can touch it until the add is
/// committed or dropped. Dropping abandons the add with no callback.
#[must_use = "a pending add does nothing until committed"]
pub struct PendingAdd<'a, F: WrapperFactory> {
    list: &'a mut ObjectList<F>,
    ctx: &'a MidiContext,
    wrapper: Arc<F::Output>,
}

impl<F: WrapperFactory> PendingAdd<'_, F> {
    /// The wrapper that will be inserted.
    pub fn wrapper(&self) -> &Arc<F::Output> {
        &self.wrapper
    }

    /// Insert the wrapper and notify observers.
    ///
    /// Any cached wrapper still holding the same handle or unique id is
    /// evicted first and reported as removed.
    pub fn commit(self) -> Result<Arc<F::Output>, CoreError> {
        let Self { list, ctx, wrapper } = self;
        let handle = wrapper.handle();
        let unique_id = wrapper.unique_id();

        let mut stale = Vec::new();
        if let Some(old_id) = list.cache.get_by_handle(handle).map(|w| w.unique_id()) {
            stale.extend(list.cache.remove(old_id));
        }
        stale.extend(list.cache.remove(unique_id));
        if !stale.is_empty() {
            debug!(category = %list.category(), %handle, %unique_id, evicted = stale.len(), "evicted stale wrappers");
        }

        let position = list.insertion_point(ctx, handle);
        list.cache.insert_at(position, Arc::clone(&wrapper))?;

        list.emit_removed(&stale);
        list.emit_added(std::slice::from_ref(&wrapper));
        Ok(wrapper)
    }
}
