// ── Mirror ──
//
// Top-level owner of the mirrored lists for one context. Routes source
// notifications to the list they concern.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::context::MidiContext;
use crate::error::CoreError;
use crate::factory::CategoryFactory;
use crate::list::ObjectList;
use crate::model::{Category, Handle, MidiObject};
use crate::observer::ObjectObserver;
use crate::source::SourceNotification;
use crate::store::ReconcileOutcome;
use crate::stream::ObjectStream;

/// Per-category lists of [`MidiObject`] wrappers kept in step with a source.
pub struct Mirror {
    ctx: MidiContext,
    lists: Vec<ObjectList<CategoryFactory>>,
    last_full_refresh: Option<DateTime<Utc>>,
}

impl Mirror {
    /// Mirror the given categories. Repeats are ignored; list order follows
    /// first appearance.
    pub fn new(ctx: MidiContext, categories: impl IntoIterator<Item = Category>) -> Self {
        let mut lists: Vec<ObjectList<CategoryFactory>> = Vec::new();
        for category in categories {
            if lists.iter().all(|l| l.category() != category) {
                lists.push(ObjectList::new(CategoryFactory::new(category)));
            }
        }
        Self {
            ctx,
            lists,
            last_full_refresh: None,
        }
    }

    /// Mirror every category.
    pub fn with_all_categories(ctx: MidiContext) -> Self {
        Self::new(ctx, Category::all())
    }

    pub fn context(&self) -> &MidiContext {
        &self.ctx
    }

    pub fn categories(&self) -> Vec<Category> {
        self.lists.iter().map(ObjectList::category).collect()
    }

    pub fn list(&self, category: Category) -> Option<&ObjectList<CategoryFactory>> {
        self.lists.iter().find(|l| l.category() == category)
    }

    pub fn list_mut(
        &mut self,
        category: Category,
    ) -> Result<&mut ObjectList<CategoryFactory>, CoreError> {
        self.lists
            .iter_mut()
            .find(|l| l.category() == category)
            .ok_or(CoreError::UnmirroredCategory { category })
    }

    pub fn subscribe(&self, category: Category) -> Option<ObjectStream<MidiObject>> {
        self.list(category).map(ObjectList::subscribe)
    }

    /// Register an observer on every mirrored list.
    pub fn add_observer(&mut self, observer: &Arc<dyn ObjectObserver<MidiObject>>) {
        for list in &mut self.lists {
            list.add_observer(Arc::clone(observer));
        }
    }

    /// Find a cached wrapper by handle in any list.
    pub fn find(&self, handle: Handle) -> Option<&Arc<MidiObject>> {
        self.lists.iter().find_map(|l| l.get(handle))
    }

    /// When every list was last rebuilt together.
    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_full_refresh
    }

    /// Total cached wrappers across all lists.
    pub fn len(&self) -> usize {
        self.lists.iter().map(ObjectList::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(ObjectList::is_empty)
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Run a full pass over every list, in mirror order.
    pub fn refresh_all(
        &mut self,
    ) -> Result<Vec<(Category, ReconcileOutcome<MidiObject>)>, CoreError> {
        let mut outcomes = Vec::with_capacity(self.lists.len());
        for list in &mut self.lists {
            let outcome = list.update_list(&self.ctx)?;
            outcomes.push((list.category(), outcome));
        }
        self.last_full_refresh = Some(Utc::now());
        debug!(
            lists = outcomes.len(),
            objects = self.len(),
            "full refresh complete"
        );
        Ok(outcomes)
    }

    /// Apply one notification from the source.
    ///
    /// Notifications about categories this mirror does not track are
    /// dropped, and source failures are absorbed as skips. Errors are
    /// limited to cache bookkeeping (duplicate ids, a handle already in
    /// use) and a factory building the wrong category.
    pub fn handle_notification(&mut self, notification: &SourceNotification) -> Result<(), CoreError> {
        match notification {
            SourceNotification::Added {
                handle,
                category,
                parent,
            } => {
                let Some(list) = route(&mut self.lists, *category) else {
                    return Ok(());
                };
                list.object_was_added(&self.ctx, *handle, *parent)?;
            }
            SourceNotification::Removed {
                handle,
                category,
                parent,
            } => {
                let Some(list) = route(&mut self.lists, *category) else {
                    return Ok(());
                };
                list.object_was_removed(&self.ctx, *handle, *parent);
            }
            SourceNotification::PropertyChanged { handle, property } => {
                let ctx = &self.ctx;
                match self.lists.iter_mut().find(|l| l.get(*handle).is_some()) {
                    Some(list) => {
                        list.object_property_changed(ctx, *handle, property)?;
                    }
                    None => trace!(%handle, property = %property, "property change for unmirrored object ignored"),
                }
            }
            SourceNotification::SetupChanged => {
                self.refresh_all()?;
            }
        }
        Ok(())
    }
}

/// The list for `category`, or `None` (trace-logged) when unmirrored.
fn route(
    lists: &mut [ObjectList<CategoryFactory>],
    category: Category,
) -> Option<&mut ObjectList<CategoryFactory>> {
    let found = lists.iter_mut().find(|l| l.category() == category);
    if found.is_none() {
        trace!(error = %CoreError::UnmirroredCategory { category }, "notification ignored");
    }
    found
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("client", &self.ctx.client_name())
            .field("categories", &self.categories())
            .field("objects", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{ParentRef, PropertySet, UniqueId, names};
    use crate::observer::EventLog;
    use crate::sim::SimulatedSource;
    use crate::wrapper::Wrapper;

    fn props(name: &str) -> PropertySet {
        [(names::NAME, name)].into_iter().collect()
    }

    fn fixture(categories: &[Category]) -> (Arc<SimulatedSource>, Mirror, Arc<EventLog<MidiObject>>) {
        let source = Arc::new(SimulatedSource::new());
        let ctx = MidiContext::new("test", source.clone());
        let mut mirror = Mirror::new(ctx, categories.iter().copied());
        let log = Arc::new(EventLog::new());
        let observer: Arc<dyn ObjectObserver<MidiObject>> = log.clone();
        mirror.add_observer(&observer);
        (source, mirror, log)
    }

    #[test]
    fn repeated_categories_collapse() {
        let (_, mirror, _) = fixture(&[Category::Source, Category::Device, Category::Source]);
        assert_eq!(mirror.categories(), vec![Category::Source, Category::Device]);
    }

    #[test]
    fn routes_added_and_removed_by_category() {
        let (source, mut mirror, log) = fixture(&[Category::Device, Category::Entity]);
        let (device, note) = source.add(Category::Device, UniqueId::new(1), props("dev"), None);
        mirror.handle_notification(&note).unwrap();

        let parent = Some(ParentRef {
            handle: device,
            category: Category::Device,
        });
        let (entity, note) = source.add(Category::Entity, UniqueId::new(2), props("ent"), parent);
        mirror.handle_notification(&note).unwrap();

        assert_eq!(mirror.list(Category::Device).unwrap().len(), 1);
        assert_eq!(mirror.list(Category::Entity).unwrap().len(), 1);
        assert_eq!(
            mirror.find(entity).unwrap().core().parent().unwrap().handle,
            device
        );
        assert_eq!(log.len(), 2);

        let note = source.remove(entity).unwrap();
        mirror.handle_notification(&note).unwrap();
        mirror.handle_notification(&note).unwrap();
        assert!(mirror.list(Category::Entity).unwrap().is_empty());
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn unmirrored_categories_are_ignored() {
        let (source, mut mirror, log) = fixture(&[Category::Source]);
        let (_, note) = source.add(Category::Destination, UniqueId::new(1), props("d"), None);
        mirror.handle_notification(&note).unwrap();
        assert!(mirror.is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn property_change_routes_to_caching_list() {
        let (source, mut mirror, log) = fixture(&[Category::Source, Category::Destination]);
        let (h, note) = source.add(Category::Destination, UniqueId::new(4), props("old"), None);
        mirror.handle_notification(&note).unwrap();
        log.drain();

        let note = source.set_property(h, names::NAME, "new").unwrap();
        mirror.handle_notification(&note).unwrap();

        let events = log.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category(), Category::Destination);
        assert_eq!(mirror.find(h).unwrap().name().as_deref(), Some("new"));
    }

    #[test]
    fn setup_changed_rebuilds_every_list() {
        let (source, mut mirror, _) = fixture(&[Category::Source, Category::Destination]);
        // Objects appear without individual notifications.
        source.insert(Category::Source, UniqueId::new(1), props("s"), None);
        source.insert(Category::Destination, UniqueId::new(2), props("d"), None);
        assert!(mirror.last_full_refresh().is_none());

        mirror.handle_notification(&source.setup_changed()).unwrap();
        assert_eq!(mirror.len(), 2);
        assert!(mirror.last_full_refresh().is_some());
    }

    #[test]
    fn refresh_all_reports_per_category() {
        let (source, mut mirror, _) = fixture(&[Category::Device, Category::Source]);
        source.insert(Category::Source, UniqueId::new(1), props("s"), None);

        let outcomes = mirror.refresh_all().unwrap();
        let summary: Vec<(Category, usize)> = outcomes
            .iter()
            .map(|(c, o)| (*c, o.added.len()))
            .collect();
        assert_eq!(summary, vec![(Category::Device, 0), (Category::Source, 1)]);
        assert_eq!(
            mirror.list(Category::Source).unwrap().snapshot()[0].unique_id(),
            UniqueId::new(1)
        );
    }
}
