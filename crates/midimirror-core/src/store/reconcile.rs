// ── Full reconciliation pass ──
//
// Diffs a freshly enumerated handle list against the cache. Wrappers whose
// handle and unique id both persist are carried over as the same `Arc`;
// everything else is rebuilt or dropped. The cache ends up in the fresh
// enumeration order.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::cache::ObjectCache;
use crate::context::MidiContext;
use crate::error::CoreError;
use crate::factory::WrapperFactory;
use crate::model::{Handle, UniqueId};
use crate::wrapper::Wrapper;

/// Why a fresh handle did not make it into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The handle stopped resolving during the pass.
    Vanished,
    /// An earlier handle in the same pass already resolved to this id.
    DuplicateIdentity { unique_id: UniqueId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedHandle {
    pub handle: Handle,
    pub reason: SkipReason,
}

/// Net change produced by one pass.
#[derive(Debug)]
pub struct ReconcileOutcome<W> {
    /// Newly constructed wrappers, in fresh order.
    pub added: Vec<Arc<W>>,
    /// Wrappers no longer backed by a live object, in old cache order.
    pub removed: Vec<Arc<W>>,
    /// Number of wrappers carried over unchanged.
    pub retained: usize,
    pub skipped: Vec<SkippedHandle>,
}

impl<W> ReconcileOutcome<W> {
    /// True when observers have nothing to hear about.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Bring `cache` in line with `fresh`.
///
/// Source failures for individual handles are absorbed as skips. The only
/// error is an invariant violation while swapping in the result, in which
/// case the cache is left as it was.
pub fn reconcile<F: WrapperFactory>(
    ctx: &MidiContext,
    factory: &F,
    cache: &mut ObjectCache<F::Output>,
    fresh: &[Handle],
) -> Result<ReconcileOutcome<F::Output>, CoreError> {
    let category = factory.category();
    let mut result: Vec<Arc<F::Output>> = Vec::with_capacity(fresh.len());
    let mut placed: HashSet<UniqueId> = HashSet::with_capacity(fresh.len());
    let mut retained: HashSet<UniqueId> = HashSet::new();
    let mut added = Vec::new();
    let mut skipped = Vec::new();

    for &handle in fresh {
        let unique_id = match ctx.resolve_unique_id(handle) {
            Ok(id) => id,
            Err(e) => {
                debug!(%category, %handle, error = %e, "handle vanished during reconciliation");
                skipped.push(SkippedHandle {
                    handle,
                    reason: SkipReason::Vanished,
                });
                continue;
            }
        };

        if placed.contains(&unique_id) {
            warn!(%category, %handle, %unique_id, "duplicate unique id in enumeration, skipping later handle");
            skipped.push(SkippedHandle {
                handle,
                reason: SkipReason::DuplicateIdentity { unique_id },
            });
            continue;
        }

        if let Some(existing) = cache.get_by_handle(handle) {
            if existing.unique_id() == unique_id {
                placed.insert(unique_id);
                retained.insert(unique_id);
                result.push(Arc::clone(existing));
                continue;
            }
            debug!(%category, %handle, old = %existing.unique_id(), new = %unique_id, "handle reused for a different object");
        }

        let wrapper = match factory.create(ctx, handle) {
            Ok(wrapper) => Arc::new(wrapper),
            Err(e) => {
                debug!(%category, %handle, error = %e, "skipping handle that could not be wrapped");
                skipped.push(SkippedHandle {
                    handle,
                    reason: SkipReason::Vanished,
                });
                continue;
            }
        };

        // The object may have changed identity between the lookup above and
        // construction; the wrapper's own id is what gets cached.
        let built_id = wrapper.unique_id();
        if built_id != unique_id && placed.contains(&built_id) {
            warn!(%category, %handle, unique_id = %built_id, "duplicate unique id in enumeration, skipping later handle");
            skipped.push(SkippedHandle {
                handle,
                reason: SkipReason::DuplicateIdentity {
                    unique_id: built_id,
                },
            });
            continue;
        }

        placed.insert(built_id);
        added.push(Arc::clone(&wrapper));
        result.push(wrapper);
    }

    let removed: Vec<Arc<F::Output>> = cache
        .iter()
        .filter(|w| !retained.contains(&w.unique_id()))
        .map(Arc::clone)
        .collect();

    cache.replace_all(result)?;

    debug!(
        %category,
        added = added.len(),
        removed = removed.len(),
        retained = retained.len(),
        skipped = skipped.len(),
        "reconciliation pass complete"
    );

    Ok(ReconcileOutcome {
        added,
        removed,
        retained: retained.len(),
        skipped,
    })
}
