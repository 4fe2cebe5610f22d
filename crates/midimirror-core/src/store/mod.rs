// ── Wrapper storage ──
//
// Ordered per-category cache plus the full reconciliation pass that
// rebuilds it from a fresh enumeration.

pub(crate) mod cache;
mod reconcile;

pub use cache::ObjectCache;
pub use reconcile::{ReconcileOutcome, SkipReason, SkippedHandle, reconcile};
