// ── Wrapper capability contract ──

use crate::context::MidiContext;
use crate::model::{Category, Handle, UniqueId};

/// Capabilities every cached wrapper exposes.
///
/// The unique id is captured at construction and never changes. If the
/// external object's identity changes, the wrapper is destroyed and a new
/// one is built.
pub trait Wrapper: Send + Sync + 'static {
    fn handle(&self) -> Handle;

    fn unique_id(&self) -> UniqueId;

    fn category(&self) -> Category;

    /// Refresh any cached state derived from `property`.
    fn property_changed(&self, ctx: &MidiContext, property: &str);
}
