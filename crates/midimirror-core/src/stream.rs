// ── Reactive object streams ──
//
// Subscription types for reading a list's cache from other tasks. Every
// value is a point-in-time snapshot; it stays valid as data but may be
// stale after the next notification is processed.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A subscription to one list's ordered wrapper snapshot.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via the `changed()` method or by converting to a `Stream`.
pub struct ObjectStream<W: Send + Sync + 'static> {
    current: Arc<Vec<Arc<W>>>,
    receiver: watch::Receiver<Arc<Vec<Arc<W>>>>,
}

impl<W: Send + Sync + 'static> ObjectStream<W> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Arc<W>>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<Vec<Arc<W>>> {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<Vec<Arc<W>>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the owning list has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Arc<W>>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> ObjectWatchStream<W> {
        ObjectWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the current snapshot first, then a new one each time the
/// underlying cache is mutated.
pub struct ObjectWatchStream<W: Send + Sync + 'static> {
    inner: WatchStream<Arc<Vec<Arc<W>>>>,
}

impl<W: Send + Sync + 'static> Stream for ObjectWatchStream<W> {
    type Item = Arc<Vec<Arc<W>>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Arc<Vec<Arc<W>>> is always Unpin, so WatchStream is too.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
