//! Copy-on-write publishing of immutable index snapshots.
//!
//! Indexes have no internal locking. To share one between threads, wrap it
//! in a [`SnapshotIndex`]: readers grab the current `Arc` and query it for as
//! long as they like, while a writer clones the index, mutates the private
//! copy and swaps it in. A reader never sees a half-applied update.
//!
//! ```rust
//! use geogrid::{GeoPoint, Meters, PointsIndex, SnapshotIndex};
//!
//! let shared = SnapshotIndex::new(PointsIndex::new(Meters::km(0.5)));
//! let before = shared.load();
//!
//! shared.update(|index| index.add(GeoPoint::new("Waterloo", 51.502973, -0.114723)));
//!
//! assert!(before.get("Waterloo").is_none());
//! assert!(shared.load().get("Waterloo").is_some());
//! ```

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct SnapshotIndex<I> {
    current: RwLock<Arc<I>>,
    writer: Mutex<()>,
    generation: AtomicU64,
}

impl<I> SnapshotIndex<I> {
    pub fn new(index: I) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// The currently published snapshot.
    pub fn load(&self) -> Arc<I> {
        Arc::clone(&self.current.read())
    }

    /// Number of snapshots published since construction.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replace the published index wholesale.
    pub fn publish(&self, index: I) -> u64 {
        let _writer = self.writer.lock();
        self.swap(index)
    }

    // Caller must hold the writer lock.
    fn swap(&self, index: I) -> u64 {
        *self.current.write() = Arc::new(index);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!("published index snapshot generation {generation}");
        generation
    }
}

impl<I: Clone> SnapshotIndex<I> {
    /// Apply `mutate` to a private copy of the index, then publish the copy.
    ///
    /// Writers are serialized; readers keep whatever snapshot they loaded.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut I) -> R) -> R {
        let _writer = self.writer.lock();

        let mut draft = I::clone(&self.load());
        let result = mutate(&mut draft);
        self.swap(draft);
        result
    }
}

impl<I> fmt::Debug for SnapshotIndex<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotIndex")
            .field("generation", &self.generation())
            .finish()
    }
}
