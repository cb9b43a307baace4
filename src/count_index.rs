//! Aggregate-only index for zoomed-out views.
//!
//! Each occupied cell holds a counter instead of the points themselves, and
//! a range query returns one [`CountPoint`] per cell at the centroid of its
//! contributions.

use crate::clock::Clock;
use crate::counters::{Accumulator, AverageCounter, CellCounter, CentroidCounter, MultiCounter};
use crate::expiring::ExpiringCounter;
use crate::grid::Grid;
use geogrid_types::point::{CountPoint, Point};
use geogrid_types::units::{Meters, Minutes};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A count index whose contributions drop out after a time window.
pub type ExpiringCountIndex<P, A = CentroidCounter> = CountIndex<P, ExpiringCounter<A>>;

/// Grid of per-cell counters.
///
/// Removable counters remember the last position of every id so that
/// re-adding an id moves its contribution. Expiring counters cannot take a
/// contribution back, so an expiring count index counts every `add` as a
/// separate event and keeps no positions.
pub struct CountIndex<P, C = CentroidCounter> {
    grid: Grid<C>,
    positions: FxHashMap<String, P>,
}

fn expiring_counters<A: Accumulator>(
    expiration: Minutes,
    clock: Arc<dyn Clock>,
) -> impl Fn() -> ExpiringCounter<A> + Send + Sync + 'static {
    move || ExpiringCounter::new(expiration, Arc::clone(&clock))
}

impl<P: Point> CountIndex<P> {
    /// Count points and track the centroid of each cell.
    pub fn new(resolution: Meters) -> Self {
        log::debug!("creating count index with {resolution} cells");
        Self::with_grid(Grid::new(resolution, CentroidCounter::default))
    }
}

impl<P: Point> CountIndex<P, MultiCounter> {
    /// Count contributions per distinct point id.
    pub fn multi(resolution: Meters) -> Self {
        log::debug!("creating per-id count index with {resolution} cells");
        Self::with_grid(Grid::new(resolution, MultiCounter::default))
    }
}

impl<P: Point> CountIndex<P, AverageCounter> {
    /// Average the points' [`value`](Point::value) per cell.
    pub fn average(resolution: Meters) -> Self {
        log::debug!("creating averaging count index with {resolution} cells");
        Self::with_grid(Grid::new(resolution, AverageCounter::default))
    }
}

impl<P: Point> CountIndex<P, ExpiringCounter<CentroidCounter>> {
    pub fn expiring(resolution: Meters, expiration: Minutes, clock: Arc<dyn Clock>) -> Self {
        Self::expiring_with(resolution, expiration, clock)
    }
}

impl<P: Point> CountIndex<P, ExpiringCounter<MultiCounter>> {
    pub fn expiring_multi(resolution: Meters, expiration: Minutes, clock: Arc<dyn Clock>) -> Self {
        Self::expiring_with(resolution, expiration, clock)
    }
}

impl<P: Point> CountIndex<P, ExpiringCounter<AverageCounter>> {
    pub fn expiring_average(
        resolution: Meters,
        expiration: Minutes,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::expiring_with(resolution, expiration, clock)
    }
}

impl<P: Point, A: Accumulator> CountIndex<P, ExpiringCounter<A>> {
    /// An expiring count index over any accumulator.
    pub fn expiring_with(resolution: Meters, expiration: Minutes, clock: Arc<dyn Clock>) -> Self {
        log::debug!(
            "creating expiring count index with {resolution} cells and a {} minute window",
            expiration.0
        );
        Self::with_grid(Grid::new(resolution, expiring_counters(expiration, clock)))
    }

    /// Drop expired buckets everywhere and release cells left empty.
    pub fn expire(&mut self) {
        for (_, counter) in self.grid.entries_mut() {
            counter.expire();
        }
        self.grid.retain(|_, counter| counter.bucket_count() > 0);
    }
}

impl<P: Point, C: CellCounter> CountIndex<P, C> {
    fn with_grid(grid: Grid<C>) -> Self {
        Self {
            grid,
            positions: FxHashMap::default(),
        }
    }

    pub fn resolution(&self) -> Meters {
        self.grid.resolution()
    }

    pub fn cell_count(&self) -> usize {
        self.grid.cell_count()
    }

    /// Number of ids currently counted. Expiring indexes track no ids.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn add(&mut self, point: P) {
        if !C::REMOVABLE {
            self.grid.add_entry_at(&point).add(&point);
            return;
        }

        self.remove(point.id());
        self.grid.add_entry_at(&point).add(&point);
        self.positions.insert(point.id().to_owned(), point);
    }

    /// Take back the contribution of `id`. Unknown ids are ignored.
    ///
    /// # Panics
    ///
    /// Panics on expiring indexes.
    pub fn remove(&mut self, id: &str) {
        if !C::REMOVABLE {
            panic!("remove is not supported by expiring count indexes");
        }

        let Some(previous) = self.positions.remove(id) else {
            return;
        };

        let cell = self.grid.cell_of(&previous);
        if let Some(counter) = self.grid.entry_mut(cell) {
            counter.remove(&previous);
            if counter.summary().is_none() {
                self.grid.remove_entry(cell);
            }
        }
    }

    /// One centroid per occupied cell in the rectangle's cell span.
    pub fn range<A: Point + ?Sized, B: Point + ?Sized>(
        &self,
        top_left: &A,
        bottom_right: &B,
    ) -> Vec<CountPoint> {
        self.grid
            .range(top_left, bottom_right)
            .into_iter()
            .filter_map(|counter| counter.summary())
            .collect()
    }

    /// # Panics
    ///
    /// Always. Aggregates carry no identity to rank.
    pub fn k_nearest<Q: Point + ?Sized>(
        &self,
        _point: &Q,
        _k: usize,
        _max_distance: Meters,
        _accept: impl Fn(&CountPoint) -> bool,
    ) -> Vec<CountPoint> {
        panic!("k_nearest is not supported by count indexes");
    }
}

impl<P: Clone, C: Clone> Clone for CountIndex<P, C> {
    fn clone(&self) -> Self {
        Self {
            grid: self.grid.clone(),
            positions: self.positions.clone(),
        }
    }
}

impl<P, C> fmt::Debug for CountIndex<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountIndex")
            .field("grid", &self.grid)
            .field("positions", &self.positions.len())
            .finish()
    }
}
