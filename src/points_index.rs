//! Exact point storage with range, radius and k-nearest queries.

use crate::clock::Clock;
use crate::expiring::ExpiringSet;
use crate::geometry::{approximate_square_distance, distance};
use crate::grid::{Cell, Grid};
use crate::sets::{BasicSet, PointSet};
use geogrid_types::point::Point;
use geogrid_types::units::{Meters, Minutes};
use rustc_hash::FxHashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A points index whose points disappear a fixed time after insertion.
pub type ExpiringPointsIndex<P> = PointsIndex<P, ExpiringSet<P>>;

/// Grid of point sets plus an id -> cell position map.
///
/// # Examples
///
/// ```rust
/// use geogrid::{GeoPoint, Meters, PointsIndex};
///
/// let mut index = PointsIndex::new(Meters::km(0.5));
/// index.add(GeoPoint::new("Waterloo", 51.502973, -0.114723));
/// index.add(GeoPoint::new("Kings Cross", 51.529999, -0.124481));
///
/// let leicester_square = GeoPoint::at(51.511291, -0.128242);
/// let nearest = index.k_nearest(&leicester_square, 1, Meters::km(5.0), |_| true);
/// assert_eq!(nearest[0].id, "Waterloo");
/// ```
///
/// Expiring indexes cannot be snapshotted:
///
/// ```compile_fail
/// use geogrid::{GeoPoint, Meters, Minutes, PointsIndex, clock};
///
/// let index = PointsIndex::<GeoPoint, _>::expiring(Meters::km(0.5), Minutes(5), clock::system());
/// let copy = index.clone();
/// ```
pub struct PointsIndex<P, S = BasicSet<P>> {
    grid: Grid<S>,
    positions: FxHashMap<String, Cell>,
    _point: PhantomData<fn() -> P>,
}

impl<P: Point + 'static> PointsIndex<P> {
    pub fn new(resolution: Meters) -> Self {
        log::debug!("creating points index with {resolution} cells");
        Self::with_grid(Grid::new(resolution, BasicSet::new))
    }
}

impl<P: Point + 'static> PointsIndex<P, ExpiringSet<P>> {
    /// Points expire `expiration` after their last insertion, as seen by `clock`.
    pub fn expiring(resolution: Meters, expiration: Minutes, clock: Arc<dyn Clock>) -> Self {
        log::debug!(
            "creating expiring points index with {resolution} cells and a {} minute window",
            expiration.0
        );
        Self::with_grid(Grid::new(resolution, move || {
            ExpiringSet::new(expiration, Arc::clone(&clock))
        }))
    }
}

// Eviction callback that forgets an evicted point's position, unless the
// id has since moved to another cell.
fn forget<P: Point>(positions: &mut FxHashMap<String, Cell>, cell: Cell) -> impl FnMut(P) + '_ {
    move |gone: P| {
        if positions.get(gone.id()) == Some(&cell) {
            positions.remove(gone.id());
        }
    }
}

// Wider than any grid at any resolution; keeps cell arithmetic in range.
const MAX_SEARCH_RINGS: i64 = i64::MAX / 4;

fn between(value: f64, min: f64, max: f64) -> bool {
    value >= min && value <= max
}

impl<P: Point, S: PointSet<P>> PointsIndex<P, S> {
    fn with_grid(grid: Grid<S>) -> Self {
        Self {
            grid,
            positions: FxHashMap::default(),
            _point: PhantomData,
        }
    }

    pub fn resolution(&self) -> Meters {
        self.grid.resolution()
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.grid.cell_count()
    }

    /// Number of live points.
    pub fn len(&self) -> usize {
        self.grid.entries().map(|(_, set)| set.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a point, replacing any point stored under the same id.
    pub fn add(&mut self, point: P) {
        self.remove(point.id());

        let cell = self.grid.cell_of(&point);
        let id = point.id().to_owned();

        {
            let mut evicted = forget(&mut self.positions, cell);
            self.grid.add_entry_at(&point).insert(point, &mut evicted);
        }
        self.positions.insert(id, cell);
    }

    /// Remove a point by id. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<P> {
        let cell = self.positions.remove(id)?;

        let mut evicted = forget(&mut self.positions, cell);
        let set = self.grid.entry_mut(cell)?;
        let removed = set.remove(id, &mut evicted);

        if set.is_empty() {
            self.grid.remove_entry(cell);
        }
        removed
    }

    /// The live point stored under `id`.
    pub fn get(&self, id: &str) -> Option<&P> {
        let cell = self.positions.get(id)?;
        self.grid.entry(*cell)?.get(id)
    }

    /// Every live point, keyed by id.
    pub fn get_all(&self) -> FxHashMap<&str, &P> {
        self.grid
            .entries()
            .flat_map(|(_, set)| set.values())
            .map(|point| (point.id(), point))
            .collect()
    }

    /// Points inside the rectangle, boundary included.
    pub fn range<A: Point + ?Sized, B: Point + ?Sized>(
        &self,
        top_left: &A,
        bottom_right: &B,
    ) -> Vec<&P> {
        self.grid
            .range(top_left, bottom_right)
            .into_iter()
            .flat_map(|set| set.values())
            .filter(|p| {
                between(p.lat(), bottom_right.lat(), top_left.lat())
                    && between(p.lon(), top_left.lon(), bottom_right.lon())
            })
            .collect()
    }

    /// Up to `k` accepted points no further than `max_distance` from `point`,
    /// nearest first.
    ///
    /// Rings of cells around the query cell are gathered until more than `k`
    /// candidates turned up in the rings, or the rings reach twice
    /// `max_distance` (at least two cells out). Candidates are ordered by a
    /// planar approximation, cut at `k` or at the first one beyond
    /// `max_distance`, and the survivors are ordered by exact distance.
    pub fn k_nearest<Q: Point + ?Sized>(
        &self,
        point: &Q,
        k: usize,
        max_distance: Meters,
        accept: impl Fn(&P) -> bool,
    ) -> Vec<&P> {
        let center = self.grid.cell_of(point);
        let resolution = self.grid.resolution();

        let mut nearby: Vec<&P> = match self.grid.entry(center) {
            Some(set) => set.values().filter(|p| accept(*p)).collect(),
            None => Vec::new(),
        };

        let coarse_max_distance = (max_distance * 2.0).max(resolution * 2.0 + Meters(0.01));
        let within_reach = |d: i64| resolution * d as f64 <= coarse_max_distance;
        let stored_cells = self.grid.cell_count();
        let mut visited_cells = 1usize;
        let mut ring_count = 0;
        let mut d = 1;

        while within_reach(d) {
            // More cells probed than stored: visit the remaining stored cells
            // directly, grouped by ring, instead of walking empty rings.
            if visited_cells > stored_cells {
                let mut remaining: Vec<(i64, &S)> = self
                    .grid
                    .entries()
                    .map(|(cell, set)| (cell.rings_to(&center), set))
                    .filter(|(ring, _)| *ring >= d && within_reach(*ring))
                    .collect();
                remaining.sort_by_key(|(ring, _)| *ring);

                for same_ring in remaining.chunk_by(|a, b| a.0 == b.0) {
                    let before = nearby.len();
                    nearby.extend(
                        same_ring
                            .iter()
                            .flat_map(|(_, set)| set.values())
                            .filter(|p| accept(*p)),
                    );
                    ring_count += nearby.len() - before;
                    d = same_ring[0].0;

                    if ring_count > k {
                        break;
                    }
                }
                break;
            }

            let before = nearby.len();
            nearby.extend(
                self.grid
                    .ring(center, d)
                    .flat_map(|set| set.values())
                    .filter(|p| accept(*p)),
            );
            ring_count += nearby.len() - before;

            if ring_count > k {
                break;
            }
            visited_cells = visited_cells.saturating_add(8 * d as usize);
            d += 1;
        }

        log::trace!(
            "k_nearest gathered {} candidates from {} rings around {:?}",
            nearby.len(),
            d,
            center
        );

        nearby.sort_by(|a, b| {
            let da = approximate_square_distance(*a, point);
            da.total_cmp(&approximate_square_distance(*b, point))
        });

        let mut nearest = Vec::with_capacity(k.min(nearby.len()));
        for candidate in nearby.into_iter().take(k) {
            let d = distance(point, candidate);
            if d > max_distance {
                break;
            }
            nearest.push((d, candidate));
        }

        nearest.sort_by(|a, b| a.0.value().total_cmp(&b.0.value()));
        nearest.into_iter().map(|(_, p)| p).collect()
    }

    /// Accepted points strictly closer than `radius` to `point`, unordered.
    pub fn points_within<Q: Point + ?Sized>(
        &self,
        point: &Q,
        radius: Meters,
        accept: impl Fn(&P) -> bool,
    ) -> Vec<&P> {
        let center = self.grid.cell_of(point);
        let d = ((radius / self.grid.resolution()).ceil() as i64).clamp(1, MAX_SEARCH_RINGS);

        self.grid
            .entries_in(
                center.x.saturating_sub(d),
                center.x.saturating_add(d),
                center.y.saturating_sub(d),
                center.y.saturating_add(d),
            )
            .into_iter()
            .flat_map(|set| set.values())
            .filter(|p| accept(*p))
            .filter(|p| distance(point, *p) < radius)
            .collect()
    }

    /// Evict everything past its window from every cell and drop emptied cells.
    ///
    /// Reads already hide expired points; this releases their memory.
    pub fn expire(&mut self) {
        let positions = &mut self.positions;
        for (cell, set) in self.grid.entries_mut() {
            let mut evicted = forget(positions, *cell);
            set.expire(&mut evicted);
        }
        self.grid.retain(|_, set| !set.is_empty());
    }
}

impl<P, S: Clone> Clone for PointsIndex<P, S> {
    fn clone(&self) -> Self {
        Self {
            grid: self.grid.clone(),
            positions: self.positions.clone(),
            _point: PhantomData,
        }
    }
}

impl<P, S> fmt::Debug for PointsIndex<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointsIndex")
            .field("grid", &self.grid)
            .field("positions", &self.positions.len())
            .finish()
    }
}
