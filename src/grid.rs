//! Sparse grid engine shared by every index.
//!
//! The earth is cut into square cells of `resolution` meters, addressed by
//! an integer pair derived from latitude (x) and longitude (y). Only
//! occupied cells are stored. Cell edges use fixed degree lengths, so the
//! real size of a cell drifts away from the equator. The grid only selects
//! candidates; indexes filter them by coordinates or exact distance.
//!
//! Coordinates are not validated and longitudes do not wrap at ±180°.

use crate::geometry::{LAT_DEGREE_LENGTH, LON_DEGREE_LENGTH};
use geogrid_types::point::Point;
use geogrid_types::units::Meters;
use rustc_hash::FxHashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

const MIN_LAT: f64 = -90.0;
const MIN_LON: f64 = -180.0;

/// Integer address of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub x: i64,
    pub y: i64,
}

impl Cell {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance in cells.
    pub fn rings_to(&self, other: &Cell) -> i64 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

/// Cell holding `point` at the given resolution.
pub fn cell_of<P: Point + ?Sized>(point: &P, resolution: Meters) -> Cell {
    let x = ((point.lat() - MIN_LAT) * LAT_DEGREE_LENGTH.value() / resolution.value()).floor();
    let y = ((point.lon() - MIN_LON) * LON_DEGREE_LENGTH.value() / resolution.value()).floor();

    Cell::new(x as i64, y as i64)
}

/// Cells at exactly `d` rings from `center`, as four border strips.
///
/// The top and bottom strips span the full `2d + 1` width; the left and
/// right strips skip the corners the first two already produced, so every
/// border cell is yielded exactly once.
pub fn ring_cells(center: Cell, d: i64) -> impl Iterator<Item = Cell> {
    debug_assert!(d > 0, "ring 0 is the center cell itself");

    let top = (center.x - d..=center.x + d).map(move |x| Cell::new(x, center.y + d));
    let bottom = (center.x - d..=center.x + d).map(move |x| Cell::new(x, center.y - d));
    let left = (center.y - d + 1..=center.y + d - 1).map(move |y| Cell::new(center.x - d, y));
    let right = (center.y - d + 1..=center.y + d - 1).map(move |y| Cell::new(center.x + d, y));

    top.chain(bottom).chain(left).chain(right)
}

/// Result of probing a cell without creating it.
pub enum EntryRef<'a, E> {
    Stored(&'a E),
    Vacant(E),
}

impl<E> Deref for EntryRef<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        match self {
            EntryRef::Stored(entry) => entry,
            EntryRef::Vacant(entry) => entry,
        }
    }
}

/// Sparse mapping from cell to entry, with an injected entry factory.
pub struct Grid<E> {
    resolution: Meters,
    cells: FxHashMap<Cell, E>,
    new_entry: Arc<dyn Fn() -> E + Send + Sync>,
}

impl<E> Grid<E> {
    pub fn new(resolution: Meters, new_entry: impl Fn() -> E + Send + Sync + 'static) -> Self {
        assert!(
            resolution.value().is_finite() && resolution.value() > 0.0,
            "grid resolution must be a positive number of meters, got {resolution}"
        );

        Self {
            resolution,
            cells: FxHashMap::default(),
            new_entry: Arc::new(new_entry),
        }
    }

    pub fn resolution(&self) -> Meters {
        self.resolution
    }

    /// Number of stored cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_of<P: Point + ?Sized>(&self, point: &P) -> Cell {
        cell_of(point, self.resolution)
    }

    /// Entry for the point's cell, created if the cell is unoccupied.
    pub fn add_entry_at<P: Point + ?Sized>(&mut self, point: &P) -> &mut E {
        let cell = self.cell_of(point);
        self.cells
            .entry(cell)
            .or_insert_with(|| (self.new_entry)())
    }

    /// Entry for the point's cell, or a fresh unstored entry.
    pub fn get_entry_at<P: Point + ?Sized>(&self, point: &P) -> EntryRef<'_, E> {
        self.probe(self.cell_of(point))
    }

    pub fn probe(&self, cell: Cell) -> EntryRef<'_, E> {
        match self.cells.get(&cell) {
            Some(entry) => EntryRef::Stored(entry),
            None => EntryRef::Vacant((self.new_entry)()),
        }
    }

    pub fn entry(&self, cell: Cell) -> Option<&E> {
        self.cells.get(&cell)
    }

    pub fn entry_mut(&mut self, cell: Cell) -> Option<&mut E> {
        self.cells.get_mut(&cell)
    }

    pub fn remove_entry(&mut self, cell: Cell) -> Option<E> {
        self.cells.remove(&cell)
    }

    /// Keep only the cells for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Cell, &mut E) -> bool) {
        self.cells.retain(|cell, entry| keep(cell, entry));
    }

    /// Stored entries in the inclusive cell span between two corners.
    pub fn range<P: Point + ?Sized, Q: Point + ?Sized>(
        &self,
        top_left: &P,
        bottom_right: &Q,
    ) -> Vec<&E> {
        let tl = self.cell_of(top_left);
        let br = self.cell_of(bottom_right);

        self.entries_in(br.x, tl.x, tl.y, br.y)
    }

    /// Stored entries with `min_x <= x <= max_x` and `min_y <= y <= max_y`.
    pub fn entries_in(&self, min_x: i64, max_x: i64, min_y: i64, max_y: i64) -> Vec<&E> {
        if min_x > max_x || min_y > max_y {
            return Vec::new();
        }

        let span = (max_x - min_x + 1).saturating_mul(max_y - min_y + 1);

        // Walking a huge mostly-empty span costs more than scanning what is stored.
        if span as usize > self.cells.len() {
            return self
                .cells
                .iter()
                .filter(|(cell, _)| {
                    (min_x..=max_x).contains(&cell.x) && (min_y..=max_y).contains(&cell.y)
                })
                .map(|(_, entry)| entry)
                .collect();
        }

        let mut entries = Vec::new();
        for x in min_x..=max_x {
            for y in min_y..=max_y {
                if let Some(entry) = self.cells.get(&Cell::new(x, y)) {
                    entries.push(entry);
                }
            }
        }
        entries
    }

    /// Stored entries on ring `d` around `center`.
    pub fn ring(&self, center: Cell, d: i64) -> impl Iterator<Item = &E> + '_ {
        ring_cells(center, d).filter_map(move |cell| self.cells.get(&cell))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Cell, &E)> {
        self.cells.iter()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = (&Cell, &mut E)> {
        self.cells.iter_mut()
    }
}

impl<E: Clone> Clone for Grid<E> {
    fn clone(&self) -> Self {
        Self {
            resolution: self.resolution,
            cells: self.cells.clone(),
            new_entry: Arc::clone(&self.new_entry),
        }
    }
}

impl<E> fmt::Debug for Grid<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("resolution", &self.resolution)
            .field("cells", &self.cells.len())
            .finish()
    }
}
