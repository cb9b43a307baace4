//! Per-cell point storage.

use geogrid_types::point::Point;
use rustc_hash::FxHashMap;

/// Points mapped into one grid cell, keyed by id.
///
/// Mutations take an eviction callback: expiring sets report every point
/// they drop on the way so the owning index can forget its position.
pub trait PointSet<P: Point> {
    /// Insert or replace the point stored under `point.id()`.
    fn insert(&mut self, point: P, evicted: &mut dyn FnMut(P));

    fn remove(&mut self, id: &str, evicted: &mut dyn FnMut(P)) -> Option<P>;

    fn get(&self, id: &str) -> Option<&P>;

    fn values<'a>(&'a self) -> impl Iterator<Item = &'a P>
    where
        P: 'a;

    fn len(&self) -> usize {
        self.values().count()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything that has outlived its window.
    fn expire(&mut self, _evicted: &mut dyn FnMut(P)) {}
}

/// A plain set with no lifetime limit.
#[derive(Debug, Clone)]
pub struct BasicSet<P> {
    values: FxHashMap<String, P>,
}

impl<P> BasicSet<P> {
    pub fn new() -> Self {
        Self {
            values: FxHashMap::default(),
        }
    }
}

impl<P> Default for BasicSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Point> PointSet<P> for BasicSet<P> {
    fn insert(&mut self, point: P, _evicted: &mut dyn FnMut(P)) {
        self.values.insert(point.id().to_owned(), point);
    }

    fn remove(&mut self, id: &str, _evicted: &mut dyn FnMut(P)) -> Option<P> {
        self.values.remove(id)
    }

    fn get(&self, id: &str) -> Option<&P> {
        self.values.get(id)
    }

    fn values<'a>(&'a self) -> impl Iterator<Item = &'a P>
    where
        P: 'a,
    {
        self.values.values()
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}
