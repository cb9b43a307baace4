//! Per-cell aggregates for count indexes.
//!
//! An [`Accumulator`] keeps running sums of latitude and longitude plus
//! a count, so the cell can be summarised as a single [`CountPoint`] at
//! its centroid. Accumulators of one kind can be merged and subtracted,
//! which is what the minute buckets of
//! [`ExpiringCounter`](crate::expiring::ExpiringCounter) rely on.

use geogrid_types::point::{Aggregate, CountPoint, Point};
use std::collections::BTreeMap;

/// A mergeable running aggregate.
pub trait Accumulator: Clone + Default + Send + Sync + 'static {
    fn add<P: Point + ?Sized>(&mut self, point: &P);

    fn remove<P: Point + ?Sized>(&mut self, point: &P);

    fn merge(&mut self, other: &Self);

    fn subtract(&mut self, other: &Self);

    /// The cell summary, or `None` once every contribution is gone.
    fn summary(&self) -> Option<CountPoint>;
}

/// Storage used by a [`CountIndex`](crate::CountIndex) cell.
pub trait CellCounter: Send + Sync + 'static {
    /// Whether individual contributions can be taken back out.
    const REMOVABLE: bool;

    fn add<P: Point + ?Sized>(&mut self, point: &P);

    fn remove<P: Point + ?Sized>(&mut self, point: &P);

    fn summary(&self) -> Option<CountPoint>;
}

/// Centroid and number of points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CentroidCounter {
    lat_sum: f64,
    lon_sum: f64,
    count: i64,
}

impl CentroidCounter {
    pub fn count(&self) -> i64 {
        self.count
    }

    fn centroid(&self) -> Option<(f64, f64)> {
        if self.count > 0 {
            let n = self.count as f64;
            Some((self.lat_sum / n, self.lon_sum / n))
        } else {
            None
        }
    }
}

impl Accumulator for CentroidCounter {
    fn add<P: Point + ?Sized>(&mut self, point: &P) {
        self.lat_sum += point.lat();
        self.lon_sum += point.lon();
        self.count += 1;
    }

    fn remove<P: Point + ?Sized>(&mut self, point: &P) {
        self.lat_sum -= point.lat();
        self.lon_sum -= point.lon();
        self.count -= 1;
    }

    fn merge(&mut self, other: &Self) {
        self.lat_sum += other.lat_sum;
        self.lon_sum += other.lon_sum;
        self.count += other.count;
    }

    fn subtract(&mut self, other: &Self) {
        self.lat_sum -= other.lat_sum;
        self.lon_sum -= other.lon_sum;
        self.count -= other.count;
    }

    fn summary(&self) -> Option<CountPoint> {
        let (lat, lon) = self.centroid()?;
        Some(CountPoint::new(lat, lon, Aggregate::Count(self.count as u64)))
    }
}

/// Centroid plus how many times each distinct id contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiCounter {
    centroid: CentroidCounter,
    values: BTreeMap<String, u64>,
}

impl MultiCounter {
    fn take(&mut self, id: &str, n: u64) {
        if let Some(count) = self.values.get_mut(id) {
            *count = count.saturating_sub(n);
            if *count == 0 {
                self.values.remove(id);
            }
        }
    }
}

impl Accumulator for MultiCounter {
    fn add<P: Point + ?Sized>(&mut self, point: &P) {
        Accumulator::add(&mut self.centroid, point);
        *self.values.entry(point.id().to_owned()).or_insert(0) += 1;
    }

    fn remove<P: Point + ?Sized>(&mut self, point: &P) {
        Accumulator::remove(&mut self.centroid, point);
        self.take(point.id(), 1);
    }

    fn merge(&mut self, other: &Self) {
        self.centroid.merge(&other.centroid);
        for (id, n) in &other.values {
            *self.values.entry(id.clone()).or_insert(0) += n;
        }
    }

    fn subtract(&mut self, other: &Self) {
        self.centroid.subtract(&other.centroid);
        for (id, n) in &other.values {
            self.take(id, *n);
        }
    }

    fn summary(&self) -> Option<CountPoint> {
        let (lat, lon) = self.centroid.centroid()?;
        Some(CountPoint::new(lat, lon, Aggregate::PerId(self.values.clone())))
    }
}

/// Centroid plus the mean of the points' [`value`](Point::value).
///
/// Points without a value count as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AverageCounter {
    centroid: CentroidCounter,
    sum: f64,
}

impl Accumulator for AverageCounter {
    fn add<P: Point + ?Sized>(&mut self, point: &P) {
        Accumulator::add(&mut self.centroid, point);
        self.sum += point.value().unwrap_or(0.0);
    }

    fn remove<P: Point + ?Sized>(&mut self, point: &P) {
        Accumulator::remove(&mut self.centroid, point);
        self.sum -= point.value().unwrap_or(0.0);
    }

    fn merge(&mut self, other: &Self) {
        self.centroid.merge(&other.centroid);
        self.sum += other.sum;
    }

    fn subtract(&mut self, other: &Self) {
        self.centroid.subtract(&other.centroid);
        self.sum -= other.sum;
    }

    fn summary(&self) -> Option<CountPoint> {
        let (lat, lon) = self.centroid.centroid()?;
        let average = self.sum / self.centroid.count as f64;
        Some(CountPoint::new(lat, lon, Aggregate::Average(average)))
    }
}

macro_rules! removable_counter {
    ($($counter:ty),*) => {
        $(
            impl CellCounter for $counter {
                const REMOVABLE: bool = true;

                fn add<P: Point + ?Sized>(&mut self, point: &P) {
                    Accumulator::add(self, point)
                }

                fn remove<P: Point + ?Sized>(&mut self, point: &P) {
                    Accumulator::remove(self, point)
                }

                fn summary(&self) -> Option<CountPoint> {
                    Accumulator::summary(self)
                }
            }
        )*
    };
}

removable_counter!(CentroidCounter, MultiCounter, AverageCounter);
