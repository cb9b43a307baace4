//! Time-windowed point sets and counters.
//!
//! Both containers keep an insertion-ordered queue and evict from its head
//! before every write. Reads never mutate: they skip whatever has already
//! reached the window, so nothing whose age is at least the window is ever
//! observed. Neither type implements `Clone`; a clock-relative eviction
//! schedule cannot be duplicated into a snapshot.

use crate::clock::{Clock, age};
use crate::counters::{Accumulator, CellCounter};
use crate::sets::PointSet;
use geogrid_types::point::{CountPoint, Point};
use geogrid_types::units::Minutes;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug)]
struct Inserted {
    id: String,
    timestamp: SystemTime,
}

/// A point set that forgets points `expiration` after their last insertion.
pub struct ExpiringSet<P> {
    values: FxHashMap<String, P>,
    last_inserted: FxHashMap<String, SystemTime>,
    insertion_order: VecDeque<Inserted>,
    expiration: Duration,
    clock: Arc<dyn Clock>,
}

impl<P> ExpiringSet<P> {
    pub fn new(expiration: Minutes, clock: Arc<dyn Clock>) -> Self {
        Self {
            values: FxHashMap::default(),
            last_inserted: FxHashMap::default(),
            insertion_order: VecDeque::new(),
            expiration: expiration.as_duration(),
            clock,
        }
    }

    fn is_live(&self, id: &str, now: SystemTime) -> bool {
        self.last_inserted
            .get(id)
            .is_some_and(|inserted| age(now, *inserted) < self.expiration)
    }
}

impl<P: Point> PointSet<P> for ExpiringSet<P> {
    fn insert(&mut self, point: P, evicted: &mut dyn FnMut(P)) {
        self.expire(evicted);

        let id = point.id().to_owned();
        let now = self.clock.now();
        self.values.insert(id.clone(), point);
        self.last_inserted.insert(id.clone(), now);
        self.insertion_order.push_back(Inserted { id, timestamp: now });
    }

    fn remove(&mut self, id: &str, evicted: &mut dyn FnMut(P)) -> Option<P> {
        self.expire(evicted);

        self.last_inserted.remove(id);
        self.values.remove(id)
    }

    fn get(&self, id: &str) -> Option<&P> {
        if self.is_live(id, self.clock.now()) {
            self.values.get(id)
        } else {
            None
        }
    }

    fn values<'a>(&'a self) -> impl Iterator<Item = &'a P>
    where
        P: 'a,
    {
        let now = self.clock.now();
        self.values
            .iter()
            .filter(move |(id, _)| self.is_live(id, now))
            .map(|(_, point)| point)
    }

    fn expire(&mut self, evicted: &mut dyn FnMut(P)) {
        let now = self.clock.now();

        while let Some(head) = self.insertion_order.front() {
            if age(now, head.timestamp) < self.expiration {
                break;
            }
            let Some(head) = self.insertion_order.pop_front() else {
                break;
            };

            // A newer insertion of the same id keeps it alive; a missing
            // record means it was removed since and this entry is stale.
            let expired = self
                .last_inserted
                .get(&head.id)
                .is_some_and(|inserted| age(now, *inserted) >= self.expiration);

            if expired {
                self.last_inserted.remove(&head.id);
                if let Some(point) = self.values.remove(&head.id) {
                    evicted(point);
                }
            }
        }
    }
}

impl<P> fmt::Debug for ExpiringSet<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringSet")
            .field("values", &self.values.len())
            .field("queued", &self.insertion_order.len())
            .field("expiration", &self.expiration)
            .finish()
    }
}

struct Bucket<A> {
    minute: SystemTime,
    first_added: SystemTime,
    counter: A,
}

/// A counter whose contributions drop out `expiration` after they were made.
///
/// Contributions made within the same wall-clock minute share one bucket,
/// so the queue holds at most one bucket per minute of the window. A bucket
/// expires with its first contribution; later ones from the same minute
/// leave with it, at most a minute early.
pub struct ExpiringCounter<A> {
    buckets: VecDeque<Bucket<A>>,
    total: A,
    expiration: Duration,
    clock: Arc<dyn Clock>,
}

fn floor_to_minute(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => UNIX_EPOCH + Duration::from_secs(since.as_secs() / 60 * 60),
        Err(_) => time,
    }
}

impl<A: Accumulator> ExpiringCounter<A> {
    pub fn new(expiration: Minutes, clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: VecDeque::with_capacity(expiration.0 as usize + 1),
            total: A::default(),
            expiration: expiration.as_duration(),
            clock,
        }
    }

    /// Drop every bucket that has reached the window.
    pub fn expire(&mut self) {
        let now = self.clock.now();

        while let Some(head) = self.buckets.front() {
            if age(now, head.first_added) < self.expiration {
                break;
            }
            if let Some(head) = self.buckets.pop_front() {
                self.total.subtract(&head.counter);
            }
        }
    }

    /// The live aggregate, excluding buckets that have reached the window.
    pub fn current(&self) -> A {
        let now = self.clock.now();
        let mut live = self.total.clone();

        for bucket in &self.buckets {
            if age(now, bucket.first_added) < self.expiration {
                break;
            }
            live.subtract(&bucket.counter);
        }
        live
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

impl<A: Accumulator> CellCounter for ExpiringCounter<A> {
    const REMOVABLE: bool = false;

    fn add<P: Point + ?Sized>(&mut self, point: &P) {
        self.expire();
        self.total.add(point);

        let now = self.clock.now();
        let minute = floor_to_minute(now);
        match self.buckets.back_mut() {
            Some(last) if last.minute == minute => last.counter.add(point),
            _ => {
                let mut counter = A::default();
                counter.add(point);
                self.buckets.push_back(Bucket {
                    minute,
                    first_added: now,
                    counter,
                });
            }
        }
    }

    fn remove<P: Point + ?Sized>(&mut self, _point: &P) {
        panic!(
            "removing from an expiring counter is not supported: \
             contributions are merged into per-minute aggregates"
        );
    }

    fn summary(&self) -> Option<CountPoint> {
        self.current().summary()
    }
}

impl<A> fmt::Debug for ExpiringCounter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCounter")
            .field("buckets", &self.buckets.len())
            .field("expiration", &self.expiration)
            .finish()
    }
}
