//! Three-tier index that picks a resolution per query.
//!
//! Small rectangles are answered with raw points from a fine points index.
//! Larger ones get per-cell aggregates from a city-level or world-level
//! count index, depending on the great-circle distance between the corners.

use crate::clock::Clock;
use crate::config::ClusterConfig;
use crate::count_index::CountIndex;
use crate::counters::{Accumulator, CellCounter, CentroidCounter};
use crate::error::{GeoGridError, Result};
use crate::expiring::{ExpiringCounter, ExpiringSet};
use crate::geometry::distance;
use crate::points_index::PointsIndex;
use crate::sets::{BasicSet, PointSet};
use geogrid_types::point::{CountPoint, Point};
use geogrid_types::units::{Meters, Minutes};
use std::fmt;
use std::sync::Arc;

pub type ExpiringClusteringIndex<P, A = CentroidCounter> =
    ClusteringIndex<P, ExpiringSet<P>, ExpiringCounter<A>>;

/// The tier that answers a range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Street,
    City,
    World,
}

/// Result of [`ClusteringIndex::range`].
///
/// Which variant comes back depends on the size of the rectangle, so callers
/// must handle both.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterView<'a, P> {
    Points(Vec<&'a P>),
    Clusters(Vec<CountPoint>),
}

impl<P> ClusterView<'_, P> {
    pub fn len(&self) -> usize {
        match self {
            ClusterView::Points(points) => points.len(),
            ClusterView::Clusters(clusters) => clusters.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ClusteringIndex<P, S = BasicSet<P>, C = CentroidCounter> {
    street: PointsIndex<P, S>,
    city: CountIndex<P, C>,
    world: CountIndex<P, C>,
    street_threshold: Meters,
    city_threshold: Meters,
}

impl<P: Point + 'static> ClusteringIndex<P> {
    /// Tiers of 0.5 km, 10 km and 500 km split at 45 km and 1000 km.
    pub fn new() -> Self {
        Self::with_config(&ClusterConfig::default())
    }

    pub fn with_config(config: &ClusterConfig) -> Self {
        if config.expiration.is_some() {
            log::warn!("expiration is ignored by a non-expiring clustering index");
        }

        Self {
            street: PointsIndex::new(config.street_resolution),
            city: CountIndex::new(config.city_resolution),
            world: CountIndex::new(config.world_resolution),
            street_threshold: config.street_threshold,
            city_threshold: config.city_threshold,
        }
    }
}

impl<P: Point + 'static> Default for ClusteringIndex<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Point + 'static> ClusteringIndex<P, ExpiringSet<P>, ExpiringCounter<CentroidCounter>> {
    /// Default tiers, with every point and count expiring after `expiration`.
    pub fn expiring(expiration: Minutes, clock: Arc<dyn Clock>) -> Self {
        let config = ClusterConfig::default().with_expiration(expiration);
        Self::expiring_tiers(&config, expiration, clock)
    }

    /// Tiers from `config`, which must carry an expiration.
    pub fn expiring_with_config(config: &ClusterConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let expiration = config.expiration.ok_or_else(|| {
            GeoGridError::Config("an expiring clustering index needs an expiration".to_string())
        })?;
        Ok(Self::expiring_tiers(config, expiration, clock))
    }

    fn expiring_tiers(config: &ClusterConfig, expiration: Minutes, clock: Arc<dyn Clock>) -> Self {
        Self {
            street: PointsIndex::expiring(config.street_resolution, expiration, Arc::clone(&clock)),
            city: CountIndex::expiring(config.city_resolution, expiration, Arc::clone(&clock)),
            world: CountIndex::expiring(config.world_resolution, expiration, clock),
            street_threshold: config.street_threshold,
            city_threshold: config.city_threshold,
        }
    }
}

impl<P: Point, A: Accumulator> ClusteringIndex<P, ExpiringSet<P>, ExpiringCounter<A>> {
    /// Release expired points and buckets in every tier.
    pub fn expire(&mut self) {
        self.street.expire();
        self.city.expire();
        self.world.expire();
    }
}

impl<P: Point + Clone, S: PointSet<P>, C: CellCounter> ClusteringIndex<P, S, C> {
    pub fn street(&self) -> &PointsIndex<P, S> {
        &self.street
    }

    pub fn city(&self) -> &CountIndex<P, C> {
        &self.city
    }

    pub fn world(&self) -> &CountIndex<P, C> {
        &self.world
    }

    /// Number of live points.
    pub fn len(&self) -> usize {
        self.street.len()
    }

    pub fn is_empty(&self) -> bool {
        self.street.is_empty()
    }

    /// Add `point` to every tier, replacing any point stored under its id.
    ///
    /// Expiring indexes cannot take a contribution back, so re-adding an id
    /// replaces it in the street tier but counts it again in the city and
    /// world tiers until the earlier contribution expires.
    pub fn add(&mut self, point: P) {
        self.street.add(point.clone());
        self.city.add(point.clone());
        self.world.add(point);
    }

    /// Remove `id` from every tier.
    ///
    /// # Panics
    ///
    /// Panics on expiring indexes, whose counters cannot give contributions back.
    pub fn remove(&mut self, id: &str) -> Option<P> {
        if !C::REMOVABLE {
            panic!("remove is not supported by expiring clustering indexes");
        }

        self.city.remove(id);
        self.world.remove(id);
        self.street.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&P> {
        self.street.get(id)
    }

    /// The tier that answers a query whose corners are `span` apart.
    pub fn tier_for(&self, span: Meters) -> Tier {
        if span < self.street_threshold {
            Tier::Street
        } else if span < self.city_threshold {
            Tier::City
        } else {
            Tier::World
        }
    }

    pub fn range<A: Point + ?Sized, B: Point + ?Sized>(
        &self,
        top_left: &A,
        bottom_right: &B,
    ) -> ClusterView<'_, P> {
        let span = distance(top_left, bottom_right);

        match self.tier_for(span) {
            Tier::Street => ClusterView::Points(self.street.range(top_left, bottom_right)),
            Tier::City => ClusterView::Clusters(self.city.range(top_left, bottom_right)),
            Tier::World => ClusterView::Clusters(self.world.range(top_left, bottom_right)),
        }
    }

    /// Nearest points, always from the street tier.
    pub fn k_nearest<Q: Point + ?Sized>(
        &self,
        point: &Q,
        k: usize,
        max_distance: Meters,
        accept: impl Fn(&P) -> bool,
    ) -> Vec<&P> {
        self.street.k_nearest(point, k, max_distance, accept)
    }

    pub fn points_within<Q: Point + ?Sized>(
        &self,
        point: &Q,
        radius: Meters,
        accept: impl Fn(&P) -> bool,
    ) -> Vec<&P> {
        self.street.points_within(point, radius, accept)
    }
}

impl<P: Clone, S: Clone, C: Clone> Clone for ClusteringIndex<P, S, C> {
    fn clone(&self) -> Self {
        Self {
            street: self.street.clone(),
            city: self.city.clone(),
            world: self.world.clone(),
            street_threshold: self.street_threshold,
            city_threshold: self.city_threshold,
        }
    }
}

impl<P, S, C> fmt::Debug for ClusteringIndex<P, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusteringIndex")
            .field("street", &self.street)
            .field("city", &self.city)
            .field("world", &self.world)
            .field("street_threshold", &self.street_threshold)
            .field("city_threshold", &self.city_threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use geogrid_types::point::GeoPoint;
    use std::time::{Duration, SystemTime};

    fn london() -> ClusteringIndex<GeoPoint> {
        let mut index = ClusteringIndex::new();
        index.add(GeoPoint::new("Waterloo", 51.502973, -0.114723));
        index.add(GeoPoint::new("Kings Cross", 51.529999, -0.124481));
        index.add(GeoPoint::new("Leicester Square", 51.511291, -0.128242));
        index
    }

    fn total(view: &ClusterView<'_, GeoPoint>) -> u64 {
        match view {
            ClusterView::Clusters(clusters) => clusters.iter().filter_map(|c| c.count()).sum(),
            ClusterView::Points(_) => panic!("expected clusters"),
        }
    }

    #[test]
    fn test_small_span_returns_points() {
        let index = london();
        let top_left = GeoPoint::at(51.515, -0.13);
        let bottom_right = GeoPoint::at(51.508, -0.12);
        assert!(distance(&top_left, &bottom_right) < Meters::km(2.0));

        let ClusterView::Points(points) = index.range(&top_left, &bottom_right) else {
            panic!("expected raw points");
        };
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, "Leicester Square");
    }

    #[test]
    fn test_medium_span_returns_city_clusters() {
        let index = london();
        let top_left = GeoPoint::at(51.8, -0.6);
        let bottom_right = GeoPoint::at(51.2, 0.4);

        let view = index.range(&top_left, &bottom_right);
        assert_eq!(index.tier_for(distance(&top_left, &bottom_right)), Tier::City);
        assert_eq!(total(&view), 3);
    }

    #[test]
    fn test_large_span_returns_world_clusters() {
        let index = london();
        let top_left = GeoPoint::at(60.0, -10.0);
        let bottom_right = GeoPoint::at(45.0, 10.0);
        assert!(distance(&top_left, &bottom_right) > Meters::km(2000.0));

        let view = index.range(&top_left, &bottom_right);
        assert_eq!(view.len(), 1);
        assert_eq!(total(&view), 3);
    }

    #[test]
    fn test_tier_thresholds() {
        let index: ClusteringIndex<GeoPoint> = ClusteringIndex::new();
        assert_eq!(index.tier_for(Meters::km(1.0)), Tier::Street);
        assert_eq!(index.tier_for(Meters::km(45.0)), Tier::City);
        assert_eq!(index.tier_for(Meters::km(999.0)), Tier::City);
        assert_eq!(index.tier_for(Meters::km(1000.0)), Tier::World);
        assert_eq!(index.tier_for(Meters::km(2000.0)), Tier::World);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = ClusterConfig::default().with_thresholds(Meters::km(1.0), Meters::km(5.0));
        let index: ClusteringIndex<GeoPoint> = ClusteringIndex::with_config(&config);
        assert_eq!(index.tier_for(Meters::km(2.0)), Tier::City);
        assert_eq!(index.tier_for(Meters::km(10.0)), Tier::World);
    }

    #[test]
    fn test_k_nearest_uses_street_tier() {
        let index = london();
        let query = GeoPoint::at(51.511291, -0.128242);
        let nearest = index.k_nearest(&query, 2, Meters::km(5.0), |_| true);
        let ids: Vec<&str> = nearest.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["Leicester Square", "Waterloo"]);
    }

    #[test]
    fn test_remove_propagates_to_every_tier() {
        let mut index = london();
        assert!(index.remove("Kings Cross").is_some());
        assert!(index.get("Kings Cross").is_none());
        assert_eq!(index.len(), 2);

        let view = index.range(&GeoPoint::at(60.0, -10.0), &GeoPoint::at(45.0, 10.0));
        assert_eq!(total(&view), 2);
    }

    #[test]
    fn test_clone_is_independent() {
        let index = london();
        let mut copy = index.clone();
        copy.add(GeoPoint::new("Euston", 51.528, -0.1337));

        assert_eq!(index.len(), 3);
        assert_eq!(copy.len(), 4);
    }

    #[test]
    fn test_expiring_index() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200);
        let clock = ManualClock::shared(start);
        let mut index = ClusteringIndex::expiring(Minutes(5), clock.clone());
        index.add(GeoPoint::new("Waterloo", 51.502973, -0.114723));

        let world = (GeoPoint::at(60.0, -10.0), GeoPoint::at(45.0, 10.0));
        assert_eq!(total(&index.range(&world.0, &world.1)), 1);

        clock.advance(Duration::from_secs(300));
        assert!(index.get("Waterloo").is_none());
        assert!(index.range(&world.0, &world.1).is_empty());

        index.expire();
        assert_eq!(index.street().cell_count(), 0);
        assert_eq!(index.world().cell_count(), 0);
    }

    #[test]
    fn test_expiring_readd_counts_again_in_aggregate_tiers() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200);
        let clock = ManualClock::shared(start);
        let mut index = ClusteringIndex::expiring(Minutes(5), clock.clone());
        index.add(GeoPoint::new("Waterloo", 51.502973, -0.114723));
        clock.advance(Duration::from_secs(120));
        index.add(GeoPoint::new("Waterloo", 51.502973, -0.114723));

        assert_eq!(index.len(), 1);
        let world = (GeoPoint::at(60.0, -10.0), GeoPoint::at(45.0, 10.0));
        assert_eq!(total(&index.range(&world.0, &world.1)), 2);

        // the first contribution leaves with its window
        clock.advance(Duration::from_secs(180));
        assert_eq!(index.len(), 1);
        assert_eq!(total(&index.range(&world.0, &world.1)), 1);
    }

    #[test]
    fn test_expiring_with_config_requires_expiration() {
        let clock = ManualClock::shared(SystemTime::UNIX_EPOCH);
        let result: Result<ExpiringClusteringIndex<GeoPoint>> =
            ClusteringIndex::expiring_with_config(&ClusterConfig::default(), clock);
        assert!(matches!(result, Err(GeoGridError::Config(_))));
    }

    #[test]
    #[should_panic(expected = "not supported")]
    fn test_expiring_remove_panics() {
        let clock = ManualClock::shared(SystemTime::UNIX_EPOCH);
        let mut index: ExpiringClusteringIndex<GeoPoint> =
            ClusteringIndex::expiring(Minutes(5), clock);
        index.add(GeoPoint::new("Waterloo", 51.502973, -0.114723));
        index.remove("Waterloo");
    }
}
