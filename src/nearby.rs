//! Hotel lookup service on top of a published clustering index.

use crate::clustering::{ClusterView, ClusteringIndex};
use crate::config::{Config, NearbyConfig};
use crate::error::{GeoGridError, Result};
use crate::loader;
use crate::snapshot::SnapshotIndex;
use geogrid_types::point::{CountPoint, GeoPoint};
use std::path::Path;
use std::sync::Arc;

/// Answer of [`NearbyService::within_bounds`].
#[derive(Debug, Clone, PartialEq)]
pub enum NearbyView {
    Hotels(Vec<String>),
    Clusters(Vec<CountPoint>),
}

/// Finds the hotels closest to a location.
///
/// Queries run against the latest published snapshot and never block
/// writers; `upsert` and `remove` publish a new snapshot.
///
/// # Examples
///
/// ```rust
/// use geogrid::{Config, GeoPoint, NearbyService};
///
/// let hotels = vec![
///     GeoPoint::new("1", 37.7867, -122.4112),
///     GeoPoint::new("2", 37.7854, -122.4005),
/// ];
/// let service = NearbyService::from_points(&Config::default(), hotels)?;
///
/// assert_eq!(service.nearby(37.7866, -122.4110), vec!["1", "2"]);
/// # Ok::<(), geogrid::GeoGridError>(())
/// ```
#[derive(Debug)]
pub struct NearbyService {
    index: SnapshotIndex<ClusteringIndex<GeoPoint>>,
    limits: NearbyConfig,
}

impl NearbyService {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        if config.clustering.expiration.is_some() {
            return Err(GeoGridError::Config(
                "the nearby service publishes snapshots and cannot use expiring indexes"
                    .to_string(),
            ));
        }

        Ok(Self {
            index: SnapshotIndex::new(ClusteringIndex::with_config(&config.clustering)),
            limits: config.nearby.clone(),
        })
    }

    pub fn from_points(
        config: &Config,
        points: impl IntoIterator<Item = GeoPoint>,
    ) -> Result<Self> {
        let service = Self::new(config)?;
        service.upsert_many(points);
        Ok(service)
    }

    /// Build a service from a hotel JSON file.
    pub fn load_json(config: &Config, path: impl AsRef<Path>) -> Result<Self> {
        let points = loader::points_from_path(path)?;
        Self::from_points(config, points)
    }

    /// Ids of the closest hotels, nearest first.
    pub fn nearby(&self, lat: f64, lon: f64) -> Vec<String> {
        let center = GeoPoint::at(lat, lon);
        let index = self.index.load();

        index
            .k_nearest(
                &center,
                self.limits.max_search_results,
                self.limits.max_search_radius,
                |_| true,
            )
            .into_iter()
            .map(|hotel| hotel.id.clone())
            .collect()
    }

    /// Hotel ids inside a small rectangle, or clusters for a large one.
    pub fn within_bounds(&self, top_left: &GeoPoint, bottom_right: &GeoPoint) -> NearbyView {
        let index = self.index.load();

        match index.range(top_left, bottom_right) {
            ClusterView::Points(hotels) => {
                NearbyView::Hotels(hotels.into_iter().map(|hotel| hotel.id.clone()).collect())
            }
            ClusterView::Clusters(clusters) => NearbyView::Clusters(clusters),
        }
    }

    pub fn upsert(&self, hotel: GeoPoint) {
        self.index.update(|index| index.add(hotel));
    }

    /// Add or move many hotels in a single published update.
    pub fn upsert_many(&self, hotels: impl IntoIterator<Item = GeoPoint>) {
        let count = self.index.update(|index| {
            let mut count = 0;
            for hotel in hotels {
                index.add(hotel);
                count += 1;
            }
            count
        });
        log::debug!("upserted {count} hotels");
    }

    /// Returns whether the hotel was known.
    pub fn remove(&self, hotel_id: &str) -> bool {
        self.index.update(|index| index.remove(hotel_id).is_some())
    }

    /// The currently published index.
    pub fn snapshot(&self) -> Arc<ClusteringIndex<GeoPoint>> {
        self.index.load()
    }

    pub fn len(&self) -> usize {
        self.index.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
