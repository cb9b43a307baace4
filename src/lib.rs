//! In-memory grid spatial index with range, k-nearest, clustering and expiring queries.
//!
//! ```rust
//! use geogrid::{ClusterView, ClusteringIndex, GeoPoint, Meters};
//!
//! let mut index = ClusteringIndex::new();
//! index.add(GeoPoint::new("Waterloo", 51.502973, -0.114723));
//! index.add(GeoPoint::new("Kings Cross", 51.529999, -0.124481));
//! index.add(GeoPoint::new("Leicester Square", 51.511291, -0.128242));
//!
//! let here = GeoPoint::at(51.511291, -0.128242);
//! let nearest = index.k_nearest(&here, 2, Meters::km(5.0), |_| true);
//! assert_eq!(nearest[1].id, "Waterloo");
//!
//! // a map of the whole of Europe comes back as clusters
//! let view = index.range(&GeoPoint::at(60.0, -10.0), &GeoPoint::at(35.0, 30.0));
//! assert!(matches!(view, ClusterView::Clusters(_)));
//! ```

pub mod clock;
pub mod clustering;
pub mod config;
pub mod count_index;
pub mod counters;
pub mod error;
pub mod expiring;
pub mod geometry;
pub mod grid;
pub mod loader;
pub mod nearby;
pub mod points_index;
pub mod sets;
pub mod snapshot;

pub use error::{GeoGridError, Result};

pub use geogrid_types::point::{Aggregate, CountPoint, GeoPoint, Point};
pub use geogrid_types::units::{Meters, Minutes};

pub use clock::{Clock, ManualClock, SystemClock};

pub use config::{ClusterConfig, Config, NearbyConfig};

pub use counters::{Accumulator, AverageCounter, CellCounter, CentroidCounter, MultiCounter};

pub use expiring::{ExpiringCounter, ExpiringSet};

pub use sets::{BasicSet, PointSet};

pub use points_index::{ExpiringPointsIndex, PointsIndex};

pub use count_index::{CountIndex, ExpiringCountIndex};

pub use clustering::{ClusterView, ClusteringIndex, ExpiringClusteringIndex, Tier};

pub use snapshot::SnapshotIndex;

pub use nearby::{NearbyService, NearbyView};

pub use geometry::{Direction, distance};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{GeoGridError, Result};

    pub use crate::{CountPoint, GeoPoint, Meters, Minutes, Point};

    pub use crate::{ClusterView, ClusteringIndex, CountIndex, PointsIndex};

    pub use crate::{Config, NearbyService, SnapshotIndex};

    pub use crate::clock::{Clock, ManualClock};

    pub use crate::geometry::distance;
}
