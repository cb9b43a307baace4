use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Anything with a stable identity and a latitude/longitude in degrees.
///
/// Indexes never mutate a point's coordinates; moving a point is a
/// remove followed by an add under the same id.
///
/// # Examples
///
/// ```
/// use geogrid_types::point::Point;
///
/// struct Hotel {
///     id: String,
///     lat: f64,
///     lon: f64,
/// }
///
/// impl Point for Hotel {
///     fn id(&self) -> &str {
///         &self.id
///     }
///     fn lat(&self) -> f64 {
///         self.lat
///     }
///     fn lon(&self) -> f64 {
///         self.lon
///     }
/// }
///
/// let hotel = Hotel { id: "1".into(), lat: 37.7867, lon: -122.4112 };
/// assert_eq!(hotel.to_geo().x(), -122.4112);
/// ```
pub trait Point {
    fn id(&self) -> &str;

    fn lat(&self) -> f64;

    fn lon(&self) -> f64;

    /// Optional numeric payload, consumed by averaging counters.
    fn value(&self) -> Option<f64> {
        None
    }

    /// Convert to a `geo` point (x = longitude, y = latitude).
    fn to_geo(&self) -> geo::Point<f64> {
        geo::Point::new(self.lon(), self.lat())
    }
}

macro_rules! forward_point {
    ($($wrapper:ty),*) => {
        $(
            impl<T: Point + ?Sized> Point for $wrapper {
                fn id(&self) -> &str {
                    (**self).id()
                }

                fn lat(&self) -> f64 {
                    (**self).lat()
                }

                fn lon(&self) -> f64 {
                    (**self).lon()
                }

                fn value(&self) -> Option<f64> {
                    (**self).value()
                }
            }
        )*
    };
}

forward_point!(&T, Box<T>, Rc<T>, Arc<T>);

/// An owned point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
        }
    }

    /// An anonymous point, used as a query center or rectangle corner.
    pub fn at(lat: f64, lon: f64) -> Self {
        Self::new(String::new(), lat, lon)
    }
}

impl Point for GeoPoint {
    fn id(&self) -> &str {
        &self.id
    }

    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.6} {:.6}", self.id, self.lat, self.lon)
    }
}

/// The aggregate carried by a [`CountPoint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    /// Number of points in the cell.
    Count(u64),
    /// Number of contributions per point id.
    PerId(BTreeMap<String, u64>),
    /// Running average of the contributing points' values.
    Average(f64),
}

/// A synthetic point at the centroid of one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountPoint {
    pub lat: f64,
    pub lon: f64,
    pub aggregate: Aggregate,
}

impl CountPoint {
    pub fn new(lat: f64, lon: f64, aggregate: Aggregate) -> Self {
        Self {
            lat,
            lon,
            aggregate,
        }
    }

    /// A point carrying a numeric payload, suitable for averaging indexes.
    pub fn with_value(lat: f64, lon: f64, value: f64) -> Self {
        Self::new(lat, lon, Aggregate::Average(value))
    }

    /// Total number of contributions, when the aggregate is a count.
    pub fn count(&self) -> Option<u64> {
        match &self.aggregate {
            Aggregate::Count(count) => Some(*count),
            Aggregate::PerId(values) => Some(values.values().sum()),
            Aggregate::Average(_) => None,
        }
    }
}

impl Point for CountPoint {
    fn id(&self) -> &str {
        ""
    }

    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }

    fn value(&self) -> Option<f64> {
        match &self.aggregate {
            Aggregate::Count(count) => Some(*count as f64),
            Aggregate::Average(value) => Some(*value),
            Aggregate::PerId(_) => None,
        }
    }
}

impl fmt::Display for CountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.aggregate {
            Aggregate::Count(count) => write!(f, "{:.6} {:.6} {}", self.lat, self.lon, count),
            Aggregate::PerId(values) => write!(f, "{:.6} {:.6} {:?}", self.lat, self.lon, values),
            Aggregate::Average(value) => write!(f, "{:.6} {:.6} {}", self.lat, self.lon, value),
        }
    }
}
