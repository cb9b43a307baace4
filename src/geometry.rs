//! Distance and direction helpers on a spherical earth.
//!
//! [`distance`] is the authoritative great-circle distance.
//! [`approximate_square_distance`] is a planar shortcut that is only
//! meaningful for nearby points and is used purely as a sort key.

use geo::{Distance, Haversine};
use geogrid_types::point::Point;
use geogrid_types::units::Meters;
use once_cell::sync::Lazy;

/// Approximate length of one degree of latitude.
pub const LAT_DEGREE_LENGTH: Meters = Meters(111_000.0);

/// Approximate length of one degree of longitude used for cell addressing.
pub const LON_DEGREE_LENGTH: Meters = Meters(85_000.0);

/// Compass sector of a bearing, clockwise from north-east.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    North,
}

impl Direction {
    const SECTORS: [Direction; 8] = [
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::North,
    ];

    fn from_bearing(bearing: f64) -> Self {
        let index = (bearing - 22.5).rem_euclid(360.0);
        Self::SECTORS[((index / 45.0) as usize).min(7)]
    }
}

/// Great-circle distance between two points.
///
/// # Examples
///
/// ```rust
/// use geogrid::geometry::distance;
/// use geogrid::GeoPoint;
///
/// let waterloo = GeoPoint::new("Waterloo", 51.502973, -0.114723);
/// let leicester = GeoPoint::new("Leicester Square", 51.511291, -0.128242);
/// let d = distance(&waterloo, &leicester);
/// assert!((d.value() - 1_300.0).abs() < 100.0);
/// ```
pub fn distance<A: Point + ?Sized, B: Point + ?Sized>(p1: &A, p2: &B) -> Meters {
    Meters(Haversine.distance(p1.to_geo(), p2.to_geo()))
}

/// Initial bearing from `p1` to `p2`, in degrees within (-180, 180].
pub fn bearing_to<A: Point + ?Sized, B: Point + ?Sized>(p1: &A, p2: &B) -> f64 {
    let d_lon = (p2.lon() - p1.lon()).to_radians();
    let lat1 = p1.lat().to_radians();
    let lat2 = p2.lat().to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    y.atan2(x).to_degrees()
}

/// Compass direction from `p1` to `p2`.
pub fn direction_to<A: Point + ?Sized, B: Point + ?Sized>(p1: &A, p2: &B) -> Direction {
    Direction::from_bearing(bearing_to(p1, p2))
}

// Length of one longitude degree per 0.1 degree of latitude, -90.0 ..= 90.0.
static LON_LENGTH: Lazy<Vec<f64>> = Lazy::new(|| {
    (-900..=900)
        .map(|tenth| {
            let lat = f64::from(tenth) / 10.0;
            Haversine.distance(geo::Point::new(0.0, lat), geo::Point::new(1.0, lat))
        })
        .collect()
});

fn lon_degree_length(lat: f64) -> f64 {
    let tenth = ((lat * 10.0) as i64).clamp(-900, 900);
    LON_LENGTH[(tenth + 900) as usize]
}

/// Squared planar distance, assuming both points are close to each other.
pub fn approximate_square_distance<A: Point + ?Sized, B: Point + ?Sized>(p1: &A, p2: &B) -> f64 {
    let avg_lat = (p1.lat() + p2.lat()) / 2.0;

    let lat_len = (p1.lat() - p2.lat()).abs() * LAT_DEGREE_LENGTH.value();
    let lon_len = (p1.lon() - p2.lon()).abs() * lon_degree_length(avg_lat);

    lat_len * lat_len + lon_len * lon_len
}
