//! # geogrid-types
//!
//! Point and unit types shared by the `geogrid` spatial index.
//!
//! - **Point types**: the [`Point`](point::Point) capability trait, the owned
//!   [`GeoPoint`](point::GeoPoint) and the synthetic [`CountPoint`](point::CountPoint)
//!   produced by aggregating indexes.
//! - **Units**: [`Meters`](units::Meters) and [`Minutes`](units::Minutes).
//!
//! ## Examples
//!
//! ```rust
//! use geogrid_types::point::{GeoPoint, Point};
//! use geogrid_types::units::Meters;
//!
//! let waterloo = GeoPoint::new("Waterloo", 51.502973, -0.114723);
//! assert_eq!(waterloo.id(), "Waterloo");
//! assert_eq!(Meters::km(0.5).value(), 500.0);
//! ```

pub mod point;
pub mod units;
