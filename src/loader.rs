//! Loading points from externally owned data files.
//!
//! The primary format is a JSON array of hotel records:
//!
//! ```json
//! [{ "hotelId": "1", "lat": 37.7867, "lon": -122.4112 }]
//! ```
//!
//! With the `geojson` feature, points can also be read from and written to a
//! GeoJSON `FeatureCollection` of `Point` features. Records with unusable
//! coordinates are skipped with a warning instead of failing the whole load.

use crate::error::Result;
use geogrid_types::point::{GeoPoint, Point};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One entry of a hotel location file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelRecord {
    #[serde(rename = "hotelId")]
    pub hotel_id: String,
    pub lat: f64,
    pub lon: f64,
}

impl From<HotelRecord> for GeoPoint {
    fn from(record: HotelRecord) -> Self {
        GeoPoint::new(record.hotel_id, record.lat, record.lon)
    }
}

/// Whether a latitude/longitude pair is finite and within normal bounds.
pub fn valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

fn keep_valid(records: Vec<HotelRecord>) -> Vec<GeoPoint> {
    let total = records.len();
    let points: Vec<GeoPoint> = records
        .into_iter()
        .filter(|record| {
            let valid = valid_coordinates(record.lat, record.lon);
            if !valid {
                log::warn!(
                    "Skipping record {} with invalid coordinates ({}, {})",
                    record.hotel_id,
                    record.lat,
                    record.lon
                );
            }
            valid
        })
        .map(GeoPoint::from)
        .collect();

    log::debug!("loaded {} of {} point records", points.len(), total);
    points
}

pub fn points_from_json(json: &str) -> Result<Vec<GeoPoint>> {
    let records: Vec<HotelRecord> = serde_json::from_str(json)?;
    Ok(keep_valid(records))
}

pub fn points_from_reader<R: Read>(reader: R) -> Result<Vec<GeoPoint>> {
    let records: Vec<HotelRecord> = serde_json::from_reader(reader)?;
    Ok(keep_valid(records))
}

pub fn points_from_path(path: impl AsRef<Path>) -> Result<Vec<GeoPoint>> {
    let file = File::open(path.as_ref())?;
    points_from_reader(BufReader::new(file))
}

/// Serialize points as hotel records.
pub fn points_to_json<'a, P: Point + 'a>(
    points: impl IntoIterator<Item = &'a P>,
) -> Result<String> {
    let records: Vec<HotelRecord> = points
        .into_iter()
        .map(|p| HotelRecord {
            hotel_id: p.id().to_owned(),
            lat: p.lat(),
            lon: p.lon(),
        })
        .collect();
    Ok(serde_json::to_string(&records)?)
}

#[cfg(feature = "geojson")]
fn feature_id(feature: &geojson::Feature) -> Option<String> {
    use geojson::feature::Id;

    match &feature.id {
        Some(Id::String(id)) => Some(id.clone()),
        Some(Id::Number(id)) => Some(id.to_string()),
        None => feature
            .properties
            .as_ref()
            .and_then(|props| props.get("id"))
            .and_then(|id| match id {
                serde_json::Value::String(id) => Some(id.clone()),
                serde_json::Value::Number(id) => Some(id.to_string()),
                _ => None,
            }),
    }
}

/// Read `Point` features from a GeoJSON `FeatureCollection`.
///
/// The point id is the feature id, or else its `"id"` property. Features
/// without an id or without a point geometry are skipped.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "geojson")]
/// # {
/// use geogrid::loader::points_from_geojson;
///
/// let json = r#"{
///     "type": "FeatureCollection",
///     "features": [{
///         "type": "Feature",
///         "id": "Waterloo",
///         "geometry": { "type": "Point", "coordinates": [-0.114723, 51.502973] },
///         "properties": null
///     }]
/// }"#;
/// let points = points_from_geojson(json).unwrap();
/// assert_eq!(points[0].id, "Waterloo");
/// assert_eq!(points[0].lat, 51.502973);
/// # }
/// ```
#[cfg(feature = "geojson")]
pub fn points_from_geojson(json: &str) -> Result<Vec<GeoPoint>> {
    use crate::error::GeoGridError;
    use geojson::{FeatureCollection, Value};

    let collection: FeatureCollection = serde_json::from_str(json)
        .map_err(|e| GeoGridError::InvalidInput(format!("Failed to parse GeoJSON: {}", e)))?;

    let mut records = Vec::with_capacity(collection.features.len());
    for feature in &collection.features {
        let Some(id) = feature_id(feature) else {
            log::warn!("Skipping GeoJSON feature without an id");
            continue;
        };

        match feature.geometry.as_ref().map(|geometry| &geometry.value) {
            Some(Value::Point(coords)) if coords.len() >= 2 => records.push(HotelRecord {
                hotel_id: id,
                lat: coords[1],
                lon: coords[0],
            }),
            _ => log::warn!("Skipping GeoJSON feature {id}: geometry is not a Point"),
        }
    }

    Ok(keep_valid(records))
}

/// Write points as a GeoJSON `FeatureCollection` of `Point` features.
#[cfg(feature = "geojson")]
pub fn points_to_geojson<'a, P: Point + 'a>(
    points: impl IntoIterator<Item = &'a P>,
) -> Result<String> {
    use geojson::feature::Id;
    use geojson::{Feature, FeatureCollection, Geometry, Value};

    let features = points
        .into_iter()
        .map(|p| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![p.lon(), p.lat()]))),
            id: Some(Id::String(p.id().to_owned())),
            properties: None,
            foreign_members: None,
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    Ok(serde_json::to_string(&collection)?)
}
