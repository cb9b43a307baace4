use geogrid::loader::{points_from_json, points_from_path};
use geogrid::{
    ClusterView, ClusteringIndex, Config, CountIndex, GeoPoint, ManualClock, Meters, Minutes,
    NearbyService, NearbyView, PointsIndex, SnapshotIndex,
};
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;

const HOTELS: &str = r#"[
    { "hotelId": "1", "lat": 37.7867, "lon": -122.4112 },
    { "hotelId": "2", "lat": 37.7854, "lon": -122.4005 },
    { "hotelId": "3", "lat": 37.7834, "lon": -122.4071 },
    { "hotelId": "4", "lat": 37.7936, "lon": -122.3930 },
    { "hotelId": "5", "lat": 37.7831, "lon": -122.4181 },
    { "hotelId": "6", "lat": 37.7863, "lon": -122.4015 },
    { "hotelId": "7", "lat": 37.7841, "lon": -122.4076 }
]"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_nearby_service_from_file() {
    init_logging();

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(HOTELS.as_bytes()).unwrap();

    let service = NearbyService::load_json(&Config::default(), file.path()).unwrap();
    assert_eq!(service.len(), 7);

    // the default service answers with at most five ids
    let ids = service.nearby(37.7835, -122.41);
    assert_eq!(ids.len(), 5);
    assert_eq!(ids, vec!["7", "3", "1", "5", "6"]);

    // moving a hotel far away takes it out of the answer
    service.upsert(GeoPoint::new("7", 40.7128, -74.0060));
    assert_eq!(service.nearby(37.7835, -122.41), vec!["3", "1", "5", "6", "2"]);

    match service.within_bounds(&GeoPoint::at(41.0, -74.5), &GeoPoint::at(40.5, -73.5)) {
        NearbyView::Clusters(clusters) => {
            assert_eq!(clusters.iter().filter_map(|c| c.count()).sum::<u64>(), 1);
        }
        NearbyView::Hotels(ids) => panic!("expected clusters, got {ids:?}"),
    }
}

#[test]
fn test_nearby_results_match_points_index() {
    let points = points_from_json(HOTELS).unwrap();
    let service = NearbyService::from_points(&Config::default(), points.clone()).unwrap();

    let mut index = PointsIndex::new(Meters::km(0.5));
    for point in points {
        index.add(point);
    }

    let query = GeoPoint::at(37.7867, -122.4112);
    let expected: Vec<String> = index
        .k_nearest(&query, 5, Meters::km(10.0), |_| true)
        .into_iter()
        .map(|p| p.id.clone())
        .collect();

    assert_eq!(service.nearby(query.lat, query.lon), expected);
}

#[test]
fn test_points_from_missing_path() {
    assert!(points_from_path("/definitely/not/here.json").is_err());
}

#[test]
fn test_snapshot_readers_during_writes() {
    init_logging();

    let shared = Arc::new(SnapshotIndex::new(ClusteringIndex::<GeoPoint>::new()));
    let writer = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || {
            for i in 0..100 {
                let lon = -0.2 + i as f64 * 0.002;
                shared.update(|index| index.add(GeoPoint::new(format!("p{i}"), 51.5, lon)));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let mut seen = 0;
                while seen < 100 {
                    let snapshot = shared.load();
                    let len = snapshot.len();
                    assert!(len >= seen);

                    // every published point is reachable through the snapshot
                    for i in 0..len {
                        assert!(snapshot.get(&format!("p{i}")).is_some());
                    }
                    seen = len;
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(shared.generation(), 100);
}

#[test]
fn test_clustering_views_agree_on_totals() {
    let points = points_from_json(HOTELS).unwrap();
    let mut index = ClusteringIndex::new();
    for point in points {
        index.add(point);
    }

    let top_left = GeoPoint::at(37.9, -122.6);
    let bottom_right = GeoPoint::at(37.6, -122.2);
    let ClusterView::Clusters(city) = index.range(&top_left, &bottom_right) else {
        panic!("expected city clusters");
    };
    let city_total: u64 = city.iter().filter_map(|c| c.count()).sum();

    let world_total: u64 = index
        .world()
        .range(&GeoPoint::at(80.0, -170.0), &GeoPoint::at(-80.0, 170.0))
        .iter()
        .filter_map(|c| c.count())
        .sum();

    assert_eq!(city_total, 7);
    assert_eq!(world_total, 7);
}

#[test]
fn test_expiring_clustering_index_over_time() {
    let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200);
    let clock = ManualClock::shared(start);
    let mut index = ClusteringIndex::expiring(Minutes(10), clock.clone());

    index.add(GeoPoint::new("early", 51.5, -0.12));
    clock.advance(Duration::from_secs(5 * 60));
    index.add(GeoPoint::new("late", 51.5, -0.11));

    let query = GeoPoint::at(51.5, -0.115);
    assert_eq!(index.k_nearest(&query, 5, Meters::km(2.0), |_| true).len(), 2);

    clock.advance(Duration::from_secs(5 * 60));
    let remaining = index.k_nearest(&query, 5, Meters::km(2.0), |_| true);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "late");

    let world = index.range(&GeoPoint::at(60.0, -10.0), &GeoPoint::at(45.0, 10.0));
    let ClusterView::Clusters(clusters) = world else {
        panic!("expected clusters");
    };
    assert_eq!(clusters[0].count(), Some(1));
}

#[test]
fn test_count_index_tracks_moves() {
    let mut index = CountIndex::new(Meters::km(10.0));
    index.add(GeoPoint::new("taxi", 51.5, -0.12));
    index.add(GeoPoint::new("taxi", 51.6, -0.12));
    index.add(GeoPoint::new("taxi", 51.7, -0.12));

    let clusters = index.range(&GeoPoint::at(52.0, -1.0), &GeoPoint::at(51.0, 1.0));
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].lat, 51.7);
}
