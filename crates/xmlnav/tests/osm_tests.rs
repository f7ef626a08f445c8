use xmlnav::osm::{self, OsmError, Point, WayKind};
use xmlnav::{Cursor, CursorError};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const MAP: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/map.osm");

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn test_load_fixture_map() -> TestResult {
    let map = osm::load_file(MAP)?;

    let bounds = map.bounds.ok_or("fixture has bounds")?;
    assert!(close(bounds.min_lat, 52.5));
    assert!(close(bounds.max_lon, 13.41));

    assert_eq!(map.points.len(), 7);
    assert_eq!(
        map.points.keys().map(String::as_str).collect::<Vec<_>>(),
        ["100", "101", "102", "103", "200", "201", "202"]
    );

    let ids: Vec<&str> = map.ways.iter().map(|way| way.id.as_str()).collect();
    assert_eq!(ids, ["1000", "1001", "1002", "1003", "1004"]);

    let kinds: Vec<WayKind> = map.ways.iter().map(|way| way.kind).collect();
    assert_eq!(
        kinds,
        [
            WayKind::Building,
            WayKind::Water,
            WayKind::Residential,
            WayKind::Grass,
            WayKind::Unclassified,
        ]
    );
    Ok(())
}

#[test]
fn test_way_points_follow_nd_order() -> TestResult {
    let map = osm::load_file(MAP)?;
    let building = map.ways.first().ok_or("building way")?;

    assert_eq!(building.points.len(), 5);
    assert_eq!(building.points.first(), building.points.last());
    assert_eq!(building.points.get(1).copied(), map.point("101"));

    let residential = map.ways.get(2).ok_or("residential way")?;
    assert_eq!(residential.points.len(), 1);
    assert_eq!(residential.missing_refs, 1);
    Ok(())
}

#[test]
fn test_projection_of_fixture_points() -> TestResult {
    let map = osm::load_file(MAP)?;
    let bounds = map.bounds.ok_or("fixture has bounds")?;
    assert!(close(bounds.scale(), 200_000.0));

    let corner = map.point("100").ok_or("node 100")?;
    let (x, y) = bounds.project(corner);
    assert!(close(x, 200.0), "x = {x}");
    assert!(close(y, 200.0), "y = {y}");

    let (x, y) = bounds.project(Point {
        lat: bounds.min_lat,
        lon: bounds.min_lon,
    });
    assert!(close(x, 0.0) && close(y, 0.0));
    Ok(())
}

#[test]
fn test_load_leaves_cursor_usable() -> TestResult {
    let mut cursor = Cursor::open(MAP)?;
    let map = osm::load(&mut cursor)?;
    assert_eq!(map.ways_of(WayKind::Water).count(), 1);

    assert_eq!(cursor.name(), "osm");
    assert!(cursor.enter());
    assert!(cursor.find("relation"));
    assert_eq!(cursor.attribute("id"), "5000");
    Ok(())
}

#[test]
fn test_missing_map_file() {
    let err = osm::load_file("/no/such/map.osm").err();
    assert!(matches!(
        err,
        Some(OsmError::Cursor(CursorError::OpenFailed { .. }))
    ));
}

#[test]
fn test_map_serializes_to_json() -> TestResult {
    let map = osm::load_file(MAP)?;
    let json = serde_json::to_value(&map)?;

    assert_eq!(json["ways"][0]["kind"], "building");
    assert_eq!(json["ways"][4]["kind"], "unclassified");
    assert_eq!(json["ways"][2]["missing_refs"], 1);
    assert!(json["points"]["200"]["lat"].is_number());
    assert!(json["bounds"]["min_lat"].is_number());
    Ok(())
}
