//! OpenStreetMap loader built on [`Cursor`]
//!
//! Reads the `bounds`, `node` and `way` children of an `<osm>` root. Ways are
//! classified from their first recognised `tag` child and their `nd`
//! references are resolved against the nodes read before them, so the file
//! must list nodes ahead of the ways that use them (as OSM exports do).

use std::fmt;
use std::num::ParseFloatError;
use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::cursor::Cursor;
use crate::error::CursorError;

/// Width, in projected units, of the latitude span of the map bounds
pub const PROJECTED_EXTENT: f64 = 2000.0;

#[derive(Error, Debug)]
pub enum OsmError {
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error("expected an <osm> root element, found <{found}>")]
    NotOsm { found: String },
    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("<{element}> attribute '{attribute}' is not a number: {value:?}")]
    InvalidNumber {
        element: String,
        attribute: &'static str,
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// Projected units per degree
    ///
    /// Infinite when the bounds have no latitude span.
    pub fn scale(&self) -> f64 {
        PROJECTED_EXTENT / (self.max_lat - self.min_lat)
    }

    /// Project a point onto the plane anchored at the minimum corner
    ///
    /// Latitude maps to x and longitude to y, both scaled by [`scale`](Self::scale).
    pub fn project(&self, point: Point) -> (f64, f64) {
        let scale = self.scale();
        (
            (point.lat - self.min_lat) * scale,
            (point.lon - self.min_lon) * scale,
        )
    }
}

/// Surface type of a way, taken from its tags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WayKind {
    Building,
    Water,
    Grass,
    Residential,
    #[default]
    Unclassified,
}

impl WayKind {
    pub const ALL: [Self; 5] = [
        Self::Building,
        Self::Water,
        Self::Grass,
        Self::Residential,
        Self::Unclassified,
    ];

    /// Kind selected by a `<tag k=".." v=".."/>` pair, if any
    pub fn from_tag(key: &str, value: &str) -> Option<Self> {
        match (key, value) {
            ("building", "yes") => Some(Self::Building),
            ("natural", "water") => Some(Self::Water),
            ("landuse", "grass") => Some(Self::Grass),
            ("landuse", "residential") => Some(Self::Residential),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Water => "water",
            Self::Grass => "grass",
            Self::Residential => "residential",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for WayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Way {
    pub id: String,
    pub kind: WayKind,
    pub points: Vec<Point>,
    /// `nd` references that named no known node
    pub missing_refs: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OsmMap {
    pub bounds: Option<Bounds>,
    pub points: IndexMap<String, Point>,
    pub ways: Vec<Way>,
}

impl OsmMap {
    pub fn point(&self, id: &str) -> Option<Point> {
        self.points.get(id).copied()
    }

    pub fn ways_of(&self, kind: WayKind) -> impl Iterator<Item = &Way> {
        self.ways.iter().filter(move |way| way.kind == kind)
    }
}

/// Open and load an `.osm` file
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_file(path: impl AsRef<Path>) -> Result<OsmMap, OsmError> {
    let mut cursor = Cursor::open(path.as_ref())?;
    let map = load(&mut cursor)?;
    info!(
        points = map.points.len(),
        ways = map.ways.len(),
        "map loaded"
    );
    Ok(map)
}

/// Load a map from the document under `cursor`
///
/// The cursor is reset first and left on the root element.
pub fn load(cursor: &mut Cursor) -> Result<OsmMap, OsmError> {
    cursor.reset();
    if cursor.name() != "osm" {
        return Err(OsmError::NotOsm {
            found: cursor.name().to_string(),
        });
    }

    let mut map = OsmMap::default();
    if !cursor.enter() {
        return Ok(map);
    }

    loop {
        match cursor.name() {
            "bounds" => map.bounds = Some(read_bounds(cursor)?),
            "node" => {
                let (id, point) = read_node(cursor)?;
                map.points.insert(id, point);
            }
            "way" => {
                let way = read_way(cursor, &map.points)?;
                map.ways.push(way);
            }
            _ => {}
        }
        if !cursor.next() {
            break;
        }
    }

    cursor.leave()?;
    Ok(map)
}

fn read_bounds(cursor: &Cursor) -> Result<Bounds, OsmError> {
    Ok(Bounds {
        min_lat: number(cursor, "minlat")?,
        min_lon: number(cursor, "minlon")?,
        max_lat: number(cursor, "maxlat")?,
        max_lon: number(cursor, "maxlon")?,
    })
}

fn read_node(cursor: &Cursor) -> Result<(String, Point), OsmError> {
    let id = required(cursor, "id")?.to_string();
    let point = Point {
        lat: number(cursor, "lat")?,
        lon: number(cursor, "lon")?,
    };
    Ok((id, point))
}

fn read_way(cursor: &mut Cursor, points: &IndexMap<String, Point>) -> Result<Way, OsmError> {
    let mut way = Way {
        id: required(cursor, "id")?.to_string(),
        ..Way::default()
    };
    if !cursor.enter() {
        return Ok(way);
    }

    let start = cursor.save();
    way.kind = classify(cursor);
    cursor.restore(start);

    while cursor.find("nd") {
        let node_ref = cursor.attribute("ref");
        match points.get(node_ref) {
            Some(point) => way.points.push(*point),
            None => {
                warn!(way = %way.id, node = node_ref, "way refers to an unknown node");
                way.missing_refs += 1;
            }
        }
    }

    cursor.leave()?;
    Ok(way)
}

fn classify(cursor: &mut Cursor) -> WayKind {
    while cursor.find("tag") {
        if let Some(kind) = WayKind::from_tag(cursor.attribute("k"), cursor.attribute("v")) {
            return kind;
        }
    }
    WayKind::Unclassified
}

fn required<'c>(cursor: &'c Cursor, attribute: &'static str) -> Result<&'c str, OsmError> {
    if cursor.has_attribute(attribute) {
        Ok(cursor.attribute(attribute))
    } else {
        Err(OsmError::MissingAttribute {
            element: cursor.name().to_string(),
            attribute,
        })
    }
}

fn number(cursor: &Cursor, attribute: &'static str) -> Result<f64, OsmError> {
    let raw = required(cursor, attribute)?;
    raw.trim()
        .parse::<f64>()
        .map_err(|source| OsmError::InvalidNumber {
            element: cursor.name().to_string(),
            attribute,
            value: raw.to_string(),
            source,
        })
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <bounds minlat="51.0" minlon="4.0" maxlat="51.5" maxlon="4.5"/>
  <node id="1" lat="51.1" lon="4.1"/>
  <node id="2" lat="51.2" lon="4.1">
    <tag k="amenity" v="bench"/>
  </node>
  <node id="3" lat="51.2" lon="4.2"/>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="source" v="survey"/>
    <nd ref="3"/>
    <tag k="building" v="yes"/>
  </way>
  <way id="11">
    <tag k="landuse" v="grass"/>
    <nd ref="3"/>
    <nd ref="99"/>
  </way>
  <way id="12"/>
  <relation id="20"/>
</osm>"#;

    fn cursor_over(xml: &str) -> Cursor {
        let doc = match crate::from_xml_str(xml) {
            Ok(doc) => doc,
            Err(err) => panic!("test map should parse: {err}"),
        };
        match Cursor::new(Arc::new(doc)) {
            Ok(cursor) => cursor,
            Err(err) => panic!("test map should have a root: {err}"),
        }
    }

    fn load_map(xml: &str) -> OsmMap {
        match load(&mut cursor_over(xml)) {
            Ok(map) => map,
            Err(err) => panic!("test map should load: {err}"),
        }
    }

    #[test]
    fn test_loads_bounds_and_points() {
        let map = load_map(MAP);
        assert_eq!(
            map.bounds,
            Some(Bounds {
                min_lat: 51.0,
                min_lon: 4.0,
                max_lat: 51.5,
                max_lon: 4.5,
            })
        );
        assert_eq!(map.points.len(), 3);
        assert_eq!(map.point("2"), Some(Point { lat: 51.2, lon: 4.1 }));
        assert_eq!(map.point("99"), None);
    }

    #[test]
    fn test_classifies_ways_and_resolves_refs() {
        let map = load_map(MAP);
        assert_eq!(map.ways.len(), 3);

        let building = &map.ways[0];
        assert_eq!(building.id, "10");
        assert_eq!(building.kind, WayKind::Building);
        assert_eq!(building.points.len(), 3);
        assert_eq!(building.missing_refs, 0);

        let grass = &map.ways[1];
        assert_eq!(grass.kind, WayKind::Grass);
        assert_eq!(grass.points, vec![Point { lat: 51.2, lon: 4.2 }]);
        assert_eq!(grass.missing_refs, 1);

        let empty = &map.ways[2];
        assert_eq!(empty.kind, WayKind::Unclassified);
        assert!(empty.points.is_empty());

        assert_eq!(map.ways_of(WayKind::Grass).count(), 1);
        assert_eq!(map.ways_of(WayKind::Water).count(), 0);
    }

    #[test]
    fn test_cursor_left_on_root() {
        let mut cursor = cursor_over(MAP);
        assert!(load(&mut cursor).is_ok());
        assert_eq!(cursor.name(), "osm");
        assert_eq!(cursor.depth(), 0);
    }

    #[test]
    fn test_rejects_other_roots() {
        let err = load(&mut cursor_over("<gpx/>")).err();
        assert!(matches!(err, Some(OsmError::NotOsm { found }) if found == "gpx"));
    }

    #[test]
    fn test_reports_bad_attributes() {
        let err = load(&mut cursor_over(r#"<osm><node id="1" lat="north" lon="4"/></osm>"#)).err();
        assert!(matches!(
            err,
            Some(OsmError::InvalidNumber { attribute: "lat", ref value, .. }) if value == "north"
        ));

        let err = load(&mut cursor_over(r#"<osm><node lat="1" lon="4"/></osm>"#)).err();
        assert!(matches!(
            err,
            Some(OsmError::MissingAttribute { attribute: "id", .. })
        ));
    }

    #[test]
    fn test_empty_osm_document() {
        let map = load_map("<osm/>");
        assert_eq!(map, OsmMap::default());
    }

    #[test]
    fn test_projection() {
        let bounds = Bounds {
            min_lat: 10.0,
            min_lon: 20.0,
            max_lat: 12.0,
            max_lon: 22.0,
        };
        assert!((bounds.scale() - 1000.0).abs() < 1e-9);

        let (x, y) = bounds.project(Point { lat: 11.0, lon: 20.5 });
        assert!((x - 1000.0).abs() < 1e-9);
        assert!((y - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_tag_classification() {
        assert_eq!(WayKind::from_tag("natural", "water"), Some(WayKind::Water));
        assert_eq!(
            WayKind::from_tag("landuse", "residential"),
            Some(WayKind::Residential)
        );
        assert_eq!(WayKind::from_tag("building", "no"), None);
        assert_eq!(WayKind::Residential.to_string(), "residential");
    }
}
