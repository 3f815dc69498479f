//! User supplied GeoJSON drawn on top of the map.

use std::{fs::File, io::BufReader};

use serde::Deserialize;
use serde_json::Value;

use crate::{
    data::{
        osm::Tags,
        semantic::{Category, Feature, FeatureKind, MapCoords, OverlayGroup, Path, Ring, RingRole},
    },
    errors::Result,
};

#[derive(Deserialize, Debug, Clone)]
pub struct OverlayConfig {
    pub name: String,
    pub path: String,
}

fn position(value: &Value) -> Option<MapCoords> {
    let coords = value.as_array()?;
    let lon = coords.first()?.as_f64()?;
    let lat = coords.get(1)?.as_f64()?;
    Some(MapCoords { lat, lon })
}

fn path(value: &Value) -> Option<Path> {
    value.as_array()?
        .iter()
        .map(position)
        .collect()
}

fn rings(value: &Value) -> Option<Vec<Ring>> {
    value.as_array()?
        .iter()
        .enumerate()
        .map(|(idx, ring)| {
            let role = if idx == 0 { RingRole::Outer } else { RingRole::Inner };
            Some(Ring { role, points: path(ring)? })
        })
        .collect()
}

fn feature(category: Category, kind: FeatureKind, rings: Vec<Ring>, tags: &Tags) -> Feature {
    Feature {
        source: None,
        category,
        kind,
        rings,
        tags: tags.clone(),
        name: tags.get("name").cloned(),
    }
}

fn point_feature(coords: MapCoords, tags: &Tags) -> Feature {
    let ring = Ring { role: RingRole::Outer, points: vec![coords] };
    feature(Category::OverlayPoint, FeatureKind::Point, vec![ring], tags)
}

fn line_feature(points: Path, tags: &Tags) -> Feature {
    let ring = Ring { role: RingRole::Outer, points };
    feature(Category::OverlayLine, FeatureKind::Line, vec![ring], tags)
}

fn polygon_feature(rings: Vec<Ring>, tags: &Tags) -> Feature {
    feature(Category::OverlayPolygon, FeatureKind::Polygon, rings, tags)
}

fn properties(value: &Value) -> Tags {
    let Some(properties) = value.get("properties").and_then(Value::as_object) else {
        return Tags::new();
    };
    properties.iter()
        .filter_map(|(key, value)| match value {
            Value::String(string) => Some((key.clone(), string.clone())),
            Value::Number(number) => Some((key.clone(), number.to_string())),
            Value::Bool(flag) => Some((key.clone(), flag.to_string())),
            _ => None,
        })
        .collect()
}

/// Convert one GeoJSON object into overlay features. Unsupported or malformed
/// geometries are skipped.
fn collect(value: &Value, tags: &Tags, output: &mut Vec<Feature>) {
    let Some(geojson_type) = value.get("type").and_then(Value::as_str) else {
        return;
    };
    let coordinates = value.get("coordinates").unwrap_or(&Value::Null);

    match geojson_type {
        "FeatureCollection" => {
            for child in value.get("features").and_then(Value::as_array).into_iter().flatten() {
                collect(child, tags, output);
            }
        },
        "Feature" => {
            let tags = properties(value);
            if let Some(geometry) = value.get("geometry") {
                collect(geometry, &tags, output);
            }
        },
        "GeometryCollection" => {
            for child in value.get("geometries").and_then(Value::as_array).into_iter().flatten() {
                collect(child, tags, output);
            }
        },
        "Point" => {
            output.extend(position(coordinates).map(|coords| point_feature(coords, tags)));
        },
        "MultiPoint" => {
            output.extend(
                path(coordinates).into_iter().flatten().map(|coords| point_feature(coords, tags))
            );
        },
        "LineString" => {
            output.extend(path(coordinates).map(|points| line_feature(points, tags)));
        },
        "MultiLineString" => {
            for line in coordinates.as_array().into_iter().flatten() {
                output.extend(path(line).map(|points| line_feature(points, tags)));
            }
        },
        "Polygon" => {
            output.extend(rings(coordinates).map(|rings| polygon_feature(rings, tags)));
        },
        "MultiPolygon" => {
            for polygon in coordinates.as_array().into_iter().flatten() {
                output.extend(rings(polygon).map(|rings| polygon_feature(rings, tags)));
            }
        },
        _ => (),
    }
}

pub fn parse_overlay(name: &str, value: &Value) -> OverlayGroup {
    let mut features = Vec::new();
    collect(value, &Tags::new(), &mut features);
    OverlayGroup {
        name: name.to_string(),
        features,
    }
}

pub fn load_overlay(config: &OverlayConfig) -> Result<OverlayGroup> {
    let file = File::open(&config.path)?;
    let value: Value = serde_json::from_reader(BufReader::new(file))?;
    Ok(parse_overlay(&config.name, &value))
}
