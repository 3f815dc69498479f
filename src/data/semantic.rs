use std::{collections::HashMap, hash::Hash};

use serde::Deserialize;

use super::osm::{ElementType, Node, OsmId, Tags};

/// Rendering bucket a feature is drawn and labeled with.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Park,
    Wood,
    University,
    Industrial,
    Commercial,
    Residential,
    Pitch,
    Water,
    WaterArea,
    WaterLine,
    Building,
    Rail,
    ServiceRoad,
    TrafficRoad,
    TrafficRoadMajor,
    TrafficRoadSupermajor,
    Path,
    Tree,
    OverlayPoint,
    OverlayLine,
    OverlayPolygon,
}

/// Back-to-front draw order of the OSM categories. Overlays are drawn after all of these.
pub const DRAW_ORDER: [Category; 18] = [
    Category::Park,
    Category::Wood,
    Category::University,
    Category::Industrial,
    Category::Commercial,
    Category::Residential,
    Category::Pitch,
    Category::Water,
    Category::WaterArea,
    Category::WaterLine,
    Category::Building,
    Category::Rail,
    Category::ServiceRoad,
    Category::TrafficRoad,
    Category::TrafficRoadMajor,
    Category::TrafficRoadSupermajor,
    Category::Path,
    Category::Tree,
];

/// Categories whose lines get labels, highest priority first.
pub const LINE_LABEL_ORDER: [Category; 8] = [
    Category::TrafficRoadSupermajor,
    Category::TrafficRoadMajor,
    Category::TrafficRoad,
    Category::WaterLine,
    Category::Water,
    Category::Rail,
    Category::ServiceRoad,
    Category::Path,
];

/// Categories whose polygons get labels, highest priority first.
pub const AREA_LABEL_ORDER: [Category; 9] = [
    Category::WaterArea,
    Category::Park,
    Category::Wood,
    Category::University,
    Category::Pitch,
    Category::Industrial,
    Category::Commercial,
    Category::Residential,
    Category::Building,
];

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Park => "Park",
            Category::Wood => "Wood",
            Category::University => "University",
            Category::Industrial => "Industrial",
            Category::Commercial => "Commercial",
            Category::Residential => "Residential",
            Category::Pitch => "Pitch",
            Category::Water => "Water",
            Category::WaterArea => "Water area",
            Category::WaterLine => "Water lines",
            Category::Building => "Building",
            Category::Rail => "Rail",
            Category::ServiceRoad => "Service road",
            Category::TrafficRoad => "Traffic road",
            Category::TrafficRoadMajor => "Traffic road major",
            Category::TrafficRoadSupermajor => "Traffic road super-major",
            Category::Path => "Path",
            Category::Tree => "Tree",
            Category::OverlayPoint => "Overlay point",
            Category::OverlayLine => "Overlay line",
            Category::OverlayPolygon => "Overlay polygon",
        }
    }

    /// Linear categories stay lines even when their way happens to be closed
    /// (roundabouts, circular paths).
    pub fn is_linear(&self) -> bool {
        matches!(
            self,
            Category::Rail
                | Category::ServiceRoad
                | Category::TrafficRoad
                | Category::TrafficRoadMajor
                | Category::TrafficRoadSupermajor
                | Category::Path
                | Category::WaterLine
                | Category::Water
                | Category::OverlayLine
        )
    }
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, Copy)]
pub struct MapCoords {
    pub lat: f64,
    pub lon: f64,
}

impl From<&Node> for MapCoords {
    fn from(value: &Node) -> Self {
        MapCoords {
            lat: value.lat,
            lon: value.lon,
        }
    }
}

/// `-0.0` and `0.0` compare equal, so they must hash alike.
fn hash_bits(value: f64) -> u64 {
    if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() }
}

impl Hash for MapCoords {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        hash_bits(self.lat).hash(state);
        hash_bits(self.lon).hash(state);
    }
}

impl Eq for MapCoords { }

impl PartialEq for MapCoords {
    fn eq(&self, other: &Self) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }
}

pub type Path = Vec<MapCoords>;

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingRole {
    Outer,
    Inner,
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct Ring {
    pub role: RingRole,
    pub points: Path,
}

impl Ring {
    pub fn is_closed(&self) -> bool {
        self.points.len() >= 4 && self.points.first() == self.points.last()
    }

    /// Join way fragments sharing end points into as few rings as possible.
    /// Fragments are reversed where needed. Fragments that never close stay
    /// open rings, in the order they were found.
    pub fn assemble(role: RingRole, fragments: Vec<Path>) -> Vec<Ring> {
        fn find_next(
            link_node: &MapCoords,
            by_end: &HashMap<MapCoords, Vec<usize>>,
            used: &[bool],
        ) -> Option<usize> {
            by_end.get(link_node)?
                .iter()
                .copied()
                .find(|idx| !used[*idx])
        }

        let fragments: Vec<Path> = fragments.into_iter()
            .filter(|fragment| fragment.len() >= 2)
            .collect();

        let mut by_end: HashMap<MapCoords, Vec<usize>> = HashMap::new();
        for (idx, fragment) in fragments.iter().enumerate() {
            by_end.entry(fragment[0]).or_default().push(idx);
            by_end.entry(fragment[fragment.len() - 1]).or_default().push(idx);
        }

        let mut used = vec![false; fragments.len()];
        let mut rings = Vec::new();

        for start in 0..fragments.len() {
            if used[start] {
                continue;
            }
            used[start] = true;
            let mut points = fragments[start].clone();

            while points.first() != points.last() {
                let link_node = points[points.len() - 1];
                let Some(next) = find_next(&link_node, &by_end, &used) else {
                    break;
                };
                used[next] = true;
                let fragment = &fragments[next];
                if fragment[0] == link_node {
                    points.extend_from_slice(&fragment[1..]);
                } else {
                    points.extend(fragment.iter().rev().skip(1));
                }
            }

            rings.push(Ring { role, points });
        }

        rings
    }
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Point,
    Line,
    Polygon,
}

/// Identity of the raw element a feature was resolved from.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureRef {
    pub element_type: ElementType,
    pub id: OsmId,
}

/// A fully dereferenced geometry ready to be drawn.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct Feature {
    pub source: Option<FeatureRef>,
    pub category: Category,
    pub kind: FeatureKind,
    pub rings: Vec<Ring>,
    pub tags: Tags,
    pub name: Option<String>,
}

impl Feature {
    pub fn outer_rings(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter().filter(|ring| ring.role == RingRole::Outer)
    }

    pub fn inner_rings(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter().filter(|ring| ring.role == RingRole::Inner)
    }
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct FeatureGroup {
    pub category: Category,
    pub features: Vec<Feature>,
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct OverlayGroup {
    pub name: String,
    pub features: Vec<Feature>,
}

/// Features grouped by category, each group in insertion order. This is the
/// only hand-off from the network builder to rendering.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Default, Clone, PartialEq)]
pub struct GroupedFeatures {
    pub groups: Vec<FeatureGroup>,
    pub overlays: Vec<OverlayGroup>,
}

impl GroupedFeatures {
    pub fn push(&mut self, feature: Feature) {
        match self.groups.iter_mut().find(|group| group.category == feature.category) {
            Some(group) => group.features.push(feature),
            None => self.groups.push(FeatureGroup {
                category: feature.category,
                features: vec![feature],
            }),
        }
    }

    pub fn get(&self, category: Category) -> &[Feature] {
        self.groups.iter()
            .find(|group| group.category == category)
            .map(|group| group.features.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.features.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
