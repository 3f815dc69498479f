//! Tag based classification of OSM elements into rendering categories.
//!
//! Rules are evaluated top-down and the first match wins, so the order of
//! [`WAY_RULES`] encodes priority.

use crate::data::{osm::Tags, semantic::Category};

const SUPERMAJOR_TRAFFIC_ROADS: &[&str] = &["motorway", "motorway_link"];

const MAJOR_TRAFFIC_ROADS: &[&str] = &["trunk", "trunk_link", "primary", "primary_link"];

const TRAFFIC_ROADS: &[&str] = &[
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "residential",
    "unclassified",
    "living_street",
    "busway",
];

const SERVICE_ROADS: &[&str] = &["service", "road", "track"];

const PATHS: &[&str] = &["path", "footway", "cycleway", "bridleway", "steps", "pedestrian"];

const EDUCATIONAL: &[&str] = &["school", "university", "college", "music_school", "driving_school"];

const PARK_LANDUSE: &[&str] = &["flowerbed", "grass", "cemetery", "recreation_ground", "village_green"];

const PARK_LEISURE: &[&str] = &[
    "garden",
    "golf_course",
    "nature_reserve",
    "park",
    "pitch",
    "track",
    "sports_centre",
];

const PARKING_BUILDINGS: &[&str] = &["multi-storey", "sheds", "carports", "garage_boxes"];

const LANDUSE_WATER: &[&str] = &["pond", "basin", "reservoir", "salt_pond"];

const NATURAL_WATER: &[&str] = &["water", "coastline", "bay"];

/// Whether the geometry being classified encloses an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Line,
    Area,
}

enum Target {
    Always(Category),
    ByShape { line: Category, area: Category },
}

struct Rule {
    matches: fn(&Tags) -> bool,
    target: Target,
}

const WAY_RULES: &[Rule] = &[
    Rule { matches: is_rail, target: Target::Always(Category::Rail) },
    Rule { matches: is_service_road, target: Target::Always(Category::ServiceRoad) },
    Rule { matches: is_traffic_road, target: Target::Always(Category::TrafficRoad) },
    Rule { matches: is_traffic_road_major, target: Target::Always(Category::TrafficRoadMajor) },
    Rule { matches: is_traffic_road_supermajor, target: Target::Always(Category::TrafficRoadSupermajor) },
    Rule { matches: is_path, target: Target::Always(Category::Path) },
    Rule { matches: is_water_line, target: Target::Always(Category::WaterLine) },
    Rule {
        matches: is_water,
        target: Target::ByShape { line: Category::Water, area: Category::WaterArea },
    },
    Rule { matches: is_building, target: Target::Always(Category::Building) },
    Rule { matches: is_industrial, target: Target::Always(Category::Industrial) },
    Rule { matches: is_commercial, target: Target::Always(Category::Commercial) },
    Rule { matches: is_residential, target: Target::Always(Category::Residential) },
    Rule { matches: is_pitch, target: Target::Always(Category::Pitch) },
    Rule { matches: is_university, target: Target::Always(Category::University) },
    Rule { matches: is_park, target: Target::Always(Category::Park) },
    Rule { matches: is_wood, target: Target::Always(Category::Wood) },
];

const NODE_RULES: &[Rule] = &[
    Rule { matches: is_tree, target: Target::Always(Category::Tree) },
];

fn first_match(rules: &[Rule], tags: &Tags, shape: Shape) -> Option<Category> {
    rules.iter()
        .find(|rule| (rule.matches)(tags))
        .map(|rule| match rule.target {
            Target::Always(category) => category,
            Target::ByShape { line, area } => match shape {
                Shape::Line => line,
                Shape::Area => area,
            },
        })
}

/// Classify a line feature. `None` means the feature is not drawn.
pub fn classify(tags: &Tags) -> Option<Category> {
    classify_shape(tags, Shape::Line)
}

/// Classify a way or relation whose geometry is known to be a line or an area.
pub fn classify_shape(tags: &Tags, shape: Shape) -> Option<Category> {
    first_match(WAY_RULES, tags, shape)
}

/// Classify a standalone node.
pub fn classify_node(tags: &Tags) -> Option<Category> {
    first_match(NODE_RULES, tags, Shape::Line)
}

fn has_key(tags: &Tags, key: &str) -> bool {
    tags.get(key).is_some_and(|value| !value.is_empty())
}

/// Exact match of the whole tag value; `a;b` lists are not split.
fn has_kv_pair(tags: &Tags, key: &str, value: &str) -> bool {
    tags.get(key).map(String::as_str) == Some(value)
}

fn has_any_value(tags: &Tags, key: &str, values: &[&str]) -> bool {
    values.iter().any(|value| has_kv_pair(tags, key, value))
}

fn is_any_highway(tags: &Tags) -> bool {
    has_any_value(tags, "highway", TRAFFIC_ROADS)
        || has_any_value(tags, "highway", MAJOR_TRAFFIC_ROADS)
        || has_any_value(tags, "highway", SUPERMAJOR_TRAFFIC_ROADS)
        || has_any_value(tags, "highway", SERVICE_ROADS)
        || has_any_value(tags, "highway", PATHS)
}

fn is_building(tags: &Tags) -> bool {
    (has_key(tags, "building") && !has_kv_pair(tags, "building", "no"))
        || has_any_value(tags, "parking", PARKING_BUILDINGS)
}

fn is_water_line(tags: &Tags) -> bool {
    has_key(tags, "waterway")
}

fn is_water(tags: &Tags) -> bool {
    has_any_value(tags, "natural", NATURAL_WATER)
        || has_any_value(tags, "landuse", LANDUSE_WATER)
        || has_kv_pair(tags, "leisure", "swimming_pool")
}

fn is_university(tags: &Tags) -> bool {
    has_any_value(tags, "amenity", EDUCATIONAL)
}

fn is_pitch(tags: &Tags) -> bool {
    has_kv_pair(tags, "leisure", "pitch")
}

fn is_path(tags: &Tags) -> bool {
    has_any_value(tags, "highway", PATHS)
}

fn is_traffic_road_supermajor(tags: &Tags) -> bool {
    has_any_value(tags, "highway", SUPERMAJOR_TRAFFIC_ROADS)
}

fn is_traffic_road_major(tags: &Tags) -> bool {
    has_any_value(tags, "highway", MAJOR_TRAFFIC_ROADS)
}

fn is_traffic_road(tags: &Tags) -> bool {
    has_any_value(tags, "highway", TRAFFIC_ROADS)
}

fn is_service_road(tags: &Tags) -> bool {
    has_any_value(tags, "highway", SERVICE_ROADS)
}

fn is_park(tags: &Tags) -> bool {
    has_any_value(tags, "leisure", PARK_LEISURE) || has_any_value(tags, "landuse", PARK_LANDUSE)
}

fn is_rail(tags: &Tags) -> bool {
    (has_key(tags, "railway") || has_kv_pair(tags, "landuse", "railway")) && !is_any_highway(tags)
}

fn is_tree(tags: &Tags) -> bool {
    has_kv_pair(tags, "natural", "tree")
}

fn is_wood(tags: &Tags) -> bool {
    has_kv_pair(tags, "natural", "wood") || has_kv_pair(tags, "landuse", "forest")
}

fn is_industrial(tags: &Tags) -> bool {
    has_kv_pair(tags, "landuse", "industrial")
}

fn is_commercial(tags: &Tags) -> bool {
    has_kv_pair(tags, "landuse", "commercial") || has_kv_pair(tags, "landuse", "retail")
}

fn is_residential(tags: &Tags) -> bool {
    has_kv_pair(tags, "landuse", "residential")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn classifies_basic_tag_sets() {
        assert_eq!(classify(&tags(&[])), None);
        assert_eq!(classify(&tags(&[("highway", "secondary")])), Some(Category::TrafficRoad));
        assert_eq!(classify(&tags(&[("leisure", "park")])), Some(Category::Park));
    }

    #[test]
    fn road_wins_over_rail() {
        let tram_street = tags(&[("railway", "tram"), ("highway", "primary")]);
        assert_eq!(classify(&tram_street), Some(Category::TrafficRoadMajor));

        let main_line = tags(&[("railway", "rail"), ("name", "Main line")]);
        assert_eq!(classify(&main_line), Some(Category::Rail));
    }

    #[test]
    fn water_depends_on_shape() {
        let tags = tags(&[("natural", "water")]);
        assert_eq!(classify_shape(&tags, Shape::Line), Some(Category::Water));
        assert_eq!(classify_shape(&tags, Shape::Area), Some(Category::WaterArea));
    }

    #[test]
    fn water_is_checked_before_building() {
        let tags = tags(&[("leisure", "swimming_pool"), ("building", "yes")]);
        assert_eq!(classify_shape(&tags, Shape::Area), Some(Category::WaterArea));
    }

    #[test]
    fn building_no_is_not_a_building() {
        assert_eq!(classify(&tags(&[("building", "no")])), None);
        assert_eq!(classify(&tags(&[("building", "house")])), Some(Category::Building));
        assert_eq!(classify(&tags(&[("parking", "multi-storey")])), Some(Category::Building));
    }

    #[test]
    fn road_tiers() {
        assert_eq!(classify(&tags(&[("highway", "motorway")])), Some(Category::TrafficRoadSupermajor));
        assert_eq!(classify(&tags(&[("highway", "trunk_link")])), Some(Category::TrafficRoadMajor));
        assert_eq!(classify(&tags(&[("highway", "service")])), Some(Category::ServiceRoad));
        assert_eq!(classify(&tags(&[("highway", "footway")])), Some(Category::Path));
        assert_eq!(classify(&tags(&[("highway", "bus_stop")])), None);
    }

    #[test]
    fn landuse_categories() {
        assert_eq!(classify(&tags(&[("landuse", "retail")])), Some(Category::Commercial));
        assert_eq!(classify(&tags(&[("landuse", "forest")])), Some(Category::Wood));
        assert_eq!(classify(&tags(&[("landuse", "grass")])), Some(Category::Park));
        assert_eq!(classify(&tags(&[("landuse", "railway")])), Some(Category::Rail));
        assert_eq!(classify(&tags(&[("leisure", "pitch")])), Some(Category::Pitch));
        assert_eq!(classify(&tags(&[("amenity", "college")])), Some(Category::University));
    }

    #[test]
    fn tag_values_match_as_a_whole() {
        assert_eq!(classify(&tags(&[("highway", "footway;cycleway")])), None);

        let tram = tags(&[("railway", "tram"), ("highway", "primary;service")]);
        assert_eq!(classify(&tram), Some(Category::Rail));
    }

    #[test]
    fn nodes_only_classify_trees() {
        assert_eq!(classify_node(&tags(&[("natural", "tree")])), Some(Category::Tree));
        assert_eq!(classify_node(&tags(&[("highway", "secondary")])), None);
    }
}
