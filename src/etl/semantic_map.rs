use std::{collections::HashMap, fs, path::{Path, PathBuf}};

use log::{debug, error, info, warn};
use tqdm::tqdm;

use crate::{
    classify::{classify_node, classify_shape, Shape},
    data::{
        osm::{Element, ElementType, Node, OsmId, Relation, Way},
        semantic::{Feature, FeatureKind, FeatureRef, GroupedFeatures, MapCoords, Path as CoordPath, Ring, RingRole},
        OsmMapData,
    },
    errors::Result,
    overlay::{load_overlay, OverlayConfig},
};

use super::{parse_osm, read_archive, write_archive, Etl};

pub const ETL_NAME: &str = "semantic_map";
pub const OUTPUT_FILE_NAME: &str = "semantic_map.rkyv";

/// Resolves raw elements into drawable features. A way referencing a node
/// that is not part of the data is dropped as a whole.
struct NetworkBuilder<'a> {
    nodes: HashMap<OsmId, &'a Node>,
    ways: HashMap<OsmId, &'a Way>,
}

impl<'a> NetworkBuilder<'a> {
    fn new(elements: &'a [Element]) -> Self {
        let mut nodes = HashMap::new();
        let mut ways = HashMap::new();
        for element in elements {
            match element {
                Element::Node(node) => {
                    nodes.insert(node.id, node);
                },
                Element::Way(way) => {
                    ways.insert(way.id, way);
                },
                Element::Relation(_) => (),
            }
        }
        NetworkBuilder { nodes, ways }
    }

    fn way_path(&self, way: &Way) -> Option<CoordPath> {
        way.nodes.iter()
            .map(|id| self.nodes.get(id).map(|node| MapCoords::from(*node)))
            .collect()
    }

    fn resolve(&self, element: &Element) -> Option<Feature> {
        match element {
            Element::Node(node) => self.resolve_node(node),
            Element::Way(way) => self.resolve_way(way),
            Element::Relation(relation) => self.resolve_relation(relation),
        }
    }

    fn resolve_node(&self, node: &Node) -> Option<Feature> {
        let category = classify_node(&node.tags)?;
        Some(Feature {
            source: Some(FeatureRef { element_type: ElementType::Node, id: node.id }),
            category,
            kind: FeatureKind::Point,
            rings: vec![Ring { role: RingRole::Outer, points: vec![MapCoords::from(node)] }],
            tags: node.tags.clone(),
            name: node.tags.get("name").cloned(),
        })
    }

    fn resolve_way(&self, way: &Way) -> Option<Feature> {
        let points = self.way_path(way)?;
        if points.len() < 2 {
            return None;
        }
        let shape = if way.is_closed() { Shape::Area } else { Shape::Line };
        let category = classify_shape(&way.tags, shape)?;
        let kind = if shape == Shape::Area && !category.is_linear() {
            FeatureKind::Polygon
        } else {
            FeatureKind::Line
        };

        Some(Feature {
            source: Some(FeatureRef { element_type: ElementType::Way, id: way.id }),
            category,
            kind,
            rings: vec![Ring { role: RingRole::Outer, points }],
            tags: way.tags.clone(),
            name: way.tags.get("name").cloned(),
        })
    }

    /// Multipolygons only. Unresolvable members are skipped; without any
    /// resolvable outer member the relation is dropped.
    fn resolve_relation(&self, relation: &Relation) -> Option<Feature> {
        if !relation.is_multipolygon() {
            return None;
        }
        let category = classify_shape(&relation.tags, Shape::Area)?;

        let mut members: Vec<_> = relation.members.iter()
            .filter(|member| member.member_type == ElementType::Way)
            .collect();
        members.sort_by_key(|member| member.role == "inner");

        let mut outer = Vec::new();
        let mut inner = Vec::new();
        for member in members {
            let Some(path) = self.ways.get(&member.reference).and_then(|way| self.way_path(way)) else {
                continue;
            };
            if member.role == "inner" {
                inner.push(path);
            } else {
                outer.push(path);
            }
        }

        let mut rings = Ring::assemble(RingRole::Outer, outer);
        if rings.is_empty() {
            return None;
        }
        rings.extend(Ring::assemble(RingRole::Inner, inner));
        if rings.iter().any(|ring| !ring.is_closed()) {
            debug!(relation = relation.id; "Multipolygon has rings that do not close");
        }

        Some(Feature {
            source: Some(FeatureRef { element_type: ElementType::Relation, id: relation.id }),
            category,
            kind: FeatureKind::Polygon,
            rings,
            tags: relation.tags.clone(),
            name: relation.tags.get("name").cloned(),
        })
    }
}

fn collect_features<'a>(builder: &NetworkBuilder, elements: impl Iterator<Item = &'a Element>) -> GroupedFeatures {
    let mut grouped = GroupedFeatures::default();
    for element in elements {
        if let Some(feature) = builder.resolve(element) {
            grouped.push(feature);
        }
    }
    grouped
}

/// Resolve and classify every element, keeping delivery order within each category.
pub fn build_network(elements: &[Element]) -> GroupedFeatures {
    let builder = NetworkBuilder::new(elements);
    collect_features(&builder, elements.iter())
}

pub struct SemanticMapEtl {
    overlays: Vec<OverlayConfig>,
}

impl SemanticMapEtl {
    fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    pub fn new(overlays: &[OverlayConfig]) -> SemanticMapEtl {
        SemanticMapEtl {
            overlays: overlays.to_vec(),
        }
    }
}

impl Etl for SemanticMapEtl {
    type Input = OsmMapData;
    type Output = GroupedFeatures;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, _dir: &Path) -> Result<bool> {
        Ok(false)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        fs::remove_file(Self::output_path(dir))?;
        Ok(())
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input> {
        read_archive(&dir.join(parse_osm::OUTPUT_FILE_NAME))
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let builder = NetworkBuilder::new(&input.elements);
        let mut output = collect_features(&builder, tqdm(input.elements.iter()));
        info!(
            elements = input.elements.len(),
            features = output.len(),
            categories = output.groups.len();
            "Built feature network"
        );
        if output.is_empty() {
            warn!(elements = input.elements.len(); "No element could be classified");
        }

        for overlay in &self.overlays {
            match load_overlay(overlay) {
                Ok(group) => {
                    info!(overlay = group.name.as_str(), features = group.features.len(); "Loaded overlay");
                    output.overlays.push(group);
                },
                Err(err) => {
                    error!(overlay = overlay.name.as_str(), err = err.message.as_str(); "Failed to load overlay");
                },
            }
        }
        Ok(output)
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        write_archive(&Self::output_path(dir), &output)
    }
}
