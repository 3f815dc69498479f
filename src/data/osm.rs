use std::collections::HashMap;

use serde::Deserialize;

pub type OsmId = i64;

/// Free-form key/value tags of an OSM element.
pub type Tags = HashMap<String, String>;

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Node {
    pub id: OsmId,
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Way {
    pub id: OsmId,
    #[serde(default)]
    pub nodes: Vec<OsmId>,
    #[serde(default)]
    pub tags: Tags,
}

impl Way {
    /// A way whose first and last node references coincide.
    pub fn is_closed(&self) -> bool {
        self.nodes.len() >= 4 && self.nodes.first() == self.nodes.last()
    }
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Node,
    Way,
    Relation,
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Member {
    #[serde(rename = "type")]
    pub member_type: ElementType,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "ref")]
    pub reference: OsmId,
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: OsmId,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub tags: Tags,
}

impl Relation {
    pub fn is_multipolygon(&self) -> bool {
        self.tags.get("type").map(String::as_str) == Some("multipolygon")
    }
}

/// One raw element as delivered by the data source, in delivery order.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Element {
    pub fn tags_mut(&mut self) -> &mut Tags {
        match self {
            Element::Node(node) => &mut node.tags,
            Element::Way(way) => &mut way.tags,
            Element::Relation(relation) => &mut relation.tags,
        }
    }
}
