use self::osm::Element;

pub mod osm;
pub mod semantic;

/// Map data as delivered by the data source. Elements are kept in delivery order
/// without any processing so that every later stage is deterministic.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Default, Clone)]
pub struct OsmMapData {
    pub elements: Vec<Element>,
}
