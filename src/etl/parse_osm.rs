use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Deserialize;
use xz::bufread::XzDecoder;

use crate::data::osm::{Element, ElementType, Member, Node, Relation, Tags, Way};
use crate::data::OsmMapData;
use crate::errors::{Error, Result};

use super::{write_archive, Etl};

pub const ETL_NAME: &str = "parse_osm";
pub const OUTPUT_FILE_NAME: &str = "osm_elements.rkyv";

/// Body of an OSM API `map` response in JSON format.
#[derive(Deserialize)]
struct ApiResponse {
    elements: Vec<serde_json::Value>,
}

fn attribute(el: &BytesStart, key: &str) -> Result<Option<String>> {
    match el.try_get_attribute(key)? {
        Some(attribute) => Ok(Some(attribute.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn required_str(el: &BytesStart, key: &str) -> Result<String> {
    let value = attribute(el, key)?
        .ok_or_else(|| format!("Missing attribute '{}'", key))?;
    Ok(value)
}

fn required<T>(el: &BytesStart, key: &str) -> Result<T>
where
    T: FromStr,
    Error: From<T::Err>,
{
    Ok(required_str(el, key)?.parse()?)
}

fn element_type(value: &str) -> Result<ElementType> {
    match value {
        "node" => Ok(ElementType::Node),
        "way" => Ok(ElementType::Way),
        "relation" => Ok(ElementType::Relation),
        _ => Err(format!("Unknown member type '{}'", value).into()),
    }
}

fn open_node(el: &BytesStart) -> Result<Element> {
    Ok(Element::Node(Node {
        id: required(el, "id")?,
        lat: required(el, "lat")?,
        lon: required(el, "lon")?,
        tags: Tags::new(),
    }))
}

/// `None` for anything that is not a node, way or relation.
fn open_record(el: &BytesStart) -> Option<Result<Element>> {
    let record = match el.name().as_ref() {
        b"node" => open_node(el),
        b"way" => required(el, "id").map(|id| Element::Way(Way {
            id,
            nodes: Vec::new(),
            tags: Tags::new(),
        })),
        b"relation" => required(el, "id").map(|id| Element::Relation(Relation {
            id,
            members: Vec::new(),
            tags: Tags::new(),
        })),
        _ => return None,
    };
    Some(record)
}

fn add_child(element: &mut Element, el: &BytesStart) -> Result<()> {
    match el.name().as_ref() {
        b"tag" => {
            let key = required_str(el, "k")?;
            let value = required_str(el, "v")?;
            element.tags_mut().insert(key, value);
        },
        b"nd" => {
            if let Element::Way(way) = element {
                way.nodes.push(required(el, "ref")?);
            }
        },
        b"member" => {
            if let Element::Relation(relation) = element {
                relation.members.push(Member {
                    member_type: element_type(&required_str(el, "type")?)?,
                    role: attribute(el, "role")?.unwrap_or_default(),
                    reference: required(el, "ref")?,
                });
            }
        },
        _ => (),
    }
    Ok(())
}

fn is_record(name: &[u8]) -> bool {
    matches!(name, b"node" | b"way" | b"relation")
}

#[derive(Default)]
struct XmlParser {
    elements: Vec<Element>,
    pending: Option<Element>,
    skipped: usize,
}

impl XmlParser {
    fn skip(&mut self, err: Error) {
        warn!(err = err.message.as_str(); "Skipping unparsable OSM record");
        self.pending = None;
        self.skipped += 1;
    }

    fn start(&mut self, el: &BytesStart) {
        match open_record(el) {
            Some(Ok(element)) => self.pending = Some(element),
            Some(Err(err)) => self.skip(err),
            None => {
                if let Some(element) = self.pending.as_mut() {
                    if let Err(err) = add_child(element, el) {
                        self.skip(err);
                    }
                }
            },
        }
    }

    fn end(&mut self, name: &[u8]) {
        if is_record(name) {
            if let Some(element) = self.pending.take() {
                self.elements.push(element);
            }
        }
    }
}

/// Parse OSM XML. Elements other than nodes, ways and relations are ignored.
pub fn parse_xml<R: BufRead>(input: R) -> Result<Vec<Element>> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut parser = XmlParser::default();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(el) => parser.start(&el),
            Event::Empty(el) => {
                parser.start(&el);
                parser.end(el.name().as_ref());
            },
            Event::End(el) => parser.end(el.name().as_ref()),
            _ => (),
        }
    }

    if parser.skipped > 0 {
        warn!(skipped = parser.skipped; "Some OSM records could not be parsed");
    }
    Ok(parser.elements)
}

/// Parse an OSM API JSON response. Records that do not decode are skipped.
pub fn parse_json<R: BufRead>(input: R) -> Result<Vec<Element>> {
    let response: ApiResponse = serde_json::from_reader(input)?;

    let mut elements = Vec::with_capacity(response.elements.len());
    let mut skipped: usize = 0;
    for value in response.elements {
        match serde_json::from_value::<Element>(value) {
            Ok(element) => elements.push(element),
            Err(err) => {
                warn!(err = err.to_string().as_str(); "Skipping unparsable OSM record");
                skipped += 1;
            },
        }
    }

    if skipped > 0 {
        warn!(skipped = skipped; "Some OSM records could not be parsed");
    }
    Ok(elements)
}

/// Read `.json`, `.osm.xz` or plain OSM XML, picked by file extension.
pub fn read_elements(path: &Path) -> Result<Vec<Element>> {
    let file = BufReader::new(File::open(path)?);
    match path.extension().and_then(OsStr::to_str) {
        Some("json") => parse_json(file),
        Some("xz") => parse_xml(BufReader::new(XzDecoder::new(file))),
        _ => parse_xml(file),
    }
}

pub struct ParseOsmEtl {
    data_path: PathBuf,
}

impl ParseOsmEtl {
    fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    pub fn new(data_path: &Path) -> ParseOsmEtl {
        ParseOsmEtl {
            data_path: data_path.to_path_buf(),
        }
    }
}

impl Etl for ParseOsmEtl {
    type Input = Vec<Element>;
    type Output = OsmMapData;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(Self::output_path(dir).exists())
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        fs::remove_file(Self::output_path(dir))?;
        Ok(())
    }

    fn extract(&mut self, _dir: &Path) -> Result<Self::Input> {
        read_elements(&self.data_path)
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let (mut nodes, mut ways, mut relations) = (0, 0, 0);
        for element in &input {
            match element {
                Element::Node(_) => nodes += 1,
                Element::Way(_) => ways += 1,
                Element::Relation(_) => relations += 1,
            }
        }
        info!(nodes = nodes, ways = ways, relations = relations; "Parsed OSM elements");
        Ok(OsmMapData { elements: input })
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        write_archive(&Self::output_path(dir), &output)
    }
}
