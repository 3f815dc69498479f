//! One render pass: shapes back-to-front, then labels, then attribution.

use log::info;

use crate::{
    data::semantic::{Feature, GroupedFeatures, DRAW_ORDER},
    label::{collision::Placement, LabelContext, LabelEngine, PlacedLabel, TextMeasure},
    projection::{LinearMap, ScreenPoint},
};

pub const ATTRIBUTION: &str = "OpenStreetMap";

const ATTRIBUTION_MARGIN: f64 = 5.0;

const MIN_ATTRIBUTION_SIZE: f64 = 12.0;

/// Drawing backend of a render pass.
pub trait Canvas: TextMeasure {
    /// Draw one styled feature and report the box it covers in output pixels,
    /// or `None` when nothing was drawn.
    fn draw_feature(&mut self, feature: &Feature, map: &LinearMap) -> Option<Placement>;

    fn draw_label(&mut self, label: &PlacedLabel);

    fn draw_attribution(&mut self, text: &str, origin: ScreenPoint, size: f64);
}

/// One-way channel for human readable status messages.
pub trait ProgressSink {
    fn progress(&mut self, message: &str);
}

/// Forwards progress messages to the log.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&mut self, message: &str) {
        info!(progress = message; "Render progress");
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub drawn: usize,
    pub labels: usize,
}

pub fn render_pass<C: Canvas>(
    grouped: &GroupedFeatures,
    map: &LinearMap,
    label_size: f64,
    canvas: &mut C,
    progress: &mut dyn ProgressSink,
) -> RenderSummary {
    let mut context = LabelContext::new();
    let mut summary = RenderSummary::default();

    progress.progress("Drawing features");
    for category in DRAW_ORDER {
        for feature in grouped.get(category) {
            let Some(bounds) = canvas.draw_feature(feature, map) else {
                continue;
            };
            summary.drawn += 1;
            if let Some(source) = feature.source {
                context.record_feature_area(source, bounds.area());
            }
        }
    }

    for overlay in &grouped.overlays {
        progress.progress(&format!("Drawing overlay {}", overlay.name));
        summary.drawn += overlay.features.iter()
            .filter_map(|feature| canvas.draw_feature(feature, map))
            .count();
    }

    progress.progress("Placing labels");
    {
        let engine = LabelEngine::new(map, &*canvas, label_size);
        let lines = engine.place_line_labels(&mut context, grouped);
        let areas = engine.place_area_labels(&mut context, grouped);
        info!(line_labels = lines, area_labels = areas; "Labels placed");
    }
    for label in context.labels() {
        canvas.draw_label(label);
    }
    summary.labels = context.labels().len();
    if summary.labels == 0 {
        progress.progress("Nothing labeled");
    }

    let size = (map.height() / 30.0).max(MIN_ATTRIBUTION_SIZE);
    canvas.draw_attribution(ATTRIBUTION, ScreenPoint::new(ATTRIBUTION_MARGIN, ATTRIBUTION_MARGIN), size);

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::osm::{Element, Node, Tags, Way},
        etl::semantic_map::build_network,
        label::TextExtent,
        projection::BoundingBox,
    };

    #[derive(Default)]
    struct RecordingCanvas {
        features: Vec<String>,
        labels: Vec<PlacedLabel>,
        attribution: Option<(String, f64)>,
    }

    impl TextMeasure for RecordingCanvas {
        fn measure(&self, text: &str, size: f64) -> TextExtent {
            TextExtent {
                width: text.chars().count() as f64 * size * 0.6,
                height: size * 1.2,
            }
        }
    }

    impl Canvas for RecordingCanvas {
        fn draw_feature(&mut self, feature: &Feature, map: &LinearMap) -> Option<Placement> {
            let bounds = Placement::around(
                feature.rings.iter()
                    .flat_map(|ring| map.apply_path(&ring.points))
                    .map(|point| (point.x, point.y)),
            )?;
            self.features.push(feature.category.name().to_string());
            Some(bounds)
        }

        fn draw_label(&mut self, label: &PlacedLabel) {
            self.labels.push(label.clone());
        }

        fn draw_attribution(&mut self, text: &str, _origin: ScreenPoint, size: f64) {
            self.attribution = Some((text.to_string(), size));
        }
    }

    impl ProgressSink for Vec<String> {
        fn progress(&mut self, message: &str) {
            self.push(message.to_string());
        }
    }

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn node(id: i64, lon: f64, lat: f64) -> Element {
        Element::Node(Node { id, lon, lat, tags: Tags::new() })
    }

    fn frame() -> LinearMap {
        let bbox = BoundingBox::from([0.0, 0.0, 0.01, 0.01]);
        LinearMap::new(&bbox, 200.0, 200.0, ScreenPoint::new(0.0, 0.0)).unwrap()
    }

    #[test]
    fn labels_a_single_street_end_to_end() {
        let mut elements: Vec<Element> = (1..=5)
            .map(|id| node(id, 0.001 + 0.002 * (id - 1) as f64, 0.005))
            .collect();
        elements.push(Element::Way(Way {
            id: 10,
            nodes: vec![1, 2, 3, 4, 5],
            tags: tags(&[("highway", "secondary"), ("name", "Main St")]),
        }));

        let grouped = build_network(&elements);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped.get(crate::data::semantic::Category::TrafficRoad).len(), 1);

        let map = frame();
        let mut canvas = RecordingCanvas::default();
        let mut progress: Vec<String> = Vec::new();
        let summary = render_pass(&grouped, &map, 5.0, &mut canvas, &mut progress);

        assert_eq!(summary, RenderSummary { drawn: 1, labels: 1 });
        assert_eq!(canvas.features, ["Traffic road"]);
        assert_eq!(canvas.labels.len(), 1);
        assert_eq!(canvas.labels[0].text, "Main St");
        assert!(!progress.iter().any(|message| message == "Nothing labeled"));
        assert_eq!(canvas.attribution, Some((ATTRIBUTION.to_string(), 12.0)));
    }

    #[test]
    fn reports_when_nothing_is_labeled() {
        let elements = vec![
            node(1, 0.001, 0.005),
            node(2, 0.009, 0.005),
            Element::Way(Way { id: 10, nodes: vec![1, 2], tags: tags(&[("railway", "rail")]) }),
        ];
        let grouped = build_network(&elements);

        let map = frame();
        let mut canvas = RecordingCanvas::default();
        let mut progress: Vec<String> = Vec::new();
        let summary = render_pass(&grouped, &map, 5.0, &mut canvas, &mut progress);

        assert_eq!(summary, RenderSummary { drawn: 1, labels: 0 });
        assert!(progress.iter().any(|message| message == "Nothing labeled"));
    }

    #[test]
    fn feature_areas_come_from_the_canvas() {
        let square = [(0.002, 0.002), (0.008, 0.002), (0.008, 0.008), (0.002, 0.008)];
        let mut elements: Vec<Element> = square.iter()
            .enumerate()
            .map(|(idx, &(lon, lat))| node(idx as i64 + 1, lon, lat))
            .collect();
        elements.push(Element::Way(Way {
            id: 20,
            nodes: vec![1, 2, 3, 4, 1],
            tags: tags(&[("leisure", "park"), ("name", "Green")]),
        }));
        let grouped = build_network(&elements);

        let map = frame();
        let mut canvas = RecordingCanvas::default();
        let mut progress: Vec<String> = Vec::new();
        let summary = render_pass(&grouped, &map, 5.0, &mut canvas, &mut progress);

        assert_eq!(summary.labels, 1);
        assert_eq!(canvas.labels[0].text, "Green");
    }
}
