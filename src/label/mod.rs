//! Greedy label placement against a collision index.
//!
//! Line labels are placed first, in [`LINE_LABEL_ORDER`], then area labels in
//! [`AREA_LABEL_ORDER`]. Every committed label grows the collision index, so
//! placement has to stay strictly sequential.

use std::collections::{HashMap, HashSet};
use std::f64::consts::FRAC_PI_2;

use geo::{Area, Coord, LineString, Polygon};
use log::debug;

use crate::{
    data::semantic::{
        Category, Feature, FeatureKind, FeatureRef, GroupedFeatures, Ring, AREA_LABEL_ORDER,
        LINE_LABEL_ORDER,
    },
    projection::{LinearMap, ScreenPoint},
};

use self::{
    center_sort::center_sort,
    collision::{CollisionIndex, Placement},
    polylabel::polylabel,
    segments::{segments, LabelableSegment},
};

pub mod center_sort;
pub mod collision;
pub mod polylabel;
pub mod segments;

/// Longer names are never labeled.
pub const MAX_NAME_LENGTH: usize = 20;

/// Areas drawn smaller than this fraction of the frame are not labeled.
pub const AREA_RATIO_CUTOFF: f64 = 80.0;

/// Perpendicular shift of a line label's anchor, as a divisor of the label size.
const LINE_OFFSET_DIVISOR: f64 = 1.7;

/// Rendered size of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f64,
    pub height: f64,
}

/// Measures text the way the canvas will render it.
pub trait TextMeasure {
    fn measure(&self, text: &str, size: f64) -> TextExtent;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Line,
    Area,
}

/// A committed label. The label box starts at `anchor`, extends `width` along
/// the direction given by `rotation` (radians, clockwise on screen) and
/// `height` perpendicular to it. The text is centered in the box.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub text: String,
    pub kind: LabelKind,
    pub category: Category,
    pub size: f64,
    pub anchor: ScreenPoint,
    pub rotation: f64,
    pub width: f64,
    pub height: f64,
    pub text_width: f64,
    pub bounds: Placement,
}

impl PlacedLabel {
    #[allow(clippy::too_many_arguments)]
    fn new(
        text: &str,
        kind: LabelKind,
        category: Category,
        size: f64,
        anchor: ScreenPoint,
        rotation: f64,
        width: f64,
        extent: TextExtent,
    ) -> Self {
        let mut label = PlacedLabel {
            text: text.to_string(),
            kind,
            category,
            size,
            anchor,
            rotation,
            width,
            height: extent.height,
            text_width: extent.width,
            bounds: Placement::new(anchor.x, anchor.y, anchor.x, anchor.y),
        };
        if let Some(bounds) = Placement::around(label.corners().map(|corner| (corner.x, corner.y))) {
            label.bounds = bounds;
        }
        label
    }

    /// Corners of the rotated label box, clockwise from the anchor.
    pub fn corners(&self) -> [ScreenPoint; 4] {
        let (sin, cos) = self.rotation.sin_cos();
        let along = (cos * self.width, sin * self.width);
        let across = (-sin * self.height, cos * self.height);
        let a = self.anchor;
        [
            a,
            ScreenPoint::new(a.x + along.0, a.y + along.1),
            ScreenPoint::new(a.x + along.0 + across.0, a.y + along.1 + across.1),
            ScreenPoint::new(a.x + across.0, a.y + across.1),
        ]
    }
}

/// Per-pass placement state: the collision index, names already placed and
/// the drawn area of every feature.
#[derive(Debug, Default)]
pub struct LabelContext {
    index: CollisionIndex,
    placed_names: HashSet<String>,
    feature_areas: HashMap<FeatureRef, f64>,
    labels: Vec<PlacedLabel>,
}

impl LabelContext {
    pub fn new() -> Self {
        LabelContext {
            index: CollisionIndex::new(),
            ..Default::default()
        }
    }

    pub fn record_feature_area(&mut self, feature: FeatureRef, area: f64) {
        self.feature_areas.insert(feature, area);
    }

    pub fn feature_area(&self, feature: &FeatureRef) -> f64 {
        self.feature_areas.get(feature).copied().unwrap_or(0.0)
    }

    pub fn is_placed(&self, name: &str) -> bool {
        self.placed_names.contains(name)
    }

    pub fn labels(&self) -> &[PlacedLabel] {
        &self.labels
    }

    /// Commit `label` unless its box collides with an earlier one.
    fn try_commit(&mut self, label: PlacedLabel) -> bool {
        if self.index.collides(&label.bounds) {
            return false;
        }
        self.index.insert(label.bounds);
        self.placed_names.insert(label.text.clone());
        self.labels.push(label);
        true
    }
}

fn name_length(name: &str) -> usize {
    name.encode_utf16().count()
}

/// Places labels for one render pass using a fixed coordinate map.
pub struct LabelEngine<'a, M: TextMeasure> {
    map: &'a LinearMap,
    measure: &'a M,
    label_size: f64,
}

impl<'a, M: TextMeasure> LabelEngine<'a, M> {
    pub fn new(map: &'a LinearMap, measure: &'a M, label_size: f64) -> Self {
        LabelEngine { map, measure, label_size }
    }

    fn labelable_name<'f>(&self, context: &LabelContext, feature: &'f Feature) -> Option<&'f str> {
        let name = feature.name.as_deref()?;
        if name.is_empty() || name_length(name) > MAX_NAME_LENGTH || context.is_placed(name) {
            return None;
        }
        Some(name)
    }

    /// Label every named line feature in priority order. Returns the number of
    /// labels committed.
    pub fn place_line_labels(&self, context: &mut LabelContext, grouped: &GroupedFeatures) -> usize {
        let mut placed = 0;
        for category in LINE_LABEL_ORDER {
            for feature in grouped.get(category) {
                if feature.kind != FeatureKind::Line {
                    continue;
                }
                let Some(name) = self.labelable_name(context, feature) else {
                    continue;
                };
                if self.place_line_label(context, feature, name) {
                    placed += 1;
                } else {
                    debug!(name = name, category = category.name(); "No position found for line label");
                }
            }
        }
        placed
    }

    fn line_candidates(&self, points: &[ScreenPoint], name: &str) -> Vec<LabelableSegment> {
        let target_length = name_length(name) as f64 * self.label_size;
        center_sort(
            segments(points, target_length)
                .into_iter()
                .filter(|segment| segment.length > target_length * 0.5)
                .collect(),
        )
    }

    fn place_line_label(&self, context: &mut LabelContext, feature: &Feature, name: &str) -> bool {
        let Some(ring) = feature.rings.first() else {
            return false;
        };
        let points = self.map.apply_path(&ring.points);
        let candidates = self.line_candidates(&points, name);
        if candidates.is_empty() {
            return false;
        }

        let extent = self.measure.measure(name, self.label_size);
        let offset = self.label_size / LINE_OFFSET_DIVISOR;

        for segment in candidates {
            let (c1, c2) = (points[segment.first_point()], points[segment.last_point()]);
            let (a, b) = if c1.x < c2.x { (c1, c2) } else { (c2, c1) };

            let width = a.distance(&b);
            let angle = (b.y - a.y).atan2(b.x - a.x);
            let normal = angle + FRAC_PI_2;
            let anchor = ScreenPoint::new(a.x - normal.cos() * offset, a.y - normal.sin() * offset);

            if anchor.x < 0.0 || anchor.y < 0.0 {
                continue;
            }

            let label = PlacedLabel::new(
                name, LabelKind::Line, feature.category, self.label_size, anchor, angle, width, extent,
            );
            if context.try_commit(label) {
                return true;
            }
        }
        false
    }

    /// Label named polygons large enough to read, in priority order. Run after
    /// [`Self::place_line_labels`]. Returns the number of labels committed.
    pub fn place_area_labels(&self, context: &mut LabelContext, grouped: &GroupedFeatures) -> usize {
        let min_area = self.map.width() * self.map.height() / AREA_RATIO_CUTOFF;
        let mut placed = 0;
        for category in AREA_LABEL_ORDER {
            for feature in grouped.get(category) {
                if feature.kind != FeatureKind::Polygon {
                    continue;
                }
                let Some(name) = self.labelable_name(context, feature) else {
                    continue;
                };
                let area = feature.source.map_or(0.0, |source| context.feature_area(&source));
                if area < min_area {
                    continue;
                }
                if self.place_area_label(context, feature, name) {
                    placed += 1;
                } else {
                    debug!(name = name, category = category.name(); "No position found for area label");
                }
            }
        }
        placed
    }

    fn place_area_label(&self, context: &mut LabelContext, feature: &Feature, name: &str) -> bool {
        let Some(pole) = pole_of_inaccessibility(feature, self.pole_precision()) else {
            return false;
        };
        let point = self.map.apply(pole.x, pole.y);
        if point.x < 0.0 || point.y < 0.0 {
            return false;
        }

        let extent = self.measure.measure(name, self.label_size);
        let anchor = ScreenPoint::new(point.x - extent.width / 2.0, point.y);
        let label = PlacedLabel::new(
            name, LabelKind::Area, feature.category, self.label_size, anchor, 0.0, extent.width, extent,
        );
        context.try_commit(label)
    }

    /// One output pixel, in degrees of longitude.
    fn pole_precision(&self) -> f64 {
        self.map.bbox().width_deg() / self.map.width()
    }
}

fn ring_coords(ring: &Ring) -> Vec<Coord<f64>> {
    ring.points.iter()
        .map(|coords| Coord { x: coords.lon, y: coords.lat })
        .collect()
}

/// Pole of inaccessibility of a polygon feature, in lon/lat. Multipolygons use
/// their largest outer ring together with all inner rings.
fn pole_of_inaccessibility(feature: &Feature, precision: f64) -> Option<Coord<f64>> {
    let exterior = feature.outer_rings()
        .map(ring_coords)
        .filter(|coords| coords.len() >= 3)
        .max_by(|a, b| {
            let area = |coords: &Vec<Coord<f64>>| {
                Polygon::new(LineString::from(coords.clone()), vec![]).unsigned_area()
            };
            area(a).total_cmp(&area(b))
        })?;
    let holes: Vec<_> = feature.inner_rings().map(ring_coords).collect();
    polylabel(&exterior, &holes, precision)
}
