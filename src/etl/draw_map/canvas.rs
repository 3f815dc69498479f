use std::f32::consts::PI;
use std::path::Path;

use font_kit::family_name::FamilyName;
use font_kit::font::Font;
use font_kit::properties::Properties;
use font_kit::source::SystemSource;
use pathfinder_geometry::vector::vec2f;
use raqote::{
    DrawOptions, DrawTarget, LineCap, LineJoin, PathBuilder, Point, SolidSource, Source,
    StrokeStyle, Transform, Winding,
};

use crate::{
    data::semantic::{Feature, FeatureKind},
    errors::Result,
    label::{collision::Placement, PlacedLabel, TextExtent, TextMeasure},
    projection::{LinearMap, ScreenPoint},
    render::Canvas,
};

use super::theme::{Style, Theme};

/// Frame width the style table is expressed in.
const REFERENCE_WIDTH: f32 = 720.0;

/// Label halo thickness in pixels.
const HALO: f32 = 1.0;

pub fn load_font(path: Option<&Path>) -> Result<Font> {
    match path {
        Some(path) => Ok(Font::from_path(path, 0)?),
        None => {
            let handle = SystemSource::new()
                .select_best_match(&[FamilyName::SansSerif], &Properties::new())?;
            Ok(handle.load()?)
        },
    }
}

/// Draws styled features onto a raqote target.
pub struct ShapePainter<'a> {
    target: DrawTarget,
    theme: &'a Theme,
    scale: f32,
}

impl<'a> ShapePainter<'a> {
    pub fn new(width: i32, height: i32, theme: &'a Theme) -> ShapePainter<'a> {
        let mut target = DrawTarget::new(width, height);
        target.clear(theme.background);
        ShapePainter {
            target,
            theme,
            scale: width as f32 / REFERENCE_WIDTH,
        }
    }

    fn stroke_style(&self, style: &Style) -> StrokeStyle {
        StrokeStyle {
            cap: LineCap::Round,
            join: LineJoin::Round,
            width: style.stroke_width * self.scale,
            miter_limit: 2.0,
            dash_array: style.dash.iter().map(|dash| dash * self.scale).collect(),
            dash_offset: 0.0,
        }
    }

    fn draw_point(&mut self, center: ScreenPoint, style: &Style) -> Option<Placement> {
        let fill = style.fill?;
        let radius = style.radius * self.scale;
        if radius <= 0.0 {
            return None;
        }
        let (x, y) = (center.x as f32, center.y as f32);
        let mut pb = PathBuilder::new();
        pb.arc(x, y, radius, 0.0, 2.0 * PI);
        pb.close();
        self.target.fill(&pb.finish(), &Source::Solid(fill), &DrawOptions::new());

        let radius = radius as f64;
        Some(Placement::new(center.x - radius, center.y - radius, center.x + radius, center.y + radius))
    }

    fn draw_rings(&mut self, rings: &[Vec<ScreenPoint>], style: &Style, closed: bool) -> Option<Placement> {
        let mut pb = PathBuilder::new();
        for points in rings.iter().filter(|points| points.len() >= 2) {
            pb.move_to(points[0].x as f32, points[0].y as f32);
            for point in &points[1..] {
                pb.line_to(point.x as f32, point.y as f32);
            }
            if closed {
                pb.close();
            }
        }
        let mut path = pb.finish();
        if path.ops.is_empty() {
            return None;
        }
        path.winding = Winding::EvenOdd;

        let mut drawn = false;
        if let (true, Some(fill)) = (closed, style.fill) {
            self.target.fill(&path, &Source::Solid(fill), &DrawOptions::new());
            drawn = true;
        }
        if let (Some(stroke), true) = (style.stroke, style.stroke_width > 0.0) {
            self.target.stroke(&path, &Source::Solid(stroke), &self.stroke_style(style), &DrawOptions::new());
            drawn = true;
        }
        if !drawn {
            return None;
        }

        Placement::around(rings.iter().flatten().map(|point| (point.x, point.y)))
    }

    pub fn draw_feature(&mut self, feature: &Feature, map: &LinearMap) -> Option<Placement> {
        let style = self.theme.style(feature.category)?;
        let rings: Vec<Vec<ScreenPoint>> = feature.rings.iter()
            .map(|ring| map.apply_path(&ring.points))
            .collect();

        match feature.kind {
            FeatureKind::Point => {
                let center = *rings.first()?.first()?;
                self.draw_point(center, style)
            },
            FeatureKind::Line => self.draw_rings(&rings, style, false),
            FeatureKind::Polygon => self.draw_rings(&rings, style, true),
        }
    }

    pub fn into_target(self) -> DrawTarget {
        self.target
    }
}

/// Raqote backed [`Canvas`] measuring and drawing text with one font.
pub struct RaqoteCanvas<'a> {
    painter: ShapePainter<'a>,
    font: Font,
}

impl<'a> RaqoteCanvas<'a> {
    pub fn new(painter: ShapePainter<'a>, font: Font) -> RaqoteCanvas<'a> {
        RaqoteCanvas { painter, font }
    }

    pub fn into_target(self) -> DrawTarget {
        self.painter.into_target()
    }

    fn units_to_px(&self, size: f64) -> f64 {
        size / self.font.metrics().units_per_em as f64
    }

    fn ascent(&self, size: f64) -> f64 {
        self.font.metrics().ascent as f64 * self.units_to_px(size)
    }

    /// Glyph ids with their pen positions along a baseline starting at `x`, `y`.
    fn layout(&self, text: &str, size: f64, x: f32, y: f32) -> (Vec<u32>, Vec<Point>) {
        let scale = self.units_to_px(size) as f32;
        let mut pen = vec2f(x, y);
        let mut ids = Vec::new();
        let mut positions = Vec::new();
        for c in text.chars() {
            let Some(id) = self.font.glyph_for_char(c) else {
                continue;
            };
            ids.push(id);
            positions.push(Point::new(pen.x(), pen.y()));
            if let Ok(advance) = self.font.advance(id) {
                pen += advance * scale;
            }
        }
        (ids, positions)
    }

    fn draw_text(&mut self, text: &str, size: f64, x: f32, y: f32) {
        let (ids, positions) = self.layout(text, size, x, y);
        let options = DrawOptions::new();
        let halo = Source::Solid(self.painter.theme.label_halo);
        for (dx, dy) in [(-HALO, 0.0), (HALO, 0.0), (0.0, -HALO), (0.0, HALO)] {
            let shifted: Vec<Point> = positions.iter()
                .map(|position| Point::new(position.x + dx, position.y + dy))
                .collect();
            self.painter.target.draw_glyphs(&self.font, size as f32, &ids, &shifted, &halo, &options);
        }
        let fill: SolidSource = self.painter.theme.label;
        self.painter.target.draw_glyphs(&self.font, size as f32, &ids, &positions, &Source::Solid(fill), &options);
    }
}

impl TextMeasure for RaqoteCanvas<'_> {
    fn measure(&self, text: &str, size: f64) -> TextExtent {
        let metrics = self.font.metrics();
        let advance: f32 = text.chars()
            .filter_map(|c| self.font.glyph_for_char(c))
            .filter_map(|id| self.font.advance(id).ok())
            .map(|advance| advance.x())
            .sum();
        TextExtent {
            width: advance as f64 * self.units_to_px(size),
            height: (metrics.ascent - metrics.descent) as f64 * self.units_to_px(size),
        }
    }
}

impl Canvas for RaqoteCanvas<'_> {
    fn draw_feature(&mut self, feature: &Feature, map: &LinearMap) -> Option<Placement> {
        self.painter.draw_feature(feature, map)
    }

    fn draw_label(&mut self, label: &PlacedLabel) {
        let (sin, cos) = (label.rotation as f32).sin_cos();
        let (x, y) = (label.anchor.x as f32, label.anchor.y as f32);
        self.painter.target.set_transform(&Transform::new(cos, sin, -sin, cos, x, y));

        let inset = ((label.width - label.text_width) / 2.0) as f32;
        let baseline = self.ascent(label.size) as f32;
        self.draw_text(&label.text, label.size, inset, baseline);

        self.painter.target.set_transform(&Transform::identity());
    }

    fn draw_attribution(&mut self, text: &str, origin: ScreenPoint, size: f64) {
        let baseline = (origin.y + self.ascent(size)) as f32;
        self.draw_text(text, size, origin.x as f32, baseline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::semantic::{Category, MapCoords, Ring, RingRole},
        data::osm::Tags,
        projection::BoundingBox,
    };

    fn frame() -> LinearMap {
        let bbox = BoundingBox::from([0.0, 0.0, 0.01, 0.01]);
        LinearMap::new(&bbox, 100.0, 100.0, ScreenPoint::new(0.0, 0.0)).unwrap()
    }

    fn feature(category: Category, kind: FeatureKind, points: &[(f64, f64)]) -> Feature {
        Feature {
            source: None,
            category,
            kind,
            rings: vec![Ring {
                role: RingRole::Outer,
                points: points.iter().map(|&(lon, lat)| MapCoords { lon, lat }).collect(),
            }],
            tags: Tags::new(),
            name: None,
        }
    }

    fn pixel(painter: &ShapePainter, x: usize, y: usize) -> u32 {
        painter.target.get_data()[y * 100 + x]
    }

    #[test]
    fn fills_polygons_and_reports_their_box() {
        let theme = Theme::default();
        let mut painter = ShapePainter::new(100, 100, &theme);
        let park = feature(
            Category::Park,
            FeatureKind::Polygon,
            &[(0.002, 0.002), (0.008, 0.002), (0.008, 0.008), (0.002, 0.008), (0.002, 0.002)],
        );

        let bounds = painter.draw_feature(&park, &frame()).unwrap();
        assert!((bounds.width() - 60.0).abs() < 0.5);
        assert!((bounds.height() - 60.0).abs() < 0.5);

        let fill = theme.style(Category::Park).unwrap().fill.unwrap();
        let expected = (fill.a as u32) << 24 | (fill.r as u32) << 16 | (fill.g as u32) << 8 | fill.b as u32;
        assert_eq!(pixel(&painter, 50, 50), expected);
        assert_eq!(pixel(&painter, 5, 5), 0xffff_ffff);
    }

    #[test]
    fn polygon_holes_stay_empty() {
        let theme = Theme::default();
        let mut painter = ShapePainter::new(100, 100, &theme);
        let mut water = feature(
            Category::WaterArea,
            FeatureKind::Polygon,
            &[(0.001, 0.001), (0.009, 0.001), (0.009, 0.009), (0.001, 0.009), (0.001, 0.001)],
        );
        water.rings.push(Ring {
            role: RingRole::Inner,
            points: [(0.004, 0.004), (0.006, 0.004), (0.006, 0.006), (0.004, 0.006), (0.004, 0.004)]
                .iter()
                .map(|&(lon, lat)| MapCoords { lon, lat })
                .collect(),
        });

        painter.draw_feature(&water, &frame()).unwrap();
        assert_eq!(pixel(&painter, 50, 50), 0xffff_ffff);
        assert_ne!(pixel(&painter, 20, 50), 0xffff_ffff);
    }

    #[test]
    fn points_are_drawn_as_circles() {
        let theme = Theme::default();
        let mut painter = ShapePainter::new(720, 720, &theme);
        let tree = feature(Category::Tree, FeatureKind::Point, &[(0.005, 0.005)]);

        let bbox = BoundingBox::from([0.0, 0.0, 0.01, 0.01]);
        let map = LinearMap::new(&bbox, 720.0, 720.0, ScreenPoint::new(0.0, 0.0)).unwrap();
        let bounds = painter.draw_feature(&tree, &map).unwrap();
        assert!((bounds.width() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn unstyled_or_degenerate_features_are_skipped() {
        let theme = Theme::default();
        let mut painter = ShapePainter::new(100, 100, &theme);

        let lonely = feature(Category::TrafficRoad, FeatureKind::Line, &[(0.005, 0.005)]);
        assert!(painter.draw_feature(&lonely, &frame()).is_none());

        // Line styles have no fill, so an unclosed park outline draws nothing.
        let outline = feature(Category::Park, FeatureKind::Line, &[(0.002, 0.002), (0.008, 0.008)]);
        assert!(painter.draw_feature(&outline, &frame()).is_none());
    }
}
