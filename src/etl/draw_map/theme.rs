use std::collections::HashMap;

use raqote::SolidSource;
use serde::{Deserialize, Deserializer};

use crate::data::semantic::Category;

/// A color written as `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexColor(pub SolidSource);

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(HexColor(deserializer.deserialize_str(serialize_color::ColorVisitor)?))
    }
}

mod serialize_color {
    use raqote::SolidSource;
    use serde::de::{self, Visitor};

    pub struct ColorVisitor;

    impl<'de> Visitor<'de> for ColorVisitor {
        type Value = SolidSource;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(formatter, "a color string of the form '#rrggbbaa'")
        }

        fn visit_str<E>(self, string: &str) -> Result<Self::Value, E> where E: de::Error {
            if string.len() != 9 || !string.is_ascii() || !string.starts_with('#') {
                return Err(de::Error::invalid_value(de::Unexpected::Str(string), &self))
            }
            let r = parse_hex_byte(&self, &string[1..3])?;
            let g = parse_hex_byte(&self, &string[3..5])?;
            let b = parse_hex_byte(&self, &string[5..7])?;
            let a = parse_hex_byte(&self, &string[7..9])?;
            Ok(SolidSource::from_unpremultiplied_argb(a, r, g, b))
        }
    }

    fn parse_hex_byte<E>(visitor: &ColorVisitor, string: &str) -> Result<u8, E> where E: de::Error {
        u8::from_str_radix(string, 16).map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(string), visitor)
        })
    }
}

/// Per category overrides from the user config. Missing fields keep the default.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct StyleOverride {
    pub fill: Option<HexColor>,
    pub stroke: Option<HexColor>,
    pub stroke_width: Option<f32>,
    pub dash: Option<Vec<f32>>,
    pub radius: Option<f32>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ThemeConfig {
    pub background: Option<HexColor>,
    pub label: Option<HexColor>,
    pub label_halo: Option<HexColor>,
    #[serde(default)]
    pub categories: HashMap<Category, StyleOverride>,
}

/// How one category is drawn. Widths, dashes and radii are in reference
/// pixels of a 720 pixel wide frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub fill: Option<SolidSource>,
    pub stroke: Option<SolidSource>,
    pub stroke_width: f32,
    pub dash: Vec<f32>,
    pub radius: f32,
}

impl Style {
    fn filled(fill: SolidSource) -> Self {
        Style { fill: Some(fill), stroke: None, stroke_width: 0.0, dash: Vec::new(), radius: 0.0 }
    }

    fn stroked(stroke: SolidSource, stroke_width: f32) -> Self {
        Style { fill: None, stroke: Some(stroke), stroke_width, dash: Vec::new(), radius: 0.0 }
    }

    fn point(fill: SolidSource, radius: f32) -> Self {
        Style { radius, ..Style::filled(fill) }
    }

    fn apply(&mut self, overrides: &StyleOverride) {
        if let Some(HexColor(fill)) = overrides.fill {
            self.fill = Some(fill);
        }
        if let Some(HexColor(stroke)) = overrides.stroke {
            self.stroke = Some(stroke);
        }
        if let Some(stroke_width) = overrides.stroke_width {
            self.stroke_width = stroke_width;
        }
        if let Some(dash) = &overrides.dash {
            self.dash = dash.clone();
        }
        if let Some(radius) = overrides.radius {
            self.radius = radius;
        }
    }
}

fn rgb(r: u8, g: u8, b: u8) -> SolidSource {
    SolidSource::from_unpremultiplied_argb(0xff, r, g, b)
}

fn unit(r: f32, g: f32, b: f32, opacity: f32) -> SolidSource {
    let byte = |value: f32| (value * 255.0).round() as u8;
    SolidSource::from_unpremultiplied_argb(byte(opacity), byte(r), byte(g), byte(b))
}

fn default_style(category: Category) -> Style {
    match category {
        Category::Building => Style {
            stroke: Some(unit(0.7, 0.7, 0.7, 1.0)),
            stroke_width: 0.5,
            ..Style::filled(unit(0.8, 0.8, 0.8, 1.0))
        },
        Category::OverlayPolygon => Style {
            stroke: Some(unit(0.0, 0.5, 0.5, 1.0)),
            stroke_width: 1.0,
            ..Style::filled(unit(0.0, 0.9, 0.9, 0.5))
        },
        Category::OverlayLine => Style::stroked(rgb(0, 200, 200), 4.0),
        Category::OverlayPoint => Style::point(rgb(50, 50, 50), 4.0),
        Category::Tree => Style::point(rgb(157, 219, 150), 2.0),
        Category::University => Style::filled(rgb(254, 255, 230)),
        Category::Industrial => Style::filled(rgb(236, 219, 233)),
        Category::Commercial => Style::filled(rgb(243, 217, 217)),
        Category::Residential => Style::filled(rgb(225, 225, 225)),
        Category::Wood => Style::filled(rgb(174, 209, 159)),
        Category::Pitch => Style::filled(rgb(170, 224, 203)),
        Category::Park => Style::filled(rgb(190, 253, 200)),
        Category::WaterLine => Style::stroked(unit(0.7, 0.7, 0.9, 1.0), 2.0),
        Category::WaterArea => Style::filled(unit(0.7, 0.7, 0.9, 1.0)),
        Category::Water => Style::stroked(unit(0.7, 0.7, 0.9, 1.0), 4.0),
        Category::TrafficRoadMajor => Style::stroked(rgb(252, 214, 164), 5.0),
        Category::TrafficRoadSupermajor => Style::stroked(rgb(232, 146, 162), 6.0),
        Category::TrafficRoad => Style::stroked(unit(0.6, 0.6, 0.6, 1.0), 2.0),
        Category::ServiceRoad => Style::stroked(unit(0.7, 0.6, 0.6, 1.0), 1.0),
        Category::Rail => Style::stroked(unit(0.5, 0.6, 0.8, 1.0), 1.0),
        Category::Path => Style {
            dash: vec![2.0, 1.0],
            ..Style::stroked(unit(0.6, 0.6, 0.6, 1.0), 0.5)
        },
    }
}

const ALL_CATEGORIES: [Category; 21] = [
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
    Category::OverlayPoint,
    Category::OverlayLine,
    Category::OverlayPolygon,
];

/// Style lookup table, resolved once per run.
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: SolidSource,
    pub label: SolidSource,
    pub label_halo: SolidSource,
    styles: HashMap<Category, Style>,
}

impl Theme {
    pub fn new(config: &ThemeConfig) -> Theme {
        let styles = ALL_CATEGORIES.iter()
            .map(|&category| {
                let mut style = default_style(category);
                if let Some(overrides) = config.categories.get(&category) {
                    style.apply(overrides);
                }
                (category, style)
            })
            .collect();

        Theme {
            background: config.background.map_or(rgb(0xff, 0xff, 0xff), |HexColor(color)| color),
            label: config.label.map_or(rgb(0, 0, 0), |HexColor(color)| color),
            label_halo: config.label_halo.map_or(rgb(0xff, 0xff, 0xff), |HexColor(color)| color),
            styles,
        }
    }

    pub fn style(&self, category: Category) -> Option<&Style> {
        self.styles.get(&category)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::new(&ThemeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        let color: HexColor = serde_json::from_str("\"#ff800040\"").unwrap();
        assert_eq!(color.0, SolidSource::from_unpremultiplied_argb(0x40, 0xff, 0x80, 0x00));
    }

    #[test]
    fn rejects_malformed_colors() {
        for input in ["\"#ff8000\"", "\"ff80004000\"", "\"#gg800040\"", "\"#ff80é040\"", "12"] {
            assert!(serde_json::from_str::<HexColor>(input).is_err(), "{} was accepted", input);
        }
    }

    #[test]
    fn every_category_has_a_style() {
        let theme = Theme::default();
        for category in ALL_CATEGORIES {
            assert!(theme.style(category).is_some(), "{} has no style", category.name());
        }
        let path = theme.style(Category::Path).unwrap();
        assert_eq!(path.dash, [2.0, 1.0]);
        assert!(path.fill.is_none());
    }

    #[test]
    fn config_overrides_defaults() {
        let config: ThemeConfig = serde_json::from_str(r##"{
            "background": "#000000ff",
            "categories": {
                "Park": { "fill": "#00ff00ff" },
                "TrafficRoad": { "stroke_width": 3.5 }
            }
        }"##).unwrap();
        let theme = Theme::new(&config);

        assert_eq!(theme.background, rgb(0, 0, 0));
        assert_eq!(theme.label, rgb(0, 0, 0));
        assert_eq!(theme.style(Category::Park).unwrap().fill, Some(rgb(0, 0xff, 0)));

        let road = theme.style(Category::TrafficRoad).unwrap();
        assert_eq!(road.stroke_width, 3.5);
        assert_eq!(road.stroke, Some(unit(0.6, 0.6, 0.6, 1.0)));
    }
}
