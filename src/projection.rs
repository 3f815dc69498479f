//! Geographic to output pixel coordinates.

use std::f64::consts::PI;

use serde::Deserialize;

use crate::{data::semantic::MapCoords, errors::Result};

/// Reference size of the projected world. Only ratios of projected
/// coordinates are ever used, so the value itself is arbitrary.
const WORLD_SIZE: f64 = 524288.0;

const SIN_LAT_LIMIT: f64 = 0.9999;

const D2R: f64 = PI / 180.0;

/// A point in output pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        ScreenPoint { x, y }
    }

    pub fn distance(&self, other: &ScreenPoint) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Geographic bounding box. On the wire it is always `[west, south, east, north]`.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(from = "[f64; 4]")]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        BoundingBox { west, south, east, north }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.west, bbox.south, bbox.east, bbox.north]
    }
}

impl BoundingBox {
    pub fn validate(&self) -> Result<()> {
        let finite = [self.west, self.south, self.east, self.north]
            .iter()
            .all(|value| value.is_finite());
        if !finite {
            return Err(format!("Bounding box {:?} has non-finite corners", self).into());
        }
        if self.west >= self.east || self.south >= self.north {
            return Err(format!(
                "Bounding box {:?} must be ordered [west, south, east, north]", <[f64; 4]>::from(*self)
            ).into());
        }
        if self.south < -90.0 || self.north > 90.0 {
            return Err(format!("Bounding box {:?} has latitudes outside [-90, 90]", <[f64; 4]>::from(*self)).into());
        }
        let sw = project(self.west, self.south);
        let ne = project(self.east, self.north);
        // Both latitudes inside the clamped polar band collapse to one line.
        if ne.0 == sw.0 || ne.1 == sw.1 {
            return Err(format!(
                "Bounding box {:?} has an empty projected extent", <[f64; 4]>::from(*self)
            ).into());
        }
        Ok(())
    }

    pub fn width_deg(&self) -> f64 {
        self.east - self.west
    }
}

/// Spherical web-mercator projection into `[0, WORLD_SIZE]` with y growing southwards.
pub fn project(lon: f64, lat: f64) -> (f64, f64) {
    let d = WORLD_SIZE / 2.0;
    let bc = WORLD_SIZE / 360.0;
    let cc = WORLD_SIZE / (2.0 * PI);
    let f = (D2R * lat).sin().clamp(-SIN_LAT_LIMIT, SIN_LAT_LIMIT);
    let x = d + lon * bc;
    let y = d + 0.5 * ((1.0 + f) / (1.0 - f)).ln() * -cc;
    (x, y.min(WORLD_SIZE))
}

/// Affine remap of projected coordinates inside a bounding box onto an output
/// frame. Build once per render pass and reuse it for every shape and label.
#[derive(Debug, Clone, Copy)]
pub struct LinearMap {
    bbox: BoundingBox,
    sw: (f64, f64),
    ne: (f64, f64),
    width: f64,
    height: f64,
    origin: ScreenPoint,
}

impl LinearMap {
    pub fn new(bbox: &BoundingBox, width: f64, height: f64, origin: ScreenPoint) -> Result<Self> {
        bbox.validate()?;
        if !(width > 0.0 && height > 0.0) {
            return Err(format!("Output frame {}x{} must not be empty", width, height).into());
        }
        Ok(LinearMap {
            bbox: *bbox,
            sw: project(bbox.west, bbox.south),
            ne: project(bbox.east, bbox.north),
            width,
            height,
            origin,
        })
    }

    pub fn apply(&self, lon: f64, lat: f64) -> ScreenPoint {
        let (px, py) = project(lon, lat);
        ScreenPoint {
            x: self.width * (px - self.sw.0) / (self.ne.0 - self.sw.0) + self.origin.x,
            y: self.height - self.height * (py - self.sw.1) / (self.ne.1 - self.sw.1) + self.origin.y,
        }
    }

    pub fn apply_coords(&self, coords: &MapCoords) -> ScreenPoint {
        self.apply(coords.lon, coords.lat)
    }

    pub fn apply_path(&self, path: &[MapCoords]) -> Vec<ScreenPoint> {
        path.iter().map(|coords| self.apply_coords(coords)).collect()
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
    }

    #[test]
    fn projects_origin_to_world_center() {
        let (x, y) = project(0.0, 0.0);
        assert_close(x, WORLD_SIZE / 2.0);
        assert_close(y, WORLD_SIZE / 2.0);
    }

    #[test]
    fn north_is_smaller_y() {
        let (_, north) = project(0.0, 10.0);
        let (_, south) = project(0.0, -10.0);
        assert!(north < south);
    }

    #[test]
    fn poles_stay_finite() {
        let (_, y) = project(0.0, 90.0);
        assert!(y.is_finite());
        let (_, y) = project(0.0, -90.0);
        assert!(y.is_finite() && y <= WORLD_SIZE);
    }

    #[test]
    fn linear_map_hits_frame_corners() {
        let bbox = BoundingBox::from([13.0, 52.0, 13.1, 52.1]);
        let map = LinearMap::new(&bbox, 200.0, 100.0, ScreenPoint::new(10.0, 20.0)).unwrap();

        let sw = map.apply(13.0, 52.0);
        assert_close(sw.x, 10.0);
        assert_close(sw.y, 120.0);

        let ne = map.apply(13.1, 52.1);
        assert_close(ne.x, 210.0);
        assert_close(ne.y, 20.0);
    }

    #[test]
    fn rejects_transposed_bbox() {
        let bbox = BoundingBox::from([52.0, 13.0, 51.0, 13.1]);
        assert!(bbox.validate().is_err());
        assert!(LinearMap::new(&bbox, 100.0, 100.0, ScreenPoint::new(0.0, 0.0)).is_err());
    }

    #[test]
    fn rejects_latitudes_beyond_the_poles() {
        let bbox = BoundingBox::from([0.0, 80.0, 1.0, 91.0]);
        assert!(bbox.validate().is_err());
        let bbox = BoundingBox::from([0.0, -95.0, 1.0, 0.0]);
        assert!(LinearMap::new(&bbox, 100.0, 100.0, ScreenPoint::new(0.0, 0.0)).is_err());
    }

    #[test]
    fn rejects_bbox_inside_the_clamped_polar_band() {
        let bbox = BoundingBox::from([0.0, 89.5, 1.0, 90.0]);
        assert!(bbox.validate().is_err());
        assert!(LinearMap::new(&bbox, 200.0, 200.0, ScreenPoint::new(0.0, 0.0)).is_err());
    }

    #[test]
    fn bbox_deserializes_in_wire_order() {
        let bbox: BoundingBox = serde_json::from_str("[1.0, 2.0, 3.0, 4.0]").unwrap();
        assert_eq!(bbox, BoundingBox { west: 1.0, south: 2.0, east: 3.0, north: 4.0 });
    }
}
