//! Pole of inaccessibility: the interior point farthest from a polygon's boundary.

use std::{cmp::Ordering, collections::BinaryHeap, f64::consts::SQRT_2};

use geo::{BoundingRect, Centroid, Coord, LineString, Polygon};

/// Square search cell with its signed distance to the polygon boundary.
struct Cell {
    center: Coord<f64>,
    half: f64,
    distance: f64,
    max_distance: f64,
}

impl Cell {
    fn new(center: Coord<f64>, half: f64, polygon: &Polygon<f64>) -> Self {
        let distance = signed_distance(center, polygon);
        Cell {
            center,
            half,
            distance,
            max_distance: distance + half * SQRT_2,
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.max_distance.total_cmp(&other.max_distance)
    }
}

fn segment_distance_sq(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let mut x = a.x;
    let mut y = a.y;
    let dx = b.x - x;
    let dy = b.y - y;

    if dx != 0.0 || dy != 0.0 {
        let t = ((p.x - x) * dx + (p.y - y) * dy) / (dx * dx + dy * dy);
        if t > 1.0 {
            x = b.x;
            y = b.y;
        } else if t > 0.0 {
            x += dx * t;
            y += dy * t;
        }
    }

    (p.x - x).powi(2) + (p.y - y).powi(2)
}

/// Distance from `point` to the nearest ring edge, positive inside the polygon
/// and negative outside. Holes count as outside.
fn signed_distance(point: Coord<f64>, polygon: &Polygon<f64>) -> f64 {
    let mut inside = false;
    let mut min_distance_sq = f64::INFINITY;

    let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
    for ring in rings {
        for line in ring.lines() {
            let (a, b) = (line.start, line.end);
            if (a.y > point.y) != (b.y > point.y)
                && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
            {
                inside = !inside;
            }
            min_distance_sq = min_distance_sq.min(segment_distance_sq(point, a, b));
        }
    }

    let distance = min_distance_sq.sqrt();
    if inside { distance } else { -distance }
}

/// Find the pole of inaccessibility of the polygon bounded by `exterior` with
/// `holes`, to within `precision` (in the coordinate units of the input).
///
/// Returns `None` for rings too small to enclose anything.
pub fn polylabel(exterior: &[Coord<f64>], holes: &[Vec<Coord<f64>>], precision: f64) -> Option<Coord<f64>> {
    if exterior.len() < 3 {
        return None;
    }

    let polygon = Polygon::new(
        LineString::from(exterior.to_vec()),
        holes.iter()
            .filter(|hole| hole.len() >= 3)
            .map(|hole| LineString::from(hole.clone()))
            .collect(),
    );

    let bounds = polygon.bounding_rect()?;
    let cell_size = bounds.width().min(bounds.height());
    if cell_size == 0.0 || !cell_size.is_finite() {
        return Some(bounds.min());
    }
    let half = cell_size / 2.0;

    let mut queue = BinaryHeap::new();
    let mut x = bounds.min().x;
    while x < bounds.max().x {
        let mut y = bounds.min().y;
        while y < bounds.max().y {
            queue.push(Cell::new(Coord { x: x + half, y: y + half }, half, &polygon));
            y += cell_size;
        }
        x += cell_size;
    }

    let mut best = match polygon.centroid() {
        Some(centroid) => Cell::new(centroid.0, 0.0, &polygon),
        None => Cell::new(bounds.center(), 0.0, &polygon),
    };
    let bbox_cell = Cell::new(bounds.center(), 0.0, &polygon);
    if bbox_cell.distance > best.distance {
        best = bbox_cell;
    }

    let precision = precision.max(f64::EPSILON);
    while let Some(cell) = queue.pop() {
        if cell.distance > best.distance {
            best = Cell { half: 0.0, ..cell };
        }

        if cell.max_distance - best.distance <= precision {
            continue;
        }

        let half = cell.half / 2.0;
        for (dx, dy) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            let center = Coord { x: cell.center.x + dx * half, y: cell.center.y + dy * half };
            queue.push(Cell::new(center, half, &polygon));
        }
    }

    Some(best.center)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| Coord { x, y }).collect()
    }

    #[test]
    fn square_pole_is_its_center() {
        let square = ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let pole = polylabel(&square, &[], 0.01).unwrap();
        assert!((pole.x - 5.0).abs() < 0.1);
        assert!((pole.y - 5.0).abs() < 0.1);
    }

    #[test]
    fn pole_avoids_holes() {
        let square = ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let hole = ring(&[(3.0, 3.0), (7.0, 3.0), (7.0, 7.0), (3.0, 7.0), (3.0, 3.0)]);
        let pole = polylabel(&square, &[hole], 0.01).unwrap();
        let inside_hole = pole.x > 3.0 && pole.x < 7.0 && pole.y > 3.0 && pole.y < 7.0;
        assert!(!inside_hole, "pole {:?} lies in the hole", pole);
    }

    #[test]
    fn pole_of_l_shape_is_inside() {
        let shape = ring(&[
            (0.0, 0.0), (10.0, 0.0), (10.0, 2.0), (2.0, 2.0), (2.0, 10.0), (0.0, 10.0), (0.0, 0.0),
        ]);
        let pole = polylabel(&shape, &[], 0.01).unwrap();
        let polygon = Polygon::new(LineString::from(shape.clone()), vec![]);
        assert!(signed_distance(pole, &polygon) > 0.0);
    }

    #[test]
    fn degenerate_rings() {
        assert!(polylabel(&ring(&[(0.0, 0.0), (1.0, 1.0)]), &[], 1.0).is_none());
        let flat = ring(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (0.0, 0.0)]);
        assert_eq!(polylabel(&flat, &[], 1.0), Some(Coord { x: 0.0, y: 0.0 }));
    }
}
