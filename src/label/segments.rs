//! Splits a projected polyline into runs straight enough to carry a label.

use std::f64::consts::PI;

use crate::projection::ScreenPoint;

/// Turning angle above which a vertex always ends a segment.
const MAX_ANGLE_DELTA: f64 = PI / 45.0;

/// A run `[begin_index, end_index)` of a polyline. Consecutive segments share
/// their boundary vertex, so `next.begin_index == prev.end_index - 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelableSegment {
    pub length: f64,
    pub begin_index: usize,
    pub begin_distance: f64,
    pub end_index: usize,
    pub end_distance: f64,
}

impl LabelableSegment {
    pub fn first_point(&self) -> usize {
        self.begin_index
    }

    pub fn last_point(&self) -> usize {
        self.end_index - 1
    }
}

fn turning_angle(ab: (f64, f64), bc: (f64, f64), ab_len: f64, bc_len: f64) -> f64 {
    let denominator = ab_len * bc_len;
    if denominator == 0.0 {
        return 0.0;
    }
    ((ab.0 * bc.0 + ab.1 * bc.1) / denominator).clamp(-1.0, 1.0).acos()
}

/// Cut `points` at sharp bends and whenever the run since the last cut grows
/// longer than `target_length`.
pub fn segments(points: &[ScreenPoint], target_length: f64) -> Vec<LabelableSegment> {
    match points.len() {
        0 | 1 => return Vec::new(),
        2 => {
            let length = points[0].distance(&points[1]);
            return vec![LabelableSegment {
                length,
                begin_index: 0,
                begin_distance: 0.0,
                end_index: 2,
                end_distance: length,
            }];
        }
        _ => (),
    }

    let mut chunks = Vec::new();
    let mut distance = 0.0;
    let mut start_index = 0;
    let mut start_distance = 0.0;
    let mut ab_len = points[0].distance(&points[1]);
    let mut bc_len = 0.0;
    let last = points.len() - 1;

    for i in 1..last {
        let (a, b, c) = (points[i - 1], points[i], points[i + 1]);
        let ab = (b.x - a.x, b.y - a.y);
        let bc = (c.x - b.x, c.y - b.y);
        bc_len = (bc.0 * bc.0 + bc.1 * bc.1).sqrt();
        distance += ab_len;

        let angle = turning_angle(ab, bc, ab_len, bc_len);
        if angle > MAX_ANGLE_DELTA || distance - start_distance > target_length {
            chunks.push(LabelableSegment {
                length: distance - start_distance,
                begin_index: start_index,
                begin_distance: start_distance,
                end_index: i + 1,
                end_distance: distance,
            });
            start_index = i;
            start_distance = distance;
        }
        ab_len = bc_len;
    }

    if last > start_index {
        chunks.push(LabelableSegment {
            length: distance - start_distance + bc_len,
            begin_index: start_index,
            begin_distance: start_distance,
            end_index: last + 1,
            end_distance: distance + bc_len,
        });
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(f64, f64)]) -> Vec<ScreenPoint> {
        points.iter().map(|&(x, y)| ScreenPoint::new(x, y)).collect()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    fn assert_invariants(points: &[ScreenPoint], chunks: &[LabelableSegment]) {
        for chunk in chunks {
            assert!(chunk.begin_index < chunk.end_index);
            assert!(chunk.end_index <= points.len());
            assert_close(chunk.length, chunk.end_distance - chunk.begin_distance);
        }
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].begin_index, pair[0].end_index - 1);
            assert_close(pair[1].begin_distance, pair[0].end_distance);
        }
    }

    #[test]
    fn short_inputs() {
        assert!(segments(&[], 10.0).is_empty());
        assert!(segments(&line(&[(1.0, 1.0)]), 10.0).is_empty());

        let chunks = segments(&line(&[(0.0, 0.0), (3.0, 4.0)]), 1.0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].begin_index, 0);
        assert_eq!(chunks[0].end_index, 2);
        assert_close(chunks[0].length, 5.0);
    }

    #[test]
    fn straight_line_is_one_segment() {
        let points = line(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0)]);
        let chunks = segments(&points, 100.0);
        assert_eq!(chunks.len(), 1);
        assert_eq!((chunks[0].begin_index, chunks[0].end_index), (0, 4));
        assert_close(chunks[0].length, 30.0);
        assert_invariants(&points, &chunks);
    }

    #[test]
    fn sharp_bend_cuts() {
        let points = line(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let chunks = segments(&points, 100.0);
        assert_eq!(chunks.len(), 2);
        assert_eq!((chunks[0].begin_index, chunks[0].end_index), (0, 2));
        assert_eq!((chunks[1].begin_index, chunks[1].end_index), (1, 3));
        assert_close(chunks[0].length, 10.0);
        assert_close(chunks[1].length, 10.0);
        assert_invariants(&points, &chunks);
    }

    #[test]
    fn long_runs_are_cut_at_target_length() {
        let points: Vec<_> = (0..=10).map(|i| ScreenPoint::new(i as f64 * 10.0, 0.0)).collect();
        let chunks = segments(&points, 25.0);
        assert!(chunks.len() > 1);
        assert_invariants(&points, &chunks);
        let total: f64 = chunks.iter().map(|chunk| chunk.length).sum();
        assert_close(total, 100.0);
    }

    #[test]
    fn duplicate_points_do_not_cut() {
        let points = line(&[(0.0, 0.0), (5.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
        let chunks = segments(&points, 100.0);
        assert_eq!(chunks.len(), 1);
        assert_invariants(&points, &chunks);
    }
}
