use rstar::{RTree, RTreeObject, AABB};

/// Axis-aligned box in output pixels occupied by a committed label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Placement {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Placement { min_x, min_y, max_x, max_y }
    }

    /// Smallest box containing all `points`.
    pub fn around(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Placement>, (x, y)| {
            Some(match acc {
                None => Placement::new(x, y, x, y),
                Some(b) => Placement::new(b.min_x.min(x), b.min_y.min(y), b.max_x.max(x), b.max_y.max(y)),
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Rectangle overlap with a non-empty interior. Boxes that only touch
    /// along an edge or at a corner do not overlap. A degenerate box
    /// overlaps anything it lies on.
    pub fn overlaps(&self, other: &Placement) -> bool {
        fn axis(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> bool {
            let low = a_min.max(b_min);
            let high = a_max.min(b_max);
            low < high || (low == high && (a_min == a_max || b_min == b_max))
        }

        axis(self.min_x, self.max_x, other.min_x, other.max_x)
            && axis(self.min_y, self.max_y, other.min_y, other.max_y)
    }
}

impl RTreeObject for Placement {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

/// Grow-only index of committed label boxes for one render pass.
#[derive(Debug, Default)]
pub struct CollisionIndex {
    tree: RTree<Placement>,
}

impl CollisionIndex {
    pub fn new() -> Self {
        CollisionIndex { tree: RTree::new() }
    }

    pub fn insert(&mut self, placement: Placement) {
        self.tree.insert(placement);
    }

    pub fn collides(&self, placement: &Placement) -> bool {
        self.tree
            .locate_in_envelope_intersecting(&placement.envelope())
            .any(|other| other.overlaps(placement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index_never_collides() {
        let index = CollisionIndex::new();
        assert!(!index.collides(&Placement::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn inserted_box_collides_with_itself() {
        let mut index = CollisionIndex::new();
        let placement = Placement::new(0.0, 0.0, 10.0, 5.0);
        index.insert(placement);
        assert!(index.collides(&placement));
    }

    #[test]
    fn touching_edges_do_not_collide() {
        let mut index = CollisionIndex::new();
        index.insert(Placement::new(0.0, 0.0, 10.0, 10.0));
        assert!(!index.collides(&Placement::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!index.collides(&Placement::new(0.0, 10.0, 10.0, 20.0)));
        assert!(!index.collides(&Placement::new(10.0, 10.0, 20.0, 20.0)));
        assert!(index.collides(&Placement::new(9.5, 9.5, 20.0, 20.0)));
    }

    #[test]
    fn collision_is_symmetric() {
        let a = Placement::new(0.0, 0.0, 10.0, 10.0);
        let b = Placement::new(5.0, -5.0, 15.0, 5.0);
        let c = Placement::new(20.0, 20.0, 30.0, 30.0);

        for (first, second) in [(a, b), (a, c), (b, c)] {
            let mut forward = CollisionIndex::new();
            forward.insert(first);
            let mut backward = CollisionIndex::new();
            backward.insert(second);
            assert_eq!(forward.collides(&second), backward.collides(&first));
        }
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn degenerate_box_collides_with_itself() {
        let mut index = CollisionIndex::new();
        let line = Placement::new(0.0, 0.0, 10.0, 0.0);
        index.insert(line);
        assert!(index.collides(&line));
    }

    #[test]
    fn around_collects_extent() {
        let placement = Placement::around([(3.0, 1.0), (-1.0, 4.0), (2.0, -2.0)]).unwrap();
        assert_eq!(placement, Placement::new(-1.0, -2.0, 3.0, 4.0));
        assert!(Placement::around(std::iter::empty()).is_none());
    }
}
