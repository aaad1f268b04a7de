//! Barnes-Hut quadtree for approximating the all-pairs repulsion force.

use glam::Vec2;

/// Subdivision stops at this depth; coincident bodies are merged instead.
const MAX_DEPTH: usize = 16;

/// Axis-aligned bounding box given by center point and side lengths.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoundingBox2D {
    pub center: Vec2,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox2D {
    pub fn new(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            center,
            width,
            height,
        }
    }

    /// Index of the quadrant containing `point`: 0 = NE, 1 = NW, 2 = SW, 3 = SE.
    fn quadrant(&self, point: Vec2) -> usize {
        match (point.x >= self.center.x, point.y >= self.center.y) {
            (true, true) => 0,
            (false, true) => 1,
            (false, false) => 2,
            (true, false) => 3,
        }
    }

    fn child(&self, quadrant: usize) -> BoundingBox2D {
        let (w, h) = (self.width / 2.0, self.height / 2.0);
        let offset = match quadrant {
            0 => Vec2::new(w, h),
            1 => Vec2::new(-w, h),
            2 => Vec2::new(-w, -h),
            _ => Vec2::new(w, -h),
        } / 2.0;
        BoundingBox2D::new(self.center + offset, w, h)
    }
}

/// A body, or an aggregate of faraway bodies, as seen by the force
/// calculation.
#[derive(Clone, Copy, Debug)]
pub struct NodeApproximation {
    position: Vec2,
    mass: f32,
}

impl NodeApproximation {
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }
}

struct Cell {
    boundary: BoundingBox2D,
    /// Sum of `position * mass` over all bodies below this cell.
    weighted_position: Vec2,
    mass: f32,
    children: [Option<usize>; 4],
    body: Option<(Vec2, f32)>,
}

impl Cell {
    fn empty(boundary: BoundingBox2D) -> Self {
        Self {
            boundary,
            weighted_position: Vec2::ZERO,
            mass: 0.0,
            children: [None; 4],
            body: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
}

/// Spatial index over node positions and masses, rebuilt every step.
#[derive(Default)]
pub struct QuadTree {
    cells: Vec<Cell>,
}

impl QuadTree {
    /// An empty tree covering `boundary`, sized for `capacity` bodies.
    pub fn with_capacity(boundary: BoundingBox2D, capacity: usize) -> Self {
        let mut cells = Vec::with_capacity(capacity * 2 + 1);
        cells.push(Cell::empty(boundary));
        Self { cells }
    }

    pub fn insert(&mut self, position: Vec2, mass: f32) {
        if self.cells.is_empty() {
            return;
        }
        let mut idx = 0;
        let mut depth = 0;
        loop {
            // Aggregates are updated exactly once per visited cell.
            self.cells[idx].weighted_position += position * mass;
            self.cells[idx].mass += mass;

            loop {
                if !self.cells[idx].is_leaf() {
                    idx = self.child_of(idx, position);
                    depth += 1;
                    break;
                }
                match self.cells[idx].body {
                    None => {
                        self.cells[idx].body = Some((position, mass));
                        return;
                    }
                    Some((other_pos, other_mass)) => {
                        if depth >= MAX_DEPTH || self.cells[idx].boundary.width <= f32::EPSILON {
                            // Coincident or too deep: merge into one body.
                            self.cells[idx].body = Some((other_pos, other_mass + mass));
                            return;
                        }
                        // Split: push the resident body one level down,
                        // then keep descending with the new one.
                        self.cells[idx].body = None;
                        let child = self.child_of(idx, other_pos);
                        let cell = &mut self.cells[child];
                        cell.weighted_position += other_pos * other_mass;
                        cell.mass += other_mass;
                        cell.body = Some((other_pos, other_mass));
                    }
                }
            }
        }
    }

    /// Collects the bodies and aggregates acting on `position`.
    ///
    /// `theta` trades accuracy for speed: a cell whose extent-to-distance
    /// ratio is below `theta` is folded into a single approximation.
    /// `theta == 0.0` descends to every individual body.
    pub fn stack(&self, position: &Vec2, theta: f32) -> Vec<NodeApproximation> {
        let mut out = Vec::new();
        if self.cells.is_empty() || self.cells[0].mass == 0.0 {
            return out;
        }
        let mut pending = vec![0usize];
        while let Some(idx) = pending.pop() {
            let cell = &self.cells[idx];
            if cell.is_leaf() {
                if let Some((pos, mass)) = cell.body {
                    out.push(NodeApproximation {
                        position: pos,
                        mass,
                    });
                }
                continue;
            }
            let center_of_mass = cell.weighted_position / cell.mass;
            let extent = cell.boundary.width.max(cell.boundary.height);
            let distance = center_of_mass.distance(*position);
            if distance > 0.0 && extent / distance < theta {
                out.push(NodeApproximation {
                    position: center_of_mass,
                    mass: cell.mass,
                });
            } else {
                pending.extend(cell.children.iter().flatten().copied());
            }
        }
        out
    }

    /// Child cell of `idx` covering `position`, created on demand.
    fn child_of(&mut self, idx: usize, position: Vec2) -> usize {
        let quadrant = self.cells[idx].boundary.quadrant(position);
        if let Some(child) = self.cells[idx].children[quadrant] {
            return child;
        }
        let boundary = self.cells[idx].boundary.child(quadrant);
        self.cells.push(Cell::empty(boundary));
        let child = self.cells.len() - 1;
        self.cells[idx].children[quadrant] = Some(child);
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with(bodies: &[(Vec2, f32)]) -> QuadTree {
        let mut tree = QuadTree::with_capacity(
            BoundingBox2D::new(Vec2::ZERO, 200.0, 200.0),
            bodies.len(),
        );
        for (pos, mass) in bodies {
            tree.insert(*pos, *mass);
        }
        tree
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let tree = QuadTree::default();
        assert!(tree.stack(&Vec2::ZERO, 0.75).is_empty());
    }

    #[test]
    fn zero_theta_descends_to_every_body() {
        let bodies = [
            (Vec2::new(-50.0, -50.0), 1.0),
            (Vec2::new(50.0, -50.0), 2.0),
            (Vec2::new(0.0, 60.0), 1.5),
        ];
        let tree = tree_with(&bodies);
        let stack = tree.stack(&Vec2::new(-50.0, -50.0), 0.0);
        assert_eq!(stack.len(), bodies.len());
        let total: f32 = stack.iter().map(|a| a.mass()).sum();
        assert!((total - 4.5).abs() < 1e-6);
    }

    #[test]
    fn high_theta_aggregates_distant_cluster() {
        let mut bodies = vec![(Vec2::new(-90.0, -90.0), 1.0)];
        // A tight cluster far away from the probe.
        for i in 0..4 {
            bodies.push((Vec2::new(80.0 + i as f32, 80.0), 1.0));
        }
        let tree = tree_with(&bodies);
        let stack = tree.stack(&Vec2::new(-90.0, -90.0), 0.9);
        assert!(stack.len() < bodies.len());
        let total: f32 = stack.iter().map(|a| a.mass()).sum();
        assert!((total - 5.0).abs() < 1e-6);
    }

    #[test]
    fn coincident_bodies_merge_instead_of_recursing() {
        let bodies = [(Vec2::new(10.0, 10.0), 1.0); 8];
        let tree = tree_with(&bodies);
        let stack = tree.stack(&Vec2::ZERO, 0.0);
        let total: f32 = stack.iter().map(|a| a.mass()).sum();
        assert!((total - 8.0).abs() < 1e-6);
    }
}
