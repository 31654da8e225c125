// Mass-aggregating quadtree backed by a single growable node pool.
//
// Nodes refer to each other by pool index, never by reference, so growing the
// pool does not invalidate anything a caller holds.

use super::entity::EntityKey;

/// Pool growth factor once every preallocated node is in use.
const EXTRA_QUAD_ALLOCATION: f64 = 1.5;
const INITIAL_QUADS: usize = 64;
/// Coincident entities stop splitting here and share the node.
const MAX_DEPTH: u8 = 48;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadItem {
    pub key: EntityKey,
    pub x: f64,
    pub y: f64,
    pub mass: f64,
}

#[derive(Debug, Clone)]
pub struct Quad {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    /// Sum of the masses of every item in this subtree.
    pub mass: f64,
    moment_x: f64,
    moment_y: f64,
    entity: Option<QuadItem>,
    stacked: Vec<QuadItem>,
    used: bool,
    depth: u8,
    children: [Option<u32>; 4],
}

impl Quad {
    fn new(x: f64, y: f64, size: f64, depth: u8) -> Self {
        Self {
            x,
            y,
            size,
            mass: 0.0,
            moment_x: 0.0,
            moment_y: 0.0,
            entity: None,
            stacked: Vec::new(),
            used: false,
            depth,
            children: [None; 4],
        }
    }

    /// Items held directly by this node (not by its children).
    pub fn items(&self) -> impl Iterator<Item = &QuadItem> {
        self.entity.iter().chain(self.stacked.iter())
    }

    pub fn children(&self) -> impl Iterator<Item = usize> + '_ {
        self.children.iter().flatten().map(|&idx| idx as usize)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Mass-weighted centre of the subtree, if it holds any mass.
    pub fn center_of_mass(&self) -> Option<(f64, f64)> {
        (self.mass > 0.0).then(|| (self.moment_x / self.mass, self.moment_y / self.mass))
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.size && y >= self.y && y <= self.y + self.size
    }

    fn quadrant(&self, x: f64, y: f64) -> usize {
        let half = self.size * 0.5;
        usize::from(x > self.x + half) + 2 * usize::from(y > self.y + half)
    }

    fn accumulate(&mut self, item: &QuadItem) {
        self.mass += item.mass;
        self.moment_x += item.mass * item.x;
        self.moment_y += item.mass * item.y;
    }
}

#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<Quad>,
}

impl QuadTree {
    /// Creates an empty tree whose root covers the square `[x, x+size] x [y, y+size]`.
    pub fn new(x: f64, y: f64, size: f64) -> Self {
        let mut nodes = Vec::with_capacity(INITIAL_QUADS);
        nodes.push(Quad::new(x, y, size, 0));
        Self { nodes }
    }

    /// Creates a tree whose root square encloses every given item.
    pub fn enclosing(items: &[QuadItem]) -> Self {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for item in items {
            min_x = min_x.min(item.x);
            min_y = min_y.min(item.y);
            max_x = max_x.max(item.x);
            max_y = max_y.max(item.y);
        }
        if items.is_empty() {
            return Self::new(0.0, 0.0, 1.0);
        }
        let size = (max_x - min_x).max(max_y - min_y).max(1.0);
        let mut tree = Self::new(min_x, min_y, size);
        for item in items {
            tree.put(*item);
        }
        tree
    }

    pub fn root(&self) -> &Quad {
        &self.nodes[0]
    }

    pub fn node(&self, idx: usize) -> &Quad {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[Quad] {
        &self.nodes
    }

    /// Inserts an item, adding its mass to every node on its path.
    pub fn put(&mut self, item: QuadItem) {
        self.put_at(0, item);
    }

    fn put_at(&mut self, idx: usize, item: QuadItem) {
        self.nodes[idx].accumulate(&item);
        let node = &mut self.nodes[idx];
        if !node.used {
            node.entity = Some(item);
            node.used = true;
            return;
        }
        if node.depth >= MAX_DEPTH {
            node.stacked.push(item);
            return;
        }

        let previous = node.entity.take();
        let at = node.quadrant(item.x, item.y);
        let child = self.child(idx, at);
        self.put_at(child, item);
        if let Some(previous) = previous {
            let at = self.nodes[idx].quadrant(previous.x, previous.y);
            let child = self.child(idx, at);
            self.put_at(child, previous);
        }
    }

    /// Returns the child in quadrant `at`, materialising it on first use.
    fn child(&mut self, idx: usize, at: usize) -> usize {
        if let Some(existing) = self.nodes[idx].children[at] {
            return existing as usize;
        }
        if self.nodes.len() == self.nodes.capacity() {
            let extra = (self.nodes.capacity() as f64 * (EXTRA_QUAD_ALLOCATION - 1.0)).ceil();
            self.nodes.reserve_exact((extra as usize).max(4));
        }

        let parent = &self.nodes[idx];
        let half = parent.size * 0.5;
        let x = if at == 1 || at == 3 { parent.x + half } else { parent.x };
        let y = if at > 1 { parent.y + half } else { parent.y };
        let depth = parent.depth + 1;

        let new_idx = self.nodes.len();
        self.nodes.push(Quad::new(x, y, half, depth));
        self.nodes[idx].children[at] = Some(new_idx as u32);
        new_idx
    }

    /// Barnes-Hut approximation of the gravitational acceleration at `(x, y)`,
    /// ignoring the item `exclude`. A node is treated as a point mass when
    /// `size / distance < theta` and the query point lies outside it.
    pub fn acceleration_at(
        &self,
        x: f64,
        y: f64,
        exclude: EntityKey,
        gravity: f64,
        theta: f64,
    ) -> (f64, f64) {
        let mut ax = 0.0;
        let mut ay = 0.0;
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if node.mass <= 0.0 {
                continue;
            }
            if node.is_leaf() {
                for item in node.items().filter(|item| item.key != exclude) {
                    let (dx, dy) = pull(x, y, item.x, item.y, item.mass, gravity);
                    ax += dx;
                    ay += dy;
                }
                continue;
            }
            if let Some((cx, cy)) = node.center_of_mass() {
                let dist = ((cx - x).powi(2) + (cy - y).powi(2)).sqrt();
                if !node.contains(x, y) && dist > 0.0 && node.size / dist < theta {
                    let (dx, dy) = pull(x, y, cx, cy, node.mass, gravity);
                    ax += dx;
                    ay += dy;
                    continue;
                }
            }
            for item in node.items().filter(|item| item.key != exclude) {
                let (dx, dy) = pull(x, y, item.x, item.y, item.mass, gravity);
                ax += dx;
                ay += dy;
            }
            stack.extend(node.children());
        }
        (ax, ay)
    }
}

fn pull(x: f64, y: f64, sx: f64, sy: f64, mass: f64, gravity: f64) -> (f64, f64) {
    let dx = sx - x;
    let dy = sy - y;
    let dist2 = dx * dx + dy * dy;
    if dist2 <= 0.0 {
        return (0.0, 0.0);
    }
    let factor = gravity * mass / (dist2 * dist2.sqrt());
    (dx * factor, dy * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use slotmap::SlotMap;

    fn subtree_mass(tree: &QuadTree, idx: usize) -> f64 {
        let node = tree.node(idx);
        let own: f64 = node.items().map(|item| item.mass).sum();
        own + node.children().map(|child| subtree_mass(tree, child)).sum::<f64>()
    }

    fn items(count: usize, seed: u64) -> Vec<QuadItem> {
        let mut keys: SlotMap<EntityKey, ()> = SlotMap::with_key();
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| QuadItem {
                key: keys.insert(()),
                x: rng.random_range(0.0..1000.0),
                y: rng.random_range(0.0..1000.0),
                mass: rng.random_range(1.0..50.0),
            })
            .collect()
    }

    #[test]
    fn aggregate_mass_matches_subtree_after_every_put() {
        let mut tree = QuadTree::new(0.0, 0.0, 1000.0);
        for item in items(300, 11) {
            tree.put(item);
            for idx in 0..tree.nodes().len() {
                assert_relative_eq!(
                    tree.node(idx).mass,
                    subtree_mass(&tree, idx),
                    max_relative = 1e-9
                );
            }
        }
        // Pool grew well past its initial allocation without losing nodes.
        assert!(tree.nodes().len() > INITIAL_QUADS);
    }

    #[test]
    fn coincident_items_share_a_node_instead_of_recursing_forever() {
        let mut keys: SlotMap<EntityKey, ()> = SlotMap::with_key();
        let mut tree = QuadTree::new(0.0, 0.0, 100.0);
        for _ in 0..3 {
            tree.put(QuadItem {
                key: keys.insert(()),
                x: 25.0,
                y: 25.0,
                mass: 2.0,
            });
        }
        assert_relative_eq!(tree.root().mass, 6.0);
        assert_relative_eq!(subtree_mass(&tree, 0), 6.0);
    }

    #[test]
    fn barnes_hut_matches_direct_sum_for_distant_probe() {
        let sources = items(200, 5);
        let tree = QuadTree::enclosing(&sources);
        let mut keys: SlotMap<EntityKey, ()> = SlotMap::with_key();
        let probe = keys.insert(());
        let (px, py) = (20_000.0, -15_000.0);

        let (mut dx, mut dy) = (0.0, 0.0);
        for s in &sources {
            let (ax, ay) = pull(px, py, s.x, s.y, s.mass, 50.0);
            dx += ax;
            dy += ay;
        }
        let (bx, by) = tree.acceleration_at(px, py, probe, 50.0, 0.5);
        assert_relative_eq!(bx, dx, max_relative = 1e-2);
        assert_relative_eq!(by, dy, max_relative = 1e-2);
        // theta = 0 degenerates to exact summation.
        let (ex, ey) = tree.acceleration_at(px, py, probe, 50.0, 0.0);
        assert_relative_eq!(ex, dx, max_relative = 1e-9);
        assert_relative_eq!(ey, dy, max_relative = 1e-9);
    }
}
