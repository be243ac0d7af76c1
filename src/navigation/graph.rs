//! # Navigation Graph
//!
//! World-space waypoints and the lattice sampler that places them.

use super::{LineOfSight, NavNode, NavNodeId, NavigationConfig, ObstacleLayer};
use crate::utils::{Bounds, GameRng, Vec2};
use crate::{LabyrinthError, LabyrinthResult};
use pathfinding::prelude::bfs_reach;
use serde::{Deserialize, Serialize};

/// Waypoints with directed connections.
///
/// Node ids are indices into the node list and stay stable for the lifetime
/// of the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationGraph {
    nodes: Vec<NavNode>,
}

impl NavigationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, position: Vec2) -> NavNodeId {
        let id = NavNodeId(self.nodes.len());
        self.nodes.push(NavNode::new(id, position));
        id
    }

    /// Adds a one-way connection. Connecting twice is a no-op.
    pub fn connect(&mut self, from: NavNodeId, to: NavNodeId) -> LabyrinthResult<()> {
        if from == to {
            return Err(LabyrinthError::InvalidGraph(format!("node {from} cannot connect to itself")));
        }
        if to.0 >= self.nodes.len() {
            return Err(LabyrinthError::InvalidGraph(format!("unknown node {to}")));
        }
        let node = self
            .nodes
            .get_mut(from.0)
            .ok_or_else(|| LabyrinthError::InvalidGraph(format!("unknown node {from}")))?;
        if !node.connections.contains(&to) {
            node.connections.push(to);
        }
        Ok(())
    }

    pub fn connect_mutual(&mut self, a: NavNodeId, b: NavNodeId) -> LabyrinthResult<()> {
        self.connect(a, b)?;
        self.connect(b, a)
    }

    /// Whether every connection has a matching reverse connection.
    pub fn is_mutual(&self) -> bool {
        self.nodes.iter().all(|node| {
            node.connections
                .iter()
                .all(|to| self.neighbors(*to).contains(&node.id))
        })
    }

    pub fn node(&self, id: NavNodeId) -> Option<&NavNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[NavNode] {
        &self.nodes
    }

    pub fn position(&self, id: NavNodeId) -> Option<Vec2> {
        self.node(id).map(|n| n.position)
    }

    /// Outgoing connections of a node. Unknown ids have none.
    pub fn neighbors(&self, id: NavNodeId) -> &[NavNodeId] {
        self.node(id).map(|n| n.connections.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NavNodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Number of directed connections.
    pub fn connection_count(&self) -> usize {
        self.nodes.iter().map(|n| n.connections.len()).sum()
    }

    /// The node closest to `position`. Ties go to the lower id.
    pub fn find_nearest_node(&self, position: Vec2) -> LabyrinthResult<NavNodeId> {
        let mut best: Option<(NavNodeId, f32)> = None;
        for node in &self.nodes {
            let d = node.position.distance_squared(position);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((node.id, d));
            }
        }
        best.map(|(id, _)| id).ok_or(LabyrinthError::NoNodeFound)
    }

    pub fn random_node(&self, rng: &mut GameRng) -> Option<NavNodeId> {
        rng.index(self.nodes.len()).map(NavNodeId)
    }

    /// Every node reachable from `start`, in breadth-first order.
    pub fn reachable_from(&self, start: NavNodeId) -> Vec<NavNodeId> {
        if !self.contains(start) {
            return Vec::new();
        }
        bfs_reach(start, |id| {
            self.neighbors(*id)
                .iter()
                .copied()
                .filter(|n| self.contains(*n))
        })
        .collect()
    }

    /// Sizes of the connected pieces of a mutual graph, largest first.
    pub fn component_sizes(&self) -> Vec<usize> {
        let mut seen = vec![false; self.nodes.len()];
        let mut sizes = Vec::new();
        for index in 0..self.nodes.len() {
            if seen[index] {
                continue;
            }
            let reached = self.reachable_from(NavNodeId(index));
            for id in &reached {
                seen[id.0] = true;
            }
            sizes.push(reached.len());
        }
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes
    }

    /// Checks ids and connections for consistency.
    pub fn validate(&self) -> LabyrinthResult<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            if node.id.0 != index {
                return Err(LabyrinthError::InvalidGraph(format!(
                    "node at index {index} carries id {}",
                    node.id
                )));
            }
            if !node.position.x.is_finite() || !node.position.y.is_finite() {
                return Err(LabyrinthError::InvalidGraph(format!("node {} has a non-finite position", node.id)));
            }
            for to in &node.connections {
                if !self.contains(*to) || *to == node.id {
                    return Err(LabyrinthError::InvalidGraph(format!(
                        "node {} connects to invalid node {to}",
                        node.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Samples a regular lattice over walkable regions and links neighbouring
/// samples.
///
/// Lattice points sit at `anchor + (i + 0.5, j + 0.5) * spacing` where the
/// anchor is the lower corner of all regions, so adjacent regions share one
/// lattice and their nodes line up across doorways.
#[derive(Debug, Clone)]
pub struct NodeGraphBuilder {
    pub spacing: f32,
    pub node_radius: f32,
    pub connect_diagonals: bool,
    pub check_sight: bool,
    pub layers: ObstacleLayer,
}

impl NodeGraphBuilder {
    pub fn from_config(config: &NavigationConfig) -> Self {
        Self {
            spacing: config.node_spacing,
            node_radius: config.node_radius,
            connect_diagonals: config.connect_diagonals,
            check_sight: config.check_connection_sight,
            layers: config.layers,
        }
    }

    pub fn build<S: LineOfSight>(&self, regions: &[Bounds], sight: &S) -> NavigationGraph {
        let mut graph = NavigationGraph::new();
        let Some(extent) = regions.iter().copied().reduce(|a, b| a.union(&b)) else {
            return graph;
        };
        if self.spacing <= 0.0 {
            return graph;
        }

        let anchor = extent.min;
        let size = extent.size();
        let columns = (size.x / self.spacing).ceil().max(0.0) as usize;
        let rows = (size.y / self.spacing).ceil().max(0.0) as usize;

        let mut lattice: Vec<Option<NavNodeId>> = vec![None; columns * rows];
        for j in 0..rows {
            for i in 0..columns {
                let point = anchor + Vec2::new((i as f32 + 0.5) * self.spacing, (j as f32 + 0.5) * self.spacing);
                if !regions.iter().any(|r| r.contains(point)) {
                    continue;
                }
                if sight.overlaps(point, self.node_radius, self.layers) {
                    continue;
                }
                lattice[j * columns + i] = Some(graph.add_node(point));
            }
        }

        let offsets: &[(i64, i64)] = if self.connect_diagonals {
            &[(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (-1, 1), (1, -1), (-1, -1)]
        } else {
            &[(1, 0), (-1, 0), (0, 1), (0, -1)]
        };

        for j in 0..rows {
            for i in 0..columns {
                let Some(from) = lattice[j * columns + i] else {
                    continue;
                };
                for (dx, dy) in offsets {
                    let (ni, nj) = (i as i64 + dx, j as i64 + dy);
                    if ni < 0 || nj < 0 || ni >= columns as i64 || nj >= rows as i64 {
                        continue;
                    }
                    let Some(to) = lattice[nj as usize * columns + ni as usize] else {
                        continue;
                    };
                    let (a, b) = (graph.nodes[from.0].position, graph.nodes[to.0].position);
                    if self.check_sight && !sight.can_see(a, b, self.layers) {
                        continue;
                    }
                    graph.nodes[from.0].connections.push(to);
                }
            }
        }

        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{ObstacleField, OpenSight};

    fn line_graph(count: usize) -> NavigationGraph {
        let mut graph = NavigationGraph::new();
        let ids: Vec<_> = (0..count).map(|i| graph.add_node(Vec2::new(i as f32, 0.0))).collect();
        for pair in ids.windows(2) {
            graph.connect_mutual(pair[0], pair[1]).unwrap();
        }
        graph
    }

    #[test]
    fn test_connect_rejects_unknown_nodes() {
        let mut graph = line_graph(2);
        assert!(graph.connect(NavNodeId(0), NavNodeId(7)).is_err());
        assert!(graph.connect(NavNodeId(7), NavNodeId(0)).is_err());
        assert!(graph.connect(NavNodeId(1), NavNodeId(1)).is_err());

        graph.connect(NavNodeId(0), NavNodeId(1)).unwrap();
        assert_eq!(graph.neighbors(NavNodeId(0)), &[NavNodeId(1)]);
    }

    #[test]
    fn test_one_way_connection_is_not_mutual() {
        let mut graph = line_graph(3);
        assert!(graph.is_mutual());
        let extra = graph.add_node(Vec2::new(5.0, 5.0));
        graph.connect(NavNodeId(0), extra).unwrap();
        assert!(!graph.is_mutual());
        assert_eq!(graph.reachable_from(extra), vec![extra]);
    }

    #[test]
    fn test_find_nearest_node() {
        let graph = line_graph(4);
        assert_eq!(graph.find_nearest_node(Vec2::new(2.2, 1.0)).unwrap(), NavNodeId(2));
        // Equidistant points resolve to the lower id.
        assert_eq!(graph.find_nearest_node(Vec2::new(1.5, 0.0)).unwrap(), NavNodeId(1));
        assert!(matches!(
            NavigationGraph::new().find_nearest_node(Vec2::ZERO),
            Err(LabyrinthError::NoNodeFound)
        ));
    }

    #[test]
    fn test_random_node_on_empty_graph() {
        let mut rng = GameRng::new(1);
        assert!(NavigationGraph::new().random_node(&mut rng).is_none());
        let graph = line_graph(3);
        for _ in 0..20 {
            assert!(graph.contains(graph.random_node(&mut rng).unwrap()));
        }
    }

    #[test]
    fn test_lattice_over_open_region() {
        let builder = NodeGraphBuilder::from_config(&NavigationConfig::default());
        let region = Bounds::from_corners(Vec2::ZERO, Vec2::new(4.0, 3.0));
        let graph = builder.build(&[region], &OpenSight);

        assert_eq!(graph.len(), 12);
        assert_eq!(graph.position(NavNodeId(0)), Some(Vec2::new(0.5, 0.5)));
        assert!(graph.is_mutual());
        // Corner nodes have 3 neighbours, the two inner nodes of the middle row have 8.
        assert_eq!(graph.neighbors(NavNodeId(0)).len(), 3);
        assert_eq!(graph.neighbors(NavNodeId(5)).len(), 8);
        assert_eq!(graph.component_sizes(), vec![12]);
    }

    #[test]
    fn test_lattice_without_diagonals() {
        let config = NavigationConfig {
            connect_diagonals: false,
            ..NavigationConfig::default()
        };
        let region = Bounds::from_corners(Vec2::ZERO, Vec2::new(4.0, 3.0));
        let graph = NodeGraphBuilder::from_config(&config).build(&[region], &OpenSight);
        assert_eq!(graph.neighbors(NavNodeId(5)).len(), 4);
        assert_eq!(graph.connection_count(), 2 * (3 * 3 + 4 * 2));
    }

    #[test]
    fn test_wall_splits_lattice() {
        let region = Bounds::from_corners(Vec2::ZERO, Vec2::new(6.0, 2.0));
        let mut field = ObstacleField::new();
        field.add_rect(
            Bounds::from_corners(Vec2::new(2.9, -1.0), Vec2::new(3.1, 3.0)),
            ObstacleLayer::WALLS,
        );
        let config = NavigationConfig {
            node_radius: 0.1,
            ..NavigationConfig::default()
        };
        let graph = NodeGraphBuilder::from_config(&config).build(&[region], &field);

        assert_eq!(graph.len(), 12);
        assert_eq!(graph.component_sizes(), vec![6, 6]);
    }

    #[test]
    fn test_rocks_remove_nodes_but_not_doorway_markers() {
        let region = Bounds::from_corners(Vec2::ZERO, Vec2::new(3.0, 3.0));
        let mut field = ObstacleField::new();
        field.add_circle(Vec2::new(1.5, 1.5), 0.3, ObstacleLayer::ROCKS);
        field.add_rect(
            Bounds::from_corners(Vec2::ZERO, Vec2::new(1.0, 1.0)),
            ObstacleLayer::DOORS,
        );
        let graph = NodeGraphBuilder::from_config(&NavigationConfig::default()).build(&[region], &field);
        assert_eq!(graph.len(), 8);
        let nearest = graph.find_nearest_node(Vec2::new(1.5, 1.5)).unwrap();
        assert_eq!(graph.position(nearest), Some(Vec2::new(1.5, 0.5)));
    }

    #[test]
    fn test_points_outside_regions_are_skipped() {
        let a = Bounds::from_corners(Vec2::ZERO, Vec2::new(2.0, 2.0));
        let b = Bounds::from_corners(Vec2::new(4.0, 4.0), Vec2::new(6.0, 6.0));
        let graph = NodeGraphBuilder::from_config(&NavigationConfig::default()).build(&[a, b], &OpenSight);
        assert_eq!(graph.len(), 8);
        assert_eq!(graph.component_sizes(), vec![4, 4]);
    }

    #[test]
    fn test_validate_catches_dangling_connection() {
        let mut graph = line_graph(2);
        assert!(graph.validate().is_ok());
        graph.nodes[1].connections.push(NavNodeId(9));
        assert!(matches!(graph.validate(), Err(LabyrinthError::InvalidGraph(_))));
    }

    #[test]
    fn test_reachability_ignores_dangling_connections() {
        let mut graph = line_graph(3);
        graph.nodes[1].connections.push(NavNodeId(9));
        graph.nodes[2].connections.push(NavNodeId(2));

        let reached = graph.reachable_from(NavNodeId(0));
        assert_eq!(reached, vec![NavNodeId(0), NavNodeId(1), NavNodeId(2)]);
        assert_eq!(graph.component_sizes(), vec![3]);
    }
}
