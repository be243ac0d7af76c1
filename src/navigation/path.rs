//! # Navigation Paths
//!
//! The node sequence an agent is currently following.

use super::{LineOfSight, NavNodeId, ObstacleLayer};
use crate::utils::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One waypoint of a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    pub id: NavNodeId,
    pub position: Vec2,
}

/// Ordered waypoints from near the agent to near its destination.
///
/// Paths belong to a single agent and are consumed from the front as the
/// agent reaches each node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationPath {
    nodes: VecDeque<PathNode>,
}

impl NavigationPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = PathNode>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn front(&self) -> Option<&PathNode> {
        self.nodes.front()
    }

    pub fn back(&self) -> Option<&PathNode> {
        self.nodes.back()
    }

    pub fn pop_front(&mut self) -> Option<PathNode> {
        self.nodes.pop_front()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathNode> {
        self.nodes.iter()
    }

    pub fn node_ids(&self) -> Vec<NavNodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    /// Sum of the segment lengths between consecutive nodes.
    pub fn length(&self) -> f32 {
        self.nodes
            .iter()
            .zip(self.nodes.iter().skip(1))
            .map(|(a, b)| a.position.distance(b.position))
            .sum()
    }

    /// Folds a freshly planned path into this one.
    ///
    /// The nodes both paths agree on are kept and everything after the first
    /// disagreement is replaced by the rest of `other`. An empty `other`
    /// leaves the path alone. Returns the number of nodes kept from the old
    /// path.
    pub fn merge_with(&mut self, other: &NavigationPath) -> usize {
        if other.is_empty() {
            return self.len();
        }
        let shared = self
            .nodes
            .iter()
            .zip(other.nodes.iter())
            .take_while(|(a, b)| a.id == b.id)
            .count();
        self.nodes.truncate(shared);
        self.nodes.extend(other.nodes.iter().skip(shared).copied());
        shared
    }

    /// Drops every node before the last one visible from `origin`.
    ///
    /// Returns how many nodes were dropped. Nothing changes when no node is
    /// visible.
    pub fn trim_to_furthest_visible<S: LineOfSight>(
        &mut self,
        origin: Vec2,
        sight: &S,
        half_width: f32,
        layers: ObstacleLayer,
    ) -> usize {
        let furthest = self
            .nodes
            .iter()
            .rposition(|n| sight.has_clearance(origin, n.position, half_width, layers));
        match furthest {
            Some(index) => {
                self.nodes.drain(..index);
                index
            }
            None => 0,
        }
    }

    /// Drops nodes from the front until the head is visible from `origin`.
    ///
    /// Returns the number dropped, or `None` if no node is visible, in which
    /// case the path is left as it was.
    pub fn skip_to_first_visible<S: LineOfSight>(
        &mut self,
        origin: Vec2,
        sight: &S,
        half_width: f32,
        layers: ObstacleLayer,
    ) -> Option<usize> {
        let first = self
            .nodes
            .iter()
            .position(|n| sight.has_clearance(origin, n.position, half_width, layers))?;
        self.nodes.drain(..first);
        Some(first)
    }
}
