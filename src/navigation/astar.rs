//! # A* Path Planning
//!
//! Shortest paths over a [`NavigationGraph`].
//!
//! Every query allocates its own score table indexed by node id, so nothing
//! from a previous query can leak into the next one. The open set is a plain
//! list scanned for the lowest `g + h`; on equal scores the node that entered
//! the list first wins, which keeps path choice stable for a given graph.

use super::{NavNodeId, NavigationGraph, NavigationPath, PathNode};
use crate::{LabyrinthError, LabyrinthResult};

/// Scratch record for one node during one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeScore {
    /// Cost of the best known route from the start
    pub g: f32,
    /// Straight-line estimate to the goal, refreshed whenever `g` improves
    pub h: f32,
    /// Predecessor on the best known route
    pub came_from: Option<NavNodeId>,
}

impl NodeScore {
    /// The state every node starts a query in.
    pub const UNVISITED: NodeScore = NodeScore {
        g: f32::INFINITY,
        h: 0.0,
        came_from: None,
    };

    pub fn f(&self) -> f32 {
        self.g + self.h
    }

    pub fn is_unvisited(&self) -> bool {
        *self == Self::UNVISITED
    }
}

/// What a single search did, for callers that want more than the path.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Node ids from start to goal inclusive
    pub route: Vec<NavNodeId>,
    /// Total edge length of the route
    pub cost: f32,
    /// Nodes taken off the open set
    pub expansions: usize,
    /// Final score table, indexed by node id
    pub scores: Vec<NodeScore>,
}

/// A* search with a bound on expansions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPlanner {
    max_expansions: usize,
}

impl Default for PathPlanner {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_EXPANSIONS)
    }
}

impl PathPlanner {
    pub fn new(max_expansions: usize) -> Self {
        Self {
            max_expansions: max_expansions.max(1),
        }
    }

    pub fn max_expansions(&self) -> usize {
        self.max_expansions
    }

    /// Shortest path from `start` to `goal`.
    ///
    /// With `skip_first_node` the start node is left off the result, for
    /// agents already standing on it.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::{NavigationGraph, PathPlanner, Vec2};
    ///
    /// let mut graph = NavigationGraph::new();
    /// let a = graph.add_node(Vec2::new(0.0, 0.0));
    /// let b = graph.add_node(Vec2::new(1.0, 0.0));
    /// graph.connect_mutual(a, b).unwrap();
    ///
    /// let path = PathPlanner::default().generate_path(&graph, a, b, true).unwrap();
    /// assert_eq!(path.node_ids(), vec![b]);
    /// ```
    pub fn generate_path(
        &self,
        graph: &NavigationGraph,
        start: NavNodeId,
        goal: NavNodeId,
        skip_first_node: bool,
    ) -> LabyrinthResult<NavigationPath> {
        let report = self.search(graph, start, goal)?;
        let skip = usize::from(skip_first_node);
        let nodes = report.route.iter().skip(skip).filter_map(|id| {
            graph.position(*id).map(|position| PathNode { id: *id, position })
        });
        Ok(NavigationPath::from_nodes(nodes))
    }

    /// Runs the search and returns the route with its bookkeeping.
    pub fn search(&self, graph: &NavigationGraph, start: NavNodeId, goal: NavNodeId) -> LabyrinthResult<SearchReport> {
        let (Some(start_pos), Some(goal_pos)) = (graph.position(start), graph.position(goal)) else {
            return Err(LabyrinthError::NoNodeFound);
        };

        let mut scores = vec![NodeScore::UNVISITED; graph.len()];
        let mut closed = vec![false; graph.len()];
        let mut in_open = vec![false; graph.len()];
        let mut open: Vec<NavNodeId> = vec![start];
        in_open[start.0] = true;
        scores[start.0] = NodeScore {
            g: 0.0,
            h: start_pos.distance(goal_pos),
            came_from: None,
        };

        let mut expansions = 0;
        while !open.is_empty() {
            let mut best = 0;
            for (slot, id) in open.iter().enumerate().skip(1) {
                if scores[id.0].f() < scores[open[best].0].f() {
                    best = slot;
                }
            }
            let current = open.remove(best);
            in_open[current.0] = false;

            if current == goal {
                let route = reconstruct(&scores, goal);
                log::trace!("A* {start} -> {goal}: {} nodes after {expansions} expansions", route.len());
                return Ok(SearchReport {
                    cost: scores[goal.0].g,
                    route,
                    expansions,
                    scores,
                });
            }

            if expansions >= self.max_expansions {
                log::debug!("A* {start} -> {goal} gave up after {expansions} expansions");
                return Err(LabyrinthError::SearchLimitReached { expansions });
            }
            expansions += 1;
            closed[current.0] = true;

            let Some(current_pos) = graph.position(current) else {
                continue;
            };
            let current_g = scores[current.0].g;
            for &neighbor in graph.neighbors(current) {
                // Connections to missing nodes only exist in unvalidated graphs.
                let Some(neighbor_pos) = graph.position(neighbor) else {
                    continue;
                };
                if closed[neighbor.0] {
                    continue;
                }
                let tentative = current_g + current_pos.distance(neighbor_pos);
                if tentative < scores[neighbor.0].g {
                    scores[neighbor.0] = NodeScore {
                        g: tentative,
                        h: neighbor_pos.distance(goal_pos),
                        came_from: Some(current),
                    };
                    if !in_open[neighbor.0] {
                        in_open[neighbor.0] = true;
                        open.push(neighbor);
                    }
                }
            }
        }

        Err(LabyrinthError::PathNotFound { start, goal })
    }
}

fn reconstruct(scores: &[NodeScore], goal: NavNodeId) -> Vec<NavNodeId> {
    let mut route = vec![goal];
    let mut cursor = goal;
    while let Some(previous) = scores[cursor.0].came_from {
        route.push(previous);
        cursor = previous;
    }
    route.reverse();
    route
}
