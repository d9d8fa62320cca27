//! Join graph - tables as nodes, equi-join predicates as undirected edges.
//!
//! Built from a relationship profile or from `x_id` naming conventions in a
//! schema, and used to find the JOIN chain between two tables or to join
//! every table reachable from a root.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::schema::Schema;
use crate::sql::{ColumnRef, Join};

/// Predicate columns of an edge. `left_*` belongs to the node the edge was
/// added from.
#[derive(Debug, Clone)]
struct EdgeData {
    left_table: String,
    left_column: String,
    right_column: String,
}

/// One JOIN in a chain: `JOIN to_table ON from_table.from_column = to_table.to_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl JoinStep {
    pub fn new(from_table: &str, from_column: &str, to_table: &str, to_column: &str) -> Self {
        Self {
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
        }
    }

    /// This step with the schema's spelling of tables and columns. `None`
    /// if any part of it is missing from the schema.
    pub fn resolve(&self, schema: &Schema) -> Option<JoinStep> {
        let from = schema.table(&self.from_table)?;
        let to = schema.table(&self.to_table)?;
        Some(JoinStep::new(
            &from.name,
            from.column(&self.from_column)?,
            &to.name,
            to.column(&self.to_column)?,
        ))
    }

    /// The inner JOIN clause for this step.
    pub fn to_join(&self) -> Join {
        Join::inner(
            &self.to_table,
            ColumnRef::qualified(&self.from_table, &self.from_column),
            ColumnRef::qualified(&self.to_table, &self.to_column),
        )
    }
}

/// Parent pointer for path reconstruction.
struct ParentInfo {
    parent: NodeIndex,
    edge_idx: EdgeIndex,
}

/// Undirected graph of joinable tables.
#[derive(Debug, Clone, Default)]
pub struct JoinGraph {
    graph: UnGraph<String, EdgeData>,
    /// Lowercased table name to node.
    node_indices: HashMap<String, NodeIndex>,
}

impl JoinGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, table: &str) -> NodeIndex {
        let key = table.to_lowercase();
        if let Some(idx) = self.node_indices.get(&key) {
            return *idx;
        }
        let idx = self.graph.add_node(table.to_string());
        self.node_indices.insert(key, idx);
        idx
    }

    /// Add `left_table.left_column = right_table.right_column`.
    pub fn add_edge(
        &mut self,
        left_table: &str,
        left_column: &str,
        right_table: &str,
        right_column: &str,
    ) {
        let left = self.node(left_table);
        let right = self.node(right_table);
        if left == right {
            return;
        }
        let left_table = self.graph[left].clone();
        self.graph.add_edge(
            left,
            right,
            EdgeData {
                left_table,
                left_column: left_column.into(),
                right_column: right_column.into(),
            },
        );
    }

    pub fn contains(&self, table: &str) -> bool {
        self.node_indices.contains_key(&table.to_lowercase())
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Declared spelling of a table in the graph.
    pub fn table_name(&self, table: &str) -> Option<&str> {
        self.node_indices
            .get(&table.to_lowercase())
            .map(|idx| self.graph[*idx].as_str())
    }

    /// Neighbours of a node in edge insertion order, so traversal is
    /// deterministic.
    fn neighbours(&self, node: NodeIndex) -> Vec<(NodeIndex, EdgeIndex)> {
        let mut edges: Vec<(NodeIndex, EdgeIndex)> = self
            .graph
            .edges(node)
            .map(|e| {
                let other = if e.source() == node { e.target() } else { e.source() };
                (other, e.id())
            })
            .collect();
        edges.sort_by_key(|(_, edge)| edge.index());
        edges
    }

    /// Orient an edge so it reads from `from` to the other endpoint.
    fn step(&self, from: NodeIndex, to: NodeIndex, edge: EdgeIndex) -> JoinStep {
        let data = &self.graph[edge];
        let from_name = &self.graph[from];
        let to_name = &self.graph[to];
        if data.left_table == *from_name {
            JoinStep::new(from_name, &data.left_column, to_name, &data.right_column)
        } else {
            JoinStep::new(from_name, &data.right_column, to_name, &data.left_column)
        }
    }

    /// Shortest JOIN chain from `from` to `to` (BFS). `None` if either table
    /// is unknown or they are not connected; empty if they are the same.
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<JoinStep>> {
        let from_idx = *self.node_indices.get(&from.to_lowercase())?;
        let to_idx = *self.node_indices.get(&to.to_lowercase())?;
        if from_idx == to_idx {
            return Some(Vec::new());
        }

        let mut visited: HashSet<NodeIndex> = HashSet::from([from_idx]);
        let mut parents: HashMap<NodeIndex, ParentInfo> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::from([from_idx]);

        while let Some(current) = queue.pop_front() {
            for (neighbour, edge_idx) in self.neighbours(current) {
                if !visited.insert(neighbour) {
                    continue;
                }
                parents.insert(
                    neighbour,
                    ParentInfo {
                        parent: current,
                        edge_idx,
                    },
                );
                if neighbour == to_idx {
                    return Some(self.reconstruct_path(from_idx, to_idx, &parents));
                }
                queue.push_back(neighbour);
            }
        }

        None
    }

    fn reconstruct_path(
        &self,
        from_idx: NodeIndex,
        to_idx: NodeIndex,
        parents: &HashMap<NodeIndex, ParentInfo>,
    ) -> Vec<JoinStep> {
        let mut steps = Vec::new();
        let mut current = to_idx;
        while current != from_idx {
            let info = &parents[&current];
            steps.push(self.step(info.parent, current, info.edge_idx));
            current = info.parent;
        }
        steps.reverse();
        steps
    }

    /// JOIN steps reaching every table connected to `root`, in BFS order.
    /// Tables in `skip` count as already joined and are not re-joined, but
    /// traversal continues through them.
    pub fn spanning_joins(&self, root: &str, skip: &[&str]) -> Vec<JoinStep> {
        let Some(&root_idx) = self.node_indices.get(&root.to_lowercase()) else {
            return Vec::new();
        };

        let mut steps = Vec::new();
        let mut visited: HashSet<NodeIndex> = HashSet::from([root_idx]);
        let mut queue: VecDeque<NodeIndex> = VecDeque::from([root_idx]);

        while let Some(current) = queue.pop_front() {
            for (neighbour, edge_idx) in self.neighbours(current) {
                if !visited.insert(neighbour) {
                    continue;
                }
                let name = &self.graph[neighbour];
                if !skip.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                    steps.push(self.step(current, neighbour, edge_idx));
                }
                queue.push_back(neighbour);
            }
        }

        steps
    }
}
