use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::geom::Vec2;

mod normalize;

pub use normalize::normalize;

/// One vertex of the input graph. `selectable` separates the two node
/// classes: phenotype codes the user can pick, and case nodes that are
/// render-only. Positions are absent until the simulation has run at least
/// one tick.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: String,
    pub name: Option<String>,
    pub selectable: bool,
    pub pos: Option<Vec2>,
    pub fixed_x: Option<f32>,
    pub fixed_y: Option<f32>,
    pub log_or: Option<f64>,
    pub log_pval: Option<f64>,
    pub metadata: Map<String, Value>,
}

impl Node {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Edge endpoints are resolved to node indices when the snapshot is built;
/// everything downstream works with coordinates, never raw ids.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub weight: Option<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    index_by_id: HashMap<String, usize>,
}

impl GraphSnapshot {
    pub(crate) fn assemble(nodes: Vec<Node>, edges: Vec<Edge>, index_by_id: HashMap<String, usize>) -> Self {
        Self {
            nodes,
            edges,
            index_by_id,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn id_set(&self) -> BTreeSet<String> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }

    /// Two render calls carry the same dataset iff their id sets are equal.
    /// An unchanged dataset must not relaunch the simulation.
    pub fn same_ids(&self, other_ids: &BTreeSet<String>) -> bool {
        self.nodes.len() == other_ids.len() && self.nodes.iter().all(|node| other_ids.contains(&node.id))
    }

    pub fn scalars(&self) -> HashMap<String, f64> {
        self.nodes
            .iter()
            .filter_map(|node| node.log_or.map(|value| (node.id.clone(), value)))
            .collect()
    }

    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let Some(index) = self.index_of(id) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for edge in &self.edges {
            if edge.source == index {
                found.push(self.nodes[edge.target].display_name());
            } else if edge.target == index {
                found.push(self.nodes[edge.source].display_name());
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Case nodes connected to every code in `pattern`. Codes are matched by
    /// display name, the way selections travel back to the host.
    pub fn cases_matching_pattern(&self, pattern: &[String]) -> Vec<String> {
        if pattern.is_empty() {
            return Vec::new();
        }

        let mut code_neighbors: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); self.nodes.len()];
        for edge in &self.edges {
            let (a, b) = (edge.source, edge.target);
            if self.nodes[a].selectable && !self.nodes[b].selectable {
                code_neighbors[b].insert(self.nodes[a].display_name());
            } else if self.nodes[b].selectable && !self.nodes[a].selectable {
                code_neighbors[a].insert(self.nodes[b].display_name());
            }
        }

        self.nodes
            .iter()
            .enumerate()
            .filter(|(index, node)| {
                !node.selectable
                    && pattern
                        .iter()
                        .all(|code| code_neighbors[*index].contains(code.as_str()))
            })
            .map(|(_, node)| node.display_name().to_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bipartite_fixture() -> GraphSnapshot {
        normalize(&json!({
            "nodes": [
                {"id": "c1", "name": "401.22", "selectable": true},
                {"id": "c2", "name": "411.00", "selectable": true},
                {"id": "p1", "name": "case-1"},
                {"id": "p2", "name": "case-2"},
            ],
            "links": [
                {"source": "p1", "target": "c1"},
                {"source": "p1", "target": "c2"},
                {"source": "p2", "target": "c1"},
            ],
        }))
        .expect("fixture parses")
    }

    #[test]
    fn same_ids_ignores_order() {
        let graph = bipartite_fixture();
        let ids = ["p2", "c2", "p1", "c1"].iter().map(|id| id.to_string()).collect();
        assert!(graph.same_ids(&ids));

        let fewer = ["c1", "c2"].iter().map(|id| id.to_string()).collect();
        assert!(!graph.same_ids(&fewer));
    }

    #[test]
    fn pattern_requires_every_code() {
        let graph = bipartite_fixture();

        let both = graph.cases_matching_pattern(&["401.22".to_owned(), "411.00".to_owned()]);
        assert_eq!(both, vec!["case-1"]);

        let single = graph.cases_matching_pattern(&["401.22".to_owned()]);
        assert_eq!(single, vec!["case-1", "case-2"]);

        assert!(graph.cases_matching_pattern(&[]).is_empty());
    }

    #[test]
    fn neighbors_spans_both_directions() {
        let graph = bipartite_fixture();
        assert_eq!(graph.neighbors("c1"), vec!["case-1", "case-2"]);
        assert_eq!(graph.neighbors("p1"), vec!["401.22", "411.00"]);
        assert!(graph.neighbors("missing").is_empty());
    }
}
