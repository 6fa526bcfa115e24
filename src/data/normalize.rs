use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Number, Value};

use super::{Edge, GraphSnapshot, Node};
use crate::error::InputError;
use crate::geom::vec2;

/// Raw input as the host hands it over. The two historical key spellings
/// (`nodes`/`vertices`, `links`/`edges`) are collapsed here and nowhere else.
#[derive(Deserialize)]
struct RawGraph {
    #[serde(alias = "vertices")]
    nodes: Option<Vec<RawNode>>,
    #[serde(alias = "edges")]
    links: Option<Vec<RawEdge>>,
}

#[derive(Deserialize)]
struct RawNode {
    id: RawId,
    name: Option<String>,
    #[serde(default)]
    selectable: bool,
    x: Option<f32>,
    y: Option<f32>,
    fx: Option<f32>,
    fy: Option<f32>,
    p_val: Option<f64>,
    #[serde(rename = "OR")]
    odds_ratio: Option<f64>,
    #[serde(flatten)]
    metadata: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawEdge {
    source: RawId,
    target: RawId,
    weight: Option<f32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(Number),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Builds a validated snapshot from a host `data` value. Edges referencing
/// unknown ids are a contract violation and fail the whole build; nothing is
/// silently dropped.
pub fn normalize(value: &Value) -> Result<GraphSnapshot, InputError> {
    let raw: RawGraph = serde_json::from_value(value.clone()).map_err(InputError::Malformed)?;

    let raw_nodes = raw.nodes.ok_or(InputError::MissingNodes)?;
    let raw_links = raw.links.ok_or(InputError::MissingLinks)?;

    let mut nodes = Vec::with_capacity(raw_nodes.len());
    let mut index_by_id = HashMap::with_capacity(raw_nodes.len());

    for raw_node in raw_nodes {
        let id = raw_node.id.into_string();
        if index_by_id.insert(id.clone(), nodes.len()).is_some() {
            return Err(InputError::DuplicateNodeId(id));
        }

        let pos = match (raw_node.x, raw_node.y) {
            (Some(x), Some(y)) => Some(vec2(x, y)),
            _ => None,
        };

        nodes.push(Node {
            id,
            name: raw_node.name,
            selectable: raw_node.selectable,
            pos,
            fixed_x: raw_node.fx,
            fixed_y: raw_node.fy,
            log_or: raw_node.odds_ratio.map(f64::ln),
            log_pval: raw_node.p_val.map(|p| -p.log10()),
            metadata: raw_node.metadata,
        });
    }

    let mut edges = Vec::with_capacity(raw_links.len());
    for raw_edge in raw_links {
        let source_id = raw_edge.source.into_string();
        let target_id = raw_edge.target.into_string();

        let source = *index_by_id
            .get(&source_id)
            .ok_or(InputError::UnknownEndpoint(source_id))?;
        let target = *index_by_id
            .get(&target_id)
            .ok_or(InputError::UnknownEndpoint(target_id))?;

        edges.push(Edge {
            source,
            target,
            weight: raw_edge.weight,
        });
    }

    Ok(GraphSnapshot::assemble(nodes, edges, index_by_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_either_key_pair() {
        let data = json!({
            "vertices": [{"id": "a"}, {"id": "b"}],
            "edges": [{"source": "a", "target": "b"}],
        });
        let graph = normalize(&data).expect("vertices/edges spelling parses");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edges.len(), 1);

        let data = json!({
            "nodes": [{"id": "a"}, {"id": "b"}],
            "links": [{"source": "a", "target": "b"}],
        });
        assert!(normalize(&data).is_ok());
    }

    #[test]
    fn missing_key_pair_fails_fast() {
        let no_nodes = json!({"links": []});
        assert!(matches!(normalize(&no_nodes), Err(InputError::MissingNodes)));

        let no_links = json!({"nodes": []});
        assert!(matches!(normalize(&no_links), Err(InputError::MissingLinks)));
    }

    #[test]
    fn unknown_endpoint_is_fatal() {
        let data = json!({
            "nodes": [{"id": "a"}],
            "links": [{"source": "a", "target": "ghost"}],
        });
        match normalize(&data) {
            Err(InputError::UnknownEndpoint(id)) => assert_eq!(id, "ghost"),
            other => panic!("expected UnknownEndpoint, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let data = json!({
            "nodes": [{"id": "a"}, {"id": "a"}],
            "links": [],
        });
        assert!(matches!(normalize(&data), Err(InputError::DuplicateNodeId(_))));
    }

    #[test]
    fn numeric_ids_and_scalars() {
        let data = json!({
            "nodes": [
                {"id": 1, "name": "008", "selectable": true, "p_val": 0.001, "OR": 2.0, "category": "infectious"},
                {"id": 2},
            ],
            "links": [{"source": 1, "target": 2}],
        });
        let graph = normalize(&data).expect("numeric ids parse");

        let code = &graph.nodes[0];
        assert!((code.log_or.unwrap() - 2.0_f64.ln()).abs() < 1e-12);
        assert!((code.log_pval.unwrap() - 3.0).abs() < 1e-12);
        assert_eq!(code.metadata.get("category"), Some(&json!("infectious")));
        assert_eq!(graph.index_of("2"), Some(1));
    }

    #[test]
    fn preexisting_positions_survive() {
        let data = json!({
            "nodes": [{"id": "a", "x": 0.5, "y": -0.5}, {"id": "b"}],
            "links": [],
        });
        let graph = normalize(&data).expect("parses");
        assert_eq!(graph.nodes[0].pos, Some(vec2(0.5, -0.5)));
        assert!(graph.nodes[1].pos.is_none());
    }
}
