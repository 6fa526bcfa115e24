//! Force simulation in resolution-independent coordinates. The engine runs a
//! geometrically decaying temperature (`alpha`) and stops once it is expected
//! to fall under `alpha_min`; nothing here touches a rendering surface.

use serde::Deserialize;

use crate::data::GraphSnapshot;
use crate::geom::{Vec2, vec2};
use crate::quadtree::{IndexPoint, PointQuadtree};
use crate::util::stable_scatter;

mod forces;
pub mod worker;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// Pins phenotype codes to `x = -1` and case nodes to `x = +1`.
    Bipartite,
    #[default]
    Free,
}

#[derive(Clone, Copy, Debug)]
pub struct SimParams {
    pub layout: LayoutKind,
    pub link_distance: f32,
    pub link_strength: f32,
    pub charge_strength: f32,
    pub collide_strength: f32,
    pub code_radius: f32,
    pub case_radius: f32,
    /// Pull toward the origin, applied to the selectable class only.
    pub center_strength: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    pub theta: f32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            layout: LayoutKind::Free,
            link_distance: 0.3,
            link_strength: 0.8,
            charge_strength: -30.0,
            collide_strength: 0.5,
            code_radius: 10.0,
            case_radius: 3.0,
            center_strength: 0.5,
            alpha_min: 0.001,
            alpha_decay: 1.0 - 0.001_f32.powf(1.0 / 300.0),
            velocity_decay: 0.6,
            theta: 0.9,
        }
    }
}

impl SimParams {
    /// Tick budget implied by the decay schedule. A tunable, not a bit-exact
    /// contract; callers should treat it as "about this many ticks".
    pub fn iteration_budget(&self) -> usize {
        let per_tick = (1.0 - self.alpha_decay).ln();
        if per_tick >= 0.0 {
            return 1;
        }
        (self.alpha_min.ln() / per_tick).ceil().max(1.0) as usize
    }

    pub fn collide_radius(&self, selectable: bool) -> f32 {
        if selectable { self.code_radius } else { self.case_radius }
    }
}

pub struct Simulation {
    snapshot: GraphSnapshot,
    params: SimParams,
    velocities: Vec<Vec2>,
    degrees: Vec<u32>,
    alpha: f32,
    positions: Vec<Vec2>,
    points: Vec<IndexPoint>,
}

impl Simulation {
    pub fn new(mut snapshot: GraphSnapshot, params: SimParams) -> Self {
        if params.layout == LayoutKind::Bipartite {
            for node in &mut snapshot.nodes {
                node.fixed_x = Some(if node.selectable { -1.0 } else { 1.0 });
            }
        }

        for node in &mut snapshot.nodes {
            if node.pos.is_none() {
                let (x, y) = stable_scatter(&node.id);
                node.pos = Some(vec2(x, y));
            }
        }

        let mut degrees = vec![0u32; snapshot.nodes.len()];
        for edge in &snapshot.edges {
            degrees[edge.source] += 1;
            degrees[edge.target] += 1;
        }

        let node_count = snapshot.nodes.len();
        Self {
            snapshot,
            params,
            velocities: vec![Vec2::ZERO; node_count],
            degrees,
            alpha: 1.0,
            positions: Vec::with_capacity(node_count),
            points: Vec::with_capacity(node_count),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn finished(&self) -> bool {
        self.alpha < self.params.alpha_min
    }

    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> GraphSnapshot {
        self.snapshot
    }

    pub fn tick(&mut self) {
        self.alpha += (0.0 - self.alpha) * self.params.alpha_decay;

        let node_count = self.snapshot.nodes.len();
        if node_count == 0 {
            return;
        }

        self.positions.clear();
        self.points.clear();
        for (index, node) in self.snapshot.nodes.iter().enumerate() {
            let pos = node.pos.unwrap_or(Vec2::ZERO);
            self.positions.push(pos);
            self.points.push(IndexPoint::plain(index, pos));
        }

        let tree = PointQuadtree::build(&self.points);

        forces::apply_links(
            &self.snapshot.edges,
            &self.degrees,
            &self.positions,
            &mut self.velocities,
            self.alpha,
            &self.params,
        );
        forces::apply_many_body(&tree, &self.positions, &mut self.velocities, self.alpha, &self.params);
        forces::apply_collide(&tree, &self.snapshot, &self.positions, &mut self.velocities, &self.params);
        forces::apply_axis_pull(&self.snapshot, &self.positions, &mut self.velocities, self.alpha, &self.params);

        let decay = self.params.velocity_decay;
        for (index, node) in self.snapshot.nodes.iter_mut().enumerate() {
            let mut velocity = self.velocities[index] * decay;
            let mut pos = self.positions[index] + velocity;

            if let Some(fx) = node.fixed_x {
                pos.x = fx;
                velocity.x = 0.0;
            }
            if let Some(fy) = node.fixed_y {
                pos.y = fy;
                velocity.y = 0.0;
            }

            self.velocities[index] = velocity;
            node.pos = Some(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize;
    use serde_json::json;

    fn pair_graph() -> GraphSnapshot {
        normalize(&json!({
            "nodes": [
                {"id": "a", "selectable": true},
                {"id": "b"},
            ],
            "links": [{"source": "a", "target": "b"}],
        }))
        .expect("pair graph parses")
    }

    #[test]
    fn budget_matches_decay_schedule() {
        let params = SimParams {
            alpha_decay: 0.02,
            ..SimParams::default()
        };
        // ceil(ln(0.001) / ln(0.98))
        assert_eq!(params.iteration_budget(), 342);
    }

    #[test]
    fn two_nodes_converge_within_budget() {
        let params = SimParams {
            alpha_decay: 0.02,
            ..SimParams::default()
        };
        let mut sim = Simulation::new(pair_graph(), params);

        for _ in 0..params.iteration_budget() {
            sim.tick();
        }

        assert!(sim.finished());
        let snapshot = sim.into_snapshot();
        assert_eq!(snapshot.node_count(), 2);
        assert!(snapshot.index_of("a").is_some());
        assert!(snapshot.index_of("b").is_some());

        let a = snapshot.nodes[0].pos.expect("a placed");
        let b = snapshot.nodes[1].pos.expect("b placed");
        assert!(a.is_finite() && b.is_finite());
        assert!((a - b).length() > 0.0);
    }

    #[test]
    fn bipartite_layout_pins_classes_to_columns() {
        let params = SimParams {
            layout: LayoutKind::Bipartite,
            alpha_decay: 0.05,
            ..SimParams::default()
        };
        let mut sim = Simulation::new(pair_graph(), params);
        for _ in 0..params.iteration_budget() {
            sim.tick();
        }

        let snapshot = sim.into_snapshot();
        let code = snapshot.nodes[snapshot.index_of("a").unwrap()].pos.unwrap();
        let case = snapshot.nodes[snapshot.index_of("b").unwrap()].pos.unwrap();
        assert_eq!(code.x, -1.0);
        assert_eq!(case.x, 1.0);
    }

    #[test]
    fn empty_graph_ticks_without_panic() {
        let graph = normalize(&json!({"nodes": [], "links": []})).unwrap();
        let mut sim = Simulation::new(graph, SimParams::default());
        sim.tick();
        assert_eq!(sim.snapshot().node_count(), 0);
    }

    #[test]
    fn deterministic_across_runs() {
        let params = SimParams::default();
        let run = || {
            let mut sim = Simulation::new(pair_graph(), params);
            for _ in 0..40 {
                sim.tick();
            }
            sim.into_snapshot()
                .nodes
                .iter()
                .map(|node| node.pos.unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
