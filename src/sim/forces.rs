use std::f32::consts::TAU;

use super::SimParams;
use crate::data::{Edge, GraphSnapshot};
use crate::geom::{Rect, Vec2, vec2};
use crate::quadtree::PointQuadtree;

// Deterministic stand-in for d3's random jiggle: coincident points need some
// direction to separate along, and it must be the same one every run.
fn jiggle(index: usize) -> Vec2 {
    let angle = ((index as f32) * 0.618_034) * TAU;
    vec2(angle.cos(), angle.sin()) * 1e-3
}

pub(super) fn apply_links(
    edges: &[Edge],
    degrees: &[u32],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    alpha: f32,
    params: &SimParams,
) {
    for (edge_index, edge) in edges.iter().enumerate() {
        let (source, target) = (edge.source, edge.target);

        let mut delta =
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        if delta.length_sq() <= f32::EPSILON {
            delta = jiggle(edge_index);
        }

        let distance = delta.length();
        let strength = params.link_strength * edge.weight.unwrap_or(1.0);
        let pull = ((distance - params.link_distance) / distance) * alpha * strength;

        // Heavier endpoints move less, matching the degree bias d3 applies.
        let bias = degrees[source] as f32 / (degrees[source] + degrees[target]).max(1) as f32;
        velocities[target] -= delta * (pull * bias);
        velocities[source] += delta * (pull * (1.0 - bias));
    }
}

pub(super) fn apply_many_body(
    tree: &PointQuadtree,
    positions: &[Vec2],
    velocities: &mut [Vec2],
    alpha: f32,
    params: &SimParams,
) {
    if positions.len() < 2 {
        return;
    }

    // Interactions closer than one layout unit are treated as one unit away,
    // the same floor d3 applies, so coincident clusters separate smoothly.
    const DISTANCE_MIN_SQ: f32 = 1.0;

    let theta_sq = params.theta * params.theta;
    for (index, &pos) in positions.iter().enumerate() {
        let mut push = Vec2::ZERO;

        tree.visit(|cell| {
            if cell.mass <= 0.0 {
                return true;
            }

            let delta = cell.center_of_mass - pos;
            let distance_sq = delta.length_sq();

            // Far cluster: one aggregate contribution, skip the subtree.
            if !cell.is_leaf && (cell.side * cell.side) < (theta_sq * distance_sq) {
                let clamped = distance_sq.max(DISTANCE_MIN_SQ);
                push += delta * (params.charge_strength * cell.mass * alpha / clamped);
                return true;
            }

            if cell.is_leaf {
                for point in cell.points {
                    if point.slot == index {
                        continue;
                    }
                    let mut delta = point.pos - pos;
                    if delta.length_sq() <= f32::EPSILON {
                        delta = jiggle(point.slot);
                    }
                    let clamped = delta.length_sq().max(DISTANCE_MIN_SQ);
                    push += delta * (params.charge_strength * alpha / clamped);
                }
                return true;
            }

            false
        });

        velocities[index] += push;
    }
}

pub(super) fn apply_collide(
    tree: &PointQuadtree,
    snapshot: &GraphSnapshot,
    positions: &[Vec2],
    velocities: &mut [Vec2],
    params: &SimParams,
) {
    let node_count = positions.len();
    if node_count < 2 {
        return;
    }

    let max_radius = params.code_radius.max(params.case_radius);

    for index in 0..node_count {
        let radius = params.collide_radius(snapshot.nodes[index].selectable);
        let reach = radius + max_radius;
        let neighborhood = Rect::around(positions[index], reach);

        for other in tree.query_rect(neighborhood, crate::quadtree::UNBOUNDED) {
            if other <= index {
                continue;
            }

            let other_radius = params.collide_radius(snapshot.nodes[other].selectable);
            let min_distance = radius + other_radius;

            let mut delta = positions[index] - positions[other];
            if delta.length_sq() <= f32::EPSILON {
                delta = jiggle(index.wrapping_add(other));
            }
            let distance = delta.length();
            if distance >= min_distance {
                continue;
            }

            let correction =
                delta.normalized() * ((min_distance - distance) * params.collide_strength * 0.5);
            velocities[index] += correction;
            velocities[other] -= correction;
        }
    }
}

pub(super) fn apply_axis_pull(
    snapshot: &GraphSnapshot,
    positions: &[Vec2],
    velocities: &mut [Vec2],
    alpha: f32,
    params: &SimParams,
) {
    for (index, node) in snapshot.nodes.iter().enumerate() {
        if !node.selectable {
            continue;
        }
        velocities[index] -= positions[index] * (params.center_strength * alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::IndexPoint;

    #[test]
    fn repulsion_pushes_pair_apart() {
        let positions = vec![vec2(0.0, 0.0), vec2(1.0, 0.0)];
        let points = positions
            .iter()
            .enumerate()
            .map(|(slot, &pos)| IndexPoint::plain(slot, pos))
            .collect::<Vec<_>>();
        let tree = PointQuadtree::build(&points);
        let mut velocities = vec![Vec2::ZERO; 2];

        apply_many_body(&tree, &positions, &mut velocities, 1.0, &SimParams::default());

        assert!(velocities[0].x < 0.0);
        assert!(velocities[1].x > 0.0);
        assert!((velocities[0].x + velocities[1].x).abs() < 1e-3);
    }

    #[test]
    fn link_pull_respects_degree_bias() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let mut velocities = vec![Vec2::ZERO; 2];
        let edges = vec![Edge {
            source: 0,
            target: 1,
            weight: None,
        }];

        apply_links(&edges, &[1, 1], &positions, &mut velocities, 1.0, &SimParams::default());

        assert!(velocities[0].x > 0.0);
        assert!(velocities[1].x < 0.0);
    }
}
