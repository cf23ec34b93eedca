use std::f32::consts::{PI, TAU};

use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};
use rand::Rng;

use crate::graph::{GraphError, GraphStore, NodeId};

const COINCIDENT_DISTANCE: f32 = 0.0001;
const ROOT_TOP: f32 = 100.0;

/// Geometry and tuning of the balloon layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConfig {
    pub card_size: Vec2,
    pub placement_gap: f32,
    pub placement_step: f32,
    pub placement_angle_step: f32,
    pub placement_attempts: usize,
    pub relax_gap: f32,
    pub relax_strength: f32,
    pub relax_iterations: usize,
    pub relax_threshold: f32,
    pub margin_slack: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            card_size: vec2(140.0, 80.0),
            placement_gap: 40.0,
            placement_step: 20.0,
            placement_angle_step: PI / 6.0,
            placement_attempts: 50,
            relax_gap: 30.0,
            relax_strength: 0.3,
            relax_iterations: 10,
            relax_threshold: 0.1,
            margin_slack: 20.0,
        }
    }
}

impl LayoutConfig {
    fn card_extent(&self) -> f32 {
        self.card_size.x.max(self.card_size.y)
    }

    pub fn placement_distance(&self) -> f32 {
        self.card_extent() + self.placement_gap
    }

    pub fn relax_distance(&self) -> f32 {
        self.card_extent() + self.relax_gap
    }

    pub fn margin(&self) -> f32 {
        self.card_extent() / 2.0 + self.margin_slack
    }

    /// Axis-aligned test between two card centres.
    pub fn cards_overlap(&self, a: Pos2, b: Pos2) -> bool {
        (a.x - b.x).abs() < self.card_size.x && (a.y - b.y).abs() < self.card_size.y
    }

    pub fn card_rect(&self, center: Pos2) -> Rect {
        Rect::from_center_size(center, self.card_size)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelaxOutcome {
    pub iterations: usize,
    pub moved: bool,
    pub converged: bool,
}

pub fn clamp_to_canvas(position: Pos2, canvas: Vec2, margin: f32) -> Pos2 {
    pos2(
        clamp_axis(position.x, canvas.x, margin),
        clamp_axis(position.y, canvas.y, margin),
    )
}

// An axis too short to honour the margin on both sides collapses onto its centre.
fn clamp_axis(value: f32, length: f32, margin: f32) -> f32 {
    let length = if length.is_finite() { length.max(0.0) } else { 0.0 };
    let high = length - margin;
    if high < margin || !value.is_finite() {
        return length * 0.5;
    }
    value.clamp(margin, high)
}

fn orbit(center: Pos2, angle: f32, distance: f32) -> Pos2 {
    center + vec2(angle.cos(), angle.sin()) * distance
}

fn separation_direction(i: usize, j: usize) -> Vec2 {
    let angle = ((i as f32) * 0.618_034 + (j as f32) * 0.414_214) * TAU;
    vec2(angle.cos(), angle.sin())
}

/// Places `count` new cards on a ring around `parent`, stepping outwards and rotating away
/// from any card they would overlap. Each placed card becomes an obstacle for the next one.
pub fn place_batch(
    parent: Pos2,
    count: usize,
    obstacles: &[Pos2],
    canvas: Vec2,
    config: &LayoutConfig,
) -> Vec<Pos2> {
    let margin = config.margin();
    let mut occupied = obstacles.to_vec();
    let mut placed = Vec::with_capacity(count);

    for index in 0..count {
        let mut angle = TAU * index as f32 / count as f32;
        let mut distance = config.placement_distance() + config.placement_step;
        let mut candidate = orbit(parent, angle, distance);

        for _ in 0..config.placement_attempts {
            let blocked = occupied
                .iter()
                .any(|&other| config.cards_overlap(candidate, other));
            if !blocked {
                break;
            }
            distance += config.placement_step;
            angle += config.placement_angle_step;
            candidate = orbit(parent, angle, distance);
        }

        let position = clamp_to_canvas(candidate, canvas, margin);
        occupied.push(position);
        placed.push(position);
    }

    placed
}

/// Moves freshly added `children` of `parent` to their ring positions. Every other node of
/// the graph is treated as an obstacle.
pub fn place_children(
    graph: &mut GraphStore,
    parent: NodeId,
    children: &[NodeId],
    canvas: Vec2,
    config: &LayoutConfig,
) -> Result<(), GraphError> {
    let origin = graph
        .get(parent)
        .map(|node| node.position)
        .ok_or(GraphError::UnknownParent(parent))?;
    let obstacles = graph
        .all()
        .filter(|node| !children.contains(&node.id))
        .map(|node| node.position)
        .collect::<Vec<_>>();

    let placed = place_batch(origin, children.len(), &obstacles, canvas, config);
    for (&id, position) in children.iter().zip(placed) {
        graph.set_position(id, position)?;
    }
    Ok(())
}

/// Pairwise repulsion between cards closer than the relaxation distance.
///
/// Displacements are accumulated for every node first and applied together. A node only
/// moves when its clamped shift exceeds the threshold on some axis, so a converged layout is
/// a fixed point. Positions outside the canvas are pulled back in before the first iteration.
pub fn relax(positions: &mut [Pos2], canvas: Vec2, config: &LayoutConfig) -> RelaxOutcome {
    let count = positions.len();
    let margin = config.margin();
    let min_distance = config.relax_distance();
    let strength = config.relax_strength;
    let threshold = config.relax_threshold;
    let mut outcome = RelaxOutcome::default();

    for position in positions.iter_mut() {
        let clamped = clamp_to_canvas(*position, canvas, margin);
        if clamped != *position {
            *position = clamped;
            outcome.moved = true;
        }
    }

    let mut displacement = vec![Vec2::ZERO; count];
    for iteration in 0..config.relax_iterations {
        displacement.fill(Vec2::ZERO);

        for i in 0..count {
            for j in (i + 1)..count {
                let delta = positions[i] - positions[j];
                let distance = delta.length();
                if distance >= min_distance {
                    continue;
                }

                let push = if distance > COINCIDENT_DISTANCE {
                    delta * ((min_distance - distance) / distance * strength)
                } else {
                    separation_direction(i, j) * (min_distance * strength)
                };
                displacement[i] += push;
                displacement[j] -= push;
            }
        }

        let mut moved = false;
        for (position, shift) in positions.iter_mut().zip(&displacement) {
            let next = clamp_to_canvas(*position + *shift, canvas, margin);
            let step = next - *position;
            if step.x.abs() > threshold || step.y.abs() > threshold {
                *position = next;
                moved = true;
            }
        }

        outcome.iterations = iteration + 1;
        if !moved {
            outcome.converged = true;
            break;
        }
        outcome.moved = true;
    }

    outcome
}

/// Runs [`relax`] over the graph in id order.
pub fn relax_graph(graph: &mut GraphStore, canvas: Vec2, config: &LayoutConfig) -> RelaxOutcome {
    let mut positions = graph.positions();
    let outcome = relax(&mut positions, canvas, config);
    for (slot, position) in graph.positions_mut().zip(positions) {
        *slot = position;
    }

    if !outcome.converged && graph.len() > 1 {
        log::debug!(
            "relaxation stopped after {} iterations with residual overlap ({} balloons)",
            outcome.iterations,
            graph.len()
        );
    }
    outcome
}

/// Where the root card sits: horizontally centred, near the top edge.
pub fn root_anchor(canvas: Vec2, config: &LayoutConfig) -> Pos2 {
    clamp_to_canvas(pos2(canvas.x * 0.5, ROOT_TOP), canvas, config.margin())
}

/// Gives every node a fresh position: the root at its anchor, the rest uniformly inside the
/// canvas margins.
pub fn scatter(graph: &mut GraphStore, canvas: Vec2, config: &LayoutConfig, rng: &mut impl Rng) {
    let margin = config.margin();
    let anchor = root_anchor(canvas, config);
    let roots = graph.all().map(|node| node.is_root()).collect::<Vec<_>>();

    for (position, is_root) in graph.positions_mut().zip(roots) {
        *position = if is_root {
            anchor
        } else {
            pos2(
                random_axis(rng, canvas.x, margin),
                random_axis(rng, canvas.y, margin),
            )
        };
    }
}

fn random_axis(rng: &mut impl Rng, length: f32, margin: f32) -> f32 {
    let high = length - margin;
    if high > margin {
        rng.gen_range(margin..high)
    } else {
        clamp_axis(0.0, length, margin)
    }
}
