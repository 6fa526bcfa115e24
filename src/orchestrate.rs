//! Owns the lifecycle of at most one in-flight layout job and translates its
//! messages into scale/index refreshes and collaborator callbacks. "Last
//! submit wins": superseding a job drops its receiver, so a slow stale run can
//! never clobber a newer one no matter when it would have finished.

use serde::Deserialize;

use crate::data::GraphSnapshot;
use crate::geom::{Rect, Vec2};
use crate::quadtree::{IndexPoint, PointQuadtree};
use crate::scale::{LinearScale, extent};
use crate::sim::SimParams;
use crate::sim::worker::{LayoutJob, LayoutMessage, spawn_layout};

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            left: 20.0,
            right: 20.0,
            top: 20.0,
            bottom: 5.0,
        }
    }
}

/// Data-to-screen mappings for the current viewport. Y is inverted so larger
/// simulation values draw toward the top, the plotting convention upstream
/// consumers expect.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scales {
    pub x: LinearScale,
    pub y: LinearScale,
}

impl Scales {
    pub fn to_screen(&self, pos: Vec2) -> Vec2 {
        Vec2 {
            x: self.x.apply(pos.x),
            y: self.y.apply(pos.y),
        }
    }
}

pub trait LayoutSink {
    fn progress(&mut self, fraction: f32);
    fn positions_ready(&mut self, snapshot: &GraphSnapshot, scales: &Scales);
    fn settled(&mut self);
}

pub struct LayoutOrchestrator {
    job: Option<LayoutJob>,
    current: Option<GraphSnapshot>,
    scales: Scales,
    index: PointQuadtree,
    viewport: Option<(f32, f32)>,
}

impl LayoutOrchestrator {
    pub fn new() -> Self {
        Self {
            job: None,
            current: None,
            scales: Scales::default(),
            index: PointQuadtree::default(),
            viewport: None,
        }
    }

    pub fn has_job(&self) -> bool {
        self.job.is_some()
    }

    pub fn current(&self) -> Option<&GraphSnapshot> {
        self.current.as_ref()
    }

    pub fn scales(&self) -> &Scales {
        &self.scales
    }

    /// Drops any in-flight job and the current layout, e.g. when a degenerate
    /// dataset replaces a real one.
    pub fn clear(&mut self) {
        self.job = None;
        self.current = None;
        self.index = PointQuadtree::default();
    }

    /// Starts a layout job for `snapshot`, superseding any job still running.
    pub fn submit(&mut self, snapshot: GraphSnapshot, params: SimParams, update_freq: usize) {
        if self.job.take().is_some() {
            log::debug!("superseding in-flight layout job");
        }
        self.job = Some(spawn_layout(snapshot, params, update_freq));
    }

    /// Drains every pending worker message without blocking. Interim and
    /// final positions refresh the scales and the screen-space index before
    /// the sink is notified, so a redraw always sees a consistent pair.
    pub fn poll(&mut self, sink: &mut dyn LayoutSink) {
        loop {
            let Some(job) = &self.job else {
                return;
            };

            match job.try_recv() {
                Ok(LayoutMessage::Progress { fraction }) => sink.progress(fraction),
                Ok(LayoutMessage::Positions(snapshot)) => {
                    self.adopt(snapshot);
                    if let Some(current) = &self.current {
                        sink.positions_ready(current, &self.scales);
                    }
                }
                Ok(LayoutMessage::Done(snapshot)) => {
                    self.adopt(snapshot);
                    self.job = None;
                    if let Some(current) = &self.current {
                        sink.positions_ready(current, &self.scales);
                    }
                    sink.settled();
                }
                Err(std::sync::mpsc::TryRecvError::Empty) => return,
                Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                    log::warn!("layout worker disconnected before completing");
                    self.job = None;
                    return;
                }
            }
        }
    }

    /// Updates the screen mapping only. The simulation is never resubmitted
    /// for a resize; its coordinates are resolution-independent.
    pub fn set_viewport(&mut self, width: f32, height: f32, margin: Margin) {
        self.viewport = Some((width, height));
        self.scales.x.set_range(margin.left, width - margin.right);
        self.scales.y.set_range(height - margin.bottom, margin.top);
        self.rebuild_index();
    }

    /// Ids of selectable nodes whose screen position falls inside `rect` and
    /// whose scalar falls inside `scalar_bounds`, via the spatial index.
    pub fn brushed_ids(&self, rect: Rect, scalar_bounds: (f64, f64)) -> Vec<String> {
        let Some(current) = &self.current else {
            return Vec::new();
        };
        self.index
            .query_rect(rect, scalar_bounds)
            .into_iter()
            .map(|slot| current.nodes[slot].id.clone())
            .collect()
    }

    /// Closest selectable node within `radius` of a screen point, for click
    /// picks. A degenerate brush rectangle is explicitly fine.
    pub fn pick(&self, at: Vec2, radius: f32) -> Option<String> {
        let current = self.current.as_ref()?;
        self.index
            .query_rect(Rect::around(at, radius), crate::quadtree::UNBOUNDED)
            .into_iter()
            .filter_map(|slot| {
                let screen = self.scales.to_screen(current.nodes[slot].pos?);
                let distance = (screen - at).length();
                (distance <= radius).then_some((slot, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(slot, _)| current.nodes[slot].id.clone())
    }

    fn adopt(&mut self, snapshot: GraphSnapshot) {
        if let Some((min, max)) = extent(snapshot.nodes.iter().filter_map(|node| node.pos.map(|p| p.x))) {
            self.scales.x.set_domain(min, max);
        }
        if let Some((min, max)) = extent(snapshot.nodes.iter().filter_map(|node| node.pos.map(|p| p.y))) {
            self.scales.y.set_domain(min, max);
        }
        self.current = Some(snapshot);
        self.rebuild_index();
    }

    // Screen-space coordinates go stale on any position or scale change, so
    // the index is rebuilt from scratch in both cases.
    fn rebuild_index(&mut self) {
        let (Some(current), Some(_)) = (&self.current, self.viewport) else {
            self.index = PointQuadtree::default();
            return;
        };

        let points = current
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.selectable)
            .filter_map(|(slot, node)| {
                node.pos.map(|pos| IndexPoint {
                    slot,
                    pos: self.scales.to_screen(pos),
                    scalar: node.log_or,
                })
            })
            .collect::<Vec<_>>();
        self.index = PointQuadtree::build(&points);
    }
}

impl Default for LayoutOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}
