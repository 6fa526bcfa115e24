//! Host-facing surface. The embedding environment calls `on_render` whenever
//! data or options arrive, `on_resize` on viewport changes, and `poll` from
//! its event loop; everything it paints or sends goes through the collaborator
//! traits, never a rendering API.

use std::collections::{BTreeSet, HashMap};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::{self, GraphSnapshot};
use crate::geom::{Rect, Vec2};
use crate::orchestrate::{LayoutOrchestrator, LayoutSink, Margin, Scales};
use crate::selection::{Action, SelectionState, decode_action};
use crate::sim::{LayoutKind, SimParams};
use crate::util::timestamp_millis;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct VizOptions {
    /// Interim-layout cadence, in simulation ticks.
    pub update_freq: usize,
    #[serde(alias = "layout")]
    pub viz_type: LayoutKind,
    /// Selection applied when a new dataset arrives.
    pub selected: Vec<String>,
    /// Host input channel for outbound selection messages.
    pub msg_loc: String,
    pub highlighted_pattern: Vec<String>,
    pub margin: Margin,
}

impl Default for VizOptions {
    fn default() -> Self {
        Self {
            update_freq: 5,
            viz_type: LayoutKind::Bipartite,
            selected: Vec::new(),
            msg_loc: "server".to_owned(),
            highlighted_pattern: Vec::new(),
            margin: Margin::default(),
        }
    }
}

/// Selection message sent to the host. The leading timestamp keeps the
/// payload distinct even when the same ids are sent twice in a row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Vec<String>,
}

pub struct DrawContext<'a> {
    pub snapshot: &'a GraphSnapshot,
    pub scales: &'a Scales,
    pub selected: &'a BTreeSet<String>,
    pub highlighted: &'a [String],
}

pub trait Canvas {
    fn draw(&mut self, ctx: DrawContext<'_>);
    fn show_empty(&mut self, reason: &str);
    fn set_reset_visible(&mut self, visible: bool);
}

pub trait ProgressMeter {
    fn update(&mut self, fraction: f32);
    fn hide(&mut self);
}

pub trait HostLink {
    fn send(&mut self, channel: &str, message: OutboundMessage);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrushMode {
    Replace,
    Add,
    Subtract,
}

pub struct NetworkView {
    canvas: Box<dyn Canvas>,
    meter: Box<dyn ProgressMeter>,
    host: Box<dyn HostLink>,
    options: VizOptions,
    orchestrator: LayoutOrchestrator,
    selection: SelectionState,
    shown_ids: BTreeSet<String>,
    names: HashMap<String, String>,
}

impl NetworkView {
    pub fn new(canvas: Box<dyn Canvas>, meter: Box<dyn ProgressMeter>, host: Box<dyn HostLink>) -> Self {
        Self {
            canvas,
            meter,
            host,
            options: VizOptions::default(),
            orchestrator: LayoutOrchestrator::new(),
            selection: SelectionState::new(),
            shown_ids: BTreeSet::new(),
            names: HashMap::new(),
        }
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn options(&self) -> &VizOptions {
        &self.options
    }

    pub fn layout_running(&self) -> bool {
        self.orchestrator.has_job()
    }

    /// Entry point for a render call from the host. An unchanged id set only
    /// refreshes options-driven state; a new dataset resets the selection and
    /// launches a superseding layout job.
    pub fn on_render(&mut self, data: &Value, width: f32, height: f32, options: &Value) -> anyhow::Result<()> {
        self.options = serde_json::from_value(options.clone()).context("parsing visualization options")?;

        let snapshot = data::normalize(data).context("normalizing graph data")?;
        self.orchestrator.set_viewport(width, height, self.options.margin);

        if snapshot.node_count() <= 1 {
            log::debug!("dataset has {} nodes, showing empty state", snapshot.node_count());
            self.orchestrator.clear();
            self.selection = self.selection.apply(Action::new_data(&snapshot, &[]));
            self.shown_ids = snapshot.id_set();
            self.meter.hide();
            self.canvas.show_empty("not enough data to draw a network");
            return Ok(());
        }

        if snapshot.same_ids(&self.shown_ids) {
            self.redraw();
            return Ok(());
        }

        self.names = snapshot
            .nodes
            .iter()
            .map(|node| (node.id.clone(), node.display_name().to_owned()))
            .collect();
        self.shown_ids = snapshot.id_set();
        self.selection = self.selection.apply(Action::new_data(&snapshot, &self.options.selected));
        self.canvas.set_reset_visible(!self.selection.at_default);

        let params = SimParams {
            layout: self.options.viz_type,
            ..SimParams::default()
        };
        self.orchestrator.submit(snapshot, params, self.options.update_freq);
        Ok(())
    }

    /// Scale ranges, index and redraw only; the simulation keeps running (or
    /// stays settled) in its resolution-independent coordinates.
    pub fn on_resize(&mut self, width: f32, height: f32) {
        self.orchestrator.set_viewport(width, height, self.options.margin);
        self.redraw();
    }

    /// Drains pending worker messages. The host calls this from its event
    /// loop; it never blocks.
    pub fn poll(&mut self) {
        let Self {
            orchestrator,
            canvas,
            meter,
            selection,
            options,
            ..
        } = self;
        let mut sink = ViewSink {
            canvas: canvas.as_mut(),
            meter: meter.as_mut(),
            selection,
            options,
        };
        orchestrator.poll(&mut sink);
    }

    pub fn brush(&mut self, rect: Rect, mode: BrushMode) {
        let ids = self.orchestrator.brushed_ids(rect, self.selection.range_filter());
        let action = match mode {
            BrushMode::Replace => Action::SpatialSelect(ids),
            BrushMode::Add => Action::SpatialAdd(ids),
            BrushMode::Subtract => Action::SpatialSubtract(ids),
        };
        self.dispatch(action);
    }

    pub fn toggle_at(&mut self, at: Vec2, radius: f32) {
        if let Some(id) = self.orchestrator.pick(at, radius) {
            self.dispatch(Action::ToggleOne(id));
        }
    }

    pub fn range_filter(&mut self, low: f64, high: f64) {
        self.dispatch(Action::RangeFilter(low, high));
    }

    pub fn table_select(&mut self, ids: Vec<String>) {
        self.dispatch(Action::TableSelect(ids));
    }

    pub fn reset(&mut self) {
        self.dispatch(Action::Reset);
    }

    pub fn dispatch(&mut self, action: Action) {
        self.selection = self.selection.apply(action);
        self.canvas.set_reset_visible(!self.selection.at_default);
        self.redraw();
    }

    /// Tagged-message entry for host-driven surfaces; unknown tags are logged
    /// and ignored inside the decoder.
    pub fn dispatch_message(&mut self, value: &Value) {
        if let Some(action) = decode_action(value) {
            self.dispatch(action);
        }
    }

    /// Sends the current selection to the host channel named by `msg_loc`.
    /// Suppressed entirely while nothing is selected; only explicit actions
    /// reach the server.
    pub fn send_selection(&mut self, kind: &str) {
        if self.selection.selected.is_empty() {
            return;
        }

        let mut payload = Vec::with_capacity(self.selection.selected.len() + 1);
        payload.push(timestamp_millis());
        payload.extend(self.selection.selected.iter().map(|id| {
            self.names.get(id).cloned().unwrap_or_else(|| id.clone())
        }));

        let message = OutboundMessage {
            kind: kind.to_ascii_lowercase(),
            payload,
        };
        self.host.send(&self.options.msg_loc, message);
    }

    fn redraw(&mut self) {
        let Some(snapshot) = self.orchestrator.current() else {
            return;
        };
        let highlighted = snapshot.cases_matching_pattern(&self.options.highlighted_pattern);
        self.canvas.draw(DrawContext {
            snapshot,
            scales: self.orchestrator.scales(),
            selected: &self.selection.selected,
            highlighted: &highlighted,
        });
    }
}

struct ViewSink<'a> {
    canvas: &'a mut dyn Canvas,
    meter: &'a mut dyn ProgressMeter,
    selection: &'a SelectionState,
    options: &'a VizOptions,
}

impl LayoutSink for ViewSink<'_> {
    fn progress(&mut self, fraction: f32) {
        self.meter.update(fraction);
    }

    fn positions_ready(&mut self, snapshot: &GraphSnapshot, scales: &Scales) {
        let highlighted = snapshot.cases_matching_pattern(&self.options.highlighted_pattern);
        self.canvas.draw(DrawContext {
            snapshot,
            scales,
            selected: &self.selection.selected,
            highlighted: &highlighted,
        });
    }

    fn settled(&mut self) {
        self.meter.hide();
    }
}
