//! Interactive network-layout engine for phenotype visualizations: an
//! off-thread force simulation with incremental progress, a quadtree for
//! sub-linear brush queries, a pure selection reducer, and an orchestrator
//! tying them to host-provided rendering collaborators.

pub mod data;
pub mod error;
pub mod geom;
pub mod orchestrate;
pub mod quadtree;
pub mod scale;
pub mod selection;
pub mod sim;
mod util;
pub mod view;

pub use data::{Edge, GraphSnapshot, Node, normalize};
pub use error::InputError;
pub use orchestrate::{LayoutOrchestrator, LayoutSink, Margin, Scales};
pub use quadtree::{IndexPoint, PointQuadtree};
pub use selection::{Action, ActionSource, SelectionState, decode_action};
pub use sim::worker::{LayoutJob, LayoutMessage, spawn_layout};
pub use sim::{LayoutKind, SimParams, Simulation};
pub use view::{
    BrushMode, Canvas, DrawContext, HostLink, NetworkView, OutboundMessage, ProgressMeter,
    VizOptions,
};
