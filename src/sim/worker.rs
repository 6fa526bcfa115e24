//! One layout job on one spawned thread. The channel is the whole interface:
//! dropping the receiver is cancellation, and the worker notices the closed
//! channel at its next send and stops burning CPU.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use super::{SimParams, Simulation};
use crate::data::GraphSnapshot;

#[derive(Clone, Debug)]
pub enum LayoutMessage {
    Progress { fraction: f32 },
    Positions(GraphSnapshot),
    Done(GraphSnapshot),
}

pub struct LayoutJob {
    rx: Receiver<LayoutMessage>,
}

impl LayoutJob {
    pub fn try_recv(&self) -> Result<LayoutMessage, TryRecvError> {
        self.rx.try_recv()
    }
}

/// Spawns the simulation for an already-validated snapshot. Emits a progress
/// fraction every tick, interim positions every `update_freq` ticks, and
/// exactly one `Done` carrying the settled layout.
pub fn spawn_layout(snapshot: GraphSnapshot, params: SimParams, update_freq: usize) -> LayoutJob {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let mut sim = Simulation::new(snapshot, params);
        let budget = params.iteration_budget();

        for tick in 1..=budget {
            sim.tick();

            let fraction = tick as f32 / budget as f32;
            if tx.send(LayoutMessage::Progress { fraction }).is_err() {
                return;
            }

            let interim = update_freq > 0 && tick % update_freq == 0 && tick != budget;
            if interim && tx.send(LayoutMessage::Positions(sim.snapshot().clone())).is_err() {
                return;
            }
        }

        let _ = tx.send(LayoutMessage::Done(sim.into_snapshot()));
    });

    LayoutJob { rx }
}
