//! Single source of truth for "what is currently selected". Every input
//! surface (spatial brush, range brush, table, clicks, reset) dispatches an
//! action here instead of mutating shared state; rendering and messaging
//! observe the result.

use std::collections::{BTreeSet, HashMap};

use crate::data::GraphSnapshot;

mod decode;

pub use decode::decode_action;

pub use crate::quadtree::UNBOUNDED;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActionSource {
    #[default]
    Data,
    Spatial,
    Toggle,
    Range,
    Table,
    Reset,
}

#[derive(Clone, Debug)]
pub enum Action {
    NewData {
        ids: BTreeSet<String>,
        scalars: HashMap<String, f64>,
        default_selected: Vec<String>,
    },
    SpatialSelect(Vec<String>),
    SpatialAdd(Vec<String>),
    SpatialSubtract(Vec<String>),
    ToggleOne(String),
    RangeFilter(f64, f64),
    TableSelect(Vec<String>),
    Reset,
}

impl Action {
    pub fn new_data(snapshot: &GraphSnapshot, default_selected: &[String]) -> Self {
        Self::NewData {
            ids: snapshot.id_set(),
            scalars: snapshot.scalars(),
            default_selected: default_selected.to_vec(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionState {
    ids: BTreeSet<String>,
    scalars: HashMap<String, f64>,
    default_selected: BTreeSet<String>,
    pub selected: BTreeSet<String>,
    pub range_filter_low: f64,
    pub range_filter_high: f64,
    pub last_source: ActionSource,
    pub at_default: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self {
            range_filter_low: UNBOUNDED.0,
            range_filter_high: UNBOUNDED.1,
            at_default: true,
            ..Self::default()
        }
    }

    pub fn range_filter(&self) -> (f64, f64) {
        (self.range_filter_low, self.range_filter_high)
    }

    /// Pure transition function. Never panics; ids outside the current
    /// dataset are clamped away so `selected` stays a subset of the graph.
    pub fn apply(&self, action: Action) -> Self {
        let mut next = self.clone();

        match action {
            Action::NewData {
                ids,
                scalars,
                default_selected,
            } => {
                next.default_selected = default_selected
                    .into_iter()
                    .filter(|id| ids.contains(id))
                    .collect();
                next.ids = ids;
                next.scalars = scalars;
                next.selected = next.default_selected.clone();
                (next.range_filter_low, next.range_filter_high) = UNBOUNDED;
                next.last_source = ActionSource::Data;
            }
            Action::SpatialSelect(picked) => {
                next.selected = next.admit(picked);
                next.last_source = ActionSource::Spatial;
            }
            Action::SpatialAdd(picked) => {
                let admitted = next.admit(picked);
                next.selected.extend(admitted);
                next.last_source = ActionSource::Spatial;
            }
            Action::SpatialSubtract(picked) => {
                for id in picked {
                    next.selected.remove(&id);
                }
                next.last_source = ActionSource::Spatial;
            }
            Action::ToggleOne(id) => {
                if next.ids.contains(&id) && !next.selected.remove(&id) {
                    next.selected.insert(id);
                }
                next.last_source = ActionSource::Toggle;
            }
            Action::RangeFilter(low, high) => {
                next.range_filter_low = low;
                next.range_filter_high = high;
                // Narrowing only: the existing selection is intersected with
                // the new bounds, never re-widened.
                let scalars = &next.scalars;
                next.selected
                    .retain(|id| scalar_within(scalars, id, (low, high)));
                next.last_source = ActionSource::Range;
            }
            Action::TableSelect(picked) => {
                next.selected = next.admit(picked);
                next.last_source = ActionSource::Table;
            }
            Action::Reset => {
                next.selected = next.default_selected.clone();
                (next.range_filter_low, next.range_filter_high) = UNBOUNDED;
                next.last_source = ActionSource::Reset;
            }
        }

        next.at_default =
            next.selected == next.default_selected && next.range_filter() == UNBOUNDED;
        next
    }

    /// Same canonical selection, ignoring which surface produced it.
    pub fn selection_eq(&self, other: &Self) -> bool {
        self.selected == other.selected
            && self.range_filter() == other.range_filter()
            && self.at_default == other.at_default
    }

    fn admit(&self, picked: Vec<String>) -> BTreeSet<String> {
        picked
            .into_iter()
            .filter(|id| self.ids.contains(id))
            .collect()
    }
}

fn scalar_within(scalars: &HashMap<String, f64>, id: &str, bounds: (f64, f64)) -> bool {
    scalars
        .get(id)
        .is_none_or(|value| *value >= bounds.0 && *value <= bounds.1)
}
