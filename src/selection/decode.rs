use serde_json::Value;

use super::Action;

/// Maps a host-emitted tagged message to a reducer action. Unknown or
/// malformed messages are logged and dropped so newer UI surfaces never crash
/// an older embedding; the reducer itself only ever sees valid actions.
pub fn decode_action(value: &Value) -> Option<Action> {
    let Some(tag) = value.get("type").and_then(Value::as_str) else {
        log::warn!("action message without a string `type` tag: {value}");
        return None;
    };
    let payload = value.get("payload");

    let action = match tag {
        "spatial_select" => Action::SpatialSelect(id_list(payload)?),
        "spatial_add" => Action::SpatialAdd(id_list(payload)?),
        "spatial_subtract" => Action::SpatialSubtract(id_list(payload)?),
        "toggle_one" => Action::ToggleOne(payload.and_then(Value::as_str)?.to_owned()),
        "range_filter" => {
            let bounds = payload.and_then(Value::as_array)?;
            Action::RangeFilter(
                bound_or(bounds.first(), f64::NEG_INFINITY),
                bound_or(bounds.get(1), f64::INFINITY),
            )
        }
        "table_select" => Action::TableSelect(id_list(payload)?),
        "reset" => Action::Reset,
        unknown => {
            log::warn!("ignoring unknown action type `{unknown}`");
            return None;
        }
    };
    Some(action)
}

fn id_list(payload: Option<&Value>) -> Option<Vec<String>> {
    let items = payload.and_then(Value::as_array)?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
    )
}

fn bound_or(value: Option<&Value>, fallback: f64) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(fallback)
}
