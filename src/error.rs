use thiserror::Error;

/// Input-contract violations. These are fatal and detected while building a
/// snapshot, before any layout job is spawned; the simulation itself has no
/// error path.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("dataset has neither a `nodes` nor a `vertices` field")]
    MissingNodes,

    #[error("dataset has neither a `links` nor an `edges` field")]
    MissingLinks,

    #[error("duplicate node id `{0}`")]
    DuplicateNodeId(String),

    #[error("edge references unknown node id `{0}`")]
    UnknownEndpoint(String),

    #[error("malformed dataset: {0}")]
    Malformed(#[source] serde_json::Error),
}
