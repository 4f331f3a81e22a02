use crate::NodeId;

/// The `Snag` enum collects the ways a trip through the tree can go wrong.
///
/// Some variants wrap errors from the crates we lean on, like [`config`] and [`serde_json`], and
/// convert automatically through [`derive_more::From`] so that `?` does the busy work.  The rest
/// describe problems particular to navigation: a node we have never heard of, a node with nothing
/// underneath it, or a navigator too busy to listen.
///
/// An empty column is not a snag.  Nothing to show is a perfectly respectable answer.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum Snag {
    /// Settings could not be read or deserialized.
    #[display("Config error: {_0}")]
    #[from]
    Config(config::ConfigError),
    /// Reading a fixture file or standard input failed.
    #[display("Io error: {_0}")]
    #[from]
    Io(std::io::Error),
    /// A response body was not valid JSON.
    #[display("Json error: {_0}")]
    #[from]
    Json(serde_json::Error),
    /// The loader could not produce a response for `url`.
    #[display("Fetch from {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    /// The response parsed as JSON, but not into the shape of a subtree.
    #[display("Malformed response: {_0}")]
    MalformedResponse(#[error(not(source))] String),
    /// The node is neither a child nor the parent of the last subtree loaded.
    #[display("Unknown node: {_0}")]
    UnknownNode(#[error(not(source))] NodeId),
    /// The node has no children link, so there is nowhere deeper to go.
    #[display("Node {_0} has no children")]
    Leaf(#[error(not(source))] NodeId),
    /// Another errand is in flight.
    #[display("Navigator is busy")]
    Busy,
    /// A newer request replaced this one before it finished.
    #[display("Superseded by a newer request")]
    Superseded,
    /// The current column has no further pages.
    #[display("No further pages")]
    LastPage,
    /// Text that does not parse as a [`crate::Command`].
    #[display("Unknown command: {_0}")]
    UnknownCommand(#[error(not(source))] String),
    /// The navigator task has shut down.
    #[display("Navigator has shut down")]
    Closed,
}

/// Result alias used throughout the crate.
pub type Trek<T> = Result<T, Snag>;
