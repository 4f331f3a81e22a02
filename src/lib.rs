//! The `burrow` crate is a drill-down navigator for hierarchical data: folders inside folders,
//! categories inside categories, anything a server can describe as a node with children.
//!
//! The navigator shows one level of the tree at a time as a column.  Drilling into a child slides
//! a fresh column in from the right while the old one slides out to the left, and drilling out
//! runs the same dance in reverse.  Every level we visit lands in a cache, so walking back up the
//! tree costs nothing.  Searches and paging ride along as query parameters.
//!
//! Here is a link list to the places worth reading first:
//!
//! 1. Driving the tree with [`Navigator`]
//!     * [`Navigator::spawn`] and the [`Handle`] it returns.
//!     * [`Command`], the instructions a handle passes along.
//!     * [`Signal`], what the navigator tells the rest of the application.
//! 2. Fetching levels with [`TreeFetcher`]
//!     * [`Loader`], the seam where the network plugs in, and [`Fixtures`], a loader that serves
//!       canned responses.
//!     * [`Keys`], which reads the JSON envelope a server sends.
//!     * [`NodeCache`], where fetched levels live.
//! 3. Drawing with a [`Stage`]
//!     * [`ColumnView`], one rendered level.
//!     * [`AccessStage`] and [`AccessColumn`], which express the columns as an
//!       [`accesskit`] tree.
//! 4. Reading [`Settings`] from `Burrow.toml` with the [`config`] crate.
//!
//! The navigator runs on the [`tokio`] runtime.  Loads and slide timers are spawned as tasks of
//! their own, and report back over a channel, so the navigator never waits on the network.
mod access;
mod cache;
mod command;
mod envelope;
mod error;
mod fetch;
mod i18n;
mod id;
mod navigator;
mod node;
mod settings;
mod utils;
mod view;

/// Since this is a small library, we lift all user-facing data types and functions to the parent
/// namespace for ease of access.
pub use access::{AccessColumn, AccessStage};
pub use cache::{Entry, NodeCache};
pub use command::{Command, Verb};
pub use envelope::Keys;
pub use error::{Snag, Trek};
pub use fetch::{with_query, Fixtures, Loader, Plan, Request, TreeFetcher};
pub use i18n::{Dictionary, FETCH_FAILED, NO_DATA, ROOT_TITLE};
pub use id::{Counter, Id, Identifier};
pub use navigator::{Handle, Navigator, Phase, Signal, Snapshot};
pub use node::{Node, NodeId, Subtree, ROOT};
pub use settings::{Settings, SettingsBuilder};
pub use utils::trace_init;
pub use view::{ColumnView, Direction, Header, Motion, Offset, RenderOptions, Stage};
