use crate::{Node, Subtree};
use std::time::Duration;

/// How a column should present a list.
///
/// * empty_label - Placeholder text shown when there are no children, `None` otherwise.
/// * show_search - Whether the search box is visible.  It hides for an empty column unless a
///   search is what emptied it.
#[derive(Debug, Default, Clone, PartialEq, Eq, derive_new::new, derive_getters::Getters)]
pub struct RenderOptions {
    empty_label: Option<String>,
    show_search: bool,
}

/// One rendered level of the tree.
///
/// The navigator never draws anything itself.  It asks a column to show a subtree, to take on a
/// few more rows when another page arrives, to find a place in the document, and finally to
/// clean up after itself.
pub trait ColumnView: Send + 'static {
    /// Replaces the rows of the column with the children of `subtree`.
    fn render(&mut self, subtree: &Subtree, options: &RenderOptions);
    /// Adds rows below the existing ones.
    fn append(&mut self, children: &[Node], options: &RenderOptions);
    /// Inserts the column into the container named by `container`.
    fn place_at(&mut self, container: &str);
    /// Removes the column and releases whatever it holds.
    fn destroy(self);
}

/// Horizontal resting places for a column.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Offset {
    Left,
    #[default]
    Center,
    Right,
}

/// Which way a transition moves through the tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Direction {
    /// Deeper: the new column enters from the right, the old one leaves to the left.
    In,
    /// Shallower: the new column enters from the left, the old one leaves to the right.
    Out,
}

impl Direction {
    /// Where the incoming column waits before the slide.
    pub fn entry(&self) -> Offset {
        match self {
            Self::In => Offset::Right,
            Self::Out => Offset::Left,
        }
    }

    /// Where the outgoing column ends up.
    pub fn exit(&self) -> Offset {
        match self {
            Self::In => Offset::Left,
            Self::Out => Offset::Right,
        }
    }
}

/// A property change for the stage to play: move a column to `to` over `duration`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, derive_new::new, derive_getters::Getters)]
pub struct Motion {
    to: Offset,
    duration: Duration,
}

impl Motion {
    /// An instant move, for placing a column before it slides.
    pub fn snap(to: Offset) -> Self {
        Self::new(to, Duration::ZERO)
    }
}

/// The header above the columns.
///
/// * title - The label of the current node, or the translated root title.
/// * back - Whether a back button leads to the parent.
#[derive(Debug, Default, Clone, PartialEq, Eq, derive_new::new, derive_getters::Getters)]
pub struct Header {
    title: String,
    back: bool,
}

/// The surface the navigator plays on: it makes columns, moves them, and owns the header.
///
/// The stage decides how a move is drawn.  The navigator only says where a column goes and how
/// long it should take, then waits that long before it destroys the column that left.
pub trait Stage: Send + 'static {
    type View: ColumnView;

    /// Creates a new, empty column.
    fn create(&mut self) -> Self::View;
    /// Starts moving `view`.
    fn animate(&mut self, view: &mut Self::View, motion: Motion);
    /// Redraws the header.
    fn header(&mut self, header: &Header);
    /// Shows a transient error indicator.
    fn alert(&mut self, message: &str);
}
