use crate::{
    ColumnView, Counter, Header, Id, Identifier, Motion, Node, Offset, RenderOptions, Stage,
    Subtree,
};
use std::collections::BTreeMap;

/// Node ids reserved per column.  Column `n` numbers its nodes from `n << COLUMN_SHIFT`.
const COLUMN_SHIFT: u32 = 32;

/// A column rendered into an [`accesskit`] tree, so that a screen reader can walk it.
///
/// # Fields
///
/// * id - Owned [`Id`] used to generate unique ids for the nodes of this column.
/// * list - Id of the [`accesskit::Role::List`] node that holds the rows.
/// * nodes - [`BTreeMap`] used to look up nodes by node id.
/// * rows - The tree nodes behind the rows, in order, paired with the accesskit id of each.
/// * placeholder - Id of the "no data" label, while one is shown.
/// * container - Where the column was placed, if it has been.
/// * offset - Where the column currently rests.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct AccessColumn {
    #[getter(skip)]
    id: Id<Counter, u64>,
    list: accesskit::NodeId,
    nodes: BTreeMap<accesskit::NodeId, accesskit::Node>,
    rows: Vec<(accesskit::NodeId, Node)>,
    placeholder: Option<accesskit::NodeId>,
    container: Option<String>,
    offset: Offset,
}

impl AccessColumn {
    pub fn new(number: u64) -> Self {
        let mut id = Id::starting_at(number << COLUMN_SHIFT);
        let list = id.node_id();
        let mut nodes = BTreeMap::new();
        nodes.insert(list, Self::list_node(Vec::new()));
        Self {
            id,
            list,
            nodes,
            rows: Vec::new(),
            placeholder: None,
            container: None,
            offset: Offset::default(),
        }
    }

    /// Generates a node using the [`accesskit::Role::List`] role.
    pub fn list_node(children: Vec<accesskit::NodeId>) -> accesskit::Node {
        let mut builder = accesskit::NodeBuilder::new(accesskit::Role::List);
        builder.set_children(children);
        builder.build()
    }

    /// Generates a node using the [`accesskit::Role::ListItem`] role.
    pub fn row(node: &Node) -> accesskit::Node {
        let mut builder = accesskit::NodeBuilder::new(accesskit::Role::ListItem);
        builder.set_name(node.label());
        builder.build()
    }

    /// Generates a message using the [`accesskit::Role::Label`] role.
    pub fn message(text: &str) -> accesskit::Node {
        let mut builder = accesskit::NodeBuilder::new(accesskit::Role::Label);
        builder.set_name(text);
        builder.set_live(accesskit::Live::Polite);
        builder.build()
    }

    /// The tree nodes currently shown, in order.
    pub fn shown(&self) -> Vec<&Node> {
        self.rows.iter().map(|(_, node)| node).collect()
    }

    /// Returns a [`accesskit::TreeUpdate`] containing the full information for the column, with
    /// focus on the list.
    pub fn tree_update(&self) -> accesskit::TreeUpdate {
        accesskit::TreeUpdate {
            nodes: self.nodes.clone().into_iter().collect(),
            tree: Some(accesskit::Tree::new(self.list)),
            focus: self.list,
        }
    }

    fn push_rows(&mut self, children: &[Node]) {
        for child in children {
            let node_id = self.id.node_id();
            self.nodes.insert(node_id, Self::row(child));
            self.rows.push((node_id, child.clone()));
        }
    }

    fn rebuild_list(&mut self, options: &RenderOptions) {
        if let Some(placeholder) = self.placeholder.take() {
            self.nodes.remove(&placeholder);
        }
        let mut children = self.rows.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        if children.is_empty() {
            if let Some(label) = options.empty_label() {
                let message_id = self.id.node_id();
                self.nodes.insert(message_id, Self::message(label));
                self.placeholder = Some(message_id);
                children.push(message_id);
            }
        }
        self.nodes.insert(self.list, Self::list_node(children));
    }
}

impl ColumnView for AccessColumn {
    #[tracing::instrument(skip_all)]
    fn render(&mut self, subtree: &Subtree, options: &RenderOptions) {
        for (id, _) in self.rows.drain(..) {
            self.nodes.remove(&id);
        }
        self.push_rows(subtree.children());
        self.rebuild_list(options);
        tracing::trace!("Rendered {} rows for {}.", self.rows.len(), subtree.current().id());
    }

    #[tracing::instrument(skip_all)]
    fn append(&mut self, children: &[Node], options: &RenderOptions) {
        self.push_rows(children);
        self.rebuild_list(options);
        tracing::trace!("Appended {} rows.", children.len());
    }

    fn place_at(&mut self, container: &str) {
        self.container = Some(container.to_string());
    }

    fn destroy(self) {
        tracing::trace!("Column {:?} destroyed with {} rows.", self.list, self.rows.len());
    }
}

/// The `AccessStage` hands out [`AccessColumn`] instances, remembers every motion it was asked
/// to play, and keeps the header and the latest alert for announcement.
///
/// # Fields
///
/// * columns - Counts the columns created, so each gets its own range of node ids.
/// * banner - The header as last drawn.
/// * warning - The alert on display, cleared when the header next changes.
/// * motions - Every motion played, oldest first.
#[derive(Debug, Default, derive_getters::Getters)]
pub struct AccessStage {
    #[getter(skip)]
    columns: Counter,
    banner: Header,
    warning: Option<String>,
    motions: Vec<Motion>,
}

impl AccessStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The header as a label a screen reader will announce.
    pub fn header_node(&self) -> accesskit::Node {
        let mut builder = accesskit::NodeBuilder::new(accesskit::Role::Label);
        builder.set_name(self.banner.title().as_str());
        builder.set_live(accesskit::Live::Polite);
        builder.build()
    }
}

impl Stage for AccessStage {
    type View = AccessColumn;

    fn create(&mut self) -> AccessColumn {
        AccessColumn::new(self.columns.next())
    }

    fn animate(&mut self, view: &mut AccessColumn, motion: Motion) {
        tracing::trace!("Moving column {:?} to {}.", view.list, motion.to());
        view.offset = *motion.to();
        self.motions.push(motion);
    }

    fn header(&mut self, header: &Header) {
        tracing::debug!("Header now reads {}.", header.title());
        self.banner = header.clone();
        self.warning = None;
    }

    fn alert(&mut self, message: &str) {
        tracing::warn!("{message}");
        self.warning = Some(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> Node {
        Node::new(id.into(), Some(format!("Node {id}")), None, None)
    }

    #[test]
    fn render_replaces_rows() {
        let mut stage = AccessStage::new();
        let mut column = stage.create();
        let first = Subtree::new(Node::root(), None, vec![node("a"), node("b")], false);
        column.render(&first, &RenderOptions::default());
        let second = Subtree::new(Node::root(), None, vec![node("c")], false);
        column.render(&second, &RenderOptions::default());
        assert_eq!(column.shown(), vec![&node("c")]);
        // list plus one row
        assert_eq!(column.nodes().len(), 2);
    }

    #[test]
    fn append_keeps_earlier_rows() {
        let mut column = AccessColumn::new(1);
        let subtree = Subtree::new(Node::root(), None, vec![node("a")], true);
        column.render(&subtree, &RenderOptions::default());
        column.append(&[node("b"), node("c")], &RenderOptions::default());
        let labels = column.shown().iter().map(|node| node.label()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["Node a", "Node b", "Node c"]);
        let update = column.tree_update();
        assert_eq!(update.focus, *column.list());
        assert_eq!(update.nodes.len(), 4);
    }

    #[test]
    fn empty_columns_show_a_placeholder() {
        let mut column = AccessColumn::new(1);
        let options = RenderOptions::new(Some("No data".to_string()), false);
        column.render(&Subtree::empty(), &options);
        assert!(column.shown().is_empty());
        assert_eq!(column.nodes().len(), 2);
        column.append(&[node("late")], &RenderOptions::default());
        // the placeholder is gone again
        assert_eq!(column.nodes().len(), 2);
    }

    #[test]
    fn columns_do_not_share_ids() {
        let mut stage = AccessStage::new();
        let left = stage.create();
        let right = stage.create();
        assert_ne!(left.list(), right.list());
    }

    #[test]
    fn stage_tracks_offsets() {
        let mut stage = AccessStage::new();
        let mut column = stage.create();
        column.place_at("#navigation");
        stage.animate(&mut column, Motion::snap(Offset::Right));
        assert_eq!(column.offset(), &Offset::Right);
        assert_eq!(column.container().as_deref(), Some("#navigation"));
        stage.alert("Could not load");
        stage.header(&Header::new("Root".to_string(), false));
        assert_eq!(stage.warning(), &None);
        assert_eq!(stage.banner().title(), "Root");
        assert_eq!(stage.motions().len(), 1);
    }
}
