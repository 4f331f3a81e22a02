/// The reserved identifier for the top of the tree.
pub const ROOT: &str = "root";

/// Identifies a node in the remote tree.
///
/// Servers hand out ids as strings or numbers, so we keep them as strings.  When the server
/// leaves the id off the top of the tree, we fill in [`ROOT`].
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Display,
    derive_more::Deref,
    derive_more::From,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn root() -> Self {
        Self(ROOT.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One entry in the navigable tree: a folder, a category, a record.
///
/// # Fields
///
/// * id - The [`NodeId`] of the node, or the root sentinel.
/// * name - Display label, when the server provides one.
/// * children_link - URL that lists the children of this node.  A node without one is a leaf.
/// * item - The raw object the server sent.  `None` for a root node the server did not identify.
#[derive(
    Debug,
    Clone,
    PartialEq,
    derive_new::new,
    derive_getters::Getters,
    derive_setters::Setters,
    serde::Serialize,
    serde::Deserialize,
)]
#[setters(prefix = "with_", into)]
pub struct Node {
    id: NodeId,
    name: Option<String>,
    children_link: Option<String>,
    item: Option<serde_json::Value>,
}

impl Node {
    /// A bare root node, as used before the first load and as the default parent.
    pub fn root() -> Self {
        Self::new(NodeId::root(), None, None, None)
    }

    pub fn has_children(&self) -> bool {
        self.children_link.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.id.is_root()
    }

    /// Text to show for the node, the name if present and the id otherwise.
    pub fn label(&self) -> &str {
        match &self.name {
            Some(name) => name,
            None => &self.id,
        }
    }
}

/// The normalized result of one fetch: where we are, where we came from, and what lies below.
///
/// The order of `children` is whatever the server chose, and we keep it.
#[derive(
    Debug,
    Clone,
    PartialEq,
    derive_new::new,
    derive_getters::Getters,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Subtree {
    current: Node,
    parent: Option<Node>,
    children: Vec<Node>,
    has_next_page: bool,
}

impl Subtree {
    /// An empty subtree at the root, shown until the first response arrives.
    pub fn empty() -> Self {
        Self::new(Node::root(), None, Vec::new(), false)
    }

    /// Looks up a child by id.
    pub fn child(&self, id: &NodeId) -> Option<&Node> {
        self.children.iter().find(|child| child.id() == id)
    }

    /// Ids of the children, in order.
    pub fn child_ids(&self) -> Vec<NodeId> {
        self.children.iter().map(|child| child.id().clone()).collect()
    }

    /// Adds the children of a later page behind the ones already here.
    pub fn extend(&mut self, children: &[Node], has_next_page: bool) {
        self.children.extend_from_slice(children);
        self.has_next_page = has_next_page;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, link: Option<&str>) -> Node {
        Node::new(id.into(), Some(id.to_uppercase()), link.map(String::from), None)
    }

    #[test]
    fn labels_fall_back_to_id() {
        let named = node("a", None);
        assert_eq!(named.label(), "A");
        let anonymous = Node::new("7".into(), None, None, None);
        assert_eq!(anonymous.label(), "7");
    }

    #[test]
    fn extend_keeps_the_prefix() {
        let mut subtree = Subtree::new(Node::root(), None, vec![node("a", None)], true);
        subtree.extend(&[node("b", Some("/b")), node("c", None)], false);
        let expected: Vec<NodeId> = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(subtree.child_ids(), expected);
        assert!(!*subtree.has_next_page());
        assert!(subtree.child(&"b".into()).is_some_and(Node::has_children));
    }
}
