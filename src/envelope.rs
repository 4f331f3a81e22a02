//! Turns the raw JSON a server returns into a [`Subtree`].
//!
//! The server speaks a HAL-flavored dialect:
//!
//! ```json
//! {
//!   "id": "1",
//!   "name": "A",
//!   "_links": { "children": { "href": "/a/children" } },
//!   "_embedded": {
//!     "items": [ { "id": "2", "name": "B", "_links": { "children": { "href": "/b/children" } } } ],
//!     "parent": { "id": "root" }
//!   },
//!   "pages": 3
//! }
//! ```
//!
//! The names of the id, name, result list and children link fields vary between backends, so
//! they live in [`Keys`].
use crate::{Node, NodeId, Snag, Subtree, Trek};
use serde_json::{Map, Value};

const EMBEDDED: &str = "_embedded";
const LINKS: &str = "_links";
const HREF: &str = "href";
const PARENT: &str = "parent";
const PAGES: &str = "pages";

/// Field names used to read nodes out of a response.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    derive_getters::Getters,
    derive_setters::Setters,
    serde::Serialize,
    serde::Deserialize,
)]
#[setters(prefix = "with_", into)]
#[serde(default)]
pub struct Keys {
    id: String,
    name: String,
    result: String,
    children_link: String,
}

impl Default for Keys {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            name: "name".to_string(),
            result: "items".to_string(),
            children_link: "children".to_string(),
        }
    }
}

impl Keys {
    /// Parses the response to a request for `page` into a [`Subtree`].
    ///
    /// A response without an id is the root of the tree: the current node gets the root
    /// sentinel for an id and no item.  A parent without an id is likewise the root.  When the
    /// current node is not the root and the response names no parent, the parent is the root.
    ///
    /// Will [`Snag::MalformedResponse`] if the response is not an object, has no `_embedded`
    /// object, carries a result list that is not an array, or lists a child without an id.
    #[tracing::instrument(skip_all)]
    pub fn subtree(&self, raw: &Value, page: u32) -> Trek<Subtree> {
        let object = raw
            .as_object()
            .ok_or_else(|| Snag::MalformedResponse("response is not an object".to_string()))?;
        let embedded = object
            .get(EMBEDDED)
            .and_then(Value::as_object)
            .ok_or_else(|| Snag::MalformedResponse(format!("missing `{EMBEDDED}`")))?;

        let current = match self.read_id(object) {
            Some(id) => self.read_node(id, object, Some(raw.clone())),
            None => self.read_node(NodeId::root(), object, None),
        };

        let parent = match embedded.get(PARENT).and_then(Value::as_object) {
            Some(parent) => {
                let id = self.read_id(parent).unwrap_or_else(NodeId::root);
                Some(self.read_node(id, parent, Some(Value::Object(parent.clone()))))
            }
            None if current.is_root() => None,
            None => Some(Node::root()),
        };

        let children = match embedded.get(&self.result) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| self.child(item))
                .collect::<Trek<Vec<Node>>>()?,
            Some(_) => {
                return Err(Snag::MalformedResponse(format!(
                    "`{}` is not an array",
                    self.result
                )))
            }
            None => Vec::new(),
        };

        let pages = object.get(PAGES).and_then(Value::as_u64).unwrap_or(0);
        let has_next_page = pages > u64::from(page);
        tracing::trace!(
            "Parsed {} with {} children, page {page} of {pages}.",
            current.id(),
            children.len()
        );
        Ok(Subtree::new(current, parent, children, has_next_page))
    }

    /// Parses one entry of the result list.
    pub fn child(&self, raw: &Value) -> Trek<Node> {
        let object = raw
            .as_object()
            .ok_or_else(|| Snag::MalformedResponse("child is not an object".to_string()))?;
        let id = self
            .read_id(object)
            .ok_or_else(|| Snag::MalformedResponse(format!("child without `{}`", self.id)))?;
        Ok(self.read_node(id, object, Some(raw.clone())))
    }

    fn read_id(&self, object: &Map<String, Value>) -> Option<NodeId> {
        match object.get(&self.id)? {
            Value::String(id) => Some(NodeId::from(id.as_str())),
            Value::Number(id) => Some(NodeId::from(id.to_string())),
            _ => None,
        }
    }

    fn read_node(&self, id: NodeId, object: &Map<String, Value>, item: Option<Value>) -> Node {
        let name = object
            .get(&self.name)
            .and_then(Value::as_str)
            .map(str::to_string);
        let children_link = object
            .get(LINKS)
            .and_then(|links| links.get(&self.children_link))
            .and_then(|link| link.get(HREF))
            .and_then(Value::as_str)
            .map(str::to_string);
        Node::new(id, name, children_link, item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_defaults_when_id_missing() {
        let raw = json!({ "name": "Everything", "_embedded": { "items": [] } });
        let subtree = Keys::default().subtree(&raw, 1).unwrap();
        assert!(subtree.current().is_root());
        assert_eq!(subtree.current().item(), &None);
        assert_eq!(subtree.parent(), &None);
        assert!(subtree.children().is_empty());
    }

    #[test]
    fn children_keep_server_order() {
        let raw = json!({
            "id": "root",
            "name": "Root",
            "_embedded": { "items": [
                { "id": "2", "name": "B" },
                { "id": 1, "name": "A", "_links": { "children": { "href": "/a/children" } } }
            ] },
            "pages": 2
        });
        let subtree = Keys::default().subtree(&raw, 1).unwrap();
        let expected: Vec<NodeId> = vec!["2".into(), "1".into()];
        assert_eq!(subtree.child_ids(), expected);
        assert_eq!(
            subtree.children()[1].children_link().as_deref(),
            Some("/a/children")
        );
        assert!(!subtree.children()[0].has_children());
        assert!(*subtree.has_next_page());
        assert!(!*Keys::default().subtree(&raw, 2).unwrap().has_next_page());
    }

    #[test]
    fn unidentified_parent_is_root() {
        let raw = json!({
            "id": "7",
            "_embedded": { "items": [], "parent": { "_links": { "children": { "href": "/top" } } } }
        });
        let subtree = Keys::default().subtree(&raw, 1).unwrap();
        let parent = subtree.parent().as_ref().unwrap();
        assert!(parent.is_root());
        assert_eq!(parent.children_link().as_deref(), Some("/top"));
    }

    #[test]
    fn non_root_without_parent_gets_root_parent() {
        let raw = json!({ "id": "7", "_embedded": {} });
        let subtree = Keys::default().subtree(&raw, 1).unwrap();
        assert_eq!(subtree.parent(), &Some(Node::root()));
    }

    #[test]
    fn custom_keys() {
        let keys = Keys::default()
            .with_id("uuid")
            .with_name("title")
            .with_result("folders")
            .with_children_link("sub");
        let raw = json!({
            "uuid": "f",
            "title": "Folder",
            "_embedded": { "folders": [
                { "uuid": "g", "title": "Inner", "_links": { "sub": { "href": "/g" } } }
            ] }
        });
        let subtree = keys.subtree(&raw, 1).unwrap();
        assert_eq!(subtree.current().label(), "Folder");
        assert_eq!(subtree.children()[0].label(), "Inner");
        assert_eq!(subtree.children()[0].children_link().as_deref(), Some("/g"));
    }

    #[test]
    fn malformed_responses_are_typed() {
        let keys = Keys::default();
        for raw in [
            json!([]),
            json!({ "id": "1" }),
            json!({ "_embedded": { "items": {} } }),
            json!({ "_embedded": { "items": [{ "name": "nameless" }] } })
        ] {
            assert!(
                matches!(keys.subtree(&raw, 1), Err(Snag::MalformedResponse(_))),
                "{raw} should be malformed"
            );
        }
    }
}
