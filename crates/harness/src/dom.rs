//! Minimal arena document model for output capture
//!
//! Just enough of a document to hold the output sink and describe elements:
//! a flat node arena with Document/Element/Text kinds. No parsing, no
//! selectors, no layout.

use std::collections::BTreeMap;

/// Index of a node in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Element {
    tag_name: String,
    attrs: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            body: None,
        }
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// The `body` element, created under the document root on first access.
    pub fn body(&mut self) -> NodeId {
        if let Some(body) = self.body {
            return body;
        }
        let body = self.create_element("body");
        self.append_child(self.root, body);
        self.body = Some(body);
        body
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push_node(NodeKind::Element(Element {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
        }))
    }

    /// Create a detached text node.
    pub fn create_text_node(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    /// Append `child` under `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old_parent) = self.nodes[child.0].parent {
            self.nodes[old_parent.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(element) = &mut self.nodes[id.0].kind {
            element.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => element.attrs.get(name).map(String::as_str),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element.tag_name.as_str()),
            _ => None,
        }
    }

    /// Concatenated text of the subtree rooted at `id`, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for child in &self.nodes[id.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Whether `node` sits in the subtree rooted at `ancestor`.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_concatenates_in_order() {
        let mut doc = Document::new();
        let pre = doc.create_element("pre");
        let a = doc.create_text_node("hello\n");
        let b = doc.create_text_node("world\n");
        doc.append_child(pre, a);
        doc.append_child(pre, b);
        assert_eq!(doc.text_content(pre), "hello\nworld\n");
    }

    #[test]
    fn test_body_is_created_once() {
        let mut doc = Document::new();
        let first = doc.body();
        let second = doc.body();
        assert_eq!(first, second);
        assert_eq!(doc.tag_name(first), Some("body"));
    }

    #[test]
    fn test_contains_tracks_attachment() {
        let mut doc = Document::new();
        let body = doc.body();
        let div = doc.create_element("div");
        assert!(!doc.contains(body, div));
        doc.append_child(body, div);
        assert!(doc.contains(body, div));
    }

    #[test]
    fn test_attributes() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        assert_eq!(doc.attribute(div, "id"), None);
        doc.set_attribute(div, "id", "out");
        assert_eq!(doc.attribute(div, "id"), Some("out"));
    }
}
