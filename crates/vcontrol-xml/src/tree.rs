//! Arena-backed attributed tree with child and next-sibling links.

use std::fmt;
use std::path::{Path, PathBuf};

/// Index of a node inside its [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Node kinds kept in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) content: String,
    pub(crate) attributes: Vec<(String, String)>,
    /// Namespace declarations made on this element as `(prefix, uri)`.
    pub(crate) namespaces: Vec<(Option<String>, String)>,
    /// Resolved namespace URI of an element name.
    pub(crate) namespace: Option<String>,
    pub(crate) line: usize,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
}

impl NodeData {
    pub(crate) fn element(name: String, line: usize) -> Self {
        Self {
            name,
            kind: NodeKind::Element,
            content: String::new(),
            attributes: Vec::new(),
            namespaces: Vec::new(),
            namespace: None,
            line,
            first_child: None,
            next_sibling: None,
        }
    }

    pub(crate) fn text(content: String, line: usize) -> Self {
        Self {
            name: "#text".to_string(),
            kind: NodeKind::Text,
            content,
            ..Self::element(String::new(), line)
        }
    }

    pub(crate) fn comment(content: String, line: usize) -> Self {
        Self {
            name: "#comment".to_string(),
            kind: NodeKind::Comment,
            content,
            ..Self::element(String::new(), line)
        }
    }
}

/// Parsed document. Nodes unlinked by [`Document::strip_comments`] or
/// replaced by inclusion stay in the arena until the document is dropped.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) root: Option<NodeId>,
    pub(crate) source: Option<PathBuf>,
}

impl Document {
    /// Root element, if the document has one.
    pub fn root(&self) -> Option<Node<'_>> {
        self.root.map(|id| self.node(id))
    }

    /// Handle for a node id produced by this document.
    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node { doc: self, id }
    }

    /// File the document was loaded from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub(crate) fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    /// Move all nodes of `other` into this arena and return its re-indexed root.
    pub(crate) fn graft(&mut self, other: Document) -> Option<NodeId> {
        let offset = self.nodes.len();
        let shift = |id: NodeId| NodeId(id.0 + offset);
        for mut data in other.nodes {
            data.first_child = data.first_child.map(shift);
            data.next_sibling = data.next_sibling.map(shift);
            self.nodes.push(data);
        }
        other.root.map(shift)
    }

    /// Unlink `id` from the child chain of `parent`, `prev` being its left sibling.
    pub(crate) fn unlink(&mut self, parent: NodeId, prev: Option<NodeId>, id: NodeId) {
        let next = self.data(id).next_sibling;
        match prev {
            Some(prev) => self.data_mut(prev).next_sibling = next,
            None => self.data_mut(parent).first_child = next,
        }
        self.data_mut(id).next_sibling = None;
    }

    /// Put `replacement` where `id` sits in the child chain of `parent`.
    pub(crate) fn replace(
        &mut self,
        parent: NodeId,
        prev: Option<NodeId>,
        id: NodeId,
        replacement: NodeId,
    ) {
        let next = self.data(id).next_sibling;
        self.data_mut(replacement).next_sibling = next;
        match prev {
            Some(prev) => self.data_mut(prev).next_sibling = Some(replacement),
            None => self.data_mut(parent).first_child = Some(replacement),
        }
        self.data_mut(id).next_sibling = None;
    }

    /// Unlink every comment node at every depth and join the text nodes
    /// left adjacent. Returns the number of comments removed.
    pub fn strip_comments(&mut self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut removed = 0;
        let mut stack = vec![root];
        while let Some(parent) = stack.pop() {
            let mut prev = None;
            let mut cur = self.data(parent).first_child;
            while let Some(id) = cur {
                let next = self.data(id).next_sibling;
                match self.data(id).kind {
                    NodeKind::Comment => {
                        self.unlink(parent, prev, id);
                        removed += 1;
                    }
                    NodeKind::Element => {
                        stack.push(id);
                        prev = Some(id);
                    }
                    NodeKind::Text => {
                        let left = prev.filter(|&p| self.data(p).kind == NodeKind::Text);
                        match left {
                            // Text split by a removed comment joins its left neighbour.
                            Some(left) => {
                                let tail = std::mem::take(&mut self.data_mut(id).content);
                                self.data_mut(left).content.push_str(&tail);
                                self.unlink(parent, prev, id);
                            }
                            None => prev = Some(id),
                        }
                    }
                }
                cur = next;
            }
        }
        removed
    }
}

/// Borrowed, copyable handle to one node of a [`Document`].
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> Node<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Qualified element name, `#text` or `#comment`.
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    /// Element name without its namespace prefix.
    pub fn local_name(&self) -> &'a str {
        let name = self.name();
        name.split_once(':').map_or(name, |(_, local)| local)
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    /// Whether this is a text node consisting only of whitespace.
    pub fn is_blank(&self) -> bool {
        let data = self.data();
        data.kind == NodeKind::Text && data.content.trim().is_empty()
    }

    /// 1-based source line where the node starts.
    pub fn line(&self) -> usize {
        self.data().line
    }

    /// Raw content of a text or comment node; empty for elements.
    pub fn content(&self) -> &'a str {
        &self.data().content
    }

    /// Value of the attribute named exactly `name`.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.data()
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.data()
            .attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Resolved namespace URI of an element.
    pub fn namespace(&self) -> Option<&'a str> {
        self.data().namespace.as_deref()
    }

    /// Whether this element declares a namespace bound to `uri` under any prefix.
    pub fn declares_namespace(&self, uri: &str) -> bool {
        self.data().namespaces.iter().any(|(_, bound)| bound == uri)
    }

    pub fn first_child(&self) -> Option<Node<'a>> {
        self.data().first_child.map(|id| self.doc.node(id))
    }

    pub fn next_sibling(&self) -> Option<Node<'a>> {
        self.data().next_sibling.map(|id| self.doc.node(id))
    }

    pub fn children(&self) -> Children<'a> {
        Children {
            next: self.first_child(),
        }
    }

    /// Trimmed content of the first child when that child is a text node.
    pub fn text(&self) -> Option<&'a str> {
        self.first_child()
            .filter(|child| child.kind() == NodeKind::Text)
            .map(|child| child.content().trim())
    }

    fn data(&self) -> &'a NodeData {
        self.doc.data(self.id)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Element => write!(f, "<{}> (line {})", self.name(), self.line()),
            NodeKind::Text => write!(f, "text {:?} (line {})", self.content(), self.line()),
            NodeKind::Comment => write!(f, "comment (line {})", self.line()),
        }
    }
}

/// Iterator over the direct children of a node.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    next: Option<Node<'a>>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next_sibling();
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_text_and_links() {
        let doc = Document::parse_str(
            "<root a=\"1\">\n  <child b=\"x\">  value </child>\n  <empty/>\n</root>",
        )
        .expect("parse");
        let root = doc.root().expect("root");
        assert_eq!(root.name(), "root");
        assert_eq!(root.attribute("a"), Some("1"));
        assert_eq!(root.attribute("b"), None);

        let kinds: Vec<NodeKind> = root.children().map(|node| node.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Text,
                NodeKind::Element,
                NodeKind::Text,
                NodeKind::Element,
                NodeKind::Text
            ]
        );
        let child = root.children().find(|node| node.is_element()).expect("child");
        assert_eq!(child.text(), Some("value"));
        assert_eq!(child.line(), 2);
        let empty = child.next_sibling().and_then(|n| n.next_sibling()).expect("empty");
        assert_eq!(empty.name(), "empty");
        assert!(empty.first_child().is_none());
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn strip_comments_at_every_depth() {
        let mut doc = Document::parse_str(
            "<root><!-- a --><x><!-- b --><y/><!-- c --></x><!-- d --></root>",
        )
        .expect("parse");
        assert_eq!(doc.strip_comments(), 4);
        let root = doc.root().expect("root");
        let names: Vec<&str> = root.children().map(|node| node.name()).collect();
        assert_eq!(names, vec!["x"]);
        let x = root.first_child().expect("x");
        let inner: Vec<&str> = x.children().map(|node| node.name()).collect();
        assert_eq!(inner, vec!["y"]);
        assert_eq!(doc.strip_comments(), 0);
    }

    #[test]
    fn strip_comments_joins_split_text() {
        let mut doc = Document::parse_str(
            "<r><unit>\n  <!-- c -->UT</unit><addr>55<!-- a -->25<!-- b --></addr></r>",
        )
        .expect("parse");
        assert_eq!(doc.strip_comments(), 3);
        let root = doc.root().expect("root");
        let unit = root.first_child().expect("unit");
        assert_eq!(unit.children().count(), 1);
        assert_eq!(unit.text(), Some("UT"));
        let addr = unit.next_sibling().expect("addr");
        assert_eq!(addr.children().count(), 1);
        assert_eq!(addr.text(), Some("5525"));
    }

    #[test]
    fn namespace_declarations_are_recorded() {
        let doc = Document::parse_str(
            r#"<V-Control xmlns:vcontrol="http://www.openv.de/vcontrol"><a/></V-Control>"#,
        )
        .expect("parse");
        let root = doc.root().expect("root");
        assert!(root.declares_namespace("http://www.openv.de/vcontrol"));
        assert!(!root.declares_namespace("urn:other"));
        assert_eq!(root.attribute("xmlns:vcontrol"), None);
    }
}
