use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::tree::{Document, NodeData, NodeId};
use crate::XmlError;

impl Document {
    /// Parse an XML document held in memory.
    ///
    /// Whitespace-only text is kept as text nodes; traversal code is expected
    /// to step over it.
    pub fn parse_str(xml: &str) -> Result<Document, XmlError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);
        let mut buf = Vec::new();
        let mut builder = TreeBuilder::default();
        let mut lines = LineCounter::new(xml);

        loop {
            let line = lines.line_at(reader.buffer_position());
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let data = element_data(&e, line)?;
                    builder.open(data)?;
                }
                Ok(Event::Empty(e)) => {
                    let data = element_data(&e, line)?;
                    builder.open(data)?;
                    builder.close()?;
                }
                Ok(Event::End(_)) => builder.close()?,
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|err| XmlError::Xml(err.to_string()))?;
                    builder.leaf(NodeData::text(text.into_owned(), line));
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    builder.leaf(NodeData::text(text, line));
                }
                Ok(Event::Comment(e)) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    builder.leaf(NodeData::comment(text, line));
                }
                Ok(Event::Eof) => break,
                Err(err) => {
                    return Err(XmlError::Xml(format!("line {line}: {err}")));
                }
                _ => {}
            }
            buf.clear();
        }

        builder.finish()
    }

    /// Read and parse the document stored at `path`.
    pub fn load(path: &Path) -> Result<Document, XmlError> {
        let xml = std::fs::read_to_string(path)?;
        let mut doc = Document::parse_str(&xml)?;
        debug!(path = %path.display(), nodes = doc.nodes.len(), "loaded xml document");
        doc.source = Some(path.to_path_buf());
        Ok(doc)
    }
}

fn element_data(event: &BytesStart<'_>, line: usize) -> Result<NodeData, XmlError> {
    let name = String::from_utf8_lossy(event.name().as_ref()).into_owned();
    let mut data = NodeData::element(name, line);
    for attr in event.attributes() {
        let attr = attr.map_err(|err| XmlError::Xml(format!("line {line}: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError::Xml(format!("line {line}: {err}")))?
            .into_owned();
        if key == "xmlns" {
            data.namespaces.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            data.namespaces.push((Some(prefix.to_string()), value));
        } else {
            data.attributes.push((key, value));
        }
    }
    Ok(data)
}

struct OpenElement {
    id: NodeId,
    last_child: Option<NodeId>,
    bindings: usize,
}

#[derive(Default)]
struct TreeBuilder {
    doc: Document,
    open: Vec<OpenElement>,
    scope: Vec<(Option<String>, String)>,
}

impl TreeBuilder {
    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.doc.nodes.len());
        self.doc.nodes.push(data);
        if let Some(parent) = self.open.last_mut() {
            match parent.last_child {
                Some(prev) => self.doc.nodes[prev.0].next_sibling = Some(id),
                None => self.doc.nodes[parent.id.0].first_child = Some(id),
            }
            parent.last_child = Some(id);
        }
        id
    }

    fn open(&mut self, mut data: NodeData) -> Result<(), XmlError> {
        if self.open.is_empty() && self.doc.root.is_some() {
            return Err(XmlError::Invalid(format!(
                "line {}: second root element <{}>",
                data.line, data.name
            )));
        }
        let bindings = data.namespaces.len();
        self.scope.extend(data.namespaces.iter().cloned());
        let prefix = data.name.split_once(':').map(|(prefix, _)| prefix.to_string());
        data.namespace = self
            .scope
            .iter()
            .rev()
            .find(|(bound, _)| *bound == prefix)
            .map(|(_, uri)| uri.clone());

        let id = self.push(data);
        if self.open.is_empty() {
            self.doc.root = Some(id);
        }
        self.open.push(OpenElement {
            id,
            last_child: None,
            bindings,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), XmlError> {
        let element = self
            .open
            .pop()
            .ok_or_else(|| XmlError::Xml("closing tag without an open element".into()))?;
        let keep = self.scope.len().saturating_sub(element.bindings);
        self.scope.truncate(keep);
        Ok(())
    }

    /// Text and comments outside the root element are dropped.
    fn leaf(&mut self, data: NodeData) {
        if self.open.is_empty() {
            return;
        }
        self.push(data);
    }

    fn finish(self) -> Result<Document, XmlError> {
        if let Some(element) = self.open.last() {
            let data = &self.doc.nodes[element.id.0];
            return Err(XmlError::Xml(format!(
                "line {}: element <{}> is never closed",
                data.line, data.name
            )));
        }
        if self.doc.root.is_none() {
            return Err(XmlError::Invalid("empty document".into()));
        }
        Ok(self.doc)
    }
}

/// Maps byte offsets to 1-based line numbers for monotonically increasing offsets.
struct LineCounter<'a> {
    text: &'a [u8],
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text: text.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, position: usize) -> usize {
        let end = position.min(self.text.len());
        if end > self.offset {
            self.line += self.text[self.offset..end]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.offset = end;
        }
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeKind;

    #[test]
    fn rejects_unbalanced_and_empty_documents() {
        assert!(matches!(
            Document::parse_str("<a><b></a>"),
            Err(XmlError::Xml(_))
        ));
        assert!(matches!(Document::parse_str("<a><b>"), Err(XmlError::Xml(_))));
        assert!(matches!(
            Document::parse_str("   "),
            Err(XmlError::Invalid(_))
        ));
        assert!(matches!(
            Document::parse_str("<a/><b/>"),
            Err(XmlError::Invalid(_))
        ));
    }

    #[test]
    fn entities_cdata_and_prolog() {
        let doc = Document::parse_str(
            "<?xml version=\"1.0\"?>\n<!-- prolog -->\n<a t=\"x &amp; y\">1 &lt; 2<b><![CDATA[<raw>]]></b></a>",
        )
        .expect("parse");
        let root = doc.root().expect("root");
        assert_eq!(root.line(), 3);
        assert_eq!(root.attribute("t"), Some("x & y"));
        assert_eq!(root.text(), Some("1 < 2"));
        let b = root.children().find(|n| n.is_element()).expect("b");
        assert_eq!(b.text(), Some("<raw>"));
        assert_eq!(b.first_child().map(|n| n.kind()), Some(NodeKind::Text));
    }

    #[test]
    fn resolves_prefixed_element_namespaces() {
        let doc = Document::parse_str(
            r#"<a xmlns:xi="http://www.w3.org/2001/XInclude"><xi:include href="x.xml"/><b/></a>"#,
        )
        .expect("parse");
        let root = doc.root().expect("root");
        let include = root.first_child().expect("include");
        assert_eq!(include.local_name(), "include");
        assert_eq!(
            include.namespace(),
            Some("http://www.w3.org/2001/XInclude")
        );
        assert_eq!(include.next_sibling().and_then(|b| b.namespace()), None);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Document::load(Path::new("/nonexistent/vcontrold.xml")).unwrap_err();
        assert!(matches!(err, XmlError::Io(_)));
    }
}
