use std::path::{Path, PathBuf};

use tracing::debug;

use crate::tree::{Document, NodeId, NodeKind};
use crate::XmlError;

/// Namespace URI identifying XInclude elements.
pub const XINCLUDE_NAMESPACE: &str = "http://www.w3.org/2001/XInclude";

/// Nested inclusion deeper than this is treated as a cycle.
const MAX_INCLUDE_DEPTH: usize = 16;

impl Document {
    /// Replace every `xi:include` element by the root element of the file it names.
    ///
    /// `href` is resolved against `base_dir`, or against the directory of the
    /// including file for nested inclusions. The include element itself does
    /// not survive. Returns the number of substitutions performed.
    pub fn expand_includes(&mut self, base_dir: &Path) -> Result<usize, XmlError> {
        let Some(root) = self.root else {
            return Ok(0);
        };
        let mut performed = 0;
        let mut stack: Vec<(NodeId, PathBuf, usize)> = vec![(root, base_dir.to_path_buf(), 0)];

        while let Some((parent, base, depth)) = stack.pop() {
            let mut prev = None;
            let mut cur = self.data(parent).first_child;
            while let Some(id) = cur {
                let next = self.data(id).next_sibling;
                if !self.is_include(id) {
                    if self.data(id).kind == NodeKind::Element {
                        stack.push((id, base.clone(), depth));
                    }
                    prev = Some(id);
                    cur = next;
                    continue;
                }

                if depth >= MAX_INCLUDE_DEPTH {
                    return Err(XmlError::Include(format!(
                        "line {}: nesting deeper than {MAX_INCLUDE_DEPTH} levels (cycle?)",
                        self.data(id).line
                    )));
                }
                let path = self.include_target(id, &base)?;
                let included = Document::load(&path)
                    .map_err(|err| XmlError::Include(format!("{}: {err}", path.display())))?;
                let grafted = self.graft(included).ok_or_else(|| {
                    XmlError::Include(format!("{}: document has no root", path.display()))
                })?;
                self.replace(parent, prev, id, grafted);
                debug!(path = %path.display(), depth, "xinclude performed");
                performed += 1;

                let nested_base = path.parent().map(Path::to_path_buf).unwrap_or_default();
                stack.push((grafted, nested_base, depth + 1));
                prev = Some(grafted);
                cur = next;
            }
        }

        Ok(performed)
    }

    fn is_include(&self, id: NodeId) -> bool {
        let node = self.node(id);
        node.is_element()
            && node.local_name() == "include"
            && node.namespace() == Some(XINCLUDE_NAMESPACE)
    }

    fn include_target(&self, id: NodeId, base: &Path) -> Result<PathBuf, XmlError> {
        let node = self.node(id);
        if let Some(mode) = node.attribute("parse") {
            if mode != "xml" {
                return Err(XmlError::Include(format!(
                    "line {}: parse=\"{mode}\" is not supported",
                    node.line()
                )));
            }
        }
        let href = node.attribute("href").ok_or_else(|| {
            XmlError::Include(format!("line {}: include without href", node.line()))
        })?;
        Ok(base.join(href))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MAIN: &str = r#"<V-Control xmlns:vcontrol="http://www.openv.de/vcontrol">
  <extern xmlns:xi="http://www.w3.org/2001/XInclude">
    <xi:include href="vito.xml" parse="xml"/>
  </extern>
  <tail/>
</V-Control>"#;

    #[test]
    fn include_is_replaced_by_included_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("vito.xml"),
            "<vito>\n  <devices><device ID=\"2098\"/></devices>\n</vito>",
        )
        .expect("write include");

        let mut doc = Document::parse_str(MAIN).expect("parse main");
        assert_eq!(doc.expand_includes(dir.path()).expect("expand"), 1);

        let root = doc.root().expect("root");
        let ext = root.children().find(|n| n.name() == "extern").expect("extern");
        let names: Vec<&str> = ext
            .children()
            .filter(|n| n.is_element())
            .map(|n| n.name())
            .collect();
        assert_eq!(names, vec!["vito"]);
        let vito = ext.children().find(|n| n.is_element()).expect("vito");
        let device = vito
            .children()
            .find(|n| n.name() == "devices")
            .and_then(|d| d.first_child())
            .expect("device");
        assert_eq!(device.attribute("ID"), Some("2098"));
        assert!(root.children().any(|n| n.name() == "tail"));
    }

    #[test]
    fn nested_includes_resolve_relative_to_including_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("sub")).expect("mkdir");
        fs::write(
            dir.path().join("vito.xml"),
            r#"<vito xmlns:xi="http://www.w3.org/2001/XInclude"><xi:include href="sub/inner.xml"/></vito>"#,
        )
        .expect("write outer");
        fs::write(dir.path().join("sub/inner.xml"), "<inner/>").expect("write inner");

        let mut doc = Document::parse_str(MAIN).expect("parse main");
        assert_eq!(doc.expand_includes(dir.path()).expect("expand"), 2);
        let inner = doc
            .root()
            .and_then(|root| root.children().find(|n| n.name() == "extern"))
            .and_then(|ext| ext.children().find(|n| n.is_element()))
            .and_then(|vito| vito.first_child())
            .expect("inner");
        assert_eq!(inner.name(), "inner");
    }

    #[test]
    fn self_inclusion_is_cut_off() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("vito.xml"),
            r#"<vito xmlns:xi="http://www.w3.org/2001/XInclude"><xi:include href="vito.xml"/></vito>"#,
        )
        .expect("write loop");
        let mut doc = Document::parse_str(MAIN).expect("parse main");
        let err = doc.expand_includes(dir.path()).unwrap_err();
        assert!(matches!(err, XmlError::Include(_)));
    }

    #[test]
    fn missing_target_and_missing_href_fail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut doc = Document::parse_str(MAIN).expect("parse main");
        assert!(matches!(
            doc.expand_includes(dir.path()),
            Err(XmlError::Include(_))
        ));

        let mut doc = Document::parse_str(
            r#"<a xmlns:xi="http://www.w3.org/2001/XInclude"><xi:include/></a>"#,
        )
        .expect("parse");
        assert!(matches!(
            doc.expand_includes(dir.path()),
            Err(XmlError::Include(_))
        ));
    }

    #[test]
    fn documents_without_includes_are_untouched() {
        let mut doc = Document::parse_str("<a><include href=\"x\"/></a>").expect("parse");
        assert_eq!(doc.expand_includes(Path::new(".")).expect("expand"), 0);
        assert_eq!(
            doc.root().and_then(|r| r.first_child()).map(|n| n.name()),
            Some("include")
        );
    }
}
