//! XML text rendering for documents

use crate::tree::document::{Document, NodeId};
use std::borrow::Cow;
use std::fmt;

/// Escape text for XML output
pub fn encode_text(input: &str) -> Cow<'_, str> {
    if !input.bytes().any(|b| matches!(b, b'<' | b'>' | b'&' | b'"' | b'\'')) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

impl Document {
    /// Serialize to XML text. `indent` of `None` produces a single line.
    pub fn to_xml_string(&self, indent: Option<usize>) -> String {
        let mut out = String::new();
        self.write_element(self.root(), 0, indent, &mut out);
        out
    }

    fn write_element(&self, id: NodeId, level: usize, indent: Option<usize>, out: &mut String) {
        let node = self.node(id);
        if let Some(width) = indent {
            out.push_str(&" ".repeat(level * width));
        }

        out.push('<');
        out.push_str(node.name());
        for (name, value) in node.attributes() {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&encode_text(value));
            out.push('"');
        }

        if node.children().is_empty() && node.text().is_none() {
            out.push_str(" />");
        } else if node.children().is_empty() {
            out.push('>');
            out.push_str(&encode_text(node.text().unwrap_or_default()));
            self.write_close(node.name(), out);
        } else {
            out.push('>');
            if let Some(text) = node.text() {
                out.push_str(&encode_text(text));
            }
            for &child in node.children() {
                if indent.is_some() {
                    out.push('\n');
                }
                self.write_element(child, level + 1, indent, out);
            }
            if let Some(width) = indent {
                out.push('\n');
                out.push_str(&" ".repeat(level * width));
            }
            self.write_close(node.name(), out);
        }
    }

    fn write_close(&self, name: &str, out: &mut String) {
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml_string(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_output() {
        let mut doc = Document::new("book");
        let root = doc.root();
        doc.append_leaf(root, "title", "Pride & Prejudice");
        let other = doc.append_element(root, "otherInfo");
        doc.set_attribute(other, "kind", "\"meta\"");
        doc.append_element(other, "PONum");

        assert_eq!(
            doc.to_string(),
            "<book><title>Pride &amp; Prejudice</title>\
             <otherInfo kind=\"&quot;meta&quot;\"><PONum /></otherInfo></book>"
        );
    }

    #[test]
    fn test_indented_output() {
        let mut doc = Document::new("root");
        let root = doc.root();
        let item = doc.append_element(root, "item");
        doc.append_leaf(item, "id", "1");

        assert_eq!(
            doc.to_xml_string(Some(2)),
            "<root>\n  <item>\n    <id>1</id>\n  </item>\n</root>"
        );
    }

    #[test]
    fn test_encode_text_borrows_when_clean() {
        assert!(matches!(encode_text("plain"), Cow::Borrowed(_)));
        assert_eq!(encode_text("a<b"), "a&lt;b");
    }
}
