//! JSON <-> tree conversion
//!
//! Follows the usual JSON-to-XML bridge conventions:
//! - object properties become child elements
//! - arrays become repeated elements sharing the property name
//! - `@name` properties become attributes, `#text` becomes the element text
//! - `null` becomes an empty element

use crate::error::KilnError;
use crate::tree::document::{Document, NodeId};
use indexmap::IndexMap;
use serde_json::{Map, Value};

pub const ATTRIBUTE_PREFIX: &str = "@";
pub const TEXT_KEY: &str = "#text";

/// Options for importing JSON into a `Document`
#[derive(Debug, Clone)]
pub struct JsonOptions {
    /// Wrap the JSON value in a root element with this name.
    /// When absent the JSON must be an object with a single property.
    pub root_name: Option<String>,

    /// Element name for items of a top-level array
    pub array_item_name: String,
}

impl Default for JsonOptions {
    fn default() -> Self {
        JsonOptions {
            root_name: None,
            array_item_name: String::from("item"),
        }
    }
}

impl JsonOptions {
    pub fn with_root_name(root_name: impl Into<String>) -> Self {
        JsonOptions {
            root_name: Some(root_name.into()),
            ..Default::default()
        }
    }
}

impl Document {
    /// Build a document from a JSON value
    pub fn from_json(value: &Value, options: &JsonOptions) -> Result<Self, KilnError> {
        if let Some(root_name) = options.root_name.as_deref().filter(|r| !r.is_empty()) {
            let mut doc = Document::new(root_name);
            let root = doc.root();
            fill_element(&mut doc, root, value, options);
            return Ok(doc);
        }

        let Value::Object(obj) = value else {
            return Err(KilnError::InvalidDocument(
                "a root name is required unless the JSON is an object with one property".to_string(),
            ));
        };

        let mut elements = obj.iter().filter(|(k, _)| !k.starts_with(ATTRIBUTE_PREFIX));
        let (root_name, root_value) = match (elements.next(), elements.next()) {
            (Some(single), None) => single,
            _ => {
                return Err(KilnError::InvalidDocument(format!(
                    "JSON root object must have exactly one property, found {}",
                    obj.len()
                )))
            }
        };

        if root_value.is_array() {
            return Err(KilnError::InvalidDocument(format!(
                "property '{}' is an array and would produce several root elements",
                root_name
            )));
        }

        let mut doc = Document::new(root_name.as_str());
        let root = doc.root();
        fill_element(&mut doc, root, root_value, options);
        Ok(doc)
    }

    /// Render the document as JSON, `{"<root>": ...}`
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert(self.name(self.root()).to_string(), self.element_to_json(self.root()));
        Value::Object(out)
    }

    /// Render a single element's content as JSON
    pub fn element_to_json(&self, id: NodeId) -> Value {
        let node = self.node(id);
        if node.children().is_empty() && node.attributes().is_empty() {
            return match node.text() {
                Some(text) => Value::String(text.to_string()),
                None => Value::Null,
            };
        }

        let mut obj = Map::new();
        for (name, value) in node.attributes() {
            obj.insert(format!("{}{}", ATTRIBUTE_PREFIX, name), Value::String(value.clone()));
        }
        if let Some(text) = node.text() {
            obj.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }

        let mut grouped: IndexMap<&str, Vec<Value>> = IndexMap::new();
        for &child in node.children() {
            grouped
                .entry(self.name(child))
                .or_default()
                .push(self.element_to_json(child));
        }
        for (name, mut values) in grouped {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            obj.insert(name.to_string(), value);
        }

        Value::Object(obj)
    }
}

/// Fill an existing element with the content of a JSON value
fn fill_element(doc: &mut Document, element: NodeId, value: &Value, options: &JsonOptions) {
    match value {
        Value::Object(obj) => {
            for (key, child) in obj {
                if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                    doc.set_attribute(element, attr, scalar_text(child));
                } else if key == TEXT_KEY {
                    doc.set_text(element, scalar_text(child));
                } else {
                    append_value(doc, element, key, child, options);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                append_value(doc, element, &options.array_item_name, item, options);
            }
        }
        Value::Null => {}
        scalar => doc.set_text(element, scalar_text(scalar)),
    }
}

/// Append `value` under `parent` as one or more elements called `name`
fn append_value(doc: &mut Document, parent: NodeId, name: &str, value: &Value, options: &JsonOptions) {
    match value {
        Value::Array(items) => {
            for item in items {
                append_value(doc, parent, name, item, options);
            }
        }
        Value::Object(_) => {
            let child = doc.append_element(parent, name);
            fill_element(doc, child, value, options);
        }
        Value::Null => {
            doc.append_element(parent, name);
        }
        scalar => {
            doc.append_leaf(parent, name, scalar_text(scalar));
        }
    }
}

/// String form of a scalar JSON value
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_property_root() {
        let input = json!({"root": {"node1": "Value", "count": 3, "active": true}});
        let doc = Document::from_json(&input, &JsonOptions::default()).unwrap();

        let root = doc.root();
        assert_eq!(doc.name(root), "root");
        let children = doc.children(root);
        assert_eq!(children.len(), 3);
        assert_eq!(doc.text(children[1]), Some("3"));
        assert_eq!(doc.text(children[2]), Some("true"));
    }

    #[test]
    fn test_arrays_become_repeated_elements() {
        let input = json!({"orders": {"order": [{"id": 1}, {"id": 2}], "tags": ["a", "b"]}});
        let doc = Document::from_json(&input, &JsonOptions::default()).unwrap();

        assert_eq!(doc.elements_by_name("order").len(), 2);
        let tags = doc.elements_by_name("tags");
        assert_eq!(tags.len(), 2);
        assert_eq!(doc.text(tags[1]), Some("b"));
    }

    #[test]
    fn test_attributes_text_and_null() {
        let input = json!({"book": {"@lang": "en", "title": {"@short": "P&P", "#text": "Pride"}, "isbn": null}});
        let doc = Document::from_json(&input, &JsonOptions::default()).unwrap();

        let root = doc.root();
        assert_eq!(doc.attribute(root, "lang"), Some("en"));
        let title = doc.children(root)[0];
        assert_eq!(doc.attribute(title, "short"), Some("P&P"));
        assert!(doc.is_leaf(title));
        assert!(doc.is_empty(doc.children(root)[1]));
    }

    #[test]
    fn test_root_name_wraps_top_level_array() {
        let input = json!([{"ProductID": 1}, {"ProductID": 2}]);
        let doc = Document::from_json(&input, &JsonOptions::with_root_name("products")).unwrap();

        let root = doc.root();
        assert_eq!(doc.name(root), "products");
        assert_eq!(doc.children(root).len(), 2);
        assert_eq!(doc.name(doc.children(root)[0]), "item");
    }

    #[test]
    fn test_invalid_roots() {
        let options = JsonOptions::default();
        assert!(matches!(
            Document::from_json(&json!({"a": 1, "b": 2}), &options),
            Err(KilnError::InvalidDocument(_))
        ));
        assert!(matches!(
            Document::from_json(&json!([1, 2]), &options),
            Err(KilnError::InvalidDocument(_))
        ));
        assert!(matches!(
            Document::from_json(&json!({"rows": [1, 2]}), &options),
            Err(KilnError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_to_json_groups_repeated_children() {
        let input = json!({"root": {"currency": "USD", "item": [{"id": "1"}, {"id": "2"}]}});
        let doc = Document::from_json(&input, &JsonOptions::default()).unwrap();

        assert_eq!(doc.to_json(), input);
    }
}
