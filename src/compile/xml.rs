//! Field access helpers over a parsed `roxmltree` document.
//!
//! The authoring formats only use elements and attributes, so these helpers
//! turn "missing" and "not a number" into [`CompileError`]s with the element
//! and attribute named.

use super::CompileError;
use roxmltree::{Document, Node};

/// Parse bytes as an XML document.
pub(crate) fn parse_document(bytes: &[u8]) -> Result<Document<'_>, CompileError> {
    let text = std::str::from_utf8(bytes).map_err(CompileError::Encoding)?;
    Document::parse(text).map_err(CompileError::Xml)
}

/// Get the root element, checking its tag name.
pub(crate) fn expect_root<'a, 'input>(
    doc: &'a Document<'input>,
    tag: &str,
) -> Result<Node<'a, 'input>, CompileError> {
    let root = doc.root_element();
    if root.tag_name().name() != tag {
        return Err(CompileError::UnexpectedRoot {
            expected: tag.to_string(),
            found: root.tag_name().name().to_string(),
        });
    }
    Ok(root)
}

/// Iterate over the child elements with a given tag, in document order.
pub(crate) fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

/// Get the first child element with a given tag.
pub(crate) fn first_child<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
) -> Result<Node<'a, 'input>, CompileError> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
        .ok_or_else(|| CompileError::MissingElement {
            parent: describe(node),
            element: tag.to_string(),
        })
}

/// Get a required attribute.
pub(crate) fn required_attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, CompileError> {
    node.attribute(name).ok_or_else(|| CompileError::MissingAttribute {
        element: describe(node),
        attribute: name.to_string(),
    })
}

/// Get a required attribute as a number.
pub(crate) fn required_number(node: Node<'_, '_>, name: &str) -> Result<f64, CompileError> {
    let raw = required_attr(node, name)?;
    to_number(node, name, raw)
}

/// Get an optional attribute as a number.
pub(crate) fn optional_number(node: Node<'_, '_>, name: &str) -> Result<Option<f64>, CompileError> {
    node.attribute(name).map(|raw| to_number(node, name, raw)).transpose()
}

/// Get an optional attribute as a boolean flag.
pub(crate) fn optional_flag(node: Node<'_, '_>, name: &str) -> Result<Option<bool>, CompileError> {
    let Some(raw) = node.attribute(name) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        _ => Err(CompileError::InvalidValue {
            element: describe(node),
            attribute: name.to_string(),
            value: raw.to_string(),
            expected: "a boolean",
        }),
    }
}

fn to_number(node: Node<'_, '_>, name: &str, raw: &str) -> Result<f64, CompileError> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite()).ok_or_else(|| {
        CompileError::InvalidValue {
            element: describe(node),
            attribute: name.to_string(),
            value: raw.to_string(),
            expected: "a number",
        }
    })
}

/// Describe an element for error messages: `<frame name="idle">` or `<levels>`.
pub(crate) fn describe(node: Node<'_, '_>) -> String {
    let tag = node.tag_name().name();
    match node.attribute("name").or_else(|| node.attribute("id")) {
        Some(label) => format!("<{} \"{}\">", tag, label),
        None => format!("<{}>", tag),
    }
}
