//! Shared XML helpers for the export and GPX parsers.

use crate::utils::error::{ParseError, SourceLocation};
use roxmltree::{Document, Node, ParsingOptions};
use std::path::Path;

/// Parse an XML document and check its root element
///
/// DTDs are allowed: Apple Health exports embed an internal DTD subset.
pub fn parse_document<'input>(
    origin: &Path,
    content: &'input str,
    expected_root: &'static str,
) -> Result<Document<'input>, ParseError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };

    let doc = Document::parse_with_options(content, options).map_err(|e| {
        let pos = e.pos();
        ParseError::Xml {
            location: SourceLocation::at(origin, pos.row, pos.col),
            source: e,
        }
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != expected_root {
        return Err(ParseError::UnexpectedDocument {
            location: node_location(origin, root),
            expected: expected_root,
            found: root.tag_name().name().to_string(),
        });
    }

    Ok(doc)
}

/// Line/column of an element's start tag
pub fn node_location(origin: &Path, node: Node<'_, '_>) -> SourceLocation {
    let pos = node.document().text_pos_at(node.range().start);
    SourceLocation::at(origin, pos.row, pos.col)
}

/// Attribute that must be present and non-empty
pub fn required_attr<'a>(
    origin: &Path,
    node: Node<'a, '_>,
    name: &str,
) -> Result<&'a str, ParseError> {
    match node.attribute(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(missing_field(origin, node, name)),
    }
}

pub fn missing_field(origin: &Path, node: Node<'_, '_>, field: &str) -> ParseError {
    ParseError::MissingField {
        location: node_location(origin, node),
        element: node.tag_name().name().to_string(),
        field: field.to_string(),
    }
}

pub fn invalid_value(
    origin: &Path,
    node: Node<'_, '_>,
    field: &str,
    value: &str,
    reason: impl ToString,
) -> ParseError {
    ParseError::InvalidValue {
        location: node_location(origin, node),
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// First child element with the given local name
pub fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
}

/// Trimmed text of the first child element with the given local name
pub fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child_element(node, name)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
