// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::fmt::Write as _;

use regex::Regex;

/// Tags serialised without a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "source", "track", "wbr",
];

/// One node of a content tree: an element or a raw text leaf.
///
/// Trees are plain owned data. They are cheap to clone and carry no document
/// position; the feed owns one per block, the assembler builds a synthetic
/// one per copy event, and the fragment parser builds one per paste event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentNode {
    Element(ElementNode),
    Text(String),
}

/// An element with a (lowercase) tag, attributes in source order, and
/// ordered children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementNode {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<ContentNode>,
}

impl ElementNode {
    pub fn new(
        tag: &str,
        attrs: Vec<(String, String)>,
        children: Vec<ContentNode>,
    ) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs,
            children,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _v)| n == name)
            .map(|(_n, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|v| v.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn contains_style(&self, name: &str, value: &str) -> bool {
        self.attr("style")
            .map(|v| {
                Regex::new(&format!(
                    r"(?i){}:\s*{};?",
                    regex::escape(name),
                    regex::escape(value)
                ))
                .map(|re| re.is_match(v))
                .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    pub fn children(&self) -> &[ContentNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<ContentNode> {
        &mut self.children
    }

    /// Children that are not whitespace-only text leaves.
    pub fn meaningful_children(&self) -> impl Iterator<Item = &ContentNode> {
        self.children.iter().filter(|c| !c.is_blank_text())
    }

    /// The single meaningful child, if there is exactly one.
    pub fn sole_child(&self) -> Option<&ContentNode> {
        let mut it = self.meaningful_children();
        let first = it.next()?;
        if it.next().is_some() {
            return None;
        }
        Some(first)
    }

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_html(&mut out);
        }
        out
    }
}

impl ContentNode {
    pub fn element(
        tag: &str,
        attrs: Vec<(String, String)>,
        children: Vec<ContentNode>,
    ) -> Self {
        Self::Element(ElementNode::new(tag, attrs, children))
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }

    pub fn is_element(&self, tag: &str) -> bool {
        matches!(self, Self::Element(el) if el.tag == tag)
    }

    pub fn is_blank_text(&self) -> bool {
        matches!(self, Self::Text(t) if t.chars().all(char::is_whitespace))
    }

    /// Concatenated text leaves of this subtree, in document order.
    pub fn text_content(&self) -> String {
        fn collect(node: &ContentNode, out: &mut String) {
            match node {
                ContentNode::Text(t) => out.push_str(t),
                ContentNode::Element(el) => {
                    for child in &el.children {
                        collect(child, out);
                    }
                }
            }
        }
        let mut out = String::new();
        collect(self, &mut out);
        out
    }

    /// Serialise the subtree as an HTML string, escaping text and attribute
    /// values. The inverse of the fragment parser for the host's own output.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Self::Text(t) => {
                out.push_str(&html_escape::encode_text(t));
            }
            Self::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    let _ = write!(
                        out,
                        " {}=\"{}\"",
                        name,
                        html_escape::encode_double_quoted_attribute(value)
                    );
                }
                if el.children.is_empty()
                    && VOID_TAGS.contains(&el.tag.as_str())
                {
                    out.push_str(" />");
                } else {
                    out.push('>');
                    for child in &el.children {
                        child.write_html(out);
                    }
                    out.push_str("</");
                    out.push_str(&el.tag);
                    out.push('>');
                }
            }
        }
    }
}
