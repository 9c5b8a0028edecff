// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{FragDom, FragDomCreator, FragHandle, FragNode};
use crate::content::{ContentNode, ElementNode};

/// Failure to build a content tree from a clipboard payload.
///
/// Callers treat this as "nothing to transform" and let the platform's
/// default paste proceed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtmlParseError {
    pub parse_errors: Vec<String>,
}

impl fmt::Display for HtmlParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "could not parse clipboard markup: {}",
            self.parse_errors.join(", ")
        )
    }
}

/// `<meta>` tags appear at the front of most clipboard payloads and upset
/// fragment parsing, so they are stripped before the parser sees the input.
static META_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<meta[^>]*>").unwrap());

/// Parse a clipboard HTML payload into a content tree.
///
/// The returned tree is rooted in a synthetic `div` holding the fragment's
/// top-level nodes. Tags are preserved as-is; deciding which of them matter
/// is the conversion engine's job, not the parser's.
pub fn parse_fragment(html: &str) -> Result<ContentNode, HtmlParseError> {
    let cleaned = META_TAG.replace_all(html, "");
    let fragdom = FragDomCreator::parse(&cleaned).map_err(|err| {
        HtmlParseError {
            parse_errors: err.parse_errors,
        }
    })?;
    Ok(fragdom_to_content(&fragdom))
}

/// Convert a [`FragDom`] into an owned content tree, dropping garbage and
/// ignored nodes and flattening the `<html>` wrapper the fragment parser
/// inserts around every input.
fn fragdom_to_content(dom: &FragDom) -> ContentNode {
    let mut children = Vec::new();
    if let FragNode::Document(doc) = dom.get_node(dom.document_handle()) {
        for handle in &doc.children {
            convert_into(dom, handle, &mut children);
        }
    }
    ContentNode::Element(ElementNode::new("div", Vec::new(), children))
}

fn convert_into(
    dom: &FragDom,
    handle: &FragHandle,
    out: &mut Vec<ContentNode>,
) {
    match dom.get_node(handle) {
        FragNode::Element(el) => {
            let tag = el.name.local.as_ref();
            if tag == "html" {
                // The wrapper element is parser scaffolding, not content.
                for child in &el.children {
                    convert_into(dom, child, out);
                }
            } else {
                let mut children = Vec::new();
                for child in &el.children {
                    convert_into(dom, child, &mut children);
                }
                out.push(ContentNode::Element(ElementNode::new(
                    tag,
                    el.attrs.clone(),
                    children,
                )));
            }
        }
        FragNode::Text(text) => {
            out.push(ContentNode::Text(text.content.clone()));
        }
        FragNode::Document(_) | FragNode::Ignored => {}
    }
}

#[cfg(test)]
mod test {
    use speculoos::{assert_that, AssertionFailure, Spec};

    use super::*;

    trait Roundtrips<T> {
        fn roundtrips(&self);
    }

    impl<'s, T> Roundtrips<T> for Spec<'s, T>
    where
        T: AsRef<str>,
    {
        fn roundtrips(&self) {
            let subject = self.subject.as_ref();
            let tree = parse_fragment(subject).unwrap();
            let output = match &tree {
                ContentNode::Element(root) => root.inner_html(),
                ContentNode::Text(_) => panic!("root must be an element"),
            };
            if output != subject {
                AssertionFailure::from_spec(self)
                    .with_expected(String::from(subject))
                    .with_actual(output)
                    .fail();
            }
        }
    }

    #[test]
    fn parse_plain_text() {
        assert_that!("some text").roundtrips();
    }

    #[test]
    fn parse_simple_tag() {
        assert_that!("<strong>sdfds</strong>").roundtrips();
    }

    #[test]
    fn parse_tag_with_surrounding_text() {
        assert_that!("before <strong> within </strong> after").roundtrips();
        assert_that!("before<strong>within</strong>after").roundtrips();
    }

    #[test]
    fn parse_nested_tags() {
        assert_that!("<b><em>ZZ</em></b>").roundtrips();
        assert_that!("X<b>Y<em>ZZ</em>0</b>1").roundtrips();
    }

    #[test]
    fn parse_tags_with_attributes() {
        assert_that!(r#"<b><a href="http://example.com">ZZ</a></b>"#)
            .roundtrips();
    }

    #[test]
    fn parse_preserves_unknown_tags() {
        assert_that!("<section><p>inside</p></section>").roundtrips();
    }

    #[test]
    fn parse_preserves_pre_whitespace() {
        assert_that!("<pre><code>a\n  b\n</code></pre>").roundtrips();
    }

    #[test]
    fn meta_tags_are_stripped_before_parsing() {
        let with_meta = concat!(
            "<meta charset='utf-8'>",
            r#"<meta http-equiv="content-type" content="text/html">"#,
            "<p>Content</p>"
        );
        assert_eq!(
            parse_fragment(with_meta).unwrap(),
            parse_fragment("<p>Content</p>").unwrap()
        );
    }

    #[test]
    fn comments_are_dropped() {
        let tree = parse_fragment("<!--StartFragment--><b>x</b>").unwrap();
        let root = tree.as_element().unwrap();
        assert_eq!(root.children().len(), 1);
        assert!(root.children()[0].is_element("b"));
    }

    #[test]
    fn entities_are_decoded_into_text() {
        let tree = parse_fragment("a &amp; b").unwrap();
        assert_eq!(tree.text_content(), "a & b");
    }

    #[test]
    fn root_wraps_multiple_top_level_nodes() {
        let tree = parse_fragment("<p>a</p><p>b</p>").unwrap();
        let root = tree.as_element().unwrap();
        assert_eq!(root.tag(), "div");
        assert_eq!(root.children().len(), 2);
    }
}
