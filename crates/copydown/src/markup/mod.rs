// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The markup conversion engine.
//!
//! Turns a content tree into canonical lightweight markup through an ordered
//! rule table ([`rules`]): for each element the converted text of its
//! children is computed first, then the first applicable rule renders the
//! element. Custom rules (code fences, list numbering, link collapsing,
//! preview deduplication) come first; a generic fallback handles everything
//! else.
//!
//! Converters are plain values configured at construction. In particular
//! text escaping is a per-instance option, not a process-wide default.

mod rules;

pub use rules::RuleName;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::content::{ContentNode, ElementNode};

/// Tags that are never unwrapped by the single-wrapper pre-pass: their
/// element identity changes how their content converts.
const PROTECTED_WRAPPERS: &[&str] = &["pre", "ol", "ul", "a", "code"];

/// Tags treated as block-level for whitespace purposes.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "ul", "ol", "li", "blockquote", "pre", "h1", "h2", "h3",
    "h4", "h5", "h6", "hr", "table", "thead", "tbody", "tr", "td", "th",
    "header", "footer", "section", "article",
];

/// Conversion configuration.
#[derive(Clone, Copy, Debug)]
pub struct ConverterOptions {
    /// Backslash-escape markup punctuation in text leaves. Off by default:
    /// escaped punctuation is visible noise in the target dialect, and code
    /// content stays unambiguous through delimiter selection instead.
    pub escape_text: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self { escape_text: false }
    }
}

/// The conversion engine. Stateless apart from its options; `convert` may
/// be called any number of times.
#[derive(Clone, Debug, Default)]
pub struct MarkupConverter {
    options: ConverterOptions,
}

/// Per-node context handed to rules.
pub(crate) struct RenderCx<'a> {
    /// The whole (whitespace-collapsed) input, for rules that look beyond
    /// their own subtree.
    pub(crate) root: &'a ContentNode,
    /// The element containing the current node, if any.
    pub(crate) parent: Option<&'a ElementNode>,
    /// Position of the current node among its parent's element children.
    pub(crate) index: usize,
    /// Whether an ancestor is a `pre` or `code` element.
    pub(crate) in_code: bool,
}

impl MarkupConverter {
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Convert a content tree to canonical markup text.
    ///
    /// `tree` is a container whose children are the input's top-level
    /// nodes, as produced by the fragment parser and the assembler.
    pub fn convert(&self, tree: &ContentNode) -> String {
        let working = collapse_whitespace(tree.clone(), false);
        let top: &[ContentNode] = match &working {
            ContentNode::Element(root) => root.children(),
            ContentNode::Text(_) => std::slice::from_ref(&working),
        };
        let top = unwrap_single_wrapper(top);
        let text = self.convert_nodes(top, None, &working, false);
        postprocess(&text)
    }

    fn convert_nodes(
        &self,
        nodes: &[ContentNode],
        parent: Option<&ElementNode>,
        root: &ContentNode,
        in_code: bool,
    ) -> String {
        let mut out = String::new();
        let mut element_index = 0;
        for node in nodes {
            let piece = match node {
                ContentNode::Text(text) => {
                    if self.options.escape_text && !in_code {
                        escape_markup(text)
                    } else {
                        text.clone()
                    }
                }
                ContentNode::Element(el) => {
                    let cx = RenderCx {
                        root,
                        parent,
                        index: element_index,
                        in_code,
                    };
                    element_index += 1;
                    self.convert_element(el, &cx)
                }
            };
            out = join_blocks(out, &piece);
        }
        out
    }

    fn convert_element(&self, el: &ElementNode, cx: &RenderCx) -> String {
        let child_in_code =
            cx.in_code || el.tag() == "pre" || el.tag() == "code";
        let children_text =
            self.convert_nodes(el.children(), Some(el), cx.root, child_in_code);
        let rule = rules::rule_for(el, cx);
        (rule.render)(&children_text, el, cx)
    }
}

/// If the input consists of one element (plus whitespace) whose tag does
/// not change how content converts, use its inner content instead: pasted
/// fragments are routinely wrapped in a purely presentational container.
fn unwrap_single_wrapper(nodes: &[ContentNode]) -> &[ContentNode] {
    let mut meaningful = nodes.iter().filter(|n| !n.is_blank_text());
    if let (Some(ContentNode::Element(el)), None) =
        (meaningful.next(), meaningful.next())
    {
        if !PROTECTED_WRAPPERS.contains(&el.tag()) {
            return el.children();
        }
    }
    nodes
}

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\r\n]+").unwrap());

fn is_block_element(node: &ContentNode) -> bool {
    node.as_element()
        .map(|el| BLOCK_TAGS.contains(&el.tag()))
        .unwrap_or(false)
}

/// Source-formatting whitespace is meaningless outside `pre`: runs collapse
/// to one space, and whitespace that only separates block elements is
/// dropped.
fn collapse_whitespace(node: ContentNode, in_pre: bool) -> ContentNode {
    match node {
        ContentNode::Text(text) => {
            if in_pre {
                ContentNode::Text(text)
            } else {
                ContentNode::Text(
                    WHITESPACE_RUN.replace_all(&text, " ").into_owned(),
                )
            }
        }
        ContentNode::Element(el) => {
            let in_pre = in_pre || el.tag() == "pre";
            let is_block_parent = BLOCK_TAGS.contains(&el.tag());
            let collapsed: Vec<ContentNode> = el
                .children()
                .iter()
                .cloned()
                .map(|child| collapse_whitespace(child, in_pre))
                .collect();

            let mut kept: Vec<ContentNode> = Vec::new();
            for (i, child) in collapsed.iter().enumerate() {
                if in_pre || !child.is_blank_text() {
                    kept.push(child.clone());
                    continue;
                }
                if matches!(child, ContentNode::Text(t) if t.is_empty()) {
                    continue;
                }
                let after_block = kept
                    .last()
                    .map(is_block_element)
                    .unwrap_or(is_block_parent);
                let before_block = collapsed
                    .get(i + 1)
                    .map(is_block_element)
                    .unwrap_or(is_block_parent);
                if !(after_block || before_block) {
                    kept.push(ContentNode::text(" "));
                }
            }
            ContentNode::Element(ElementNode::new(
                el.tag(),
                el.attrs().to_vec(),
                kept,
            ))
        }
    }
}

/// The escape set applied to text leaves when `escape_text` is on.
static ESCAPES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\\", r"\\"),
        (r"\*", r"\*"),
        (r"(?m)^-", r"\-"),
        (r"(?m)^\+ ", r"\+ "),
        (r"(?m)^(=+)", r"\$1"),
        (r"(?m)^(#{1,6}) ", r"\$1 "),
        (r"`", r"\`"),
        (r"(?m)^~~~", r"\~~~"),
        (r"\[", r"\["),
        (r"\]", r"\]"),
        (r"(?m)^>", r"\>"),
        (r"_", r"\_"),
        (r"(?m)^(\d+)\. ", r"$1\. "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (Regex::new(pattern).unwrap(), replacement)
    })
    .collect()
});

fn escape_markup(text: &str) -> String {
    let mut out = text.to_owned();
    for (pattern, replacement) in ESCAPES.iter() {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    out
}

/// Join two converted chunks, merging the trailing and leading newlines of
/// the seam into at most one blank line. Adjacent block renderings each
/// bring their own separation; without the merge every seam would double it.
fn join_blocks(output: String, piece: &str) -> String {
    let trimmed_end = output.trim_end_matches('\n').len();
    let trimmed_start = piece.len() - piece.trim_start_matches('\n').len();
    let newlines = (output.len() - trimmed_end).max(trimmed_start).min(2);

    let mut joined = output;
    joined.truncate(trimmed_end);
    joined.push_str(&"\n\n"[..newlines]);
    joined.push_str(piece.trim_start_matches('\n'));
    joined
}

static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static ESCAPED_LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([^\w\n]*)(\d+)\\\. ").unwrap());
static BLANK_BEFORE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\n+( *(?:\*|\d+\.) )").unwrap());

/// Whole-text cleanup after rule conversion.
fn postprocess(text: &str) -> String {
    let text = BLANK_RUN.replace_all(text, "\n\n");
    // An escaped ordered-list marker at a line start is a real list item;
    // escaping is only needed mid-paragraph.
    let text = ESCAPED_LIST_MARKER.replace_all(&text, "${1}${2}. ");
    // A blank line in front of a list marker splits adjacent items apart.
    let text = BLANK_BEFORE_MARKER.replace_all(&text, "\n$1");
    text.trim().to_owned()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::content::parse_fragment;

    fn convert(html: &str) -> String {
        MarkupConverter::default().convert(&parse_fragment(html).unwrap())
    }

    fn convert_escaped(html: &str) -> String {
        MarkupConverter::new(ConverterOptions { escape_text: true })
            .convert(&parse_fragment(html).unwrap())
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(convert("hello world"), "hello world");
    }

    #[test]
    fn source_whitespace_collapses() {
        assert_eq!(
            convert("<p>one\n   two</p>\n<p>three</p>"),
            "one two\n\nthree"
        );
    }

    #[test]
    fn single_presentational_wrapper_is_unwrapped() {
        assert_eq!(
            convert(r#"<div style="color: red"><p>a</p><p>b</p></div>"#),
            "a\n\nb"
        );
    }

    #[test]
    fn wrapped_bold_survives_one_unwrap() {
        assert_eq!(convert("<p><strong>bold</strong></p>"), "**bold**");
    }

    #[test]
    fn protected_wrappers_are_not_unwrapped() {
        assert_eq!(convert("<ul><li>only</li></ul>"), "* only");
        assert_eq!(
            convert(r#"<a href="https://e.com">text</a>"#),
            "[text](https://e.com)"
        );
        assert_eq!(convert("<pre><code>x</code></pre>"), "`x`");
    }

    #[test]
    fn escaping_is_off_by_default() {
        assert_eq!(convert("<p>2 * 3 = 6 [sic]</p>"), "2 * 3 = 6 [sic]");
    }

    #[test]
    fn escaping_applies_to_text_when_enabled() {
        assert_eq!(
            convert_escaped("<p>2 * 3 _six_ [sic]</p>"),
            r"2 \* 3 \_six\_ \[sic\]"
        );
    }

    #[test]
    fn escaping_never_touches_code() {
        assert_eq!(
            convert_escaped("<pre><code>a * b</code></pre>"),
            "`a * b`"
        );
    }

    #[test]
    fn escaped_list_marker_is_unescaped_at_line_start() {
        assert_eq!(convert_escaped("<p>1. agenda</p>"), "1. agenda");
    }

    #[test]
    fn blank_line_before_a_list_marker_collapses() {
        assert_eq!(postprocess("* a\n\n* b"), "* a\n* b");
        assert_eq!(postprocess("3. a\n\n4. b"), "3. a\n4. b");
    }

    #[test]
    fn blank_runs_collapse_to_one_blank_line() {
        assert_eq!(postprocess("a\n\n\n\nb"), "a\n\nb");
    }
}
