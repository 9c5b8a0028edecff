// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The ordered conversion rule table.
//!
//! Each rule is a `(applies, render)` pair; [`rule_for`] returns the first
//! rule whose predicate matches, and the table ends with generic handlers
//! so exactly one rule renders every element. `render` receives the already
//! converted text of the element's children.

use once_cell::sync::Lazy;
use regex::Regex;
use strum_macros::Display;

use super::RenderCx;
use crate::content::{ContentNode, ElementNode};

/// Names for the table entries, used in diagnostics and tests.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum RuleName {
    Drop,
    Strikethrough,
    Math,
    Anchor,
    ListItem,
    InlinePreview,
    Image,
    CodeBlock,
    InlineCode,
    Emphasis,
    Strong,
    Paragraph,
    Heading,
    Quote,
    List,
    LineBreak,
    HorizontalRule,
    Transparent,
}

pub(crate) struct Rule {
    pub(crate) name: RuleName,
    pub(crate) applies: fn(&ElementNode, &RenderCx) -> bool,
    pub(crate) render: fn(&str, &ElementNode, &RenderCx) -> String,
}

/// Rules in priority order; overrides first, generic handlers last.
pub(crate) static RULES: &[Rule] = &[
    Rule {
        name: RuleName::Drop,
        applies: |el, _cx| matches!(el.tag(), "style" | "script"),
        render: |_children, _el, _cx| String::new(),
    },
    Rule {
        // External sources mark strikethrough with styled spans rather
        // than semantic tags.
        name: RuleName::Strikethrough,
        applies: |el, _cx| {
            matches!(el.tag(), "del" | "s" | "strike")
                || el.contains_style("text-decoration", "line-through")
        },
        render: |children, _el, _cx| format!("~~{children}~~"),
    },
    Rule {
        // Rendered math carries no recoverable source notation; dropping
        // it beats emitting garbled glyph text.
        name: RuleName::Math,
        applies: |el, _cx| el.tag() == "math" || el.has_class("katex"),
        render: |_children, _el, _cx| String::new(),
    },
    Rule {
        name: RuleName::Anchor,
        applies: |el, _cx| el.tag() == "a",
        render: render_anchor,
    },
    Rule {
        name: RuleName::ListItem,
        applies: |el, _cx| el.tag() == "li",
        render: render_list_item,
    },
    Rule {
        name: RuleName::InlinePreview,
        applies: |el, _cx| el.has_class("inline-preview"),
        render: render_inline_preview,
    },
    Rule {
        name: RuleName::Image,
        applies: |el, _cx| el.tag() == "img",
        render: render_image,
    },
    Rule {
        name: RuleName::CodeBlock,
        applies: |el, _cx| {
            el.tag() == "pre"
                && el
                    .sole_child()
                    .map(|child| child.is_element("code"))
                    .unwrap_or(false)
        },
        render: render_code_block,
    },
    Rule {
        name: RuleName::InlineCode,
        applies: |el, cx| el.tag() == "code" && !cx.in_code,
        render: |_children, el, _cx| inline_code(&element_text(el)),
    },
    Rule {
        name: RuleName::Emphasis,
        applies: |el, _cx| matches!(el.tag(), "em" | "i"),
        render: |children, _el, _cx| {
            if children.trim().is_empty() {
                String::new()
            } else {
                format!("_{children}_")
            }
        },
    },
    Rule {
        name: RuleName::Strong,
        applies: |el, _cx| matches!(el.tag(), "strong" | "b"),
        render: |children, _el, _cx| {
            if children.trim().is_empty() {
                String::new()
            } else {
                format!("**{children}**")
            }
        },
    },
    Rule {
        name: RuleName::Paragraph,
        applies: |el, _cx| el.tag() == "p",
        render: |children, _el, _cx| format!("\n\n{children}\n\n"),
    },
    Rule {
        name: RuleName::Heading,
        applies: |el, _cx| {
            matches!(el.tag(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
        },
        render: render_heading,
    },
    Rule {
        name: RuleName::Quote,
        applies: |el, _cx| el.tag() == "blockquote",
        render: render_quote,
    },
    Rule {
        name: RuleName::List,
        applies: |el, _cx| matches!(el.tag(), "ul" | "ol"),
        render: render_list,
    },
    Rule {
        name: RuleName::LineBreak,
        applies: |el, _cx| el.tag() == "br",
        render: |_children, _el, _cx| String::from("\n"),
    },
    Rule {
        name: RuleName::HorizontalRule,
        applies: |el, _cx| el.tag() == "hr",
        render: |_children, _el, _cx| String::from("\n\n---\n\n"),
    },
];

/// Elements no other rule claims pass their converted children through.
pub(crate) static FALLBACK: Rule = Rule {
    name: RuleName::Transparent,
    applies: |_el, _cx| true,
    render: |children, _el, _cx| children.to_owned(),
};

pub(crate) fn rule_for(el: &ElementNode, cx: &RenderCx) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.applies)(el, cx))
        .unwrap_or(&FALLBACK)
}

/// Raw text of an element's subtree.
fn element_text(el: &ElementNode) -> String {
    el.children()
        .iter()
        .map(|child| child.text_content())
        .collect()
}

fn render_anchor(children: &str, el: &ElementNode, _cx: &RenderCx) -> String {
    // A link whose only content is an image adds nothing over the image
    // itself, which already renders with its own target.
    if el
        .sole_child()
        .map(|child| child.is_element("img"))
        .unwrap_or(false)
    {
        return children.to_owned();
    }
    let href = el.attr("href").unwrap_or("");
    let visible = element_text(el);
    if !href.is_empty() && visible.trim() == href {
        return href.to_owned();
    }
    format!("[{children}]({href})")
}

fn render_list_item(
    children: &str,
    _el: &ElementNode,
    cx: &RenderCx,
) -> String {
    let content = children
        .trim_start_matches('\n')
        .trim_end_matches('\n')
        // Continuation lines hang under the marker with a two-space
        // indent; four spaces would read as code in the target dialect.
        .replace('\n', "\n  ");
    let prefix = match cx.parent {
        Some(parent) if parent.tag() == "ol" => {
            let start = parent
                .attr("start")
                .and_then(|start| start.parse::<usize>().ok())
                .unwrap_or(1);
            format!("{}. ", start + cx.index)
        }
        _ => String::from("* "),
    };
    format!("{prefix}{content}\n")
}

fn render_inline_preview(
    children: &str,
    el: &ElementNode,
    cx: &RenderCx,
) -> String {
    let Some(href) = first_link_href(el) else {
        return children.to_owned();
    };
    // When the link that generated this preview is also in the input, the
    // preview would duplicate it.
    if has_generating_link(cx.root, href) {
        String::new()
    } else {
        children.to_owned()
    }
}

fn first_link_href(el: &ElementNode) -> Option<&str> {
    for child in el.children() {
        if let ContentNode::Element(child_el) = child {
            if child_el.tag() == "a" {
                if let Some(href) = child_el.attr("href") {
                    return Some(href);
                }
            }
            if let Some(href) = first_link_href(child_el) {
                return Some(href);
            }
        }
    }
    None
}

fn has_generating_link(node: &ContentNode, href: &str) -> bool {
    match node {
        ContentNode::Text(_) => false,
        ContentNode::Element(el) => {
            if el.has_class("inline-preview") {
                return false;
            }
            if el.tag() == "a" && el.attr("href") == Some(href) {
                return true;
            }
            el.children()
                .iter()
                .any(|child| has_generating_link(child, href))
        }
    }
}

static ATTRIBUTE_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\n+\s*)+").unwrap());

fn render_image(
    _children: &str,
    el: &ElementNode,
    _cx: &RenderCx,
) -> String {
    // Custom pictographs carry their textual form in `alt`.
    if el.has_class("emoji") {
        if let Some(alt) = el.attr("alt") {
            return alt.to_owned();
        }
    }
    let Some(src) = el.attr("src").or_else(|| el.attr("href")) else {
        return el.attr("alt").unwrap_or("").to_owned();
    };
    let title = el.attr("title").or_else(|| el.attr("alt")).unwrap_or("");
    let title = ATTRIBUTE_NOISE.replace_all(title, "\n");
    format!("[{title}]({src})")
}

static LANGUAGE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"language-(\S+)").unwrap());

fn render_code_block(
    children: &str,
    el: &ElementNode,
    cx: &RenderCx,
) -> String {
    let Some(code_node) = el.sole_child() else {
        return children.to_owned();
    };
    let code = code_node.text_content();
    if !code.contains('\n') {
        return inline_code(&code);
    }

    let language = code_node
        .as_element()
        .and_then(|code_el| language_of(code_el, cx))
        .unwrap_or_default();
    let fence = fence_for(&code);
    let body = code.strip_suffix('\n').unwrap_or(&code);
    format!("\n\n{fence}{language}\n{body}\n{fence}\n\n")
}

fn language_of(code_el: &ElementNode, cx: &RenderCx) -> Option<String> {
    if let Some(class) = code_el.attr("class") {
        if let Some(captures) = LANGUAGE_CLASS.captures(class) {
            return Some(captures[1].to_owned());
        }
    }
    // Highlighted blocks carry the language on their wrapper instead.
    let parent = cx.parent?;
    if parent.has_class("highlight") {
        return parent.attr("data-code-language").map(str::to_owned);
    }
    None
}

/// Inline code with a delimiter the content cannot collide with: grow the
/// backtick run until it no longer occurs in the code, and pad with one
/// space when the code starts with a backtick or both starts and ends with
/// a space.
fn inline_code(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }
    let mut delimiter = String::from("`");
    while code.contains(&delimiter) {
        delimiter.push('`');
    }
    let padded = code.starts_with('`')
        || (code.starts_with(' ') && code.ends_with(' '));
    let padding = if padded { " " } else { "" };
    format!("{delimiter}{padding}{code}{padding}{delimiter}")
}

/// A fence must be longer than any fence-character run inside the code, and
/// at least three characters.
fn fence_for(code: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for c in code.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

fn render_heading(
    children: &str,
    el: &ElementNode,
    _cx: &RenderCx,
) -> String {
    let level = el.tag()[1..].parse::<usize>().unwrap_or(1);
    format!("\n\n{} {children}\n\n", "#".repeat(level))
}

fn render_quote(children: &str, _el: &ElementNode, _cx: &RenderCx) -> String {
    let content = children.trim_matches('\n');
    let quoted: Vec<String> =
        content.lines().map(|line| format!("> {line}")).collect();
    format!("\n\n{}\n\n", quoted.join("\n"))
}

fn render_list(children: &str, _el: &ElementNode, cx: &RenderCx) -> String {
    let content = children.trim_matches('\n');
    let nested_in_item = cx
        .parent
        .map(|parent| parent.tag() == "li")
        .unwrap_or(false);
    if nested_in_item {
        format!("\n{content}")
    } else {
        format!("\n\n{content}\n\n")
    }
}
