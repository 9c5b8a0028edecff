// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The paste decision cascade.
//!
//! [`decide_paste`] inspects the clipboard payload and the composer state
//! and decides what should happen; actually mutating the field (and the
//! insert-then-replace dance that keeps undo working) is the composer's
//! job. [`PasteAction::Native`] means "do nothing, let the platform paste".

use topic_links::TopicLink;
use url::Url;

use crate::content::{parse_fragment, ContentNode};
use crate::markup::MarkupConverter;

/// What the clipboard offered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PastePayload {
    /// The plain-text representation. Always present, possibly empty.
    pub text: String,
    /// The structured-markup representation, when the source provided one.
    pub html: Option<String>,
}

/// The composer state the decision depends on, gathered by the host's
/// cursor and selection helpers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComposerContext {
    /// The currently selected text, if any.
    pub selected_text: Option<String>,
    /// Whether the cursor sits inside a code region.
    pub in_code_block: bool,
    /// Whether the cursor sits immediately after a link-opening marker.
    pub after_link_open: bool,
    /// Whether the user held the modifier that forces a plain paste.
    pub plain_paste_forced: bool,
}

/// The outcome of a paste decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PasteAction {
    /// Replace the selection with a link labelled by the selected text.
    LinkOverSelection { url: String },
    /// Insert `url`, select it, then replace the selection with the
    /// shorthand, so that undo recovers the raw URL.
    TopicShorthand { url: String, shorthand: String },
    /// The payload is a single image; an upload handler takes over.
    DeferToImageUpload,
    /// Insert the converted markup (inserting then replacing the plain
    /// text, so undo recovers the pre-conversion text).
    InsertConverted { text: String },
    /// No custom handling; the platform's plain-text paste proceeds.
    Native,
}

/// Decide how a paste into the composer should be handled.
pub fn decide_paste(
    payload: &PastePayload,
    composer: &ComposerContext,
    converter: &MarkupConverter,
) -> PasteAction {
    let trimmed = payload.text.trim();

    if is_bare_url(trimmed) {
        if let Some(selected) = &composer.selected_text {
            if !selected.trim().is_empty() && !is_bare_url(selected.trim()) {
                return PasteAction::LinkOverSelection {
                    url: trimmed.to_owned(),
                };
            }
        }
        if !composer.plain_paste_forced
            && !composer.in_code_block
            && !composer.after_link_open
        {
            if let Some(link) = TopicLink::from_url(trimmed) {
                return PasteAction::TopicShorthand {
                    url: trimmed.to_owned(),
                    shorthand: link.shorthand(),
                };
            }
        }
    }

    if let Some(html) = &payload.html {
        if !composer.in_code_block && !composer.plain_paste_forced {
            // A payload that does not parse is nothing to transform.
            if let Ok(tree) = parse_fragment(html) {
                if is_single_image(&tree) {
                    return PasteAction::DeferToImageUpload;
                }
                let text = converter.convert(&tree);
                if !text.is_empty() {
                    return PasteAction::InsertConverted { text };
                }
            }
        }
    }

    PasteAction::Native
}

/// A bare URL: one http(s) URL and nothing else.
fn is_bare_url(text: &str) -> bool {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return false;
    }
    match Url::parse(text) {
        Ok(url) => url.scheme() == "http" || url.scheme() == "https",
        Err(_) => false,
    }
}

/// Whether the parsed payload is exactly one image element.
fn is_single_image(tree: &ContentNode) -> bool {
    let Some(root) = tree.as_element() else {
        return false;
    };
    root.sole_child()
        .map(|child| child.is_element("img"))
        .unwrap_or(false)
}
