// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The copy pipeline: resolve, assemble, convert.
//!
//! `None` always means "let the platform's native copy proceed"; the custom
//! path produces no observable side effect in that case. The platform layer
//! owns the clipboard mechanics: it writes [`CopyPayload::html`] into an
//! off-screen element, points the selection at it, lets native copy run and
//! restores the user's ranges on the next turn of its event loop.

use crate::assembler::assemble;
use crate::feed::FeedAccessor;
use crate::markup::MarkupConverter;
use crate::selection::{resolve_selection, SelectionRange};

/// Replacement clipboard content for a multi-message copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyPayload {
    /// The assembled tree serialised as HTML, for the off-screen element.
    pub html: String,
    /// The canonical markup text.
    pub text: String,
}

/// Produce the replacement clipboard content for a selection, or `None`
/// when native copy should handle it: the selection did not resolve, it
/// resolved out of document order, or it sits inside a single message and
/// nothing forced the multi-block path.
pub fn copy_selection(
    ranges: &[SelectionRange],
    feed: &impl FeedAccessor,
    converter: &MarkupConverter,
) -> Option<CopyPayload> {
    let resolved = resolve_selection(ranges, feed);
    let start = resolved.start?;
    let end = resolved.end?;
    if start > end {
        return None;
    }
    if start == end && !resolved.force_multi_block {
        return None;
    }

    let tree = assemble(&resolved, feed)?;
    let text = converter.convert(&tree);
    Some(CopyPayload {
        html: tree.to_html(),
        text,
    })
}
