// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Assembly of a resolved message range into one content tree.
//!
//! Each message contributes its content prefixed with the sender's name, and
//! a bold recipient-group header is inserted wherever the group changes,
//! including, retroactively, above the first message whenever more than one
//! group appears in the range. A single-group range gets no headers at all.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::content::{ContentNode, ElementNode};
use crate::feed::{Block, FeedAccessor, GroupId};
use crate::selection::ResolvedRange;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Build the synthetic tree for a resolved range.
///
/// Returns `None` when the range is incomplete, reversed, or refers to
/// messages the feed no longer has. The caller then abandons the custom
/// copy path and lets the platform's native behaviour stand.
pub fn assemble(
    range: &ResolvedRange,
    feed: &impl FeedAccessor,
) -> Option<ContentNode> {
    let start = range.start?;
    let end = range.end?;
    if start > end {
        return None;
    }

    let ids = feed.blocks_between(start, end);
    if ids.is_empty() {
        return None;
    }

    let mut children: Vec<ContentNode> = Vec::new();
    let mut first_group: Option<GroupId> = None;
    let mut previous_group: Option<GroupId> = None;
    let mut inserted_header = false;

    for id in ids {
        let block = feed.block(id)?;
        if first_group.is_none() {
            first_group = Some(block.group);
        }
        if let Some(previous) = previous_group {
            if previous != block.group {
                children.push(group_header(feed, block.group)?);
                inserted_header = true;
            }
        }
        children.push(with_sender_prefix(block));
        previous_group = Some(block.group);
    }

    // Whenever any header was needed, the starting group must be labelled
    // too; a range that begins mid-group otherwise attributes its first
    // messages to the wrong context.
    if inserted_header {
        children.insert(0, group_header(feed, first_group?)?);
    }

    Some(ContentNode::Element(ElementNode::new(
        "div",
        Vec::new(),
        children,
    )))
}

fn group_header(
    feed: &impl FeedAccessor,
    group: GroupId,
) -> Option<ContentNode> {
    let label = feed.group_label(group)?;
    let label = WHITESPACE_RUN.replace_all(label.trim(), " ").into_owned();
    Some(ContentNode::element(
        "p",
        Vec::new(),
        vec![ContentNode::element(
            "strong",
            Vec::new(),
            vec![ContentNode::Text(label)],
        )],
    ))
}

/// Clone a message's content with a `"sender: "` text leaf spliced in front
/// of its first line. The prefix goes inside the first element child when
/// there is one, so it shares that child's line, and in front of everything
/// otherwise.
fn with_sender_prefix(block: &Block) -> ContentNode {
    let prefix = ContentNode::text(format!("{}: ", block.sender));
    let mut content = block.content.clone();
    match &mut content {
        ContentNode::Element(root) => {
            match root.children_mut().first_mut() {
                Some(ContentNode::Element(first)) => {
                    first.children_mut().insert(0, prefix);
                }
                _ => {
                    root.children_mut().insert(0, prefix);
                }
            }
            content
        }
        ContentNode::Text(_) => {
            ContentNode::element("div", Vec::new(), vec![prefix, content])
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::testutils::{message, two_group_feed};
    use crate::feed::FeedSnapshot;
    use crate::selection::ResolvedRange;

    fn resolved(start: u64, end: u64) -> ResolvedRange {
        ResolvedRange {
            start: Some(start),
            end: Some(end),
            force_multi_block: false,
        }
    }

    #[test]
    fn single_group_range_has_no_headers() {
        let feed = two_group_feed();
        let tree = assemble(&resolved(1, 2), &feed).unwrap();
        assert_eq!(
            tree.to_html(),
            "<div>\
             <div><p>alice: first message</p></div>\
             <div><p>bob: second message</p></div>\
             </div>"
        );
    }

    #[test]
    fn group_change_inserts_headers_including_the_starting_group() {
        let feed = two_group_feed();
        let tree = assemble(&resolved(1, 3), &feed).unwrap();
        assert_eq!(
            tree.to_html(),
            "<div>\
             <p><strong>general &gt; releases</strong></p>\
             <div><p>alice: first message</p></div>\
             <div><p>bob: second message</p></div>\
             <p><strong>design &gt; icons</strong></p>\
             <div><p>carol: third message</p></div>\
             </div>"
        );
    }

    #[test]
    fn header_labels_collapse_whitespace() {
        let mut feed = FeedSnapshot::new();
        feed.set_group_label(1, "general \n   releases");
        feed.set_group_label(2, "design");
        feed.push_message(message(1, 1, "alice", "a"));
        feed.push_message(message(2, 2, "bob", "b"));

        let tree = assemble(&resolved(1, 2), &feed).unwrap();
        assert!(tree
            .to_html()
            .contains("<strong>general releases</strong>"));
    }

    #[test]
    fn sender_prefix_lands_in_front_of_text_content() {
        let mut feed = FeedSnapshot::new();
        feed.set_group_label(1, "general");
        let block = Block {
            id: 1,
            group: 1,
            sender: "alice".into(),
            content: ContentNode::element(
                "div",
                vec![],
                vec![ContentNode::text("bare text")],
            ),
        };
        feed.push_message(block);
        feed.push_message(message(2, 1, "bob", "b"));

        let tree = assemble(&resolved(1, 2), &feed).unwrap();
        assert!(tree.to_html().contains("<div>alice: bare text</div>"));
    }

    #[test]
    fn incomplete_or_reversed_ranges_assemble_to_nothing() {
        let feed = two_group_feed();
        assert!(assemble(
            &ResolvedRange {
                start: None,
                end: Some(2),
                force_multi_block: false
            },
            &feed
        )
        .is_none());
        assert!(assemble(&resolved(3, 1), &feed).is_none());
    }

    #[test]
    fn range_outside_the_feed_assembles_to_nothing() {
        let feed = two_group_feed();
        assert!(assemble(&resolved(9, 12), &feed).is_none());
    }
}
