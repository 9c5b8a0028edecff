// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The structured document the selection resolver walks.
//!
//! A rendered feed is an ordered sequence of rows. Most rows are messages;
//! the rest are furniture (group headers, date separators, the empty fill
//! below the last message) that a user selection can nevertheless start or
//! end on. [`FeedAccessor`] abstracts the row sequence so the resolver does
//! not depend on any particular rendering tree, and [`FeedSnapshot`] is the
//! in-memory implementation used by the pipeline and by tests.

use crate::content::ContentNode;

/// Stable message identifier. Ids are assigned in document order, so
/// comparing two ids compares feed positions.
pub type BlockId = u64;

/// Identifier of a recipient group.
pub type GroupId = u64;

/// Index of a row in the rendered feed.
pub type RowIndex = usize;

/// One message: sender, recipient group and rendered content.
#[derive(Clone, Debug)]
pub struct Block {
    pub id: BlockId,
    pub group: GroupId,
    pub sender: String,
    pub content: ContentNode,
}

/// One row of the rendered feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Row {
    /// A message row.
    Message { id: BlockId },
    /// The header introducing a recipient group.
    GroupHeader { group: GroupId },
    /// A date separator between messages.
    DateSeparator,
    /// The empty region below the last message.
    TrailingFill,
    /// A hidden region that the rendering attributes to the *following*
    /// message. A selection ending here did not reach that message.
    Overlap { following: BlockId },
}

/// Read-only access to the rendered feed.
pub trait FeedAccessor {
    fn row_count(&self) -> usize;
    fn row(&self, index: RowIndex) -> Option<&Row>;
    fn block(&self, id: BlockId) -> Option<&Block>;
    fn group_label(&self, group: GroupId) -> Option<&str>;

    fn next_row(&self, index: RowIndex) -> Option<RowIndex> {
        if index + 1 < self.row_count() {
            Some(index + 1)
        } else {
            None
        }
    }

    fn previous_row(&self, index: RowIndex) -> Option<RowIndex> {
        index.checked_sub(1)
    }

    /// The message id of a row, or `None` for furniture rows.
    fn block_at(&self, index: RowIndex) -> Option<BlockId> {
        match self.row(index)? {
            Row::Message { id } => Some(*id),
            _ => None,
        }
    }

    /// The id of the last message in the feed.
    fn last_block(&self) -> Option<BlockId> {
        (0..self.row_count())
            .rev()
            .find_map(|index| self.block_at(index))
    }

    /// Message ids between `start` and `end` inclusive, in document order.
    fn blocks_between(&self, start: BlockId, end: BlockId) -> Vec<BlockId> {
        (0..self.row_count())
            .filter_map(|index| self.block_at(index))
            .filter(|id| (start..=end).contains(id))
            .collect()
    }
}

/// An owned snapshot of a feed, built row by row.
#[derive(Default)]
pub struct FeedSnapshot {
    rows: Vec<Row>,
    blocks: Vec<Block>,
    group_labels: Vec<(GroupId, String)>,
}

impl FeedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_group_label(&mut self, group: GroupId, label: &str) {
        self.group_labels.push((group, label.to_owned()));
    }

    pub fn push_group_header(&mut self, group: GroupId) {
        self.rows.push(Row::GroupHeader { group });
    }

    pub fn push_date_separator(&mut self) {
        self.rows.push(Row::DateSeparator);
    }

    pub fn push_trailing_fill(&mut self) {
        self.rows.push(Row::TrailingFill);
    }

    pub fn push_overlap(&mut self, following: BlockId) {
        self.rows.push(Row::Overlap { following });
    }

    pub fn push_message(&mut self, block: Block) {
        self.rows.push(Row::Message { id: block.id });
        self.blocks.push(block);
    }
}

impl FeedAccessor for FeedSnapshot {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, index: RowIndex) -> Option<&Row> {
        self.rows.get(index)
    }

    fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    fn group_label(&self, group: GroupId) -> Option<&str> {
        self.group_labels
            .iter()
            .find(|(g, _)| *g == group)
            .map(|(_, label)| label.as_str())
    }
}

#[cfg(test)]
pub(crate) mod testutils {
    use super::*;

    /// A feed with two groups:
    ///
    /// ```text
    /// row 0  GroupHeader(1)
    /// row 1  Message(1, "alice")
    /// row 2  DateSeparator
    /// row 3  Message(2, "bob")
    /// row 4  GroupHeader(2)
    /// row 5  Message(3, "carol")
    /// row 6  TrailingFill
    /// ```
    pub(crate) fn two_group_feed() -> FeedSnapshot {
        let mut feed = FeedSnapshot::new();
        feed.set_group_label(1, "general > releases");
        feed.set_group_label(2, "design > icons");
        feed.push_group_header(1);
        feed.push_message(message(1, 1, "alice", "first message"));
        feed.push_date_separator();
        feed.push_message(message(2, 1, "bob", "second message"));
        feed.push_group_header(2);
        feed.push_message(message(3, 2, "carol", "third message"));
        feed.push_trailing_fill();
        feed
    }

    pub(crate) fn message(
        id: BlockId,
        group: GroupId,
        sender: &str,
        text: &str,
    ) -> Block {
        Block {
            id,
            group,
            sender: sender.to_owned(),
            content: ContentNode::element(
                "div",
                vec![],
                vec![ContentNode::element(
                    "p",
                    vec![],
                    vec![ContentNode::text(text)],
                )],
            ),
        }
    }
}
