// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Selection boundary resolution.
//!
//! A platform selection arrives as zero or more ranges whose anchors may sit
//! on furniture rows rather than messages (some platforms also fragment one
//! visual selection into several ranges when it crosses certain boundaries).
//! [`resolve_selection`] maps the whole set onto a single inclusive message
//! range, or onto nothing when no boundary can be found, in which case the
//! caller lets the platform's native copy proceed.

use crate::feed::{BlockId, FeedAccessor, Row, RowIndex};

/// One (start, end) anchor pair from the platform selection. Anchors are
/// row-granular; both always come in document order regardless of the
/// direction the user dragged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: RowIndex,
    pub end: RowIndex,
}

/// The inclusive message range a selection was resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedRange {
    /// First message touched, in document order. `None` when no range
    /// resolved.
    pub start: Option<BlockId>,
    /// Last message touched, in document order.
    pub end: Option<BlockId>,
    /// True when resolving either boundary of any range required stepping
    /// off the anchor row. Stepping proves the selection cannot be contained
    /// in one message's own substructure, so the same-block short-circuit
    /// must not be taken, even if both resolved ids happen to coincide.
    pub force_multi_block: bool,
}

/// Walking is bounded so degenerate row sequences cannot loop forever. An
/// anchor that does not reach a message within this many steps is treated
/// as unresolvable and its whole range is skipped.
const MAX_BOUNDARY_HOPS: usize = 10;

/// Resolve a platform selection to an inclusive message range.
///
/// The first range to resolve supplies the overall start; every later range
/// overwrites the overall end, which matches document order because ranges
/// arrive ordered. Never fails: an unresolvable selection yields `None` ids.
pub fn resolve_selection(
    ranges: &[SelectionRange],
    feed: &impl FeedAccessor,
) -> ResolvedRange {
    let mut start = None;
    let mut end = None;
    let mut force_multi_block = false;

    for range in ranges {
        let Some(range_start) = resolve_start(range.start, feed) else {
            continue;
        };
        let Some(range_end) = resolve_end(range.end, feed) else {
            continue;
        };
        if start.is_none() {
            start = Some(range_start.id);
        }
        end = Some(range_end.id);
        force_multi_block |= range_start.walked || range_end.walked;
    }

    ResolvedRange {
        start,
        end,
        force_multi_block,
    }
}

struct Boundary {
    id: BlockId,
    walked: bool,
}

/// Resolve a start anchor by walking forward to the next message row.
fn resolve_start(
    anchor: RowIndex,
    feed: &impl FeedAccessor,
) -> Option<Boundary> {
    let mut row = anchor;
    for hops in 0..=MAX_BOUNDARY_HOPS {
        match feed.row(row)? {
            Row::Message { id } => {
                return Some(Boundary {
                    id: *id,
                    walked: hops > 0,
                });
            }
            _ => row = feed.next_row(row)?,
        }
    }
    None
}

/// Resolve an end anchor by walking backward to the previous message row.
///
/// Two normalisations apply on top of the walk: an anchor in the empty fill
/// below the feed snaps to the last message, and an anchor on an overlap
/// row must not resolve to the message the overlap belongs to (that
/// message starts after the selection), so the walk steps past it. A header
/// anchor above the next group resolves, by the same backward walk, to the
/// last message of the previous group.
fn resolve_end(anchor: RowIndex, feed: &impl FeedAccessor) -> Option<Boundary> {
    let mut row = anchor;
    for hops in 0..=MAX_BOUNDARY_HOPS {
        match feed.row(row)? {
            Row::Message { id } => {
                return Some(Boundary {
                    id: *id,
                    walked: hops > 0,
                });
            }
            Row::TrailingFill => {
                return feed.last_block().map(|id| Boundary {
                    id,
                    walked: true,
                });
            }
            _ => row = feed.previous_row(row)?,
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::testutils::{message, two_group_feed};
    use crate::feed::FeedSnapshot;

    fn range(start: RowIndex, end: RowIndex) -> SelectionRange {
        SelectionRange { start, end }
    }

    #[test]
    fn selection_within_one_message_is_a_same_block_range() {
        let feed = two_group_feed();
        let resolved = resolve_selection(&[range(1, 1)], &feed);
        assert_eq!(resolved.start, Some(1));
        assert_eq!(resolved.end, Some(1));
        assert!(!resolved.force_multi_block);
    }

    #[test]
    fn selection_across_messages_resolves_both_ids() {
        let feed = two_group_feed();
        let resolved = resolve_selection(&[range(1, 5)], &feed);
        assert_eq!(resolved.start, Some(1));
        assert_eq!(resolved.end, Some(3));
        assert!(!resolved.force_multi_block);
    }

    #[test]
    fn start_on_a_header_walks_forward() {
        let feed = two_group_feed();
        let resolved = resolve_selection(&[range(0, 3)], &feed);
        assert_eq!(resolved.start, Some(1));
        assert_eq!(resolved.end, Some(2));
        assert!(resolved.force_multi_block);
    }

    #[test]
    fn end_on_a_header_resolves_to_the_previous_group() {
        // Row 4 is the header above group 2; the selection never reached
        // message 3.
        let feed = two_group_feed();
        let resolved = resolve_selection(&[range(1, 4)], &feed);
        assert_eq!(resolved.start, Some(1));
        assert_eq!(resolved.end, Some(2));
        assert!(resolved.force_multi_block);
    }

    #[test]
    fn end_in_trailing_fill_snaps_to_the_last_message() {
        let feed = two_group_feed();
        let resolved = resolve_selection(&[range(3, 6)], &feed);
        assert_eq!(resolved.start, Some(2));
        assert_eq!(resolved.end, Some(3));
        assert!(resolved.force_multi_block);
    }

    #[test]
    fn end_on_an_overlap_row_skips_the_following_message() {
        let mut feed = FeedSnapshot::new();
        feed.set_group_label(1, "general");
        feed.push_message(message(1, 1, "alice", "a"));
        feed.push_overlap(2);
        feed.push_message(message(2, 1, "bob", "b"));

        let resolved = resolve_selection(&[range(0, 1)], &feed);
        assert_eq!(resolved.start, Some(1));
        assert_eq!(resolved.end, Some(1));
        assert!(resolved.force_multi_block);
    }

    #[test]
    fn walking_both_boundaries_to_the_same_message_still_forces_multi_block() {
        // The deliberate fallback-safety behaviour: hop-walking sets the
        // flag even when both boundaries land on the same message.
        let mut feed = FeedSnapshot::new();
        feed.set_group_label(1, "general");
        feed.push_group_header(1);
        feed.push_message(message(1, 1, "alice", "a"));
        feed.push_trailing_fill();

        let resolved = resolve_selection(&[range(0, 2)], &feed);
        assert_eq!(resolved.start, Some(1));
        assert_eq!(resolved.end, Some(1));
        assert!(resolved.force_multi_block);
    }

    #[test]
    fn fragmented_selection_takes_first_start_and_last_end() {
        let feed = two_group_feed();
        let resolved =
            resolve_selection(&[range(1, 1), range(3, 3), range(5, 5)], &feed);
        assert_eq!(resolved.start, Some(1));
        assert_eq!(resolved.end, Some(3));
        assert!(!resolved.force_multi_block);
    }

    #[test]
    fn unresolvable_range_is_skipped_entirely() {
        // A feed where the walk from the first anchor exceeds the hop cap:
        // eleven separators before the first message.
        let mut feed = FeedSnapshot::new();
        feed.set_group_label(1, "general");
        for _ in 0..11 {
            feed.push_date_separator();
        }
        feed.push_message(message(1, 1, "alice", "a"));

        let resolved = resolve_selection(&[range(0, 11)], &feed);
        assert_eq!(resolved.start, None);
        assert_eq!(resolved.end, None);
        assert!(!resolved.force_multi_block);

        // Ten separators are within the cap.
        let mut feed = FeedSnapshot::new();
        feed.set_group_label(1, "general");
        for _ in 0..10 {
            feed.push_date_separator();
        }
        feed.push_message(message(1, 1, "alice", "a"));

        let resolved = resolve_selection(&[range(0, 10)], &feed);
        assert_eq!(resolved.start, Some(1));
        assert_eq!(resolved.end, Some(1));
        assert!(resolved.force_multi_block);
    }

    #[test]
    fn skipped_range_does_not_clobber_resolved_ones() {
        let feed = two_group_feed();
        // Second range starts past the end of the feed and cannot resolve.
        let resolved =
            resolve_selection(&[range(1, 3), range(40, 41)], &feed);
        assert_eq!(resolved.start, Some(1));
        assert_eq!(resolved.end, Some(2));
    }

    #[test]
    fn empty_selection_resolves_to_nothing() {
        let feed = two_group_feed();
        let resolved = resolve_selection(&[], &feed);
        assert_eq!(resolved.start, None);
        assert_eq!(resolved.end, None);
        assert!(!resolved.force_multi_block);
    }

    #[test]
    fn anchors_outside_the_feed_resolve_to_nothing() {
        let feed = two_group_feed();
        let resolved = resolve_selection(&[range(100, 200)], &feed);
        assert_eq!(resolved.start, None);
        assert_eq!(resolved.end, None);
    }
}
