// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Recognition of internal cross-reference URLs.
//!
//! A feed URL of the form
//! `https://<host>/#feed/group/<group-slug>/topic/<encoded-topic>` points at
//! a topic inside a recipient group. The composer renders such references
//! with the shorthand syntax `#**group>topic**`; this crate decides whether
//! a pasted URL is such a reference and produces the shorthand text.

use percent_encoding::percent_decode_str;
use url::Url;

/// A parsed internal cross-reference: a recipient group plus a topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicLink {
    group: String,
    topic: String,
}

impl TopicLink {
    /// Parse `url` as an internal cross-reference.
    ///
    /// Returns `None` for anything that is not an http(s) URL whose fragment
    /// is exactly `feed/group/<slug>/topic/<topic>`. The host is not
    /// checked: eligibility against the current origin is the caller's
    /// responsibility, since only the host application knows it.
    pub fn from_url(url: &str) -> Option<TopicLink> {
        let parsed = Url::parse(url).ok()?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return None;
        }
        let fragment = parsed.fragment()?;
        let mut segments = fragment.split('/');
        if segments.next() != Some("feed") || segments.next() != Some("group")
        {
            return None;
        }
        let slug = segments.next()?;
        if segments.next() != Some("topic") {
            return None;
        }
        let topic = segments.next()?;
        if segments.next().is_some() {
            return None;
        }

        let group = decode_group_slug(slug)?;
        let topic = decode_component(topic)?;
        if group.is_empty() || topic.is_empty() {
            return None;
        }
        Some(TopicLink { group, topic })
    }

    /// Whether `url` parses as an internal cross-reference.
    pub fn is_valid_url(url: &str) -> bool {
        Self::from_url(url).is_some()
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The composer shorthand for this reference.
    pub fn shorthand(&self) -> String {
        format!("#**{}>{}**", self.group, self.topic)
    }
}

/// Decode a group slug.
///
/// The host's URL encoder prefixes slugs with the numeric group id
/// (`12-general`); the prefix is display noise and is dropped. A slug that
/// is only an id (no name part) is kept as-is.
fn decode_group_slug(slug: &str) -> Option<String> {
    let name = match slug.split_once('-') {
        Some((id, rest)) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) && !rest.is_empty() => rest,
        _ => slug,
    };
    decode_component(name)
}

/// Percent-decode one fragment segment. The host encodes with
/// percent-escapes only, so `+` stays a literal plus sign.
fn decode_component(segment: &str) -> Option<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}
