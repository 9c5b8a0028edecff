// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! HTML fragment parsing.
//!
//! Parsing happens in two stages: [`FragDomCreator`] implements html5ever's
//! `TreeSink` and builds a [`FragDom`], a flat arena in which parents refer
//! to children by handle and which may contain detached garbage nodes left
//! behind by the parser. `parse` then converts the arena into an owned
//! [`crate::content::ContentNode`] tree, skipping garbage.

mod fragdom_creator;
mod parse;

pub(crate) use fragdom_creator::FragDomCreator;
pub use parse::{parse_fragment, HtmlParseError};

use html5ever::{namespace_url, ns, LocalName, QualName};
use once_cell::sync::Lazy;

pub(crate) fn fragqual_name(name: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(name))
}

static UNNAMED: Lazy<QualName> = Lazy::new(|| fragqual_name(""));

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct FragHandle(pub(crate) usize);

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct FragDocument {
    pub(crate) children: Vec<FragHandle>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FragElement {
    pub(crate) name: QualName,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) children: Vec<FragHandle>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FragText {
    pub(crate) content: String,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FragNode {
    Document(FragDocument),
    Element(FragElement),
    Text(FragText),
    /// Comments, processing instructions and doctype noise. Kept in the
    /// arena so handles stay stable; dropped by the conversion stage.
    Ignored,
}

impl FragNode {
    pub(crate) fn name(&self) -> &QualName {
        match self {
            Self::Element(el) => &el.name,
            _ => &UNNAMED,
        }
    }

    pub(crate) fn children(&self) -> Option<&[FragHandle]> {
        match self {
            Self::Document(doc) => Some(&doc.children),
            Self::Element(el) => Some(&el.children),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<FragHandle>> {
        match self {
            Self::Document(doc) => Some(&mut doc.children),
            Self::Element(el) => Some(&mut el.children),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FragDom {
    pub(crate) nodes: Vec<FragNode>,
    pub(crate) document: FragHandle,
}

impl FragDom {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![FragNode::Document(FragDocument::default())],
            document: FragHandle(0),
        }
    }

    pub(crate) fn document_handle(&self) -> &FragHandle {
        &self.document
    }

    pub(crate) fn get_node(&self, handle: &FragHandle) -> &FragNode {
        &self.nodes[handle.0]
    }

    pub(crate) fn get_mut_node(
        &mut self,
        handle: &FragHandle,
    ) -> &mut FragNode {
        &mut self.nodes[handle.0]
    }

    pub(crate) fn add_node(&mut self, node: FragNode) -> FragHandle {
        self.nodes.push(node);
        FragHandle(self.nodes.len() - 1)
    }

    /// The handle of the node whose child list contains `child`, if any.
    pub(crate) fn parent_of(&self, child: &FragHandle) -> Option<FragHandle> {
        self.nodes.iter().position(|node| match node {
            FragNode::Document(doc) => doc.children.contains(child),
            FragNode::Element(el) => el.children.contains(child),
            _ => false,
        })
        .map(FragHandle)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct FragDomCreationError {
    pub(crate) dom: FragDom,
    pub(crate) parse_errors: Vec<String>,
}

impl FragDomCreationError {
    pub(crate) fn new() -> Self {
        Self {
            dom: FragDom::new(),
            parse_errors: Vec::new(),
        }
    }
}
