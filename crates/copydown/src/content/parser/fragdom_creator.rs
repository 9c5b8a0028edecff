// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::{
    fragqual_name, FragDom, FragDomCreationError, FragElement, FragHandle,
    FragNode, FragText,
};
use html5ever::interface::NextParserState;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{parse_fragment, Attribute, QualName};
use std::cell::{Ref, RefCell};

pub(crate) type DomCreationResult = Result<FragDom, FragDomCreationError>;

/// `TreeSink` implementation building a [`FragDom`].
///
/// Clipboard payloads are arbitrary external HTML, so unlike a sink for a
/// controlled format this one must accept every callback html5ever can make:
/// comments, doctypes, processing instructions and template contents are
/// routed into [`FragNode::Ignored`] or detached nodes rather than rejected.
pub(crate) struct FragDomCreator {
    state: RefCell<FragDomCreationError>,
}

impl FragDomCreator {
    pub(crate) fn parse(html: &str) -> DomCreationResult {
        parse_fragment(
            FragDomCreator::default(),
            Default::default(),
            fragqual_name(""),
            vec![],
        )
        .from_utf8()
        .one(html.as_bytes())
    }

    fn add_node(&self, node: FragNode) -> FragHandle {
        self.state.borrow_mut().dom.add_node(node)
    }
}

impl Default for FragDomCreator {
    fn default() -> Self {
        Self {
            state: RefCell::new(FragDomCreationError::new()),
        }
    }
}

impl TreeSink for FragDomCreator {
    type Handle = FragHandle;
    type Output = DomCreationResult;
    type ElemName<'a> = Ref<'a, QualName>;

    fn finish(self) -> Self::Output {
        if self.state.borrow().parse_errors.is_empty() {
            Ok(self.state.borrow().dom.clone())
        } else {
            Err(FragDomCreationError {
                dom: self.state.borrow().dom.clone(),
                parse_errors: self.state.borrow().parse_errors.clone(),
            })
        }
    }

    fn parse_error(&self, msg: std::borrow::Cow<'static, str>) {
        self.state.borrow_mut().parse_errors.push(String::from(msg));
    }

    fn get_document(&self) -> Self::Handle {
        self.state.borrow().dom.document_handle().clone()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        Ref::map(self.state.borrow(), |state| {
            state.dom.get_node(target).name()
        })
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs
            .iter()
            .map(|attr| {
                (
                    attr.name.local.as_ref().to_owned(),
                    attr.value.as_ref().to_owned(),
                )
            })
            .collect();
        self.add_node(FragNode::Element(FragElement {
            name,
            attrs,
            children: Vec::new(),
        }))
    }

    fn create_comment(&self, _text: StrTendril) -> Self::Handle {
        self.add_node(FragNode::Ignored)
    }

    fn create_pi(
        &self,
        _target: StrTendril,
        _data: StrTendril,
    ) -> Self::Handle {
        self.add_node(FragNode::Ignored)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let dom = &mut state.dom;
        match child {
            NodeOrText::AppendNode(child) => {
                match dom.get_mut_node(parent).children_mut() {
                    Some(children) => children.push(child),
                    None => state
                        .parse_errors
                        .push(String::from("append to a leaf node")),
                }
            }
            NodeOrText::AppendText(tendril) => {
                // Coalesce with a trailing text sibling if there is one.
                let text_handle = match dom.get_node(parent) {
                    FragNode::Text(_) => Some(parent.clone()),
                    node => match node
                        .children()
                        .and_then(|c| c.last().cloned())
                    {
                        Some(last)
                            if matches!(
                                dom.get_node(&last),
                                FragNode::Text(_)
                            ) =>
                        {
                            Some(last)
                        }
                        _ => None,
                    },
                };

                if let Some(text_handle) = text_handle {
                    if let FragNode::Text(text) =
                        dom.get_mut_node(&text_handle)
                    {
                        text.content += tendril.as_ref();
                    }
                } else {
                    let new_handle = dom.add_node(FragNode::Text(FragText {
                        content: tendril.as_ref().to_owned(),
                    }));
                    match dom.get_mut_node(parent).children_mut() {
                        Some(children) => children.push(new_handle),
                        None => state
                            .parse_errors
                            .push(String::from("append text to a leaf node")),
                    }
                }
            }
        };
    }

    fn append_based_on_parent_node(
        &self,
        _element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        // Foster parenting (mis-nested table content). Attaching to the
        // previous element keeps the content instead of dropping it.
        self.append(prev_element, child);
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        // Doctypes carry no content.
    }

    fn mark_script_already_started(&self, _node: &Self::Handle) {
        // Scripts are never executed here.
    }

    fn pop(&self, _node: &Self::Handle) {
        // Nothing to do when an element is closed.
    }

    fn get_template_contents(&self, _target: &Self::Handle) -> Self::Handle {
        // Template contents go into a detached element that the conversion
        // stage never reaches.
        self.add_node(FragNode::Element(FragElement {
            name: fragqual_name("template"),
            attrs: Vec::new(),
            children: Vec::new(),
        }))
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {
        // Quirks mode does not affect the produced tree.
    }

    fn append_before_sibling(
        &self,
        sibling: &Self::Handle,
        new_node: NodeOrText<Self::Handle>,
    ) {
        let parent = self.state.borrow().dom.parent_of(sibling);
        let Some(parent) = parent else {
            // Detached sibling (adoption agency on garbage); drop the node.
            return;
        };
        let new_handle = match new_node {
            NodeOrText::AppendNode(handle) => handle,
            NodeOrText::AppendText(tendril) => {
                self.add_node(FragNode::Text(FragText {
                    content: tendril.as_ref().to_owned(),
                }))
            }
        };
        let dom = &mut self.state.borrow_mut().dom;
        if let Some(children) = dom.get_mut_node(&parent).children_mut() {
            let index = children
                .iter()
                .position(|c| c == sibling)
                .unwrap_or(children.len());
            children.insert(index, new_handle);
        }
    }

    fn add_attrs_if_missing(
        &self,
        target: &Self::Handle,
        attrs: Vec<Attribute>,
    ) {
        let dom = &mut self.state.borrow_mut().dom;
        if let FragNode::Element(el) = dom.get_mut_node(target) {
            let to_add: Vec<(String, String)> = attrs
                .iter()
                .filter_map(|attr| {
                    let attr_name = attr.name.local.as_ref();
                    if el.attrs.iter().any(|(name, _)| name == attr_name) {
                        None
                    } else {
                        Some((
                            attr_name.to_owned(),
                            attr.value.as_ref().to_owned(),
                        ))
                    }
                })
                .collect();
            el.attrs.extend(to_add);
        }
    }

    fn associate_with_form(
        &self,
        _target: &Self::Handle,
        _form: &Self::Handle,
        _nodes: (&Self::Handle, Option<&Self::Handle>),
    ) {
        // Form ownership is irrelevant to content extraction.
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        let parent = self.state.borrow().dom.parent_of(target);
        if let Some(parent) = parent {
            let dom = &mut self.state.borrow_mut().dom;
            if let Some(children) = dom.get_mut_node(&parent).children_mut() {
                children.retain(|c| c != target);
            }
        }
    }

    fn reparent_children(
        &self,
        node: &Self::Handle,
        new_parent: &Self::Handle,
    ) {
        let dom = &mut self.state.borrow_mut().dom;
        let moved = match dom.get_mut_node(node).children_mut() {
            Some(children) => std::mem::take(children),
            None => return,
        };
        if let Some(children) = dom.get_mut_node(new_parent).children_mut() {
            children.extend(moved);
        }
    }

    fn is_mathml_annotation_xml_integration_point(
        &self,
        _handle: &Self::Handle,
    ) -> bool {
        false
    }

    fn set_current_line(&self, _line_number: u64) {
        // Line numbers are only useful for diagnostics.
    }

    fn complete_script(&self, _node: &Self::Handle) -> NextParserState {
        NextParserState::Continue
    }

    fn allow_declarative_shadow_roots(
        &self,
        _intended_parent: &Self::Handle,
    ) -> bool {
        false
    }

    fn attach_declarative_shadow(
        &self,
        _location: &Self::Handle,
        _template: &Self::Handle,
        _attrs: Vec<Attribute>,
    ) -> Result<(), String> {
        Err(String::from("declarative shadow roots are not supported"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(input: &str) -> FragDom {
        FragDomCreator::parse(input).unwrap()
    }

    fn html_children(dom: &FragDom) -> Vec<&FragNode> {
        let FragNode::Document(doc) = dom.get_node(dom.document_handle())
        else {
            panic!("no document");
        };
        let FragNode::Element(html) = dom.get_node(&doc.children[0]) else {
            panic!("no html wrapper");
        };
        html.children.iter().map(|h| dom.get_node(h)).collect()
    }

    #[test]
    fn parsing_a_text_snippet_creates_one_text_node() {
        let dom = parse("foo");
        let children = html_children(&dom);
        assert_eq!(children.len(), 1);
        assert_eq!(
            children[0],
            &FragNode::Text(FragText {
                content: "foo".into()
            })
        );
    }

    #[test]
    fn adjacent_text_chunks_are_coalesced() {
        let dom = parse("aaa&lt;b&gt;ccc");
        let children = html_children(&dom);
        assert_eq!(children.len(), 1);
        assert_eq!(
            children[0],
            &FragNode::Text(FragText {
                content: "aaa<b>ccc".into()
            })
        );
    }

    #[test]
    fn attributes_are_preserved_in_order() {
        let dom = parse(r#"<a href="u" title="t">x</a>"#);
        let children = html_children(&dom);
        let FragNode::Element(el) = children[0] else {
            panic!("expected element");
        };
        assert_eq!(el.name.local.as_ref(), "a");
        assert_eq!(
            el.attrs,
            vec![
                ("href".to_owned(), "u".to_owned()),
                ("title".to_owned(), "t".to_owned())
            ]
        );
    }

    #[test]
    fn comments_become_ignored_nodes() {
        let dom = parse("<!-- note -->foo");
        let children = html_children(&dom);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], &FragNode::Ignored);
        assert_eq!(
            children[1],
            &FragNode::Text(FragText {
                content: "foo".into()
            })
        );
    }
}
