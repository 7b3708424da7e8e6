// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::dom::*;
use crate::lexer::Source;
use crate::utils::leading_indent;

use core::ops::{Range, RangeInclusive};

/// What a child of a text tree node stands for.
#[derive(Debug, Clone, Copy)]
pub enum ChildTag<'a> {
    Name,
    Indentation,
    LineBreak,
    UnstructuredText,
    AssignmentRhs(&'a ValueNode),
    BlockElement {
        index: usize,
        node: &'a DocumentNode,
    },
    CallArgument {
        index: usize,
        value: &'a ValueNode,
    },
}

impl<'a> ChildTag<'a> {
    /// The document node of a block element.
    pub fn document_node(&self) -> Option<&'a DocumentNode> {
        match self {
            ChildTag::BlockElement { node, .. } => Some(*node),
            _ => None,
        }
    }

    /// The value of an assignment right-hand side or call argument.
    pub fn value(&self) -> Option<&'a ValueNode> {
        match self {
            ChildTag::AssignmentRhs(value) | ChildTag::CallArgument { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Leaves are emitted as text; the other tags have document-derived content.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            ChildTag::Name
                | ChildTag::Indentation
                | ChildTag::LineBreak
                | ChildTag::UnstructuredText
        )
    }
}

#[derive(Debug, Clone)]
pub struct TextTreeChild<'a> {
    pub tag: ChildTag<'a>,
    pub node: TextTreeNode<'a>,
}

/// A range of the original text. The children of a node, if any, cover its
/// range exactly and in order.
#[derive(Debug, Clone)]
pub struct TextTreeNode<'a> {
    pub range: Range<usize>,
    pub line_range: RangeInclusive<u32>,
    pub children: Vec<TextTreeChild<'a>>,
}

/// The original text of a document, partitioned along its nodes.
#[derive(Debug, Clone)]
pub struct TextPreservingTree<'a> {
    pub source: &'a Source,
    pub root: TextTreeNode<'a>,
}

impl<'a> TextPreservingTree<'a> {
    /// Build the tree of a document converted from its own source.
    pub fn build(document: &'a DeclarativeDocument) -> Self {
        let builder = Builder {
            source: &document.span.source,
        };
        let children = document
            .content
            .iter()
            .enumerate()
            .map(|(index, node)| builder.child(ChildTag::BlockElement { index, node }, node.span()))
            .collect();
        let range = document.span.start as usize..document.span.end as usize;
        Self {
            source: &document.span.source,
            root: builder.node(range, children),
        }
    }

    pub fn text(&self, node: &TextTreeNode<'_>) -> &'a str {
        &self.source.contents()[node.range.clone()]
    }
}

struct Builder<'a> {
    source: &'a Source,
}

impl<'a> Builder<'a> {
    fn text(&self, range: Range<usize>) -> &'a str {
        &self.source.contents()[range]
    }

    fn line_range(&self, range: &Range<usize>) -> RangeInclusive<u32> {
        let first = self.source.line_of(range.start as u32);
        let last = self
            .source
            .line_of(range.end.saturating_sub(1).max(range.start) as u32);
        first..=last
    }

    fn leaf(&self, tag: ChildTag<'a>, range: Range<usize>) -> TextTreeChild<'a> {
        TextTreeChild {
            tag,
            node: TextTreeNode {
                line_range: self.line_range(&range),
                range,
                children: vec![],
            },
        }
    }

    fn span_range(span: &Span) -> Range<usize> {
        span.start as usize..span.end as usize
    }

    // Node for a document-derived child, with its own children.
    fn child(&self, tag: ChildTag<'a>, span: &Span) -> TextTreeChild<'a> {
        let range = Self::span_range(span);
        let known = match tag {
            ChildTag::BlockElement { node, .. } => self.document_node_children(node),
            ChildTag::AssignmentRhs(value) | ChildTag::CallArgument { value, .. } => {
                self.value_children(value)
            }
            ChildTag::Name
            | ChildTag::Indentation
            | ChildTag::LineBreak
            | ChildTag::UnstructuredText => vec![],
        };
        let node = if known.is_empty() {
            TextTreeNode {
                line_range: self.line_range(&range),
                range,
                children: vec![],
            }
        } else {
            self.node(range, known)
        };
        TextTreeChild { tag, node }
    }

    fn document_node_children(&self, node: &'a DocumentNode) -> Vec<TextTreeChild<'a>> {
        match node {
            DocumentNode::Element(e) => {
                let mut children = vec![self.leaf(ChildTag::Name, Self::span_range(&e.name_span))];
                for (index, value) in e.element_values.iter().enumerate() {
                    children.push(self.child(ChildTag::CallArgument { index, value }, value.span()));
                }
                for (index, node) in e.content.iter().enumerate() {
                    children.push(self.child(ChildTag::BlockElement { index, node }, node.span()));
                }
                children.sort_by_key(|c| c.node.range.start);
                children
            }
            DocumentNode::Property(p) => vec![
                self.leaf(ChildTag::Name, Self::span_range(&p.name_span)),
                self.child(ChildTag::AssignmentRhs(&p.value), p.value.span()),
            ],
            DocumentNode::Error(_) => vec![],
        }
    }

    fn value_children(&self, value: &'a ValueNode) -> Vec<TextTreeChild<'a>> {
        match value {
            ValueNode::Literal(_) => vec![],
            ValueNode::ValueFactory(f) => {
                let mut children = vec![self.leaf(ChildTag::Name, Self::span_range(&f.name_span))];
                for (index, value) in f.values.iter().enumerate() {
                    children.push(self.child(ChildTag::CallArgument { index, value }, value.span()));
                }
                children
            }
            ValueNode::NamedReference(r) => {
                vec![self.leaf(ChildTag::Name, Self::span_range(&r.span))]
            }
        }
    }

    // Fill the gaps between `known` children with formatting leaves.
    fn node(&self, range: Range<usize>, known: Vec<TextTreeChild<'a>>) -> TextTreeNode<'a> {
        let mut children = vec![];
        let mut pos = range.start;
        for child in known {
            if child.node.range.start > pos {
                self.gap(pos..child.node.range.start, &mut children);
            }
            pos = child.node.range.end;
            children.push(child);
        }
        if pos < range.end {
            self.gap(pos..range.end, &mut children);
        }

        TextTreeNode {
            line_range: self.line_range(&range),
            range,
            children,
        }
    }

    // The first line of a gap continues the current line. Every later line
    // starts with its indentation.
    fn gap(&self, range: Range<usize>, out: &mut Vec<TextTreeChild<'a>>) {
        let mut offset = range.start;
        for (i, piece) in self.text(range).split('\n').enumerate() {
            if i > 0 {
                out.push(self.leaf(ChildTag::LineBreak, offset..offset + 1));
                offset += 1;

                let indent = leading_indent(piece).len();
                if indent > 0 {
                    out.push(self.leaf(ChildTag::Indentation, offset..offset + indent));
                }
                if indent < piece.len() {
                    out.push(self.leaf(
                        ChildTag::UnstructuredText,
                        offset + indent..offset + piece.len(),
                    ));
                }
            } else if !piece.is_empty() {
                out.push(self.leaf(ChildTag::UnstructuredText, offset..offset + piece.len()));
            }
            offset += piece.len();
        }
    }
}
