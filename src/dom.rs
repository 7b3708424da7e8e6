// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The declarative document model.
//!
//! A [`DeclarativeDocument`] is the purely structural view of a script:
//! elements (configuring calls with an optional block), properties
//! (assignments) and errors (statements the restricted language cannot
//! represent). Every node remembers its source span and the statement-tree
//! node it was converted from.

use crate::ast::{Literal, NodeId};
use crate::lexer::Span;

use core::fmt;

pub mod convert;
pub mod resolution;
pub mod resolver;
pub mod writing;


pub use convert::{convert_block_to_document, convert_block_to_document_with_options, ConversionOptions};
pub use resolution::*;
pub use resolver::{resolve, ResolutionError, ResolverOptions};

#[derive(Debug, Clone)]
pub struct DeclarativeDocument {
    pub content: Vec<DocumentNode>,
    pub span: Span,
}

impl DeclarativeDocument {
    /// Compare two documents ignoring spans and origins.
    pub fn structurally_eq(&self, other: &DeclarativeDocument) -> bool {
        nodes_structurally_eq(&self.content, &other.content)
    }
}

fn nodes_structurally_eq(a: &[DocumentNode], b: &[DocumentNode]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.structurally_eq(b))
}

fn values_structurally_eq(a: &[ValueNode], b: &[ValueNode]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.structurally_eq(b))
}

#[derive(Debug, Clone)]
pub enum DocumentNode {
    Element(ElementNode),
    Property(PropertyNode),
    Error(ErrorNode),
}

impl DocumentNode {
    pub fn span(&self) -> &Span {
        match self {
            DocumentNode::Element(e) => &e.span,
            DocumentNode::Property(p) => &p.span,
            DocumentNode::Error(e) => &e.span,
        }
    }

    pub fn origin(&self) -> NodeId {
        match self {
            DocumentNode::Element(e) => e.origin,
            DocumentNode::Property(p) => p.origin,
            DocumentNode::Error(e) => e.origin,
        }
    }

    /// Name of an element or property.
    pub fn name(&self) -> Option<&str> {
        match self {
            DocumentNode::Element(e) => Some(&e.name),
            DocumentNode::Property(p) => Some(&p.name),
            DocumentNode::Error(_) => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, DocumentNode::Element(_))
    }

    pub fn structurally_eq(&self, other: &DocumentNode) -> bool {
        match (self, other) {
            (DocumentNode::Element(a), DocumentNode::Element(b)) => {
                a.name == b.name
                    && values_structurally_eq(&a.element_values, &b.element_values)
                    && nodes_structurally_eq(&a.content, &b.content)
            }
            (DocumentNode::Property(a), DocumentNode::Property(b)) => {
                a.name == b.name
                    && a.augmentation == b.augmentation
                    && a.value.structurally_eq(&b.value)
            }
            (DocumentNode::Error(a), DocumentNode::Error(b)) => {
                a.errors.len() == b.errors.len()
                    && a.errors.iter().zip(&b.errors).all(|(a, b)| a.cause == b.cause)
            }
            _ => false,
        }
    }
}

/// A configuring or object-creating call, with its block converted into `content`.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub name: String,
    pub name_span: Span,
    pub element_values: Vec<ValueNode>,
    pub content: Vec<DocumentNode>,
    pub span: Span,
    pub origin: NodeId,
}

impl ElementNode {
    /// An element with no backing text, e.g. for insertion by a mutation.
    pub fn synthetic(name: &str, element_values: Vec<ValueNode>, content: Vec<DocumentNode>) -> Self {
        Self {
            name: name.to_string(),
            name_span: Span::synthetic(),
            element_values,
            content,
            span: Span::synthetic(),
            origin: NodeId::SYNTHETIC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAugmentation {
    None,
    Plus,
}

#[derive(Debug, Clone)]
pub struct PropertyNode {
    pub name: String,
    pub name_span: Span,
    pub value: ValueNode,
    pub augmentation: PropertyAugmentation,
    pub span: Span,
    pub origin: NodeId,
}

impl PropertyNode {
    pub fn synthetic(name: &str, value: ValueNode) -> Self {
        Self {
            name: name.to_string(),
            name_span: Span::synthetic(),
            value,
            augmentation: PropertyAugmentation::None,
            span: Span::synthetic(),
            origin: NodeId::SYNTHETIC,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub errors: Vec<DocumentError>,
    pub span: Span,
    pub origin: NodeId,
}

#[derive(Debug, Clone)]
pub struct DocumentError {
    pub cause: UnsupportedSyntaxCause,
    pub span: Span,
}

impl DocumentError {
    pub fn new(cause: UnsupportedSyntaxCause, span: &Span) -> Self {
        Self {
            cause,
            span: span.clone(),
        }
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.span.message("error", &self.cause.to_string()))
    }
}

/// Why a statement or value is outside the restricted language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnsupportedSyntaxCause {
    AssignmentWithExplicitReceiver,
    ElementWithExplicitReceiver,
    ElementArgumentFormat,
    ElementMultipleLambdas,
    LocalVal,
    DanglingExpr,
    UnsupportedThisValue,
    UnsupportedNullValue,
    UnsupportedPropertyAccess,
    ValueFactoryCallWithComplexReceiver,
    ValueFactoryArgumentFormat,
}

impl fmt::Display for UnsupportedSyntaxCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::AssignmentWithExplicitReceiver => "assignments with an explicit receiver are not supported",
            Self::ElementWithExplicitReceiver => "calls with an explicit receiver are not supported",
            Self::ElementArgumentFormat => "configuring calls accept positional arguments only",
            Self::ElementMultipleLambdas => "configuring calls accept at most one block",
            Self::LocalVal => "local values are not supported",
            Self::DanglingExpr => "expression is not used",
            Self::UnsupportedThisValue => "`this` cannot be used as a value",
            Self::UnsupportedNullValue => "`null` cannot be used as a value",
            Self::UnsupportedPropertyAccess => "property access cannot be used as a value",
            Self::ValueFactoryCallWithComplexReceiver => "value factory receivers must be dotted names",
            Self::ValueFactoryArgumentFormat => "value factories accept positional arguments only",
        };
        write!(f, "{msg}")
    }
}

#[derive(Debug, Clone)]
pub enum ValueNode {
    Literal(LiteralValueNode),
    ValueFactory(ValueFactoryNode),
    NamedReference(NamedReferenceNode),
}

impl ValueNode {
    pub fn literal(value: Literal) -> Self {
        ValueNode::Literal(LiteralValueNode {
            value,
            span: Span::synthetic(),
            origin: NodeId::SYNTHETIC,
        })
    }

    pub fn factory(factory_name: &str, values: Vec<ValueNode>) -> Self {
        ValueNode::ValueFactory(ValueFactoryNode {
            factory_name: factory_name.to_string(),
            name_span: Span::synthetic(),
            values,
            span: Span::synthetic(),
            origin: NodeId::SYNTHETIC,
        })
    }

    pub fn span(&self) -> &Span {
        match self {
            ValueNode::Literal(v) => &v.span,
            ValueNode::ValueFactory(v) => &v.span,
            ValueNode::NamedReference(v) => &v.span,
        }
    }

    pub fn origin(&self) -> NodeId {
        match self {
            ValueNode::Literal(v) => v.origin,
            ValueNode::ValueFactory(v) => v.origin,
            ValueNode::NamedReference(v) => v.origin,
        }
    }

    pub fn structurally_eq(&self, other: &ValueNode) -> bool {
        match (self, other) {
            (ValueNode::Literal(a), ValueNode::Literal(b)) => a.value == b.value,
            (ValueNode::ValueFactory(a), ValueNode::ValueFactory(b)) => {
                a.factory_name == b.factory_name && values_structurally_eq(&a.values, &b.values)
            }
            (ValueNode::NamedReference(a), ValueNode::NamedReference(b)) => {
                a.reference_name == b.reference_name
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiteralValueNode {
    pub value: Literal,
    pub span: Span,
    pub origin: NodeId,
}

/// A nested value-producing call such as `file("a.txt")` or `a.b.f(1)`.
#[derive(Debug, Clone)]
pub struct ValueFactoryNode {
    /// Dotted name including the receiver chain.
    pub factory_name: String,
    pub name_span: Span,
    pub values: Vec<ValueNode>,
    pub span: Span,
    pub origin: NodeId,
}

#[derive(Debug, Clone)]
pub struct NamedReferenceNode {
    pub reference_name: String,
    pub span: Span,
    pub origin: NodeId,
}
