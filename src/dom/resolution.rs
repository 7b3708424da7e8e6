// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resolution traces (input) and resolved documents (output) of the
//! resolver projection.

use super::*;
use crate::schema::{DataClass, DataProperty, SchemaFunction, SchemaMemberFunction};
use crate::Rc;

use std::collections::BTreeMap;

/// Which receiver a resolved call or assignment was bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverOrigin {
    /// The receiver of the innermost enclosing block.
    ImplicitCurrent,
    /// The receiver of an outer block.
    ImplicitOuter,
    Explicit,
}

/// What the semantic checker bound a statement-tree node to.
#[derive(Debug, Clone)]
pub enum Binding {
    Element {
        function: Rc<SchemaMemberFunction>,
        receiver: ReceiverOrigin,
    },
    Property {
        receiver_type: Rc<DataClass>,
        property: Rc<DataProperty>,
        receiver: ReceiverOrigin,
    },
    ValueFactory {
        function: SchemaFunction,
        receiver: ReceiverOrigin,
    },
    NamedReference {
        name: String,
        receiver: ReceiverOrigin,
    },
}

impl Binding {
    pub fn receiver(&self) -> ReceiverOrigin {
        match self {
            Binding::Element { receiver, .. }
            | Binding::Property { receiver, .. }
            | Binding::ValueFactory { receiver, .. }
            | Binding::NamedReference { receiver, .. } => *receiver,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Binding::Element { .. } => "element",
            Binding::Property { .. } => "property",
            Binding::ValueFactory { .. } => "value factory",
            Binding::NamedReference { .. } => "named reference",
        }
    }
}

/// Failure reasons reported by the semantic checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorReason {
    AmbiguousImport,
    AmbiguousFunctions,
    UnresolvedReference,
    NonReadableProperty,
    ReadOnlyPropertyAssignment,
    UnresolvedFunctionCallArguments,
    UnresolvedFunctionCallReceiver,
    UnresolvedFunctionCallSignature,
    AssignmentTypeMismatch,
    MissingConfigureLambda,
    UnusedConfigureLambda,
    AccessOnCurrentReceiverOnlyViolation,
    UnresolvedAssignmentLhs,
    UnresolvedAssignmentRhs,
    UnitAssignment,
    DanglingPureExpression,
    ValReassignment,
    ExternalReassignment,
    DuplicateLocalValue,
    OpaqueArgumentForIdentityParameter,
    UnsupportedLanguageFeature,
}

#[derive(Debug, Clone)]
pub enum TraceResult {
    Resolved(Binding),
    Failed(Vec<ErrorReason>),
}

/// Per-node verdicts of the semantic checker, keyed by statement-tree node.
/// Nodes the checker did not reach have no entry.
#[derive(Debug, Clone, Default)]
pub struct ResolutionTrace {
    results: BTreeMap<NodeId, TraceResult>,
}

impl ResolutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId, result: TraceResult) -> &mut Self {
        self.results.insert(id, result);
        self
    }

    pub fn resolved(&mut self, id: NodeId, binding: Binding) -> &mut Self {
        self.insert(id, TraceResult::Resolved(binding))
    }

    pub fn failed(&mut self, id: NodeId, reasons: Vec<ErrorReason>) -> &mut Self {
        self.insert(id, TraceResult::Failed(reasons))
    }

    pub fn get(&self, id: NodeId) -> Option<&TraceResult> {
        self.results.get(&id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementNotResolvedReason {
    AmbiguousName,
    BlockMismatch,
    UnresolvedSignature,
    UnresolvedBase,
    CrossScopeAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyNotAssignedReason {
    UnresolvedName,
    ValueTypeMismatch,
    NotAssignable,
    UnresolvedValueUsed,
    CrossScopeAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueFactoryNotResolvedReason {
    AmbiguousName,
    UnresolvedSignature,
    UnresolvedBase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NamedReferenceNotResolvedReason {
    UnresolvedName,
    NotReadable,
}

#[derive(Debug, Clone)]
pub enum ElementResolution {
    /// Configures an existing object reached through the function.
    ConfiguringElementResolved {
        element_type: Rc<DataClass>,
        function: Rc<SchemaMemberFunction>,
    },
    /// Creates a new object.
    ContainerElementResolved {
        element_type: Rc<DataClass>,
        function: Rc<SchemaMemberFunction>,
    },
    ElementNotResolved(Vec<ElementNotResolvedReason>),
}

#[derive(Debug, Clone)]
pub enum PropertyResolution {
    PropertyAssignmentResolved {
        receiver_type: Rc<DataClass>,
        property: Rc<DataProperty>,
    },
    PropertyNotAssigned(Vec<PropertyNotAssignedReason>),
}

/// The resolution of every error node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorResolution;

#[derive(Debug, Clone)]
pub enum ValueResolution {
    LiteralValueResolved(Literal),
    ValueFactoryResolved(SchemaFunction),
    ValueFactoryNotResolved(Vec<ValueFactoryNotResolvedReason>),
    NamedReferenceResolved(String),
    NamedReferenceNotResolved(Vec<NamedReferenceNotResolvedReason>),
}

#[derive(Debug, Clone)]
pub struct ResolvedValueNode<'a> {
    pub node: &'a ValueNode,
    pub resolution: ValueResolution,
    /// Arguments of a value factory.
    pub values: Vec<ResolvedValueNode<'a>>,
}

#[derive(Debug, Clone)]
pub enum ResolvedDocumentNode<'a> {
    Element {
        node: &'a ElementNode,
        resolution: ElementResolution,
        element_values: Vec<ResolvedValueNode<'a>>,
        content: Vec<ResolvedDocumentNode<'a>>,
    },
    Property {
        node: &'a PropertyNode,
        resolution: PropertyResolution,
        value: ResolvedValueNode<'a>,
    },
    Error {
        node: &'a ErrorNode,
        resolution: ErrorResolution,
    },
}

impl ResolvedDocumentNode<'_> {
    pub fn is_resolved(&self) -> bool {
        match self {
            ResolvedDocumentNode::Element { resolution, .. } => {
                !matches!(resolution, ElementResolution::ElementNotResolved(_))
            }
            ResolvedDocumentNode::Property { resolution, .. } => {
                !matches!(resolution, PropertyResolution::PropertyNotAssigned(_))
            }
            ResolvedDocumentNode::Error { .. } => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedDeclarativeDocument<'a> {
    pub content: Vec<ResolvedDocumentNode<'a>>,
    pub document: &'a DeclarativeDocument,
}
