// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::*;
use crate::schema::{AnalysisSchema, DataClass, DataTypeRef, FunctionSemantics};
use crate::Rc;

use std::collections::BTreeSet;

use log::debug;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Reject bindings to the receiver of an enclosing block.
    pub strict_receiver_checks: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            strict_receiver_checks: true,
        }
    }
}

/// Broken invariants between the converter, the trace and the schema.
///
/// These are programming errors in the producer of the trace, not problems
/// with the script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("internal error: reason {reason:?} cannot occur for {node_kind} node {origin}")]
    UnexpectedReason {
        node_kind: &'static str,
        reason: ErrorReason,
        origin: NodeId,
    },
    #[error("internal error: {node_kind} node {origin} is bound as a {binding}")]
    UnexpectedBinding {
        node_kind: &'static str,
        binding: &'static str,
        origin: NodeId,
    },
    #[error("internal error: element {origin} is bound to pure function `{function}`")]
    PureElementFunction { function: String, origin: NodeId },
    #[error("internal error: type `{type_ref}` of element {origin} is not a class of the schema")]
    NotAClass { type_ref: String, origin: NodeId },
}

type Result<T> = core::result::Result<T, ResolutionError>;

fn unexpected(node_kind: &'static str, reason: ErrorReason, origin: NodeId) -> ResolutionError {
    ResolutionError::UnexpectedReason {
        node_kind,
        reason,
        origin,
    }
}

// The normalization tables below deliberately have no wildcard arm.
// A new internal reason must be placed explicitly for every node kind.

fn element_reason(reason: ErrorReason, origin: NodeId) -> Result<ElementNotResolvedReason> {
    use ElementNotResolvedReason as R;
    use ErrorReason::*;
    Ok(match reason {
        AmbiguousFunctions | AmbiguousImport => R::AmbiguousName,
        MissingConfigureLambda | UnusedConfigureLambda => R::BlockMismatch,
        UnresolvedFunctionCallSignature
        | UnresolvedFunctionCallArguments
        | OpaqueArgumentForIdentityParameter => R::UnresolvedSignature,
        UnresolvedFunctionCallReceiver | UnresolvedReference => R::UnresolvedBase,
        AccessOnCurrentReceiverOnlyViolation => R::CrossScopeAccess,
        NonReadableProperty
        | ReadOnlyPropertyAssignment
        | AssignmentTypeMismatch
        | UnresolvedAssignmentLhs
        | UnresolvedAssignmentRhs
        | UnitAssignment
        | DanglingPureExpression
        | ValReassignment
        | ExternalReassignment
        | DuplicateLocalValue
        | UnsupportedLanguageFeature => return Err(unexpected("element", reason, origin)),
    })
}

fn property_reason(reason: ErrorReason, origin: NodeId) -> Result<PropertyNotAssignedReason> {
    use ErrorReason::*;
    use PropertyNotAssignedReason as R;
    Ok(match reason {
        UnresolvedReference | UnresolvedAssignmentLhs => R::UnresolvedName,
        AssignmentTypeMismatch | UnitAssignment => R::ValueTypeMismatch,
        ReadOnlyPropertyAssignment | ValReassignment | ExternalReassignment => R::NotAssignable,
        UnresolvedAssignmentRhs => R::UnresolvedValueUsed,
        AccessOnCurrentReceiverOnlyViolation => R::CrossScopeAccess,
        AmbiguousImport
        | AmbiguousFunctions
        | NonReadableProperty
        | UnresolvedFunctionCallArguments
        | UnresolvedFunctionCallReceiver
        | UnresolvedFunctionCallSignature
        | MissingConfigureLambda
        | UnusedConfigureLambda
        | DanglingPureExpression
        | DuplicateLocalValue
        | OpaqueArgumentForIdentityParameter
        | UnsupportedLanguageFeature => return Err(unexpected("property", reason, origin)),
    })
}

fn value_factory_reason(
    reason: ErrorReason,
    origin: NodeId,
) -> Result<ValueFactoryNotResolvedReason> {
    use ErrorReason::*;
    use ValueFactoryNotResolvedReason as R;
    Ok(match reason {
        AmbiguousFunctions | AmbiguousImport => R::AmbiguousName,
        UnresolvedFunctionCallSignature
        | UnresolvedFunctionCallArguments
        | OpaqueArgumentForIdentityParameter => R::UnresolvedSignature,
        UnresolvedFunctionCallReceiver | UnresolvedReference => R::UnresolvedBase,
        NonReadableProperty
        | ReadOnlyPropertyAssignment
        | AssignmentTypeMismatch
        | MissingConfigureLambda
        | UnusedConfigureLambda
        | AccessOnCurrentReceiverOnlyViolation
        | UnresolvedAssignmentLhs
        | UnresolvedAssignmentRhs
        | UnitAssignment
        | DanglingPureExpression
        | ValReassignment
        | ExternalReassignment
        | DuplicateLocalValue
        | UnsupportedLanguageFeature => return Err(unexpected("value factory", reason, origin)),
    })
}

fn named_reference_reason(
    reason: ErrorReason,
    origin: NodeId,
) -> Result<NamedReferenceNotResolvedReason> {
    use ErrorReason::*;
    use NamedReferenceNotResolvedReason as R;
    Ok(match reason {
        UnresolvedReference => R::UnresolvedName,
        NonReadableProperty => R::NotReadable,
        AmbiguousImport
        | AmbiguousFunctions
        | ReadOnlyPropertyAssignment
        | UnresolvedFunctionCallArguments
        | UnresolvedFunctionCallReceiver
        | UnresolvedFunctionCallSignature
        | AssignmentTypeMismatch
        | MissingConfigureLambda
        | UnusedConfigureLambda
        | AccessOnCurrentReceiverOnlyViolation
        | UnresolvedAssignmentLhs
        | UnresolvedAssignmentRhs
        | UnitAssignment
        | DanglingPureExpression
        | ValReassignment
        | ExternalReassignment
        | DuplicateLocalValue
        | OpaqueArgumentForIdentityParameter
        | UnsupportedLanguageFeature => {
            return Err(unexpected("named reference", reason, origin))
        }
    })
}

// Normalize, deduplicate and sort.
fn normalize<T: Ord>(
    reasons: &[ErrorReason],
    origin: NodeId,
    f: fn(ErrorReason, NodeId) -> Result<T>,
) -> Result<Vec<T>> {
    let mut out = BTreeSet::new();
    for reason in reasons {
        out.insert(f(*reason, origin)?);
    }
    Ok(out.into_iter().collect())
}

/// Project a resolution trace onto a document.
///
/// Failures of the script are reported as data on the nodes; an `Err` means
/// the trace contradicts the document or the schema.
pub fn resolve<'a>(
    schema: &AnalysisSchema,
    document: &'a DeclarativeDocument,
    trace: &ResolutionTrace,
    options: &ResolverOptions,
) -> Result<ResolvedDeclarativeDocument<'a>> {
    let resolver = Resolver {
        schema,
        trace,
        options,
    };
    let content = resolver.nodes(&document.content)?;
    debug!(
        "resolved document: {} top-level nodes, {} unresolved",
        content.len(),
        content.iter().filter(|n| !n.is_resolved()).count()
    );
    Ok(ResolvedDeclarativeDocument { content, document })
}

struct Resolver<'s> {
    schema: &'s AnalysisSchema,
    trace: &'s ResolutionTrace,
    options: &'s ResolverOptions,
}

impl Resolver<'_> {
    fn nodes<'a>(&self, nodes: &'a [DocumentNode]) -> Result<Vec<ResolvedDocumentNode<'a>>> {
        nodes.iter().map(|n| self.node(n)).collect()
    }

    fn node<'a>(&self, node: &'a DocumentNode) -> Result<ResolvedDocumentNode<'a>> {
        Ok(match node {
            DocumentNode::Element(e) => ResolvedDocumentNode::Element {
                node: e,
                resolution: self.element(e)?,
                element_values: self.values(&e.element_values)?,
                content: self.nodes(&e.content)?,
            },
            DocumentNode::Property(p) => ResolvedDocumentNode::Property {
                node: p,
                resolution: self.property(p)?,
                value: self.value(&p.value)?,
            },
            DocumentNode::Error(e) => ResolvedDocumentNode::Error {
                node: e,
                resolution: ErrorResolution,
            },
        })
    }

    fn is_cross_scope(&self, receiver: ReceiverOrigin) -> bool {
        self.options.strict_receiver_checks && receiver == ReceiverOrigin::ImplicitOuter
    }

    fn class_of(&self, type_ref: &DataTypeRef, origin: NodeId) -> Result<Rc<DataClass>> {
        match self.schema.resolve_ref(type_ref) {
            Some(crate::schema::DataType::Class(c)) => Ok(c),
            _ => Err(ResolutionError::NotAClass {
                type_ref: type_ref.to_string(),
                origin,
            }),
        }
    }

    fn element(&self, e: &ElementNode) -> Result<ElementResolution> {
        let binding = match self.trace.get(e.origin) {
            None => {
                return Ok(ElementResolution::ElementNotResolved(vec![
                    ElementNotResolvedReason::UnresolvedBase,
                ]))
            }
            Some(TraceResult::Failed(reasons)) => {
                return Ok(ElementResolution::ElementNotResolved(normalize(
                    reasons,
                    e.origin,
                    element_reason,
                )?))
            }
            Some(TraceResult::Resolved(binding)) => binding,
        };

        let Binding::Element { function, receiver } = binding else {
            return Err(ResolutionError::UnexpectedBinding {
                node_kind: "element",
                binding: binding.kind(),
                origin: e.origin,
            });
        };
        if self.is_cross_scope(*receiver) {
            return Ok(ElementResolution::ElementNotResolved(vec![
                ElementNotResolvedReason::CrossScopeAccess,
            ]));
        }

        match function.semantics() {
            FunctionSemantics::AccessAndConfigure {
                configured_type, ..
            } => Ok(ElementResolution::ConfiguringElementResolved {
                element_type: self.class_of(configured_type, e.origin)?,
                function: function.clone(),
            }),
            FunctionSemantics::NewObject { returned_type, .. } => {
                Ok(ElementResolution::ContainerElementResolved {
                    element_type: self.class_of(returned_type, e.origin)?,
                    function: function.clone(),
                })
            }
            FunctionSemantics::Pure { .. } => Err(ResolutionError::PureElementFunction {
                function: function.simple_name().to_string(),
                origin: e.origin,
            }),
        }
    }

    fn property(&self, p: &PropertyNode) -> Result<PropertyResolution> {
        let binding = match self.trace.get(p.origin) {
            None => {
                return Ok(PropertyResolution::PropertyNotAssigned(vec![
                    PropertyNotAssignedReason::UnresolvedName,
                ]))
            }
            Some(TraceResult::Failed(reasons)) => {
                return Ok(PropertyResolution::PropertyNotAssigned(normalize(
                    reasons,
                    p.origin,
                    property_reason,
                )?))
            }
            Some(TraceResult::Resolved(binding)) => binding,
        };

        let Binding::Property {
            receiver_type,
            property,
            receiver,
        } = binding
        else {
            return Err(ResolutionError::UnexpectedBinding {
                node_kind: "property",
                binding: binding.kind(),
                origin: p.origin,
            });
        };
        if self.is_cross_scope(*receiver) {
            return Ok(PropertyResolution::PropertyNotAssigned(vec![
                PropertyNotAssignedReason::CrossScopeAccess,
            ]));
        }
        Ok(PropertyResolution::PropertyAssignmentResolved {
            receiver_type: receiver_type.clone(),
            property: property.clone(),
        })
    }

    fn values<'a>(&self, values: &'a [ValueNode]) -> Result<Vec<ResolvedValueNode<'a>>> {
        values.iter().map(|v| self.value(v)).collect()
    }

    fn value<'a>(&self, value: &'a ValueNode) -> Result<ResolvedValueNode<'a>> {
        let (resolution, values) = match value {
            ValueNode::Literal(l) => (ValueResolution::LiteralValueResolved(l.value.clone()), vec![]),
            ValueNode::ValueFactory(f) => (self.value_factory(f)?, self.values(&f.values)?),
            ValueNode::NamedReference(r) => (self.named_reference(r)?, vec![]),
        };
        Ok(ResolvedValueNode {
            node: value,
            resolution,
            values,
        })
    }

    fn value_factory(&self, f: &ValueFactoryNode) -> Result<ValueResolution> {
        match self.trace.get(f.origin) {
            None => Ok(ValueResolution::ValueFactoryNotResolved(vec![
                ValueFactoryNotResolvedReason::UnresolvedBase,
            ])),
            Some(TraceResult::Failed(reasons)) => Ok(ValueResolution::ValueFactoryNotResolved(
                normalize(reasons, f.origin, value_factory_reason)?,
            )),
            Some(TraceResult::Resolved(Binding::ValueFactory { function, .. })) => {
                Ok(ValueResolution::ValueFactoryResolved(function.clone()))
            }
            Some(TraceResult::Resolved(binding)) => Err(ResolutionError::UnexpectedBinding {
                node_kind: "value factory",
                binding: binding.kind(),
                origin: f.origin,
            }),
        }
    }

    fn named_reference(&self, r: &NamedReferenceNode) -> Result<ValueResolution> {
        match self.trace.get(r.origin) {
            None => Ok(ValueResolution::NamedReferenceNotResolved(vec![
                NamedReferenceNotResolvedReason::UnresolvedName,
            ])),
            Some(TraceResult::Failed(reasons)) => Ok(ValueResolution::NamedReferenceNotResolved(
                normalize(reasons, r.origin, named_reference_reason)?,
            )),
            Some(TraceResult::Resolved(Binding::NamedReference { name, .. })) => {
                Ok(ValueResolution::NamedReferenceResolved(name.clone()))
            }
            Some(TraceResult::Resolved(binding)) => Err(ResolutionError::UnexpectedBinding {
                node_kind: "named reference",
                binding: binding.kind(),
                origin: r.origin,
            }),
        }
    }
}
