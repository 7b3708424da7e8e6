// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::*;
use crate::ast::{AugmentOp, Block, Expr, FunctionArgument, Ref, Stmt};
use crate::utils::{get_name_chain, get_path_string};

use log::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Convert dotted names used as values (`x = a.b`) into named references
    /// instead of rejecting them.
    pub allow_named_references: bool,
}

/// Convert a parsed block into a document.
///
/// Conversion is total: every statement yields exactly one node, in order.
/// Statements outside the restricted language become [`ErrorNode`]s.
pub fn convert_block_to_document(block: &Block) -> DeclarativeDocument {
    convert_block_to_document_with_options(block, &ConversionOptions::default())
}

pub fn convert_block_to_document_with_options(
    block: &Block,
    options: &ConversionOptions,
) -> DeclarativeDocument {
    let converter = Converter { options };
    let content = converter.statements(&block.statements);
    debug!(
        "converted {} statements into a document with {} top-level errors",
        block.statements.len(),
        content
            .iter()
            .filter(|n| matches!(n, DocumentNode::Error(_)))
            .count()
    );
    DeclarativeDocument {
        content,
        span: block.span.clone(),
    }
}

type ValueResult = core::result::Result<ValueNode, Vec<DocumentError>>;

struct Converter<'a> {
    options: &'a ConversionOptions,
}

impl Converter<'_> {
    fn statements(&self, statements: &[Ref<Stmt>]) -> Vec<DocumentNode> {
        statements.iter().map(|s| self.statement(s)).collect()
    }

    fn error_node(span: &Span, origin: NodeId, errors: Vec<DocumentError>) -> DocumentNode {
        DocumentNode::Error(ErrorNode {
            errors,
            span: span.clone(),
            origin,
        })
    }

    fn statement(&self, stmt: &Stmt) -> DocumentNode {
        match stmt {
            Stmt::Assignment { span, lhs, rhs, id } => {
                self.property(span, lhs, rhs, PropertyAugmentation::None, *id)
            }
            Stmt::AugmentingAssignment {
                span,
                lhs,
                op,
                rhs,
                id,
            } => {
                let augmentation = match op {
                    AugmentOp::Plus => PropertyAugmentation::Plus,
                };
                self.property(span, lhs, rhs, augmentation, *id)
            }
            Stmt::LocalValue { span, id, .. } => Self::error_node(
                span,
                *id,
                vec![DocumentError::new(UnsupportedSyntaxCause::LocalVal, span)],
            ),
            Stmt::Expr(expr) => match expr.as_ref() {
                Expr::FunctionCall {
                    span,
                    receiver,
                    name,
                    args,
                    id,
                } => self.element(span, receiver.as_ref(), name, args, *id),
                Expr::Literal { span, id, .. }
                | Expr::Null { span, id }
                | Expr::This { span, id }
                | Expr::PropertyAccess { span, id, .. } => Self::error_node(
                    span,
                    *id,
                    vec![DocumentError::new(UnsupportedSyntaxCause::DanglingExpr, span)],
                ),
            },
        }
    }

    fn property(
        &self,
        span: &Span,
        lhs: &Expr,
        rhs: &Expr,
        augmentation: PropertyAugmentation,
        origin: NodeId,
    ) -> DocumentNode {
        // Anything but a bare name on the left has a receiver of some sort.
        let name = match lhs {
            Expr::PropertyAccess {
                receiver: None,
                name,
                ..
            } => name,
            _ => {
                return Self::error_node(
                    span,
                    origin,
                    vec![DocumentError::new(
                        UnsupportedSyntaxCause::AssignmentWithExplicitReceiver,
                        lhs.span(),
                    )],
                )
            }
        };

        match self.value(rhs) {
            Ok(value) => DocumentNode::Property(PropertyNode {
                name: name.text().to_string(),
                name_span: name.clone(),
                value,
                augmentation,
                span: span.clone(),
                origin,
            }),
            Err(errors) => Self::error_node(span, origin, errors),
        }
    }

    fn element(
        &self,
        span: &Span,
        receiver: Option<&Ref<Expr>>,
        name: &Span,
        args: &[FunctionArgument],
        origin: NodeId,
    ) -> DocumentNode {
        let mut errors = vec![];
        if let Some(receiver) = receiver {
            errors.push(DocumentError::new(
                UnsupportedSyntaxCause::ElementWithExplicitReceiver,
                receiver.span(),
            ));
        }

        let mut element_values = vec![];
        let mut lambdas = vec![];
        for arg in args {
            match arg {
                FunctionArgument::Positional(expr) => match self.value(expr) {
                    Ok(v) => element_values.push(v),
                    Err(mut e) => errors.append(&mut e),
                },
                FunctionArgument::Named { span, .. } => errors.push(DocumentError::new(
                    UnsupportedSyntaxCause::ElementArgumentFormat,
                    span,
                )),
                FunctionArgument::Lambda(block) => lambdas.push(block),
            }
        }
        if let Some(extra) = lambdas.get(1) {
            errors.push(DocumentError::new(
                UnsupportedSyntaxCause::ElementMultipleLambdas,
                &extra.span,
            ));
        }

        if !errors.is_empty() {
            return Self::error_node(span, origin, errors);
        }

        let content = match lambdas.first() {
            Some(block) => self.statements(&block.statements),
            None => vec![],
        };
        DocumentNode::Element(ElementNode {
            name: name.text().to_string(),
            name_span: name.clone(),
            element_values,
            content,
            span: span.clone(),
            origin,
        })
    }

    fn value(&self, expr: &Expr) -> ValueResult {
        match expr {
            Expr::Literal { span, value, id } => Ok(ValueNode::Literal(LiteralValueNode {
                value: value.clone(),
                span: span.clone(),
                origin: *id,
            })),
            Expr::Null { span, .. } => Err(vec![DocumentError::new(
                UnsupportedSyntaxCause::UnsupportedNullValue,
                span,
            )]),
            Expr::This { span, .. } => Err(vec![DocumentError::new(
                UnsupportedSyntaxCause::UnsupportedThisValue,
                span,
            )]),
            Expr::PropertyAccess { span, id, .. } => {
                match get_name_chain(expr) {
                    Some(chain) if self.options.allow_named_references => {
                        Ok(ValueNode::NamedReference(NamedReferenceNode {
                            reference_name: chain.join("."),
                            span: span.clone(),
                            origin: *id,
                        }))
                    }
                    _ => Err(vec![DocumentError::new(
                        UnsupportedSyntaxCause::UnsupportedPropertyAccess,
                        span,
                    )]),
                }
            }
            Expr::FunctionCall {
                span,
                receiver,
                name,
                args,
                id,
            } => {
                let mut errors = vec![];
                let receiver = receiver.as_ref().map(|r| r.as_ref());
                let factory_name = get_path_string(receiver, name.text());
                if factory_name.is_none() {
                    if let Some(r) = receiver {
                        errors.push(DocumentError::new(
                            UnsupportedSyntaxCause::ValueFactoryCallWithComplexReceiver,
                            r.span(),
                        ));
                    }
                }

                let mut values = vec![];
                for arg in args {
                    match arg {
                        FunctionArgument::Positional(e) => match self.value(e) {
                            Ok(v) => values.push(v),
                            Err(mut e) => errors.append(&mut e),
                        },
                        FunctionArgument::Named { .. } | FunctionArgument::Lambda(_) => {
                            errors.push(DocumentError::new(
                                UnsupportedSyntaxCause::ValueFactoryArgumentFormat,
                                arg.span(),
                            ))
                        }
                    }
                }

                match factory_name {
                    Some(factory_name) if errors.is_empty() => {
                        let name_span = match receiver {
                            Some(r) => r.span().to(name),
                            None => name.clone(),
                        };
                        Ok(ValueNode::ValueFactory(ValueFactoryNode {
                            factory_name,
                            name_span,
                            values,
                            span: span.clone(),
                            origin: *id,
                        }))
                    }
                    _ => Err(errors),
                }
            }
        }
    }
}
