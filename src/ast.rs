// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::*;
use crate::*;

use core::{cmp, fmt, ops::Deref};

/// Identity of a statement-tree node within one parse.
///
/// Ids are unique within a parse. Resolution traces are keyed by
/// these ids, and document nodes remember the id of the node they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Origin of document nodes that were not converted from a statement tree.
    pub const SYNTHETIC: NodeId = NodeId(u32::MAX);

    pub fn is_synthetic(&self) -> bool {
        *self == Self::SYNTHETIC
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.is_synthetic() {
            true => write!(f, "#synthetic"),
            false => write!(f, "#{}", self.0),
        }
    }
}

pub struct NodeRef<T> {
    r: Rc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.r).eq(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::Eq for NodeRef<T> {}

impl<T> cmp::Ord for NodeRef<T> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        Rc::as_ptr(&self.r).cmp(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::PartialOrd for NodeRef<T> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Rc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    String(String),
    Boolean(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Long(v) => write!(f, "{v}L"),
            Literal::String(s) => write!(f, "{s:?}"),
            Literal::Boolean(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AugmentOp {
    Plus,
}

#[derive(Debug)]
pub enum Expr {
    Literal {
        span: Span,
        value: Literal,
        id: NodeId,
    },

    Null {
        span: Span,
        id: NodeId,
    },

    This {
        span: Span,
        id: NodeId,
    },

    PropertyAccess {
        span: Span,
        receiver: Option<Ref<Expr>>,
        name: Span,
        id: NodeId,
    },

    FunctionCall {
        span: Span,
        receiver: Option<Ref<Expr>>,
        name: Span,
        args: Vec<FunctionArgument>,
        id: NodeId,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Null { span, .. }
            | Expr::This { span, .. }
            | Expr::PropertyAccess { span, .. }
            | Expr::FunctionCall { span, .. } => span,
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Expr::Literal { id, .. }
            | Expr::Null { id, .. }
            | Expr::This { id, .. }
            | Expr::PropertyAccess { id, .. }
            | Expr::FunctionCall { id, .. } => *id,
        }
    }
}

#[derive(Debug)]
pub enum FunctionArgument {
    Positional(Ref<Expr>),
    Named {
        span: Span,
        name: Span,
        expr: Ref<Expr>,
    },
    Lambda(Ref<Block>),
}

impl FunctionArgument {
    pub fn span(&self) -> &Span {
        match self {
            FunctionArgument::Positional(expr) => expr.span(),
            FunctionArgument::Named { span, .. } => span,
            FunctionArgument::Lambda(block) => &block.span,
        }
    }
}

#[derive(Debug)]
pub enum Stmt {
    Assignment {
        span: Span,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
        id: NodeId,
    },

    AugmentingAssignment {
        span: Span,
        lhs: Ref<Expr>,
        op: AugmentOp,
        rhs: Ref<Expr>,
        id: NodeId,
    },

    LocalValue {
        span: Span,
        name: Span,
        rhs: Ref<Expr>,
        id: NodeId,
    },

    // Function calls, literals, null, this and property accesses.
    Expr(Ref<Expr>),
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Assignment { span, .. }
            | Stmt::AugmentingAssignment { span, .. }
            | Stmt::LocalValue { span, .. } => span,
            Stmt::Expr(e) => e.span(),
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Stmt::Assignment { id, .. }
            | Stmt::AugmentingAssignment { id, .. }
            | Stmt::LocalValue { id, .. } => *id,
            Stmt::Expr(e) => e.id(),
        }
    }
}

/// An ordered sequence of statements: a whole script or the body of a
/// configuring lambda. The span of a lambda body includes its braces.
#[derive(Debug)]
pub struct Block {
    pub span: Span,
    pub statements: Vec<Ref<Stmt>>,
}
