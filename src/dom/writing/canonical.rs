// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::Literal;
use crate::dom::*;

/// Renders documents without reference to any original text.
pub struct CanonicalCodeGenerator {
    indent: Box<dyn Fn(usize) -> String>,
}

impl Default for CanonicalCodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CanonicalCodeGenerator {
    /// Four spaces per nesting level.
    pub fn new() -> Self {
        Self::with_indent(|depth| "    ".repeat(depth))
    }

    pub fn with_indent(indent: impl Fn(usize) -> String + 'static) -> Self {
        Self {
            indent: Box::new(indent),
        }
    }

    pub fn indent(&self, depth: usize) -> String {
        (self.indent)(depth)
    }

    /// Every top-level node ends with a line break; consecutive elements are
    /// separated by a blank line.
    pub fn generate(&self, document: &DeclarativeDocument) -> String {
        let mut out = String::new();
        let mut previous: Option<&DocumentNode> = None;
        for node in &document.content {
            if previous.is_some_and(|p| p.is_element()) && node.is_element() {
                out.push('\n');
            }
            out.push_str(&self.node(node, 0));
            out.push('\n');
            previous = Some(node);
        }
        out
    }

    /// A node rendered at `depth`. The first line carries no indentation.
    pub fn node(&self, node: &DocumentNode, depth: usize) -> String {
        match node {
            DocumentNode::Element(e) => {
                let mut out = e.name.clone();
                if !e.element_values.is_empty() || e.content.is_empty() {
                    out.push('(');
                    out.push_str(&self.values(&e.element_values));
                    out.push(')');
                }
                if !e.content.is_empty() {
                    out.push_str(" {\n");
                    let inner = self.indent(depth + 1);
                    for child in &e.content {
                        out.push_str(&inner);
                        out.push_str(&self.node(child, depth + 1));
                        out.push('\n');
                    }
                    out.push_str(&self.indent(depth));
                    out.push('}');
                }
                out
            }
            DocumentNode::Property(p) => {
                let op = match p.augmentation {
                    PropertyAugmentation::None => "=",
                    PropertyAugmentation::Plus => "+=",
                };
                format!("{} {op} {}", p.name, self.value(&p.value))
            }
            DocumentNode::Error(e) => e.span.text().to_string(),
        }
    }

    fn values(&self, values: &[ValueNode]) -> String {
        values
            .iter()
            .map(|v| self.value(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn value(&self, value: &ValueNode) -> String {
        match value {
            ValueNode::Literal(l) => Self::literal(&l.value),
            ValueNode::ValueFactory(f) => format!("{}({})", f.factory_name, self.values(&f.values)),
            ValueNode::NamedReference(r) => r.reference_name.clone(),
        }
    }

    fn literal(value: &Literal) -> String {
        match value {
            Literal::Int(v) => v.to_string(),
            Literal::Long(v) => format!("{v}L"),
            Literal::String(s) => match serde_json::to_string(s) {
                Ok(s) => s,
                Err(_) => format!("{s:?}"),
            },
            Literal::Boolean(b) => b.to_string(),
        }
    }
}
