// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;

/// Flatten a dotted name chain such as `a.b` into its components.
///
/// Returns `None` when the expression is anything other than a chain of
/// receiver-less or chained property accesses.
pub fn get_name_chain(expr: &Expr) -> Option<Vec<&str>> {
    let mut comps: Vec<&str> = vec![];
    let mut expr = Some(expr);
    while let Some(e) = expr {
        match e {
            Expr::PropertyAccess { receiver, name, .. } => {
                comps.push(name.text());
                expr = receiver.as_ref().map(|r| r.as_ref());
            }
            _ => return None,
        }
    }
    comps.reverse();
    Some(comps)
}

/// Qualified name of `name` accessed on `receiver`, e.g. `a.b.f`.
pub fn get_path_string(receiver: Option<&Expr>, name: &str) -> Option<String> {
    let mut comps = match receiver {
        Some(r) => get_name_chain(r)?,
        None => vec![],
    };
    comps.push(name);
    Some(comps.join("."))
}

/// Leading spaces and tabs of `line`.
pub fn leading_indent(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

pub fn is_blank(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}
