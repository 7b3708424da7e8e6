// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// A host member that cannot be described by the schema.
///
/// Schema construction stops at the first such member; `context` records
/// where the builder was (outermost first), e.g. the class, then the function,
/// then the parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", render_context(.context))]
pub struct SchemaBuildingError {
    context: Vec<String>,
    message: String,
}

fn render_context(context: &[String]) -> String {
    context
        .iter()
        .rev()
        .map(|c| format!("\n  in {c}"))
        .collect()
}

impl SchemaBuildingError {
    pub fn new(context: Vec<String>, message: String) -> Self {
        Self { context, message }
    }

    pub fn context(&self) -> &[String] {
        &self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
