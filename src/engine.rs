// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::dom::writing::*;
use crate::dom::*;
use crate::lexer::*;
use crate::parser::*;
use crate::schema::AnalysisSchema;
use crate::Rc;

use std::convert::AsRef;
use std::path::Path;

use anyhow::{anyhow, bail, Result};
use log::info;

/// Handle to a script added to an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(usize);

/// Owns scripts and drives them through conversion, resolution and
/// regeneration.
#[derive(Clone)]
pub struct Engine {
    scripts: Vec<(Source, DeclarativeDocument)>,
    schema: Option<Rc<AnalysisSchema>>,
    conversion: ConversionOptions,
    resolver: ResolverOptions,
    indent: usize,
}

/// Create a default engine.
impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            scripts: vec![],
            schema: None,
            conversion: ConversionOptions::default(),
            resolver: ResolverOptions::default(),
            indent: 4,
        }
    }

    /// Parse and convert a script. Syntax errors are reported; statements
    /// outside the restricted language become error nodes.
    pub fn add_script(&mut self, path: String, contents: String) -> Result<DocumentId> {
        let source = Source::from_contents(path, contents)?;
        self.add_source(source)
    }

    pub fn add_script_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<DocumentId> {
        let source = Source::from_file(path)?;
        self.add_source(source)
    }

    fn add_source(&mut self, source: Source) -> Result<DocumentId> {
        let block = parse_source(&source)?;
        let document = convert_block_to_document_with_options(&block, &self.conversion);
        info!(
            "added script {} with {} top-level nodes",
            source.file(),
            document.content.len()
        );
        self.scripts.push((source, document));
        Ok(DocumentId(self.scripts.len() - 1))
    }

    pub fn set_schema(&mut self, schema: AnalysisSchema) {
        self.schema = Some(Rc::new(schema));
    }

    pub fn set_strict_receiver_checks(&mut self, b: bool) {
        self.resolver.strict_receiver_checks = b;
    }

    /// Applies to scripts added afterwards.
    pub fn set_conversion_options(&mut self, options: ConversionOptions) {
        self.conversion = options;
    }

    /// Spaces per nesting level in generated text.
    pub fn set_indent(&mut self, width: usize) {
        self.indent = width;
    }

    fn script(&self, id: DocumentId) -> Result<&(Source, DeclarativeDocument)> {
        self.scripts
            .get(id.0)
            .ok_or_else(|| anyhow!("no script with id {}", id.0))
    }

    pub fn source(&self, id: DocumentId) -> Result<&Source> {
        Ok(&self.script(id)?.0)
    }

    pub fn document(&self, id: DocumentId) -> Result<&DeclarativeDocument> {
        Ok(&self.script(id)?.1)
    }

    /// Project a resolution trace for the script onto its document.
    pub fn resolve(
        &self,
        id: DocumentId,
        trace: &ResolutionTrace,
    ) -> Result<ResolvedDeclarativeDocument<'_>> {
        let Some(schema) = &self.schema else {
            bail!("no schema has been set");
        };
        let document = self.document(id)?;
        Ok(resolve(schema, document, trace, &self.resolver)?)
    }

    fn canonical(&self) -> CanonicalCodeGenerator {
        let width = self.indent;
        CanonicalCodeGenerator::with_indent(move |depth| " ".repeat(width * depth))
    }

    /// Regenerate the script's text with `mutations` applied.
    pub fn rewrite(&self, id: DocumentId, mutations: &dyn NodeMutations) -> Result<String> {
        let tree = TextPreservingTree::build(self.document(id)?);
        let generator = MutatedDocumentTextGenerator::with_canonical(self.canonical());
        Ok(generator.generate(&tree, mutations))
    }

    /// The script's document rendered without its original formatting.
    pub fn canonical_text(&self, id: DocumentId) -> Result<String> {
        Ok(self.canonical().generate(self.document(id)?))
    }
}
