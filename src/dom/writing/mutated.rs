// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::canonical::CanonicalCodeGenerator;
use super::text_tree::{ChildTag, TextPreservingTree, TextTreeChild, TextTreeNode};
use crate::dom::{DocumentNode, ValueNode};
use crate::utils::is_blank;

use log::{debug, trace};

/// Edits applied while regenerating the text of a document.
///
/// `remove_node_if` is consulted for every child of the text tree, leaves
/// included. Insertion is consulted for `BlockElement`, `AssignmentRhs` and
/// `CallArgument` tags, before and after the removal check. Value
/// replacement applies to `AssignmentRhs` and `CallArgument` tags. `map_name`
/// is called for every `Name` leaf with the tag of the node owning it.
pub trait NodeMutations {
    fn remove_node_if(&self, _tag: &ChildTag<'_>) -> bool {
        false
    }

    fn insert_nodes_before(&self, _tag: &ChildTag<'_>) -> Vec<DocumentNode> {
        vec![]
    }

    fn insert_nodes_after(&self, _tag: &ChildTag<'_>) -> Vec<DocumentNode> {
        vec![]
    }

    fn map_name(&self, _owner: &ChildTag<'_>, name: &str) -> String {
        name.to_string()
    }

    fn replace_value(&self, _tag: &ChildTag<'_>) -> Option<ValueNode> {
        None
    }
}

/// Leaves the text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMutations;

impl NodeMutations for NoMutations {}

type RemoveFn<'f> = Box<dyn Fn(&ChildTag<'_>) -> bool + 'f>;
type InsertFn<'f> = Box<dyn Fn(&ChildTag<'_>) -> Vec<DocumentNode> + 'f>;
type MapNameFn<'f> = Box<dyn Fn(&ChildTag<'_>, &str) -> String + 'f>;
type ReplaceFn<'f> = Box<dyn Fn(&ChildTag<'_>) -> Option<ValueNode> + 'f>;

/// Closure-backed [`NodeMutations`].
#[derive(Default)]
pub struct Mutations<'f> {
    remove: Option<RemoveFn<'f>>,
    before: Option<InsertFn<'f>>,
    after: Option<InsertFn<'f>>,
    rename: Option<MapNameFn<'f>>,
    replace: Option<ReplaceFn<'f>>,
}

impl<'f> Mutations<'f> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_node_if(mut self, f: impl Fn(&ChildTag<'_>) -> bool + 'f) -> Self {
        self.remove = Some(Box::new(f));
        self
    }

    pub fn insert_nodes_before(
        mut self,
        f: impl Fn(&ChildTag<'_>) -> Vec<DocumentNode> + 'f,
    ) -> Self {
        self.before = Some(Box::new(f));
        self
    }

    pub fn insert_nodes_after(
        mut self,
        f: impl Fn(&ChildTag<'_>) -> Vec<DocumentNode> + 'f,
    ) -> Self {
        self.after = Some(Box::new(f));
        self
    }

    pub fn map_name(mut self, f: impl Fn(&ChildTag<'_>, &str) -> String + 'f) -> Self {
        self.rename = Some(Box::new(f));
        self
    }

    pub fn replace_value(mut self, f: impl Fn(&ChildTag<'_>) -> Option<ValueNode> + 'f) -> Self {
        self.replace = Some(Box::new(f));
        self
    }
}

impl NodeMutations for Mutations<'_> {
    fn remove_node_if(&self, tag: &ChildTag<'_>) -> bool {
        self.remove.as_ref().is_some_and(|f| f(tag))
    }

    fn insert_nodes_before(&self, tag: &ChildTag<'_>) -> Vec<DocumentNode> {
        self.before.as_ref().map(|f| f(tag)).unwrap_or_default()
    }

    fn insert_nodes_after(&self, tag: &ChildTag<'_>) -> Vec<DocumentNode> {
        self.after.as_ref().map(|f| f(tag)).unwrap_or_default()
    }

    fn map_name(&self, owner: &ChildTag<'_>, name: &str) -> String {
        match &self.rename {
            Some(f) => f(owner, name),
            None => name.to_string(),
        }
    }

    fn replace_value(&self, tag: &ChildTag<'_>) -> Option<ValueNode> {
        self.replace.as_ref().and_then(|f| f(tag))
    }
}

/// Regenerates the original text of a document with mutations applied.
/// Text the mutations do not touch is reproduced byte for byte.
#[derive(Default)]
pub struct MutatedDocumentTextGenerator {
    canonical: CanonicalCodeGenerator,
}

impl MutatedDocumentTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserted nodes and replaced values are rendered by `canonical`.
    pub fn with_canonical(canonical: CanonicalCodeGenerator) -> Self {
        Self { canonical }
    }

    pub fn generate(&self, tree: &TextPreservingTree<'_>, mutations: &dyn NodeMutations) -> String {
        let mut writer = Writer {
            tree,
            mutations,
            canonical: &self.canonical,
            lines: vec![],
            current: OutLine::default(),
            soft_after_line: false,
        };
        writer.container(&tree.root, None, 0, "");
        let output = writer.finish();
        debug!(
            "regenerated {} bytes from {} bytes of original text",
            output.len(),
            tree.root.range.len()
        );
        output
    }
}

#[derive(Debug, Default)]
struct OutLine {
    text: String,
    // Original lines whose text was copied onto this line.
    origins: Vec<u32>,
    // Separator that only survives between two non-blank lines.
    soft: bool,
}

impl OutLine {
    fn soft() -> Self {
        Self {
            soft: true,
            ..Self::default()
        }
    }

    fn generated(text: String) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }
}

struct Writer<'t, 'a> {
    tree: &'t TextPreservingTree<'a>,
    mutations: &'t dyn NodeMutations,
    canonical: &'t CanonicalCodeGenerator,
    lines: Vec<OutLine>,
    current: OutLine,
    soft_after_line: bool,
}

impl<'a> Writer<'_, 'a> {
    // `depth` is 0 for the root, whose block elements are top-level nodes.
    fn container(
        &mut self,
        node: &TextTreeNode<'a>,
        owner: Option<ChildTag<'a>>,
        depth: usize,
        parent_indent: &str,
    ) {
        let mut indent = parent_indent.to_string();
        let mut skip_to = 0;
        for (i, child) in node.children.iter().enumerate() {
            if i < skip_to {
                continue;
            }
            let tag = child.tag;
            let top = depth == 0 && matches!(tag, ChildTag::BlockElement { .. });

            if !tag.is_leaf() {
                let before = self.mutations.insert_nodes_before(&tag);
                if !before.is_empty() {
                    self.insert_before(&before, &indent, top);
                }
            }

            if self.mutations.remove_node_if(&tag) {
                trace!("removing node at {:?}", child.node.range);
                // The removed text counts as a contribution to this line.
                self.current.origins.push(*child.node.line_range.start());
                if matches!(tag, ChildTag::CallArgument { .. }) {
                    skip_to = self.drop_argument_separator(&node.children, i);
                }
            } else {
                self.child(child, owner, depth, &mut indent);
            }

            if !tag.is_leaf() {
                let after = self.mutations.insert_nodes_after(&tag);
                if !after.is_empty() {
                    self.insert_after(&after, &indent, top);
                }
            }
        }
    }

    fn child(
        &mut self,
        child: &TextTreeChild<'a>,
        owner: Option<ChildTag<'a>>,
        depth: usize,
        indent: &mut String,
    ) {
        let tag = child.tag;
        match tag {
            ChildTag::Name => {
                let text = self.tree.text(&child.node);
                let mapped = owner.map(|o| self.mutations.map_name(&o, text));
                match mapped {
                    Some(name) if name != text => {
                        trace!("renaming `{text}` to `{name}`");
                        self.generated(&name);
                    }
                    _ => self.verbatim(&child.node),
                }
            }
            ChildTag::Indentation => {
                *indent = self.tree.text(&child.node).to_string();
                self.verbatim(&child.node);
            }
            ChildTag::LineBreak => {
                let line = *child.node.line_range.start();
                self.current.origins.push(line);
                self.end_line();
            }
            ChildTag::UnstructuredText => self.verbatim(&child.node),
            ChildTag::AssignmentRhs(_) | ChildTag::CallArgument { .. } => {
                match self.mutations.replace_value(&tag) {
                    Some(value) => {
                        let text = self.canonical.value(&value);
                        self.generated(&text);
                    }
                    None if child.node.children.is_empty() => self.verbatim(&child.node),
                    None => self.container(&child.node, Some(tag), depth, indent.as_str()),
                }
            }
            ChildTag::BlockElement { .. } => {
                if child.node.children.is_empty() {
                    self.verbatim(&child.node);
                } else {
                    let nested = format!("{indent}{}", self.canonical.indent(1));
                    self.container(&child.node, Some(tag), depth + 1, &nested);
                }
            }
        }
    }

    // After the argument at `removed` is dropped, drop one comma next to it:
    // the text up to the following argument, or else the comma ending the
    // current line. Returns the index of the next child to emit.
    fn drop_argument_separator(&mut self, children: &[TextTreeChild<'a>], removed: usize) -> usize {
        let is_argument = |c: &TextTreeChild<'_>| matches!(c.tag, ChildTag::CallArgument { .. });
        if let Some(next) = children[removed + 1..].iter().position(is_argument) {
            return removed + 1 + next;
        }
        if children[..removed].iter().any(is_argument) {
            let text = self.current.text.trim_end();
            if let Some(kept) = text.strip_suffix(',') {
                let len = kept.trim_end().len();
                self.current.text.truncate(len);
            }
        }
        removed + 1
    }

    fn verbatim(&mut self, node: &TextTreeNode<'a>) {
        let text = self.tree.text(node);
        if text.contains('\n') {
            self.multi_line(text);
        } else if !text.is_empty() {
            self.current.text.push_str(text);
            self.current.origins.push(*node.line_range.start());
        }
    }

    fn generated(&mut self, text: &str) {
        self.multi_line(text);
    }

    // Lines produced here carry no origins.
    fn multi_line(&mut self, text: &str) {
        for (i, piece) in text.split('\n').enumerate() {
            if i > 0 {
                self.end_line();
            }
            self.current.text.push_str(piece);
        }
    }

    fn end_line(&mut self) {
        let line = std::mem::take(&mut self.current);
        self.lines.push(line);
        if self.soft_after_line {
            self.soft_after_line = false;
            self.lines.push(OutLine::soft());
        }
    }

    fn render(&self, node: &DocumentNode, indent: &str) -> Vec<String> {
        self.canonical
            .node(node, 0)
            .split('\n')
            .map(|line| format!("{indent}{line}"))
            .collect()
    }

    fn insert_before(&mut self, nodes: &[DocumentNode], indent: &str, top: bool) {
        if !is_blank(&self.current.text) {
            let trimmed = self.current.text.trim_end().len();
            self.current.text.truncate(trimmed);
            self.end_line();
            self.current.text = indent.to_string();
        }
        let stash = std::mem::take(&mut self.current);

        if top {
            self.lines.push(OutLine::soft());
        }
        let mut previous: Option<&DocumentNode> = None;
        for node in nodes {
            if top && previous.is_some_and(|p| p.is_element()) && node.is_element() {
                self.lines.push(OutLine::soft());
            }
            for line in self.render(node, indent) {
                self.lines.push(OutLine::generated(line));
            }
            previous = Some(node);
        }
        if top {
            self.lines.push(OutLine::soft());
        }

        self.current = stash;
    }

    fn insert_after(&mut self, nodes: &[DocumentNode], indent: &str, top: bool) {
        let mut previous: Option<&DocumentNode> = None;
        for node in nodes {
            self.end_line();
            let separated = match previous {
                None => true,
                Some(p) => p.is_element() && node.is_element(),
            };
            if top && separated {
                self.lines.push(OutLine::soft());
            }
            for (i, line) in self.render(node, indent).into_iter().enumerate() {
                if i > 0 {
                    self.end_line();
                }
                self.current.text = line;
            }
            previous = Some(node);
        }
        if top {
            self.soft_after_line = true;
        }
    }

    fn originally_blank(&self, line: &OutLine) -> bool {
        line.origins
            .iter()
            .all(|&n| is_blank(self.tree.source.line(n)))
    }

    fn finish(mut self) -> String {
        let tail = std::mem::take(&mut self.current);
        self.lines.push(tail);

        let keep_hard: Vec<bool> = self
            .lines
            .iter()
            .map(|l| !l.soft && (!is_blank(&l.text) || self.originally_blank(l)))
            .collect();

        let mut kept: Vec<usize> = vec![];
        for (i, line) in self.lines.iter().enumerate() {
            let keep = if line.soft {
                let previous_ok = kept.last().is_some_and(|&k| !is_blank(&self.lines[k].text));
                let next_ok = (i + 1..self.lines.len())
                    .find(|&j| keep_hard[j])
                    .is_some_and(|j| !is_blank(&self.lines[j].text));
                previous_ok && next_ok
            } else {
                keep_hard[i]
            };
            if keep {
                kept.push(i);
            }
        }
        trace!("kept {} of {} output lines", kept.len(), self.lines.len());

        // A dropped tail takes the line break before it along.
        kept.iter()
            .map(|&i| self.lines[i].text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
