// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use declarative_dsl::dom::writing::{ChildTag, NodeMutations};
use declarative_dsl::dom::{DocumentNode, ValueNode};
use declarative_dsl::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    script: String,
    #[serde(default)]
    remove: Vec<String>,
    // Text of call arguments to remove.
    #[serde(default)]
    remove_arguments: Vec<String>,
    #[serde(default)]
    rename: BTreeMap<String, String>,
    #[serde(default)]
    insert_before: BTreeMap<String, String>,
    #[serde(default)]
    insert_after: BTreeMap<String, String>,
    // Original value text to replacement value text.
    #[serde(default)]
    replace: BTreeMap<String, String>,
    expected: String,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    cases: Vec<TestCase>,
}

// Mutations keyed by the names of block elements and the text of values.
struct CaseMutations {
    remove: Vec<String>,
    remove_arguments: Vec<String>,
    rename: BTreeMap<String, String>,
    before: BTreeMap<String, Vec<DocumentNode>>,
    after: BTreeMap<String, Vec<DocumentNode>>,
    replace: BTreeMap<String, ValueNode>,
}

fn node_name<'a>(tag: &ChildTag<'a>) -> Option<&'a str> {
    tag.document_node().and_then(|n| n.name())
}

impl NodeMutations for CaseMutations {
    fn remove_node_if(&self, tag: &ChildTag<'_>) -> bool {
        match tag {
            ChildTag::CallArgument { value, .. } => {
                let text = value.span().text();
                self.remove_arguments.iter().any(|r| r == text)
            }
            _ => node_name(tag).is_some_and(|name| self.remove.iter().any(|r| r == name)),
        }
    }

    fn insert_nodes_before(&self, tag: &ChildTag<'_>) -> Vec<DocumentNode> {
        node_name(tag)
            .and_then(|name| self.before.get(name).cloned())
            .unwrap_or_default()
    }

    fn insert_nodes_after(&self, tag: &ChildTag<'_>) -> Vec<DocumentNode> {
        node_name(tag)
            .and_then(|name| self.after.get(name).cloned())
            .unwrap_or_default()
    }

    fn map_name(&self, owner: &ChildTag<'_>, name: &str) -> String {
        match owner.document_node() {
            Some(_) => self.rename.get(name).cloned().unwrap_or_else(|| name.to_string()),
            None => name.to_string(),
        }
    }

    fn replace_value(&self, tag: &ChildTag<'_>) -> Option<ValueNode> {
        let value = tag.value()?;
        self.replace.get(value.span().text()).cloned()
    }
}

fn snippet_nodes(engine: &mut Engine, text: &str) -> Result<Vec<DocumentNode>> {
    let id = engine.add_script("snippet.dcl".to_string(), text.to_string())?;
    Ok(engine.document(id)?.content.clone())
}

fn snippet_value(engine: &mut Engine, text: &str) -> Result<ValueNode> {
    match snippet_nodes(engine, &format!("v = {text}"))?.as_slice() {
        [DocumentNode::Property(p)] => Ok(p.value.clone()),
        _ => bail!("`{text}` is not a value"),
    }
}

fn mutations(engine: &mut Engine, case: &TestCase) -> Result<CaseMutations> {
    let mut before = BTreeMap::new();
    for (anchor, text) in &case.insert_before {
        before.insert(anchor.clone(), snippet_nodes(engine, text)?);
    }
    let mut after = BTreeMap::new();
    for (anchor, text) in &case.insert_after {
        after.insert(anchor.clone(), snippet_nodes(engine, text)?);
    }
    let mut replace = BTreeMap::new();
    for (original, text) in &case.replace {
        replace.insert(original.clone(), snippet_value(engine, text)?);
    }
    Ok(CaseMutations {
        remove: case.remove.clone(),
        remove_arguments: case.remove_arguments.clone(),
        rename: case.rename.clone(),
        before,
        after,
        replace,
    })
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("\ncase {} ", case.note);
        let mut engine = Engine::new();
        let id = engine.add_script("case.dcl".to_string(), case.script.clone())?;
        let mutations = mutations(&mut engine, case)?;

        let actual = engine.rewrite(id, &mutations)?;
        if actual != case.expected {
            bail!(
                "rewritten text mismatch:\n{}",
                prettydiff::diff_lines(&case.expected, &actual)
            );
        }
        println!("passed");
    }

    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // Errors returned from tests are not always shown by cargo test.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/mutation/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
