// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use declarative_dsl::dom::*;
use declarative_dsl::unstable::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    script: String,
    #[serde(default)]
    named_references: bool,
    nodes: Option<Vec<String>>,
    error: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn describe_value(value: &ValueNode) -> String {
    match value {
        ValueNode::Literal(l) => l.value.to_string(),
        ValueNode::ValueFactory(f) => format!(
            "{}({})",
            f.factory_name,
            f.values.iter().map(describe_value).collect::<Vec<_>>().join(", ")
        ),
        ValueNode::NamedReference(r) => format!("&{}", r.reference_name),
    }
}

// One line per node, nested content indented by two spaces.
fn describe(nodes: &[DocumentNode], depth: usize, out: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            DocumentNode::Element(e) => {
                let values: Vec<String> = e.element_values.iter().map(describe_value).collect();
                out.push(format!("{indent}element {}({})", e.name, values.join(", ")));
                describe(&e.content, depth + 1, out);
            }
            DocumentNode::Property(p) => {
                let op = match p.augmentation {
                    PropertyAugmentation::None => "=",
                    PropertyAugmentation::Plus => "+=",
                };
                out.push(format!(
                    "{indent}property {} {op} {}",
                    p.name,
                    describe_value(&p.value)
                ));
            }
            DocumentNode::Error(e) => {
                let causes: Vec<String> = e.errors.iter().map(|e| format!("{:?}", e.cause)).collect();
                out.push(format!("{indent}error {}", causes.join(", ")));
            }
        }
    }
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("\ncase {} ", case.note);
        let source = Source::from_contents("case.dcl".to_string(), case.script.clone())?;
        match parse_source(&source) {
            Ok(block) => {
                if let Some(e) = &case.error {
                    bail!("expected error `{e}` but parse succeeded");
                }
                let options = ConversionOptions {
                    allow_named_references: case.named_references,
                };
                let document = convert_block_to_document_with_options(&block, &options);
                let mut actual = vec![];
                describe(&document.content, 0, &mut actual);
                if let Some(expected) = &case.nodes {
                    if &actual != expected {
                        bail!(
                            "document mismatch:\n{}",
                            prettydiff::diff_lines(&expected.join("\n"), &actual.join("\n"))
                        );
                    }
                }
            }
            Err(actual) => match &case.error {
                Some(expected) => {
                    let actual = actual.to_string();
                    if !actual.contains(expected) {
                        bail!("error message mismatch.\nexpected: {expected}\nactual:   {actual}");
                    }
                }
                None => return Err(actual),
            },
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

#[test_resources("tests/parser/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
