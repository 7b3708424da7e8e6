// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use declarative_dsl::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    script: String,
    indent: Option<usize>,
    canonical: String,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("\ncase {} ", case.note);
        let mut engine = Engine::new();
        if let Some(indent) = case.indent {
            engine.set_indent(indent);
        }
        let id = engine.add_script("case.dcl".to_string(), case.script.clone())?;
        let actual = engine.canonical_text(id)?;
        if actual != case.canonical {
            bail!(
                "canonical text mismatch:\n{}",
                prettydiff::diff_lines(&case.canonical, &actual)
            );
        }

        // Generated text parses back to the same text.
        let again = engine.add_script("again.dcl".to_string(), actual.clone())?;
        if engine.canonical_text(again)? != actual {
            bail!("canonical text is not stable");
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

#[test_resources("tests/canonical/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
