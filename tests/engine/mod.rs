// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{anyhow, Result};
use declarative_dsl::dom::writing::{Mutations, NoMutations};
use declarative_dsl::dom::*;
use declarative_dsl::schema::host::*;
use declarative_dsl::schema::{AnalysisSchema, FqName, SchemaBuilder};
use declarative_dsl::*;

fn schema() -> Result<AnalysisSchema> {
    let mut registry = HostTypeRegistry::new();
    registry
        .register(
            HostClass::new("b.Root")
                .field(HostField::new("name", HostType::String, true).marker(Capability::Restricted))
                .function(
                    HostFunction::new("library", HostType::class("b.Library"))
                        .param(HostParameter::new("name", HostType::String))
                        .param(
                            HostParameter::new(
                                "configure",
                                HostType::lambda("Action", HostType::class("b.Library")),
                            )
                            .optional(),
                        )
                        .marker(Capability::Adding),
                )
                .function(
                    HostFunction::new("settings", HostType::Unit)
                        .param(HostParameter::new(
                            "configure",
                            HostType::lambda("Function1", HostType::class("b.Settings")),
                        ))
                        .marker(Capability::Configuring),
                ),
        )
        .register(
            HostClass::new("b.Library")
                .field(HostField::new("version", HostType::String, true).marker(Capability::Restricted)),
        )
        .register(
            HostClass::new("b.Settings")
                .field(HostField::new("level", HostType::Int, true).marker(Capability::Restricted)),
        );
    Ok(SchemaBuilder::new(&registry).build(&FqName::parse("b.Root"))?)
}

#[test]
fn rewrite_script() -> Result<()> {
    let mut engine = Engine::new();
    let id = engine.add_script(
        "build.dcl".to_string(),
        "a {\n  x = 1\n  y = 2\n}\n".to_string(),
    )?;

    let mutations = Mutations::new().remove_node_if(|tag| {
        matches!(tag.document_node(), Some(node) if node.name() == Some("y"))
    });
    assert_eq!(engine.rewrite(id, &mutations)?, "a {\n  x = 1\n}\n");
    assert_eq!(engine.rewrite(id, &NoMutations)?, "a {\n  x = 1\n  y = 2\n}\n");
    Ok(())
}

#[test]
fn script_from_file() -> Result<()> {
    let mut engine = Engine::new();
    let id = engine.add_script_from_file("tests/engine/build.dcl")?;
    let contents = std::fs::read_to_string("tests/engine/build.dcl")?;

    assert_eq!(engine.source(id)?.contents(), &contents);
    assert_eq!(engine.document(id)?.content.len(), 3);
    assert_eq!(engine.rewrite(id, &NoMutations)?, contents);
    Ok(())
}

#[test]
fn syntax_errors_are_reported() {
    let mut engine = Engine::new();
    let err = engine.add_script("bad.dcl".to_string(), "a = 1 b = 2".to_string());
    assert!(err.is_err());
    assert!(engine.add_script_from_file("tests/engine/missing.dcl").is_err());
}

#[test]
fn unknown_document() -> Result<()> {
    let mut engine = Engine::new();
    let id = engine.add_script("a.dcl".to_string(), "a = 1".to_string())?;
    assert!(Engine::new().document(id).is_err());
    assert!(Engine::new().canonical_text(id).is_err());
    Ok(())
}

#[test]
fn canonical_indent() -> Result<()> {
    let mut engine = Engine::new();
    engine.set_indent(2);
    let id = engine.add_script("a.dcl".to_string(), "a { b { c = 1 } }".to_string())?;
    assert_eq!(engine.canonical_text(id)?, "a {\n  b {\n    c = 1\n  }\n}\n");
    Ok(())
}

#[test]
fn conversion_options_apply_to_later_scripts() -> Result<()> {
    let mut engine = Engine::new();
    let before = engine.add_script("a.dcl".to_string(), "x = a.b".to_string())?;
    engine.set_conversion_options(ConversionOptions {
        allow_named_references: true,
    });
    let after = engine.add_script("b.dcl".to_string(), "x = a.b".to_string())?;

    assert!(matches!(
        engine.document(before)?.content[0],
        DocumentNode::Error(_)
    ));
    assert!(matches!(
        &engine.document(after)?.content[0],
        DocumentNode::Property(p) if matches!(&p.value, ValueNode::NamedReference(_))
    ));
    Ok(())
}

#[test]
fn resolve_requires_a_schema() -> Result<()> {
    let mut engine = Engine::new();
    let id = engine.add_script("a.dcl".to_string(), "a = 1".to_string())?;
    let err = engine
        .resolve(id, &ResolutionTrace::new())
        .err()
        .ok_or_else(|| anyhow!("resolution without a schema succeeded"))?;
    assert!(err.to_string().contains("no schema"));
    Ok(())
}

#[test]
fn resolve_script() -> Result<()> {
    let schema = schema()?;
    let root = schema.top_level_receiver_type().clone();
    let library = root
        .functions_named("library")
        .next()
        .ok_or_else(|| anyhow!("no library function"))?
        .clone();
    let name = root
        .property("name")
        .ok_or_else(|| anyhow!("no name property"))?
        .clone();

    let mut engine = Engine::new();
    engine.set_schema(schema);
    let id = engine.add_script_from_file("tests/engine/build.dcl")?;
    let document = engine.document(id)?;

    let mut trace = ResolutionTrace::new();
    trace
        .resolved(
            document.content[0].origin(),
            Binding::Property {
                receiver_type: root,
                property: name,
                receiver: ReceiverOrigin::ImplicitCurrent,
            },
        )
        .resolved(
            document.content[1].origin(),
            Binding::Element {
                function: library,
                receiver: ReceiverOrigin::ImplicitCurrent,
            },
        )
        .failed(
            document.content[2].origin(),
            vec![ErrorReason::MissingConfigureLambda],
        );

    let resolved = engine.resolve(id, &trace)?;
    assert!(resolved.content[0].is_resolved());
    assert!(resolved.content[1].is_resolved());
    assert!(matches!(
        &resolved.content[2],
        ResolvedDocumentNode::Element {
            resolution: ElementResolution::ElementNotResolved(reasons),
            ..
        } if reasons == &vec![ElementNotResolvedReason::BlockMismatch]
    ));

    // `version` has no trace entry.
    let ResolvedDocumentNode::Element { content, .. } = &resolved.content[1] else {
        panic!("expected an element");
    };
    assert!(!content[0].is_resolved());
    Ok(())
}

#[test]
fn outer_scope_bindings_without_strict_checks() -> Result<()> {
    let schema = schema()?;
    let root = schema.top_level_receiver_type().clone();
    let name = root
        .property("name")
        .ok_or_else(|| anyhow!("no name property"))?
        .clone();

    let mut engine = Engine::new();
    engine.set_schema(schema);
    let id = engine.add_script("a.dcl".to_string(), "settings {\n    name = \"x\"\n}\n".to_string())?;
    let document = engine.document(id)?;
    let DocumentNode::Element(settings) = &document.content[0] else {
        panic!("expected an element");
    };

    let mut trace = ResolutionTrace::new();
    trace.resolved(
        settings.content[0].origin(),
        Binding::Property {
            receiver_type: root,
            property: name,
            receiver: ReceiverOrigin::ImplicitOuter,
        },
    );

    let strict = engine.resolve(id, &trace)?;
    let ResolvedDocumentNode::Element { content, .. } = &strict.content[0] else {
        panic!("expected an element");
    };
    assert!(!content[0].is_resolved());

    engine.set_strict_receiver_checks(false);
    let lenient = engine.resolve(id, &trace)?;
    let ResolvedDocumentNode::Element { content, .. } = &lenient.content[0] else {
        panic!("expected an element");
    };
    assert!(content[0].is_resolved());
    Ok(())
}

#[test]
fn schema_dump() -> Result<()> {
    let json = schema()?.to_json()?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    assert!(json.contains("\"b.Root\""));
    assert!(json.contains("\"b.Library\""));
    assert!(value.is_object());
    Ok(())
}

#[cfg(feature = "arc")]
#[test]
fn schema_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AnalysisSchema>();
}
