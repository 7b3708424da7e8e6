// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::extractors::*;
use super::host::*;
use super::*;

fn fq(name: &str) -> FqName {
    FqName::parse(name)
}

fn restricted_field(name: &str, ty: HostType, is_mutable: bool) -> HostField {
    HostField::new(name, ty, is_mutable).marker(Capability::Restricted)
}

fn project_registry() -> HostTypeRegistry {
    let mut registry = HostTypeRegistry::new();
    registry
        .register(
            HostClass::new("com.example.Project")
                .supertype("com.example.Named")
                .field(restricted_field("version", HostType::String, true))
                .function(
                    HostFunction::new("getName", HostType::String).marker(Capability::Restricted),
                )
                .function(
                    HostFunction::new("setName", HostType::Unit)
                        .param(HostParameter::new("value", HostType::String)),
                )
                .function(
                    HostFunction::new("getApplication", HostType::class("com.example.Application"))
                        .marker(Capability::Restricted)
                        .marker(Capability::Configuring),
                )
                .function(
                    HostFunction::new("plugins", HostType::Unit)
                        .param(HostParameter::new(
                            "configure",
                            HostType::lambda("Function1", HostType::class("com.example.Plugins")),
                        ))
                        .marker(Capability::Configuring),
                )
                .function(
                    HostFunction::new("library", HostType::class("com.example.Library"))
                        .param(HostParameter::new("name", HostType::String))
                        .param(
                            HostParameter::new(
                                "configure",
                                HostType::lambda("Action", HostType::class("com.example.Library")),
                            )
                            .optional(),
                        )
                        .marker(Capability::Adding),
                )
                .function(
                    HostFunction::new("dependency", HostType::class("com.example.Dependency"))
                        .param(HostParameter::new("notation", HostType::String))
                        .marker(Capability::Restricted),
                )
                .function(HostFunction::new("helper", HostType::Unit)),
        )
        .register(HostClass::new("com.example.Named").supertype("com.example.Base"))
        .register(HostClass::new("com.example.Base"))
        .register(
            HostClass::new("com.example.Application")
                .field(restricted_field("mainClass", HostType::String, true))
                .function(
                    HostFunction::new("isEnabled", HostType::Boolean).marker(Capability::Restricted),
                )
                .function(
                    HostFunction::new("setEnabled", HostType::Unit)
                        .param(HostParameter::new("value", HostType::Boolean)),
                ),
        )
        .register(
            HostClass::new("com.example.Plugins").function(
                HostFunction::new("id", HostType::Unit)
                    .param(HostParameter::new("id", HostType::String))
                    .marker(Capability::Restricted),
            ),
        )
        .register(
            HostClass::new("com.example.Library")
                .field(restricted_field("version", HostType::String, true)),
        )
        .register(
            HostClass::new("com.example.Dependency").constructor(
                HostConstructor::new(vec![HostParameter::new("notation", HostType::String)])
                    .marker(Capability::Restricted),
            ),
        )
        .register(HostClass::new("com.example.Unused"));
    registry
}

fn build_project() -> Result<AnalysisSchema, SchemaBuildingError> {
    let registry = project_registry();
    SchemaBuilder::new(&registry).build(&fq("com.example.Project"))
}

#[test]
fn fq_names() {
    let name = FqName::parse("com.example.Project");
    assert_eq!(name.package_name(), "com.example");
    assert_eq!(name.simple_name(), "Project");
    assert_eq!(name.qualified_name(), "com.example.Project");

    let name = FqName::parse("Root");
    assert_eq!(name.package_name(), "");
    assert_eq!(name.to_string(), "Root");
}

#[test]
fn constant_host_types() {
    assert_eq!(ConstantType::Int.host_type(), "i32");
    assert_eq!(ConstantType::Long.host_type(), "i64");
    assert_eq!(ConstantType::String.host_type(), "String");
    assert_eq!(ConstantType::Boolean.host_type(), "bool");
}

#[test]
fn closure_reaches_types_through_members() -> anyhow::Result<()> {
    let schema = build_project()?;
    let names: Vec<String> = schema
        .data_class_types_by_fq_name()
        .keys()
        .map(|n| n.qualified_name())
        .collect();

    for expected in [
        "com.example.Project",
        "com.example.Named",
        "com.example.Base",
        "com.example.Application",
        "com.example.Plugins",
        "com.example.Library",
        "com.example.Dependency",
    ] {
        assert!(names.contains(&expected.to_string()), "missing {expected}");
    }
    assert!(!names.contains(&"com.example.Unused".to_string()));
    assert_eq!(
        schema.top_level_receiver_type().name(),
        &fq("com.example.Project")
    );
    Ok(())
}

#[test]
fn type_reachable_only_through_a_property() -> anyhow::Result<()> {
    let mut registry = HostTypeRegistry::new();
    registry
        .register(HostClass::new("a.Root").field(restricted_field("b", HostType::class("a.B"), true)))
        .register(HostClass::new("a.B"));
    let schema = SchemaBuilder::new(&registry).build(&fq("a.Root"))?;
    assert!(schema.class(&fq("a.B")).is_some());
    assert!(matches!(
        schema.resolve_ref(&DataTypeRef::Name(fq("a.B"))),
        Some(DataType::Class(c)) if c.name() == &fq("a.B")
    ));
    Ok(())
}

#[test]
fn supertypes_are_transitive() -> anyhow::Result<()> {
    let schema = build_project()?;
    let project = schema.top_level_receiver_type();
    let supertypes: Vec<&FqName> = project.supertypes().iter().collect();
    assert_eq!(
        supertypes,
        vec![&fq("com.example.Base"), &fq("com.example.Named")]
    );
    Ok(())
}

#[test]
fn properties_from_accessors_and_fields() -> anyhow::Result<()> {
    let schema = build_project()?;
    let project = schema.top_level_receiver_type();

    let names: Vec<&str> = project.properties().iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["name", "application", "version"]);

    let name = project.property("name").ok_or_else(|| anyhow::anyhow!("name"))?;
    assert!(!name.is_read_only());
    assert_eq!(name.value_type(), &DataTypeRef::Constant(ConstantType::String));

    let application = project
        .property("application")
        .ok_or_else(|| anyhow::anyhow!("application"))?;
    assert!(application.is_read_only());

    let app = schema
        .class(&fq("com.example.Application"))
        .ok_or_else(|| anyhow::anyhow!("Application"))?;
    let enabled = app.property("enabled").ok_or_else(|| anyhow::anyhow!("enabled"))?;
    assert_eq!(enabled.value_type(), &DataTypeRef::Constant(ConstantType::Boolean));
    assert!(!enabled.is_read_only());

    // Accessors are not member functions; unmarked members are excluded.
    let functions: Vec<&str> = project
        .member_functions()
        .iter()
        .map(|f| f.simple_name())
        .collect();
    assert_eq!(
        functions,
        vec!["plugins", "library", "dependency", "application"]
    );
    Ok(())
}

#[test]
fn duplicate_property_names_keep_the_first() -> anyhow::Result<()> {
    let mut registry = HostTypeRegistry::new();
    registry.register(
        HostClass::new("a.Root")
            .function(HostFunction::new("getCount", HostType::Int).marker(Capability::Restricted))
            .field(restricted_field("count", HostType::Long, true)),
    );
    let schema = SchemaBuilder::new(&registry).build(&fq("a.Root"))?;
    let root = schema.top_level_receiver_type();
    assert_eq!(root.properties().len(), 1);
    let count = &root.properties()[0];
    assert_eq!(count.value_type(), &DataTypeRef::Constant(ConstantType::Int));
    assert!(count.is_read_only());
    Ok(())
}

#[test]
fn function_semantics() -> anyhow::Result<()> {
    let schema = build_project()?;
    let project = schema.top_level_receiver_type();
    let function = |name: &str| {
        project
            .functions_named(name)
            .next()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing function {name}"))
    };

    let plugins = function("plugins")?;
    assert_eq!(
        plugins.semantics(),
        &FunctionSemantics::AccessAndConfigure {
            accessor: ConfigureAccessor::ConfiguringLambdaArgument(DataTypeRef::Name(fq(
                "com.example.Plugins"
            ))),
            return_type: ConfigureReturnType::Unit,
            configured_type: DataTypeRef::Name(fq("com.example.Plugins")),
            block_requirement: ConfigureBlockRequirement::Required,
        }
    );
    assert!(plugins.parameters().is_empty());
    assert!(plugins.default_configure_lambda().is_none());

    let library = function("library")?;
    assert_eq!(
        library.semantics(),
        &FunctionSemantics::NewObject {
            returned_type: DataTypeRef::Name(fq("com.example.Library")),
            block_requirement: ConfigureBlockRequirement::Optional,
        }
    );
    assert_eq!(library.parameters().len(), 1);
    assert_eq!(library.parameters()[0].name(), Some("name"));
    let default = library
        .default_configure_lambda()
        .ok_or_else(|| anyhow::anyhow!("no default block"))?;
    assert_eq!(default.shape(), "Action");
    assert_eq!(
        default.configured_type(),
        &DataTypeRef::Name(fq("com.example.Library"))
    );

    let dependency = function("dependency")?;
    assert_eq!(
        dependency.semantics(),
        &FunctionSemantics::Pure {
            returned_type: DataTypeRef::Name(fq("com.example.Dependency"))
        }
    );
    assert_eq!(
        dependency.semantics().block_requirement(),
        ConfigureBlockRequirement::NotAllowed
    );

    let application = function("application")?;
    assert_eq!(
        application.semantics(),
        &FunctionSemantics::AccessAndConfigure {
            accessor: ConfigureAccessor::Property("application".to_string()),
            return_type: ConfigureReturnType::Unit,
            configured_type: DataTypeRef::Name(fq("com.example.Application")),
            block_requirement: ConfigureBlockRequirement::Required,
        }
    );
    assert_eq!(application.semantics().returned_type(), DataTypeRef::Unit);

    let dependency_class = schema
        .class(&fq("com.example.Dependency"))
        .ok_or_else(|| anyhow::anyhow!("Dependency"))?;
    assert_eq!(dependency_class.constructors().len(), 1);
    assert_eq!(
        dependency_class.constructors()[0].semantics(),
        FunctionSemantics::Pure {
            returned_type: DataTypeRef::Name(fq("com.example.Dependency"))
        }
    );
    Ok(())
}

#[test]
fn unsupported_member_type_aborts_with_context() {
    let mut registry = HostTypeRegistry::new();
    registry.register(
        HostClass::new("a.Root").function(
            HostFunction::new("tags", HostType::Unit)
                .param(HostParameter::new(
                    "values",
                    HostType::Generic {
                        name: fq("kotlin.collections.List"),
                        arguments: vec![HostType::String],
                    },
                ))
                .marker(Capability::Restricted),
        ),
    );

    match SchemaBuilder::new(&registry).build(&fq("a.Root")) {
        Err(e) => {
            assert_eq!(
                e.context(),
                &[
                    "class `a.Root`".to_string(),
                    "function `tags`".to_string(),
                    "parameter `values`".to_string()
                ]
            );
            assert_eq!(
                e.message(),
                "generic type `kotlin.collections.List<String>` is not supported"
            );
        }
        Ok(_) => panic!("schema construction must fail"),
    }
}

#[test]
fn nullable_property_is_an_error() {
    let mut registry = HostTypeRegistry::new();
    registry.register(HostClass::new("a.Root").field(restricted_field(
        "maybe",
        HostType::Nullable(Box::new(HostType::String)),
        true,
    )));
    let e = SchemaBuilder::new(&registry).build(&fq("a.Root"));
    assert!(matches!(e, Err(e) if e.message().contains("nullable")));
}

#[test]
fn unregistered_referenced_type_fails_validation() {
    let mut registry = HostTypeRegistry::new();
    registry.register(HostClass::new("a.Root").field(restricted_field(
        "other",
        HostType::class("a.Missing"),
        true,
    )));
    match SchemaBuilder::new(&registry).build(&fq("a.Root")) {
        Err(e) => {
            assert_eq!(e.message(), "type `a.Missing` is not part of the schema");
            assert_eq!(
                e.context(),
                &["class `a.Root`".to_string(), "property `other`".to_string()]
            );
        }
        Ok(_) => panic!("schema construction must fail"),
    }
}

#[test]
fn unregistered_root_is_an_error() {
    let registry = HostTypeRegistry::new();
    assert!(SchemaBuilder::new(&registry).build(&fq("a.Root")).is_err());
}

#[test]
fn configuring_function_return_type_is_checked() {
    let mut registry = HostTypeRegistry::new();
    registry
        .register(
            HostClass::new("a.Root").function(
                HostFunction::new("child", HostType::String)
                    .param(HostParameter::new(
                        "configure",
                        HostType::lambda("Function1", HostType::class("a.Child")),
                    ))
                    .marker(Capability::Configuring),
            ),
        )
        .register(HostClass::new("a.Child"));
    let e = SchemaBuilder::new(&registry).build(&fq("a.Root"));
    assert!(matches!(e, Err(e) if e.message().starts_with("configuring function must return")));
}

#[test]
fn unrecognized_lambda_shape_is_an_error() {
    let mut registry = HostTypeRegistry::new();
    registry.register(
        HostClass::new("a.Root").function(
            HostFunction::new("child", HostType::Unit)
                .param(HostParameter::new(
                    "configure",
                    HostType::lambda("Consumer", HostType::class("a.Root")),
                ))
                .marker(Capability::Restricted),
        ),
    );
    assert!(SchemaBuilder::new(&registry).build(&fq("a.Root")).is_err());

    // Recognized once a handler for the shape is registered.
    struct ConsumerHandler;
    impl ConfigureLambdaHandler for ConsumerHandler {
        fn configured_type<'a>(&self, ty: &'a HostType) -> Option<&'a HostType> {
            match ty {
                HostType::Lambda { shape, receiver } if shape == "Consumer" => Some(receiver),
                _ => None,
            }
        }

        fn produce_noop_configure_lambda(
            &self,
            _ty: &HostType,
            configured_type: DataTypeRef,
        ) -> Option<NoopConfigureLambda> {
            Some(NoopConfigureLambda::new("Consumer", configured_type))
        }
    }

    let schema = SchemaBuilder::new(&registry)
        .with_configure_lambda_handler(Box::new(ConsumerHandler))
        .build(&fq("a.Root"));
    assert!(matches!(
        schema,
        Ok(s) if s.top_level_receiver_type().functions_named("child").count() == 1
    ));
}

#[test]
fn custom_member_filter() -> anyhow::Result<()> {
    let registry = project_registry();
    let schema = SchemaBuilder::new(&registry)
        .with_member_filter(|v: Visibility, m: &[Capability]| is_public_and_not_hidden(v, m))
        .build(&fq("com.example.Project"))?;
    assert!(schema
        .top_level_receiver_type()
        .functions_named("helper")
        .next()
        .is_some());
    Ok(())
}

#[test]
fn external_functions_and_objects() -> anyhow::Result<()> {
    let mut registry = project_registry();
    registry.register(HostClass::new("com.example.Layout"));
    let schema = SchemaBuilder::new(&registry)
        .with_external_function(HostTopLevelFunction {
            package_name: "com.example.files".to_string(),
            function: HostFunction::new("file", HostType::class("com.example.Dependency"))
                .param(HostParameter::new("path", HostType::String)),
        })
        .with_external_object("com.example.layout", HostType::class("com.example.Layout"))
        .with_default_import("com.example.files.file")
        .build(&fq("com.example.Project"))?;

    let file = schema
        .external_functions_by_fq_name()
        .get(&fq("com.example.files.file"))
        .ok_or_else(|| anyhow::anyhow!("file"))?;
    assert_eq!(file.simple_name(), "file");
    assert_eq!(file.parameters().len(), 1);

    assert_eq!(
        schema.external_objects_by_fq_name().get(&fq("com.example.layout")),
        Some(&DataTypeRef::Name(fq("com.example.Layout")))
    );
    assert!(schema.class(&fq("com.example.Layout")).is_some());
    assert!(schema
        .default_imports()
        .contains(&fq("com.example.files.file")));
    Ok(())
}

#[test]
fn json_dump() -> anyhow::Result<()> {
    let schema = build_project()?;
    let json: serde_json::Value = serde_json::from_str(&schema.to_json()?)?;
    assert_eq!(
        json["top_level_receiver_type"]["name"],
        serde_json::json!("com.example.Project")
    );
    assert!(json["data_class_types_by_fq_name"]
        .get("com.example.Application")
        .is_some());
    Ok(())
}

#[cfg(feature = "arc")]
#[test]
fn schema_is_send_and_sync() -> anyhow::Result<()> {
    fn assert_send_sync<T: Send + Sync>(_: &T) {}
    let schema = build_project()?;
    assert_send_sync(&schema);

    let schema = std::sync::Arc::new(schema);
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let schema = schema.clone();
            std::thread::spawn(move || schema.data_class_types_by_fq_name().len())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().map_err(|_| anyhow::anyhow!("panicked"))?, 7);
    }
    Ok(())
}
