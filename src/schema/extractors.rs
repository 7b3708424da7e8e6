// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Pluggable strategies used by the schema builder: which members to include,
//! which parameter shapes are configure blocks, how properties are found and
//! which other types to visit.

use super::host::*;
use super::{DataTypeRef, FqName, NoopConfigureLambda};

use indexmap::IndexMap;

/// Decides whether a host member takes part in the schema.
pub trait MemberFilter {
    fn should_include(&self, visibility: Visibility, markers: &[Capability]) -> bool;
}

impl<F> MemberFilter for F
where
    F: Fn(Visibility, &[Capability]) -> bool,
{
    fn should_include(&self, visibility: Visibility, markers: &[Capability]) -> bool {
        self(visibility, markers)
    }
}

/// The default filter: public members marked usable from the restricted language.
pub fn is_public_and_restricted(visibility: Visibility, markers: &[Capability]) -> bool {
    visibility == Visibility::Public
        && markers.iter().any(|m| {
            matches!(
                m,
                Capability::Restricted | Capability::Configuring | Capability::Adding
            )
        })
}

pub fn is_public_and_not_hidden(visibility: Visibility, markers: &[Capability]) -> bool {
    visibility == Visibility::Public && !markers.contains(&Capability::Hidden)
}

/// Recognizes trailing configure-block parameter shapes.
pub trait ConfigureLambdaHandler {
    /// The configured type if `ty` is a configure lambda this handler knows.
    fn configured_type<'a>(&self, ty: &'a HostType) -> Option<&'a HostType>;

    /// A no-op block of the shape of `ty`, used when an optional configure
    /// block is omitted.
    fn produce_noop_configure_lambda(
        &self,
        ty: &HostType,
        configured_type: DataTypeRef,
    ) -> Option<NoopConfigureLambda>;
}

/// Handles one named lambda shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LambdaShapeHandler {
    shape: &'static str,
}

impl LambdaShapeHandler {
    /// `T.() -> Unit` style receiver lambdas.
    pub fn function1() -> Self {
        Self { shape: "Function1" }
    }

    /// Single abstract method `Action<T>` callbacks.
    pub fn action() -> Self {
        Self { shape: "Action" }
    }
}

impl ConfigureLambdaHandler for LambdaShapeHandler {
    fn configured_type<'a>(&self, ty: &'a HostType) -> Option<&'a HostType> {
        match ty {
            HostType::Lambda { shape, receiver } if shape == self.shape => Some(receiver),
            _ => None,
        }
    }

    fn produce_noop_configure_lambda(
        &self,
        ty: &HostType,
        configured_type: DataTypeRef,
    ) -> Option<NoopConfigureLambda> {
        self.configured_type(ty)
            .map(|_| NoopConfigureLambda::new(self.shape, configured_type))
    }
}

/// Union of handlers; the first handler that recognizes a shape wins.
pub struct CompositeConfigureLambdaHandler {
    handlers: Vec<Box<dyn ConfigureLambdaHandler>>,
}

impl CompositeConfigureLambdaHandler {
    pub fn new(handlers: Vec<Box<dyn ConfigureLambdaHandler>>) -> Self {
        Self { handlers }
    }

    pub fn push(&mut self, handler: Box<dyn ConfigureLambdaHandler>) {
        self.handlers.push(handler);
    }
}

impl Default for CompositeConfigureLambdaHandler {
    fn default() -> Self {
        Self::new(vec![
            Box::new(LambdaShapeHandler::function1()),
            Box::new(LambdaShapeHandler::action()),
        ])
    }
}

impl ConfigureLambdaHandler for CompositeConfigureLambdaHandler {
    fn configured_type<'a>(&self, ty: &'a HostType) -> Option<&'a HostType> {
        self.handlers.iter().find_map(|h| h.configured_type(ty))
    }

    fn produce_noop_configure_lambda(
        &self,
        ty: &HostType,
        configured_type: DataTypeRef,
    ) -> Option<NoopConfigureLambda> {
        self.handlers
            .iter()
            .find(|h| h.configured_type(ty).is_some())
            .and_then(|h| h.produce_noop_configure_lambda(ty, configured_type))
    }
}

/// A property found on a host type, before its type is mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedProperty {
    pub name: String,
    pub ty: HostType,
    pub is_read_only: bool,
    pub has_default_value: bool,
    pub is_hidden: bool,
    pub is_direct_access_only: bool,
    /// Marked `Configuring`: also reachable as a configuring block.
    pub is_configuring: bool,
    /// Names of the functions that implement this property.
    pub accessors: Vec<String>,
}

impl ExtractedProperty {
    fn new(name: String, ty: HostType, is_read_only: bool, markers: &[Capability]) -> Self {
        Self {
            name,
            ty,
            is_read_only,
            has_default_value: markers.contains(&Capability::HasDefaultValue),
            is_hidden: markers.contains(&Capability::Hidden),
            is_direct_access_only: markers.contains(&Capability::DirectAccessOnly),
            is_configuring: markers.contains(&Capability::Configuring),
            accessors: vec![],
        }
    }
}

pub trait PropertyExtractor {
    fn extract_properties(
        &self,
        ty: &dyn TypeDescriptor,
        filter: &dyn MemberFilter,
    ) -> Vec<ExtractedProperty>;
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn accessor_suffix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)
        .filter(|rest| rest.chars().next().is_some_and(|c| c.is_uppercase()))
}

/// Property name of a `getX`/`isX` getter.
fn getter_property_name(function: &HostFunction) -> Option<String> {
    if !function.parameters.is_empty() || function.return_type == HostType::Unit {
        return None;
    }
    if let Some(rest) = accessor_suffix(&function.name, "get") {
        return Some(decapitalize(rest));
    }
    match accessor_suffix(&function.name, "is") {
        Some(rest) if function.return_type == HostType::Boolean => Some(decapitalize(rest)),
        _ => None,
    }
}

/// Properties made of a getter and an optional matching setter.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessorPairPropertyExtractor;

impl PropertyExtractor for AccessorPairPropertyExtractor {
    fn extract_properties(
        &self,
        ty: &dyn TypeDescriptor,
        filter: &dyn MemberFilter,
    ) -> Vec<ExtractedProperty> {
        let functions = ty.functions();
        let mut properties = vec![];
        for getter in functions {
            if !filter.should_include(getter.visibility, &getter.markers) {
                continue;
            }
            let Some(name) = getter_property_name(getter) else {
                continue;
            };

            let setter_name = match accessor_suffix(&getter.name, "get") {
                Some(rest) => format!("set{rest}"),
                None => format!("set{}", &getter.name[2..]),
            };
            let setter = functions.iter().find(|f| {
                f.name == setter_name
                    && f.visibility == Visibility::Public
                    && f.return_type == HostType::Unit
                    && f.parameters.len() == 1
                    && f.parameters[0].ty == getter.return_type
            });

            let mut property = ExtractedProperty::new(
                name,
                getter.return_type.clone(),
                setter.is_none(),
                &getter.markers,
            );
            property.accessors.push(getter.name.clone());
            if let Some(setter) = setter {
                property.accessors.push(setter.name.clone());
            }
            properties.push(property);
        }
        properties
    }
}

/// Properties backed directly by fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldPropertyExtractor;

impl PropertyExtractor for FieldPropertyExtractor {
    fn extract_properties(
        &self,
        ty: &dyn TypeDescriptor,
        filter: &dyn MemberFilter,
    ) -> Vec<ExtractedProperty> {
        ty.fields()
            .iter()
            .filter(|f| filter.should_include(f.visibility, &f.markers))
            .map(|f| ExtractedProperty::new(f.name.clone(), f.ty.clone(), !f.is_mutable, &f.markers))
            .collect()
    }
}

/// Runs every extractor; the first property with a given name wins.
pub struct CompositePropertyExtractor {
    extractors: Vec<Box<dyn PropertyExtractor>>,
}

impl CompositePropertyExtractor {
    pub fn new(extractors: Vec<Box<dyn PropertyExtractor>>) -> Self {
        Self { extractors }
    }
}

impl Default for CompositePropertyExtractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(AccessorPairPropertyExtractor),
            Box::new(FieldPropertyExtractor),
        ])
    }
}

impl PropertyExtractor for CompositePropertyExtractor {
    fn extract_properties(
        &self,
        ty: &dyn TypeDescriptor,
        filter: &dyn MemberFilter,
    ) -> Vec<ExtractedProperty> {
        let mut by_name: IndexMap<String, ExtractedProperty> = IndexMap::new();
        for extractor in &self.extractors {
            for property in extractor.extract_properties(ty, filter) {
                by_name.entry(property.name.clone()).or_insert(property);
            }
        }
        by_name.into_values().collect()
    }
}

/// Services available to type discovery.
pub struct DiscoveryContext<'a> {
    pub filter: &'a dyn MemberFilter,
    pub lambdas: &'a dyn ConfigureLambdaHandler,
    pub properties: &'a dyn PropertyExtractor,
}

/// Contributes the other types reachable from a discovered type.
pub trait TypeDiscovery {
    fn types_to_visit(&self, ctx: &DiscoveryContext<'_>, ty: &dyn TypeDescriptor) -> Vec<FqName>;
}

/// Every class name mentioned by `ty`, looking through configure lambdas.
pub fn referenced_classes(ty: &HostType, lambdas: &dyn ConfigureLambdaHandler, out: &mut Vec<FqName>) {
    if let Some(configured) = lambdas.configured_type(ty) {
        referenced_classes(configured, lambdas, out);
        return;
    }
    match ty {
        HostType::Class(name) => out.push(name.clone()),
        HostType::Nullable(t) => referenced_classes(t, lambdas, out),
        HostType::Generic { name, arguments } => {
            out.push(name.clone());
            for a in arguments {
                referenced_classes(a, lambdas, out);
            }
        }
        HostType::Lambda { receiver, .. } => referenced_classes(receiver, lambdas, out),
        HostType::Unit
        | HostType::Int
        | HostType::Long
        | HostType::String
        | HostType::Boolean
        | HostType::TypeParameter(_) => (),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SupertypeDiscovery;

impl TypeDiscovery for SupertypeDiscovery {
    fn types_to_visit(&self, _ctx: &DiscoveryContext<'_>, ty: &dyn TypeDescriptor) -> Vec<FqName> {
        ty.supertypes().to_vec()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyTypeDiscovery;

impl TypeDiscovery for PropertyTypeDiscovery {
    fn types_to_visit(&self, ctx: &DiscoveryContext<'_>, ty: &dyn TypeDescriptor) -> Vec<FqName> {
        let mut out = vec![];
        for property in ctx.properties.extract_properties(ty, ctx.filter) {
            referenced_classes(&property.ty, ctx.lambdas, &mut out);
        }
        out
    }
}

/// Parameter, return and configured types of included functions and constructors.
#[derive(Debug, Default, Clone, Copy)]
pub struct FunctionTypeDiscovery;

impl TypeDiscovery for FunctionTypeDiscovery {
    fn types_to_visit(&self, ctx: &DiscoveryContext<'_>, ty: &dyn TypeDescriptor) -> Vec<FqName> {
        let mut out = vec![];
        for function in ty.functions() {
            if !ctx.filter.should_include(function.visibility, &function.markers) {
                continue;
            }
            referenced_classes(&function.return_type, ctx.lambdas, &mut out);
            for p in &function.parameters {
                referenced_classes(&p.ty, ctx.lambdas, &mut out);
            }
        }
        for constructor in ty.constructors() {
            if !ctx
                .filter
                .should_include(constructor.visibility, &constructor.markers)
            {
                continue;
            }
            for p in &constructor.parameters {
                referenced_classes(&p.ty, ctx.lambdas, &mut out);
            }
        }
        out
    }
}

pub struct CompositeTypeDiscovery {
    contributors: Vec<Box<dyn TypeDiscovery>>,
}

impl CompositeTypeDiscovery {
    pub fn new(contributors: Vec<Box<dyn TypeDiscovery>>) -> Self {
        Self { contributors }
    }

    pub fn push(&mut self, contributor: Box<dyn TypeDiscovery>) {
        self.contributors.push(contributor);
    }
}

impl Default for CompositeTypeDiscovery {
    fn default() -> Self {
        Self::new(vec![
            Box::new(SupertypeDiscovery),
            Box::new(PropertyTypeDiscovery),
            Box::new(FunctionTypeDiscovery),
        ])
    }
}

impl TypeDiscovery for CompositeTypeDiscovery {
    fn types_to_visit(&self, ctx: &DiscoveryContext<'_>, ty: &dyn TypeDescriptor) -> Vec<FqName> {
        self.contributors
            .iter()
            .flat_map(|c| c.types_to_visit(ctx, ty))
            .collect()
    }
}
