// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::extractors::*;
use super::host::*;
use super::*;
use crate::Rc;

use std::collections::{BTreeSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

type Result<T> = core::result::Result<T, SchemaBuildingError>;

// Tracks where the builder is, for error messages.
#[derive(Default)]
struct Host {
    context: Vec<String>,
}

impl Host {
    fn with_context<T>(
        &mut self,
        context: String,
        f: impl FnOnce(&mut Host) -> Result<T>,
    ) -> Result<T> {
        self.context.push(context);
        let r = f(self);
        self.context.pop();
        r
    }

    fn error(&self, message: String) -> SchemaBuildingError {
        SchemaBuildingError::new(self.context.clone(), message)
    }
}

fn type_ref(host: &Host, ty: &HostType) -> Result<DataTypeRef> {
    Ok(match ty {
        HostType::Unit => DataTypeRef::Unit,
        HostType::Int => DataTypeRef::Constant(ConstantType::Int),
        HostType::Long => DataTypeRef::Constant(ConstantType::Long),
        HostType::String => DataTypeRef::Constant(ConstantType::String),
        HostType::Boolean => DataTypeRef::Constant(ConstantType::Boolean),
        HostType::Class(name) => DataTypeRef::Name(name.clone()),
        HostType::Nullable(_) => {
            return Err(host.error(format!("nullable type `{ty}` is not supported")))
        }
        HostType::Generic { .. } => {
            return Err(host.error(format!("generic type `{ty}` is not supported")))
        }
        HostType::TypeParameter(_) => {
            return Err(host.error(format!("type parameter `{ty}` is not supported")))
        }
        HostType::Lambda { .. } => {
            return Err(host.error(format!(
                "function type `{ty}` can only be used as a configure block"
            )))
        }
    })
}

fn semantics_refs(semantics: &FunctionSemantics) -> Vec<&DataTypeRef> {
    match semantics {
        FunctionSemantics::AccessAndConfigure {
            accessor,
            configured_type,
            ..
        } => match accessor {
            ConfigureAccessor::ConfiguringLambdaArgument(t) => vec![configured_type, t],
            ConfigureAccessor::Property(_) => vec![configured_type],
        },
        FunctionSemantics::NewObject { returned_type, .. }
        | FunctionSemantics::Pure { returned_type } => vec![returned_type],
    }
}

struct ConfigureBlock {
    configured_type: DataTypeRef,
    requirement: ConfigureBlockRequirement,
    default: Option<NoopConfigureLambda>,
}

/// Builds an [`AnalysisSchema`] from host type descriptors.
///
/// The set of classes is the closure of the root type under the registered
/// [`TypeDiscovery`] contributors. Every included member of every class must be
/// describable; otherwise construction fails and no schema is produced.
pub struct SchemaBuilder<'r> {
    registry: &'r HostTypeRegistry,
    filter: Box<dyn MemberFilter>,
    lambdas: CompositeConfigureLambdaHandler,
    properties: CompositePropertyExtractor,
    discovery: CompositeTypeDiscovery,
    extra_types: Vec<FqName>,
    external_functions: Vec<HostTopLevelFunction>,
    external_objects: Vec<(FqName, HostType)>,
    default_imports: Vec<FqName>,
}

impl<'r> SchemaBuilder<'r> {
    pub fn new(registry: &'r HostTypeRegistry) -> Self {
        Self {
            registry,
            filter: Box::new(is_public_and_restricted),
            lambdas: CompositeConfigureLambdaHandler::default(),
            properties: CompositePropertyExtractor::default(),
            discovery: CompositeTypeDiscovery::default(),
            extra_types: vec![],
            external_functions: vec![],
            external_objects: vec![],
            default_imports: vec![],
        }
    }

    pub fn with_member_filter<F: MemberFilter + 'static>(mut self, filter: F) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Add a handler after the built-in `Function1` and `Action` handlers.
    pub fn with_configure_lambda_handler(mut self, handler: Box<dyn ConfigureLambdaHandler>) -> Self {
        self.lambdas.push(handler);
        self
    }

    pub fn with_property_extractor(mut self, properties: CompositePropertyExtractor) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_type_discovery(mut self, discovery: Box<dyn TypeDiscovery>) -> Self {
        self.discovery.push(discovery);
        self
    }

    /// Include `name` even when it is not reachable from the root type.
    pub fn with_extra_type(mut self, name: &str) -> Self {
        self.extra_types.push(FqName::parse(name));
        self
    }

    pub fn with_external_function(mut self, function: HostTopLevelFunction) -> Self {
        self.external_functions.push(function);
        self
    }

    pub fn with_external_object(mut self, name: &str, ty: HostType) -> Self {
        self.external_objects.push((FqName::parse(name), ty));
        self
    }

    pub fn with_default_import(mut self, name: &str) -> Self {
        self.default_imports.push(FqName::parse(name));
        self
    }

    pub fn build(&self, root: &FqName) -> Result<AnalysisSchema> {
        let mut host = Host::default();
        let discovered = self.discover_types(&host, root)?;
        debug!("schema closure from `{root}`: {} types", discovered.len());

        let mut classes: IndexMap<FqName, Rc<DataClass>> = IndexMap::new();
        for descriptor in &discovered {
            let class = host.with_context(format!("class `{}`", descriptor.name()), |host| {
                self.build_class(host, descriptor.as_ref())
            })?;
            trace!(
                "class `{}`: {} properties, {} functions, {} constructors",
                class.name(),
                class.properties().len(),
                class.member_functions().len(),
                class.constructors().len()
            );
            classes.insert(class.name().clone(), Rc::new(class));
        }

        let mut external_functions = IndexMap::new();
        for f in &self.external_functions {
            let name = FqName::new(&f.package_name, &f.function.name);
            let function = host.with_context(format!("top-level function `{name}`"), |host| {
                let parameters = self.parameters(host, &f.function.parameters)?;
                let returned_type = host.with_context("return type".to_string(), |host| {
                    type_ref(host, &f.function.return_type)
                })?;
                Ok(DataTopLevelFunction::new(
                    f.package_name.clone(),
                    f.function.name.clone(),
                    parameters,
                    FunctionSemantics::Pure { returned_type },
                ))
            })?;
            external_functions.insert(name, Rc::new(function));
        }

        let mut external_objects = IndexMap::new();
        for (name, ty) in &self.external_objects {
            let t = host.with_context(format!("external object `{name}`"), |host| {
                type_ref(host, ty)
            })?;
            external_objects.insert(name.clone(), t);
        }

        let Some(top_level_receiver_type) = classes.get(root).cloned() else {
            return Err(host.error(format!("root type `{root}` is not registered")));
        };

        let schema = AnalysisSchema::new(
            top_level_receiver_type,
            classes,
            external_functions,
            external_objects,
            self.default_imports.iter().cloned().collect(),
        );
        self.validate(&mut host, &schema)?;
        Ok(schema)
    }

    fn discover_types(&self, host: &Host, root: &FqName) -> Result<Vec<Rc<dyn TypeDescriptor>>> {
        let mut queue: VecDeque<FqName> = VecDeque::new();
        for name in core::iter::once(root).chain(self.extra_types.iter()) {
            if self.registry.get(name).is_none() {
                return Err(host.error(format!("type `{name}` is not registered")));
            }
            queue.push_back(name.clone());
        }

        let mut referenced = vec![];
        for f in &self.external_functions {
            referenced_classes(&f.function.return_type, &self.lambdas, &mut referenced);
            for p in &f.function.parameters {
                referenced_classes(&p.ty, &self.lambdas, &mut referenced);
            }
        }
        for (_, ty) in &self.external_objects {
            referenced_classes(ty, &self.lambdas, &mut referenced);
        }
        queue.extend(referenced);

        let ctx = DiscoveryContext {
            filter: self.filter.as_ref(),
            lambdas: &self.lambdas,
            properties: &self.properties,
        };

        let mut seen: IndexSet<FqName> = IndexSet::new();
        let mut discovered = vec![];
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            // Unregistered references are reported by validation if a member uses them.
            let Some(descriptor) = self.registry.get(&name) else {
                trace!("type `{name}` is not registered; skipping");
                continue;
            };
            queue.extend(self.discovery.types_to_visit(&ctx, descriptor.as_ref()));
            discovered.push(descriptor.clone());
        }
        Ok(discovered)
    }

    fn build_class(&self, host: &mut Host, ty: &dyn TypeDescriptor) -> Result<DataClass> {
        if ty.type_parameter_count() > 0 {
            return Err(host.error("generic classes are not supported".to_string()));
        }
        let receiver = DataTypeRef::Name(ty.name().clone());

        let extracted = self.properties.extract_properties(ty, self.filter.as_ref());
        let mut properties = vec![];
        for p in &extracted {
            let property = host.with_context(format!("property `{}`", p.name), |host| {
                Ok(DataProperty::new(
                    p.name.clone(),
                    type_ref(host, &p.ty)?,
                    p.is_read_only,
                    p.has_default_value,
                    p.is_hidden,
                    p.is_direct_access_only,
                ))
            })?;
            properties.push(Rc::new(property));
        }

        let accessors: BTreeSet<&str> = extracted
            .iter()
            .flat_map(|p| p.accessors.iter().map(String::as_str))
            .collect();

        let mut functions: Vec<Rc<SchemaMemberFunction>> = vec![];
        for f in ty.functions() {
            if accessors.contains(f.name.as_str())
                || !self.filter.should_include(f.visibility, &f.markers)
            {
                continue;
            }
            let function = host.with_context(format!("function `{}`", f.name), |host| {
                self.member_function(host, &receiver, f)
            })?;
            functions.push(Rc::new(function));
        }

        // Read-only configuring properties of class type are also usable as blocks.
        for (p, property) in extracted.iter().zip(&properties) {
            let DataTypeRef::Name(_) = property.value_type() else {
                continue;
            };
            if !p.is_configuring
                || !p.is_read_only
                || functions.iter().any(|f| f.simple_name() == p.name)
            {
                continue;
            }
            functions.push(Rc::new(SchemaMemberFunction::new(
                receiver.clone(),
                p.name.clone(),
                vec![],
                p.is_direct_access_only,
                FunctionSemantics::AccessAndConfigure {
                    accessor: ConfigureAccessor::Property(p.name.clone()),
                    return_type: ConfigureReturnType::Unit,
                    configured_type: property.value_type().clone(),
                    block_requirement: ConfigureBlockRequirement::Required,
                },
                None,
            )));
        }

        let mut constructors = vec![];
        for (idx, c) in ty.constructors().iter().enumerate() {
            if !self.filter.should_include(c.visibility, &c.markers) {
                continue;
            }
            let parameters = host.with_context(format!("constructor #{idx}"), |host| {
                self.parameters(host, &c.parameters)
            })?;
            constructors.push(Rc::new(DataConstructor::new(
                parameters,
                ty.name().clone(),
            )));
        }

        Ok(DataClass::new(
            ty.name().clone(),
            self.supertypes(ty),
            properties,
            functions,
            constructors,
        ))
    }

    fn supertypes(&self, ty: &dyn TypeDescriptor) -> BTreeSet<FqName> {
        let mut out = BTreeSet::new();
        let mut stack = ty.supertypes().to_vec();
        while let Some(name) = stack.pop() {
            if let Some(d) = self.registry.get(&name) {
                if !out.contains(&name) {
                    stack.extend(d.supertypes().iter().cloned());
                }
            }
            out.insert(name);
        }
        out
    }

    fn parameters(&self, host: &mut Host, parameters: &[HostParameter]) -> Result<Vec<DataParameter>> {
        let mut out = vec![];
        for (idx, p) in parameters.iter().enumerate() {
            let label = match &p.name {
                Some(name) => format!("parameter `{name}`"),
                None => format!("parameter #{idx}"),
            };
            let t = host.with_context(label, |host| type_ref(host, &p.ty))?;
            out.push(DataParameter::new(
                p.name.clone(),
                t,
                p.is_optional,
                p.semantics.clone(),
            ));
        }
        Ok(out)
    }

    fn configure_block(&self, host: &Host, parameter: &HostParameter) -> Result<ConfigureBlock> {
        let Some(configured) = self.lambdas.configured_type(&parameter.ty) else {
            return Err(host.error(format!("`{}` is not a configure block", parameter.ty)));
        };
        let configured_type = type_ref(host, configured)?;

        if !parameter.is_optional {
            return Ok(ConfigureBlock {
                configured_type,
                requirement: ConfigureBlockRequirement::Required,
                default: None,
            });
        }

        match self
            .lambdas
            .produce_noop_configure_lambda(&parameter.ty, configured_type.clone())
        {
            Some(default) => Ok(ConfigureBlock {
                configured_type,
                requirement: ConfigureBlockRequirement::Optional,
                default: Some(default),
            }),
            None => Err(host.error(format!(
                "cannot produce a default for optional configure block `{}`",
                parameter.ty
            ))),
        }
    }

    fn member_function(
        &self,
        host: &mut Host,
        receiver: &DataTypeRef,
        f: &HostFunction,
    ) -> Result<SchemaMemberFunction> {
        let (value_parameters, block) = match f.parameters.split_last() {
            Some((last, rest)) if self.lambdas.configured_type(&last.ty).is_some() => {
                let block = host.with_context(
                    format!("parameter `{}`", last.name.as_deref().unwrap_or("<block>")),
                    |host| self.configure_block(host, last),
                )?;
                (rest, Some(block))
            }
            _ => (f.parameters.as_slice(), None),
        };

        let parameters = self.parameters(host, value_parameters)?;
        let returned_type =
            host.with_context("return type".to_string(), |host| type_ref(host, &f.return_type))?;
        let block_requirement = block
            .as_ref()
            .map_or(ConfigureBlockRequirement::NotAllowed, |b| b.requirement);

        let semantics = if f.markers.contains(&Capability::Adding) {
            FunctionSemantics::NewObject {
                returned_type,
                block_requirement,
            }
        } else if f.markers.contains(&Capability::Configuring) || block.is_some() {
            let Some(block) = &block else {
                return Err(host.error("configuring function has no configure block".to_string()));
            };
            let return_type = if returned_type == DataTypeRef::Unit {
                ConfigureReturnType::Unit
            } else if returned_type == block.configured_type {
                ConfigureReturnType::ConfiguredObject
            } else {
                return Err(host.error(format!(
                    "configuring function must return Unit or `{}`, not `{returned_type}`",
                    block.configured_type
                )));
            };
            FunctionSemantics::AccessAndConfigure {
                accessor: ConfigureAccessor::ConfiguringLambdaArgument(
                    block.configured_type.clone(),
                ),
                return_type,
                configured_type: block.configured_type.clone(),
                block_requirement,
            }
        } else {
            FunctionSemantics::Pure { returned_type }
        };

        Ok(SchemaMemberFunction::new(
            receiver.clone(),
            f.name.clone(),
            parameters,
            f.markers.contains(&Capability::DirectAccessOnly),
            semantics,
            block.and_then(|b| b.default),
        ))
    }

    // Every referenced class must be part of the schema.
    fn validate(&self, host: &mut Host, schema: &AnalysisSchema) -> Result<()> {
        let check = |host: &mut Host, r: &DataTypeRef| -> Result<()> {
            match r {
                DataTypeRef::Name(name) if schema.class(name).is_none() => {
                    Err(host.error(format!("type `{name}` is not part of the schema")))
                }
                _ => Ok(()),
            }
        };

        for class in schema.data_class_types_by_fq_name().values() {
            host.with_context(format!("class `{}`", class.name()), |host| {
                for p in class.properties() {
                    host.with_context(format!("property `{}`", p.name()), |host| {
                        check(host, p.value_type())
                    })?;
                }
                for f in class.member_functions() {
                    host.with_context(format!("function `{}`", f.simple_name()), |host| {
                        for p in f.parameters() {
                            check(host, p.type_ref())?;
                        }
                        for r in semantics_refs(f.semantics()) {
                            check(host, r)?;
                        }
                        Ok(())
                    })?;
                }
                for (idx, c) in class.constructors().iter().enumerate() {
                    host.with_context(format!("constructor #{idx}"), |host| {
                        for p in c.parameters() {
                            check(host, p.type_ref())?;
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            })?;
        }

        for (name, f) in schema.external_functions_by_fq_name() {
            host.with_context(format!("top-level function `{name}`"), |host| {
                for p in f.parameters() {
                    check(host, p.type_ref())?;
                }
                for r in semantics_refs(f.semantics()) {
                    check(host, r)?;
                }
                Ok(())
            })?;
        }

        for (name, t) in schema.external_objects_by_fq_name() {
            host.with_context(format!("external object `{name}`"), |host| check(host, t))?;
        }
        Ok(())
    }
}
