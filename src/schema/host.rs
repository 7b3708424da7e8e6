// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Host type descriptors.
//!
//! The schema builder does not reflect over Rust types. Instead, every type
//! that scripts may configure is described by a [`TypeDescriptor`], either
//! written by hand with [`HostClass`] or generated.

use super::{FqName, ParameterSemantics};
use crate::Rc;

use core::fmt;

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Internal,
    Private,
}

/// Capability markers declared on host members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Usable from the restricted language.
    Restricted,
    /// Configures an existing object.
    Configuring,
    /// Creates and adds a new object.
    Adding,
    HasDefaultValue,
    Hidden,
    DirectAccessOnly,
}

/// Type of a host member as declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostType {
    Unit,
    Int,
    Long,
    String,
    Boolean,
    Class(FqName),
    Nullable(Box<HostType>),
    Generic {
        name: FqName,
        arguments: Vec<HostType>,
    },
    TypeParameter(String),
    /// A function-typed value, e.g. `Function1` or `Action`, whose receiver
    /// or single argument is `receiver`.
    Lambda {
        shape: String,
        receiver: Box<HostType>,
    },
}

impl HostType {
    pub fn class(name: &str) -> Self {
        HostType::Class(FqName::parse(name))
    }

    pub fn lambda(shape: &str, receiver: HostType) -> Self {
        HostType::Lambda {
            shape: shape.to_string(),
            receiver: Box::new(receiver),
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Unit => write!(f, "Unit"),
            HostType::Int => write!(f, "Int"),
            HostType::Long => write!(f, "Long"),
            HostType::String => write!(f, "String"),
            HostType::Boolean => write!(f, "Boolean"),
            HostType::Class(name) => write!(f, "{name}"),
            HostType::Nullable(t) => write!(f, "{t}?"),
            HostType::Generic { name, arguments } => {
                write!(f, "{name}<")?;
                for (i, a) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ">")
            }
            HostType::TypeParameter(p) => write!(f, "{p}"),
            HostType::Lambda { shape, receiver } => write!(f, "{shape}<{receiver}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostParameter {
    pub name: Option<String>,
    pub ty: HostType,
    pub is_optional: bool,
    pub semantics: ParameterSemantics,
}

impl HostParameter {
    pub fn new(name: &str, ty: HostType) -> Self {
        Self {
            name: Some(name.to_string()),
            ty,
            is_optional: false,
            semantics: ParameterSemantics::Unknown,
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn with_semantics(mut self, semantics: ParameterSemantics) -> Self {
        self.semantics = semantics;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFunction {
    pub name: String,
    pub parameters: Vec<HostParameter>,
    pub return_type: HostType,
    pub markers: Vec<Capability>,
    pub visibility: Visibility,
}

impl HostFunction {
    pub fn new(name: &str, return_type: HostType) -> Self {
        Self {
            name: name.to_string(),
            parameters: vec![],
            return_type,
            markers: vec![],
            visibility: Visibility::Public,
        }
    }

    pub fn param(mut self, parameter: HostParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn marker(mut self, marker: Capability) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostField {
    pub name: String,
    pub ty: HostType,
    pub is_mutable: bool,
    pub markers: Vec<Capability>,
    pub visibility: Visibility,
}

impl HostField {
    pub fn new(name: &str, ty: HostType, is_mutable: bool) -> Self {
        Self {
            name: name.to_string(),
            ty,
            is_mutable,
            markers: vec![],
            visibility: Visibility::Public,
        }
    }

    pub fn marker(mut self, marker: Capability) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConstructor {
    pub parameters: Vec<HostParameter>,
    pub markers: Vec<Capability>,
    pub visibility: Visibility,
}

impl HostConstructor {
    pub fn new(parameters: Vec<HostParameter>) -> Self {
        Self {
            parameters,
            markers: vec![],
            visibility: Visibility::Public,
        }
    }

    pub fn marker(mut self, marker: Capability) -> Self {
        self.markers.push(marker);
        self
    }
}

/// A function available at the top level of a script, e.g. a value factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTopLevelFunction {
    pub package_name: String,
    pub function: HostFunction,
}

/// Everything the schema builder needs to know about a host type.
pub trait TypeDescriptor {
    fn name(&self) -> &FqName;
    fn supertypes(&self) -> &[FqName];
    fn functions(&self) -> &[HostFunction];
    fn fields(&self) -> &[HostField];
    fn constructors(&self) -> &[HostConstructor];

    fn type_parameter_count(&self) -> usize {
        0
    }
}

/// A manually registered host type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostClass {
    name: FqName,
    supertypes: Vec<FqName>,
    functions: Vec<HostFunction>,
    fields: Vec<HostField>,
    constructors: Vec<HostConstructor>,
    type_parameter_count: usize,
}

impl HostClass {
    pub fn new(name: &str) -> Self {
        Self {
            name: FqName::parse(name),
            supertypes: vec![],
            functions: vec![],
            fields: vec![],
            constructors: vec![],
            type_parameter_count: 0,
        }
    }

    pub fn supertype(mut self, name: &str) -> Self {
        self.supertypes.push(FqName::parse(name));
        self
    }

    pub fn function(mut self, function: HostFunction) -> Self {
        self.functions.push(function);
        self
    }

    pub fn field(mut self, field: HostField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn constructor(mut self, constructor: HostConstructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn type_parameters(mut self, count: usize) -> Self {
        self.type_parameter_count = count;
        self
    }
}

impl TypeDescriptor for HostClass {
    fn name(&self) -> &FqName {
        &self.name
    }

    fn supertypes(&self) -> &[FqName] {
        &self.supertypes
    }

    fn functions(&self) -> &[HostFunction] {
        &self.functions
    }

    fn fields(&self) -> &[HostField] {
        &self.fields
    }

    fn constructors(&self) -> &[HostConstructor] {
        &self.constructors
    }

    fn type_parameter_count(&self) -> usize {
        self.type_parameter_count
    }
}

/// Known host types, by name.
#[derive(Clone, Default)]
pub struct HostTypeRegistry {
    types: IndexMap<FqName, Rc<dyn TypeDescriptor>>,
}

impl HostTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `descriptor`, replacing any previous type with the same name.
    pub fn register<T: TypeDescriptor + 'static>(&mut self, descriptor: T) -> &mut Self {
        let descriptor: Rc<dyn TypeDescriptor> = Rc::new(descriptor);
        self.types.insert(descriptor.name().clone(), descriptor);
        self
    }

    pub fn get(&self, name: &FqName) -> Option<&Rc<dyn TypeDescriptor>> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
