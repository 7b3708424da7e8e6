// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// The analysis schema describes every type, property and function a script
/// may use. It is produced by the [`builder::SchemaBuilder`] from host type
/// descriptors and consumed by the resolver projection.
///
/// The schema is implemented with the following principles:
///     - Types are immutable and can be shared safely across threads. All fields are
///       private and exposed through read-only accessors; with the default `arc`
///       feature, classes, properties and functions are held in `Arc`.
///     - Any host member that cannot be described raises an error during schema
///       construction. Otherwise, the user will not know whether parts of their
///       types are silently ignored.
///     - Leverage serde for dumping a schema as JSON, avoiding custom serialization logic.
///
/// A schema for a small build model could look like this when dumped:
/// {
///   "top_level_receiver_type": {
///     "name": "com.example.Project",
///     "supertypes": [],
///     "properties": [
///       { "name": "version", "value_type": { "Constant": "String" }, ... }
///     ],
///     "member_functions": [
///       {
///         "simple_name": "application",
///         "semantics": {
///           "AccessAndConfigure": {
///             "accessor": { "Property": "application" },
///             "configured_type": { "Name": "com.example.Application" },
///             "block_requirement": "Required",
///             ...
///           }
///         },
///         ...
///       }
///     ],
///     ...
///   },
///   "data_class_types_by_fq_name": { "com.example.Project": { ... }, ... },
///   ...
/// }
use crate::Rc;

use core::fmt;
use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

pub mod builder;
pub mod error;
pub mod extractors;
pub mod host;

#[cfg(test)]
mod tests;

pub use builder::SchemaBuilder;
pub use error::SchemaBuildingError;

/// Fully qualified type or function name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FqName {
    package_name: String,
    simple_name: String,
}

impl FqName {
    pub fn new(package_name: &str, simple_name: &str) -> Self {
        Self {
            package_name: package_name.to_string(),
            simple_name: simple_name.to_string(),
        }
    }

    /// Split `name` at its last dot. A name without dots has an empty package.
    pub fn parse(name: &str) -> Self {
        match name.rsplit_once('.') {
            Some((package, simple)) => Self::new(package, simple),
            None => Self::new("", name),
        }
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn qualified_name(&self) -> String {
        if self.package_name.is_empty() {
            self.simple_name.clone()
        } else {
            format!("{}.{}", self.package_name, self.simple_name)
        }
    }
}

impl fmt::Display for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

// Serialized as a plain string so that it can be used as a JSON map key.
impl Serialize for FqName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.qualified_name())
    }
}

/// Primitive literal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ConstantType {
    Int,
    Long,
    String,
    Boolean,
}

impl ConstantType {
    /// The host primitive values of this kind are bound to.
    pub fn host_type(&self) -> &'static str {
        match self {
            ConstantType::Int => "i32",
            ConstantType::Long => "i64",
            ConstantType::String => "String",
            ConstantType::Boolean => "bool",
        }
    }
}

/// Reference to a type, resolved through the schema's class index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DataTypeRef {
    Constant(ConstantType),
    Null,
    Unit,
    Name(FqName),
}

impl fmt::Display for DataTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataTypeRef::Constant(c) => write!(f, "{c:?}"),
            DataTypeRef::Null => write!(f, "Null"),
            DataTypeRef::Unit => write!(f, "Unit"),
            DataTypeRef::Name(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum DataType {
    Constant(ConstantType),
    Null,
    Unit,
    Class(Rc<DataClass>),
}

impl DataType {
    pub fn as_class(&self) -> Option<&Rc<DataClass>> {
        match self {
            DataType::Class(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataClass {
    name: FqName,
    supertypes: BTreeSet<FqName>,
    properties: Vec<Rc<DataProperty>>,
    member_functions: Vec<Rc<SchemaMemberFunction>>,
    constructors: Vec<Rc<DataConstructor>>,
}

impl DataClass {
    pub(crate) fn new(
        name: FqName,
        supertypes: BTreeSet<FqName>,
        properties: Vec<Rc<DataProperty>>,
        member_functions: Vec<Rc<SchemaMemberFunction>>,
        constructors: Vec<Rc<DataConstructor>>,
    ) -> Self {
        Self {
            name,
            supertypes,
            properties,
            member_functions,
            constructors,
        }
    }

    pub fn name(&self) -> &FqName {
        &self.name
    }

    /// All supertypes, transitively.
    pub fn supertypes(&self) -> &BTreeSet<FqName> {
        &self.supertypes
    }

    pub fn properties(&self) -> &[Rc<DataProperty>] {
        &self.properties
    }

    pub fn member_functions(&self) -> &[Rc<SchemaMemberFunction>] {
        &self.member_functions
    }

    pub fn constructors(&self) -> &[Rc<DataConstructor>] {
        &self.constructors
    }

    pub fn property(&self, name: &str) -> Option<&Rc<DataProperty>> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn functions_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Rc<SchemaMemberFunction>> + 'a {
        self.member_functions
            .iter()
            .filter(move |f| f.simple_name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataProperty {
    name: String,
    value_type: DataTypeRef,
    is_read_only: bool,
    has_default_value: bool,
    is_hidden_in_restricted_dsl: bool,
    is_direct_access_only: bool,
}

impl DataProperty {
    pub(crate) fn new(
        name: String,
        value_type: DataTypeRef,
        is_read_only: bool,
        has_default_value: bool,
        is_hidden_in_restricted_dsl: bool,
        is_direct_access_only: bool,
    ) -> Self {
        Self {
            name,
            value_type,
            is_read_only,
            has_default_value,
            is_hidden_in_restricted_dsl,
            is_direct_access_only,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &DataTypeRef {
        &self.value_type
    }

    pub fn is_read_only(&self) -> bool {
        self.is_read_only
    }

    pub fn has_default_value(&self) -> bool {
        self.has_default_value
    }

    pub fn is_hidden_in_restricted_dsl(&self) -> bool {
        self.is_hidden_in_restricted_dsl
    }

    pub fn is_direct_access_only(&self) -> bool {
        self.is_direct_access_only
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParameterSemantics {
    Unknown,
    /// The argument is stored in the named property of the produced object.
    StoreValueInProperty(String),
    /// The argument identifies the produced object.
    IdentityKey(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataParameter {
    name: Option<String>,
    type_ref: DataTypeRef,
    is_default: bool,
    semantics: ParameterSemantics,
}

impl DataParameter {
    pub(crate) fn new(
        name: Option<String>,
        type_ref: DataTypeRef,
        is_default: bool,
        semantics: ParameterSemantics,
    ) -> Self {
        Self {
            name,
            type_ref,
            is_default,
            semantics,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn type_ref(&self) -> &DataTypeRef {
        &self.type_ref
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn semantics(&self) -> &ParameterSemantics {
        &self.semantics
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfigureBlockRequirement {
    NotAllowed,
    Optional,
    Required,
}

impl ConfigureBlockRequirement {
    pub fn allows_block(&self) -> bool {
        !matches!(self, ConfigureBlockRequirement::NotAllowed)
    }

    pub fn requires_block(&self) -> bool {
        matches!(self, ConfigureBlockRequirement::Required)
    }
}

/// How an access-and-configure function reaches the object it configures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConfigureAccessor {
    /// Through a read-only property of the receiver.
    Property(String),
    /// Through the receiver of the trailing configure lambda.
    ConfiguringLambdaArgument(DataTypeRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfigureReturnType {
    Unit,
    ConfiguredObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FunctionSemantics {
    AccessAndConfigure {
        accessor: ConfigureAccessor,
        return_type: ConfigureReturnType,
        configured_type: DataTypeRef,
        block_requirement: ConfigureBlockRequirement,
    },
    NewObject {
        returned_type: DataTypeRef,
        block_requirement: ConfigureBlockRequirement,
    },
    Pure {
        returned_type: DataTypeRef,
    },
}

impl FunctionSemantics {
    pub fn returned_type(&self) -> DataTypeRef {
        match self {
            FunctionSemantics::AccessAndConfigure {
                return_type: ConfigureReturnType::Unit,
                ..
            } => DataTypeRef::Unit,
            FunctionSemantics::AccessAndConfigure {
                configured_type, ..
            } => configured_type.clone(),
            FunctionSemantics::NewObject { returned_type, .. }
            | FunctionSemantics::Pure { returned_type } => returned_type.clone(),
        }
    }

    pub fn block_requirement(&self) -> ConfigureBlockRequirement {
        match self {
            FunctionSemantics::AccessAndConfigure {
                block_requirement, ..
            }
            | FunctionSemantics::NewObject {
                block_requirement, ..
            } => *block_requirement,
            FunctionSemantics::Pure { .. } => ConfigureBlockRequirement::NotAllowed,
        }
    }
}

/// Stand-in for an omitted optional configure block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoopConfigureLambda {
    shape: String,
    configured_type: DataTypeRef,
}

impl NoopConfigureLambda {
    pub fn new(shape: &str, configured_type: DataTypeRef) -> Self {
        Self {
            shape: shape.to_string(),
            configured_type,
        }
    }

    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn configured_type(&self) -> &DataTypeRef {
        &self.configured_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaMemberFunction {
    receiver: DataTypeRef,
    simple_name: String,
    parameters: Vec<DataParameter>,
    is_direct_access_only: bool,
    semantics: FunctionSemantics,
    default_configure_lambda: Option<NoopConfigureLambda>,
}

impl SchemaMemberFunction {
    pub(crate) fn new(
        receiver: DataTypeRef,
        simple_name: String,
        parameters: Vec<DataParameter>,
        is_direct_access_only: bool,
        semantics: FunctionSemantics,
        default_configure_lambda: Option<NoopConfigureLambda>,
    ) -> Self {
        Self {
            receiver,
            simple_name,
            parameters,
            is_direct_access_only,
            semantics,
            default_configure_lambda,
        }
    }

    pub fn receiver(&self) -> &DataTypeRef {
        &self.receiver
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn parameters(&self) -> &[DataParameter] {
        &self.parameters
    }

    pub fn is_direct_access_only(&self) -> bool {
        self.is_direct_access_only
    }

    pub fn semantics(&self) -> &FunctionSemantics {
        &self.semantics
    }

    pub fn default_configure_lambda(&self) -> Option<&NoopConfigureLambda> {
        self.default_configure_lambda.as_ref()
    }
}

/// A constructor of `data_class`. Constructors are always pure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataConstructor {
    parameters: Vec<DataParameter>,
    data_class: FqName,
}

impl DataConstructor {
    pub(crate) fn new(parameters: Vec<DataParameter>, data_class: FqName) -> Self {
        Self {
            parameters,
            data_class,
        }
    }

    pub fn parameters(&self) -> &[DataParameter] {
        &self.parameters
    }

    pub fn data_class(&self) -> &FqName {
        &self.data_class
    }

    pub fn semantics(&self) -> FunctionSemantics {
        FunctionSemantics::Pure {
            returned_type: DataTypeRef::Name(self.data_class.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataTopLevelFunction {
    package_name: String,
    simple_name: String,
    parameters: Vec<DataParameter>,
    semantics: FunctionSemantics,
}

impl DataTopLevelFunction {
    pub(crate) fn new(
        package_name: String,
        simple_name: String,
        parameters: Vec<DataParameter>,
        semantics: FunctionSemantics,
    ) -> Self {
        Self {
            package_name,
            simple_name,
            parameters,
            semantics,
        }
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn fq_name(&self) -> FqName {
        FqName::new(&self.package_name, &self.simple_name)
    }

    pub fn parameters(&self) -> &[DataParameter] {
        &self.parameters
    }

    pub fn semantics(&self) -> &FunctionSemantics {
        &self.semantics
    }
}

/// Any function a resolved call can bind to.
#[derive(Debug, Clone, Serialize)]
pub enum SchemaFunction {
    Member(Rc<SchemaMemberFunction>),
    TopLevel(Rc<DataTopLevelFunction>),
    Constructor(Rc<DataConstructor>),
}

impl SchemaFunction {
    pub fn simple_name(&self) -> &str {
        match self {
            SchemaFunction::Member(f) => f.simple_name(),
            SchemaFunction::TopLevel(f) => f.simple_name(),
            SchemaFunction::Constructor(c) => c.data_class().simple_name(),
        }
    }

    pub fn semantics(&self) -> FunctionSemantics {
        match self {
            SchemaFunction::Member(f) => f.semantics().clone(),
            SchemaFunction::TopLevel(f) => f.semantics().clone(),
            SchemaFunction::Constructor(c) => c.semantics(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisSchema {
    top_level_receiver_type: Rc<DataClass>,
    data_class_types_by_fq_name: IndexMap<FqName, Rc<DataClass>>,
    external_functions_by_fq_name: IndexMap<FqName, Rc<DataTopLevelFunction>>,
    external_objects_by_fq_name: IndexMap<FqName, DataTypeRef>,
    default_imports: BTreeSet<FqName>,
}

impl AnalysisSchema {
    pub(crate) fn new(
        top_level_receiver_type: Rc<DataClass>,
        data_class_types_by_fq_name: IndexMap<FqName, Rc<DataClass>>,
        external_functions_by_fq_name: IndexMap<FqName, Rc<DataTopLevelFunction>>,
        external_objects_by_fq_name: IndexMap<FqName, DataTypeRef>,
        default_imports: BTreeSet<FqName>,
    ) -> Self {
        Self {
            top_level_receiver_type,
            data_class_types_by_fq_name,
            external_functions_by_fq_name,
            external_objects_by_fq_name,
            default_imports,
        }
    }

    pub fn top_level_receiver_type(&self) -> &Rc<DataClass> {
        &self.top_level_receiver_type
    }

    pub fn data_class_types_by_fq_name(&self) -> &IndexMap<FqName, Rc<DataClass>> {
        &self.data_class_types_by_fq_name
    }

    pub fn external_functions_by_fq_name(&self) -> &IndexMap<FqName, Rc<DataTopLevelFunction>> {
        &self.external_functions_by_fq_name
    }

    pub fn external_objects_by_fq_name(&self) -> &IndexMap<FqName, DataTypeRef> {
        &self.external_objects_by_fq_name
    }

    pub fn default_imports(&self) -> &BTreeSet<FqName> {
        &self.default_imports
    }

    pub fn class(&self, name: &FqName) -> Option<&Rc<DataClass>> {
        self.data_class_types_by_fq_name.get(name)
    }

    pub fn resolve_ref(&self, type_ref: &DataTypeRef) -> Option<DataType> {
        match type_ref {
            DataTypeRef::Constant(c) => Some(DataType::Constant(*c)),
            DataTypeRef::Null => Some(DataType::Null),
            DataTypeRef::Unit => Some(DataType::Unit),
            DataTypeRef::Name(name) => self.class(name).cloned().map(DataType::Class),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
