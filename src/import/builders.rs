//! Value-typed fact records.
//!
//! Each builder describes one structural fact about a unit or member using
//! names only. Builders are compared by value so that set-valued facts
//! absorb duplicates coming from redundant decoder output.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use super::descriptor;

/// Member name used for constructors.
pub const CONSTRUCTOR_NAME: &str = "<init>";
/// Member name used for static initializers.
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";
/// Descriptor of every static initializer.
pub const STATIC_INITIALIZER_DESCRIPTOR: &str = "()V";

/// Access and property flags of units and members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Abstract,
    Synchronized,
    Native,
    Transient,
    Volatile,
    Synthetic,
    Bridge,
}

/// Kind of a class-like unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    #[default]
    Class,
    Interface,
    Enum,
    Annotation,
    Primitive,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Class => "class",
            UnitKind::Interface => "interface",
            UnitKind::Enum => "enum",
            UnitKind::Annotation => "annotation",
            UnitKind::Primitive => "primitive",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a unit entered the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOrigin {
    /// Declared by one of the scanned artifacts.
    Scanned,
    /// Materialized from the classpath index during resolution.
    Classpath,
    /// A primitive type.
    Primitive,
    /// Materialized during resolution without any known facts.
    Stub,
    /// Referenced but never resolved; created by assembly.
    Placeholder,
}

impl UnitOrigin {
    pub const ALL: [UnitOrigin; 5] = [
        UnitOrigin::Scanned,
        UnitOrigin::Classpath,
        UnitOrigin::Primitive,
        UnitOrigin::Stub,
        UnitOrigin::Placeholder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOrigin::Scanned => "scanned",
            UnitOrigin::Classpath => "classpath",
            UnitOrigin::Primitive => "primitive",
            UnitOrigin::Stub => "stub",
            UnitOrigin::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for UnitOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a unit known to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitHeader {
    pub name: String,
    pub kind: UnitKind,
    pub modifiers: BTreeSet<Modifier>,
    pub origin: UnitOrigin,
    /// Manifest the unit was read from, if any.
    pub source: Option<PathBuf>,
}

impl UnitHeader {
    pub fn new(name: impl Into<String>, kind: UnitKind, origin: UnitOrigin) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: BTreeSet::new(),
            origin,
            source: None,
        }
    }

    pub fn stub(name: impl Into<String>) -> Self {
        Self::new(name, UnitKind::Class, UnitOrigin::Stub)
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        Self::new(name, UnitKind::Primitive, UnitOrigin::Primitive)
    }
}

/// A declared type parameter, e.g. `T extends Comparable`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeParameterBuilder {
    pub name: String,
    #[serde(default)]
    pub bounds: Vec<String>,
}

/// All type parameters of a unit, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeParametersBuilder {
    pub parameters: Vec<TypeParameterBuilder>,
}

/// Returned for units that declare no type parameters.
pub static NO_TYPE_PARAMETERS: TypeParametersBuilder = TypeParametersBuilder {
    parameters: Vec::new(),
};

impl TypeParametersBuilder {
    pub fn new(parameters: Vec<TypeParameterBuilder>) -> Self {
        Self { parameters }
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// A type argument inside a parameterized type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeArgument {
    Concrete(ParameterizedTypeBuilder),
    Variable(String),
    Wildcard {
        #[serde(default)]
        upper_bounds: Vec<ParameterizedTypeBuilder>,
        #[serde(default)]
        lower_bounds: Vec<ParameterizedTypeBuilder>,
    },
}

/// A possibly parameterized type reference, e.g. `List<? extends Foo>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterizedTypeBuilder {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub arguments: Vec<TypeArgument>,
}

impl ParameterizedTypeBuilder {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            arguments: Vec::new(),
        }
    }

    /// All concrete type names referenced by this type and its arguments.
    pub fn referenced_type_names(&self) -> Vec<&str> {
        let mut names = vec![self.type_name.as_str()];
        for argument in &self.arguments {
            match argument {
                TypeArgument::Concrete(t) => names.extend(t.referenced_type_names()),
                TypeArgument::Variable(_) => {}
                TypeArgument::Wildcard {
                    upper_bounds,
                    lower_bounds,
                } => {
                    for bound in upper_bounds.iter().chain(lower_bounds) {
                        names.extend(bound.referenced_type_names());
                    }
                }
            }
        }
        names
    }
}

/// A value inside an annotation, or an annotation method's default value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationValue {
    String(String),
    Int(i64),
    Bool(bool),
    Char(char),
    Class(String),
    Enum {
        #[serde(rename = "type")]
        type_name: String,
        constant: String,
    },
    Annotation(Box<AnnotationBuilder>),
    Array(Vec<AnnotationValue>),
}

impl AnnotationValue {
    fn collect_type_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            AnnotationValue::Class(name) => names.push(name),
            AnnotationValue::Enum { type_name, .. } => names.push(type_name),
            AnnotationValue::Annotation(annotation) => {
                names.push(&annotation.type_name);
                for value in annotation.values.values() {
                    value.collect_type_names(names);
                }
            }
            AnnotationValue::Array(values) => {
                for value in values {
                    value.collect_type_names(names);
                }
            }
            AnnotationValue::String(_)
            | AnnotationValue::Int(_)
            | AnnotationValue::Bool(_)
            | AnnotationValue::Char(_) => {}
        }
    }

    /// Type names referenced by class, enum or nested annotation values.
    pub fn referenced_type_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_type_names(&mut names);
        names
    }

    /// Types of the annotations nested anywhere inside this value.
    pub fn nested_annotation_type_names(&self) -> Vec<&str> {
        match self {
            AnnotationValue::Annotation(annotation) => annotation.annotation_type_names(),
            AnnotationValue::Array(values) => values
                .iter()
                .flat_map(AnnotationValue::nested_annotation_type_names)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// An annotation applied to a unit, member or parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationBuilder {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub values: BTreeMap<String, AnnotationValue>,
}

impl AnnotationBuilder {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: AnnotationValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// This annotation's type, then every annotation type nested in its values.
    pub fn annotation_type_names(&self) -> Vec<&str> {
        let mut names = vec![self.type_name.as_str()];
        for value in self.values.values() {
            names.extend(value.nested_annotation_type_names());
        }
        names
    }
}

/// Common view over field, method, constructor and static initializer builders.
pub trait MemberBuilder {
    fn name(&self) -> &str;
    fn descriptor(&self) -> &str;

    /// Type names appearing in the member's signature.
    fn signature_type_names(&self) -> Vec<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldBuilder {
    pub name: String,
    pub descriptor: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub modifiers: BTreeSet<Modifier>,
}

impl FieldBuilder {
    pub fn new(
        name: impl Into<String>,
        descriptor: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            type_name: type_name.into(),
            modifiers: BTreeSet::new(),
        }
    }
}

impl MemberBuilder for FieldBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn signature_type_names(&self) -> Vec<&str> {
        vec![&self.type_name]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodBuilder {
    pub name: String,
    pub descriptor: String,
    pub return_type: String,
    #[serde(default)]
    pub parameter_types: Vec<String>,
    #[serde(default)]
    pub modifiers: BTreeSet<Modifier>,
    /// Annotations per parameter position.
    #[serde(default)]
    pub parameter_annotations: Vec<Vec<AnnotationBuilder>>,
}

impl MethodBuilder {
    /// Create a method builder, deriving signature types from the descriptor.
    pub fn from_descriptor(name: impl Into<String>, descriptor: impl Into<String>) -> Option<Self> {
        let descriptor = descriptor.into();
        let (parameter_types, return_type) = descriptor::method_types(&descriptor)?;
        Some(Self {
            name: name.into(),
            descriptor,
            return_type,
            parameter_types,
            modifiers: BTreeSet::new(),
            parameter_annotations: Vec::new(),
        })
    }
}

impl MemberBuilder for MethodBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn signature_type_names(&self) -> Vec<&str> {
        let mut names = vec![self.return_type.as_str()];
        names.extend(self.parameter_types.iter().map(String::as_str));
        names
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstructorBuilder {
    pub descriptor: String,
    #[serde(default)]
    pub parameter_types: Vec<String>,
    #[serde(default)]
    pub modifiers: BTreeSet<Modifier>,
    #[serde(default)]
    pub parameter_annotations: Vec<Vec<AnnotationBuilder>>,
}

impl ConstructorBuilder {
    pub fn from_descriptor(descriptor: impl Into<String>) -> Option<Self> {
        let descriptor = descriptor.into();
        let (parameter_types, _) = descriptor::method_types(&descriptor)?;
        Some(Self {
            descriptor,
            parameter_types,
            modifiers: BTreeSet::new(),
            parameter_annotations: Vec::new(),
        })
    }
}

impl MemberBuilder for ConstructorBuilder {
    fn name(&self) -> &str {
        CONSTRUCTOR_NAME
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn signature_type_names(&self) -> Vec<&str> {
        self.parameter_types.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StaticInitializerBuilder;

impl MemberBuilder for StaticInitializerBuilder {
    fn name(&self) -> &str {
        STATIC_INITIALIZER_NAME
    }

    fn descriptor(&self) -> &str {
        STATIC_INITIALIZER_DESCRIPTOR
    }

    fn signature_type_names(&self) -> Vec<&str> {
        Vec::new()
    }
}
