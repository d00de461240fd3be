//! Assembled unit graph.
//!
//! `UnitGraph` is an arena of `Unit`s addressed by `UnitId`. Every link
//! between units (supertypes, member types, annotations, accesses) is an id,
//! so cyclic class graphs need no shared ownership.

mod assemble;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::ops::Index;
use std::path::PathBuf;

use crate::import::{
    AccessKind, AnnotationValue, MemberKey, Modifier, ParameterizedTypeBuilder, UnitKind,
    UnitOrigin,
};

pub use assemble::assemble;

/// Index of a unit in its `UnitGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(usize);

impl UnitId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub type_id: UnitId,
    pub values: BTreeMap<String, AnnotationValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeParameter {
    pub name: String,
    pub bounds: Vec<UnitId>,
}

/// A type used inside the type arguments of a generic supertype.
#[derive(Debug, Clone, Serialize)]
pub struct SupertypeArgument {
    pub supertype: UnitId,
    pub type_id: UnitId,
}

#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub key: MemberKey,
    pub type_id: UnitId,
    pub modifiers: BTreeSet<Modifier>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeUnitKind {
    Method,
    Constructor,
    StaticInitializer,
}

/// A method, constructor or static initializer.
#[derive(Debug, Clone, Serialize)]
pub struct CodeUnit {
    pub key: MemberKey,
    pub kind: CodeUnitKind,
    /// `None` for constructors and static initializers.
    pub return_type: Option<UnitId>,
    pub parameter_types: Vec<UnitId>,
    pub modifiers: BTreeSet<Modifier>,
    pub annotations: Vec<Annotation>,
    pub parameter_annotations: Vec<Vec<Annotation>>,
    /// Default value, for methods of annotation types.
    pub default_value: Option<AnnotationValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Access {
    pub kind: AccessKind,
    pub origin_unit: UnitId,
    pub origin: MemberKey,
    pub target_unit: UnitId,
    pub target: MemberKey,
    pub line_number: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub kind: UnitKind,
    pub origin: UnitOrigin,
    pub modifiers: BTreeSet<Modifier>,
    pub source: Option<PathBuf>,
    pub superclass: Option<UnitId>,
    pub interfaces: Vec<UnitId>,
    pub type_parameters: Vec<TypeParameter>,
    pub generic_superclass: Option<ParameterizedTypeBuilder>,
    pub generic_interfaces: Vec<ParameterizedTypeBuilder>,
    pub supertype_arguments: Vec<SupertypeArgument>,
    pub enclosing_unit: Option<UnitId>,
    pub enclosing_member: Option<MemberKey>,
    pub annotations: Vec<Annotation>,
    pub fields: Vec<Field>,
    pub methods: Vec<CodeUnit>,
    pub constructors: Vec<CodeUnit>,
    pub static_initializer: Option<CodeUnit>,
}

impl Unit {
    /// Methods, constructors and the static initializer.
    pub fn code_units(&self) -> impl Iterator<Item = &CodeUnit> {
        self.methods
            .iter()
            .chain(&self.constructors)
            .chain(&self.static_initializer)
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin == UnitOrigin::Placeholder
    }
}

/// How one unit depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Extends,
    Implements,
    TypeParameterBound,
    SupertypeArgument,
    FieldType,
    ParameterType,
    ReturnType,
    AnnotatedWith,
    Access(AccessKind),
}

/// A single dependency of one unit onto another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Dependency {
    pub origin: UnitId,
    pub target: UnitId,
    pub kind: DependencyKind,
    /// Member the dependency is declared on, if any.
    pub member: Option<MemberKey>,
    /// Accessed member, for dependencies by access.
    pub target_member: Option<MemberKey>,
    pub line_number: Option<u32>,
    pub description: String,
}

/// Arena of assembled units.
#[derive(Debug, Default)]
pub struct UnitGraph {
    units: Vec<Unit>,
    ids: HashMap<String, UnitId>,
    accesses: Vec<Access>,
    accesses_from: HashMap<UnitId, Vec<usize>>,
    accesses_to: HashMap<UnitId, Vec<usize>>,
}

impl UnitGraph {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn id_of(&self, name: &str) -> Option<UnitId> {
        self.ids.get(name).copied()
    }

    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.id_of(name).map(|id| self.get(id))
    }

    pub fn get(&self, id: UnitId) -> &Unit {
        &self.units[id.0]
    }

    pub fn name_of(&self, id: UnitId) -> &str {
        &self.get(id).name
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn accesses(&self) -> &[Access] {
        &self.accesses
    }

    pub fn accesses_from(&self, id: UnitId) -> impl Iterator<Item = &Access> {
        self.indexed_accesses(self.accesses_from.get(&id))
    }

    pub fn accesses_to(&self, id: UnitId) -> impl Iterator<Item = &Access> {
        self.indexed_accesses(self.accesses_to.get(&id))
    }

    fn indexed_accesses<'a>(
        &'a self,
        indices: Option<&'a Vec<usize>>,
    ) -> impl Iterator<Item = &'a Access> {
        indices
            .into_iter()
            .flatten()
            .map(move |&i| &self.accesses[i])
    }

    pub fn units_by_origin(&self, origin: UnitOrigin) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.origin == origin)
    }

    /// Superclass, its superclass and so on. Stops if the chain loops.
    pub fn superclass_chain(&self, id: UnitId) -> Vec<UnitId> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut current = self.get(id).superclass;
        while let Some(next) = current {
            if !visited.insert(next) {
                break;
            }
            chain.push(next);
            current = self.get(next).superclass;
        }
        chain
    }

    /// Every transitive superclass and interface, breadth first.
    pub fn all_supertypes(&self, id: UnitId) -> Vec<UnitId> {
        let mut result = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            let unit = self.get(current);
            for &next in unit.superclass.iter().chain(&unit.interfaces) {
                if visited.insert(next) {
                    result.push(next);
                    queue.push_back(next);
                }
            }
        }
        result
    }

    /// Dependencies of a unit onto other units, sorted and without duplicates.
    ///
    /// Dependencies onto the unit itself and onto primitives are left out.
    pub fn dependencies_from(&self, id: UnitId) -> Vec<Dependency> {
        let unit = self.get(id);
        let mut found = BTreeSet::new();
        let mut add = |target: UnitId,
                       kind: DependencyKind,
                       member: Option<&MemberKey>,
                       access: Option<&Access>,
                       description: String| {
            let target_unit = self.get(target);
            if target == id || target_unit.kind == UnitKind::Primitive {
                return;
            }
            found.insert(Dependency {
                origin: id,
                target,
                kind,
                member: member.cloned(),
                target_member: access.map(|a| a.target.clone()),
                line_number: access.map(|a| a.line_number),
                description,
            });
        };

        if let Some(superclass) = unit.superclass {
            add(
                superclass,
                DependencyKind::Extends,
                None,
                None,
                format!("Class <{}> extends class <{}>", unit.name, self.name_of(superclass)),
            );
        }
        for &interface in &unit.interfaces {
            add(
                interface,
                DependencyKind::Implements,
                None,
                None,
                format!("Class <{}> implements interface <{}>", unit.name, self.name_of(interface)),
            );
        }
        for parameter in &unit.type_parameters {
            for &bound in &parameter.bounds {
                add(
                    bound,
                    DependencyKind::TypeParameterBound,
                    None,
                    None,
                    format!(
                        "Class <{}> has type parameter {} depending on <{}>",
                        unit.name,
                        parameter.name,
                        self.name_of(bound)
                    ),
                );
            }
        }
        for argument in &unit.supertype_arguments {
            add(
                argument.type_id,
                DependencyKind::SupertypeArgument,
                None,
                None,
                format!(
                    "Class <{}> has generic supertype <{}> with type argument depending on <{}>",
                    unit.name,
                    self.name_of(argument.supertype),
                    self.name_of(argument.type_id)
                ),
            );
        }
        for annotation in &unit.annotations {
            add(
                annotation.type_id,
                DependencyKind::AnnotatedWith,
                None,
                None,
                format!(
                    "Class <{}> is annotated with <{}>",
                    unit.name,
                    self.name_of(annotation.type_id)
                ),
            );
        }

        for field in &unit.fields {
            add(
                field.type_id,
                DependencyKind::FieldType,
                Some(&field.key),
                None,
                format!("Field <{}> has type <{}>", field.key, self.name_of(field.type_id)),
            );
            for annotation in &field.annotations {
                add(
                    annotation.type_id,
                    DependencyKind::AnnotatedWith,
                    Some(&field.key),
                    None,
                    format!(
                        "Field <{}> is annotated with <{}>",
                        field.key,
                        self.name_of(annotation.type_id)
                    ),
                );
            }
        }

        for code_unit in unit.code_units() {
            if let Some(return_type) = code_unit.return_type {
                add(
                    return_type,
                    DependencyKind::ReturnType,
                    Some(&code_unit.key),
                    None,
                    format!(
                        "Method <{}> has return type <{}>",
                        code_unit.key,
                        self.name_of(return_type)
                    ),
                );
            }
            for &parameter in &code_unit.parameter_types {
                add(
                    parameter,
                    DependencyKind::ParameterType,
                    Some(&code_unit.key),
                    None,
                    format!(
                        "{} <{}> has parameter of type <{}>",
                        code_unit_label(code_unit.kind),
                        code_unit.key,
                        self.name_of(parameter)
                    ),
                );
            }
            let parameter_annotations = code_unit.parameter_annotations.iter().flatten();
            for annotation in code_unit.annotations.iter().chain(parameter_annotations) {
                add(
                    annotation.type_id,
                    DependencyKind::AnnotatedWith,
                    Some(&code_unit.key),
                    None,
                    format!(
                        "{} <{}> is annotated with <{}>",
                        code_unit_label(code_unit.kind),
                        code_unit.key,
                        self.name_of(annotation.type_id)
                    ),
                );
            }
        }

        for access in self.accesses_from(id) {
            add(
                access.target_unit,
                DependencyKind::Access(access.kind),
                Some(&access.origin),
                Some(access),
                format!(
                    "<{}> {} <{}> in line {}",
                    access.origin,
                    access.kind.verb(),
                    access.target,
                    access.line_number
                ),
            );
        }

        found.into_iter().collect()
    }
}

fn code_unit_label(kind: CodeUnitKind) -> &'static str {
    match kind {
        CodeUnitKind::Method => "Method",
        CodeUnitKind::Constructor => "Constructor",
        CodeUnitKind::StaticInitializer => "Static initializer",
    }
}

impl Index<UnitId> for UnitGraph {
    type Output = Unit;

    fn index(&self, id: UnitId) -> &Unit {
        self.get(id)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
