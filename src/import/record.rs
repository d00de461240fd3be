//! Name-keyed fact store.
//!
//! `ImportRecord` accumulates every fact discovered about the units of one
//! import session. Facts are keyed by unit name or `MemberKey`, never by
//! reference, so a fact may mention a unit that has not been built yet.
//! Once accumulation is complete the record is frozen into a `FrozenRecord`,
//! which only exposes the read-only query API.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Deref;

use super::builders::{
    AnnotationBuilder, AnnotationValue, ConstructorBuilder, FieldBuilder, MemberBuilder,
    MethodBuilder, ParameterizedTypeBuilder, StaticInitializerBuilder, TypeParametersBuilder,
    UnitHeader, NO_TYPE_PARAMETERS,
};
use super::{AccessCategory, AccessKind, AccessRecord, CrossReference, ImportError, MemberKey};

/// Mutable accumulator of structural facts for one import session.
#[derive(Debug, Default)]
pub struct ImportRecord {
    units: HashMap<String, UnitHeader>,

    superclass_names_by_owner: HashMap<String, String>,
    interface_names_by_owner: HashMap<String, Vec<String>>,
    type_parameters_by_owner: HashMap<String, TypeParametersBuilder>,
    generic_superclass_by_owner: HashMap<String, ParameterizedTypeBuilder>,
    generic_interfaces_by_owner: HashMap<String, Vec<ParameterizedTypeBuilder>>,
    fields_by_owner: HashMap<String, HashSet<FieldBuilder>>,
    methods_by_owner: HashMap<String, HashSet<MethodBuilder>>,
    constructors_by_owner: HashMap<String, HashSet<ConstructorBuilder>>,
    static_initializers_by_owner: HashMap<String, StaticInitializerBuilder>,
    unit_annotations: HashMap<String, HashSet<AnnotationBuilder>>,
    member_annotations: HashMap<MemberKey, HashSet<AnnotationBuilder>>,
    annotation_defaults: HashMap<MemberKey, AnnotationValue>,
    enclosing: EnclosingDeclarations,

    cross_references: HashMap<AccessCategory, HashSet<CrossReference>>,
}

impl ImportRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit's identity. Returns `false` if the name was already known.
    pub fn add_unit(&mut self, header: UnitHeader) -> bool {
        if self.units.contains_key(&header.name) {
            return false;
        }
        self.units.insert(header.name.clone(), header);
        true
    }

    pub fn set_superclass(&mut self, owner: &str, superclass: &str) -> Result<(), ImportError> {
        if let Some(existing) = self.superclass_names_by_owner.get(owner) {
            return Err(ImportError::DuplicateSuperclass {
                owner: owner.to_string(),
                existing: existing.clone(),
                attempted: superclass.to_string(),
            });
        }
        self.superclass_names_by_owner
            .insert(owner.to_string(), superclass.to_string());
        Ok(())
    }

    /// Append interfaces in declaration order.
    pub fn add_interfaces<I, S>(&mut self, owner: &str, interfaces: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interface_names_by_owner
            .entry(owner.to_string())
            .or_default()
            .extend(interfaces.into_iter().map(Into::into));
    }

    pub fn add_type_parameters(&mut self, owner: &str, type_parameters: TypeParametersBuilder) {
        self.type_parameters_by_owner
            .insert(owner.to_string(), type_parameters);
    }

    pub fn add_generic_superclass(&mut self, owner: &str, superclass: ParameterizedTypeBuilder) {
        self.generic_superclass_by_owner
            .insert(owner.to_string(), superclass);
    }

    pub fn add_generic_interfaces(
        &mut self,
        owner: &str,
        interfaces: Vec<ParameterizedTypeBuilder>,
    ) {
        self.generic_interfaces_by_owner
            .insert(owner.to_string(), interfaces);
    }

    pub fn add_field(&mut self, owner: &str, field: FieldBuilder) {
        self.fields_by_owner
            .entry(owner.to_string())
            .or_default()
            .insert(field);
    }

    pub fn add_method(&mut self, owner: &str, method: MethodBuilder) {
        self.methods_by_owner
            .entry(owner.to_string())
            .or_default()
            .insert(method);
    }

    pub fn add_constructor(&mut self, owner: &str, constructor: ConstructorBuilder) {
        self.constructors_by_owner
            .entry(owner.to_string())
            .or_default()
            .insert(constructor);
    }

    pub fn set_static_initializer(
        &mut self,
        owner: &str,
        initializer: StaticInitializerBuilder,
    ) -> Result<(), ImportError> {
        if self.static_initializers_by_owner.contains_key(owner) {
            return Err(ImportError::DuplicateStaticInitializer {
                owner: owner.to_string(),
            });
        }
        self.static_initializers_by_owner
            .insert(owner.to_string(), initializer);
        Ok(())
    }

    pub fn add_unit_annotations<I>(&mut self, owner: &str, annotations: I)
    where
        I: IntoIterator<Item = AnnotationBuilder>,
    {
        self.unit_annotations
            .entry(owner.to_string())
            .or_default()
            .extend(annotations);
    }

    pub fn add_member_annotations<I>(
        &mut self,
        owner: &str,
        member_name: &str,
        descriptor: &str,
        annotations: I,
    ) where
        I: IntoIterator<Item = AnnotationBuilder>,
    {
        self.member_annotations
            .entry(MemberKey::new(owner, member_name, descriptor))
            .or_default()
            .extend(annotations);
    }

    pub fn add_annotation_default_value(
        &mut self,
        owner: &str,
        method_name: &str,
        descriptor: &str,
        value: AnnotationValue,
    ) {
        self.annotation_defaults
            .insert(MemberKey::new(owner, method_name, descriptor), value);
    }

    pub fn register_enclosing_unit(&mut self, inner: &str, outer: &str) -> Result<(), ImportError> {
        self.enclosing.register_unit(inner, outer)
    }

    pub fn register_enclosing_member(
        &mut self,
        inner: &str,
        member: MemberKey,
    ) -> Result<(), ImportError> {
        self.enclosing.register_member(inner, member)
    }

    /// Record a cross-reference. Identical records collapse into one.
    pub fn register_cross_reference(&mut self, kind: AccessKind, record: AccessRecord) {
        self.cross_references
            .entry(kind.category())
            .or_default()
            .insert(CrossReference::new(kind, record));
    }

    /// Declare accumulation complete.
    pub fn freeze(self) -> FrozenRecord {
        FrozenRecord(self)
    }

    // Queries

    pub fn contains_unit(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn unit(&self, name: &str) -> Option<&UnitHeader> {
        self.units.get(name)
    }

    /// All unit headers, sorted by name.
    pub fn units(&self) -> Vec<&UnitHeader> {
        let mut units: Vec<_> = self.units.values().collect();
        units.sort_by(|a, b| a.name.cmp(&b.name));
        units
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn superclass_for(&self, owner: &str) -> Option<&str> {
        self.superclass_names_by_owner.get(owner).map(String::as_str)
    }

    pub fn interfaces_for(&self, owner: &str) -> &[String] {
        self.interface_names_by_owner
            .get(owner)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn type_parameters_for(&self, owner: &str) -> &TypeParametersBuilder {
        self.type_parameters_by_owner
            .get(owner)
            .unwrap_or(&NO_TYPE_PARAMETERS)
    }

    pub fn generic_superclass_for(&self, owner: &str) -> Option<&ParameterizedTypeBuilder> {
        self.generic_superclass_by_owner.get(owner)
    }

    pub fn generic_interfaces_for(&self, owner: &str) -> Option<&[ParameterizedTypeBuilder]> {
        self.generic_interfaces_by_owner
            .get(owner)
            .map(Vec::as_slice)
    }

    pub fn fields_for(&self, owner: &str) -> impl Iterator<Item = &FieldBuilder> {
        self.fields_by_owner.get(owner).into_iter().flatten()
    }

    pub fn methods_for(&self, owner: &str) -> impl Iterator<Item = &MethodBuilder> {
        self.methods_by_owner.get(owner).into_iter().flatten()
    }

    pub fn constructors_for(&self, owner: &str) -> impl Iterator<Item = &ConstructorBuilder> {
        self.constructors_by_owner.get(owner).into_iter().flatten()
    }

    pub fn static_initializer_for(&self, owner: &str) -> Option<&StaticInitializerBuilder> {
        self.static_initializers_by_owner.get(owner)
    }

    pub fn unit_annotations_for(&self, owner: &str) -> impl Iterator<Item = &AnnotationBuilder> {
        self.unit_annotations.get(owner).into_iter().flatten()
    }

    pub fn member_annotations_for(
        &self,
        member: &MemberKey,
    ) -> impl Iterator<Item = &AnnotationBuilder> {
        self.member_annotations.get(member).into_iter().flatten()
    }

    pub fn annotation_default_value_for(&self, method: &MemberKey) -> Option<&AnnotationValue> {
        self.annotation_defaults.get(method)
    }

    pub fn enclosing_unit_for(&self, inner: &str) -> Option<&str> {
        self.enclosing.unit_for(inner)
    }

    pub fn enclosing_member_for(&self, inner: &str) -> Option<&MemberKey> {
        self.enclosing.member_for(inner)
    }

    /// Keys of every member declared by `owner`, including the static initializer.
    pub fn member_keys_for(&self, owner: &str) -> Vec<MemberKey> {
        let mut keys: Vec<MemberKey> = Vec::new();
        keys.extend(self.fields_for(owner).map(|m| member_key(owner, m)));
        keys.extend(self.methods_for(owner).map(|m| member_key(owner, m)));
        keys.extend(self.constructors_for(owner).map(|m| member_key(owner, m)));
        keys.extend(self.static_initializer_for(owner).map(|m| member_key(owner, m)));
        keys
    }

    /// Annotation type names applied to `owner` itself.
    pub fn unit_annotation_type_names_for(&self, owner: &str) -> BTreeSet<String> {
        self.unit_annotations_for(owner)
            .map(|a| a.type_name.clone())
            .collect()
    }

    /// Annotation type names applied to any member of `owner`.
    pub fn member_annotation_type_names_for(&self, owner: &str) -> BTreeSet<String> {
        self.member_keys_for(owner)
            .iter()
            .flat_map(|key| self.member_annotations_for(key))
            .map(|a| a.type_name.clone())
            .collect()
    }

    /// Annotation type names applied to any method or constructor parameter of `owner`.
    pub fn parameter_annotation_type_names_for(&self, owner: &str) -> BTreeSet<String> {
        let method_parameters = self
            .methods_for(owner)
            .flat_map(|m| m.parameter_annotations.iter());
        let constructor_parameters = self
            .constructors_for(owner)
            .flat_map(|c| c.parameter_annotations.iter());
        method_parameters
            .chain(constructor_parameters)
            .flatten()
            .map(|a| a.type_name.clone())
            .collect()
    }

    /// Annotation types nested in the annotation values and defaults of `owner`.
    pub fn nested_annotation_type_names_for(&self, owner: &str) -> BTreeSet<String> {
        let member_keys = self.member_keys_for(owner);
        let parameter_annotations = self
            .methods_for(owner)
            .flat_map(|m| m.parameter_annotations.iter())
            .chain(
                self.constructors_for(owner)
                    .flat_map(|c| c.parameter_annotations.iter()),
            )
            .flatten();
        let applied = self
            .unit_annotations_for(owner)
            .chain(member_keys.iter().flat_map(|key| self.member_annotations_for(key)))
            .chain(parameter_annotations);
        let defaults = member_keys
            .iter()
            .filter_map(|key| self.annotation_default_value_for(key));
        applied
            .flat_map(|a| a.values.values())
            .chain(defaults)
            .flat_map(AnnotationValue::nested_annotation_type_names)
            .map(str::to_string)
            .collect()
    }

    /// Generic superclass followed by the generic interfaces of `owner`.
    pub fn generic_supertypes_for(
        &self,
        owner: &str,
    ) -> impl Iterator<Item = &ParameterizedTypeBuilder> {
        self.generic_superclass_for(owner)
            .into_iter()
            .chain(self.generic_interfaces_for(owner).into_iter().flatten())
    }

    /// Union of all annotation type names referenced by `owner` at unit, member or parameter level.
    pub fn annotation_type_names_for(&self, owner: &str) -> BTreeSet<String> {
        let mut names = self.unit_annotation_type_names_for(owner);
        names.extend(self.member_annotation_type_names_for(owner));
        names.extend(self.parameter_annotation_type_names_for(owner));
        names
    }

    /// All distinct type names appearing in member signatures across the store.
    pub fn member_signature_type_names(&self) -> BTreeSet<String> {
        let fields = self.fields_by_owner.values().flatten().map(|f| f.signature_type_names());
        let methods = self.methods_by_owner.values().flatten().map(|m| m.signature_type_names());
        let constructors = self
            .constructors_by_owner
            .values()
            .flatten()
            .map(|c| c.signature_type_names());
        fields
            .chain(methods)
            .chain(constructors)
            .flatten()
            .map(str::to_string)
            .collect()
    }

    pub fn all_superclass_names(&self) -> BTreeSet<String> {
        self.superclass_names_by_owner.values().cloned().collect()
    }

    pub fn all_interface_names(&self) -> BTreeSet<String> {
        self.interface_names_by_owner
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    /// Cross-references of a single category.
    pub fn cross_references(
        &self,
        category: AccessCategory,
    ) -> impl Iterator<Item = &CrossReference> {
        self.cross_references.get(&category).into_iter().flatten()
    }

    /// Every cross-reference of any kind.
    pub fn all_cross_references(&self) -> BTreeSet<&CrossReference> {
        self.cross_references.values().flatten().collect()
    }

    /// Names of every unit mentioned by any fact, whether or not it is known.
    pub fn referenced_unit_names(&self) -> BTreeSet<String> {
        let mut names = self.all_superclass_names();
        names.extend(self.all_interface_names());
        names.extend(self.member_signature_type_names());
        for owner in self.units.keys() {
            names.extend(self.annotation_type_names_for(owner));
            names.extend(self.nested_annotation_type_names_for(owner));
            for parameter in &self.type_parameters_for(owner).parameters {
                names.extend(parameter.bounds.iter().cloned());
            }
            for generic in self.generic_supertypes_for(owner) {
                names.extend(generic.referenced_type_names().into_iter().map(str::to_string));
            }
        }
        names.extend(self.enclosing.units.values().cloned());
        for reference in self.all_cross_references() {
            names.insert(reference.record.target.owner.clone());
            names.insert(reference.record.origin.owner.clone());
        }
        names
    }
}

fn member_key<M: MemberBuilder + ?Sized>(owner: &str, member: &M) -> MemberKey {
    MemberKey::new(owner, member.name(), member.descriptor())
}

/// Enclosing unit and member per inner unit.
#[derive(Debug, Default)]
struct EnclosingDeclarations {
    units: HashMap<String, String>,
    members: HashMap<String, MemberKey>,
}

impl EnclosingDeclarations {
    fn register_unit(&mut self, inner: &str, outer: &str) -> Result<(), ImportError> {
        match self.units.get(inner) {
            Some(existing) if existing == outer => Ok(()),
            Some(existing) => Err(ImportError::ConflictingEnclosingUnit {
                inner: inner.to_string(),
                existing: existing.clone(),
                attempted: outer.to_string(),
            }),
            None => {
                self.units.insert(inner.to_string(), outer.to_string());
                Ok(())
            }
        }
    }

    fn register_member(&mut self, inner: &str, member: MemberKey) -> Result<(), ImportError> {
        match self.members.get(inner) {
            Some(existing) if *existing == member => Ok(()),
            Some(existing) => Err(ImportError::ConflictingEnclosingMember {
                inner: inner.to_string(),
                existing: existing.clone(),
                attempted: member,
            }),
            None => {
                self.members.insert(inner.to_string(), member);
                Ok(())
            }
        }
    }

    fn unit_for(&self, inner: &str) -> Option<&str> {
        self.units.get(inner).map(String::as_str)
    }

    fn member_for(&self, inner: &str) -> Option<&MemberKey> {
        self.members.get(inner)
    }
}

/// Read-only view of a completed `ImportRecord`, handed to assembly.
#[derive(Debug)]
pub struct FrozenRecord(ImportRecord);

impl Deref for FrozenRecord {
    type Target = ImportRecord;

    fn deref(&self) -> &ImportRecord {
        &self.0
    }
}
