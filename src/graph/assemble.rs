//! Two-phase assembly of a frozen fact store into a `UnitGraph`.
//!
//! Phase one allocates an id for every known unit and every referenced name,
//! so no link ever has to wait for its target. Phase two fills in the links.

use std::collections::BTreeMap;
use tracing::debug;

use super::{
    Access, Annotation, CodeUnit, CodeUnitKind, Field, SupertypeArgument, TypeParameter, Unit,
    UnitGraph, UnitId,
};
use crate::import::{
    descriptor, AnnotationBuilder, FrozenRecord, MemberKey, UnitHeader, UnitKind, UnitOrigin,
    CONSTRUCTOR_NAME, STATIC_INITIALIZER_DESCRIPTOR, STATIC_INITIALIZER_NAME,
};

/// Build the unit graph of a completed import.
///
/// Names that are referenced but were never materialized become placeholder
/// units, or primitive units for primitive names.
pub fn assemble(record: &FrozenRecord) -> UnitGraph {
    let mut headers: BTreeMap<String, UnitHeader> = record
        .units()
        .into_iter()
        .map(|h| (h.name.clone(), h.clone()))
        .collect();
    for name in record.referenced_unit_names() {
        let name = descriptor::element_type_name(&name);
        if !name.is_empty() && !headers.contains_key(name) {
            headers.insert(name.to_string(), placeholder(name));
        }
    }

    let mut linker = Linker::default();
    let names: Vec<String> = headers.keys().cloned().collect();
    for header in headers.into_values() {
        linker.allocate(header);
    }
    let allocated = linker.graph.units.len();

    for name in &names {
        linker.link_unit(record, name);
    }
    for reference in record.all_cross_references() {
        let origin_unit = linker.link(&reference.record.origin.owner);
        let target_unit = linker.link(&reference.record.target.owner);
        linker.push_access(Access {
            kind: reference.kind,
            origin_unit,
            origin: reference.record.origin.clone(),
            target_unit,
            target: reference.record.target.clone(),
            line_number: reference.record.line_number,
        });
    }

    debug!(
        units = linker.graph.units.len(),
        late_placeholders = linker.graph.units.len() - allocated,
        accesses = linker.graph.accesses.len(),
        "assembled unit graph"
    );
    linker.finish()
}

fn placeholder(name: &str) -> UnitHeader {
    if descriptor::is_primitive(name) {
        UnitHeader::primitive(name)
    } else {
        UnitHeader::new(name, UnitKind::Class, UnitOrigin::Placeholder)
    }
}

#[derive(Default)]
struct Linker {
    graph: UnitGraph,
}

impl Linker {
    fn allocate(&mut self, header: UnitHeader) -> UnitId {
        let id = UnitId(self.graph.units.len());
        self.graph.ids.insert(header.name.clone(), id);
        self.graph.units.push(Unit {
            id,
            name: header.name,
            kind: header.kind,
            origin: header.origin,
            modifiers: header.modifiers,
            source: header.source,
            superclass: None,
            interfaces: Vec::new(),
            type_parameters: Vec::new(),
            generic_superclass: None,
            generic_interfaces: Vec::new(),
            supertype_arguments: Vec::new(),
            enclosing_unit: None,
            enclosing_member: None,
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            static_initializer: None,
        });
        id
    }

    /// Id of `name`, allocating a placeholder if phase one missed it.
    fn link(&mut self, name: &str) -> UnitId {
        let name = descriptor::element_type_name(name);
        match self.graph.ids.get(name) {
            Some(&id) => id,
            None => self.allocate(placeholder(name)),
        }
    }

    fn link_all<'a, I: IntoIterator<Item = &'a String>>(&mut self, names: I) -> Vec<UnitId> {
        names.into_iter().map(|n| self.link(n)).collect()
    }

    fn annotations<'a, I>(&mut self, annotations: I) -> Vec<Annotation>
    where
        I: IntoIterator<Item = &'a AnnotationBuilder>,
    {
        let mut sorted: Vec<&AnnotationBuilder> = annotations.into_iter().collect();
        sorted.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        sorted
            .into_iter()
            .map(|a| Annotation {
                type_id: self.link(&a.type_name),
                values: a.values.clone(),
            })
            .collect()
    }

    fn member_annotations(&mut self, record: &FrozenRecord, key: &MemberKey) -> Vec<Annotation> {
        self.annotations(record.member_annotations_for(key))
    }

    fn parameter_annotations(
        &mut self,
        parameters: &[Vec<AnnotationBuilder>],
    ) -> Vec<Vec<Annotation>> {
        parameters.iter().map(|p| self.annotations(p)).collect()
    }

    fn link_unit(&mut self, record: &FrozenRecord, owner: &str) {
        let Some(id) = self.graph.ids.get(owner).copied() else {
            return;
        };

        let superclass = record.superclass_for(owner).map(|s| self.link(s));
        let interfaces = self.link_all(record.interfaces_for(owner));
        let type_parameters = record
            .type_parameters_for(owner)
            .parameters
            .iter()
            .map(|p| TypeParameter {
                name: p.name.clone(),
                bounds: self.link_all(&p.bounds),
            })
            .collect();
        let mut supertype_arguments = Vec::new();
        for generic in record.generic_supertypes_for(owner) {
            let supertype = self.link(&generic.type_name);
            // The first name is the supertype itself
            for name in generic.referenced_type_names().into_iter().skip(1) {
                supertype_arguments.push(SupertypeArgument {
                    supertype,
                    type_id: self.link(name),
                });
            }
        }
        let enclosing_unit = record.enclosing_unit_for(owner).map(|o| self.link(o));
        let annotations = self.annotations(record.unit_annotations_for(owner));

        let mut field_builders: Vec<_> = record.fields_for(owner).collect();
        field_builders.sort_by(|a, b| (&a.name, &a.descriptor).cmp(&(&b.name, &b.descriptor)));
        let mut fields = Vec::with_capacity(field_builders.len());
        for field in field_builders {
            let key = MemberKey::new(owner, &field.name, &field.descriptor);
            fields.push(Field {
                type_id: self.link(&field.type_name),
                modifiers: field.modifiers.clone(),
                annotations: self.member_annotations(record, &key),
                key,
            });
        }

        let mut method_builders: Vec<_> = record.methods_for(owner).collect();
        method_builders.sort_by(|a, b| (&a.name, &a.descriptor).cmp(&(&b.name, &b.descriptor)));
        let mut methods = Vec::with_capacity(method_builders.len());
        for method in method_builders {
            let key = MemberKey::new(owner, &method.name, &method.descriptor);
            methods.push(CodeUnit {
                kind: CodeUnitKind::Method,
                return_type: Some(self.link(&method.return_type)),
                parameter_types: self.link_all(&method.parameter_types),
                modifiers: method.modifiers.clone(),
                annotations: self.member_annotations(record, &key),
                parameter_annotations: self.parameter_annotations(&method.parameter_annotations),
                default_value: record.annotation_default_value_for(&key).cloned(),
                key,
            });
        }

        let mut constructor_builders: Vec<_> = record.constructors_for(owner).collect();
        constructor_builders.sort_by(|a, b| a.descriptor.cmp(&b.descriptor));
        let mut constructors = Vec::with_capacity(constructor_builders.len());
        for constructor in constructor_builders {
            let key = MemberKey::new(owner, CONSTRUCTOR_NAME, &constructor.descriptor);
            constructors.push(CodeUnit {
                kind: CodeUnitKind::Constructor,
                return_type: None,
                parameter_types: self.link_all(&constructor.parameter_types),
                modifiers: constructor.modifiers.clone(),
                annotations: self.member_annotations(record, &key),
                parameter_annotations: self
                    .parameter_annotations(&constructor.parameter_annotations),
                default_value: None,
                key,
            });
        }

        let static_initializer = match record.static_initializer_for(owner) {
            Some(_) => {
                let key =
                    MemberKey::new(owner, STATIC_INITIALIZER_NAME, STATIC_INITIALIZER_DESCRIPTOR);
                Some(CodeUnit {
                    kind: CodeUnitKind::StaticInitializer,
                    return_type: None,
                    parameter_types: Vec::new(),
                    modifiers: Default::default(),
                    annotations: self.member_annotations(record, &key),
                    parameter_annotations: Vec::new(),
                    default_value: None,
                    key,
                })
            }
            None => None,
        };

        let unit = &mut self.graph.units[id.0];
        unit.superclass = superclass;
        unit.interfaces = interfaces;
        unit.type_parameters = type_parameters;
        unit.generic_superclass = record.generic_superclass_for(owner).cloned();
        unit.generic_interfaces = record
            .generic_interfaces_for(owner)
            .map(<[_]>::to_vec)
            .unwrap_or_default();
        unit.supertype_arguments = supertype_arguments;
        unit.enclosing_unit = enclosing_unit;
        unit.enclosing_member = record.enclosing_member_for(owner).cloned();
        unit.annotations = annotations;
        unit.fields = fields;
        unit.methods = methods;
        unit.constructors = constructors;
        unit.static_initializer = static_initializer;
    }

    fn push_access(&mut self, access: Access) {
        let index = self.graph.accesses.len();
        self.graph
            .accesses_from
            .entry(access.origin_unit)
            .or_default()
            .push(index);
        self.graph
            .accesses_to
            .entry(access.target_unit)
            .or_default()
            .push(index);
        self.graph.accesses.push(access);
    }

    fn finish(self) -> UnitGraph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{
        AccessKind, AccessRecord, AnnotationValue, FieldAccessType, FieldBuilder, ImportRecord,
        MethodBuilder, TypeParameterBuilder, TypeParametersBuilder,
    };

    fn scanned(name: &str) -> UnitHeader {
        UnitHeader::new(name, UnitKind::Class, UnitOrigin::Scanned)
    }

    #[test]
    fn test_ids_follow_name_order() {
        let mut record = ImportRecord::new();
        record.add_unit(scanned("b.Second"));
        record.add_unit(scanned("a.First"));
        record.set_superclass("b.Second", "c.Missing").unwrap();
        let graph = assemble(&record.freeze());

        let names: Vec<&str> = graph.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["a.First", "b.Second", "c.Missing"]);
        assert!(graph.unit("c.Missing").unwrap().is_placeholder());
        assert_eq!(
            graph.unit("b.Second").unwrap().superclass,
            graph.id_of("c.Missing")
        );
    }

    #[test]
    fn test_links_members_and_annotations() {
        let mut record = ImportRecord::new();
        record.add_unit(scanned("app.Order"));
        record.add_field("app.Order", FieldBuilder::new("items", "[Lapp/Item;", "app.Item[]"));
        let method = MethodBuilder::from_descriptor("total", "(I)J").unwrap();
        record.add_method("app.Order", method);
        record.add_unit_annotations(
            "app.Order",
            [AnnotationBuilder::new("app.Entity")
                .with_value("table", AnnotationValue::String("orders".to_string()))],
        );
        record.add_member_annotations(
            "app.Order",
            "items",
            "[Lapp/Item;",
            [AnnotationBuilder::new("app.Column")],
        );
        record.add_type_parameters(
            "app.Order",
            TypeParametersBuilder::new(vec![TypeParameterBuilder {
                name: "T".to_string(),
                bounds: vec!["app.Bound".to_string()],
            }]),
        );
        let graph = assemble(&record.freeze());

        let order = graph.unit("app.Order").unwrap();
        assert_eq!(graph.name_of(order.fields[0].type_id), "app.Item");
        assert_eq!(graph.name_of(order.fields[0].annotations[0].type_id), "app.Column");
        assert_eq!(graph.name_of(order.annotations[0].type_id), "app.Entity");
        assert_eq!(graph.name_of(order.type_parameters[0].bounds[0]), "app.Bound");

        let total = &order.methods[0];
        assert_eq!(graph.name_of(total.return_type.unwrap()), "long");
        assert_eq!(graph.unit("long").unwrap().origin, UnitOrigin::Primitive);
        assert_eq!(graph.unit("int").unwrap().kind, UnitKind::Primitive);
    }

    #[test]
    fn test_accesses_are_indexed_both_ways() {
        let mut record = ImportRecord::new();
        record.add_unit(scanned("a.Caller"));
        let origin = MemberKey::new("a.Caller", "run", "()V");
        let target = MemberKey::new("b.Callee", "value", "I");
        record.register_cross_reference(
            AccessKind::FieldAccess(FieldAccessType::Get),
            AccessRecord::new(origin, target, 3),
        );
        let graph = assemble(&record.freeze());

        let caller = graph.id_of("a.Caller").unwrap();
        let callee = graph.id_of("b.Callee").unwrap();
        assert_eq!(graph.accesses_from(caller).count(), 1);
        assert_eq!(graph.accesses_to(callee).count(), 1);
        assert_eq!(graph.accesses_from(callee).count(), 0);
        assert_eq!(graph.accesses()[0].target_unit, callee);
    }
}
