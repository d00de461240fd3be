//! Behavioral properties of the fact store and the resolution engine.
//!
//! These tests exercise the public API only, the way a decoder and a unit
//! registry would drive it.

use std::collections::{HashMap, HashSet};

use archgraph::import::manifest::FieldFacts;
use archgraph::import::{
    AccessKind, AccessRecord, AnnotationBuilder, AnnotationValue, ClasspathIndex,
    DependencyResolutionProcess, FieldAccessType, ImportError, ImportRecord, ImportSession,
    MemberKey, Presence, ResolutionLimits, UnitFacts, UnitOrigin, UnitRegistry,
};

/// Registry over a fixed graph of supertype and member type edges.
#[derive(Default)]
struct FixedRegistry {
    materialized: HashSet<String>,
    supertypes: HashMap<&'static str, &'static str>,
    member_types: HashMap<&'static str, &'static str>,
}

impl UnitRegistry for FixedRegistry {
    type Error = std::convert::Infallible;

    fn ensure_present(
        &mut self,
        name: &str,
        process: &mut DependencyResolutionProcess,
    ) -> Result<Presence, Self::Error> {
        if !self.materialized.insert(name.to_string()) {
            return Ok(Presence::AlreadyKnown);
        }
        if let Some(supertype) = self.supertypes.get(name) {
            process.register_supertype(supertype);
        }
        if let Some(member_type) = self.member_types.get(name) {
            process.register_member_type(member_type);
        }
        Ok(Presence::HadToBeMaterialized)
    }
}

#[test]
fn test_interfaces_keep_registration_order() {
    let mut record = ImportRecord::new();
    record.add_interfaces("a.Impl", ["a.Second", "a.First"]);
    record.add_interfaces("a.Impl", ["a.Third", "a.First"]);

    assert_eq!(
        record.interfaces_for("a.Impl"),
        ["a.Second", "a.First", "a.Third", "a.First"]
    );
}

#[test]
fn test_second_superclass_is_rejected() {
    let mut record = ImportRecord::new();
    record.set_superclass("a.Child", "a.Parent").unwrap();

    let err = record.set_superclass("a.Child", "a.Other").unwrap_err();
    assert!(matches!(err, ImportError::DuplicateSuperclass { .. }));
    assert!(err.is_internal_consistency());
    assert!(record.set_superclass("a.Child", "a.Parent").is_err());
    assert_eq!(record.superclass_for("a.Child"), Some("a.Parent"));
}

#[test]
fn test_second_static_initializer_is_rejected() {
    let mut record = ImportRecord::new();
    record
        .set_static_initializer("a.Config", Default::default())
        .unwrap();
    let err = record
        .set_static_initializer("a.Config", Default::default())
        .unwrap_err();
    assert!(matches!(err, ImportError::DuplicateStaticInitializer { .. }));
}

#[test]
fn test_identical_cross_references_collapse() {
    let mut record = ImportRecord::new();
    let call = || {
        AccessRecord::new(
            MemberKey::new("a.Caller", "run", "()V"),
            MemberKey::new("b.Callee", "go", "()V"),
            10,
        )
    };
    for _ in 0..3 {
        record.register_cross_reference(AccessKind::MethodCall, call());
    }
    let mut other_line = call();
    other_line.line_number = 11;
    record.register_cross_reference(AccessKind::MethodCall, other_line);
    record.register_cross_reference(AccessKind::MethodReference, call());
    record.register_cross_reference(
        AccessKind::FieldAccess(FieldAccessType::Get),
        AccessRecord::new(
            MemberKey::new("a.Caller", "run", "()V"),
            MemberKey::new("b.Callee", "value", "I"),
            10,
        ),
    );

    assert_eq!(record.all_cross_references().len(), 4);
}

#[test]
fn test_supertypes_resolve_to_fixed_point() {
    let mut registry = FixedRegistry::default();
    registry.supertypes.insert("A", "B");
    registry.supertypes.insert("B", "C");
    registry.supertypes.insert("C", "D");

    let limits = ResolutionLimits {
        max_passes_for_supertypes: Some(1),
        ..Default::default()
    };
    let mut process = DependencyResolutionProcess::new(limits);
    process.register_supertype("A");
    process.resolve(&mut registry).unwrap();

    // A bounded supertype limit stops at the first pass
    assert!(registry.materialized.contains("A"));
    assert!(!registry.materialized.contains("B"));

    let mut registry = FixedRegistry {
        supertypes: registry.supertypes.clone(),
        ..Default::default()
    };
    let mut process = DependencyResolutionProcess::default();
    process.register_supertype("A");
    let summary = process.resolve(&mut registry).unwrap();

    for name in ["A", "B", "C", "D"] {
        assert!(registry.materialized.contains(name), "{} missing", name);
    }
    assert_eq!(summary.materialized.len(), 4);
}

#[test]
fn test_member_types_are_not_chased() {
    let mut registry = FixedRegistry::default();
    registry.member_types.insert("X", "Y");

    let mut process = DependencyResolutionProcess::default();
    process.register_member_type("X");
    process.resolve(&mut registry).unwrap();

    assert!(registry.materialized.contains("X"));
    assert!(!registry.materialized.contains("Y"));
}

#[test]
fn test_foo_and_bar_reference_each_other() {
    let mut foo = UnitFacts::named("Foo");
    foo.superclass = Some("Bar".to_string());
    let mut bar = UnitFacts::named("Bar");
    bar.fields.push(FieldFacts {
        name: "foo".to_string(),
        descriptor: "LFoo;".to_string(),
        type_name: None,
        modifiers: Default::default(),
        annotations: Vec::new(),
    });

    // Bar is only known to the classpath, so resolving Foo's superclass pulls it in
    let classpath = ClasspathIndex::from_units([bar]);
    let mut session = ImportSession::with_classpath(ResolutionLimits::default(), classpath);
    session.record_unit(foo, UnitOrigin::Scanned, None).unwrap();
    session.resolve().unwrap();
    let (record, summary) = session.finish();

    assert_eq!(summary.materialized, vec!["Bar"]);
    assert!(record.contains_unit("Foo"));
    assert!(record.contains_unit("Bar"));
    assert_eq!(record.superclass_for("Foo"), Some("Bar"));
    assert_eq!(record.fields_for("Bar").count(), 1);

    let graph = archgraph::assemble(&record);
    let foo = graph.unit("Foo").unwrap();
    let bar = graph.unit("Bar").unwrap();
    assert_eq!(foo.superclass, Some(bar.id));
    assert_eq!(bar.fields[0].type_id, foo.id);
}

#[test]
fn test_nested_annotation_types_reach_fixed_point() {
    let mut foo = UnitFacts::named("app.Foo");
    foo.annotations.push(AnnotationBuilder::new("lib.Outer").with_value(
        "value",
        AnnotationValue::Annotation(Box::new(AnnotationBuilder::new("lib.Inner"))),
    ));
    let mut inner = UnitFacts::named("lib.Inner");
    inner.annotations.push(AnnotationBuilder::new("lib.Meta"));
    let classpath = ClasspathIndex::from_units([
        UnitFacts::named("lib.Outer"),
        inner,
        UnitFacts::named("lib.Meta"),
    ]);

    let mut session = ImportSession::with_classpath(ResolutionLimits::default(), classpath);
    session.record_unit(foo, UnitOrigin::Scanned, None).unwrap();
    session.resolve().unwrap();
    let (record, summary) = session.finish();

    // The nested annotation and its own annotation type come from the classpath
    assert_eq!(summary.materialized, vec!["lib.Inner", "lib.Outer", "lib.Meta"]);
    let graph = archgraph::assemble(&record);
    assert_eq!(graph.unit("lib.Inner").unwrap().origin, UnitOrigin::Classpath);
    assert_eq!(graph.unit("lib.Meta").unwrap().origin, UnitOrigin::Classpath);
}

#[test]
fn test_units_recorded_after_resolution_are_resolved() {
    let classpath = ClasspathIndex::from_units([UnitFacts::named("lib.X")]);
    let mut session = ImportSession::with_classpath(ResolutionLimits::default(), classpath);
    session
        .record_unit(UnitFacts::named("app.A"), UnitOrigin::Scanned, None)
        .unwrap();
    assert!(session.resolve().unwrap().materialized.is_empty());

    let mut b = UnitFacts::named("app.B");
    b.fields.push(FieldFacts {
        name: "x".to_string(),
        descriptor: "Llib/X;".to_string(),
        type_name: None,
        modifiers: Default::default(),
        annotations: Vec::new(),
    });
    session.record_unit(b, UnitOrigin::Scanned, None).unwrap();
    assert_eq!(session.resolve().unwrap().materialized, vec!["lib.X"]);

    let (record, summary) = session.finish();
    assert_eq!(record.unit("lib.X").unwrap().origin, UnitOrigin::Classpath);
    assert_eq!(summary.passes, 3);
}

#[test]
fn test_enclosing_unit_registration_is_idempotent() {
    let mut record = ImportRecord::new();
    record.register_enclosing_unit("Inner", "Outer").unwrap();
    record.register_enclosing_unit("Inner", "Outer").unwrap();

    let err = record
        .register_enclosing_unit("Inner", "OtherOuter")
        .unwrap_err();
    assert!(matches!(err, ImportError::ConflictingEnclosingUnit { .. }));
    assert_eq!(record.enclosing_unit_for("Inner"), Some("Outer"));
}

#[test]
fn test_empty_store_queries() {
    let record = ImportRecord::new().freeze();

    assert!(!record.contains_unit("Nothing"));
    assert_eq!(record.superclass_for("Nothing"), None);
    assert!(record.interfaces_for("Nothing").is_empty());
    assert!(record.type_parameters_for("Nothing").is_empty());
    assert_eq!(record.fields_for("Nothing").count(), 0);
    assert_eq!(record.methods_for("Nothing").count(), 0);
    assert_eq!(record.constructors_for("Nothing").count(), 0);
    assert!(record.static_initializer_for("Nothing").is_none());
    assert!(record.annotation_type_names_for("Nothing").is_empty());
    assert!(record.member_signature_type_names().is_empty());
    assert!(record.all_cross_references().is_empty());
    assert!(record.enclosing_unit_for("Nothing").is_none());
}
