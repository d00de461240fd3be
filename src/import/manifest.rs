//! Fact manifests: the decoder's output format.
//!
//! A manifest lists decoded units together with their structural facts. It
//! can be written as YAML or JSON. `record_unit_facts` feeds one decoded unit
//! into an `ImportRecord` and registers every unit name it references with
//! the `DependencyResolutionProcess`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::builders::{
    AnnotationBuilder, AnnotationValue, ConstructorBuilder, FieldBuilder, MethodBuilder, Modifier,
    ParameterizedTypeBuilder, StaticInitializerBuilder, TypeParametersBuilder, UnitHeader,
    UnitKind, UnitOrigin,
};
use super::{
    descriptor, AccessCategory, AccessKind, AccessRecord, DependencyResolutionProcess,
    FieldAccessType, ImportError, ImportRecord, MemberKey,
};

/// File extensions recognized as fact manifests.
pub const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Top-level manifest document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FactManifest {
    #[serde(default)]
    pub units: Vec<UnitFacts>,
}

/// Everything a decoder found out about a single unit.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnitFacts {
    pub name: String,
    #[serde(default)]
    pub kind: UnitKind,
    #[serde(default)]
    pub modifiers: BTreeSet<Modifier>,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub type_parameters: TypeParametersBuilder,
    #[serde(default)]
    pub generic_superclass: Option<ParameterizedTypeBuilder>,
    #[serde(default)]
    pub generic_interfaces: Option<Vec<ParameterizedTypeBuilder>>,
    #[serde(default)]
    pub enclosing_unit: Option<String>,
    #[serde(default)]
    pub enclosing_member: Option<MemberKey>,
    #[serde(default)]
    pub annotations: Vec<AnnotationBuilder>,
    #[serde(default)]
    pub fields: Vec<FieldFacts>,
    #[serde(default)]
    pub methods: Vec<MethodFacts>,
    #[serde(default)]
    pub constructors: Vec<ConstructorFacts>,
    #[serde(default)]
    pub static_initializer: Option<StaticInitializerFacts>,
    #[serde(default)]
    pub accesses: Vec<AccessFacts>,
}

impl UnitFacts {
    /// Facts for a unit that declares nothing but its name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: UnitKind::Class,
            modifiers: BTreeSet::new(),
            superclass: None,
            interfaces: Vec::new(),
            type_parameters: TypeParametersBuilder::default(),
            generic_superclass: None,
            generic_interfaces: None,
            enclosing_unit: None,
            enclosing_member: None,
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            static_initializer: None,
            accesses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldFacts {
    pub name: String,
    pub descriptor: String,
    /// Derived from the descriptor when absent.
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub modifiers: BTreeSet<Modifier>,
    #[serde(default)]
    pub annotations: Vec<AnnotationBuilder>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MethodFacts {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub parameter_types: Option<Vec<String>>,
    #[serde(default)]
    pub modifiers: BTreeSet<Modifier>,
    #[serde(default)]
    pub annotations: Vec<AnnotationBuilder>,
    #[serde(default)]
    pub parameter_annotations: Vec<Vec<AnnotationBuilder>>,
    /// Default value of an annotation type's method.
    #[serde(default)]
    pub default_value: Option<AnnotationValue>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConstructorFacts {
    pub descriptor: String,
    #[serde(default)]
    pub parameter_types: Option<Vec<String>>,
    #[serde(default)]
    pub modifiers: BTreeSet<Modifier>,
    #[serde(default)]
    pub annotations: Vec<AnnotationBuilder>,
    #[serde(default)]
    pub parameter_annotations: Vec<Vec<AnnotationBuilder>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StaticInitializerFacts {
    #[serde(default)]
    pub annotations: Vec<AnnotationBuilder>,
}

/// Code unit of the declaring unit a cross-reference originates from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginFacts {
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessFacts {
    pub kind: AccessCategory,
    /// Only meaningful for field accesses.
    #[serde(default)]
    pub access_type: FieldAccessType,
    pub origin: OriginFacts,
    pub target: MemberKey,
    #[serde(default)]
    pub line: u32,
}

fn invalid_descriptor(owner: &str, name: &str, descriptor: &str) -> ImportError {
    ImportError::InvalidDescriptor {
        member: MemberKey::new(owner, name, descriptor),
    }
}

impl FieldFacts {
    fn to_builder(&self, owner: &str) -> Result<FieldBuilder, ImportError> {
        let type_name = match &self.type_name {
            Some(t) => t.clone(),
            None => descriptor::type_name(&self.descriptor)
                .ok_or_else(|| invalid_descriptor(owner, &self.name, &self.descriptor))?,
        };
        Ok(FieldBuilder {
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
            type_name,
            modifiers: self.modifiers.clone(),
        })
    }
}

impl MethodFacts {
    fn to_builder(&self, owner: &str) -> Result<MethodBuilder, ImportError> {
        let (parameter_types, return_type) = match (&self.parameter_types, &self.return_type) {
            (Some(params), Some(ret)) => (params.clone(), ret.clone()),
            _ => {
                let (params, ret) = descriptor::method_types(&self.descriptor)
                    .ok_or_else(|| invalid_descriptor(owner, &self.name, &self.descriptor))?;
                (
                    self.parameter_types.clone().unwrap_or(params),
                    self.return_type.clone().unwrap_or(ret),
                )
            }
        };
        Ok(MethodBuilder {
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
            return_type,
            parameter_types,
            modifiers: self.modifiers.clone(),
            parameter_annotations: self.parameter_annotations.clone(),
        })
    }
}

impl ConstructorFacts {
    fn to_builder(&self, owner: &str) -> Result<ConstructorBuilder, ImportError> {
        let parameter_types = match &self.parameter_types {
            Some(params) => params.clone(),
            None => {
                descriptor::method_types(&self.descriptor)
                    .ok_or_else(|| {
                        invalid_descriptor(owner, super::CONSTRUCTOR_NAME, &self.descriptor)
                    })?
                    .0
            }
        };
        Ok(ConstructorBuilder {
            descriptor: self.descriptor.clone(),
            parameter_types,
            modifiers: self.modifiers.clone(),
            parameter_annotations: self.parameter_annotations.clone(),
        })
    }
}

/// Applied annotation types, including annotations nested in their values.
fn annotation_type_names(annotations: &[AnnotationBuilder]) -> impl Iterator<Item = &str> {
    annotations
        .iter()
        .flat_map(AnnotationBuilder::annotation_type_names)
}

fn parameter_annotation_type_names(
    parameters: &[Vec<AnnotationBuilder>],
) -> impl Iterator<Item = &str> {
    parameters
        .iter()
        .flatten()
        .flat_map(AnnotationBuilder::annotation_type_names)
}

/// Record one decoded unit.
///
/// Returns `Ok(false)` without touching the store if a unit of the same name
/// is already known.
pub fn record_unit_facts(
    facts: UnitFacts,
    origin: UnitOrigin,
    source: Option<&Path>,
    record: &mut ImportRecord,
    process: &mut DependencyResolutionProcess,
) -> Result<bool, ImportError> {
    let owner = facts.name.as_str();
    if record.contains_unit(owner) {
        return Ok(false);
    }

    // Convert members first so an invalid descriptor leaves the store untouched
    let fields = facts
        .fields
        .iter()
        .map(|f| f.to_builder(owner))
        .collect::<Result<Vec<_>, _>>()?;
    let methods = facts
        .methods
        .iter()
        .map(|m| m.to_builder(owner))
        .collect::<Result<Vec<_>, _>>()?;
    let constructors = facts
        .constructors
        .iter()
        .map(|c| c.to_builder(owner))
        .collect::<Result<Vec<_>, _>>()?;

    let mut header = UnitHeader::new(owner, facts.kind, origin);
    header.modifiers = facts.modifiers.clone();
    header.source = source.map(Path::to_path_buf);
    record.add_unit(header);

    if let Some(superclass) = &facts.superclass {
        record.set_superclass(owner, superclass)?;
        process.register_supertype(superclass);
    }
    if !facts.interfaces.is_empty() {
        record.add_interfaces(owner, facts.interfaces.iter().cloned());
        process.register_supertypes(&facts.interfaces);
    }
    if !facts.type_parameters.is_empty() {
        record.add_type_parameters(owner, facts.type_parameters.clone());
    }
    if let Some(generic_superclass) = &facts.generic_superclass {
        record.add_generic_superclass(owner, generic_superclass.clone());
    }
    if let Some(generic_interfaces) = &facts.generic_interfaces {
        record.add_generic_interfaces(owner, generic_interfaces.clone());
    }
    if let Some(outer) = &facts.enclosing_unit {
        record.register_enclosing_unit(owner, outer)?;
    }
    if let Some(member) = &facts.enclosing_member {
        record.register_enclosing_member(owner, member.clone())?;
    }

    process.register_annotation_types(annotation_type_names(&facts.annotations));
    record.add_unit_annotations(owner, facts.annotations.iter().cloned());

    for (field, field_facts) in fields.into_iter().zip(&facts.fields) {
        process.register_member_type(&field.type_name);
        process.register_annotation_types(annotation_type_names(&field_facts.annotations));
        record.add_member_annotations(
            owner,
            &field.name,
            &field.descriptor,
            field_facts.annotations.iter().cloned(),
        );
        record.add_field(owner, field);
    }

    for (method, method_facts) in methods.into_iter().zip(&facts.methods) {
        process.register_member_type(&method.return_type);
        process.register_member_types(&method.parameter_types);
        process.register_annotation_types(annotation_type_names(&method_facts.annotations));
        process.register_annotation_types(parameter_annotation_type_names(
            &method_facts.parameter_annotations,
        ));
        record.add_member_annotations(
            owner,
            &method.name,
            &method.descriptor,
            method_facts.annotations.iter().cloned(),
        );
        if let Some(default_value) = &method_facts.default_value {
            process.register_annotation_types(default_value.nested_annotation_type_names());
            record.add_annotation_default_value(
                owner,
                &method.name,
                &method.descriptor,
                default_value.clone(),
            );
        }
        record.add_method(owner, method);
    }

    for (constructor, constructor_facts) in constructors.into_iter().zip(&facts.constructors) {
        process.register_member_types(&constructor.parameter_types);
        process.register_annotation_types(annotation_type_names(&constructor_facts.annotations));
        process.register_annotation_types(parameter_annotation_type_names(
            &constructor_facts.parameter_annotations,
        ));
        record.add_member_annotations(
            owner,
            super::CONSTRUCTOR_NAME,
            &constructor.descriptor,
            constructor_facts.annotations.iter().cloned(),
        );
        record.add_constructor(owner, constructor);
    }

    if let Some(initializer) = &facts.static_initializer {
        record.set_static_initializer(owner, StaticInitializerBuilder)?;
        process.register_annotation_types(annotation_type_names(&initializer.annotations));
        record.add_member_annotations(
            owner,
            super::STATIC_INITIALIZER_NAME,
            super::STATIC_INITIALIZER_DESCRIPTOR,
            initializer.annotations.iter().cloned(),
        );
    }

    for access in &facts.accesses {
        let origin = MemberKey::new(owner, &access.origin.name, &access.origin.descriptor);
        let kind = AccessKind::from_category(access.kind, access.access_type);
        process.register_accessed_type(&access.target.owner);
        record.register_cross_reference(
            kind,
            AccessRecord::new(origin, access.target.clone(), access.line),
        );
    }

    Ok(true)
}

/// Whether `path` has a manifest extension.
pub fn is_manifest_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| MANIFEST_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Parse manifest content, choosing the format from the file extension.
pub fn parse_manifest(path: &Path, content: &str) -> Result<FactManifest, ImportError> {
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let parsed = if is_json {
        serde_json::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| ImportError::Manifest {
        path: path.to_path_buf(),
        message,
    })
}

/// Read and parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<FactManifest, ImportError> {
    let content = fs::read_to_string(path)?;
    parse_manifest(path, &content)
}

/// Load many manifests in parallel. Results keep the order of `paths`.
pub fn load_manifests(paths: &[PathBuf]) -> Vec<(PathBuf, Result<FactManifest, ImportError>)> {
    paths
        .par_iter()
        .map(|path| (path.clone(), load_manifest(path)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::builders::MemberBuilder;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
units:
  - name: com.example.Foo
    kind: class
    modifiers: [public]
    superclass: com.example.Base
    interfaces: [com.example.Api, java.io.Serializable]
    annotations:
      - type: com.example.Service
        values:
          name: { string: "foo" }
    fields:
      - name: bar
        descriptor: Lcom/example/Bar;
        annotations:
          - type: com.example.Inject
    methods:
      - name: find
        descriptor: (Ljava/lang/String;)Lcom/example/Result;
        parameter_annotations:
          - - type: com.example.NotNull
    constructors:
      - descriptor: ()V
    static_initializer: {}
    accesses:
      - kind: method_call
        origin: { name: find, descriptor: (Ljava/lang/String;)Lcom/example/Result; }
        target: { owner: com.example.Repo, name: load, descriptor: ()V }
        line: 12
      - kind: field_access
        access_type: set
        origin: { name: <init>, descriptor: ()V }
        target: { owner: com.example.Foo, name: bar, descriptor: Lcom/example/Bar; }
        line: 5
"#;

    fn record_manifest(content: &str) -> (ImportRecord, DependencyResolutionProcess) {
        let manifest = parse_manifest(Path::new("facts.yaml"), content).unwrap();
        let mut record = ImportRecord::new();
        let mut process = DependencyResolutionProcess::default();
        for unit in manifest.units {
            record_unit_facts(unit, UnitOrigin::Scanned, None, &mut record, &mut process).unwrap();
        }
        (record, process)
    }

    #[test]
    fn test_record_unit_facts() {
        let (record, _) = record_manifest(MANIFEST);
        let owner = "com.example.Foo";

        assert!(record.contains_unit(owner));
        assert_eq!(record.superclass_for(owner), Some("com.example.Base"));
        assert_eq!(
            record.interfaces_for(owner),
            &["com.example.Api", "java.io.Serializable"]
        );

        let field = record.fields_for(owner).next().unwrap();
        assert_eq!(field.type_name, "com.example.Bar");

        let method = record.methods_for(owner).next().unwrap();
        assert_eq!(method.return_type, "com.example.Result");
        assert_eq!(method.parameter_types, vec!["java.lang.String"]);
        assert_eq!(method.name(), "find");

        assert!(record.static_initializer_for(owner).is_some());
        assert_eq!(record.all_cross_references().len(), 2);

        let annotations: Vec<_> = record.annotation_type_names_for(owner).into_iter().collect();
        assert_eq!(
            annotations,
            vec!["com.example.Inject", "com.example.NotNull", "com.example.Service"]
        );
    }

    #[test]
    fn test_registers_reference_names() {
        let (_, process) = record_manifest(MANIFEST);
        let pending: Vec<_> = process.run().pending().iter().map(String::as_str).collect();

        for expected in [
            "com.example.Base",
            "com.example.Api",
            "com.example.Service",
            "com.example.Bar",
            "com.example.Inject",
            "com.example.Result",
            "java.lang.String",
            "com.example.NotNull",
            "com.example.Repo",
            "com.example.Foo",
        ] {
            assert!(pending.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_registers_nested_annotation_types() {
        let manifest = r#"
units:
  - name: app.Foo
    annotations:
      - type: lib.Outer
        values:
          value: { annotation: { type: lib.Inner } }
          extra: { array: [{ annotation: { type: lib.Listed } }, { class: lib.NotChased }] }
    methods:
      - name: mode
        descriptor: ()Lapp/Mode;
        default_value: { annotation: { type: lib.Default } }
"#;
        let (_, process) = record_manifest(manifest);
        let pending = process.run().pending();

        for expected in ["lib.Outer", "lib.Inner", "lib.Listed", "lib.Default"] {
            assert!(pending.contains(expected), "missing {}", expected);
        }
        assert!(!pending.contains("lib.NotChased"));
    }

    #[test]
    fn test_known_unit_is_skipped() {
        let (mut record, mut process) = record_manifest(MANIFEST);
        let mut again = UnitFacts::named("com.example.Foo");
        again.superclass = Some("com.example.Other".to_string());

        let recorded =
            record_unit_facts(again, UnitOrigin::Scanned, None, &mut record, &mut process).unwrap();
        assert!(!recorded);
        assert_eq!(record.superclass_for("com.example.Foo"), Some("com.example.Base"));
    }

    #[test]
    fn test_invalid_descriptor_is_rejected() {
        let manifest = r#"
units:
  - name: com.example.Broken
    fields:
      - name: x
        descriptor: Lcom/Missing
"#;
        let manifest = parse_manifest(Path::new("broken.yaml"), manifest).unwrap();
        let mut record = ImportRecord::new();
        let mut process = DependencyResolutionProcess::default();
        let unit = manifest.units.into_iter().next().unwrap();

        let err = record_unit_facts(unit, UnitOrigin::Scanned, None, &mut record, &mut process)
            .unwrap_err();
        assert!(matches!(err, ImportError::InvalidDescriptor { .. }));
        assert!(!record.contains_unit("com.example.Broken"));
    }

    #[test]
    fn test_json_manifest() {
        let json = r#"{"units": [{"name": "a.B", "kind": "interface", "interfaces": ["a.C"]}]}"#;
        let manifest = parse_manifest(Path::new("facts.json"), json).unwrap();
        assert_eq!(manifest.units.len(), 1);
        assert_eq!(manifest.units[0].kind, UnitKind::Interface);
    }

    #[test]
    fn test_malformed_manifest() {
        let err = parse_manifest(Path::new("bad.yaml"), "units: [ {kind: class} ]").unwrap_err();
        assert!(matches!(err, ImportError::Manifest { .. }));
    }

    #[test]
    fn test_load_manifests_keeps_order() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("b.yaml");
        let second = temp.path().join("a.json");
        fs::write(&first, "units:\n  - name: b.First\n").unwrap();
        fs::write(&second, r#"{"units": [{"name": "a.Second"}]}"#).unwrap();

        let loaded = load_manifests(&[first.clone(), second.clone()]);
        assert_eq!(loaded[0].0, first);
        assert_eq!(loaded[1].0, second);
        assert_eq!(loaded[0].1.as_ref().unwrap().units[0].name, "b.First");
        assert_eq!(loaded[1].1.as_ref().unwrap().units[0].name, "a.Second");

        assert!(is_manifest_path(&first));
        assert!(!is_manifest_path(Path::new("Foo.class")));
    }
}
