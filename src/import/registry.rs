//! Materialization of units outside the scanned set.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::builders::{UnitHeader, UnitOrigin};
use super::manifest::{self, UnitFacts};
use super::resolution::{DependencyResolutionProcess, Presence, UnitRegistry};
use super::{descriptor, ImportError, ImportRecord};

/// Fallback lookup for units that were not among the scanned artifacts.
pub trait UnitSource {
    fn lookup(&self, name: &str) -> Option<UnitFacts>;
}

/// A source that knows no units; everything it is asked for becomes a stub.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSource;

impl UnitSource for NoSource {
    fn lookup(&self, _name: &str) -> Option<UnitFacts> {
        None
    }
}

/// Units available for materialization, indexed by name.
#[derive(Debug, Default)]
pub struct ClasspathIndex {
    units: HashMap<String, (UnitFacts, Option<PathBuf>)>,
}

impl ClasspathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index units directly. Later entries with a known name are ignored.
    pub fn from_units<I: IntoIterator<Item = UnitFacts>>(units: I) -> Self {
        let mut index = Self::new();
        for unit in units {
            index.insert(unit, None);
        }
        index
    }

    /// Index every unit of the given manifest files.
    pub fn from_manifests(paths: &[PathBuf]) -> Result<Self, ImportError> {
        let mut index = Self::new();
        for (path, loaded) in manifest::load_manifests(paths) {
            for unit in loaded?.units {
                index.insert(unit, Some(path.clone()));
            }
        }
        debug!(units = index.len(), "indexed classpath manifests");
        Ok(index)
    }

    fn insert(&mut self, unit: UnitFacts, source: Option<PathBuf>) {
        if self.units.contains_key(&unit.name) {
            warn!(name = %unit.name, "unit defined twice on the classpath, keeping the first");
            return;
        }
        self.units.insert(unit.name.clone(), (unit, source));
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Manifest a unit was indexed from.
    pub fn source_of(&self, name: &str) -> Option<&Path> {
        self.units.get(name).and_then(|(_, path)| path.as_deref())
    }
}

impl UnitSource for ClasspathIndex {
    fn lookup(&self, name: &str) -> Option<UnitFacts> {
        self.units.get(name).map(|(facts, _)| facts.clone())
    }
}

/// `UnitRegistry` that materializes missing units into an `ImportRecord`.
///
/// Units found in the source are recorded with all their facts, registering
/// their references with the running resolution before returning. Primitive
/// names become primitive units; anything else becomes a bare stub.
pub struct UnitMaterializer<'a> {
    record: &'a mut ImportRecord,
    source: &'a dyn UnitSource,
    classpath: Option<&'a ClasspathIndex>,
}

impl<'a> UnitMaterializer<'a> {
    pub fn new(record: &'a mut ImportRecord, source: &'a dyn UnitSource) -> Self {
        Self {
            record,
            source,
            classpath: None,
        }
    }

    /// Materialize from a classpath index, remembering which manifest each unit came from.
    pub fn with_classpath(record: &'a mut ImportRecord, classpath: &'a ClasspathIndex) -> Self {
        Self {
            record,
            source: classpath,
            classpath: Some(classpath),
        }
    }
}

impl UnitRegistry for UnitMaterializer<'_> {
    type Error = ImportError;

    fn ensure_present(
        &mut self,
        name: &str,
        process: &mut DependencyResolutionProcess,
    ) -> Result<Presence, ImportError> {
        if self.record.contains_unit(name) {
            return Ok(Presence::AlreadyKnown);
        }

        if descriptor::is_primitive(name) {
            debug!(name, "materialized primitive");
            self.record.add_unit(UnitHeader::primitive(name));
            return Ok(Presence::HadToBeMaterialized);
        }

        match self.source.lookup(name) {
            Some(facts) => {
                let source = self.classpath.and_then(|c| c.source_of(name));
                debug!(name, "materialized from classpath");
                manifest::record_unit_facts(
                    facts,
                    UnitOrigin::Classpath,
                    source,
                    self.record,
                    process,
                )?;
            }
            None => {
                debug!(name, "materialized stub");
                self.record.add_unit(UnitHeader::stub(name));
            }
        }
        Ok(Presence::HadToBeMaterialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_with_superclass(name: &str, superclass: &str) -> UnitFacts {
        let mut facts = UnitFacts::named(name);
        facts.superclass = Some(superclass.to_string());
        facts
    }

    #[test]
    fn test_materializes_from_classpath() {
        let classpath = ClasspathIndex::from_units([
            unit_with_superclass("lib.Child", "lib.Parent"),
            UnitFacts::named("lib.Parent"),
        ]);
        let mut record = ImportRecord::new();
        let mut process = DependencyResolutionProcess::default();
        process.register_supertype("lib.Child");

        let summary = {
            let mut registry = UnitMaterializer::with_classpath(&mut record, &classpath);
            process.resolve(&mut registry).unwrap()
        };

        assert_eq!(summary.materialized, vec!["lib.Child", "lib.Parent"]);
        assert_eq!(record.unit("lib.Child").unwrap().origin, UnitOrigin::Classpath);
        assert_eq!(record.superclass_for("lib.Child"), Some("lib.Parent"));
    }

    #[test]
    fn test_unknown_names_become_stubs() {
        let mut record = ImportRecord::new();
        let mut process = DependencyResolutionProcess::default();
        let mut registry = UnitMaterializer::new(&mut record, &NoSource);

        let first = registry.ensure_present("x.Missing", &mut process).unwrap();
        let second = registry.ensure_present("x.Missing", &mut process).unwrap();
        let primitive = registry.ensure_present("int", &mut process).unwrap();

        assert_eq!(first, Presence::HadToBeMaterialized);
        assert_eq!(second, Presence::AlreadyKnown);
        assert_eq!(primitive, Presence::HadToBeMaterialized);
        assert_eq!(record.unit("x.Missing").unwrap().origin, UnitOrigin::Stub);
        assert_eq!(record.unit("int").unwrap().origin, UnitOrigin::Primitive);
    }

    #[test]
    fn test_classpath_keeps_first_definition() {
        let classpath = ClasspathIndex::from_units([
            unit_with_superclass("lib.A", "lib.First"),
            unit_with_superclass("lib.A", "lib.Second"),
        ]);
        assert_eq!(classpath.len(), 1);
        assert_eq!(
            classpath.lookup("lib.A").unwrap().superclass.as_deref(),
            Some("lib.First")
        );
        assert!(classpath.lookup("lib.B").is_none());
    }
}
