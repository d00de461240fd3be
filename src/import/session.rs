//! Lifecycle of one import: accumulate, resolve, freeze.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::builders::UnitOrigin;
use super::manifest::{self, UnitFacts};
use super::registry::{ClasspathIndex, UnitMaterializer};
use super::resolution::{DependencyResolutionProcess, ResolutionLimits, ResolutionSummary};
use super::{FrozenRecord, ImportError, ImportRecord};

/// Owns the fact store and resolution engine of a single import.
///
/// Sessions share nothing; importing several code bases concurrently means
/// creating one session each.
#[derive(Debug)]
pub struct ImportSession {
    record: ImportRecord,
    process: DependencyResolutionProcess,
    classpath: ClasspathIndex,
    summary: ResolutionSummary,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new(ResolutionLimits::default())
    }
}

impl ImportSession {
    pub fn new(limits: ResolutionLimits) -> Self {
        Self::with_classpath(limits, ClasspathIndex::new())
    }

    /// Create a session that materializes unresolved names from `classpath`.
    pub fn with_classpath(limits: ResolutionLimits, classpath: ClasspathIndex) -> Self {
        Self {
            record: ImportRecord::new(),
            process: DependencyResolutionProcess::new(limits),
            classpath,
            summary: ResolutionSummary::default(),
        }
    }

    /// Record a decoded unit. A second unit with a known name is skipped.
    pub fn record_unit(
        &mut self,
        facts: UnitFacts,
        origin: UnitOrigin,
        source: Option<&Path>,
    ) -> Result<bool, ImportError> {
        let name = facts.name.clone();
        let recorded =
            manifest::record_unit_facts(facts, origin, source, &mut self.record, &mut self.process)?;
        if !recorded {
            warn!(
                name = %name,
                source = ?source,
                "unit already imported, keeping the first definition"
            );
        }
        Ok(recorded)
    }

    /// Record every unit of the given manifests as scanned units.
    ///
    /// Manifests are parsed in parallel, then recorded one by one in the
    /// order of `paths`. Returns the number of units recorded.
    pub fn record_manifests(&mut self, paths: &[PathBuf]) -> Result<usize, ImportError> {
        let mut recorded = 0;
        for (path, loaded) in manifest::load_manifests(paths) {
            for unit in loaded?.units {
                if self.record_unit(unit, UnitOrigin::Scanned, Some(&path))? {
                    recorded += 1;
                }
            }
        }
        info!(manifests = paths.len(), units = recorded, "recorded scanned units");
        Ok(recorded)
    }

    pub fn record(&self) -> &ImportRecord {
        &self.record
    }

    /// Direct access to the fact store, for decoders that register facts one by one.
    pub fn record_mut(&mut self) -> &mut ImportRecord {
        &mut self.record
    }

    pub fn dependencies_mut(&mut self) -> &mut DependencyResolutionProcess {
        &mut self.process
    }

    /// Resolve every registered name against the classpath.
    pub fn resolve(&mut self) -> Result<&ResolutionSummary, ImportError> {
        let mut registry = UnitMaterializer::with_classpath(&mut self.record, &self.classpath);
        let summary = self.process.resolve(&mut registry)?;
        self.summary.merge(summary);
        Ok(&self.summary)
    }

    /// Declare accumulation complete.
    pub fn finish(self) -> (FrozenRecord, ResolutionSummary) {
        (self.record.freeze(), self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::manifest::FieldFacts;

    fn field(name: &str, descriptor: &str) -> FieldFacts {
        FieldFacts {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            type_name: None,
            modifiers: Default::default(),
            annotations: Vec::new(),
        }
    }

    fn foo() -> UnitFacts {
        let mut facts = UnitFacts::named("Foo");
        facts.superclass = Some("Bar".to_string());
        facts
    }

    fn bar() -> UnitFacts {
        let mut facts = UnitFacts::named("Bar");
        facts.fields.push(field("foo", "LFoo;"));
        facts
    }

    #[test]
    fn test_mutually_referencing_units() {
        let mut session = ImportSession::default();
        session.record_unit(foo(), UnitOrigin::Scanned, None).unwrap();
        session.record_unit(bar(), UnitOrigin::Scanned, None).unwrap();

        let summary = session.resolve().unwrap().clone();
        assert!(summary.materialized.is_empty());

        let (record, _) = session.finish();
        assert!(record.contains_unit("Foo"));
        assert!(record.contains_unit("Bar"));
        assert_eq!(record.superclass_for("Foo"), Some("Bar"));
        assert_eq!(record.fields_for("Bar").next().unwrap().type_name, "Foo");
    }

    #[test]
    fn test_cycle_through_classpath() {
        let classpath = ClasspathIndex::from_units([bar()]);
        let mut session = ImportSession::with_classpath(ResolutionLimits::default(), classpath);
        session.record_unit(foo(), UnitOrigin::Scanned, None).unwrap();

        session.resolve().unwrap();
        let (record, summary) = session.finish();

        assert_eq!(summary.materialized, vec!["Bar"]);
        assert_eq!(record.unit("Foo").unwrap().origin, UnitOrigin::Scanned);
        assert_eq!(record.unit("Bar").unwrap().origin, UnitOrigin::Classpath);
    }

    #[test]
    fn test_duplicate_unit_keeps_first() {
        let mut session = ImportSession::default();
        assert!(session.record_unit(foo(), UnitOrigin::Scanned, None).unwrap());

        let mut other = UnitFacts::named("Foo");
        other.superclass = Some("Other".to_string());
        assert!(!session.record_unit(other, UnitOrigin::Scanned, None).unwrap());

        assert_eq!(session.record().superclass_for("Foo"), Some("Bar"));
    }

    #[test]
    fn test_manual_registration_through_session() {
        let mut session = ImportSession::default();
        session.dependencies_mut().register_supertype("lib.Base");
        session
            .record_mut()
            .register_enclosing_unit("Outer$Inner", "Outer")
            .unwrap();

        session.resolve().unwrap();
        let (record, summary) = session.finish();

        assert_eq!(summary.materialized, vec!["lib.Base"]);
        assert_eq!(record.unit("lib.Base").unwrap().origin, UnitOrigin::Stub);
        assert_eq!(record.enclosing_unit_for("Outer$Inner"), Some("Outer"));
    }
}
