//! Dependency resolution engine.
//!
//! Guarantees that every unit name referenced by the model is materialized by
//! a `UnitRegistry`. Resolution runs in passes: each pass drains the names
//! registered so far and asks the registry to ensure each one is present.
//! Materializing a unit registers further names, which are picked up by the
//! next pass as long as their category's pass limit has not been exceeded.
//!
//! Member types and accessed types default to a limit of one pass: only the
//! names known before resolution starts are resolved, not the member types of
//! the units that resolution pulls in. Supertypes and annotation types are
//! unlimited and resolve to a full transitive fixed point.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, trace};

use super::descriptor;

/// Category of a registered reference name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyCategory {
    /// Type of a field, parameter or return value.
    MemberType,
    /// Owner of the target of a field access, call or reference.
    AccessedType,
    /// Superclass or interface.
    Supertype,
    /// Type of an annotation.
    AnnotationType,
}

impl DependencyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyCategory::MemberType => "member type",
            DependencyCategory::AccessedType => "accessed type",
            DependencyCategory::Supertype => "supertype",
            DependencyCategory::AnnotationType => "annotation type",
        }
    }
}

impl fmt::Display for DependencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maximum number of passes per category. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionLimits {
    #[serde(default = "default_shallow_limit")]
    pub max_passes_for_member_types: Option<u32>,
    #[serde(default = "default_shallow_limit")]
    pub max_passes_for_accessed_types: Option<u32>,
    #[serde(default)]
    pub max_passes_for_supertypes: Option<u32>,
    #[serde(default)]
    pub max_passes_for_annotation_types: Option<u32>,
}

fn default_shallow_limit() -> Option<u32> {
    Some(1)
}

impl Default for ResolutionLimits {
    fn default() -> Self {
        Self {
            max_passes_for_member_types: default_shallow_limit(),
            max_passes_for_accessed_types: default_shallow_limit(),
            max_passes_for_supertypes: None,
            max_passes_for_annotation_types: None,
        }
    }
}

impl ResolutionLimits {
    pub fn limit_for(&self, category: DependencyCategory) -> Option<u32> {
        match category {
            DependencyCategory::MemberType => self.max_passes_for_member_types,
            DependencyCategory::AccessedType => self.max_passes_for_accessed_types,
            DependencyCategory::Supertype => self.max_passes_for_supertypes,
            DependencyCategory::AnnotationType => self.max_passes_for_annotation_types,
        }
    }
}

/// Answer of a registry asked to ensure a unit is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    AlreadyKnown,
    HadToBeMaterialized,
}

/// Materializes units by name.
///
/// Implementations must be idempotent: once a name has been materialized,
/// later calls report `AlreadyKnown`. Any facts and reference names produced
/// while materializing must be registered synchronously, through `process`,
/// before `ensure_present` returns.
pub trait UnitRegistry {
    type Error;

    fn ensure_present(
        &mut self,
        name: &str,
        process: &mut DependencyResolutionProcess,
    ) -> Result<Presence, Self::Error>;
}

/// Pass bookkeeping of a resolution.
#[derive(Debug)]
pub struct ResolutionRun {
    limits: ResolutionLimits,
    /// Number of passes started so far; zero before resolution begins.
    pass: u32,
    pending: BTreeSet<String>,
}

impl ResolutionRun {
    pub fn new(limits: ResolutionLimits) -> Self {
        Self {
            limits,
            pass: 0,
            pending: BTreeSet::new(),
        }
    }

    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn limits(&self) -> &ResolutionLimits {
        &self.limits
    }

    /// Whether a name of `category` registered now would still be resolved.
    pub fn accepts(&self, category: DependencyCategory) -> bool {
        if self.pass == 0 {
            return true;
        }
        match self.limits.limit_for(category) {
            Some(limit) => self.pass < limit,
            None => true,
        }
    }

    /// Queue `name` for the next pass. Returns `false` if the category is exhausted.
    pub fn offer(&mut self, category: DependencyCategory, name: &str) -> bool {
        if !self.accepts(category) {
            return false;
        }
        let name = descriptor::element_type_name(name);
        if !name.is_empty() {
            self.pending.insert(name.to_string());
        }
        true
    }

    pub fn pending(&self) -> &BTreeSet<String> {
        &self.pending
    }

    /// Start the next pass, taking ownership of the names queued so far.
    ///
    /// Names registered from here on are held back for the following pass.
    pub fn begin_pass(&mut self) -> BTreeSet<String> {
        self.pass += 1;
        std::mem::take(&mut self.pending)
    }

    /// Return to the state before the first pass, so names registered after
    /// a completed resolution are accepted in every category again.
    pub fn finish(&mut self) {
        self.pass = 0;
    }
}

/// Outcome of `DependencyResolutionProcess::resolve`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSummary {
    /// Passes executed, including the final pass that materialized nothing.
    pub passes: u32,
    /// Names that had to be materialized, in materialization order.
    pub materialized: Vec<String>,
}

impl ResolutionSummary {
    pub fn merge(&mut self, other: ResolutionSummary) {
        self.passes += other.passes;
        self.materialized.extend(other.materialized);
    }
}

/// Public entry point for registering reference names and running resolution.
#[derive(Debug)]
pub struct DependencyResolutionProcess {
    run: ResolutionRun,
}

impl Default for DependencyResolutionProcess {
    fn default() -> Self {
        Self::new(ResolutionLimits::default())
    }
}

impl DependencyResolutionProcess {
    pub fn new(limits: ResolutionLimits) -> Self {
        Self {
            run: ResolutionRun::new(limits),
        }
    }

    pub fn run(&self) -> &ResolutionRun {
        &self.run
    }

    pub fn register(&mut self, category: DependencyCategory, name: &str) {
        if !self.run.offer(category, name) {
            trace!(name, %category, pass = self.run.pass(), "pass limit reached, not resolving");
        }
    }

    pub fn register_member_type(&mut self, name: &str) {
        self.register(DependencyCategory::MemberType, name);
    }

    pub fn register_member_types<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.register_member_type(name.as_ref());
        }
    }

    pub fn register_accessed_type(&mut self, name: &str) {
        self.register(DependencyCategory::AccessedType, name);
    }

    pub fn register_accessed_types<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.register_accessed_type(name.as_ref());
        }
    }

    pub fn register_supertype(&mut self, name: &str) {
        self.register(DependencyCategory::Supertype, name);
    }

    pub fn register_supertypes<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.register_supertype(name.as_ref());
        }
    }

    pub fn register_annotation_type(&mut self, name: &str) {
        self.register(DependencyCategory::AnnotationType, name);
    }

    pub fn register_annotation_types<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.register_annotation_type(name.as_ref());
        }
    }

    /// Run passes until one of them materializes nothing.
    ///
    /// The pass counter starts over on every call, so `resolve` may be called
    /// again after more units were recorded.
    pub fn resolve<R: UnitRegistry>(
        &mut self,
        registry: &mut R,
    ) -> Result<ResolutionSummary, R::Error> {
        let mut summary = ResolutionSummary::default();
        let outcome = self.run_passes(registry, &mut summary);
        self.run.finish();
        outcome?;

        info!(
            passes = summary.passes,
            materialized = summary.materialized.len(),
            "dependency resolution complete"
        );
        Ok(summary)
    }

    fn run_passes<R: UnitRegistry>(
        &mut self,
        registry: &mut R,
        summary: &mut ResolutionSummary,
    ) -> Result<(), R::Error> {
        loop {
            let names = self.run.begin_pass();
            let pass = self.run.pass();
            debug!(pass, pending = names.len(), "starting resolution pass");

            let mut materialized_in_pass = 0usize;
            for name in names {
                if registry.ensure_present(&name, self)? == Presence::HadToBeMaterialized {
                    materialized_in_pass += 1;
                    summary.materialized.push(name);
                }
            }
            summary.passes += 1;
            debug!(pass, materialized = materialized_in_pass, "finished resolution pass");

            if materialized_in_pass == 0 {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    /// Registry over a fixed graph: materializing a name registers its edges.
    #[derive(Default)]
    struct GraphRegistry {
        known: HashSet<String>,
        supertypes: HashMap<&'static str, Vec<&'static str>>,
        member_types: HashMap<&'static str, Vec<&'static str>>,
        calls: Vec<String>,
    }

    impl UnitRegistry for GraphRegistry {
        type Error = std::convert::Infallible;

        fn ensure_present(
            &mut self,
            name: &str,
            process: &mut DependencyResolutionProcess,
        ) -> Result<Presence, Self::Error> {
            self.calls.push(name.to_string());
            if !self.known.insert(name.to_string()) {
                return Ok(Presence::AlreadyKnown);
            }
            if let Some(supertypes) = self.supertypes.get(name) {
                process.register_supertypes(supertypes);
            }
            if let Some(member_types) = self.member_types.get(name) {
                process.register_member_types(member_types);
            }
            Ok(Presence::HadToBeMaterialized)
        }
    }

    #[test]
    fn test_supertypes_reach_fixed_point() {
        let mut registry = GraphRegistry::default();
        registry.supertypes.insert("A", vec!["B"]);
        registry.supertypes.insert("B", vec!["C"]);
        registry.supertypes.insert("C", vec!["D"]);

        let mut process = DependencyResolutionProcess::default();
        process.register_supertype("A");
        let summary = process.resolve(&mut registry).unwrap();

        assert_eq!(summary.materialized, vec!["A", "B", "C", "D"]);
        // Four materializing passes plus one empty pass
        assert_eq!(summary.passes, 5);
    }

    #[test]
    fn test_member_types_stay_shallow() {
        let mut registry = GraphRegistry::default();
        registry.member_types.insert("X", vec!["Y"]);

        let mut process = DependencyResolutionProcess::default();
        process.register_member_type("X");
        let summary = process.resolve(&mut registry).unwrap();

        assert_eq!(summary.materialized, vec!["X"]);
        assert!(!registry.known.contains("Y"));
    }

    #[test]
    fn test_supertypes_of_member_types_are_resolved() {
        let mut registry = GraphRegistry::default();
        registry.member_types.insert("X", vec!["Y"]);
        registry.supertypes.insert("X", vec!["XBase"]);
        registry.supertypes.insert("XBase", vec!["XRoot"]);

        let mut process = DependencyResolutionProcess::default();
        process.register_member_type("X");
        let summary = process.resolve(&mut registry).unwrap();

        assert_eq!(summary.materialized, vec!["X", "XBase", "XRoot"]);
        assert!(!registry.known.contains("Y"));
    }

    #[test]
    fn test_resolving_again_accepts_new_member_types() {
        let mut registry = GraphRegistry::default();
        registry.member_types.insert("X", vec!["Y"]);

        let mut process = DependencyResolutionProcess::default();
        let empty = process.resolve(&mut registry).unwrap();
        assert!(empty.materialized.is_empty());
        assert_eq!(process.run().pass(), 0);

        process.register_member_type("X");
        process.register_accessed_type("Owner");
        let summary = process.resolve(&mut registry).unwrap();
        assert_eq!(summary.materialized, vec!["Owner", "X"]);
        assert!(!registry.known.contains("Y"));

        process.register_member_type("Later");
        assert_eq!(process.resolve(&mut registry).unwrap().materialized, vec!["Later"]);
    }

    #[test]
    fn test_configured_member_type_limit() {
        let mut registry = GraphRegistry::default();
        registry.member_types.insert("X", vec!["Y"]);
        registry.member_types.insert("Y", vec!["Z"]);

        let limits = ResolutionLimits {
            max_passes_for_member_types: Some(2),
            ..Default::default()
        };
        let mut process = DependencyResolutionProcess::new(limits);
        process.register_member_type("X");
        let summary = process.resolve(&mut registry).unwrap();

        assert_eq!(summary.materialized, vec!["X", "Y"]);
        assert!(!registry.known.contains("Z"));
    }

    #[test]
    fn test_already_known_names_end_resolution() {
        let mut registry = GraphRegistry::default();
        registry.known.insert("A".to_string());

        let mut process = DependencyResolutionProcess::default();
        process.register_supertype("A");
        let summary = process.resolve(&mut registry).unwrap();

        assert!(summary.materialized.is_empty());
        assert_eq!(summary.passes, 1);
        assert_eq!(registry.calls, vec!["A"]);
    }

    #[test]
    fn test_cycles_terminate() {
        let mut registry = GraphRegistry::default();
        registry.supertypes.insert("Foo", vec!["Bar"]);
        registry.supertypes.insert("Bar", vec!["Foo"]);

        let mut process = DependencyResolutionProcess::default();
        process.register_supertype("Foo");
        let summary = process.resolve(&mut registry).unwrap();

        assert_eq!(summary.materialized, vec!["Foo", "Bar"]);
        assert_eq!(registry.calls, vec!["Foo", "Bar", "Foo"]);
    }

    #[test]
    fn test_registrations_before_first_pass_always_accepted() {
        let limits = ResolutionLimits {
            max_passes_for_member_types: Some(0),
            max_passes_for_accessed_types: Some(0),
            max_passes_for_supertypes: Some(0),
            max_passes_for_annotation_types: Some(0),
        };
        let mut run = ResolutionRun::new(limits);
        assert!(run.offer(DependencyCategory::MemberType, "A"));
        assert!(run.offer(DependencyCategory::AccessedType, "B"));

        run.begin_pass();
        assert!(!run.accepts(DependencyCategory::MemberType));
        assert!(!run.accepts(DependencyCategory::Supertype));
    }

    #[test]
    fn test_pending_is_swapped_per_pass() {
        let mut run = ResolutionRun::new(ResolutionLimits::default());
        run.offer(DependencyCategory::MemberType, "A");
        run.offer(DependencyCategory::MemberType, "A[][]");

        let first = run.begin_pass();
        assert_eq!(first.into_iter().collect::<Vec<_>>(), vec!["A"]);
        assert!(run.pending().is_empty());

        // Member types are exhausted after the first pass, supertypes are not
        assert!(!run.offer(DependencyCategory::MemberType, "B"));
        assert!(run.offer(DependencyCategory::Supertype, "C"));
        assert_eq!(run.begin_pass().len(), 1);
        assert_eq!(run.pass(), 2);
    }
}
